use component_harness::core::dom::*;
use pretty_assertions::assert_eq;

#[test]
fn test_html_skeleton() {
    let doc = Document::new_html();
    let body = doc.body().unwrap();
    assert_eq!(doc.tag_name(body).as_deref(), Some("body"));
    assert_eq!(doc.query_selector_all("html > *").unwrap().len(), 2);
}

#[test]
fn test_fragment_parsing_and_serialization() {
    let doc = Document::new();
    let nodes = doc
        .parse_fragment(r#"<ul class="list"><li id="a">One &amp; two</li><li><input type="checkbox" checked></li></ul>"#)
        .unwrap();
    assert_eq!(nodes.len(), 1);
    let list = nodes[0];
    assert_eq!(
        doc.outer_html(list),
        r#"<ul class="list"><li id="a">One &amp; two</li><li><input type="checkbox" checked=""></li></ul>"#
    );
    assert_eq!(doc.text_content(list), "One & two");
}

#[test]
fn test_scoped_selectors() {
    let doc = Document::new();
    let root = doc
        .parse_fragment(r#"<section><p class="x">1</p><div><p>2</p><p class="x y">3</p></div></section>"#)
        .unwrap()[0];
    let found = doc.query_selector_all_within(root, "div > p.x").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(doc.text_content(found[0]), "3");
    let first = doc.query_selector_within(root, "p:first-child").unwrap().unwrap();
    assert_eq!(doc.text_content(first), "1");
    assert!(doc.query_selector_within(root, "section").unwrap().is_none());
}

#[test]
fn test_malformed_selector_is_a_query_error() {
    let doc = Document::new();
    assert!(matches!(
        doc.query_selector("p[").unwrap_err(),
        DocumentError::Query(_)
    ));
}

#[test]
fn test_checked_property_follows_attribute_until_set() {
    let doc = Document::new();
    let input = doc.parse_fragment(r#"<input type="checkbox" checked>"#).unwrap()[0];
    assert!(doc.is_checked(input));
    doc.set_checked(input, false).unwrap();
    assert!(!doc.is_checked(input));
    assert!(doc.has_attribute(input, "checked"));
}

#[test]
fn test_remove_subtree_forgets_nodes() {
    let doc = Document::new_html();
    let body = doc.body().unwrap();
    let div = doc.parse_fragment("<div><span>x</span></div>").unwrap()[0];
    doc.append_child(body, div).unwrap();
    let before = doc.node_count();
    doc.remove_subtree(div).unwrap();
    assert_eq!(doc.node_count(), before - 3);
    assert!(doc.get_children(body).is_empty());
}
