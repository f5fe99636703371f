//! Selector parsing and matching for `query_selector`.

pub mod selector;

pub use selector::{
    AttributeOperator, AttributeSelector, Combinator, ComplexSelector, NthPattern, PseudoClass,
    Selector, SelectorEngine, SelectorError, SelectorMatcher, SimpleSelector,
};
