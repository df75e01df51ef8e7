// Formula parsing and evaluation

pub mod parser;
pub mod eval;
pub mod expression;

pub use expression::{build_expression, calculate, evaluate_text, tag_value};
