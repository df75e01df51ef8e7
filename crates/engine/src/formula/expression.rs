// Token sequence -> expression text -> result
//
// Each token contributes text to a single expression string, which is then parsed
// with the closed arithmetic grammar. Adjacent number tokens therefore join their
// digits ([1, 2] reads as 12), which is how digit-by-digit typing builds numbers.

use crate::token::{format_number, parse_number, TagValue, Token};

use super::eval::evaluate;
use super::parser::parse;

/// Characters that mark a tag's string value as a sub-expression
const EXPRESSION_CHARS: &[char] = &['+', '-', '*', '/', '(', ')', '^'];

/// Parse and evaluate expression text.
pub fn evaluate_text(text: &str) -> Result<f64, String> {
    let expr = parse(text)?;
    evaluate(&expr)
}

/// Numeric value of a tag. Strings are parsed as numbers, then as sub-expressions;
/// anything that fails contributes 0.
pub fn tag_value(value: &TagValue) -> f64 {
    match value {
        TagValue::Number(n) => *n,
        TagValue::Text(s) => {
            if let Some(n) = parse_number(s) {
                return n;
            }
            if s.contains(EXPRESSION_CHARS) {
                match evaluate_text(s) {
                    Ok(n) => return n,
                    Err(e) => log::debug!("tag value {:?} is not a valid expression: {}", s, e),
                }
            }
            0.0
        }
    }
}

/// Concatenate each token's contribution, left to right.
pub fn build_expression(tokens: &[Token]) -> String {
    let mut expression = String::new();

    for token in tokens {
        match token {
            Token::Tag { tag } => expression.push_str(&format_number(tag_value(&tag.value))),
            Token::Operator { operator } => expression.push(operator.glyph()),
            Token::Text { text } => {
                // Non-numeric text contributes nothing
                if let Some(n) = parse_number(text) {
                    expression.push_str(&format_number(n));
                }
            }
            Token::Number { value } => expression.push_str(&format_number(*value)),
        }
    }

    expression
}

/// Evaluate a token sequence. Any failure, and an empty expression, yields None.
pub fn calculate(tokens: &[Token]) -> Option<f64> {
    let expression = build_expression(tokens);
    if expression.is_empty() {
        return None;
    }

    match evaluate_text(&expression) {
        Ok(n) => Some(n),
        Err(e) => {
            log::debug!("calculation of {:?} failed: {}", expression, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Operator, Tag};

    fn n(v: f64) -> Token {
        Token::number(v)
    }

    fn op(c: char) -> Token {
        Token::operator(Operator::from_char(c).unwrap())
    }

    fn tag(value: TagValue) -> Token {
        Token::tag(Tag::new("1", "Revenue", "Finance", value))
    }

    #[test]
    fn test_standard_arithmetic() {
        let tokens = vec![n(3.0), op('+'), n(4.0), op('*'), n(2.0)];
        assert_eq!(build_expression(&tokens), "3+4*2");
        assert_eq!(calculate(&tokens), Some(11.0));
    }

    #[test]
    fn test_power() {
        assert_eq!(calculate(&[n(2.0), op('^'), n(3.0)]), Some(8.0));
    }

    #[test]
    fn test_empty_is_absent() {
        assert_eq!(calculate(&[]), None);
    }

    #[test]
    fn test_dangling_operator_is_absent() {
        assert_eq!(calculate(&[n(3.0), op('+')]), None);
    }

    #[test]
    fn test_adjacent_operators_are_absent() {
        assert_eq!(calculate(&[n(3.0), op('*'), op('/'), n(2.0)]), None);
    }

    #[test]
    fn test_unbalanced_parens_are_absent() {
        assert_eq!(calculate(&[op('('), n(3.0), op('+'), n(1.0)]), None);
        assert_eq!(calculate(&[n(3.0), op(')')]), None);
    }

    #[test]
    fn test_division_by_zero_is_absent() {
        assert_eq!(calculate(&[n(1.0), op('/'), n(0.0)]), None);
    }

    #[test]
    fn test_adjacent_numbers_join_digits() {
        assert_eq!(calculate(&[n(1.0), n(2.0), op('+'), n(3.0)]), Some(15.0));
    }

    #[test]
    fn test_text_contributes_numeric_value_or_nothing() {
        let tokens = vec![n(2.0), op('*'), Token::text("21")];
        assert_eq!(calculate(&tokens), Some(42.0));

        // Non-numeric text vanishes and can leave a dangling operator
        let tokens = vec![n(2.0), op('*'), Token::text("apples")];
        assert_eq!(build_expression(&tokens), "2*");
        assert_eq!(calculate(&tokens), None);

        // ... or be harmless
        let tokens = vec![Token::text("note"), n(5.0)];
        assert_eq!(calculate(&tokens), Some(5.0));
    }

    #[test]
    fn test_tag_values() {
        assert_eq!(tag_value(&TagValue::Number(12.5)), 12.5);
        assert_eq!(tag_value(&TagValue::Text("7".into())), 7.0);
        assert_eq!(tag_value(&TagValue::Text("2*(3+1)".into())), 8.0);
        assert_eq!(tag_value(&TagValue::Text("2^3".into())), 8.0);
        assert_eq!(tag_value(&TagValue::Text("n/a".into())), 0.0);
        assert_eq!(tag_value(&TagValue::Text("hello".into())), 0.0);
        assert_eq!(tag_value(&TagValue::Text("1/0".into())), 0.0);
    }

    #[test]
    fn test_hostile_tag_value_contributes_zero() {
        let nested = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(tag_value(&TagValue::Text(nested)), 0.0);
        let chain = vec!["1"; 100_000].join("+");
        assert_eq!(tag_value(&TagValue::Text(chain)), 0.0);
    }

    #[test]
    fn test_deep_nesting_is_absent() {
        let mut tokens = vec![op('('); 1_000];
        tokens.push(n(1.0));
        tokens.extend(vec![op(')'); 1_000]);
        assert_eq!(calculate(&tokens), None);
    }

    #[test]
    fn test_tag_in_formula() {
        let tokens = vec![tag(TagValue::Number(100.0)), op('*'), n(2.0)];
        assert_eq!(calculate(&tokens), Some(200.0));

        let tokens = vec![tag(TagValue::Text("10+5".into())), op('*'), n(2.0)];
        // Sub-expression result is spliced in as a plain number
        assert_eq!(build_expression(&tokens), "15*2");
        assert_eq!(calculate(&tokens), Some(30.0));
    }

    #[test]
    fn test_negative_number_after_operator() {
        let tokens = vec![n(3.0), op('-'), n(-5.0)];
        assert_eq!(build_expression(&tokens), "3--5");
        assert_eq!(calculate(&tokens), Some(8.0));
    }

    #[test]
    fn test_user_text_is_never_executed() {
        let tokens = vec![Token::text("process.exit()"), n(1.0)];
        assert_eq!(build_expression(&tokens), "1");
        assert_eq!(calculate(&tokens), Some(1.0));
    }
}
