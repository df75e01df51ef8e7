// Formula tokens - the atoms a formula is composed of
// Serialized shape matches the suggestion API: {"type": "tag", "tag": {...}}, {"type": "number", "value": 3}, ...

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Value carried by a tag. The suggestion API sends either a JSON number or a string,
/// and strings may themselves hold an arithmetic expression ("12*4").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Number(f64),
    Text(String),
}

impl Default for TagValue {
    fn default() -> Self {
        TagValue::Number(0.0)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Number(n) => write!(f, "{}", format_number(*n)),
            TagValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named external variable, as returned by the suggestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub value: TagValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<String>,
}

/// Rough classification used for tag icons and colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Categories mentioning a date or month
    Date,
    /// Categories mentioning "category"
    Category,
    /// Everything else (amounts, rates, ...)
    Amount,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>, value: TagValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            value,
            inputs: None,
        }
    }

    pub fn kind(&self) -> TagKind {
        let category = self.category.to_lowercase();
        if category.contains("date") || category.contains("month") {
            TagKind::Date
        } else if category.contains("category") {
            TagKind::Category
        } else {
            TagKind::Amount
        }
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => format_number(n),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "^")]
    Pow,
    #[serde(rename = "(")]
    LParen,
    #[serde(rename = ")")]
    RParen,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::LParen,
        Operator::RParen,
        Operator::Pow,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Pow),
            '(' => Some(Operator::LParen),
            ')' => Some(Operator::RParen),
            _ => None,
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
            Operator::LParen => '(',
            Operator::RParen => ')',
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// One element of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    Tag { tag: Tag },
    Number { value: f64 },
    Text { text: String },
    Operator { operator: Operator },
}

impl Token {
    pub fn tag(tag: Tag) -> Self {
        Token::Tag { tag }
    }

    pub fn number(value: f64) -> Self {
        Token::Number { value }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Token::Text { text: text.into() }
    }

    pub fn operator(operator: Operator) -> Self {
        Token::Operator { operator }
    }

    /// Build a token from user-entered text: numeric text becomes a Number, anything else Text.
    /// Returns None for blank input.
    pub fn from_input(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match parse_number(trimmed) {
            Some(value) => Token::number(value),
            None => Token::text(trimmed),
        })
    }

    /// Only Number and Text tokens can be edited in place.
    pub fn is_inline_editable(&self) -> bool {
        matches!(self, Token::Number { .. } | Token::Text { .. })
    }

    /// Initial draft text when an inline edit starts on this token
    pub fn edit_text(&self) -> String {
        match self {
            Token::Number { value } => format_number(*value),
            Token::Text { text } => text.clone(),
            Token::Tag { tag } => tag.name.clone(),
            Token::Operator { operator } => operator.glyph().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Tag { tag } => write!(f, "{}", tag.name),
            Token::Number { value } => write!(f, "{}", format_number(*value)),
            Token::Text { text } => write!(f, "{}", text),
            Token::Operator { operator } => write!(f, "{}", operator),
        }
    }
}

/// Strict numeric parse used for all user-entered text: trimmed, whole string, finite only.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decimal rendering of a number, never in exponent form.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    format!("{}", n)
}
