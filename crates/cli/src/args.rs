// Token arguments and tag lookup for `fxbar eval` / `fxbar edit`.

use std::time::Duration;

use fxbar_config::Settings;
use fxbar_engine::token::parse_number;
use fxbar_engine::{FormulaEditor, Key, Operator, Token};
use fxbar_suggest::{filter_suggestions, SuggestClient, SuggestError, Suggestion};

use crate::exit_codes::EXIT_EVAL_UNKNOWN_TAG;
use crate::CliError;

/// One command-line token before tag references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenArg {
    Token(Token),
    /// `@name`: looked up by name (case-insensitive), then by id
    TagRef(String),
}

/// `+ - * / ( ) ^` become operators, numbers become Number, `@x` a tag reference,
/// anything else Text.
pub fn parse_token_arg(arg: &str) -> TokenArg {
    let mut chars = arg.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(op) = Operator::from_char(c) {
            return TokenArg::Token(Token::operator(op));
        }
    }
    if let Some(name) = arg.strip_prefix('@') {
        if !name.is_empty() {
            return TokenArg::TagRef(name.to_string());
        }
    }
    match parse_number(arg) {
        Some(value) => TokenArg::Token(Token::number(value)),
        None => TokenArg::Token(Token::text(arg)),
    }
}

/// Suggestion endpoint, fetched at most once per process.
pub struct Catalog {
    url: Option<String>,
    timeout: Duration,
    loaded: Option<Vec<Suggestion>>,
}

impl Catalog {
    pub fn new(settings: &Settings, cli_url: Option<&str>) -> Self {
        Self {
            url: settings.effective_url(cli_url),
            timeout: settings.timeout(),
            loaded: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn client(&self) -> Result<SuggestClient, SuggestError> {
        match &self.url {
            Some(url) => SuggestClient::new(url.as_str(), self.timeout),
            None => Err(SuggestError::NotConfigured),
        }
    }

    /// Complete unfiltered list.
    pub fn all(&mut self) -> Result<&[Suggestion], SuggestError> {
        if self.loaded.is_none() {
            self.loaded = Some(self.client()?.fetch_all()?);
        }
        Ok(self.loaded.as_deref().unwrap_or_default())
    }

    /// Same filtering the suggestion list applies to the pending input.
    pub fn matching(&mut self, query: &str) -> Result<Vec<Suggestion>, SuggestError> {
        Ok(filter_suggestions(self.all()?.to_vec(), query))
    }

    pub fn find(&mut self, reference: &str) -> Result<Option<Suggestion>, SuggestError> {
        Ok(find_tag(self.all()?, reference).cloned())
    }
}

pub fn find_tag<'a>(list: &'a [Suggestion], reference: &str) -> Option<&'a Suggestion> {
    let needle = reference.to_lowercase();
    list.iter()
        .find(|s| s.name.to_lowercase() == needle)
        .or_else(|| list.iter().find(|s| s.id == reference))
}

/// Turn command-line tokens into a token sequence, fetching tags only when referenced.
pub fn resolve_tokens(args: &[String], catalog: &mut Catalog) -> Result<Vec<Token>, CliError> {
    let mut tokens = Vec::with_capacity(args.len());
    for arg in args {
        match parse_token_arg(arg) {
            TokenArg::Token(token) => tokens.push(token),
            TokenArg::TagRef(name) => {
                let tag = catalog.find(&name).map_err(CliError::suggest)?;
                match tag {
                    Some(tag) => tokens.push(Token::tag(tag)),
                    None => {
                        return Err(CliError {
                            code: EXIT_EVAL_UNKNOWN_TAG,
                            message: format!("no suggestion named {:?}", name),
                            hint: Some("list candidates with: fxbar suggest".to_string()),
                        })
                    }
                }
            }
        }
    }
    Ok(tokens)
}

/// Drive the keyboard contract with `text`, one key per character, starting from a focused empty editor.
pub fn replay_keys(text: &str, catalog: &mut Catalog) -> Result<FormulaEditor, CliError> {
    let mut editor = FormulaEditor::new();
    editor.focus();

    for key in Key::sequence(text) {
        // Only Enter consumes the visible list
        let shown = if key == Key::Enter && editor.store().show_suggestions() && catalog.is_configured() {
            catalog
                .matching(editor.store().input_value())
                .map_err(CliError::suggest)?
        } else {
            Vec::new()
        };
        let event = editor
            .handle_key(key, &shown)
            .map_err(|e| CliError::general(e.to_string()))?;
        log::trace!("{:?} -> {:?}", key, event);
    }

    Ok(editor)
}
