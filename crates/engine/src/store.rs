//! Token sequence store.
//!
//! Single source of truth for the formula's tokens plus the cursor, inline-edit
//! and suggestion-visibility state. Every mutation of the token list re-runs the
//! evaluator before returning, so `result()` always matches `items()`.

use crate::formula::calculate;
use crate::token::Token;

/// Precondition violations on store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Index does not reference an existing token
    IndexOutOfRange { index: usize, len: usize },
    /// Inline edit requested on a Tag or Operator token
    NotEditable { index: usize },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for {} tokens", index, len)
            }
            StoreError::NotEditable { index } => {
                write!(f, "Token at index {} cannot be edited inline", index)
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, Default)]
pub struct FormulaStore {
    items: Vec<Token>,
    /// Gap before `items[active_index]` where the next token lands
    active_index: Option<usize>,
    inline_edit_index: Option<usize>,
    inline_text: String,
    input_value: String,
    show_suggestions: bool,
    result: Option<f64>,
}

impl FormulaStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn items(&self) -> &[Token] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn inline_edit_index(&self) -> Option<usize> {
        self.inline_edit_index
    }

    pub fn inline_text(&self) -> &str {
        &self.inline_text
    }

    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    pub fn show_suggestions(&self) -> bool {
        self.show_suggestions
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    // ------------------------------------------------------------------------
    // Token mutations (all re-evaluate)
    // ------------------------------------------------------------------------

    /// Replace the whole sequence. The cursor is clamped and any inline edit is dropped.
    pub fn set_items(&mut self, items: Vec<Token>) {
        self.items = items;
        let len = self.items.len();
        self.active_index = self.active_index.map(|i| i.min(len));
        self.inline_edit_index = None;
        self.inline_text.clear();
        self.recalculate();
    }

    /// Insert at `at`, else at the cursor, else at the end. An index past the end is
    /// clamped to the end. The cursor moves to just after the new token.
    /// Returns the index the token was inserted at.
    pub fn insert(&mut self, token: Token, at: Option<usize>) -> usize {
        let len = self.items.len();
        let index = at.or(self.active_index).map_or(len, |i| i.min(len));

        self.items.insert(index, token);
        self.active_index = Some(index + 1);
        if let Some(edit) = self.inline_edit_index {
            if edit >= index {
                self.inline_edit_index = Some(edit + 1);
            }
        }

        self.recalculate();
        index
    }

    /// Remove the token at `index`. A cursor to the right of it shifts left by one.
    pub fn remove(&mut self, index: usize) -> Result<Token, StoreError> {
        self.check_index(index)?;

        let removed = self.items.remove(index);
        if let Some(active) = self.active_index {
            if active > index {
                self.active_index = Some(active - 1);
            }
        }
        match self.inline_edit_index {
            Some(edit) if edit == index => {
                self.inline_edit_index = None;
                self.inline_text.clear();
            }
            Some(edit) if edit > index => self.inline_edit_index = Some(edit - 1),
            _ => {}
        }

        self.recalculate();
        Ok(removed)
    }

    /// Overwrite the token at `index`; cursor and other state are untouched.
    pub fn replace(&mut self, index: usize, token: Token) -> Result<Token, StoreError> {
        self.check_index(index)?;

        if self.inline_edit_index == Some(index) && !token.is_inline_editable() {
            self.inline_edit_index = None;
            self.inline_text.clear();
        }
        let previous = std::mem::replace(&mut self.items[index], token);

        self.recalculate();
        Ok(previous)
    }

    // ------------------------------------------------------------------------
    // Cursor and inline edit
    // ------------------------------------------------------------------------

    pub fn set_active_index(&mut self, index: Option<usize>) {
        let len = self.items.len();
        self.active_index = index.map(|i| i.min(len));
    }

    /// Begin (Some) or abandon (None) an inline edit with the given draft text.
    pub fn set_inline_edit(&mut self, index: Option<usize>, initial_text: impl Into<String>) -> Result<(), StoreError> {
        let Some(index) = index else {
            self.cancel_inline_edit();
            return Ok(());
        };

        self.check_index(index)?;
        if !self.items[index].is_inline_editable() {
            return Err(StoreError::NotEditable { index });
        }
        self.inline_edit_index = Some(index);
        self.inline_text = initial_text.into();
        Ok(())
    }

    pub fn set_inline_text(&mut self, text: impl Into<String>) {
        self.inline_text = text.into();
    }

    pub(crate) fn inline_text_mut(&mut self) -> &mut String {
        &mut self.inline_text
    }

    /// Apply the draft to the token at `index`: numeric text becomes a Number,
    /// other text a Text token, and a blank draft removes the token.
    /// The edit state is cleared on success; an out-of-range index leaves it intact.
    pub fn commit_inline_edit(&mut self, index: usize) -> Result<(), StoreError> {
        self.check_index(index)?;
        let draft = std::mem::take(&mut self.inline_text);
        self.inline_edit_index = None;

        match Token::from_input(&draft) {
            Some(token) => self.replace(index, token).map(|_| ()),
            None => self.remove(index).map(|_| ()),
        }
    }

    pub fn cancel_inline_edit(&mut self) {
        self.inline_edit_index = None;
        self.inline_text.clear();
    }

    // ------------------------------------------------------------------------
    // UI-only state
    // ------------------------------------------------------------------------

    pub fn set_input_value(&mut self, text: impl Into<String>) {
        self.input_value = text.into();
    }

    pub(crate) fn input_value_mut(&mut self) -> &mut String {
        &mut self.input_value
    }

    pub fn set_show_suggestions(&mut self, show: bool) {
        self.show_suggestions = show;
    }

    // ------------------------------------------------------------------------

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index >= self.items.len() {
            return Err(StoreError::IndexOutOfRange { index, len: self.items.len() });
        }
        Ok(())
    }

    fn recalculate(&mut self) {
        self.result = calculate(&self.items);
    }
}
