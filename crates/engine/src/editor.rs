//! Keyboard and pointer contract of the formula editor.
//!
//! `FormulaEditor` owns a [`FormulaStore`] and turns view events (key presses,
//! focus, gap clicks, double clicks, suggestion picks) into store operations.
//! It holds no rendering state; any host (terminal, GUI, tests) drives it the
//! same way.
//!
//! # Keys outside an inline edit
//!
//! | Key | Pending input | Effect |
//! |-----|---------------|--------|
//! | Left / Right | any | move the cursor one gap, within `0..=len` |
//! | `+ - * / ( ) ^` | any | insert an Operator token |
//! | digit | empty | insert a Number token |
//! | digit | non-empty | type into the input |
//! | Space | non-blank | commit input as Number or Text |
//! | Enter | any | pick the first suggestion if the list is open, else commit like Space |
//! | Backspace | empty | remove the token left of the cursor |
//! | Backspace | non-empty | delete the last input character |
//! | Escape | any | close the suggestion list |
//!
//! Anything else printable is typed into the input and opens the suggestion list.

use crate::key::Key;
use crate::store::{FormulaStore, StoreError};
use crate::token::{Operator, Tag, Token};

/// What a key press did, so the host knows what to refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Token inserted at this index
    Inserted(usize),
    /// Token removed from this index
    Removed(usize),
    CursorMoved,
    /// Pending input text changed (refresh suggestions)
    InputChanged,
    SuggestionsClosed,
    /// Inline draft text changed
    InlineChanged,
    InlineCommitted,
    InlineCancelled,
    /// Key had no effect
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct FormulaEditor {
    store: FormulaStore,
}

impl FormulaEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: FormulaStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FormulaStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FormulaStore {
        &mut self.store
    }

    pub fn into_store(self) -> FormulaStore {
        self.store
    }

    /// Input gained focus: open suggestions and park an unset cursor at the end.
    pub fn focus(&mut self) {
        self.store.set_show_suggestions(true);
        if self.store.active_index().is_none() {
            self.store.set_active_index(Some(self.store.len()));
        }
    }

    /// Click on the gap before token `index` (or `len` for the trailing gap).
    pub fn click_gap(&mut self, index: usize) {
        self.store.set_active_index(Some(index));
    }

    /// Double click on a token: start editing it in place, seeded with its text.
    pub fn start_inline_edit(&mut self, index: usize) -> Result<(), StoreError> {
        let seed = self
            .store
            .items()
            .get(index)
            .map(Token::edit_text)
            .unwrap_or_default();
        self.store.set_inline_edit(Some(index), seed)
    }

    /// Inline input lost focus: commit the draft.
    pub fn blur_inline(&mut self) -> Result<(), StoreError> {
        match self.store.inline_edit_index() {
            Some(index) => self.store.commit_inline_edit(index),
            None => Ok(()),
        }
    }

    /// Insert a picked suggestion as a Tag token and reset the input.
    pub fn select_suggestion(&mut self, suggestion: &Tag) -> usize {
        let index = self.store.insert(Token::tag(suggestion.clone()), None);
        self.store.set_input_value("");
        self.store.set_show_suggestions(false);
        index
    }

    /// Remove a token directly (tag menu "Delete").
    pub fn delete_token(&mut self, index: usize) -> Result<Token, StoreError> {
        self.store.remove(index)
    }

    /// Apply one key press. `suggestions` is the list currently shown to the user.
    pub fn handle_key(&mut self, key: Key, suggestions: &[Tag]) -> Result<EditorEvent, StoreError> {
        if let Some(index) = self.store.inline_edit_index() {
            return self.handle_inline_key(index, key);
        }

        let event = match key {
            Key::Left => match self.store.active_index() {
                Some(active) if active > 0 => {
                    self.store.set_active_index(Some(active - 1));
                    EditorEvent::CursorMoved
                }
                _ => EditorEvent::Ignored,
            },
            Key::Right => match self.store.active_index() {
                Some(active) if active < self.store.len() => {
                    self.store.set_active_index(Some(active + 1));
                    EditorEvent::CursorMoved
                }
                _ => EditorEvent::Ignored,
            },
            Key::Char(c) => {
                if let Some(operator) = Operator::from_char(c) {
                    EditorEvent::Inserted(self.store.insert(Token::operator(operator), None))
                } else if let (Some(digit), true) = (c.to_digit(10), self.store.input_value().is_empty()) {
                    EditorEvent::Inserted(self.store.insert(Token::number(f64::from(digit)), None))
                } else {
                    self.type_char(c)
                }
            }
            Key::Space => {
                if self.store.input_value().trim().is_empty() {
                    self.type_char(' ')
                } else {
                    self.commit_pending()
                }
            }
            Key::Enter => {
                if self.store.show_suggestions() && !suggestions.is_empty() {
                    EditorEvent::Inserted(self.select_suggestion(&suggestions[0]))
                } else if !self.store.input_value().trim().is_empty() {
                    self.commit_pending()
                } else {
                    EditorEvent::Ignored
                }
            }
            Key::Backspace => {
                if self.store.input_value().is_empty() {
                    match self.store.active_index() {
                        Some(active) if active > 0 && !self.store.is_empty() => {
                            self.store.remove(active - 1)?;
                            EditorEvent::Removed(active - 1)
                        }
                        _ => EditorEvent::Ignored,
                    }
                } else {
                    self.store.input_value_mut().pop();
                    self.store.set_show_suggestions(true);
                    EditorEvent::InputChanged
                }
            }
            Key::Escape => {
                self.store.set_show_suggestions(false);
                EditorEvent::SuggestionsClosed
            }
        };

        Ok(event)
    }

    fn handle_inline_key(&mut self, index: usize, key: Key) -> Result<EditorEvent, StoreError> {
        let event = match key {
            Key::Enter => {
                self.store.commit_inline_edit(index)?;
                EditorEvent::InlineCommitted
            }
            Key::Escape => {
                self.store.cancel_inline_edit();
                EditorEvent::InlineCancelled
            }
            Key::Backspace => {
                self.store.inline_text_mut().pop();
                EditorEvent::InlineChanged
            }
            Key::Space => {
                self.store.inline_text_mut().push(' ');
                EditorEvent::InlineChanged
            }
            Key::Char(c) => {
                self.store.inline_text_mut().push(c);
                EditorEvent::InlineChanged
            }
            Key::Left | Key::Right => EditorEvent::Ignored,
        };
        Ok(event)
    }

    fn type_char(&mut self, c: char) -> EditorEvent {
        self.store.input_value_mut().push(c);
        self.store.set_show_suggestions(true);
        EditorEvent::InputChanged
    }

    /// Commit the pending input as a Number or Text token and clear it.
    fn commit_pending(&mut self) -> EditorEvent {
        let Some(token) = Token::from_input(self.store.input_value()) else {
            return EditorEvent::Ignored;
        };
        let index = self.store.insert(token, None);
        self.store.set_input_value("");
        EditorEvent::Inserted(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TagValue;

    fn n(v: f64) -> Token {
        Token::number(v)
    }

    fn op(c: char) -> Token {
        Token::operator(Operator::from_char(c).unwrap())
    }

    fn type_keys(editor: &mut FormulaEditor, text: &str) {
        for key in Key::sequence(text) {
            editor.handle_key(key, &[]).unwrap();
        }
    }

    fn revenue() -> Tag {
        Tag::new("rev", "Revenue", "Finance", TagValue::Number(100.0))
    }

    #[test]
    fn test_digits_and_operators_insert_immediately() {
        let mut editor = FormulaEditor::new();
        editor.focus();
        type_keys(&mut editor, "3+4*2");
        let store = editor.store();
        assert_eq!(store.items(), &[n(3.0), op('+'), n(4.0), op('*'), n(2.0)]);
        assert_eq!(store.active_index(), Some(5));
        assert_eq!(store.result(), Some(11.0));
        assert_eq!(store.input_value(), "");
    }

    #[test]
    fn test_digit_by_digit_numbers() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "12^2");
        assert_eq!(editor.store().result(), Some(144.0));
    }

    #[test]
    fn test_letters_go_to_input_and_open_suggestions() {
        let mut editor = FormulaEditor::new();
        let event = editor.handle_key(Key::Char('r'), &[]).unwrap();
        assert_eq!(event, EditorEvent::InputChanged);
        assert!(editor.store().show_suggestions());
        // Digit after non-empty input is typed, not inserted
        editor.handle_key(Key::Char('2'), &[]).unwrap();
        assert_eq!(editor.store().input_value(), "r2");
        assert!(editor.store().is_empty());
    }

    #[test]
    fn test_space_commits_text_or_number() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "abc ");
        assert_eq!(editor.store().items(), &[Token::text("abc")]);
        assert_eq!(editor.store().input_value(), "");

        editor.store_mut().set_input_value("2.5");
        editor.handle_key(Key::Space, &[]).unwrap();
        assert_eq!(editor.store().items(), &[Token::text("abc"), n(2.5)]);
    }

    #[test]
    fn test_space_with_blank_input_is_typed() {
        let mut editor = FormulaEditor::new();
        editor.handle_key(Key::Space, &[]).unwrap();
        assert_eq!(editor.store().input_value(), " ");
        assert!(editor.store().is_empty());
    }

    #[test]
    fn test_enter_picks_first_suggestion_when_open() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "rev");
        let suggestions = vec![revenue()];
        let event = editor.handle_key(Key::Enter, &suggestions).unwrap();
        assert_eq!(event, EditorEvent::Inserted(0));
        assert_eq!(editor.store().items(), &[Token::tag(revenue())]);
        assert_eq!(editor.store().input_value(), "");
        assert!(!editor.store().show_suggestions());
        assert_eq!(editor.store().result(), Some(100.0));
    }

    #[test]
    fn test_enter_commits_input_when_list_closed() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "x");
        editor.handle_key(Key::Escape, &[]).unwrap();
        editor.handle_key(Key::Enter, &[revenue()]).unwrap();
        assert_eq!(editor.store().items(), &[Token::text("x")]);
    }

    #[test]
    fn test_enter_with_nothing_pending_is_ignored() {
        let mut editor = FormulaEditor::new();
        assert_eq!(editor.handle_key(Key::Enter, &[]).unwrap(), EditorEvent::Ignored);
    }

    #[test]
    fn test_backspace_removes_token_left_of_cursor() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "1+2");
        editor.handle_key(Key::Left, &[]).unwrap();
        let event = editor.handle_key(Key::Backspace, &[]).unwrap();
        assert_eq!(event, EditorEvent::Removed(1));
        assert_eq!(editor.store().items(), &[n(1.0), n(2.0)]);
        assert_eq!(editor.store().active_index(), Some(1));
        assert_eq!(editor.store().result(), Some(12.0));
    }

    #[test]
    fn test_backspace_at_start_is_ignored() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "1");
        editor.click_gap(0);
        assert_eq!(editor.handle_key(Key::Backspace, &[]).unwrap(), EditorEvent::Ignored);
        assert_eq!(editor.store().len(), 1);
    }

    #[test]
    fn test_backspace_edits_pending_input() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "1ab");
        editor.handle_key(Key::Backspace, &[]).unwrap();
        assert_eq!(editor.store().input_value(), "a");
        assert_eq!(editor.store().items(), &[n(1.0)]);
    }

    #[test]
    fn test_arrows_stay_in_bounds() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "1+");
        assert_eq!(editor.handle_key(Key::Right, &[]).unwrap(), EditorEvent::Ignored);
        editor.handle_key(Key::Left, &[]).unwrap();
        editor.handle_key(Key::Left, &[]).unwrap();
        assert_eq!(editor.store().active_index(), Some(0));
        assert_eq!(editor.handle_key(Key::Left, &[]).unwrap(), EditorEvent::Ignored);
    }

    #[test]
    fn test_arrows_without_cursor_are_ignored() {
        let mut editor = FormulaEditor::new();
        assert_eq!(editor.handle_key(Key::Left, &[]).unwrap(), EditorEvent::Ignored);
        assert_eq!(editor.handle_key(Key::Right, &[]).unwrap(), EditorEvent::Ignored);
    }

    #[test]
    fn test_insert_in_the_middle_via_cursor() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "23");
        editor.click_gap(1);
        type_keys(&mut editor, "*");
        assert_eq!(editor.store().items(), &[n(2.0), op('*'), n(3.0)]);
        assert_eq!(editor.store().result(), Some(6.0));
    }

    #[test]
    fn test_focus_sets_cursor_to_end() {
        let mut store = FormulaStore::new();
        store.set_items(vec![n(1.0), n(2.0)]);
        let mut editor = FormulaEditor::with_store(store);
        editor.focus();
        assert_eq!(editor.store().active_index(), Some(2));
        assert!(editor.store().show_suggestions());
    }

    #[test]
    fn test_inline_edit_flow() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "5+");
        editor.store_mut().set_input_value("abc");
        editor.handle_key(Key::Space, &[]).unwrap();
        assert_eq!(editor.store().result(), None);

        editor.start_inline_edit(2).unwrap();
        assert_eq!(editor.store().inline_text(), "abc");
        for _ in 0..3 {
            editor.handle_key(Key::Backspace, &[]).unwrap();
        }
        type_keys(&mut editor, "10");
        // Digits go to the draft, not the token list
        assert_eq!(editor.store().len(), 3);
        let event = editor.handle_key(Key::Enter, &[]).unwrap();
        assert_eq!(event, EditorEvent::InlineCommitted);
        assert_eq!(editor.store().items(), &[n(5.0), op('+'), n(10.0)]);
        assert_eq!(editor.store().result(), Some(15.0));
    }

    #[test]
    fn test_inline_escape_cancels() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "7");
        editor.start_inline_edit(0).unwrap();
        type_keys(&mut editor, "9");
        assert_eq!(editor.handle_key(Key::Escape, &[]).unwrap(), EditorEvent::InlineCancelled);
        assert_eq!(editor.store().items(), &[n(7.0)]);
    }

    #[test]
    fn test_blur_commits_inline_edit() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "7");
        editor.start_inline_edit(0).unwrap();
        editor.store_mut().set_inline_text("");
        editor.blur_inline().unwrap();
        assert!(editor.store().is_empty());
        // No edit in progress: no-op
        editor.blur_inline().unwrap();
    }

    #[test]
    fn test_start_inline_edit_on_operator_fails() {
        let mut editor = FormulaEditor::new();
        type_keys(&mut editor, "+");
        assert!(editor.start_inline_edit(0).is_err());
    }

    #[test]
    fn test_delete_token() {
        let mut editor = FormulaEditor::new();
        editor.select_suggestion(&revenue());
        type_keys(&mut editor, "*2");
        assert_eq!(editor.store().result(), Some(200.0));
        editor.delete_token(0).unwrap();
        assert_eq!(editor.store().active_index(), Some(2));
        assert_eq!(editor.store().result(), None);
    }
}
