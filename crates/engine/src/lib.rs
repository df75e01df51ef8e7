//! Token formula engine: tokens, the token sequence store, the keyboard
//! controller and the arithmetic evaluator.

pub mod editor;
pub mod formula;
pub mod key;
pub mod store;
pub mod token;

pub use editor::{EditorEvent, FormulaEditor};
pub use key::Key;
pub use store::{FormulaStore, StoreError};
pub use token::{Operator, Tag, TagKind, TagValue, Token};
