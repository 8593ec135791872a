// ============================================================================
// spark-fields - Page Model
// An in-memory element tree standing in for the host document
// ============================================================================

pub mod element;
pub mod page;

pub use element::{Element, ElementInner};
pub use page::{DEFAULT_HIDDEN_CLASS, ElementBuilder, Page};
