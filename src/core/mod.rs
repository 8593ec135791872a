// ============================================================================
// spark-fields - Core Module
// Flags, graph traits and thread-local context for the reactive core
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{ReactiveContext, is_batching, is_tracking, with_context};
pub use types::{AnyReaction, AnySource, EqualsFn, SourceInner, default_equals};
