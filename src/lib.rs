// ============================================================================
// spark-fields - Conditional Form Field Groups
// ============================================================================
//
// A select box decides whether a group of related inputs is shown. The
// controller applies the rule once when it is created and again on every
// change of the select, driven by a small synchronous signals core.
// ============================================================================

pub mod core;
pub mod dom;
pub mod error;
pub mod forms;
mod macros;
pub mod primitives;
pub mod reactivity;

// Reactive core
pub use crate::core::constants;
pub use crate::core::context::{ReactiveContext, is_batching, is_tracking, with_context};
pub use crate::core::types::{AnyReaction, AnySource, EqualsFn, SourceInner, default_equals};

pub use primitives::effect::{
    CleanupFn, Effect, EffectFn, effect_immediate, effect_sync, effect_sync_with_cleanup,
    effect_tracking,
};
pub use primitives::scope::{EffectScope, effect_scope, get_current_scope, on_scope_dispose};
pub use primitives::signal::{Signal, signal, signal_with_equals};
pub use reactivity::batching::{batch, untrack};
pub use reactivity::scheduling::flush_sync;

// Forms
pub use dom::{DEFAULT_HIDDEN_CLASS, Element, ElementBuilder, Page};
pub use error::{
    ConfigurationError, MissingElementWarning, MissingReason, PageError, Result, ValidationError,
};
pub use forms::{
    ConditionalFieldGroupController, Container, Control, DependentRef, ElementRef, Evaluation,
    FieldGroupConfig, FormConfig, OTHER_SCHOOL, RequiredWhenShown, TriggerRef,
};
