// ============================================================================
// spark-fields - Primitives Module
// Reactive building blocks: signal, effect, scope
// ============================================================================

pub mod effect;
pub mod scope;
pub mod signal;

pub use effect::{
    CleanupFn, Effect, EffectFn, EffectInner, destroy_effect, effect_immediate, effect_sync,
    effect_sync_with_cleanup, effect_tracking, update_effect,
};
pub use scope::{EffectScope, ScopeCleanupFn, effect_scope, get_current_scope, on_scope_dispose};
pub use signal::{Signal, signal, signal_with_equals};
