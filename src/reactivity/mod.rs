// ============================================================================
// spark-fields - Reactivity Module
// Dependency tracking, effect scheduling and batching
// ============================================================================

pub mod batching;
pub mod scheduling;
pub mod tracking;

pub use batching::{batch, untrack};
pub use scheduling::{flush_sync, schedule_effect};
pub use tracking::{install_dependencies, is_dirty, notify_write, track_read, unsubscribe_all};
