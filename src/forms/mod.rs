// ============================================================================
// spark-fields - Forms Module
// Conditional field groups: references, controller, config and validation
// ============================================================================

pub mod config;
pub mod controller;
pub mod refs;
pub mod validation;

pub use config::{FieldGroupConfig, FormConfig, OTHER_SCHOOL};
pub use controller::{ConditionalFieldGroupController, Evaluation};
pub use refs::{Container, Control, DependentRef, ElementRef, TriggerRef};
pub use validation::RequiredWhenShown;
