// ============================================================================
// spark-fields - Conditional Completeness
// Fields revealed by a sentinel must all be filled in
// ============================================================================

use crate::error::{ConfigurationError, Result, ValidationError};
use crate::forms::controller::ConditionalFieldGroupController;
use crate::forms::refs::{Control, ElementRef, TriggerRef};
use crate::reactivity::batching::untrack;

/// Requires every field of a group while its trigger holds the sentinel.
#[derive(Debug, Clone)]
pub struct RequiredWhenShown {
    trigger: TriggerRef,
    fields: Vec<ElementRef<dyn Control>>,
    sentinel: String,
}

impl RequiredWhenShown {
    /// Fails with [`ConfigurationError::MissingControl`] if the trigger does
    /// not resolve.
    pub fn new(
        trigger: TriggerRef,
        fields: Vec<ElementRef<dyn Control>>,
        sentinel: impl Into<String>,
    ) -> Result<Self> {
        if trigger.resolve().is_err() {
            return Err(ConfigurationError::MissingControl {
                reference: trigger.name().to_string(),
            });
        }

        Ok(Self {
            trigger,
            fields,
            sentinel: sentinel.into(),
        })
    }

    /// Check the fields of a mounted controller's group.
    pub fn for_controller(
        controller: &ConditionalFieldGroupController,
        fields: Vec<ElementRef<dyn Control>>,
    ) -> Self {
        Self {
            trigger: TriggerRef::new(controller.trigger_name(), &controller.trigger()),
            fields,
            sentinel: controller.sentinel().to_string(),
        }
    }

    pub fn is_required(&self) -> bool {
        untrack(|| {
            self.trigger
                .resolve()
                .is_ok_and(|control| control.value().as_deref() == Some(self.sentinel.as_str()))
        })
    }

    /// `Ok` unless the sentinel is selected and some field is blank.
    ///
    /// Fields that cannot be resolved count as blank.
    pub fn check(&self) -> Result<(), ValidationError> {
        if !self.is_required() {
            return Ok(());
        }

        let missing: Vec<String> = untrack(|| {
            self.fields
                .iter()
                .filter(|field| {
                    field
                        .resolve()
                        .ok()
                        .and_then(|control| control.value())
                        .is_none_or(|value| value.trim().is_empty())
                })
                .map(|field| field.name().to_string())
                .collect()
        });

        if missing.is_empty() {
            Ok(())
        } else {
            tracing::debug!(trigger = %self.trigger.name(), blank = missing.len(), "field group incomplete");
            Err(ValidationError::IncompleteGroup {
                trigger: self.trigger.name().to_string(),
                missing,
            })
        }
    }
}
