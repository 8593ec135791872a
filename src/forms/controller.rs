// ============================================================================
// spark-fields - Conditional Field Group Controller
// Keeps a group of containers visible exactly while a trigger holds a sentinel
// ============================================================================
//
// Construction evaluates once and installs an immediate effect over the
// trigger's value, so the visibility invariant holds from the first moment
// the controller exists and after every change, with one evaluation per
// change notification. An open batch does not defer it.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{ConfigurationError, MissingElementWarning, MissingReason, Result};
use crate::forms::refs::{Control, DependentRef, TriggerRef};
use crate::primitives::effect::{Effect, effect_immediate};
use crate::primitives::scope::get_current_scope;
use crate::reactivity::batching::untrack;

// =============================================================================
// EVALUATION REPORT
// =============================================================================

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the group is meant to be shown
    pub visible: bool,
    /// Containers the state was applied to
    pub applied: usize,
    /// Containers whose state actually flipped
    pub changed: usize,
    /// References that were skipped
    pub missing: Vec<MissingElementWarning>,
}

impl Evaluation {
    /// True when no dependent was skipped.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct ControllerInner {
    trigger_name: String,
    trigger: Rc<dyn Control>,
    dependents: Vec<DependentRef>,
    sentinel: String,
    evaluations: Cell<u64>,
    last: RefCell<Option<Evaluation>>,
}

impl ControllerInner {
    /// Read the trigger (tracked when inside the effect) and apply.
    fn evaluate(&self) -> Evaluation {
        let visible = self.trigger.value().as_deref() == Some(self.sentinel.as_str());
        let mut report = Evaluation {
            visible,
            applied: 0,
            changed: 0,
            missing: Vec::new(),
        };

        for dependent in &self.dependents {
            let container = dependent
                .resolve()
                .and_then(|c| if c.is_connected() { Ok(c) } else { Err(MissingReason::Removed) });

            match container {
                Ok(container) => {
                    report.applied += 1;
                    if container.set_visible(visible) {
                        report.changed += 1;
                    }
                }
                Err(reason) => {
                    let warning = MissingElementWarning {
                        reference: dependent.name().to_string(),
                        reason,
                    };
                    tracing::warn!(trigger = %self.trigger_name, "{warning}");
                    report.missing.push(warning);
                }
            }
        }

        self.evaluations.set(self.evaluations.get() + 1);
        tracing::debug!(
            trigger = %self.trigger_name,
            visible,
            applied = report.applied,
            changed = report.changed,
            skipped = report.missing.len(),
            "evaluated field group"
        );

        *self.last.borrow_mut() = Some(report.clone());
        report
    }
}

/// Shows a group of dependent containers while the trigger's value equals
/// the sentinel, and hides them otherwise.
///
/// # Example
///
/// ```
/// use spark_fields::{ConditionalFieldGroupController, Page};
///
/// let page = Page::new();
/// let school = page.create("select").id("id_school").value("Gymnázium X").insert()?;
/// let column = page.create("div").class("column").insert()?;
///
/// let controller = ConditionalFieldGroupController::new(
///     school.as_trigger(),
///     vec![column.as_dependent()],
///     "--jiná--",
/// )?;
/// assert!(column.is_hidden());
///
/// school.set_value("--jiná--");
/// assert!(!column.is_hidden());
/// assert_eq!(controller.evaluation_count(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ConditionalFieldGroupController {
    inner: Rc<ControllerInner>,
    effect: Effect,
}

impl ConditionalFieldGroupController {
    /// Bind `trigger` to `dependents`, apply the current state and start
    /// following the trigger.
    ///
    /// Fails with [`ConfigurationError::MissingControl`] if the trigger does
    /// not resolve. Unresolvable dependents are not an error; they are
    /// reported by every evaluation.
    ///
    /// Inside an active [`EffectScope`](crate::EffectScope) the controller
    /// belongs to that scope. Outside one it joins the trigger's
    /// [`owner_scope`](Control::owner_scope), so it keeps following the
    /// trigger after the handle is dropped and stops when the trigger leaves
    /// its host.
    pub fn new(
        trigger: TriggerRef,
        dependents: Vec<DependentRef>,
        sentinel: impl Into<String>,
    ) -> Result<Self> {
        let control = trigger
            .resolve()
            .ok()
            .filter(|control| control.is_connected())
            .ok_or_else(|| ConfigurationError::MissingControl {
                reference: trigger.name().to_string(),
            })?;

        let owner = match get_current_scope() {
            Some(_) => None,
            None => control.owner_scope(),
        };

        let inner = Rc::new(ControllerInner {
            trigger_name: trigger.name().to_string(),
            trigger: control,
            dependents,
            sentinel: sentinel.into(),
            evaluations: Cell::new(0),
            last: RefCell::new(None),
        });

        if inner.dependents.is_empty() {
            tracing::debug!(trigger = %inner.trigger_name, "field group has no dependents");
        }

        let follow = {
            let inner = inner.clone();
            move || {
                effect_immediate(move || {
                    inner.evaluate();
                })
            }
        };

        let effect = match owner {
            Some(scope) => scope
                .run(follow)
                .ok_or_else(|| ConfigurationError::MissingControl {
                    reference: inner.trigger_name.clone(),
                })?,
            None => follow(),
        };

        tracing::info!(
            trigger = %inner.trigger_name,
            sentinel = %inner.sentinel,
            dependents = inner.dependents.len(),
            "field group controller attached"
        );

        Ok(Self { inner, effect })
    }

    /// Re-apply the visibility rule to the current trigger value.
    ///
    /// Idempotent: without a value change in between, a second call flips
    /// nothing. The read is untracked, so calling this from inside another
    /// effect does not subscribe that effect to the trigger.
    pub fn evaluate(&self) -> Evaluation {
        untrack(|| self.inner.evaluate())
    }

    /// Value that makes the group visible
    pub fn sentinel(&self) -> &str {
        &self.inner.sentinel
    }

    /// Name the trigger was referenced by
    pub fn trigger_name(&self) -> &str {
        &self.inner.trigger_name
    }

    /// The resolved trigger control
    pub fn trigger(&self) -> Rc<dyn Control> {
        self.inner.trigger.clone()
    }

    /// Dependent references, in configuration order
    pub fn dependents(&self) -> &[DependentRef] {
        &self.inner.dependents
    }

    /// Visibility applied by the latest evaluation
    pub fn is_visible(&self) -> bool {
        self.last_evaluation().is_some_and(|e| e.visible)
    }

    /// Evaluations so far, including the one at construction
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }

    pub fn last_evaluation(&self) -> Option<Evaluation> {
        self.inner.last.borrow().clone()
    }

    /// Whether the controller still follows its trigger
    pub fn is_attached(&self) -> bool {
        !self.effect.is_destroyed()
    }

    /// Stop following the trigger. Visibility is left as last applied.
    pub fn detach(&self) {
        if self.is_attached() {
            self.effect.dispose();
            tracing::info!(trigger = %self.inner.trigger_name, "field group controller detached");
        }
    }
}

impl fmt::Debug for ConditionalFieldGroupController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalFieldGroupController")
            .field("trigger", &self.inner.trigger_name)
            .field("sentinel", &self.inner.sentinel)
            .field("dependents", &self.inner.dependents.len())
            .field("evaluations", &self.evaluation_count())
            .field("attached", &self.is_attached())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::refs::Container;
    use crate::primitives::scope::{EffectScope, effect_scope};
    use crate::primitives::signal::{Signal, signal};

    struct FakeSelect(Signal<Option<String>>);

    impl FakeSelect {
        fn new(value: Option<&str>) -> Rc<Self> {
            Rc::new(Self(signal(value.map(String::from))))
        }

        fn choose(&self, value: &str) {
            self.0.set(Some(value.to_string()));
        }
    }

    impl Control for FakeSelect {
        fn value(&self) -> Option<String> {
            self.0.get()
        }
    }

    /// A select that keeps its listeners alive in a scope of its own.
    struct HostedSelect {
        value: Signal<Option<String>>,
        listeners: EffectScope,
    }

    impl Control for HostedSelect {
        fn value(&self) -> Option<String> {
            self.value.get()
        }

        fn owner_scope(&self) -> Option<EffectScope> {
            Some(self.listeners.clone())
        }
    }

    impl HostedSelect {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                value: signal(None),
                listeners: effect_scope(true),
            })
        }

        fn as_trigger(self: &Rc<Self>) -> TriggerRef {
            let control: Rc<dyn Control> = self.clone();
            TriggerRef::new("id_school", &control)
        }
    }

    #[derive(Default)]
    struct FakePanel {
        visible: Cell<bool>,
        flips: Cell<u32>,
    }

    impl Container for FakePanel {
        fn is_visible(&self) -> bool {
            self.visible.get()
        }

        fn set_visible(&self, visible: bool) -> bool {
            let changed = self.visible.replace(visible) != visible;
            if changed {
                self.flips.set(self.flips.get() + 1);
            }
            changed
        }
    }

    fn trigger_ref(select: &Rc<FakeSelect>) -> TriggerRef {
        let control: Rc<dyn Control> = select.clone();
        TriggerRef::new("id_school", &control)
    }

    fn panel_ref(name: &str, panel: &Rc<FakePanel>) -> DependentRef {
        let container: Rc<dyn Container> = panel.clone();
        DependentRef::new(name, &container)
    }

    const OTHER: &str = "--jiná--";

    #[test]
    fn applies_on_construction() {
        let select = FakeSelect::new(Some("--other-school--"));
        let panel = Rc::new(FakePanel {
            visible: Cell::new(true),
            ..Default::default()
        });
        let dep = panel_ref("alt", &panel);

        let controller = ConditionalFieldGroupController::new(trigger_ref(&select), vec![dep], OTHER)
            .expect("trigger resolves");

        assert!(!panel.is_visible());
        assert!(!controller.is_visible());
        assert_eq!(controller.evaluation_count(), 1);
    }

    #[test]
    fn follows_trigger_changes() {
        let select = FakeSelect::new(Some("--other-school--"));
        let panel = Rc::new(FakePanel::default());
        let dep = panel_ref("alt", &panel);
        let controller = ConditionalFieldGroupController::new(trigger_ref(&select), vec![dep], OTHER)
            .expect("trigger resolves");

        select.choose(OTHER);
        assert!(panel.is_visible());

        select.choose("Gymnázium X");
        assert!(!panel.is_visible());
        assert_eq!(controller.evaluation_count(), 3);
    }

    #[test]
    fn absent_value_hides() {
        let select = FakeSelect::new(None);
        let panel = Rc::new(FakePanel {
            visible: Cell::new(true),
            ..Default::default()
        });
        let dep = panel_ref("alt", &panel);

        let _controller =
            ConditionalFieldGroupController::new(trigger_ref(&select), vec![dep], OTHER)
                .expect("trigger resolves");
        assert!(!panel.is_visible());
    }

    #[test]
    fn repeated_evaluation_flips_nothing() {
        let select = FakeSelect::new(Some(OTHER));
        let panel = Rc::new(FakePanel::default());
        let dep = panel_ref("alt", &panel);
        let controller = ConditionalFieldGroupController::new(trigger_ref(&select), vec![dep], OTHER)
            .expect("trigger resolves");
        assert_eq!(panel.flips.get(), 1);

        let again = controller.evaluate();
        let third = controller.evaluate();
        assert_eq!(again, third);
        assert_eq!(again.changed, 0);
        assert_eq!(panel.flips.get(), 1);
    }

    #[test]
    fn empty_group_is_a_noop() {
        let select = FakeSelect::new(Some("x"));
        let controller = ConditionalFieldGroupController::new(trigger_ref(&select), Vec::new(), OTHER)
            .expect("trigger resolves");

        select.choose(OTHER);
        let report = controller.last_evaluation().expect("evaluated");
        assert!(report.visible);
        assert_eq!(report.applied, 0);
        assert!(report.is_complete());
    }

    #[test]
    fn missing_trigger_fails_construction() {
        let err = ConditionalFieldGroupController::new(TriggerRef::unresolved("id_scool"), Vec::new(), OTHER)
            .expect_err("unresolvable trigger");

        assert!(matches!(
            err,
            ConfigurationError::MissingControl { ref reference } if reference == "id_scool"
        ));
    }

    #[test]
    fn dropped_trigger_fails_construction() {
        let select = FakeSelect::new(None);
        let reference = trigger_ref(&select);
        drop(select);

        assert!(ConditionalFieldGroupController::new(reference, Vec::new(), OTHER).is_err());
    }

    #[test]
    fn unresolvable_dependent_does_not_block_the_rest() {
        let select = FakeSelect::new(Some("--other-school--"));
        let panel = Rc::new(FakePanel::default());
        let dep = panel_ref("alt", &panel);

        let controller = ConditionalFieldGroupController::new(
            trigger_ref(&select),
            vec![DependentRef::unresolved("id_school_alt_typo"), dep],
            OTHER,
        )
        .expect("trigger resolves");

        select.choose(OTHER);
        assert!(panel.is_visible());

        let report = controller.last_evaluation().expect("evaluated");
        assert_eq!(report.applied, 1);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].reference, "id_school_alt_typo");
        assert_eq!(report.missing[0].reason, MissingReason::Unresolved);
    }

    #[test]
    fn detach_stops_following() {
        let select = FakeSelect::new(Some("x"));
        let panel = Rc::new(FakePanel::default());
        let dep = panel_ref("alt", &panel);
        let controller = ConditionalFieldGroupController::new(trigger_ref(&select), vec![dep], OTHER)
            .expect("trigger resolves");

        controller.detach();
        assert!(!controller.is_attached());

        select.choose(OTHER);
        assert!(!panel.is_visible());
        assert_eq!(controller.evaluation_count(), 1);
    }

    #[test]
    fn dropped_handle_keeps_following_a_hosted_trigger() {
        let select = HostedSelect::new();
        let panel = Rc::new(FakePanel::default());

        drop(
            ConditionalFieldGroupController::new(
                select.as_trigger(),
                vec![panel_ref("alt", &panel)],
                OTHER,
            )
            .expect("trigger resolves"),
        );
        assert_eq!(select.listeners.effect_count(), 1);

        select.value.set(Some(OTHER.to_string()));
        assert!(panel.is_visible());

        // Host lets go of the select: the group stops following it
        select.listeners.stop();
        select.value.set(None);
        assert!(panel.is_visible());
    }

    #[test]
    fn dropped_handle_stops_an_unhosted_controller() {
        let select = FakeSelect::new(None);
        let panel = Rc::new(FakePanel::default());

        drop(
            ConditionalFieldGroupController::new(trigger_ref(&select), vec![panel_ref("alt", &panel)], OTHER)
                .expect("trigger resolves"),
        );

        select.choose(OTHER);
        assert!(!panel.is_visible());
    }

    #[test]
    fn enclosing_scope_takes_precedence_over_the_host() {
        let select = HostedSelect::new();
        let scope = effect_scope(true);

        let controller = scope
            .run(|| ConditionalFieldGroupController::new(select.as_trigger(), Vec::new(), OTHER))
            .expect("scope is active")
            .expect("trigger resolves");

        assert_eq!(scope.effect_count(), 1);
        assert_eq!(select.listeners.effect_count(), 0);

        scope.stop();
        assert!(!controller.is_attached());
    }

    #[test]
    fn stopped_host_cannot_take_new_controllers() {
        let select = HostedSelect::new();
        select.listeners.stop();

        let err = ConditionalFieldGroupController::new(select.as_trigger(), Vec::new(), OTHER)
            .expect_err("host is gone");
        assert!(matches!(err, ConfigurationError::MissingControl { .. }));
    }
}
