// ============================================================================
// spark-fields - Element References
// The seams between controllers and whatever hosts the controls
// ============================================================================
//
// Controllers never look anything up by themselves. They are handed
// references to a trigger control and to dependent containers; a reference
// is either bound to a live object (held weakly, the host owns it) or records
// why it could not be bound.
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::MissingReason;
use crate::primitives::scope::EffectScope;

/// A single-value control, such as a select box.
pub trait Control {
    /// Current value, `None` when nothing is selected or entered.
    ///
    /// Implementations back this with a signal so that a read inside an
    /// effect subscribes the effect to value changes.
    fn value(&self) -> Option<String>;

    /// Whether the control is still part of its host.
    fn is_connected(&self) -> bool {
        true
    }

    /// Scope that keeps listeners of this control running for as long as the
    /// control stays in its host.
    ///
    /// A controller created outside any scope joins it, so dropping the
    /// controller handle does not stop the group from following the control.
    /// `None` ties the controller to its handle instead.
    fn owner_scope(&self) -> Option<EffectScope> {
        None
    }
}

/// Something that can be shown or hidden.
pub trait Container {
    fn is_visible(&self) -> bool;

    /// Show or hide. Returns whether the state actually changed.
    fn set_visible(&self, visible: bool) -> bool;

    fn is_connected(&self) -> bool {
        true
    }
}

enum Binding<T: ?Sized> {
    Bound(Weak<T>),
    Missing(MissingReason),
}

/// A named reference to a host-owned object.
pub struct ElementRef<T: ?Sized> {
    name: String,
    binding: Binding<T>,
}

/// Reference to the control whose value decides visibility
pub type TriggerRef = ElementRef<dyn Control>;

/// Reference to one dependent container
pub type DependentRef = ElementRef<dyn Container>;

impl<T: ?Sized> ElementRef<T> {
    /// Bind `name` to a live object. Only a weak reference is kept.
    pub fn new(name: impl Into<String>, target: &Rc<T>) -> Self {
        Self {
            name: name.into(),
            binding: Binding::Bound(Rc::downgrade(target)),
        }
    }

    /// A reference that could not be bound, for the given reason.
    pub fn missing(name: impl Into<String>, reason: MissingReason) -> Self {
        Self {
            name: name.into(),
            binding: Binding::Missing(reason),
        }
    }

    /// A reference whose target was never found.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::missing(name, MissingReason::Unresolved)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upgrade to the live object.
    pub fn resolve(&self) -> Result<Rc<T>, MissingReason> {
        match &self.binding {
            Binding::Bound(weak) => weak.upgrade().ok_or(MissingReason::Removed),
            Binding::Missing(reason) => Err(reason.clone()),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }
}

impl<T: ?Sized> Clone for ElementRef<T> {
    fn clone(&self) -> Self {
        let binding = match &self.binding {
            Binding::Bound(weak) => Binding::Bound(weak.clone()),
            Binding::Missing(reason) => Binding::Missing(reason.clone()),
        };
        Self {
            name: self.name.clone(),
            binding,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ElementRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ElementRef");
        out.field("name", &self.name);
        match &self.binding {
            Binding::Bound(weak) => out.field("live", &(weak.strong_count() > 0)),
            Binding::Missing(reason) => out.field("missing", reason),
        };
        out.finish()
    }
}
