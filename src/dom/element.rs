// ============================================================================
// spark-fields - Page Elements
// Host-owned nodes: class lists, parent links and a reactive value
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::forms::refs::{Container, Control, DependentRef, TriggerRef};
use crate::primitives::scope::{EffectScope, effect_scope};
use crate::primitives::signal::{Signal, signal};

// =============================================================================
// ELEMENT INNER
// =============================================================================

pub struct ElementInner {
    id: Option<String>,
    tag: String,
    classes: RefCell<Vec<String>>,
    value: Signal<Option<String>>,
    parent: RefCell<Weak<ElementInner>>,
    /// Class that marks the element as hidden, shared by the whole page
    hidden_class: Rc<str>,
    /// Class-list changes so far
    mutations: Cell<u64>,
    connected: Cell<bool>,
    /// Controllers following this element's value without a scope of their own
    listeners: EffectScope,
}

impl ElementInner {
    pub(crate) fn new(
        tag: &str,
        id: Option<String>,
        classes: Vec<String>,
        value: Option<String>,
        parent: Option<&Element>,
        hidden_class: Rc<str>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            tag: tag.to_string(),
            classes: RefCell::new(classes),
            value: signal(value),
            parent: RefCell::new(parent.map(|p| Rc::downgrade(&p.inner)).unwrap_or_default()),
            hidden_class,
            mutations: Cell::new(0),
            connected: Cell::new(true),
            listeners: effect_scope(true),
        })
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().iter().any(|c| c == class)
    }

    fn add_class(&self, class: &str) -> bool {
        if self.has_class(class) {
            return false;
        }
        self.classes.borrow_mut().push(class.to_string());
        self.mutations.set(self.mutations.get() + 1);
        true
    }

    fn remove_class(&self, class: &str) -> bool {
        let mut classes = self.classes.borrow_mut();
        let before = classes.len();
        classes.retain(|c| c != class);
        let changed = classes.len() != before;
        if changed {
            self.mutations.set(self.mutations.get() + 1);
        }
        changed
    }

    /// Take the element off its page; whatever it kept running stops.
    pub(crate) fn disconnect(&self) {
        self.connected.set(false);
        self.stop_listeners();
    }

    pub(crate) fn stop_listeners(&self) {
        self.listeners.stop();
    }
}

impl Control for ElementInner {
    fn value(&self) -> Option<String> {
        self.value.get()
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn owner_scope(&self) -> Option<EffectScope> {
        Some(self.listeners.clone())
    }
}

impl Container for ElementInner {
    fn is_visible(&self) -> bool {
        !self.has_class(&self.hidden_class)
    }

    fn set_visible(&self, visible: bool) -> bool {
        if visible {
            self.remove_class(&self.hidden_class)
        } else {
            self.add_class(&self.hidden_class)
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Handle to a page element.
#[derive(Clone)]
pub struct Element {
    pub(crate) inner: Rc<ElementInner>,
}

impl Element {
    pub(crate) fn from_inner(inner: Rc<ElementInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Id if present, otherwise the tag; used to name references.
    pub fn label(&self) -> String {
        self.inner
            .id
            .clone()
            .unwrap_or_else(|| format!("<{}>", self.inner.tag))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.inner.has_class(class)
    }

    /// Returns whether the class list changed.
    pub fn add_class(&self, class: &str) -> bool {
        self.inner.add_class(class)
    }

    /// Returns whether the class list changed.
    pub fn remove_class(&self, class: &str) -> bool {
        self.inner.remove_class(class)
    }

    /// Space-separated class list, in insertion order
    pub fn class_name(&self) -> String {
        self.inner.classes.borrow().join(" ")
    }

    pub fn parent(&self) -> Option<Element> {
        self.inner.parent.borrow().upgrade().map(Element::from_inner)
    }

    /// This element or its nearest ancestor carrying `class`.
    pub fn closest(&self, class: &str) -> Option<Element> {
        let mut current = Some(self.clone());
        while let Some(element) = current {
            if element.has_class(class) {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }

    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element.ptr_eq(self) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Current value, tracked inside effects.
    pub fn value(&self) -> Option<String> {
        self.inner.value.get()
    }

    /// Change the value and notify listeners. Returns whether it changed.
    pub fn set_value(&self, value: impl Into<String>) -> bool {
        self.inner.value.set(Some(value.into()))
    }

    /// Clear the value. Returns whether it changed.
    pub fn clear_value(&self) -> bool {
        self.inner.value.set(None)
    }

    /// Number of reactions following this element's value
    pub fn listener_count(&self) -> usize {
        self.inner.value.listener_count()
    }

    pub fn is_hidden(&self) -> bool {
        !self.inner.is_visible()
    }

    /// Class-list changes applied to this element so far
    pub fn mutation_count(&self) -> u64 {
        self.inner.mutations.get()
    }

    /// False once the element has been removed from its page
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_trigger(&self) -> TriggerRef {
        let control: Rc<dyn Control> = self.inner.clone();
        TriggerRef::new(self.label(), &control)
    }

    pub fn as_dependent(&self) -> DependentRef {
        self.as_dependent_named(self.label())
    }

    /// Dependent reference reported under `name` instead of this element's label.
    pub fn as_dependent_named(&self, name: impl Into<String>) -> DependentRef {
        let container: Rc<dyn Container> = self.inner.clone();
        DependentRef::new(name, &container)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.inner.tag)
            .field("id", &self.inner.id)
            .field("class", &self.class_name())
            .field("value", &self.inner.value.peek(Clone::clone))
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
