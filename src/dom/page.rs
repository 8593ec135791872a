// ============================================================================
// spark-fields - Page
// Owns the element tree, indexes it by id and hosts mounted controllers
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::element::{Element, ElementInner};
use crate::error::{ConfigurationError, MissingReason, PageError, Result};
use crate::forms::config::{FieldGroupConfig, FormConfig};
use crate::forms::controller::ConditionalFieldGroupController;
use crate::forms::refs::{DependentRef, ElementRef, TriggerRef};
use crate::forms::validation::RequiredWhenShown;
use crate::primitives::scope::{EffectScope, effect_scope};

/// Class Bulma uses to hide an element
pub const DEFAULT_HIDDEN_CLASS: &str = "is-hidden";

/// An in-memory page: the element tree plus the scope its controllers
/// live in.
pub struct Page {
    nodes: RefCell<Vec<Rc<ElementInner>>>,
    by_id: RefCell<HashMap<String, Rc<ElementInner>>>,
    hidden_class: Rc<str>,
    scope: EffectScope,
    loaded: Cell<bool>,
}

impl Page {
    pub fn new() -> Self {
        Self::with_hidden_class(DEFAULT_HIDDEN_CLASS)
    }

    pub fn with_hidden_class(hidden_class: &str) -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            by_id: RefCell::new(HashMap::new()),
            hidden_class: Rc::from(hidden_class),
            scope: effect_scope(true),
            loaded: Cell::new(true),
        }
    }

    /// A page using the hidden class named by `config`.
    pub fn for_config(config: &FormConfig) -> Self {
        Self::with_hidden_class(&config.hidden_class)
    }

    pub fn hidden_class(&self) -> &str {
        &self.hidden_class
    }

    /// Start building an element with the given tag.
    pub fn create(&self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder {
            page: self,
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            value: None,
            parent: None,
        }
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        self.by_id.borrow().get(id).cloned().map(Element::from_inner)
    }

    pub fn get(&self, id: &str) -> Result<Element, PageError> {
        self.element(id).ok_or_else(|| PageError::UnknownElement { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Remove the element with `id` and everything below it.
    ///
    /// Removed elements stay alive while someone holds a handle, but report
    /// themselves disconnected. Returns the number of elements removed.
    pub fn remove(&self, id: &str) -> Result<usize, PageError> {
        let root = self.get(id)?;

        let removed: Vec<Rc<ElementInner>> = {
            let mut nodes = self.nodes.borrow_mut();
            let (gone, kept) = nodes
                .drain(..)
                .partition(|node| root.contains(&Element::from_inner(node.clone())));
            *nodes = kept;
            gone
        };

        self.by_id.borrow_mut().retain(|_, node| {
            !removed.iter().any(|gone| Rc::ptr_eq(gone, node))
        });

        for node in &removed {
            node.disconnect();
        }

        tracing::debug!(id, count = removed.len(), "removed elements from page");
        Ok(removed.len())
    }

    /// Deliver a change notification to the control with `id`.
    ///
    /// Returns whether the value changed.
    pub fn dispatch_change(&self, id: &str, value: &str) -> Result<bool, PageError> {
        Ok(self.get(id)?.set_value(value))
    }

    // =========================================================================
    // CONTROLLERS
    // =========================================================================

    /// Resolve `config` against this page and attach a controller.
    ///
    /// The controller lives in the page scope: it keeps following its trigger
    /// even if the returned handle is dropped, until the page unloads.
    pub fn mount(&self, config: &FieldGroupConfig) -> Result<ConditionalFieldGroupController> {
        config.validate()?;

        let trigger = match self.element(&config.trigger) {
            Some(element) => element.as_trigger(),
            None => TriggerRef::unresolved(config.trigger.as_str()),
        };

        let dependents = config
            .dependents
            .iter()
            .map(|id| self.dependent_ref(id, config.container_class.as_deref()))
            .collect();

        let controller = self
            .scope
            .run(|| ConditionalFieldGroupController::new(trigger, dependents, config.sentinel.as_str()));

        match controller {
            Some(controller) => controller,
            // Unloaded pages have no live controls left to bind
            None => Err(ConfigurationError::MissingControl {
                reference: config.trigger.clone(),
            }),
        }
    }

    /// Mount one controller per group, stopping at the first failure.
    pub fn mount_all(&self, config: &FormConfig) -> Result<Vec<ConditionalFieldGroupController>> {
        config.groups.iter().map(|group| self.mount(group)).collect()
    }

    /// Completeness check for the fields of `config`.
    pub fn required_fields(&self, config: &FieldGroupConfig) -> Result<RequiredWhenShown> {
        config.validate()?;

        let trigger = self
            .element(&config.trigger)
            .map(|e| e.as_trigger())
            .unwrap_or_else(|| TriggerRef::unresolved(config.trigger.as_str()));

        let fields = config
            .dependents
            .iter()
            .map(|id| match self.element(id) {
                Some(element) => element.as_trigger(),
                None => ElementRef::unresolved(id.as_str()),
            })
            .collect();

        RequiredWhenShown::new(trigger, fields, config.sentinel.as_str())
    }

    fn dependent_ref(&self, id: &str, container_class: Option<&str>) -> DependentRef {
        let Some(field) = self.element(id) else {
            return DependentRef::unresolved(id);
        };

        let container = match container_class {
            Some(class) => field.closest(class),
            None => Some(field),
        };

        match container {
            // Named after the field so warnings point at the configured id
            Some(container) => container.as_dependent_named(id),
            None => DependentRef::missing(
                id,
                MissingReason::NoContainer {
                    class: container_class.unwrap_or_default().to_string(),
                },
            ),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub fn scope(&self) -> &EffectScope {
        &self.scope
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    /// Tear down every controller mounted on this page, and the ones
    /// following one of its elements on their own.
    pub fn unload(&self) {
        if self.loaded.replace(false) {
            let controllers = self.scope.effect_count();
            self.scope.stop();

            let nodes: Vec<Rc<ElementInner>> = self.nodes.borrow().clone();
            for node in &nodes {
                node.stop_listeners();
            }
            tracing::info!(controllers, elements = nodes.len(), "page unloaded");
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.unload();
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("elements", &self.len())
            .field("hidden_class", &&*self.hidden_class)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// =============================================================================
// ELEMENT BUILDER
// =============================================================================

/// Builder returned by [`Page::create`].
pub struct ElementBuilder<'a> {
    page: &'a Page,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    value: Option<String>,
    parent: Option<Element>,
}

impl ElementBuilder<'_> {
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn child_of(mut self, parent: &Element) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Start hidden
    pub fn hidden(self) -> Self {
        let hidden = self.page.hidden_class.to_string();
        self.class(&hidden)
    }

    /// Add the element to the page.
    pub fn insert(self) -> Result<Element, PageError> {
        let page = self.page;

        if let Some(id) = &self.id {
            if page.by_id.borrow().contains_key(id) {
                return Err(PageError::DuplicateId { id: id.clone() });
            }
        }

        let inner = ElementInner::new(
            &self.tag,
            self.id.clone(),
            self.classes,
            self.value,
            self.parent.as_ref(),
            page.hidden_class.clone(),
        );

        if let Some(id) = self.id {
            page.by_id.borrow_mut().insert(id, inner.clone());
        }
        page.nodes.borrow_mut().push(inner.clone());

        Ok(Element::from_inner(inner))
    }
}

// =============================================================================
// TESTS
// =============================================================================
