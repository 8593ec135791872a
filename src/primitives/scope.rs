// ============================================================================
// spark-fields - Effect Scope
// Grouping effects so they can be disposed together
// ============================================================================
//
// A page mounts its controllers inside one scope; unloading the page stops
// the scope, which disposes every controller effect and runs the registered
// cleanups. Nested scopes are stopped with their parent.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::primitives::effect::{EffectInner, destroy_effect};

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<Rc<EffectScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

fn set_active_scope(scope: Option<Rc<EffectScopeInner>>) -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Cleanup run when a scope stops
pub type ScopeCleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// EFFECT SCOPE INNER
// =============================================================================

pub struct EffectScopeInner {
    active: Cell<bool>,
    effects: RefCell<Vec<Rc<EffectInner>>>,
    cleanups: RefCell<Vec<ScopeCleanupFn>>,
    parent: RefCell<Option<Weak<EffectScopeInner>>>,
    scopes: RefCell<Vec<Rc<EffectScopeInner>>>,
    self_weak: RefCell<Weak<EffectScopeInner>>,
}

impl EffectScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { get_active_scope() };

        let scope = Rc::new(Self {
            active: Cell::new(true),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade)),
            scopes: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });
        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);

        if let Some(parent) = parent {
            parent.scopes.borrow_mut().push(scope.clone());
        }

        scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Run `f` with this scope active. `None` once stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.active.get() {
            return None;
        }

        let this = self.self_weak.borrow().upgrade()?;

        struct RestoreScope(Option<Rc<EffectScopeInner>>);

        impl Drop for RestoreScope {
            fn drop(&mut self) {
                set_active_scope(self.0.take());
            }
        }

        let _restore = RestoreScope(set_active_scope(Some(this)));
        Some(f())
    }

    /// Dispose every effect, run cleanups in reverse order, stop children.
    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        let effects: Vec<_> = self.effects.borrow_mut().drain(..).collect();
        for effect in &effects {
            destroy_effect(effect);
        }

        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }

        let children: Vec<_> = self.scopes.borrow_mut().drain(..).collect();
        for child in children {
            child.stop();
        }

        let parent = self.parent.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(parent) = parent {
            let me = self.self_weak.borrow().as_ptr();
            parent.scopes.borrow_mut().retain(|s| !std::ptr::eq(Rc::as_ptr(s), me));
        }
    }

    pub fn effect_count(&self) -> usize {
        self.effects.borrow().len()
    }

    pub fn add_effect(&self, effect: Rc<EffectInner>) {
        self.effects.borrow_mut().push(effect);
    }

    pub fn add_cleanup(&self, cleanup: ScopeCleanupFn) {
        self.cleanups.borrow_mut().push(cleanup);
    }
}

impl Drop for EffectScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// EFFECT SCOPE
// =============================================================================

/// Handle to a group of effects disposed together.
#[derive(Clone)]
pub struct EffectScope {
    inner: Rc<EffectScopeInner>,
}

impl EffectScope {
    pub fn active(&self) -> bool {
        self.inner.is_active()
    }

    /// Run `f` with this scope active so effects created inside join it.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        self.inner.run(f)
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Number of effects owned by this scope
    pub fn effect_count(&self) -> usize {
        self.inner.effect_count()
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.active())
            .field("effects", &self.effect_count())
            .finish()
    }
}

/// Create a scope. Unless `detached`, it is nested in the active scope.
pub fn effect_scope(detached: bool) -> EffectScope {
    EffectScope {
        inner: EffectScopeInner::new(detached),
    }
}

/// The scope currently collecting effects, if any.
pub fn get_current_scope() -> Option<EffectScope> {
    get_active_scope().map(|inner| EffectScope { inner })
}

/// Register a cleanup on the active scope. Returns false outside any scope.
pub fn on_scope_dispose(cleanup: impl FnOnce() + 'static) -> bool {
    match get_active_scope() {
        Some(scope) => {
            scope.add_cleanup(Box::new(cleanup));
            true
        }
        None => false,
    }
}

pub(crate) fn register_effect_with_scope(effect: &Rc<EffectInner>) {
    if let Some(scope) = get_active_scope() {
        scope.add_effect(effect.clone());
    }
}

// =============================================================================
// TESTS
// =============================================================================
