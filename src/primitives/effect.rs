// ============================================================================
// spark-fields - Effect System
// Side effects that run once on creation and again after every change
// ============================================================================
//
// An effect body is tracked like any reaction: whatever signals it reads
// become its dependencies for the next run. Effects here are synchronous,
// which is what the "apply on load, then on each change" contract of the
// form controllers needs.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::primitives::scope::register_effect_with_scope;
use crate::reactivity::tracking::{install_dependencies, unsubscribe_all};

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Cleanup returned by an effect body; runs before the next run and on disposal
pub type CleanupFn = Box<dyn FnOnce()>;

/// Effect body
pub type EffectFn = Box<dyn FnMut() -> Option<CleanupFn>>;

// =============================================================================
// EFFECT INNER
// =============================================================================

/// Graph node for one effect.
pub struct EffectInner {
    flags: Cell<u32>,

    /// Number of completed runs
    runs: Cell<u64>,

    func: RefCell<Option<EffectFn>>,

    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    teardown: RefCell<Option<CleanupFn>>,

    self_weak: RefCell<Weak<EffectInner>>,
}

impl EffectInner {
    pub fn new(kind: u32, func: EffectFn) -> Rc<Self> {
        let effect = Rc::new(Self {
            flags: Cell::new(kind | DIRTY),
            runs: Cell::new(0),
            func: RefCell::new(Some(func)),
            deps: RefCell::new(Vec::new()),
            teardown: RefCell::new(None),
            self_weak: RefCell::new(Weak::new()),
        });

        *effect.self_weak.borrow_mut() = Rc::downgrade(&effect);
        effect
    }

    /// This effect as a type-erased weak reaction
    pub fn as_weak_reaction(&self) -> Weak<dyn AnyReaction> {
        match self.self_weak.borrow().upgrade() {
            Some(rc) => Rc::downgrade(&(rc as Rc<dyn AnyReaction>)),
            None => Weak::<EffectInner>::new() as Weak<dyn AnyReaction>,
        }
    }

    pub fn run_count(&self) -> u64 {
        self.runs.get()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        if let Some(cleanup) = self.teardown.get_mut().take() {
            cleanup();
        }
    }
}

impl AnyReaction for EffectInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn push_dep(&self, source: Rc<dyn AnySource>) {
        self.deps.borrow_mut().push(source);
    }

    fn take_deps(&self) -> Vec<Rc<dyn AnySource>> {
        self.deps.take()
    }

    fn update(&self) {
        let this = self.self_weak.borrow().upgrade();
        if let Some(effect) = this {
            update_effect(&effect);
        }
    }
}

// =============================================================================
// EFFECT HANDLE
// =============================================================================

/// Owning handle to an effect.
///
/// Dropping the last handle disposes the effect unless an `EffectScope`
/// still holds it; the scope then disposes it when stopped.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    pub fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.flags.get() & DESTROYED != 0
    }

    /// Number of times the body has run
    pub fn run_count(&self) -> u64 {
        self.inner.run_count()
    }

    /// Stop the effect: detach it from its sources and run its cleanup.
    pub fn dispose(&self) {
        destroy_effect(&self.inner);
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("runs", &self.run_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

fn execute_teardown(effect: &EffectInner) {
    let teardown = effect.teardown.borrow_mut().take();
    if let Some(cleanup) = teardown {
        cleanup();
    }
}

/// Destroy an effect. Idempotent.
pub fn destroy_effect(effect: &Rc<EffectInner>) {
    if effect.flags.get() & DESTROYED != 0 {
        return;
    }

    unsubscribe_all(&(effect.clone() as Rc<dyn AnyReaction>));
    effect.set_flags(effect.flags() | DESTROYED);
    execute_teardown(effect);

    // The body may own handles to this effect; dropping it breaks the cycle.
    // While the body is running it is borrowed, and update_effect drops it.
    let func = effect.func.try_borrow_mut().ok().and_then(|mut slot| slot.take());
    drop(func);
}

/// Run an effect body with dependency tracking.
///
/// Previous dependencies are replaced by whatever this run reads.
pub fn update_effect(effect: &Rc<EffectInner>) {
    if effect.flags.get() & DESTROYED != 0 {
        return;
    }

    effect.set_flags(effect.flags() & !DIRTY);
    execute_teardown(effect);

    let (prev_observer, prev_run, prev_collected) = with_context(|ctx| {
        (
            ctx.replace_observer(Some(effect.as_weak_reaction())),
            ctx.enter_run(),
            ctx.replace_collected(Vec::new()),
        )
    });
    effect.set_flags(effect.flags() | REACTION_IS_UPDATING);

    let teardown = {
        let mut func = effect.func.borrow_mut();
        match func.as_mut() {
            Some(body) => body(),
            None => None,
        }
    };

    effect.set_flags(effect.flags() & !REACTION_IS_UPDATING);
    let sources = with_context(|ctx| {
        let collected = ctx.replace_collected(prev_collected);
        ctx.exit_run(prev_run);
        ctx.replace_observer(prev_observer);
        collected
    });

    effect.runs.set(effect.runs.get() + 1);

    // Disposed from inside its own body: keep it detached and clean up now
    if effect.flags.get() & DESTROYED != 0 {
        let func = effect.func.borrow_mut().take();
        drop(func);
        if let Some(cleanup) = teardown {
            cleanup();
        }
        return;
    }

    install_dependencies(&(effect.clone() as Rc<dyn AnyReaction>), sources);
    *effect.teardown.borrow_mut() = teardown;
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect that runs now and again after every change of the
/// signals it read.
///
/// # Example
///
/// ```
/// use spark_fields::{effect_sync, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let school = signal(String::from("Gymnázium X"));
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let handle = effect_sync({
///     let (school, log) = (school.clone(), log.clone());
///     move || log.borrow_mut().push(school.get())
/// });
///
/// school.set(String::from("--jiná--"));
/// assert_eq!(*log.borrow(), ["Gymnázium X", "--jiná--"]);
///
/// handle.dispose();
/// school.set(String::from("SPŠ Y"));
/// assert_eq!(log.borrow().len(), 2);
/// ```
pub fn effect_sync<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    effect_sync_with_cleanup(move || {
        f();
        None
    })
}

/// Like [`effect_sync`], with a body that may return a cleanup.
pub fn effect_sync_with_cleanup<F>(f: F) -> Effect
where
    F: FnMut() -> Option<CleanupFn> + 'static,
{
    create_effect(EFFECT, Box::new(f))
}

/// Like [`effect_sync`], but the effect also runs inside an open
/// [`batch`](crate::batch) instead of waiting for it to close.
///
/// # Example
///
/// ```
/// use spark_fields::{batch, effect_immediate, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let school = signal(String::from("Gymnázium X"));
/// let seen = Rc::new(RefCell::new(String::new()));
///
/// let _handle = effect_immediate({
///     let (school, seen) = (school.clone(), seen.clone());
///     move || *seen.borrow_mut() = school.get()
/// });
///
/// batch(|| {
///     school.set(String::from("--jiná--"));
///     assert_eq!(*seen.borrow(), "--jiná--");
/// });
/// ```
pub fn effect_immediate<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    create_effect(
        EFFECT | IMMEDIATE,
        Box::new(move || {
            f();
            None
        }),
    )
}

fn create_effect(kind: u32, func: EffectFn) -> Effect {
    let inner = EffectInner::new(kind, func);
    register_effect_with_scope(&inner);
    update_effect(&inner);
    Effect { inner }
}

/// Whether code is running inside a reaction body.
pub fn effect_tracking() -> bool {
    with_context(|ctx| ctx.has_observer())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;

    #[test]
    fn runs_on_creation_and_on_change() {
        let value = signal(0);
        let handle = effect_sync({
            let value = value.clone();
            move || {
                let _ = value.get();
            }
        });
        assert_eq!(handle.run_count(), 1);

        value.set(1);
        value.set(2);
        assert_eq!(handle.run_count(), 3);
    }

    #[test]
    fn unchanged_write_does_not_rerun() {
        let value = signal("a");
        let handle = effect_sync({
            let value = value.clone();
            move || {
                let _ = value.get();
            }
        });

        value.set("a");
        assert_eq!(handle.run_count(), 1);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let value = signal(0);
        let cleanups = Rc::new(Cell::new(0));

        let handle = effect_sync_with_cleanup({
            let (value, cleanups) = (value.clone(), cleanups.clone());
            move || {
                let _ = value.get();
                let cleanups = cleanups.clone();
                Some(Box::new(move || cleanups.set(cleanups.get() + 1)) as CleanupFn)
            }
        });
        assert_eq!(cleanups.get(), 0);

        value.set(1);
        assert_eq!(cleanups.get(), 1);

        handle.dispose();
        assert_eq!(cleanups.get(), 2);
        assert!(handle.is_destroyed());
    }

    #[test]
    fn dependencies_follow_the_last_run() {
        let use_a = signal(true);
        let a = signal(0);
        let b = signal(0);

        let handle = effect_sync({
            let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
            move || {
                if use_a.get() {
                    let _ = a.get();
                } else {
                    let _ = b.get();
                }
            }
        });

        use_a.set(false);
        assert_eq!(handle.run_count(), 2);

        a.set(1);
        assert_eq!(handle.run_count(), 2);
        assert_eq!(a.listener_count(), 0);

        b.set(1);
        assert_eq!(handle.run_count(), 3);
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let value = signal(0);
        let runs = Rc::new(Cell::new(0));

        {
            let _handle = effect_sync({
                let (value, runs) = (value.clone(), runs.clone());
                move || {
                    let _ = value.get();
                    runs.set(runs.get() + 1);
                }
            });
        }

        value.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn tracking_flag_is_set_inside_body() {
        assert!(!effect_tracking());
        let inside = Rc::new(Cell::new(false));
        let _handle = effect_sync({
            let inside = inside.clone();
            move || inside.set(effect_tracking())
        });
        assert!(inside.get());
    }
}
