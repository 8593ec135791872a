// ============================================================================
// spark-fields - Reactive Context
// Per-thread record of the running reaction and the effects waiting to run
// ============================================================================
//
// Every write comes from the thread that owns the page, so one context per
// thread is the whole story: at most one reaction body is current, reads are
// attributed to it, and dirty effects wait in a single queue.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource};

#[derive(Default)]
pub struct ReactiveContext {
    /// Reaction whose body is executing
    observer: RefCell<Option<Weak<dyn AnyReaction>>>,
    untracked: Cell<bool>,
    /// Id of the current run; sources read in it carry the same id
    run: Cell<u32>,
    runs_started: Cell<u32>,
    /// Sources read so far by the current run
    collected: RefCell<Vec<Rc<dyn AnySource>>>,
    batch_depth: Cell<u32>,
    queue: RefCell<Vec<Weak<dyn AnyReaction>>>,
    flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn has_observer(&self) -> bool {
        self.observer.borrow().is_some()
    }

    pub fn replace_observer(
        &self,
        observer: Option<Weak<dyn AnyReaction>>,
    ) -> Option<Weak<dyn AnyReaction>> {
        self.observer.replace(observer)
    }

    pub fn is_untracked(&self) -> bool {
        self.untracked.get()
    }

    pub fn replace_untracked(&self, untracked: bool) -> bool {
        self.untracked.replace(untracked)
    }

    /// Start a fresh run. Returns the id of the run it interrupts.
    pub fn enter_run(&self) -> u32 {
        let id = self.runs_started.get().wrapping_add(1).max(1);
        self.runs_started.set(id);
        self.run.replace(id)
    }

    pub fn exit_run(&self, previous: u32) {
        self.run.set(previous);
    }

    pub fn current_run(&self) -> u32 {
        self.run.get()
    }

    pub fn collect(&self, source: Rc<dyn AnySource>) {
        self.collected.borrow_mut().push(source);
    }

    pub fn replace_collected(&self, sources: Vec<Rc<dyn AnySource>>) -> Vec<Rc<dyn AnySource>> {
        self.collected.replace(sources)
    }

    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Leave one batch level; unbalanced exits stay at zero.
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn enqueue(&self, effect: Weak<dyn AnyReaction>) {
        self.queue.borrow_mut().push(effect);
    }

    pub fn drain_queue(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.queue.take()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    pub fn replace_flushing(&self, flushing: bool) -> bool {
        self.flushing.replace(flushing)
    }
}

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::default();
}

pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// True inside a reaction body, outside `untrack`.
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_observer() && !ctx.is_untracked())
}

pub fn is_batching() -> bool {
    with_context(ReactiveContext::is_batching)
}
