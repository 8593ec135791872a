// ============================================================================
// spark-fields - Dependency Tracking
// Recording reads inside reactions and propagating writes to subscribers
// ============================================================================
//
// RefCell borrows are never held across graph mutation: subscribers are
// collected into a Vec first, then marked and scheduled.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::reactivity::scheduling::schedule_effect;

// =============================================================================
// TRACK READ
// =============================================================================

/// Record `source` as read by the running reaction, once per run.
///
/// Called by `Signal::get` and `Signal::with`. Outside a reaction body, or
/// inside `untrack`, this does nothing.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if ctx.is_untracked() || !ctx.has_observer() {
            return;
        }

        let run = ctx.current_run();
        if source.last_read() != run {
            source.mark_read(run);
            ctx.collect(source);
        }
    });
}

// =============================================================================
// NOTIFY WRITE
// =============================================================================

/// Mark every live subscriber of `source` dirty and schedule the effects
/// among them.
///
/// Called by `Signal::set` after the value has been stored. Subscribers that
/// are already dirty are waiting to run; destroyed ones never run again.
pub fn notify_write(source: Rc<dyn AnySource>) {
    for reaction in source.subscribers() {
        let flags = reaction.flags();
        if flags & (DIRTY | DESTROYED) != 0 {
            continue;
        }

        reaction.set_flags(flags | DIRTY);

        if flags & EFFECT != 0 {
            schedule_effect(reaction);
        }
    }
}

/// Whether `reaction` has to re-run before its effects are current.
pub fn is_dirty(reaction: &dyn AnyReaction) -> bool {
    reaction.flags() & DIRTY != 0
}

// =============================================================================
// EDGES
// =============================================================================

/// Drop every edge between `reaction` and its sources.
pub fn unsubscribe_all(reaction: &Rc<dyn AnyReaction>) {
    for source in reaction.take_deps() {
        source.unsubscribe(reaction);
    }
}

/// Replace the sources of `reaction` with the ones read by its last run.
pub fn install_dependencies(reaction: &Rc<dyn AnyReaction>, sources: Vec<Rc<dyn AnySource>>) {
    unsubscribe_all(reaction);

    let mut seen: Vec<*const ()> = Vec::with_capacity(sources.len());
    for source in sources {
        // A nested run can re-stamp a source, so the same one may come twice
        let ptr = Rc::as_ptr(&source) as *const ();
        if seen.contains(&ptr) {
            continue;
        }
        seen.push(ptr);

        source.subscribe(Rc::downgrade(reaction));
        reaction.push_dep(source);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceInner;
    use std::cell::{Cell, RefCell};

    /// Reaction that only records its flags and sources.
    struct Listener {
        flags: Cell<u32>,
        deps: RefCell<Vec<Rc<dyn AnySource>>>,
    }

    impl Listener {
        fn new(flags: u32) -> Rc<dyn AnyReaction> {
            Rc::new(Self {
                flags: Cell::new(flags),
                deps: RefCell::new(Vec::new()),
            })
        }
    }

    impl AnyReaction for Listener {
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

        fn update(&self) {}
    }

    fn source(value: u32) -> Rc<dyn AnySource> {
        Rc::new(SourceInner::new(value))
    }

    #[test]
    fn read_outside_reaction_is_ignored() {
        let source = source(0);
        track_read(source.clone());
        assert_eq!(source.last_read(), 0);
    }

    #[test]
    fn repeated_reads_in_one_run_are_collected_once() {
        let source = source(0);
        let listener = Listener::new(0);

        let (prev_observer, prev_run, prev_collected) = with_context(|ctx| {
            (
                ctx.replace_observer(Some(Rc::downgrade(&listener))),
                ctx.enter_run(),
                ctx.replace_collected(Vec::new()),
            )
        });
        track_read(source.clone());
        track_read(source.clone());
        let collected = with_context(|ctx| {
            let collected = ctx.replace_collected(prev_collected);
            ctx.exit_run(prev_run);
            ctx.replace_observer(prev_observer);
            collected
        });

        assert_eq!(collected.len(), 1);
    }

    #[test]
    fn write_marks_subscribers_dirty() {
        let source = source(0);
        let listener = Listener::new(0);
        install_dependencies(&listener, vec![source.clone()]);

        notify_write(source);
        assert!(is_dirty(&*listener));
    }

    #[test]
    fn destroyed_subscriber_is_left_alone() {
        let source = source(0);
        let listener = Listener::new(DESTROYED);
        install_dependencies(&listener, vec![source.clone()]);

        notify_write(source);
        assert!(!is_dirty(&*listener));
    }

    #[test]
    fn install_replaces_previous_sources() {
        let a = source(1);
        let b = source(2);
        let listener = Listener::new(0);

        install_dependencies(&listener, vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(a.subscribers().len(), 1);
        assert_eq!(b.subscribers().len(), 1);

        install_dependencies(&listener, vec![b.clone()]);
        assert!(a.subscribers().is_empty());
        assert_eq!(b.subscribers().len(), 1);

        unsubscribe_all(&listener);
        assert!(b.subscribers().is_empty());
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let source = source(0);
        {
            let listener = Listener::new(0);
            install_dependencies(&listener, vec![source.clone()]);
        }
        notify_write(source.clone());
        assert!(source.subscribers().is_empty());
    }
}
