// ============================================================================
// spark-fields - Effect Scheduling
// Queueing dirty effects and draining the queue synchronously
// ============================================================================
//
// There is no event loop to defer to. A dirty effect runs before the write
// that dirtied it returns. A plain effect waits while a batch is open and runs
// when the outermost batch closes; an IMMEDIATE effect never waits.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::AnyReaction;
use crate::reactivity::tracking::is_dirty;

/// Flush passes allowed before a self-retriggering effect is declared a loop
const MAX_FLUSH_COUNT: u32 = 1000;

/// Restores the flushing mode on exit, panics included.
struct FlushGuard {
    was_flushing: bool,
}

impl FlushGuard {
    fn enter() -> Self {
        Self {
            was_flushing: with_context(|ctx| ctx.replace_flushing(true)),
        }
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        with_context(|ctx| ctx.replace_flushing(self.was_flushing));
    }
}

/// Run a dirty effect now, or queue it.
///
/// IMMEDIATE effects run on the spot unless their own body is what dirtied
/// them. Everything else is queued and flushed right away, unless a batch or
/// flush is already in progress.
pub fn schedule_effect(effect: Rc<dyn AnyReaction>) {
    let flags = effect.flags();

    if flags & IMMEDIATE != 0 && flags & REACTION_IS_UPDATING == 0 {
        let was_flushing = {
            let guard = FlushGuard::enter();
            effect.update();
            guard.was_flushing
        };
        // Plain effects the body dirtied are still waiting
        if !was_flushing && !with_context(|ctx| ctx.is_batching()) {
            flush_sync();
        }
        return;
    }

    let should_flush = with_context(|ctx| {
        ctx.enqueue(Rc::downgrade(&effect));
        !ctx.is_batching() && !ctx.is_flushing()
    });

    if should_flush {
        flush_sync();
    }
}

/// Run every queued effect until the queue is empty.
///
/// Effects that dirty other effects (or themselves) are picked up in the next
/// pass.
///
/// # Panics
///
/// Panics after `MAX_FLUSH_COUNT` passes, which only happens when effects keep
/// re-triggering each other.
pub fn flush_sync() {
    let _guard = FlushGuard::enter();
    let mut passes = 0u32;

    loop {
        let pending = with_context(|ctx| ctx.drain_queue());
        if pending.is_empty() {
            break;
        }

        passes += 1;
        if passes > MAX_FLUSH_COUNT {
            panic!(
                "Maximum update depth exceeded: an effect keeps re-triggering itself \
                 (more than {MAX_FLUSH_COUNT} flush passes)"
            );
        }

        tracing::trace!(count = pending.len(), pass = passes, "flushing effects");

        for reaction in pending.iter().filter_map(|w| w.upgrade()) {
            if reaction.flags() & (DESTROYED | EFFECT) != EFFECT {
                continue;
            }
            if is_dirty(&*reaction) {
                reaction.update();
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
