// ============================================================================
// spark-fields - Batching
// Deferring plain effects until several writes are done, and untracked reads
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduling::flush_sync;

// =============================================================================
// BATCH
// =============================================================================

/// Apply several signal writes and run the affected plain effects once
/// afterwards.
///
/// Only effects created with `effect_sync` wait for the batch to close.
/// Effects created with `effect_immediate`, which is what field group
/// controllers use, still run on every change, so visibility never lags
/// behind a trigger even inside a batch.
///
/// # Example
///
/// ```
/// use spark_fields::{batch, effect_sync, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let school = signal(String::from("Gymnázium X"));
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect_sync({
///     let school = school.clone();
///     let runs = runs.clone();
///     move || {
///         let _ = school.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     school.set(String::from("--jiná--"));
///     school.set(String::from("SPŠ Y"));
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Exits the batch even if `f` panics
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 && !std::thread::panicking() {
                flush_sync();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Read signals without registering them as dependencies.
///
/// # Example
///
/// ```
/// use spark_fields::{effect_sync, signal, untrack};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let tracked = signal(1);
/// let ignored = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect_sync({
///     let (tracked, ignored, runs) = (tracked.clone(), ignored.clone(), runs.clone());
///     move || {
///         let _ = tracked.get();
///         let _ = untrack(|| ignored.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// ignored.set(20);
/// assert_eq!(runs.get(), 1);
///
/// tracked.set(10);
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.replace_untracked(true));

    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.replace_untracked(self.prev));
        }
    }

    let _guard = UntrackGuard { prev };
    f()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::is_batching;
    use crate::primitives::effect::effect_sync;
    use crate::primitives::signal::signal;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn nested_batches_flush_once_at_the_outermost_exit() {
        let value = signal(0);
        let runs = Rc::new(Cell::new(0));

        let _effect = effect_sync({
            let (value, runs) = (value.clone(), runs.clone());
            move || {
                let _ = value.get();
                runs.set(runs.get() + 1);
            }
        });

        batch(|| {
            value.set(1);
            batch(|| value.set(2));
            assert!(is_batching());
            assert_eq!(runs.get(), 1);
        });

        assert!(!is_batching());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn batch_returns_closure_value() {
        assert_eq!(batch(|| 42), 42);
    }

    #[test]
    fn untrack_restores_previous_mode() {
        untrack(|| {
            assert!(with_context(|ctx| ctx.is_untracked()));
            untrack(|| {});
            assert!(with_context(|ctx| ctx.is_untracked()));
        });
        assert!(!with_context(|ctx| ctx.is_untracked()));
    }
}
