// ============================================================================
// spark-fields - Signal Primitive
// The writable reactive value behind every trigger control
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::types::{AnySource, EqualsFn, SourceInner};
use crate::reactivity::tracking::{notify_write, track_read};

// =============================================================================
// SIGNAL<T>
// =============================================================================

/// A reactive value. Reads inside an effect subscribe that effect; writes
/// that change the value re-run every subscriber.
///
/// # Example
///
/// ```
/// use spark_fields::signal;
///
/// let school = signal(Some(String::from("Gymnázium X")));
/// assert_eq!(school.get().as_deref(), Some("Gymnázium X"));
///
/// assert!(school.set(Some(String::from("--jiná--"))));
/// assert!(!school.set(Some(String::from("--jiná--"))));
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Current value (cloned), tracked when called inside a reaction.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.as_any_source());
        self.inner.get()
    }

    /// Borrow the current value, tracked when called inside a reaction.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.as_any_source());
        self.inner.with(f)
    }

    /// Borrow the current value without subscribing anyone.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Store `value`, notifying subscribers if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            notify_write(self.as_any_source());
        }
        changed
    }

    /// Compute a new value from the current one and store it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.inner.with(f);
        self.set(next)
    }

    /// Number of reactions currently subscribed.
    pub fn listener_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.peek(|value| f.debug_struct("Signal").field("value", value).finish())
    }
}

/// Create a new reactive signal.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a signal with a custom change test.
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}

// =============================================================================
// TESTS
// =============================================================================
