// ============================================================================
// spark-fields - Graph Types
// Type-erased sources and reactions, and the storage behind Signal<T>
// ============================================================================
//
// Edges run both ways: a reaction owns its sources (Rc) so a trigger value
// stays alive while a controller follows it, and a source only remembers its
// subscribers weakly so a dropped effect is never kept alive by a select box.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::{DESTROYED, DIRTY, EFFECT};

/// A value holder, seen without its value type.
pub trait AnySource {
    /// Run in which this source was last recorded as a dependency
    fn last_read(&self) -> u32;

    fn mark_read(&self, run: u32);

    fn subscribe(&self, reaction: Weak<dyn AnyReaction>);

    /// Forget `reaction`, compared by allocation
    fn unsubscribe(&self, reaction: &Rc<dyn AnyReaction>);

    /// Live subscribers. Dropped ones are pruned on the way.
    fn subscribers(&self) -> Vec<Rc<dyn AnyReaction>>;
}

/// Something that re-runs when a source it read changes.
pub trait AnyReaction {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    fn push_dep(&self, source: Rc<dyn AnySource>);

    /// Remove and return every recorded dependency
    fn take_deps(&self) -> Vec<Rc<dyn AnySource>>;

    /// Re-run the body
    fn update(&self);

    fn is_effect(&self) -> bool {
        self.flags() & EFFECT != 0
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }
}

/// Decides whether a write is a change
pub type EqualsFn<T> = fn(&T, &T) -> bool;

pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// One signal value and the reactions subscribed to it.
pub struct SourceInner<T> {
    value: RefCell<T>,
    equals: EqualsFn<T>,
    last_read: Cell<u32>,
    subscribers: RefCell<Vec<Weak<dyn AnyReaction>>>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            value: RefCell::new(value),
            equals,
            last_read: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value unless `equals` says it is the same one.
    pub fn set(&self, value: T) -> bool {
        if (self.equals)(&self.value.borrow(), &value) {
            return false;
        }
        *self.value.borrow_mut() = value;
        true
    }
}

impl<T> AnySource for SourceInner<T> {
    fn last_read(&self) -> u32 {
        self.last_read.get()
    }

    fn mark_read(&self, run: u32) {
        self.last_read.set(run);
    }

    fn subscribe(&self, reaction: Weak<dyn AnyReaction>) {
        self.subscribers.borrow_mut().push(reaction);
    }

    fn unsubscribe(&self, reaction: &Rc<dyn AnyReaction>) {
        let target = Rc::as_ptr(reaction) as *const ();
        self.subscribers
            .borrow_mut()
            .retain(|weak| weak.as_ptr() as *const () != target);
    }

    fn subscribers(&self) -> Vec<Rc<dyn AnyReaction>> {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|weak| weak.strong_count() > 0);
        subscribers.iter().filter_map(Weak::upgrade).collect()
    }
}
