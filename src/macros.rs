// ============================================================================
// spark-fields - Capture Macros
// ============================================================================

/// Clone the listed handles into a `move` closure.
///
/// ```rust
/// use spark_fields::{cloned, effect_sync, signal};
///
/// let school = signal(String::new());
/// let shown = signal(false);
///
/// let _sync = effect_sync(cloned!(school, shown => move || {
///     shown.set(school.get() == "--jiná--");
/// }));
///
/// school.set(String::from("--jiná--"));
/// assert!(shown.get());
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a synchronous effect capturing clones of the listed handles.
///
/// ```rust
/// use spark_fields::{signal, watch};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let value = signal(1);
/// let seen = Rc::new(Cell::new(0));
///
/// let _effect = watch!(value, seen => seen.set(value.get()));
/// value.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
#[macro_export]
macro_rules! watch {
    ($($deps:ident),+ => $body:expr) => {
        $crate::effect_sync($crate::cloned!($($deps),+ => move || { $body; }))
    };
}
