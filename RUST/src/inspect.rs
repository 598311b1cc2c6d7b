use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;

static MODULE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    // Matches one leading module segment such as `alloc::` in `alloc::vec::Vec<i32>`.
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*::").expect("regex")
});

/// Strip module paths from a fully qualified type name: `alloc::vec::Vec<alloc::string::String>`
/// becomes `Vec<String>`.
pub fn short_type_name(full: &str) -> String {
    MODULE_PATH_RE.replace_all(full, "").into_owned()
}

/// A value the explorer can look into.
///
/// Implementations describe the shape of a value through [`View`]. The explorer never needs to
/// know concrete types: records, sequences, maps, references and locks are all walked through the
/// view, and everything else is printed.
///
/// Records are usually implemented with [`inspect_struct!`](crate::inspect_struct), which expands
/// inside the module that defines the struct and therefore sees its private fields.
pub trait Inspect {
    /// Declared type name shown in cell headers and as a fallback preview.
    fn type_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    fn view(&self) -> View<'_>;
}

/// The explorable shape of a value.
pub enum View<'a> {
    /// Named fields in declaration order.
    Record(Vec<(&'a str, &'a dyn Inspect)>),
    /// Indexable elements.
    Sequence(&'a dyn Sequence),
    /// Key/value entries in container order (which may be unordered).
    Map(Vec<(&'a dyn Inspect, &'a dyn Inspect)>),
    /// Owning or optional reference; `None` is an empty reference.
    Pointer(Option<&'a dyn Inspect>),
    /// Value behind a lock, reachable only while the guard is held.
    Guarded(&'a dyn Guarded),
    Scalar(Scalar<'a>),
    /// Value that prints itself.
    Described(&'a dyn fmt::Display),
    /// Channels, functions and anything else with nothing to show.
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Str(&'a str),
    Int(i128),
    Uint(u128),
    Float(f64),
    Bool(bool),
    Char(char),
    Unit,
}

pub trait Sequence {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<&dyn Inspect>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arrays are explorable even when empty.
    fn is_fixed_size(&self) -> bool {
        false
    }
}

pub trait Guarded {
    /// Call `f` exactly once with the guarded value, or with `None` if it cannot be reached.
    fn with_inner(&self, f: &mut dyn FnMut(Option<&dyn Inspect>));
}

/// Implement [`Inspect`] for a struct by listing the fields to show.
///
/// ```
/// use peekgrid::inspect_struct;
///
/// struct Thing {
///     val: String,
///     arr: Vec<i32>,
/// }
/// inspect_struct!(Thing { val, arr });
///
/// struct Pair(u8, bool);
/// inspect_struct!(Pair { 0, 1 });
/// ```
#[macro_export]
macro_rules! inspect_struct {
    ($ty:ty { $($field:tt),* $(,)? }) => {
        impl $crate::Inspect for $ty {
            fn view(&self) -> $crate::View<'_> {
                $crate::View::Record(::std::vec![
                    $((::std::stringify!($field), &self.$field as &dyn $crate::Inspect)),*
                ])
            }
        }
    };
}

/// Implement [`Inspect`] for types whose preview is their `Display` output.
#[macro_export]
macro_rules! inspect_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Inspect for $ty {
                fn view(&self) -> $crate::View<'_> {
                    $crate::View::Described(self)
                }
            }
        )+
    };
}

/// Implement [`Inspect`] for types that have nothing to show beyond their type name.
#[macro_export]
macro_rules! inspect_opaque {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Inspect for $ty {
                fn view(&self) -> $crate::View<'_> {
                    $crate::View::Opaque
                }
            }
        )+
    };
}

macro_rules! inspect_signed {
    ($($t:ty),*) => {
        $(
            impl Inspect for $t {
                fn view(&self) -> View<'_> {
                    View::Scalar(Scalar::Int(*self as i128))
                }
            }
        )*
    };
}

macro_rules! inspect_unsigned {
    ($($t:ty),*) => {
        $(
            impl Inspect for $t {
                fn view(&self) -> View<'_> {
                    View::Scalar(Scalar::Uint(*self as u128))
                }
            }
        )*
    };
}

inspect_signed!(i8, i16, i32, i64, i128, isize);
inspect_unsigned!(u8, u16, u32, u64, u128, usize);

impl Inspect for f32 {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Float(*self as f64))
    }
}

impl Inspect for f64 {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Float(*self))
    }
}

impl Inspect for bool {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Bool(*self))
    }
}

impl Inspect for char {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Char(*self))
    }
}

impl Inspect for () {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Unit)
    }
}

impl Inspect for String {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Str(self))
    }
}

impl Inspect for &str {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Str(self))
    }
}

impl Inspect for Cow<'_, str> {
    fn view(&self) -> View<'_> {
        View::Scalar(Scalar::Str(self))
    }
}

impl<T: Inspect> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&dyn Inspect> {
        self.as_slice().get(index).map(|v| v as &dyn Inspect)
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn view(&self) -> View<'_> {
        View::Sequence(self)
    }
}

impl<T: Inspect, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn get(&self, index: usize) -> Option<&dyn Inspect> {
        self.as_slice().get(index).map(|v| v as &dyn Inspect)
    }

    fn is_fixed_size(&self) -> bool {
        true
    }
}

impl<T: Inspect, const N: usize> Inspect for [T; N] {
    fn view(&self) -> View<'_> {
        View::Sequence(self)
    }
}

impl<T: Inspect> Sequence for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, index: usize) -> Option<&dyn Inspect> {
        VecDeque::get(self, index).map(|v| v as &dyn Inspect)
    }
}

impl<T: Inspect> Inspect for VecDeque<T> {
    fn view(&self) -> View<'_> {
        View::Sequence(self)
    }
}

impl<K: Inspect, V: Inspect, S> Inspect for HashMap<K, V, S> {
    fn view(&self) -> View<'_> {
        View::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Inspect, v as &dyn Inspect))
                .collect(),
        )
    }
}

impl<K: Inspect, V: Inspect> Inspect for BTreeMap<K, V> {
    fn view(&self) -> View<'_> {
        View::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Inspect, v as &dyn Inspect))
                .collect(),
        )
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(self.as_ref().map(|v| v as &dyn Inspect))
    }
}

impl<T: Inspect> Inspect for Box<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(Some(&**self as &dyn Inspect))
    }
}

impl<T: Inspect> Inspect for Arc<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(Some(&**self as &dyn Inspect))
    }
}

impl<T: Inspect> Inspect for Rc<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(Some(&**self as &dyn Inspect))
    }
}

impl<A: Inspect, B: Inspect> Inspect for (A, B) {
    fn view(&self) -> View<'_> {
        View::Record(vec![
            ("0", &self.0 as &dyn Inspect),
            ("1", &self.1 as &dyn Inspect),
        ])
    }
}

impl<A: Inspect, B: Inspect, C: Inspect> Inspect for (A, B, C) {
    fn view(&self) -> View<'_> {
        View::Record(vec![
            ("0", &self.0 as &dyn Inspect),
            ("1", &self.1 as &dyn Inspect),
            ("2", &self.2 as &dyn Inspect),
        ])
    }
}

impl<T: Inspect> Guarded for Mutex<T> {
    fn with_inner(&self, f: &mut dyn FnMut(Option<&dyn Inspect>)) {
        // A panic elsewhere must not hide the value from the debugger.
        let guard = self.lock().unwrap_or_else(PoisonError::into_inner);
        f(Some(&*guard as &dyn Inspect));
    }
}

impl<T: Inspect> Inspect for Mutex<T> {
    fn view(&self) -> View<'_> {
        View::Guarded(self)
    }
}

impl<T: Inspect> Guarded for RwLock<T> {
    fn with_inner(&self, f: &mut dyn FnMut(Option<&dyn Inspect>)) {
        let guard = self.read().unwrap_or_else(PoisonError::into_inner);
        f(Some(&*guard as &dyn Inspect));
    }
}

impl<T: Inspect> Inspect for RwLock<T> {
    fn view(&self) -> View<'_> {
        View::Guarded(self)
    }
}

impl<T: Inspect> Guarded for parking_lot::Mutex<T> {
    fn with_inner(&self, f: &mut dyn FnMut(Option<&dyn Inspect>)) {
        let guard = self.lock();
        f(Some(&*guard as &dyn Inspect));
    }
}

impl<T: Inspect> Inspect for parking_lot::Mutex<T> {
    // The alias would otherwise show the raw lock parameter.
    fn type_name(&self) -> String {
        format!("Mutex<{}>", short_type_name(std::any::type_name::<T>()))
    }

    fn view(&self) -> View<'_> {
        View::Guarded(self)
    }
}

impl<T: Inspect> Guarded for parking_lot::RwLock<T> {
    fn with_inner(&self, f: &mut dyn FnMut(Option<&dyn Inspect>)) {
        let guard = self.read();
        f(Some(&*guard as &dyn Inspect));
    }
}

impl<T: Inspect> Inspect for parking_lot::RwLock<T> {
    fn type_name(&self) -> String {
        format!("RwLock<{}>", short_type_name(std::any::type_name::<T>()))
    }

    fn view(&self) -> View<'_> {
        View::Guarded(self)
    }
}

impl<T> Inspect for mpsc::Sender<T> {
    fn view(&self) -> View<'_> {
        View::Opaque
    }
}

impl<T> Inspect for mpsc::Receiver<T> {
    fn view(&self) -> View<'_> {
        View::Opaque
    }
}

impl Inspect for serde_json::Value {
    fn type_name(&self) -> String {
        use serde_json::Value;
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
        .to_string()
    }

    fn view(&self) -> View<'_> {
        use serde_json::Value;
        match self {
            Value::Null => View::Pointer(None),
            Value::Bool(b) => View::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    View::Scalar(Scalar::Int(i as i128))
                } else if let Some(u) = n.as_u64() {
                    View::Scalar(Scalar::Uint(u as u128))
                } else {
                    View::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => View::Scalar(Scalar::Str(s)),
            Value::Array(items) => View::Sequence(items),
            Value::Object(map) => View::Map(
                map.iter()
                    .map(|(k, v)| (k as &dyn Inspect, v as &dyn Inspect))
                    .collect(),
            ),
        }
    }
}

/// Whether `value` can be bound to a grid cell: a record, a non-empty sequence or map, or a
/// fixed-size array, possibly behind references and locks.
pub fn is_explorable(value: &dyn Inspect) -> bool {
    match value.view() {
        View::Record(_) => true,
        View::Sequence(seq) => seq.is_fixed_size() || !seq.is_empty(),
        View::Map(entries) => !entries.is_empty(),
        View::Pointer(inner) => matches!(inner, Some(v) if is_explorable(v)),
        View::Guarded(guarded) => {
            let mut explorable = false;
            guarded.with_inner(&mut |inner| {
                explorable = matches!(inner, Some(v) if is_explorable(v));
            });
            explorable
        }
        View::Scalar(_) | View::Described(_) | View::Opaque => false,
    }
}
