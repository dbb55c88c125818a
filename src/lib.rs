//! Lazy, transparent object proxies.
//!
//! A [`Proxy`] stands in for a value of the dynamic object model in
//! [`value`]. It either holds that value outright, or holds a factory that
//! builds it the first time anything needs it. Every operation the object model
//! knows about (arithmetic, comparison, hashing, attribute access, containers,
//! calls, context managers, introspection) is routed through a single
//! resolution point and then forwarded, so code that handles a proxy cannot tell
//! it apart from the value it wraps.
//!
//! Proxies may be specialized at runtime with a [`ProxyClass`], which carries
//! class attributes, computed properties and attribute hooks, and may keep state
//! of their own under the `_self_` prefix without it ever reaching the wrapped
//! value.
//!
//! ```
//! use sloth::{Proxy, Value};
//!
//! let proxy = Proxy::lazy_fn(|| Ok(Value::from(vec![1, 2, 3])));
//! assert!(!proxy.is_resolved());
//! assert_eq!(proxy.len().unwrap(), 3);
//! assert!(proxy.is_resolved());
//! ```
#![allow(clippy::new_ret_no_self)]

pub mod error;
pub mod proxy;
pub mod value;

pub use error::{Result, SlothError};
pub use proxy::{
    class::{DelNext, GetNext, Property, ProxyClass, ProxyClassBuilder, SetNext},
    Proxy,
};
pub use value::{
    class::{Class, Object},
    dict::Dict,
    function::{Args, Function, Method, MethodKind},
    iter::{Iter, ValueIter},
    ops::{BinaryOp, CompareOp},
    Builtin, Slice, Value,
};

pub type SlothInteger = i64;
pub type SlothFloat = f64;

pub(crate) mod keywords {
    /// Attribute names starting with this belong to the proxy itself.
    pub(crate) const OWN_PREFIX: &str = "_self_";

    pub(crate) const CALL: &str = "__call__";
    pub(crate) const CLASS: &str = "__class__";
    pub(crate) const DICT: &str = "__dict__";
    pub(crate) const DOC: &str = "__doc__";
    pub(crate) const FACTORY: &str = "__factory__";
    pub(crate) const FUNC: &str = "__func__";
    pub(crate) const INIT: &str = "__init__";
    pub(crate) const MODULE: &str = "__module__";
    pub(crate) const NAME: &str = "__name__";
    pub(crate) const QUALNAME: &str = "__qualname__";
    pub(crate) const SELF: &str = "__self__";
    pub(crate) const WRAPPED: &str = "__wrapped__";

    pub(crate) const ABS: &str = "__abs__";
    pub(crate) const BOOL: &str = "__bool__";
    pub(crate) const BYTES: &str = "__bytes__";
    pub(crate) const CONTAINS: &str = "__contains__";
    pub(crate) const DELITEM: &str = "__delitem__";
    pub(crate) const DIVMOD: &str = "__divmod__";
    pub(crate) const ENTER: &str = "__enter__";
    pub(crate) const EQ: &str = "__eq__";
    pub(crate) const EXIT: &str = "__exit__";
    pub(crate) const FLOAT: &str = "__float__";
    pub(crate) const FORMAT: &str = "__format__";
    pub(crate) const GETITEM: &str = "__getitem__";
    pub(crate) const HASH: &str = "__hash__";
    pub(crate) const INDEX: &str = "__index__";
    pub(crate) const INT: &str = "__int__";
    pub(crate) const INVERT: &str = "__invert__";
    pub(crate) const ITER: &str = "__iter__";
    pub(crate) const LEN: &str = "__len__";
    pub(crate) const NE: &str = "__ne__";
    pub(crate) const NEG: &str = "__neg__";
    pub(crate) const NEXT: &str = "__next__";
    pub(crate) const POS: &str = "__pos__";
    pub(crate) const RDIVMOD: &str = "__rdivmod__";
    pub(crate) const REPR: &str = "__repr__";
    pub(crate) const REVERSED: &str = "__reversed__";
    pub(crate) const ROUND: &str = "__round__";
    pub(crate) const SETITEM: &str = "__setitem__";
    pub(crate) const STR: &str = "__str__";
}

// The shared-reference representation is picked by cargo feature. `single`
// wins if both are turned on.
cfg_if::cfg_if! {
    if #[cfg(feature = "single")] {
        pub type RcType<T> = std::rc::Rc<T>;
        pub type RefType<T> = std::rc::Rc<std::cell::RefCell<T>>;

        impl<T> NewRef<T> for RefType<T> {
            fn new_ref(value: T) -> RefType<T> {
                std::rc::Rc::new(std::cell::RefCell::new(value))
            }
        }

        /// Bound placed on everything stored inside a value.
        ///
        /// With the `single` feature this is every type.
        pub trait Shareable {}
        impl<T: ?Sized> Shareable for T {}

        pub(crate) fn ref_addr<T>(r: &RefType<T>) -> usize {
            std::rc::Rc::as_ptr(r) as *const () as usize
        }

        pub(crate) fn rc_addr<T: ?Sized>(r: &RcType<T>) -> usize {
            std::rc::Rc::as_ptr(r) as *const () as usize
        }
    } else {
        pub type RcType<T> = std::sync::Arc<T>;
        pub type RefType<T> = std::sync::Arc<parking_lot::RwLock<T>>;

        impl<T> NewRef<T> for RefType<T> {
            fn new_ref(value: T) -> RefType<T> {
                std::sync::Arc::new(parking_lot::RwLock::new(value))
            }
        }

        /// Bound placed on everything stored inside a value.
        ///
        /// Without the `single` feature values cross threads, so this is
        /// `Send + Sync`.
        pub trait Shareable: Send + Sync {}
        impl<T: ?Sized + Send + Sync> Shareable for T {}

        pub(crate) fn ref_addr<T>(r: &RefType<T>) -> usize {
            std::sync::Arc::as_ptr(r) as *const () as usize
        }

        pub(crate) fn rc_addr<T: ?Sized>(r: &RcType<T>) -> usize {
            std::sync::Arc::as_ptr(r) as *const () as usize
        }
    }
}

/// The type of a shared callable, `Send + Sync` unless `single` is on.
#[cfg(feature = "single")]
macro_rules! shared_fn {
    ($($sig:tt)*) => {
        std::rc::Rc<dyn $($sig)*>
    };
}

#[cfg(not(feature = "single"))]
macro_rules! shared_fn {
    ($($sig:tt)*) => {
        std::sync::Arc<dyn $($sig)* + Send + Sync>
    };
}
pub(crate) use shared_fn;

pub trait NewRef<T> {
    fn new_ref(value: T) -> RefType<T>;
}

#[macro_export]
macro_rules! new_ref {
    ($type:ty, $value:expr) => {
        <$crate::RefType<$type> as $crate::NewRef<$type>>::new_ref($value)
    };
}

// Macros to abstract the underlying read/write operations.
#[cfg(feature = "single")]
#[macro_export]
macro_rules! s_read {
    ($arg:expr) => {
        $arg.borrow()
    };
}

#[cfg(feature = "single")]
#[macro_export]
macro_rules! s_write {
    ($arg:expr) => {
        $arg.borrow_mut()
    };
}

#[cfg(not(feature = "single"))]
#[macro_export]
macro_rules! s_read {
    ($arg:expr) => {
        $arg.read()
    };
}

#[cfg(not(feature = "single"))]
#[macro_export]
macro_rules! s_write {
    ($arg:expr) => {
        $arg.write()
    };
}

macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}
pub(crate) use function;

macro_rules! debug {
    ($target:literal, $($arg:tt)*) => {
        log::debug!(
            target: $target,
            "{}: {}\n  --> {}:{}:{}",
            ansi_term::Colour::Cyan.dimmed().italic().paint($crate::function!()),
            format_args!($($arg)*),
            file!(),
            line!(),
            column!()
        );
    };
}
pub(crate) use debug;

macro_rules! trace {
    ($target:literal, $($arg:tt)*) => {
        log::trace!(
            target: $target,
            "{}: {}\n  --> {}:{}:{}",
            ansi_term::Colour::Purple.dimmed().italic().paint($crate::function!()),
            format_args!($($arg)*),
            file!(),
            line!(),
            column!()
        );
    };
}
pub(crate) use trace;
