//! The lazy proxy
//!
//! A [`Proxy`] is a shared handle; cloning it aliases the same proxy. Its
//! state is the wrapped target, the proxy's own attributes and any instance
//! level overrides of class attributes. The target is either a concrete value
//! or a factory that produces one. Everything that needs the value goes
//! through [`Proxy::wrapped`], which runs the factory the first time and keeps
//! the result.
//!
//! A factory that fails leaves the proxy unresolved. The next access runs it
//! again.
use std::fmt;

use rustc_hash::FxHashMap as HashMap;

use crate::{
    debug,
    error::{BadValueSnafu, Result, SlothError},
    new_ref, ref_addr, s_read, s_write, trace,
    value::{
        function::{Args, Function},
        ops::{BinaryOp, CompareOp},
    },
    RefType, Shareable, SlothFloat, SlothInteger, Value,
};

pub mod class;
mod router;

use class::ProxyClass;

#[derive(Clone, Debug)]
enum Target {
    /// Allocated, but the constructor hasn't installed a target yet.
    Unset,
    Lazy { factory: Value },
    /// `factory` is kept for `__factory__` once the value is known.
    Ready {
        value: Value,
        factory: Option<Value>,
    },
}

#[derive(Debug)]
struct ProxyState {
    class: ProxyClass,
    target: Target,
    /// `_self_` attributes, stored without the prefix.
    own: HashMap<String, Value>,
    /// Instance values for names the proxy class defines.
    shadows: HashMap<String, Value>,
}

/// A lazy, transparent proxy
#[derive(Clone)]
pub struct Proxy(RefType<ProxyState>);

impl Proxy {
    /// Wrap a value that already exists.
    pub fn new<V: Into<Value>>(value: V) -> Self {
        let proxy = Proxy::allocate(ProxyClass::base());
        proxy.install(Target::Ready {
            value: value.into(),
            factory: None,
        });
        proxy
    }

    /// Wrap the value `factory` returns when called with no arguments.
    ///
    /// The factory runs the first time the proxy is used for anything other
    /// than its own attributes.
    pub fn lazy<V: Into<Value>>(factory: V) -> Self {
        let proxy = Proxy::allocate(ProxyClass::base());
        proxy.install(Target::Lazy {
            factory: factory.into(),
        });
        proxy
    }

    /// [`Proxy::lazy`], with a Rust closure as the factory.
    pub fn lazy_fn<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Value> + Shareable + 'static,
    {
        Proxy::lazy(Function::new("<factory>", move |_: &Args| factory()))
    }

    /// A proxy of `class` with nothing installed yet.
    pub(crate) fn allocate(class: ProxyClass) -> Self {
        Proxy(new_ref!(
            ProxyState,
            ProxyState {
                class,
                target: Target::Unset,
                own: HashMap::default(),
                shadows: HashMap::default(),
            }
        ))
    }

    fn install(&self, target: Target) {
        s_write!(self.0).target = target;
    }

    pub fn class(&self) -> ProxyClass {
        s_read!(self.0).class.clone()
    }

    pub fn class_name(&self) -> String {
        self.class().name()
    }

    pub fn id(&self) -> usize {
        ref_addr(&self.0)
    }

    /// Whether two handles are the same proxy.
    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        self.id() == other.id()
    }

    /// Whether the wrapped value is known. Never resolves.
    pub fn is_resolved(&self) -> bool {
        matches!(s_read!(self.0).target, Target::Ready { .. })
    }

    /// The wrapped value, resolving it if need be.
    pub fn wrapped(&self) -> Result<Value> {
        let factory = match &s_read!(self.0).target {
            Target::Ready { value, .. } => return Ok(value.clone()),
            Target::Lazy { factory } => factory.clone(),
            Target::Unset => {
                return BadValueSnafu {
                    message: "wrapper has not been initialized",
                }
                .fail()
            }
        };
        self.materialize(factory)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn materialize(&self, factory: Value) -> Result<Value> {
        debug!("proxy", "resolving proxy at {:#x}", self.id());
        let value = factory.call(&Args::default())?;

        let mut state = s_write!(self.0);
        let settled = match &state.target {
            Target::Ready { value, .. } => Some(value.clone()),
            Target::Lazy { factory: current } if !current.is(&factory) => None,
            _ => {
                state.target = Target::Ready {
                    value: value.clone(),
                    factory: Some(factory),
                };
                return Ok(value);
            }
        };
        drop(state);

        match settled {
            // Another caller got there first; theirs is the one everybody sees.
            Some(value) => {
                trace!("proxy", "proxy at {:#x} was resolved concurrently", self.id());
                Ok(value)
            }
            // Retargeted to a new factory while this one ran.
            None => self.wrapped(),
        }
    }

    /// Replace the wrapped value. The factory, if any, is kept.
    pub fn set_wrapped<V: Into<Value>>(&self, value: V) {
        debug!("proxy", "retargeting proxy at {:#x}", self.id());
        let value = value.into();
        let mut state = s_write!(self.0);
        let factory = match &state.target {
            Target::Lazy { factory } => Some(factory.clone()),
            Target::Ready { factory, .. } => factory.clone(),
            Target::Unset => None,
        };
        state.target = Target::Ready { value, factory };
    }

    /// The factory the proxy was created with, if it was created lazily.
    pub fn factory(&self) -> Option<Value> {
        match &s_read!(self.0).target {
            Target::Lazy { factory } => Some(factory.clone()),
            Target::Ready { factory, .. } => factory.clone(),
            Target::Unset => None,
        }
    }

    /// Install a new factory
    ///
    /// The proxy becomes unresolved again; the next access runs `factory`.
    pub fn set_factory<V: Into<Value>>(&self, factory: V) {
        debug!("proxy", "new factory for proxy at {:#x}", self.id());
        self.install(Target::Lazy {
            factory: factory.into(),
        });
    }

    /// The value at the bottom of any stack of proxies.
    pub fn innermost(&self) -> Result<Value> {
        self.wrapped()?.innermost()
    }

    /// The proxy's own attributes, by name without the `_self_` prefix.
    pub fn own_attributes(&self) -> Vec<(String, Value)> {
        let mut own = s_read!(self.0)
            .own
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Vec<_>>();
        own.sort_by(|a, b| a.0.cmp(&b.0));
        own
    }

    pub fn get_attr(&self, name: &str) -> Result<Value> {
        router::get(self, name)
    }

    pub fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        router::set(self, name, value)
    }

    pub fn del_attr(&self, name: &str) -> Result<()> {
        router::delete(self, name)
    }

    pub fn has_attr(&self, name: &str) -> Result<bool> {
        Value::from(self).has_attr(name)
    }

    pub fn dir(&self) -> Result<Vec<String>> {
        self.wrapped()?.dir()
    }

    pub fn vars(&self) -> Result<Value> {
        self.wrapped()?.vars()
    }

    /// `<Proxy at 0x.. wrapping ..>`, which resolves the proxy.
    pub fn repr(&self) -> Result<String> {
        let inner = self.wrapped()?.repr()?;
        Ok(format!(
            "<{} at {:#x} wrapping {inner}>",
            self.class_name(),
            self.id()
        ))
    }

    pub fn to_str(&self) -> Result<String> {
        self.wrapped()?.to_str()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.wrapped()?.to_bytes()
    }

    pub fn format(&self, spec: &str) -> Result<String> {
        self.wrapped()?.format(spec)
    }

    pub fn hash(&self) -> Result<u64> {
        self.wrapped()?.hash()
    }

    pub fn truthy(&self) -> Result<bool> {
        self.wrapped()?.truthy()
    }

    pub fn equals(&self, other: &Value) -> Result<bool> {
        self.wrapped()?.equals(other)
    }

    /// `lhs == self`, with the proxy on the right.
    pub fn reflected_equals(&self, lhs: &Value) -> Result<bool> {
        lhs.equals(&self.wrapped()?)
    }

    pub fn not_equals(&self, other: &Value) -> Result<bool> {
        self.wrapped()?.not_equals(other)
    }

    pub fn reflected_not_equals(&self, lhs: &Value) -> Result<bool> {
        lhs.not_equals(&self.wrapped()?)
    }

    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool> {
        self.wrapped()?.compare(op, other)
    }

    pub fn reflected_compare(&self, op: CompareOp, lhs: &Value) -> Result<bool> {
        lhs.compare(op, &self.wrapped()?)
    }

    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        self.wrapped()?.binary(op, rhs)
    }

    /// `lhs <op> self`, with the proxy on the right.
    pub fn reflected(&self, op: BinaryOp, lhs: &Value) -> Result<Value> {
        lhs.binary(op, &self.wrapped()?)
    }

    pub fn divmod(&self, rhs: &Value) -> Result<Value> {
        self.wrapped()?.divmod(rhs)
    }

    pub fn rdivmod(&self, lhs: &Value) -> Result<Value> {
        lhs.divmod(&self.wrapped()?)
    }

    pub fn pow3(&self, exponent: &Value, modulus: &Value) -> Result<Value> {
        self.wrapped()?.pow3(exponent, modulus)
    }

    /// Apply an in-place operator to the wrapped value
    ///
    /// Values that update in place keep their identity. Anything else is
    /// replaced by the result, and the proxy carries on wrapping that.
    pub fn inplace(&self, op: BinaryOp, rhs: &Value) -> Result<()> {
        let wrapped = self.wrapped()?;
        let result = wrapped.inplace_result(op, rhs)?;
        if !result.is(&wrapped) {
            self.set_wrapped(result);
        }
        Ok(())
    }

    pub fn neg(&self) -> Result<Value> {
        self.wrapped()?.neg()
    }

    pub fn pos(&self) -> Result<Value> {
        self.wrapped()?.pos()
    }

    pub fn abs(&self) -> Result<Value> {
        self.wrapped()?.abs()
    }

    pub fn invert(&self) -> Result<Value> {
        self.wrapped()?.invert()
    }

    pub fn to_int(&self) -> Result<SlothInteger> {
        self.wrapped()?.to_int()
    }

    pub fn to_float(&self) -> Result<SlothFloat> {
        self.wrapped()?.to_float()
    }

    pub fn index(&self) -> Result<SlothInteger> {
        self.wrapped()?.index()
    }

    pub fn round(&self) -> Result<Value> {
        self.wrapped()?.round()
    }

    pub fn oct(&self) -> Result<String> {
        self.wrapped()?.oct()
    }

    pub fn hex(&self) -> Result<String> {
        self.wrapped()?.hex()
    }

    pub fn len(&self) -> Result<usize> {
        self.wrapped()?.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, item: &Value) -> Result<bool> {
        self.wrapped()?.contains(item)
    }

    pub fn get_item(&self, key: &Value) -> Result<Value> {
        self.wrapped()?.get_item(key)
    }

    pub fn set_item(&self, key: &Value, value: Value) -> Result<()> {
        self.wrapped()?.set_item(key, value)
    }

    pub fn del_item(&self, key: &Value) -> Result<()> {
        self.wrapped()?.del_item(key)
    }

    /// A fresh iterator from the wrapped value. Nothing is buffered.
    pub fn iter(&self) -> Result<Value> {
        self.wrapped()?.iter()
    }

    pub fn next_item(&self) -> Result<Option<Value>> {
        self.wrapped()?.next_item()
    }

    pub fn reversed(&self) -> Result<Value> {
        self.wrapped()?.reversed()
    }

    pub fn is_callable(&self) -> Result<bool> {
        self.wrapped()?.is_callable()
    }

    pub fn call(&self, args: &Args) -> Result<Value> {
        self.wrapped()?.call(args)
    }

    pub fn enter(&self) -> Result<Value> {
        self.wrapped()?.enter()
    }

    pub fn exit(&self, error: Option<&SlothError>) -> Result<bool> {
        self.wrapped()?.exit(error)
    }
}

/// Shows the class and target without resolving anything.
impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = s_read!(self.0);
        f.debug_struct("Proxy")
            .field("class", &state.class.name())
            .field("id", &format_args!("{:#x}", self.id()))
            .field("target", &state.target)
            .finish()
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&Value::from(self), f)
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.equals(&Value::from(other)), Ok(true))
    }
}

impl PartialEq<Value> for Proxy {
    fn eq(&self, other: &Value) -> bool {
        matches!(self.equals(other), Ok(true))
    }
}

macro_rules! proxy_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait<&Value> for &Proxy {
            type Output = Result<Value>;

            fn $method(self, rhs: &Value) -> Self::Output {
                self.binary($op, rhs)
            }
        }

        impl std::ops::$trait<&Proxy> for &Proxy {
            type Output = Result<Value>;

            fn $method(self, rhs: &Proxy) -> Self::Output {
                self.binary($op, &Value::from(rhs))
            }
        }
    };
}

proxy_operator!(Add, add, BinaryOp::Add);
proxy_operator!(Sub, sub, BinaryOp::Sub);
proxy_operator!(Mul, mul, BinaryOp::Mul);
proxy_operator!(Div, div, BinaryOp::TrueDiv);
proxy_operator!(Rem, rem, BinaryOp::Mod);
proxy_operator!(Shl, shl, BinaryOp::LShift);
proxy_operator!(Shr, shr, BinaryOp::RShift);
proxy_operator!(BitAnd, bitand, BinaryOp::BitAnd);
proxy_operator!(BitXor, bitxor, BinaryOp::BitXor);
proxy_operator!(BitOr, bitor, BinaryOp::BitOr);

impl std::ops::Neg for &Proxy {
    type Output = Result<Value>;

    fn neg(self) -> Self::Output {
        Proxy::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::RcType;

    #[test]
    fn concrete_values_are_resolved() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::new(7);
        assert!(proxy.is_resolved());
        assert_eq!(proxy.wrapped().unwrap(), Value::from(7));
        assert!(proxy.factory().is_none());
    }

    #[test]
    fn factory_runs_once() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let calls = RcType::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let proxy = Proxy::lazy_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("made"))
        });

        assert!(!proxy.is_resolved());
        for _ in 0..5 {
            assert_eq!(proxy.len().unwrap(), 4);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(proxy.factory().is_some());
    }

    #[test]
    fn failed_factories_are_retried() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let calls = RcType::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let proxy = Proxy::lazy_fn(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SlothError::raised("RuntimeError", "not yet"))
            } else {
                Ok(Value::from(1))
            }
        });

        let err = proxy.wrapped().unwrap_err();
        assert_eq!(err.kind(), "RuntimeError");
        assert!(!proxy.is_resolved());
        assert_eq!(proxy.wrapped().unwrap(), Value::from(1));
    }

    #[test]
    fn retargeting() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::lazy_fn(|| Ok(Value::from(1)));
        proxy.set_wrapped(2);
        assert_eq!(proxy.wrapped().unwrap(), Value::from(2));
        assert!(proxy.factory().is_some());

        proxy.set_factory(Function::new("again", |_: &Args| Ok(Value::from(3))));
        assert!(!proxy.is_resolved());
        assert_eq!(proxy.wrapped().unwrap(), Value::from(3));
    }

    #[test]
    fn unset_target() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::allocate(ProxyClass::base());
        let err = proxy.wrapped().unwrap_err();
        assert_eq!(err.kind(), "ValueError");
    }

    #[test]
    fn debug_does_not_resolve() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::lazy_fn(|| Ok(Value::from(1)));
        let shown = format!("{proxy:?}");
        assert!(shown.contains("Lazy"));
        assert!(!proxy.is_resolved());
    }

    #[test]
    fn repr_names_the_proxy() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::new(10);
        let repr = proxy.repr().unwrap();
        assert!(repr.starts_with("<Proxy at 0x"));
        assert!(repr.ends_with("wrapping 10>"));
        assert_eq!(proxy.to_string(), "10");
    }

    #[test]
    fn nested_proxies() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let inner = Proxy::lazy_fn(|| Ok(Value::from(vec![1, 2])));
        let outer = Proxy::new(&inner);

        assert!(matches!(outer.wrapped().unwrap(), Value::Proxy(_)));
        assert_eq!(outer.innermost().unwrap(), Value::from(vec![1, 2]));
        assert!(inner.is_resolved());
        assert_eq!(outer.len().unwrap(), 2);
    }

    #[test]
    fn operators_on_handles() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::new(6);
        assert_eq!((&proxy + &Value::from(1)).unwrap(), Value::from(7));
        assert_eq!((&proxy * &Proxy::new(2)).unwrap(), Value::from(12));
        assert_eq!((-&proxy).unwrap(), Value::from(-6));
        assert!(proxy == Value::from(6));
        assert_eq!(Value::from(6), Value::from(&proxy));
    }

    #[test]
    fn inplace_keeps_the_proxy() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::new(1);
        proxy.inplace(BinaryOp::Add, &Value::from(1)).unwrap();
        assert_eq!(proxy.wrapped().unwrap(), Value::from(2));

        let list = Value::from(vec![1]);
        let proxy = Proxy::new(list.clone());
        proxy.inplace(BinaryOp::Add, &Value::from(vec![2])).unwrap();
        assert!(proxy.wrapped().unwrap().is(&list));
        assert_eq!(list, Value::from(vec![1, 2]));
    }
}
