//! The dynamic object model
//!
//! [`Value`] is what a [`Proxy`] wraps, and what every forwarded operation
//! ultimately lands on. The protocol methods live in the submodules, grouped by
//! concern; this module holds the type itself along with identity, conversions,
//! and the std trait impls.
use std::{cmp::Ordering, fmt};

use snafu::prelude::*;

use crate::{
    error::{BadValueSnafu, IndexSnafu, Result, SlothError, TypeSnafu},
    new_ref,
    proxy::{class::ProxyClass, Proxy},
    rc_addr, ref_addr, s_read, RcType, RefType, SlothFloat, SlothInteger,
};

pub mod attr;
pub mod class;
pub mod container;
pub mod dict;
pub mod function;
pub mod iter;
pub mod ops;
pub mod repr;

use class::{Class, Object};
use dict::Dict;
use function::{Args, Function, Method};
use iter::ValueIter;
use ops::CompareOp;

/// The built in types
///
/// A `Value::Type` holds one of these. They are callable, and calling one
/// converts its argument the way the type's constructor would.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    NoneType,
    NotImplementedType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Tuple,
    List,
    Dict,
    Slice,
    Function,
    Method,
    Type,
    Iterator,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::NoneType => "NoneType",
            Builtin::NotImplementedType => "NotImplementedType",
            Builtin::Bool => "bool",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bytes => "bytes",
            Builtin::Tuple => "tuple",
            Builtin::List => "list",
            Builtin::Dict => "dict",
            Builtin::Slice => "slice",
            Builtin::Function => "function",
            Builtin::Method => "method",
            Builtin::Type => "type",
            Builtin::Iterator => "iterator",
        }
    }

    /// Build a value of this type from the arguments of a constructor call.
    pub fn construct(&self, args: &Args) -> Result<Value> {
        let arg = args.get(0);
        match self {
            Builtin::Bool => Ok(Value::Boolean(match arg {
                Some(value) => value.truthy()?,
                None => false,
            })),
            Builtin::Int => arg.map_or(Ok(Value::Integer(0)), |v| v.to_int().map(Value::Integer)),
            Builtin::Float => arg.map_or(Ok(Value::Float(0.0)), |v| v.to_float().map(Value::Float)),
            Builtin::Str => arg.map_or(Ok(Value::from("")), |v| v.to_str().map(Value::String)),
            Builtin::Bytes => arg.map_or(Ok(Value::Bytes(vec![])), |v| v.to_bytes().map(Value::Bytes)),
            Builtin::Tuple => match arg {
                Some(value) => Ok(Value::Tuple(value.collect_items()?)),
                None => Ok(Value::Tuple(vec![])),
            },
            Builtin::List => match arg {
                Some(value) => Ok(Value::list(value.collect_items()?)),
                None => Ok(Value::list(vec![])),
            },
            Builtin::Dict => match arg.map(|v| v.innermost()).transpose()? {
                Some(Value::Dict(dict)) => {
                    let copy = s_read!(dict).clone();
                    Ok(Value::from(copy))
                }
                Some(value) => {
                    let mut pairs = Vec::new();
                    for item in value.iterate()? {
                        match item?.collect_items()?.as_slice() {
                            [key, value] => pairs.push((key.clone(), value.clone())),
                            items => {
                                return BadValueSnafu {
                                    message: format!(
                                        "dictionary update sequence element has length {}; 2 is required",
                                        items.len()
                                    ),
                                }
                                .fail()
                            }
                        }
                    }
                    Ok(Value::from(Dict::from_pairs(pairs)?))
                }
                None => Ok(Value::from(Dict::new())),
            },
            Builtin::Slice => {
                let bound = |value: Option<&Value>| -> Result<Option<SlothInteger>> {
                    match value.map(|v| v.innermost()).transpose()? {
                        None | Some(Value::None) => Ok(None),
                        Some(value) => value.index().map(Some),
                    }
                };
                let slice = match args.len() {
                    1 => Slice::new(None, bound(args.get(0))?),
                    2 | 3 => Slice::new(bound(args.get(0))?, bound(args.get(1))?)
                        .with_step(bound(args.get(2))?),
                    n => {
                        return TypeSnafu {
                            message: format!("slice expected at most 3 arguments, got {n}"),
                        }
                        .fail()
                    }
                };
                Ok(Value::Slice(slice))
            }
            Builtin::Type => match arg {
                Some(value) => Ok(value.type_of()),
                None => TypeSnafu {
                    message: "type() takes 1 argument",
                }
                .fail(),
            },
            _ => TypeSnafu {
                message: format!("cannot create '{}' instances", self.name()),
            }
            .fail(),
        }
    }
}

/// A slice of a sequence
///
/// Bounds are optional and may be negative, in which case they count from the
/// end of the sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<SlothInteger>,
    pub stop: Option<SlothInteger>,
    pub step: Option<SlothInteger>,
}

impl Slice {
    pub fn new(start: Option<SlothInteger>, stop: Option<SlothInteger>) -> Self {
        Slice {
            start,
            stop,
            step: None,
        }
    }

    pub fn with_step(mut self, step: Option<SlothInteger>) -> Self {
        self.step = step;
        self
    }

    /// Clamp the slice against a sequence length, yielding `(start, stop, step)`.
    pub fn indices(&self, len: usize) -> Result<(isize, isize, isize)> {
        let len = len as isize;
        let step = match self.step {
            Some(0) => {
                return BadValueSnafu {
                    message: "slice step cannot be zero",
                }
                .fail()
            }
            Some(step) => step as isize,
            None => 1,
        };
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: Option<SlothInteger>, default: isize| match bound {
            None => default,
            Some(bound) => {
                let bound = bound as isize;
                if bound < 0 {
                    (bound + len).max(lower)
                } else {
                    bound.min(upper)
                }
            }
        };

        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });

        Ok((start, stop, step))
    }

    /// The positions the slice selects, in order.
    pub fn positions(&self, len: usize) -> Result<Vec<usize>> {
        let (start, stop, step) = self.indices(len)?;
        let mut positions = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            positions.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(positions)
    }

    pub(crate) fn select<T: Clone>(&self, items: &[T]) -> Result<Vec<T>> {
        Ok(self
            .positions(items.len())?
            .into_iter()
            .map(|i| items[i].clone())
            .collect())
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bound = |b: Option<SlothInteger>| b.map_or("None".to_owned(), |b| b.to_string());
        write!(
            f,
            "slice({}, {}, {})",
            bound(self.start),
            bound(self.stop),
            bound(self.step)
        )
    }
}

/// A value in the object model
///
/// Immutable values are held inline. Everything with identity or mutable state
/// lives behind a [`RefType`], so cloning a `Value` aliases it rather than
/// copying it.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    None,
    /// Returned by a binary special method that doesn't handle its operand.
    NotImplemented,
    Boolean(bool),
    Integer(SlothInteger),
    Float(SlothFloat),
    String(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Value>),
    List(RefType<Vec<Value>>),
    Dict(RefType<Dict>),
    Slice(Slice),
    Function(RefType<Function>),
    Method(RcType<Method>),
    Class(RefType<Class>),
    Object(RefType<Object>),
    Type(Builtin),
    Iterator(RefType<ValueIter>),
    ProxyClass(ProxyClass),
    Proxy(Proxy),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(new_ref!(Vec<Value>, items))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }

    pub fn bytes<B: AsRef<[u8]>>(bytes: B) -> Self {
        Value::Bytes(bytes.as_ref().to_vec())
    }

    pub fn slice(start: Option<SlothInteger>, stop: Option<SlothInteger>) -> Self {
        Value::Slice(Slice::new(start, stop))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Value::NotImplemented)
    }

    pub fn as_class(&self) -> Option<RefType<Class>> {
        match self {
            Value::Class(class) => Some(class.clone()),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The address of the value, if it has identity.
    pub fn address(&self) -> Option<usize> {
        match self {
            Value::List(r) => Some(ref_addr(r)),
            Value::Dict(r) => Some(ref_addr(r)),
            Value::Function(r) => Some(ref_addr(r)),
            Value::Method(r) => Some(rc_addr(r)),
            Value::Class(r) => Some(ref_addr(r)),
            Value::Object(r) => Some(ref_addr(r)),
            Value::Iterator(r) => Some(ref_addr(r)),
            Value::ProxyClass(class) => Some(class.id()),
            Value::Proxy(proxy) => Some(proxy.id()),
            _ => None,
        }
    }

    /// Identity comparison
    ///
    /// Values with identity are the same when they share storage. Immutable
    /// values are the same when they're equal and of the same type. A proxy is
    /// never the value it wraps.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::NotImplemented, Value::NotImplemented) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.is(b))
            }
            (a, b) => match (a.address(), b.address()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// The type of the value
    ///
    /// For a proxy this is its proxy class, not the type of what it wraps. Ask
    /// for the `__class__` attribute to see through the proxy.
    pub fn type_of(&self) -> Value {
        match self {
            Value::None => Value::Type(Builtin::NoneType),
            Value::NotImplemented => Value::Type(Builtin::NotImplementedType),
            Value::Boolean(_) => Value::Type(Builtin::Bool),
            Value::Integer(_) => Value::Type(Builtin::Int),
            Value::Float(_) => Value::Type(Builtin::Float),
            Value::String(_) => Value::Type(Builtin::Str),
            Value::Bytes(_) => Value::Type(Builtin::Bytes),
            Value::Tuple(_) => Value::Type(Builtin::Tuple),
            Value::List(_) => Value::Type(Builtin::List),
            Value::Dict(_) => Value::Type(Builtin::Dict),
            Value::Slice(_) => Value::Type(Builtin::Slice),
            Value::Function(_) => Value::Type(Builtin::Function),
            Value::Method(_) => Value::Type(Builtin::Method),
            Value::Class(_) | Value::Type(_) | Value::ProxyClass(_) => Value::Type(Builtin::Type),
            Value::Iterator(_) => Value::Type(Builtin::Iterator),
            Value::Object(object) => Value::Class(s_read!(object).class()),
            Value::Proxy(proxy) => Value::ProxyClass(proxy.class()),
        }
    }

    pub fn type_name(&self) -> String {
        match self.type_of() {
            Value::Type(builtin) => builtin.name().to_owned(),
            Value::Class(class) => s_read!(class).name().to_owned(),
            Value::ProxyClass(class) => class.name(),
            _ => "object".to_owned(),
        }
    }

    pub(crate) fn same_type(&self, other: &Value) -> bool {
        self.type_of().is(&other.type_of())
    }

    /// Strip every layer of proxy, resolving each one.
    pub fn innermost(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.innermost(),
            _ => Ok(self.clone()),
        }
    }

    /// Drain an iterable into a vector.
    pub fn collect_items(&self) -> Result<Vec<Value>> {
        self.iterate()?.collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_str() {
            Ok(s) => write!(f, "{s}"),
            Err(e) => write!(f, "<unprintable {} object: {}>", self.type_name(), e.kind()),
        }
    }
}

/// Equality the way the object model sees it
///
/// `==` can fail in the object model. Here a failed comparison is simply
/// unequal; use [`Value::equals`] to see the error.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.equals(other), Ok(true))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if matches!(self.equals(other), Ok(true)) {
            Some(Ordering::Equal)
        } else if matches!(self.compare(CompareOp::Lt, other), Ok(true)) {
            Some(Ordering::Less)
        } else if matches!(self.compare(CompareOp::Gt, other), Ok(true)) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

/// Hashes with [`Value::hash`], so equal values hash alike. Unhashable values
/// fall back to their identity.
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match Value::hash(self) {
            Ok(hash) => state.write_u64(hash),
            Err(_) => self.address().hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Integer(value as SlothInteger)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value as SlothInteger)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value as SlothInteger)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Slice> for Value {
    fn from(value: Slice) -> Self {
        Self::Slice(value)
    }
}

impl From<Builtin> for Value {
    fn from(value: Builtin) -> Self {
        Self::Type(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Self::Dict(new_ref!(Dict, value))
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Self::Function(new_ref!(Function, value))
    }
}

impl From<Method> for Value {
    fn from(value: Method) -> Self {
        Self::Method(RcType::new(value))
    }
}

impl From<Class> for Value {
    fn from(value: Class) -> Self {
        Self::Class(new_ref!(Class, value))
    }
}

impl From<ProxyClass> for Value {
    fn from(value: ProxyClass) -> Self {
        Self::ProxyClass(value)
    }
}

impl From<Proxy> for Value {
    fn from(value: Proxy) -> Self {
        Self::Proxy(value)
    }
}

impl From<&Proxy> for Value {
    fn from(value: &Proxy) -> Self {
        Self::Proxy(value.clone())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::list(value.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<&Value> for i64 {
    type Error = SlothError;

    fn try_from(value: &Value) -> Result<Self, <i64 as TryFrom<&Value>>::Error> {
        value.to_int()
    }
}

impl TryFrom<Value> for i64 {
    type Error = SlothError;

    fn try_from(value: Value) -> Result<Self, <i64 as TryFrom<Value>>::Error> {
        value.to_int()
    }
}

impl TryFrom<&Value> for usize {
    type Error = SlothError;

    fn try_from(value: &Value) -> Result<Self, <usize as TryFrom<&Value>>::Error> {
        let index = value.index()?;
        usize::try_from(index)
            .ok()
            .context(IndexSnafu {
                message: format!("{index} is negative"),
            })
    }
}

impl TryFrom<Value> for usize {
    type Error = SlothError;

    fn try_from(value: Value) -> Result<Self, <usize as TryFrom<Value>>::Error> {
        usize::try_from(&value)
    }
}

impl TryFrom<&Value> for f64 {
    type Error = SlothError;

    fn try_from(value: &Value) -> Result<Self, <f64 as TryFrom<&Value>>::Error> {
        value.to_float()
    }
}

impl TryFrom<Value> for f64 {
    type Error = SlothError;

    fn try_from(value: Value) -> Result<Self, <f64 as TryFrom<Value>>::Error> {
        value.to_float()
    }
}

impl TryFrom<&Value> for bool {
    type Error = SlothError;

    fn try_from(value: &Value) -> Result<Self, <bool as TryFrom<&Value>>::Error> {
        value.truthy()
    }
}

impl TryFrom<Value> for bool {
    type Error = SlothError;

    fn try_from(value: Value) -> Result<Self, <bool as TryFrom<Value>>::Error> {
        value.truthy()
    }
}

impl TryFrom<&Value> for String {
    type Error = SlothError;

    fn try_from(value: &Value) -> Result<Self, <String as TryFrom<&Value>>::Error> {
        value.to_str()
    }
}

impl TryFrom<Value> for String {
    type Error = SlothError;

    fn try_from(value: Value) -> Result<Self, <String as TryFrom<Value>>::Error> {
        value.to_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_indices() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let slice = Slice::new(Some(1), Some(3));
        assert_eq!(slice.positions(5).unwrap(), vec![1, 2]);

        let slice = Slice::new(None, None).with_step(Some(-1));
        assert_eq!(slice.positions(3).unwrap(), vec![2, 1, 0]);

        let slice = Slice::new(Some(-2), None);
        assert_eq!(slice.positions(4).unwrap(), vec![2, 3]);

        let slice = Slice::new(Some(10), Some(20));
        assert!(slice.positions(4).unwrap().is_empty());

        let slice = Slice::new(None, None).with_step(Some(0));
        assert!(slice.indices(4).is_err());
    }

    #[test]
    fn huge_slice_steps() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let huge = SlothInteger::MAX;
        let slice = Slice::new(Some(1), None).with_step(Some(huge));
        assert_eq!(slice.positions(3).unwrap(), vec![1]);
        let slice = Slice::new(None, None).with_step(Some(huge));
        assert_eq!(slice.positions(3).unwrap(), vec![0]);
        let slice = Slice::new(Some(1), None).with_step(Some(-huge));
        assert_eq!(slice.positions(3).unwrap(), vec![1]);
        let slice = Slice::new(None, None).with_step(Some(SlothInteger::MIN));
        assert_eq!(slice.positions(3).unwrap(), vec![2]);

        let key = Value::from(Slice::new(Some(1), None).with_step(Some(huge)));
        let proxy = Value::from(Proxy::new(vec![0, 1, 2]));
        assert_eq!(proxy.get_item(&key).unwrap(), Value::from(vec![1]));
        proxy.set_item(&key, Value::from(vec![9])).unwrap();
        assert_eq!(proxy, Value::from(vec![0, 9, 2]));
        proxy.del_item(&key).unwrap();
        assert_eq!(proxy, Value::from(vec![0, 2]));

        let backwards = Value::from(Slice::new(None, None).with_step(Some(-huge)));
        assert_eq!(
            Value::from("abc").get_item(&backwards).unwrap(),
            Value::from("c")
        );
    }

    #[test]
    fn identity() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let a = Value::from(vec![1, 2]);
        let b = a.clone();
        let c = Value::from(vec![1, 2]);

        assert!(a.is(&b));
        assert!(!a.is(&c));
        assert_eq!(a, c);
        assert!(Value::None.is(&Value::None));
        assert!(!Value::from(1).is(&Value::from(1.0)));
    }

    #[test]
    fn type_names() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::from(1).type_name(), "int");
        assert_eq!(Value::from(true).type_name(), "bool");
        assert_eq!(Value::from("a").type_name(), "str");
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::from(Dict::new()).type_name(), "dict");

        let class = Value::from(Class::new("Point"));
        assert_eq!(class.type_name(), "type");
    }

    #[test]
    fn builtin_constructors() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let int = Value::Type(Builtin::Int);
        assert_eq!(
            int.call(&Args::from(vec![Value::from("42")])).unwrap(),
            Value::from(42)
        );

        let list = Value::Type(Builtin::List);
        let made = list
            .call(&Args::from(vec![Value::tuple(vec![1.into(), 2.into()])]))
            .unwrap();
        assert_eq!(made, Value::from(vec![1, 2]));

        let none = Value::Type(Builtin::NoneType);
        assert!(none.call(&Args::default()).unwrap_err().is_type_error());
    }

    #[test]
    fn conversions() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(i64::try_from(&Value::from(3.9)).unwrap(), 3);
        assert_eq!(f64::try_from(Value::from(2)).unwrap(), 2.0);
        assert!(!bool::try_from(Value::from("")).unwrap());
        assert_eq!(String::try_from(Value::from(5)).unwrap(), "5");
        assert!(usize::try_from(Value::from(-1)).is_err());
    }
}
