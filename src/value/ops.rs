//! Operators
//!
//! Numbers follow integer-and-float semantics: `bool` behaves as an integer,
//! integer arithmetic is checked, division and modulo floor toward negative
//! infinity. User objects get a say through their special methods, the
//! forward method first and then the reflected one. Any operand that is a
//! proxy is resolved and the operation forwarded.
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use rustc_hash::FxHasher;
use snafu::prelude::*;

use crate::{
    error::{
        BadValueSnafu, OverflowSnafu, Result, SlothError, TypeSnafu, UnsupportedOperandSnafu,
        ZeroDivisionSnafu,
    },
    keywords::{
        ABS, BOOL, DIVMOD, EQ, FLOAT, HASH, INDEX, INT, INVERT, LEN, NE, NEG, POS, RDIVMOD, ROUND,
    },
    s_read, s_write,
    value::dict::shared_insert,
    SlothFloat, SlothInteger, Value,
};

/// The binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitXor,
    BitOr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::TrueDiv => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "** or pow()",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
        }
    }

    pub fn inplace_symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+=",
            BinaryOp::Sub => "-=",
            BinaryOp::Mul => "*=",
            BinaryOp::TrueDiv => "/=",
            BinaryOp::FloorDiv => "//=",
            BinaryOp::Mod => "%=",
            BinaryOp::Pow => "**=",
            BinaryOp::LShift => "<<=",
            BinaryOp::RShift => ">>=",
            BinaryOp::BitAnd => "&=",
            BinaryOp::BitXor => "^=",
            BinaryOp::BitOr => "|=",
        }
    }

    /// The special method a user object defines to implement the operator.
    pub fn method(&self) -> &'static str {
        match self {
            BinaryOp::Add => "__add__",
            BinaryOp::Sub => "__sub__",
            BinaryOp::Mul => "__mul__",
            BinaryOp::TrueDiv => "__truediv__",
            BinaryOp::FloorDiv => "__floordiv__",
            BinaryOp::Mod => "__mod__",
            BinaryOp::Pow => "__pow__",
            BinaryOp::LShift => "__lshift__",
            BinaryOp::RShift => "__rshift__",
            BinaryOp::BitAnd => "__and__",
            BinaryOp::BitXor => "__xor__",
            BinaryOp::BitOr => "__or__",
        }
    }

    /// The method tried on the right operand when the left declines.
    pub fn reflected(&self) -> &'static str {
        match self {
            BinaryOp::Add => "__radd__",
            BinaryOp::Sub => "__rsub__",
            BinaryOp::Mul => "__rmul__",
            BinaryOp::TrueDiv => "__rtruediv__",
            BinaryOp::FloorDiv => "__rfloordiv__",
            BinaryOp::Mod => "__rmod__",
            BinaryOp::Pow => "__rpow__",
            BinaryOp::LShift => "__rlshift__",
            BinaryOp::RShift => "__rrshift__",
            BinaryOp::BitAnd => "__rand__",
            BinaryOp::BitXor => "__rxor__",
            BinaryOp::BitOr => "__ror__",
        }
    }

    pub fn inplace_method(&self) -> &'static str {
        match self {
            BinaryOp::Add => "__iadd__",
            BinaryOp::Sub => "__isub__",
            BinaryOp::Mul => "__imul__",
            BinaryOp::TrueDiv => "__itruediv__",
            BinaryOp::FloorDiv => "__ifloordiv__",
            BinaryOp::Mod => "__imod__",
            BinaryOp::Pow => "__ipow__",
            BinaryOp::LShift => "__ilshift__",
            BinaryOp::RShift => "__irshift__",
            BinaryOp::BitAnd => "__iand__",
            BinaryOp::BitXor => "__ixor__",
            BinaryOp::BitOr => "__ior__",
        }
    }
}

/// The ordering comparisons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            CompareOp::Lt => "__lt__",
            CompareOp::Le => "__le__",
            CompareOp::Gt => "__gt__",
            CompareOp::Ge => "__ge__",
        }
    }

    /// The method tried on the right operand, with the operands swapped.
    pub fn reflected(&self) -> &'static str {
        match self {
            CompareOp::Lt => "__gt__",
            CompareOp::Le => "__ge__",
            CompareOp::Gt => "__lt__",
            CompareOp::Ge => "__le__",
        }
    }

    fn check(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Number {
    Int(SlothInteger),
    Float(SlothFloat),
}

impl Number {
    fn float(self) -> SlothFloat {
        match self {
            Number::Int(i) => i as SlothFloat,
            Number::Float(f) => f,
        }
    }
}

fn fx_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn str_hash(value: &str) -> u64 {
    fx_hash(value)
}

const NONE_HASH: u64 = 0x6e6f_6e65;
const NOT_IMPLEMENTED_HASH: u64 = 0x6e6f_7469;

fn overflow() -> SlothError {
    OverflowSnafu {
        message: "integer overflow",
    }
    .build()
}

fn checked(value: Option<SlothInteger>) -> Result<Option<Value>> {
    value
        .map(|i| Some(Value::Integer(i)))
        .ok_or_else(overflow)
}

fn floor_div(a: SlothInteger, b: SlothInteger) -> Result<SlothInteger> {
    let quotient = a.checked_div(b).ok_or_else(overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn floor_mod(a: SlothInteger, b: SlothInteger) -> SlothInteger {
    // `checked_rem` only fails for MIN % -1, which is 0.
    let remainder = a.checked_rem(b).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        remainder + b
    } else {
        remainder
    }
}

fn float_mod(a: SlothFloat, b: SlothFloat) -> SlothFloat {
    let remainder = a % b;
    if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
        remainder + b
    } else {
        remainder
    }
}

fn int_pow(base: SlothInteger, exponent: SlothInteger) -> Result<Value> {
    if exponent < 0 {
        if base == 0 {
            return ZeroDivisionSnafu {
                message: "0.0 cannot be raised to a negative power",
            }
            .fail();
        }
        return Ok(Value::Float((base as SlothFloat).powf(exponent as SlothFloat)));
    }
    let Ok(exponent) = u32::try_from(exponent) else {
        // Only these bases stay in range for an exponent this large.
        return match base {
            0 | 1 => Ok(Value::Integer(base)),
            -1 => Ok(Value::Integer(if exponent % 2 == 0 { 1 } else { -1 })),
            _ => Err(overflow()),
        };
    };
    base.checked_pow(exponent)
        .map(Value::Integer)
        .ok_or_else(overflow)
}

fn float_pow(base: SlothFloat, exponent: SlothFloat) -> Result<Value> {
    if base == 0.0 && exponent < 0.0 {
        return ZeroDivisionSnafu {
            message: "0.0 cannot be raised to a negative power",
        }
        .fail();
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return BadValueSnafu {
            message: "negative number cannot be raised to a fractional power",
        }
        .fail();
    }
    Ok(Value::Float(base.powf(exponent)))
}

fn mod_pow(base: SlothInteger, exponent: SlothInteger, modulus: SlothInteger) -> SlothInteger {
    let m = (modulus as i128).abs();
    let mut result: i128 = 1 % m;
    let mut base = (base as i128).rem_euclid(m);
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exponent >>= 1;
    }
    if modulus < 0 && result != 0 {
        result -= m;
    }
    result as SlothInteger
}

/// Arithmetic between two numbers. `None` means the operator doesn't apply.
fn numeric(op: BinaryOp, x: Number, y: Number) -> Result<Option<Value>> {
    use Number::{Float, Int};

    match op {
        BinaryOp::Add => match (x, y) {
            (Int(a), Int(b)) => checked(a.checked_add(b)),
            _ => Ok(Some(Value::Float(x.float() + y.float()))),
        },
        BinaryOp::Sub => match (x, y) {
            (Int(a), Int(b)) => checked(a.checked_sub(b)),
            _ => Ok(Some(Value::Float(x.float() - y.float()))),
        },
        BinaryOp::Mul => match (x, y) {
            (Int(a), Int(b)) => checked(a.checked_mul(b)),
            _ => Ok(Some(Value::Float(x.float() * y.float()))),
        },
        BinaryOp::TrueDiv => {
            let divisor = y.float();
            ensure!(
                divisor != 0.0,
                ZeroDivisionSnafu {
                    message: "division by zero"
                }
            );
            Ok(Some(Value::Float(x.float() / divisor)))
        }
        BinaryOp::FloorDiv => match (x, y) {
            (Int(_), Int(0)) => ZeroDivisionSnafu {
                message: "integer division or modulo by zero",
            }
            .fail(),
            (Int(a), Int(b)) => Ok(Some(Value::Integer(floor_div(a, b)?))),
            _ => {
                let divisor = y.float();
                ensure!(
                    divisor != 0.0,
                    ZeroDivisionSnafu {
                        message: "float floor division by zero"
                    }
                );
                Ok(Some(Value::Float((x.float() / divisor).floor())))
            }
        },
        BinaryOp::Mod => match (x, y) {
            (Int(_), Int(0)) => ZeroDivisionSnafu {
                message: "integer division or modulo by zero",
            }
            .fail(),
            (Int(a), Int(b)) => Ok(Some(Value::Integer(floor_mod(a, b)))),
            _ => {
                let divisor = y.float();
                ensure!(
                    divisor != 0.0,
                    ZeroDivisionSnafu {
                        message: "float modulo"
                    }
                );
                Ok(Some(Value::Float(float_mod(x.float(), divisor))))
            }
        },
        BinaryOp::Pow => match (x, y) {
            (Int(a), Int(b)) => int_pow(a, b).map(Some),
            _ => float_pow(x.float(), y.float()).map(Some),
        },
        BinaryOp::LShift | BinaryOp::RShift => match (x, y) {
            (Int(_), Int(b)) if b < 0 => BadValueSnafu {
                message: "negative shift count",
            }
            .fail(),
            (Int(a), Int(b)) if op == BinaryOp::LShift => {
                let shifted = u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_shl(b))
                    .filter(|shifted| shifted >> b == a);
                match shifted {
                    Some(value) => Ok(Some(Value::Integer(value))),
                    None if a == 0 => Ok(Some(Value::Integer(0))),
                    None => Err(overflow()),
                }
            }
            (Int(a), Int(b)) => {
                let b = b.min(63) as u32;
                Ok(Some(Value::Integer(a >> b)))
            }
            _ => Ok(None),
        },
        BinaryOp::BitAnd => match (x, y) {
            (Int(a), Int(b)) => Ok(Some(Value::Integer(a & b))),
            _ => Ok(None),
        },
        BinaryOp::BitXor => match (x, y) {
            (Int(a), Int(b)) => Ok(Some(Value::Integer(a ^ b))),
            _ => Ok(None),
        },
        BinaryOp::BitOr => match (x, y) {
            (Int(a), Int(b)) => Ok(Some(Value::Integer(a | b))),
            _ => Ok(None),
        },
    }
}

fn repeat_count(value: &Value) -> Option<SlothInteger> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Boolean(b) => Some(*b as SlothInteger),
        _ => None,
    }
}

fn repeated<T: Clone>(items: &[T], count: SlothInteger) -> Result<Vec<T>> {
    let count = count.max(0) as usize;
    match items.len().checked_mul(count) {
        Some(total) if total <= isize::MAX as usize / 64 => {
            Ok(items.iter().cloned().cycle().take(total).collect())
        }
        _ => OverflowSnafu {
            message: "repeated sequence is too long",
        }
        .fail(),
    }
}

/// `seq * count` for the built in sequences.
fn repeat(seq: &Value, count: &Value) -> Result<Option<Value>> {
    let Some(count) = repeat_count(count) else {
        return Ok(None);
    };
    match seq {
        Value::String(s) => {
            let chars = s.chars().collect::<Vec<_>>();
            Ok(Some(Value::String(repeated(&chars, count)?.into_iter().collect())))
        }
        Value::Bytes(bytes) => Ok(Some(Value::Bytes(repeated(bytes, count)?))),
        Value::Tuple(items) => Ok(Some(Value::Tuple(repeated(items, count)?))),
        Value::List(list) => {
            let items = s_read!(list).clone();
            Ok(Some(Value::list(repeated(&items, count)?)))
        }
        _ => Ok(None),
    }
}

fn builtin_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Option<Value>> {
    if let (Value::Boolean(a), Value::Boolean(b)) = (lhs, rhs) {
        match op {
            BinaryOp::BitAnd => return Ok(Some(Value::Boolean(a & b))),
            BinaryOp::BitXor => return Ok(Some(Value::Boolean(a ^ b))),
            BinaryOp::BitOr => return Ok(Some(Value::Boolean(a | b))),
            _ => {}
        }
    }

    if let (Some(x), Some(y)) = (lhs.number(), rhs.number()) {
        return numeric(op, x, y);
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            Ok(Some(Value::String(format!("{a}{b}"))))
        }
        (BinaryOp::Add, Value::Bytes(a), Value::Bytes(b)) => {
            Ok(Some(Value::Bytes([a.as_slice(), b.as_slice()].concat())))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Some(Value::Tuple([a.as_slice(), b.as_slice()].concat())))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = s_read!(a).clone();
            let tail = s_read!(b).clone();
            items.extend(tail);
            Ok(Some(Value::list(items)))
        }
        (BinaryOp::Mul, _, _) => match repeat(lhs, rhs)? {
            Some(value) => Ok(Some(value)),
            None => repeat(rhs, lhs),
        },
        (BinaryOp::Mod, Value::String(template), _) => {
            let args = match rhs {
                Value::Tuple(items) => items.clone(),
                other => vec![other.clone()],
            };
            percent_format(template, &args).map(|s| Some(Value::String(s)))
        }
        (BinaryOp::BitOr, Value::Dict(a), Value::Dict(b)) => {
            let mut merged = s_read!(a).clone();
            let items = s_read!(b).items();
            for (key, value) in items {
                merged.insert(key, value)?;
            }
            Ok(Some(Value::from(merged)))
        }
        _ => Ok(None),
    }
}

/// Printf-style string formatting with `%s`, `%r`, `%d` and `%%`.
fn percent_format(template: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = template.chars();
    let mut next_arg = || {
        args.next().ok_or_else(|| {
            TypeSnafu {
                message: "not enough arguments for format string",
            }
            .build()
        })
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => out.push_str(&next_arg()?.to_str()?),
            Some('r') => out.push_str(&next_arg()?.repr()?),
            Some('d') | Some('i') => out.push_str(&next_arg()?.to_int()?.to_string()),
            Some(other) => {
                return BadValueSnafu {
                    message: format!("unsupported format character '{other}'"),
                }
                .fail()
            }
            None => {
                return BadValueSnafu {
                    message: "incomplete format",
                }
                .fail()
            }
        }
    }
    Ok(out)
}

fn bad_operand(symbol: &str, value: &Value) -> SlothError {
    TypeSnafu {
        message: format!("bad operand type for {symbol}: '{}'", value.type_name()),
    }
    .build()
}

impl Value {
    fn number(&self) -> Option<Number> {
        match self {
            Value::Boolean(b) => Some(Number::Int(*b as SlothInteger)),
            Value::Integer(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Call a special method that takes no arguments.
    fn unary_dunder(&self, name: &str) -> Result<Option<Value>> {
        self.dunder(name, &[])
    }

    /// Ask a user object to handle a binary operator, forward then reflected.
    fn dispatch_binary(
        &self,
        rhs: &Value,
        method: &str,
        reflected: &str,
    ) -> Result<Option<Value>> {
        if let Some(value) = self.dunder(method, &[rhs.clone()])? {
            if !value.is_not_implemented() {
                return Ok(Some(value));
            }
        }
        if !self.same_type(rhs) {
            if let Some(value) = rhs.dunder(reflected, &[self.clone()])? {
                if !value.is_not_implemented() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    /// Apply a binary operator.
    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Proxy(proxy), _) => proxy.binary(op, rhs),
            (_, Value::Proxy(proxy)) => proxy.reflected(op, self),
            _ => {
                if let Some(value) = builtin_binary(op, self, rhs)? {
                    return Ok(value);
                }
                if let Some(value) = self.dispatch_binary(rhs, op.method(), op.reflected())? {
                    return Ok(value);
                }
                UnsupportedOperandSnafu {
                    op: op.symbol(),
                    types: vec![self.type_name(), rhs.type_name()],
                }
                .fail()
            }
        }
    }

    /// `divmod(self, rhs)`
    pub fn divmod(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Proxy(proxy), _) => proxy.divmod(rhs),
            (_, Value::Proxy(proxy)) => proxy.rdivmod(self),
            _ => {
                if let (Some(_), Some(_)) = (self.number(), rhs.number()) {
                    let quotient = self.binary(BinaryOp::FloorDiv, rhs)?;
                    let remainder = self.binary(BinaryOp::Mod, rhs)?;
                    return Ok(Value::Tuple(vec![quotient, remainder]));
                }
                if let Some(value) = self.dispatch_binary(rhs, DIVMOD, RDIVMOD)? {
                    return Ok(value);
                }
                UnsupportedOperandSnafu {
                    op: "divmod()",
                    types: vec![self.type_name(), rhs.type_name()],
                }
                .fail()
            }
        }
    }

    /// Three argument `pow(self, exponent, modulus)`
    ///
    /// Every operand is resolved if it's a proxy.
    pub fn pow3(&self, exponent: &Value, modulus: &Value) -> Result<Value> {
        if let Value::Proxy(proxy) = self {
            return proxy.pow3(exponent, modulus);
        }
        let exponent = exponent.innermost()?;
        let modulus = modulus.innermost()?;

        let ints = (
            self.number(),
            exponent.number(),
            modulus.number(),
        );
        if let (Some(Number::Int(base)), Some(Number::Int(exp)), Some(Number::Int(m))) = ints {
            ensure!(
                m != 0,
                BadValueSnafu {
                    message: "pow() 3rd argument cannot be 0"
                }
            );
            ensure!(
                exp >= 0,
                BadValueSnafu {
                    message: "pow() 2nd argument cannot be negative when 3rd argument specified"
                }
            );
            return Ok(Value::Integer(mod_pow(base, exp, m)));
        }

        if let Some(value) = self.dunder(BinaryOp::Pow.method(), &[exponent.clone(), modulus.clone()])? {
            if !value.is_not_implemented() {
                return Ok(value);
            }
        }

        UnsupportedOperandSnafu {
            op: BinaryOp::Pow.symbol(),
            types: vec![self.type_name(), exponent.type_name(), modulus.type_name()],
        }
        .fail()
    }

    /// Apply an in-place operator, rebinding `self` to the result.
    ///
    /// Mutable containers are updated in place, as are user objects that
    /// define the in-place method. A proxy is never rebound; the value it
    /// wraps is replaced instead.
    pub fn inplace(&mut self, op: BinaryOp, rhs: &Value) -> Result<()> {
        let result = self.inplace_result(op, rhs)?;
        if !matches!(self, Value::Proxy(_)) {
            *self = result;
        }
        Ok(())
    }

    /// The value an in-place operator leaves its target bound to.
    pub(crate) fn inplace_result(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        match (op, self) {
            (_, Value::Proxy(proxy)) => {
                proxy.inplace(op, rhs)?;
                Ok(self.clone())
            }
            (BinaryOp::Add, Value::List(list)) => {
                let items = rhs.collect_items()?;
                s_write!(list).extend(items);
                Ok(self.clone())
            }
            (BinaryOp::Mul, Value::List(list)) => {
                let count = repeat_count(&rhs.innermost()?).ok_or_else(|| {
                    TypeSnafu {
                        message: format!(
                            "can't multiply sequence by non-int of type '{}'",
                            rhs.type_name()
                        ),
                    }
                    .build()
                })?;
                let items = s_read!(list).clone();
                let items = repeated(&items, count)?;
                *s_write!(list) = items;
                Ok(self.clone())
            }
            (BinaryOp::BitOr, Value::Dict(dict)) => match rhs.innermost()? {
                Value::Dict(other) => {
                    let items = s_read!(other).items();
                    for (key, value) in items {
                        shared_insert(dict, key, value)?;
                    }
                    Ok(self.clone())
                }
                other => self.inplace_fallback(op, &other),
            },
            (_, Value::Object(_)) => {
                if let Some(value) = self.dunder(op.inplace_method(), &[rhs.clone()])? {
                    if !value.is_not_implemented() {
                        return Ok(value);
                    }
                }
                self.inplace_fallback(op, rhs)
            }
            _ => self.inplace_fallback(op, rhs),
        }
    }

    fn inplace_fallback(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        self.binary(op, rhs).map_err(|e| match e {
            SlothError::UnsupportedOperand { types, .. } => SlothError::UnsupportedOperand {
                op: op.inplace_symbol().to_owned(),
                types,
            },
            e => e,
        })
    }

    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.neg(),
            Value::Boolean(b) => Ok(Value::Integer(-(*b as SlothInteger))),
            Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or_else(overflow),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => self
                .unary_dunder(NEG)?
                .ok_or_else(|| bad_operand("unary -", self)),
        }
    }

    pub fn pos(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.pos(),
            Value::Boolean(b) => Ok(Value::Integer(*b as SlothInteger)),
            Value::Integer(_) | Value::Float(_) => Ok(self.clone()),
            _ => self
                .unary_dunder(POS)?
                .ok_or_else(|| bad_operand("unary +", self)),
        }
    }

    pub fn abs(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.abs(),
            Value::Boolean(b) => Ok(Value::Integer(*b as SlothInteger)),
            Value::Integer(i) => i.checked_abs().map(Value::Integer).ok_or_else(overflow),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            _ => self
                .unary_dunder(ABS)?
                .ok_or_else(|| bad_operand("abs()", self)),
        }
    }

    /// Bitwise inversion, `~self`
    pub fn invert(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.invert(),
            Value::Boolean(b) => Ok(Value::Integer(!(*b as SlothInteger))),
            Value::Integer(i) => Ok(Value::Integer(!i)),
            _ => self
                .unary_dunder(INVERT)?
                .ok_or_else(|| bad_operand("unary ~", self)),
        }
    }

    /// Integer conversion, `int(self)`
    pub fn to_int(&self) -> Result<SlothInteger> {
        match self {
            Value::Proxy(proxy) => proxy.to_int(),
            Value::Boolean(b) => Ok(*b as SlothInteger),
            Value::Integer(i) => Ok(*i),
            Value::Float(f) => {
                ensure!(
                    !f.is_nan(),
                    BadValueSnafu {
                        message: "cannot convert float NaN to integer"
                    }
                );
                ensure!(
                    f.is_finite(),
                    OverflowSnafu {
                        message: "cannot convert float infinity to integer"
                    }
                );
                let truncated = f.trunc();
                ensure!(
                    truncated >= SlothInteger::MIN as SlothFloat
                        && truncated < SlothInteger::MAX as SlothFloat,
                    OverflowSnafu {
                        message: "int too large to convert"
                    }
                );
                Ok(truncated as SlothInteger)
            }
            Value::String(s) => s.trim().replace('_', "").parse().map_err(|_| {
                BadValueSnafu {
                    message: format!("invalid literal for int() with base 10: '{s}'"),
                }
                .build()
            }),
            _ => {
                for name in [INT, INDEX] {
                    if let Some(value) = self.unary_dunder(name)? {
                        return match value {
                            Value::Integer(i) => Ok(i),
                            Value::Boolean(b) => Ok(b as SlothInteger),
                            other => TypeSnafu {
                                message: format!(
                                    "{name} returned non-int (type {})",
                                    other.type_name()
                                ),
                            }
                            .fail(),
                        };
                    }
                }
                TypeSnafu {
                    message: format!(
                        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                        self.type_name()
                    ),
                }
                .fail()
            }
        }
    }

    /// Float conversion, `float(self)`
    pub fn to_float(&self) -> Result<SlothFloat> {
        match self {
            Value::Proxy(proxy) => proxy.to_float(),
            Value::Boolean(b) => Ok(*b as SlothInteger as SlothFloat),
            Value::Integer(i) => Ok(*i as SlothFloat),
            Value::Float(f) => Ok(*f),
            Value::String(s) => s.trim().parse().map_err(|_| {
                BadValueSnafu {
                    message: format!("could not convert string to float: '{s}'"),
                }
                .build()
            }),
            _ => {
                if let Some(value) = self.unary_dunder(FLOAT)? {
                    return match value {
                        Value::Float(f) => Ok(f),
                        other => TypeSnafu {
                            message: format!(
                                "{FLOAT} returned non-float (type {})",
                                other.type_name()
                            ),
                        }
                        .fail(),
                    };
                }
                if let Some(value) = self.unary_dunder(INDEX)? {
                    return value.index().map(|i| i as SlothFloat);
                }
                TypeSnafu {
                    message: format!(
                        "float() argument must be a string or a real number, not '{}'",
                        self.type_name()
                    ),
                }
                .fail()
            }
        }
    }

    /// The value as a lossless integer, `operator.index(self)`
    pub fn index(&self) -> Result<SlothInteger> {
        match self {
            Value::Proxy(proxy) => proxy.index(),
            Value::Boolean(b) => Ok(*b as SlothInteger),
            Value::Integer(i) => Ok(*i),
            _ => match self.unary_dunder(INDEX)? {
                Some(Value::Integer(i)) => Ok(i),
                Some(Value::Boolean(b)) => Ok(b as SlothInteger),
                Some(other) => TypeSnafu {
                    message: format!("{INDEX} returned non-int (type {})", other.type_name()),
                }
                .fail(),
                None => TypeSnafu {
                    message: format!(
                        "'{}' object cannot be interpreted as an integer",
                        self.type_name()
                    ),
                }
                .fail(),
            },
        }
    }

    /// `round(self)`, rounding half to even.
    pub fn round(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.round(),
            Value::Boolean(b) => Ok(Value::Integer(*b as SlothInteger)),
            Value::Integer(_) => Ok(self.clone()),
            Value::Float(f) => {
                let rounded = if (f - f.trunc()).abs() == 0.5 {
                    2.0 * (f / 2.0).round()
                } else {
                    f.round()
                };
                Value::Float(rounded).to_int().map(Value::Integer)
            }
            _ => self.unary_dunder(ROUND)?.ok_or_else(|| {
                TypeSnafu {
                    message: format!("type {} doesn't define {ROUND} method", self.type_name()),
                }
                .build()
            }),
        }
    }

    /// Equality, `self == other`
    pub fn equals(&self, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Proxy(proxy), _) => proxy.equals(other),
            (_, Value::Proxy(proxy)) => proxy.reflected_equals(self),
            _ => {
                if let (Some(x), Some(y)) = (self.number(), other.number()) {
                    return Ok(match (x, y) {
                        (Number::Int(a), Number::Int(b)) => a == b,
                        _ => x.float() == y.float(),
                    });
                }
                match (self, other) {
                    (Value::None, Value::None) => Ok(true),
                    (Value::NotImplemented, Value::NotImplemented) => Ok(true),
                    (Value::String(a), Value::String(b)) => Ok(a == b),
                    (Value::Bytes(a), Value::Bytes(b)) => Ok(a == b),
                    (Value::Slice(a), Value::Slice(b)) => Ok(a == b),
                    (Value::Type(a), Value::Type(b)) => Ok(a == b),
                    (Value::Tuple(a), Value::Tuple(b)) => sequence_equals(a, b),
                    (Value::List(a), Value::List(b)) => {
                        if self.is(other) {
                            return Ok(true);
                        }
                        let a = s_read!(a).clone();
                        let b = s_read!(b).clone();
                        sequence_equals(&a, &b)
                    }
                    (Value::Dict(a), Value::Dict(b)) => {
                        if self.is(other) {
                            return Ok(true);
                        }
                        let a = s_read!(a).clone();
                        let b = s_read!(b).clone();
                        a.equals(&b)
                    }
                    (Value::Method(a), Value::Method(b)) => Ok(a.receiver().is(b.receiver())
                        && a.function_value().is(&b.function_value())),
                    _ => match self.dispatch_binary(other, EQ, EQ)? {
                        Some(value) => value.truthy(),
                        None => Ok(self.is(other)),
                    },
                }
            }
        }
    }

    /// Inequality, `self != other`
    pub fn not_equals(&self, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Proxy(proxy), _) => proxy.not_equals(other),
            (_, Value::Proxy(proxy)) => proxy.reflected_not_equals(self),
            _ => match self.dispatch_binary(other, NE, NE)? {
                Some(value) => value.truthy(),
                None => self.equals(other).map(|eq| !eq),
            },
        }
    }

    /// An ordering comparison
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Proxy(proxy), _) => proxy.compare(op, other),
            (_, Value::Proxy(proxy)) => proxy.reflected_compare(op, self),
            _ => {
                if let (Some(x), Some(y)) = (self.number(), other.number()) {
                    let ordering = match (x, y) {
                        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
                        _ => x.float().partial_cmp(&y.float()),
                    };
                    return Ok(ordering.is_some_and(|o| op.check(o)));
                }
                match (self, other) {
                    (Value::String(a), Value::String(b)) => Ok(op.check(a.cmp(b))),
                    (Value::Bytes(a), Value::Bytes(b)) => Ok(op.check(a.cmp(b))),
                    (Value::Tuple(a), Value::Tuple(b)) => sequence_compare(op, a, b),
                    (Value::List(a), Value::List(b)) => {
                        let a = s_read!(a).clone();
                        let b = s_read!(b).clone();
                        sequence_compare(op, &a, &b)
                    }
                    _ => {
                        if let Some(value) = self.dunder(op.method(), &[other.clone()])? {
                            if !value.is_not_implemented() {
                                return value.truthy();
                            }
                        }
                        if let Some(value) = other.dunder(op.reflected(), &[self.clone()])? {
                            if !value.is_not_implemented() {
                                return value.truthy();
                            }
                        }
                        TypeSnafu {
                            message: format!(
                                "'{}' not supported between instances of '{}' and '{}'",
                                op.symbol(),
                                self.type_name(),
                                other.type_name()
                            ),
                        }
                        .fail()
                    }
                }
            }
        }
    }

    pub fn lt(&self, other: &Value) -> Result<bool> {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(&self, other: &Value) -> Result<bool> {
        self.compare(CompareOp::Le, other)
    }

    pub fn gt(&self, other: &Value) -> Result<bool> {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(&self, other: &Value) -> Result<bool> {
        self.compare(CompareOp::Ge, other)
    }

    /// The hash of the value
    ///
    /// Values that compare equal hash equal, so `1`, `1.0` and `True` collide
    /// on purpose. Mutable containers are unhashable, as are user objects that
    /// define equality without defining a hash.
    pub fn hash(&self) -> Result<u64> {
        match self {
            Value::Proxy(proxy) => proxy.hash(),
            Value::None => Ok(NONE_HASH),
            Value::NotImplemented => Ok(NOT_IMPLEMENTED_HASH),
            Value::Boolean(b) => Ok(*b as u64),
            Value::Integer(i) => Ok(*i as u64),
            Value::Float(f) => {
                if f.fract() == 0.0
                    && *f >= SlothInteger::MIN as SlothFloat
                    && *f < SlothInteger::MAX as SlothFloat
                {
                    Ok(*f as SlothInteger as u64)
                } else {
                    Ok(fx_hash(&f.to_bits()))
                }
            }
            Value::String(s) => Ok(str_hash(s)),
            Value::Bytes(b) => Ok(fx_hash(b.as_slice())),
            Value::Tuple(items) => {
                let mut hasher = FxHasher::default();
                items.len().hash(&mut hasher);
                for item in items {
                    hasher.write_u64(item.hash()?);
                }
                Ok(hasher.finish())
            }
            Value::Type(builtin) => Ok(fx_hash(builtin)),
            Value::List(_) | Value::Dict(_) | Value::Slice(_) => TypeSnafu {
                message: format!("unhashable type: '{}'", self.type_name()),
            }
            .fail(),
            Value::Method(method) => {
                let receiver = method.receiver().address().unwrap_or_default();
                let function = method.function_value().address().unwrap_or_default();
                Ok(fx_hash(&(receiver, function)))
            }
            Value::Object(_) => match self.unary_dunder(HASH)? {
                Some(value) => value.index().map(|h| h as u64),
                None if self.class_defines(EQ) => TypeSnafu {
                    message: format!("unhashable type: '{}'", self.type_name()),
                }
                .fail(),
                None => Ok(fx_hash(&self.address())),
            },
            Value::Function(_) | Value::Class(_) | Value::Iterator(_) | Value::ProxyClass(_) => {
                Ok(fx_hash(&self.address()))
            }
        }
    }

    /// Truthiness, `bool(self)`
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Proxy(proxy) => proxy.truthy(),
            Value::None => Ok(false),
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) => Ok(!s.is_empty()),
            Value::Bytes(b) => Ok(!b.is_empty()),
            Value::Tuple(items) => Ok(!items.is_empty()),
            Value::List(list) => Ok(!s_read!(list).is_empty()),
            Value::Dict(dict) => Ok(!s_read!(dict).is_empty()),
            Value::Object(_) => {
                if let Some(value) = self.unary_dunder(BOOL)? {
                    return match value {
                        Value::Boolean(b) => Ok(b),
                        other => TypeSnafu {
                            message: format!(
                                "{BOOL} should return bool, returned {}",
                                other.type_name()
                            ),
                        }
                        .fail(),
                    };
                }
                if self.class_defines(LEN) {
                    return Ok(self.len()? != 0);
                }
                Ok(true)
            }
            _ => Ok(true),
        }
    }
}

fn sequence_equals(a: &[Value], b: &[Value]) -> Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (a, b) in a.iter().zip(b) {
        if !(a.is(b) || a.equals(b)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sequence_compare(op: CompareOp, a: &[Value], b: &[Value]) -> Result<bool> {
    for (a, b) in a.iter().zip(b) {
        if !(a.is(b) || a.equals(b)?) {
            return a.compare(op, b);
        }
    }
    Ok(op.check(a.len().cmp(&b.len())))
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait<&Value> for &Value {
            type Output = Result<Value>;

            fn $method(self, rhs: &Value) -> Self::Output {
                self.binary($op, rhs)
            }
        }

        impl std::ops::$trait for Value {
            type Output = Result<Value>;

            fn $method(self, rhs: Value) -> Self::Output {
                self.binary($op, &rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::TrueDiv);
binary_operator!(Rem, rem, BinaryOp::Mod);
binary_operator!(Shl, shl, BinaryOp::LShift);
binary_operator!(Shr, shr, BinaryOp::RShift);
binary_operator!(BitAnd, bitand, BinaryOp::BitAnd);
binary_operator!(BitXor, bitxor, BinaryOp::BitXor);
binary_operator!(BitOr, bitor, BinaryOp::BitOr);

impl std::ops::Neg for &Value {
    type Output = Result<Value>;

    fn neg(self) -> Self::Output {
        Value::neg(self)
    }
}

impl std::ops::Neg for Value {
    type Output = Result<Value>;

    fn neg(self) -> Self::Output {
        Value::neg(&self)
    }
}

/// `!value` is bitwise inversion, as `~` would be.
impl std::ops::Not for &Value {
    type Output = Result<Value>;

    fn not(self) -> Self::Output {
        self.invert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Integer(i)
    }

    #[test]
    fn integer_arithmetic() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!((&int(7) + &int(3)).unwrap(), int(10));
        assert_eq!(int(7).binary(BinaryOp::FloorDiv, &int(-2)).unwrap(), int(-4));
        assert_eq!(int(-7).binary(BinaryOp::Mod, &int(3)).unwrap(), int(2));
        assert_eq!(int(2).binary(BinaryOp::Pow, &int(10)).unwrap(), int(1024));
        assert_eq!(
            int(2).binary(BinaryOp::Pow, &int(-1)).unwrap(),
            Value::Float(0.5)
        );
        assert_eq!((&int(1) << &int(4)).unwrap(), int(16));
        assert_eq!((&int(-16) >> &int(2)).unwrap(), int(-4));
    }

    #[test]
    fn overflow_is_an_error() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = (&int(SlothInteger::MAX) + &int(1)).unwrap_err();
        assert_eq!(err.kind(), "OverflowError");
    }

    #[test]
    fn exponents_beyond_u32() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let huge = int(u32::MAX as SlothInteger + 1);
        let odd = int(u32::MAX as SlothInteger + 2);
        assert_eq!(int(0).binary(BinaryOp::Pow, &huge).unwrap(), int(0));
        assert_eq!(int(1).binary(BinaryOp::Pow, &huge).unwrap(), int(1));
        assert_eq!(int(-1).binary(BinaryOp::Pow, &huge).unwrap(), int(1));
        assert_eq!(int(-1).binary(BinaryOp::Pow, &odd).unwrap(), int(-1));
        assert_eq!(int(0).binary(BinaryOp::Pow, &int(0)).unwrap(), int(1));

        let err = int(2).binary(BinaryOp::Pow, &huge).unwrap_err();
        assert_eq!(err.kind(), "OverflowError");
    }

    #[test]
    fn sequence_repetition() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1, 2]);
        assert_eq!(
            (&list * &int(3)).unwrap(),
            Value::from(vec![1, 2, 1, 2, 1, 2])
        );
        assert_eq!(
            (&Value::from("ab") * &int(2)).unwrap(),
            Value::from("abab")
        );
        assert_eq!(
            (&Value::tuple(vec![int(1)]) * &int(0)).unwrap(),
            Value::tuple(vec![])
        );

        let mut target = list.clone();
        target.inplace(BinaryOp::Mul, &int(2)).unwrap();
        assert!(target.is(&list));
        assert_eq!(list, Value::from(vec![1, 2, 1, 2]));
    }

    #[test]
    fn division_by_zero() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = (&int(1) / &int(0)).unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
        let err = int(1).binary(BinaryOp::FloorDiv, &int(0)).unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
        let err = Value::Float(1.0).binary(BinaryOp::Mod, &int(0)).unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
    }

    #[test]
    fn mixed_numbers() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!((&int(1) + &Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!((&Value::Boolean(true) + &int(1)).unwrap(), int(2));
        assert_eq!(
            (&Value::Boolean(true) & &Value::Boolean(false)).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            Value::Float(-7.5).binary(BinaryOp::Mod, &int(2)).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn sequences() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let joined = (&Value::from("ab") + &Value::from("cd")).unwrap();
        assert_eq!(joined, Value::from("abcd"));

        let repeated = (&int(3) * &Value::from("x")).unwrap();
        assert_eq!(repeated, Value::from("xxx"));

        let list = (&Value::from(vec![1]) * &int(2)).unwrap();
        assert_eq!(list, Value::from(vec![1, 1]));

        let formatted = (&Value::from("%s-%d") % &Value::tuple(vec!["a".into(), 2.into()])).unwrap();
        assert_eq!(formatted, Value::from("a-2"));
    }

    #[test]
    fn unsupported_operands() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = (&int(1) + &Value::from("a")).unwrap_err();
        assert_eq!(
            err.message(),
            "unsupported operand type(s) for +: 'int' and 'str'"
        );

        let err = Value::from("a").pow3(&int(2), &int(3)).unwrap_err();
        assert_eq!(
            err.message(),
            "unsupported operand type(s) for ** or pow(): 'str', 'int', 'int'"
        );
    }

    #[test]
    fn divmod_and_pow3() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(
            int(7).divmod(&int(-2)).unwrap(),
            Value::tuple(vec![int(-4), int(-1)])
        );
        assert_eq!(int(3).pow3(&int(4), &int(5)).unwrap(), int(1));
        assert_eq!(int(3).pow3(&int(2), &int(-2)).unwrap(), int(-1));
        assert!(int(3).pow3(&int(2), &int(0)).is_err());
    }

    #[test]
    fn inplace_rebinds_immutables() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let mut value = int(1);
        value.inplace(BinaryOp::Add, &int(2)).unwrap();
        assert_eq!(value, int(3));

        let err = Value::from("a")
            .inplace_result(BinaryOp::Sub, &int(1))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "unsupported operand type(s) for -=: 'str' and 'int'"
        );
    }

    #[test]
    fn inplace_mutates_lists() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1]);
        let mut alias = list.clone();
        alias.inplace(BinaryOp::Add, &Value::from(vec![2])).unwrap();
        assert!(alias.is(&list));
        assert_eq!(list, Value::from(vec![1, 2]));
    }

    #[test]
    fn unary() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!((-&int(3)).unwrap(), int(-3));
        assert_eq!(int(-3).abs().unwrap(), int(3));
        assert_eq!((!&int(0)).unwrap(), int(-1));
        assert_eq!(Value::Boolean(true).pos().unwrap(), int(1));
        assert!(Value::from("a").neg().unwrap_err().is_type_error());
        assert!(Value::Float(1.5).invert().is_err());
    }

    #[test]
    fn conversions() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::Float(-2.7).to_int().unwrap(), -2);
        assert_eq!(Value::from(" 12 ").to_int().unwrap(), 12);
        assert!(Value::Float(f64::NAN).to_int().is_err());
        assert_eq!(Value::from("2.5").to_float().unwrap(), 2.5);
        assert!(Value::Float(1.0).index().unwrap_err().is_type_error());
        assert_eq!(Value::Float(2.5).round().unwrap(), int(2));
        assert_eq!(Value::Float(3.5).round().unwrap(), int(4));
    }

    #[test]
    fn comparisons() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert!(int(1).lt(&Value::Float(1.5)).unwrap());
        assert!(Value::from("abc").lt(&Value::from("abd")).unwrap());
        assert!(Value::tuple(vec![int(1), int(2)])
            .lt(&Value::tuple(vec![int(1), int(3)]))
            .unwrap());
        assert!(Value::from(vec![1]).le(&Value::from(vec![1, 0])).unwrap());
        assert!(int(1).equals(&Value::Float(1.0)).unwrap());
        assert!(int(1).not_equals(&Value::from("1")).unwrap());

        let err = int(1).lt(&Value::from("a")).unwrap_err();
        assert_eq!(
            err.message(),
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn hashing() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(int(1).hash().unwrap(), Value::Float(1.0).hash().unwrap());
        assert_eq!(int(1).hash().unwrap(), Value::Boolean(true).hash().unwrap());
        assert!(Value::from(vec![1]).hash().unwrap_err().is_type_error());
        assert_eq!(
            Value::tuple(vec![int(1), "a".into()]).hash().unwrap(),
            Value::tuple(vec![int(1), "a".into()]).hash().unwrap()
        );
    }

    #[test]
    fn truthiness() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert!(!Value::None.truthy().unwrap());
        assert!(!int(0).truthy().unwrap());
        assert!(Value::from("x").truthy().unwrap());
        assert!(!Value::from(Vec::<Value>::new()).truthy().unwrap());
    }
}
