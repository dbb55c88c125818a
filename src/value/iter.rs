//! Iteration
//!
//! A list iterator reads the live list one position at a time, so changes
//! made through any alias while iterating are visible. Other built in
//! iterables are snapshotted when the iterator is made.
use crate::{
    error::{Result, SlothError, TypeSnafu},
    keywords::{ITER, NEXT, REVERSED},
    new_ref, s_read, s_write, RefType, Value,
};

#[derive(Debug)]
enum Source {
    List(RefType<Vec<Value>>),
    /// `next` is the next position to yield, or negative once exhausted.
    ReversedList {
        list: RefType<Vec<Value>>,
        next: isize,
    },
    Items(Vec<Value>),
    /// An object implementing `__next__`.
    Object(Value),
}

/// The state behind a `Value::Iterator`
#[derive(Debug)]
pub struct ValueIter {
    source: Source,
    position: usize,
}

impl ValueIter {
    fn new(source: Source) -> Value {
        Value::Iterator(new_ref!(
            ValueIter,
            ValueIter {
                source,
                position: 0,
            }
        ))
    }

    pub(crate) fn over_list(list: RefType<Vec<Value>>) -> Value {
        Self::new(Source::List(list))
    }

    pub(crate) fn over_list_reversed(list: RefType<Vec<Value>>) -> Value {
        let next = s_read!(list).len() as isize - 1;
        Self::new(Source::ReversedList { list, next })
    }

    pub(crate) fn over_items(items: Vec<Value>) -> Value {
        Self::new(Source::Items(items))
    }

    pub(crate) fn over_object(object: Value) -> Value {
        Self::new(Source::Object(object))
    }

    /// The object this iterator delegates to, if any.
    fn delegate(&self) -> Option<Value> {
        match &self.source {
            Source::Object(object) => Some(object.clone()),
            _ => None,
        }
    }

    /// Step a built in source. Never runs user code.
    fn advance(&mut self) -> Option<Value> {
        match &mut self.source {
            Source::List(list) => {
                let item = s_read!(list).get(self.position).cloned();
                if item.is_some() {
                    self.position += 1;
                }
                item
            }
            Source::ReversedList { list, next } => {
                let list = s_read!(list);
                if *next < 0 || *next as usize >= list.len() {
                    *next = -1;
                    return None;
                }
                let item = list[*next as usize].clone();
                *next -= 1;
                Some(item)
            }
            Source::Items(items) => {
                let item = items.get(self.position).cloned();
                if item.is_some() {
                    self.position += 1;
                }
                item
            }
            Source::Object(_) => None,
        }
    }
}

/// A Rust iterator over an object model iterable
///
/// Stops after the first error.
pub struct Iter {
    iterator: Value,
    done: bool,
}

impl Iterator for Iter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.iterator.next_item() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Value {
    /// `iter(self)`
    pub fn iter(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.iter(),
            Value::List(list) => Ok(ValueIter::over_list(list.clone())),
            Value::Tuple(items) => Ok(ValueIter::over_items(items.clone())),
            Value::String(s) => Ok(ValueIter::over_items(
                s.chars().map(|c| Value::String(c.to_string())).collect(),
            )),
            Value::Bytes(bytes) => Ok(ValueIter::over_items(
                bytes.iter().map(|b| Value::Integer(*b as i64)).collect(),
            )),
            Value::Dict(dict) => Ok(ValueIter::over_items(s_read!(dict).keys())),
            Value::Iterator(_) => Ok(self.clone()),
            _ => match self.dunder(ITER, &[])? {
                Some(iterator @ Value::Iterator(_)) => Ok(iterator),
                Some(iterator) => {
                    if iterator.class_defines(NEXT) {
                        Ok(ValueIter::over_object(iterator))
                    } else {
                        TypeSnafu {
                            message: format!(
                                "iter() returned non-iterator of type '{}'",
                                iterator.type_name()
                            ),
                        }
                        .fail()
                    }
                }
                None if self.class_defines(NEXT) => Ok(ValueIter::over_object(self.clone())),
                None => TypeSnafu {
                    message: format!("'{}' object is not iterable", self.type_name()),
                }
                .fail(),
            },
        }
    }

    /// `next(self)`, with exhaustion as `None`.
    pub fn next_item(&self) -> Result<Option<Value>> {
        match self {
            Value::Proxy(proxy) => proxy.next_item(),
            Value::Iterator(iterator) => {
                let delegate = s_read!(iterator).delegate();
                match delegate {
                    Some(object) => object.next_item(),
                    None => Ok(s_write!(iterator).advance()),
                }
            }
            Value::Object(_) => match self.dunder(NEXT, &[]) {
                Ok(Some(value)) => Ok(Some(value)),
                Err(SlothError::StopIteration) => Ok(None),
                Err(e) if e.kind() == "StopIteration" => Ok(None),
                Err(e) => Err(e),
                Ok(None) => self.not_an_iterator(),
            },
            _ => self.not_an_iterator(),
        }
    }

    fn not_an_iterator<T>(&self) -> Result<T> {
        TypeSnafu {
            message: format!("'{}' object is not an iterator", self.type_name()),
        }
        .fail()
    }

    /// Iterate the value from Rust.
    pub fn iterate(&self) -> Result<Iter> {
        Ok(Iter {
            iterator: self.iter()?,
            done: false,
        })
    }

    /// `reversed(self)`
    pub fn reversed(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.reversed(),
            Value::List(list) => Ok(ValueIter::over_list_reversed(list.clone())),
            Value::Tuple(items) => Ok(ValueIter::over_items(items.iter().rev().cloned().collect())),
            Value::String(s) => Ok(ValueIter::over_items(
                s.chars().rev().map(|c| Value::String(c.to_string())).collect(),
            )),
            Value::Bytes(bytes) => Ok(ValueIter::over_items(
                bytes.iter().rev().map(|b| Value::Integer(*b as i64)).collect(),
            )),
            Value::Dict(dict) => {
                let mut keys = s_read!(dict).keys();
                keys.reverse();
                Ok(ValueIter::over_items(keys))
            }
            _ => match self.dunder(REVERSED, &[])? {
                Some(iterator) => iterator.iter(),
                None => TypeSnafu {
                    message: format!("'{}' object is not reversible", self.type_name()),
                }
                .fail(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Args, Class, Dict, Function};

    #[test]
    fn list_iteration_is_live() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1, 2]);
        let iterator = list.iter().unwrap();

        assert_eq!(iterator.next_item().unwrap(), Some(Value::from(1)));
        list.get_attr("append")
            .unwrap()
            .call_with([Value::from(3)])
            .unwrap();
        assert_eq!(iterator.next_item().unwrap(), Some(Value::from(2)));
        assert_eq!(iterator.next_item().unwrap(), Some(Value::from(3)));
        assert_eq!(iterator.next_item().unwrap(), None);
    }

    #[test]
    fn collecting() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let items = Value::from("ab").collect_items().unwrap();
        assert_eq!(items, vec![Value::from("a"), Value::from("b")]);

        let dict = Value::from(Dict::from_pairs(vec![("x", 1), ("y", 2)]).unwrap());
        assert_eq!(
            dict.collect_items().unwrap(),
            vec![Value::from("x"), Value::from("y")]
        );

        assert!(Value::from(1).iter().unwrap_err().is_type_error());
    }

    #[test]
    fn reversing() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(
            list.reversed().unwrap().collect_items().unwrap(),
            vec![Value::from(3), Value::from(2), Value::from(1)]
        );
        assert!(Value::from(1).reversed().unwrap_err().is_type_error());
    }

    #[test]
    fn user_iterators() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = Class::new("Countdown")
            .with(
                "__iter__",
                Function::new("__iter__", |args: &Args| Ok(args.require(0)?.clone())),
            )
            .with(
                "__next__",
                Function::new("__next__", |args: &Args| {
                    let this = args.require(0)?;
                    let n = this.get_attr("n")?.to_int()?;
                    if n == 0 {
                        return Err(SlothError::StopIteration);
                    }
                    this.set_attr("n", Value::from(n - 1))?;
                    Ok(Value::from(n))
                }),
            );
        let countdown = Value::from(class).call_with([]).unwrap();
        countdown.set_attr("n", Value::from(3)).unwrap();

        assert_eq!(
            countdown.collect_items().unwrap(),
            vec![Value::from(3), Value::from(2), Value::from(1)]
        );
    }
}
