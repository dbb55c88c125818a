//! The container protocol: length, membership and subscripting
use snafu::prelude::*;

use crate::{
    error::{BadValueSnafu, IndexSnafu, KeySnafu, Result, TypeSnafu},
    keywords::{CONTAINS, DELITEM, GETITEM, ITER, LEN, SETITEM},
    s_read, s_write,
    value::dict::{shared_get, shared_insert, shared_remove},
    SlothInteger, Value,
};

/// Resolve a possibly negative index against a length.
fn normalize(index: SlothInteger, len: usize) -> Option<usize> {
    let len = len as SlothInteger;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        Some(index as usize)
    } else {
        None
    }
}

fn out_of_range(what: &str) -> crate::SlothError {
    IndexSnafu {
        message: format!("{what} index out of range"),
    }
    .build()
}

fn key_error(key: &Value) -> crate::SlothError {
    KeySnafu {
        key: key.repr().unwrap_or_else(|_| key.type_name()),
    }
    .build()
}

impl Value {
    /// `len(self)`
    pub fn len(&self) -> Result<usize> {
        match self {
            Value::Proxy(proxy) => proxy.len(),
            Value::String(s) => Ok(s.chars().count()),
            Value::Bytes(b) => Ok(b.len()),
            Value::Tuple(items) => Ok(items.len()),
            Value::List(list) => Ok(s_read!(list).len()),
            Value::Dict(dict) => Ok(s_read!(dict).len()),
            _ => match self.dunder(LEN, &[])? {
                Some(value) => {
                    let len = value.index()?;
                    usize::try_from(len).ok().context(BadValueSnafu {
                        message: format!("{LEN}() should return >= 0"),
                    })
                }
                None => TypeSnafu {
                    message: format!("object of type '{}' has no len()", self.type_name()),
                }
                .fail(),
            },
        }
    }

    /// Membership, `item in self`
    pub fn contains(&self, item: &Value) -> Result<bool> {
        match self {
            Value::Proxy(proxy) => proxy.contains(item),
            Value::String(s) => match item.innermost()? {
                Value::String(needle) => Ok(s.contains(needle.as_str())),
                other => TypeSnafu {
                    message: format!(
                        "'in <string>' requires string as left operand, not {}",
                        other.type_name()
                    ),
                }
                .fail(),
            },
            Value::Bytes(bytes) => match item.innermost()? {
                Value::Bytes(needle) => Ok(needle.is_empty()
                    || bytes.windows(needle.len()).any(|w| w == needle.as_slice())),
                other => {
                    let byte = other.index()?;
                    Ok(bytes.iter().any(|b| *b as SlothInteger == byte))
                }
            },
            Value::Tuple(items) => any_equal(items, item),
            Value::List(list) => {
                let items = s_read!(list).clone();
                any_equal(&items, item)
            }
            Value::Dict(dict) => Ok(shared_get(dict, item)?.is_some()),
            Value::Object(_) if self.class_defines(CONTAINS) => {
                match self.dunder(CONTAINS, &[item.clone()])? {
                    Some(value) => value.truthy(),
                    None => Ok(false),
                }
            }
            Value::Object(_) if self.class_defines(ITER) => {
                for candidate in self.iterate()? {
                    let candidate = candidate?;
                    if candidate.is(item) || candidate.equals(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Value::Iterator(_) => {
                for candidate in self.iterate()? {
                    let candidate = candidate?;
                    if candidate.is(item) || candidate.equals(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => TypeSnafu {
                message: format!("argument of type '{}' is not iterable", self.type_name()),
            }
            .fail(),
        }
    }

    /// Subscript, `self[key]`
    ///
    /// Sequences take an integer index or a [`Value::Slice`].
    pub fn get_item(&self, key: &Value) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.get_item(key),
            Value::Dict(dict) => match shared_get(dict, key)? {
                Some(value) => Ok(value),
                None => Err(key_error(key)),
            },
            Value::String(s) => {
                let chars = s.chars().collect::<Vec<_>>();
                match key.innermost()? {
                    Value::Slice(slice) => Ok(Value::String(slice.select(&chars)?.into_iter().collect())),
                    key => {
                        let index = normalize(key.index()?, chars.len())
                            .ok_or_else(|| out_of_range("string"))?;
                        Ok(Value::String(chars[index].to_string()))
                    }
                }
            }
            Value::Bytes(bytes) => match key.innermost()? {
                Value::Slice(slice) => Ok(Value::Bytes(slice.select(bytes)?)),
                key => {
                    let index = normalize(key.index()?, bytes.len())
                        .ok_or_else(|| out_of_range("index"))?;
                    Ok(Value::Integer(bytes[index] as SlothInteger))
                }
            },
            Value::Tuple(items) => match key.innermost()? {
                Value::Slice(slice) => Ok(Value::Tuple(slice.select(items)?)),
                key => {
                    let index = normalize(key.index()?, items.len())
                        .ok_or_else(|| out_of_range("tuple"))?;
                    Ok(items[index].clone())
                }
            },
            Value::List(list) => match key.innermost()? {
                Value::Slice(slice) => {
                    let items = s_read!(list).clone();
                    Ok(Value::list(slice.select(&items)?))
                }
                key => {
                    let index = key.index()?;
                    let list = s_read!(list);
                    let index = normalize(index, list.len()).ok_or_else(|| out_of_range("list"))?;
                    Ok(list[index].clone())
                }
            },
            _ => match self.dunder(GETITEM, &[key.clone()])? {
                Some(value) => Ok(value),
                None => TypeSnafu {
                    message: format!("'{}' object is not subscriptable", self.type_name()),
                }
                .fail(),
            },
        }
    }

    /// Subscript assignment, `self[key] = value`
    pub fn set_item(&self, key: &Value, value: Value) -> Result<()> {
        match self {
            Value::Proxy(proxy) => proxy.set_item(key, value),
            Value::Dict(dict) => shared_insert(dict, key.clone(), value),
            Value::List(list) => match key.innermost()? {
                Value::Slice(slice) => {
                    let replacement = value.collect_items()?;
                    let mut list = s_write!(list);
                    let (start, stop, step) = slice.indices(list.len())?;
                    if step == 1 {
                        let stop = stop.max(start);
                        list.splice(start as usize..stop as usize, replacement);
                        return Ok(());
                    }
                    let positions = slice.positions(list.len())?;
                    ensure!(
                        positions.len() == replacement.len(),
                        BadValueSnafu {
                            message: format!(
                                "attempt to assign sequence of size {} to extended slice of size {}",
                                replacement.len(),
                                positions.len()
                            ),
                        }
                    );
                    for (position, item) in positions.into_iter().zip(replacement) {
                        list[position] = item;
                    }
                    Ok(())
                }
                key => {
                    let index = key.index()?;
                    let mut list = s_write!(list);
                    let index = normalize(index, list.len())
                        .ok_or_else(|| out_of_range("list assignment"))?;
                    list[index] = value;
                    Ok(())
                }
            },
            Value::Object(_) => match self.dunder(SETITEM, &[key.clone(), value])? {
                Some(_) => Ok(()),
                None => self.no_item_assignment(),
            },
            _ => self.no_item_assignment(),
        }
    }

    /// Subscript deletion, `del self[key]`
    pub fn del_item(&self, key: &Value) -> Result<()> {
        match self {
            Value::Proxy(proxy) => proxy.del_item(key),
            Value::Dict(dict) => match shared_remove(dict, key)? {
                Some(_) => Ok(()),
                None => Err(key_error(key)),
            },
            Value::List(list) => match key.innermost()? {
                Value::Slice(slice) => {
                    let mut list = s_write!(list);
                    let mut positions = slice.positions(list.len())?;
                    positions.sort_unstable();
                    for position in positions.into_iter().rev() {
                        list.remove(position);
                    }
                    Ok(())
                }
                key => {
                    let index = key.index()?;
                    let mut list = s_write!(list);
                    let index = normalize(index, list.len())
                        .ok_or_else(|| out_of_range("list assignment"))?;
                    list.remove(index);
                    Ok(())
                }
            },
            Value::Object(_) => match self.dunder(DELITEM, &[key.clone()])? {
                Some(_) => Ok(()),
                None => self.no_item_deletion(),
            },
            _ => self.no_item_deletion(),
        }
    }

    fn no_item_assignment(&self) -> Result<()> {
        TypeSnafu {
            message: format!(
                "'{}' object does not support item assignment",
                self.type_name()
            ),
        }
        .fail()
    }

    fn no_item_deletion(&self) -> Result<()> {
        TypeSnafu {
            message: format!(
                "'{}' object doesn't support item deletion",
                self.type_name()
            ),
        }
        .fail()
    }
}

fn any_equal(items: &[Value], item: &Value) -> Result<bool> {
    for candidate in items {
        if candidate.is(item) || candidate.equals(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dict, Slice};

    #[test]
    fn lengths() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert_eq!(Value::from("héllo").len().unwrap(), 5);
        assert_eq!(Value::from(vec![1, 2]).len().unwrap(), 2);
        assert!(Value::from(1).len().unwrap_err().is_type_error());
    }

    #[test]
    fn list_items() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1, 2, 3, 4]);
        assert_eq!(list.get_item(&Value::from(-1)).unwrap(), Value::from(4));
        assert_eq!(
            list.get_item(&Value::slice(Some(1), Some(3))).unwrap(),
            Value::from(vec![2, 3])
        );

        list.set_item(&Value::from(0), Value::from(10)).unwrap();
        assert_eq!(list.get_item(&Value::from(0)).unwrap(), Value::from(10));

        list.set_item(&Value::slice(Some(1), Some(3)), Value::from(vec![7]))
            .unwrap();
        assert_eq!(list, Value::from(vec![10, 7, 4]));

        list.del_item(&Value::slice(None, Some(1))).unwrap();
        assert_eq!(list, Value::from(vec![7, 4]));

        let err = list.get_item(&Value::from(5)).unwrap_err();
        assert_eq!(err.message(), "list index out of range");
    }

    #[test]
    fn extended_slices() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![0, 1, 2, 3, 4, 5]);
        let evens = Value::Slice(Slice::new(None, None).with_step(Some(2)));
        assert_eq!(list.get_item(&evens).unwrap(), Value::from(vec![0, 2, 4]));

        list.del_item(&evens).unwrap();
        assert_eq!(list, Value::from(vec![1, 3, 5]));

        let reversed = Value::Slice(Slice::new(None, None).with_step(Some(-1)));
        assert_eq!(
            Value::from("abc").get_item(&reversed).unwrap(),
            Value::from("cba")
        );
    }

    #[test]
    fn dict_items() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let dict = Value::from(Dict::from_pairs(vec![("a", 1)]).unwrap());
        dict.set_item(&"b".into(), 2.into()).unwrap();
        assert_eq!(dict.get_item(&"b".into()).unwrap(), Value::from(2));
        assert!(dict.contains(&"a".into()).unwrap());

        dict.del_item(&"a".into()).unwrap();
        let err = dict.get_item(&"a".into()).unwrap_err();
        assert_eq!(err.kind(), "KeyError");
        assert_eq!(err.message(), "'a'");
    }

    #[test]
    fn membership() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        assert!(Value::from("hello").contains(&"ell".into()).unwrap());
        assert!(Value::from(vec![1, 2]).contains(&Value::from(2.0)).unwrap());
        assert!(!Value::tuple(vec![]).contains(&Value::None).unwrap());
        assert!(Value::from("a").contains(&1.into()).unwrap_err().is_type_error());
    }

    #[test]
    fn immutable_sequences() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let tuple = Value::tuple(vec![1.into()]);
        assert!(tuple
            .set_item(&0.into(), 2.into())
            .unwrap_err()
            .is_type_error());
        assert!(tuple.del_item(&0.into()).unwrap_err().is_type_error());
    }
}
