//! Insertion-ordered mapping keyed by hashable values
//!
//! Keys are hashed and compared through the object model, which may run user
//! code. The shared helpers at the bottom of this module take a snapshot of the
//! candidates under the lock and do the comparing after it is released.
use rustc_hash::FxHashMap as HashMap;

use crate::{error::Result, s_read, s_write, value::ops::str_hash, RefType, Value};

#[derive(Clone, Debug)]
struct Entry {
    hash: u64,
    key: Value,
    value: Value,
}

#[derive(Clone, Debug, Default)]
pub struct Dict {
    entries: Vec<Entry>,
    /// Entry positions by key hash.
    index: HashMap<u64, Vec<usize>>,
    /// Bumped whenever an entry is added or removed.
    version: u64,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dict from pairs; later duplicates overwrite earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut dict = Dict::new();
        for (key, value) in pairs {
            dict.insert(key.into(), value.into())?;
        }
        Ok(dict)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>> {
        Ok(self
            .position(key)?
            .map(|index| self.entries[index].value.clone()))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        Ok(self.position(key)?.is_some())
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<Option<Value>> {
        let hash = key.hash()?;
        match self.position_hashed(hash, &key)? {
            Some(index) => Ok(Some(std::mem::replace(
                &mut self.entries[index].value,
                value,
            ))),
            None => {
                self.push(Entry { hash, key, value });
                Ok(None)
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>> {
        Ok(self
            .position(key)?
            .map(|index| self.remove_at(index).value))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Insert under a string key. String hashing can't fail.
    pub(crate) fn insert_str(&mut self, key: &str, value: Value) {
        let hash = str_hash(key);
        let existing = self.slots(hash).iter().copied().find(
            |&index| matches!(&self.entries[index].key, Value::String(k) if k == key),
        );
        match existing {
            Some(index) => self.entries[index].value = value,
            None => self.push(Entry {
                hash,
                key: Value::from(key),
                value,
            }),
        }
    }

    fn slots(&self, hash: u64) -> &[usize] {
        self.index.get(&hash).map_or(&[], Vec::as_slice)
    }

    fn push(&mut self, entry: Entry) {
        self.index
            .entry(entry.hash)
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
        self.version += 1;
    }

    fn remove_at(&mut self, index: usize) -> Entry {
        let entry = self.entries.remove(index);
        self.reindex();
        self.version += 1;
        entry
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (index, entry) in self.entries.iter().enumerate() {
            self.index.entry(entry.hash).or_default().push(index);
        }
    }

    fn position(&self, key: &Value) -> Result<Option<usize>> {
        self.position_hashed(key.hash()?, key)
    }

    fn position_hashed(&self, hash: u64, key: &Value) -> Result<Option<usize>> {
        for &index in self.slots(hash) {
            let candidate = &self.entries[index].key;
            if candidate.is(key) || candidate.equals(key)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn candidates(&self, hash: u64) -> Vec<(usize, Value)> {
        self.slots(hash)
            .iter()
            .map(|&index| (index, self.entries[index].key.clone()))
            .collect()
    }

    /// Structural equality, comparing values through the object model.
    pub(crate) fn equals(&self, other: &Dict) -> Result<bool> {
        if self.len() != other.len() {
            return Ok(false);
        }
        for entry in &self.entries {
            match other.position_hashed(entry.hash, &entry.key)? {
                Some(index) => {
                    let theirs = &other.entries[index].value;
                    if !(theirs.is(&entry.value) || theirs.equals(&entry.value)?) {
                        return Ok(false);
                    }
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}

/// Where a key sits in a shared dict, and the dict's version when it was found.
struct Located {
    index: Option<usize>,
    version: u64,
}

/// Find the key's position in a shared dict without holding the lock while
/// keys are compared.
fn locate(dict: &RefType<Dict>, hash: u64, key: &Value) -> Result<Located> {
    let (candidates, version) = {
        let dict = s_read!(dict);
        (dict.candidates(hash), dict.version)
    };
    for (index, candidate) in candidates {
        if candidate.is(key) || candidate.equals(key)? {
            return Ok(Located {
                index: Some(index),
                version,
            });
        }
    }
    Ok(Located {
        index: None,
        version,
    })
}

// Comparing keys may run user code that adds or removes entries. When the
// version moved under a lookup, the lookup starts over.

pub(crate) fn shared_get(dict: &RefType<Dict>, key: &Value) -> Result<Option<Value>> {
    let hash = key.hash()?;
    loop {
        let found = locate(dict, hash, key)?;
        let dict = s_read!(dict);
        if dict.version == found.version {
            return Ok(found.index.map(|index| dict.entries[index].value.clone()));
        }
    }
}

pub(crate) fn shared_insert(dict: &RefType<Dict>, key: Value, value: Value) -> Result<()> {
    let hash = key.hash()?;
    loop {
        let found = locate(dict, hash, &key)?;
        let mut dict = s_write!(dict);
        if dict.version != found.version {
            continue;
        }
        match found.index {
            Some(index) => dict.entries[index].value = value,
            None => dict.push(Entry { hash, key, value }),
        }
        return Ok(());
    }
}

pub(crate) fn shared_remove(dict: &RefType<Dict>, key: &Value) -> Result<Option<Value>> {
    let hash = key.hash()?;
    loop {
        let found = locate(dict, hash, key)?;
        let mut dict = s_write!(dict);
        if dict.version == found.version {
            return Ok(found.index.map(|index| dict.remove_at(index).value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{new_ref, Args, Class, Function};

    #[test]
    fn insertion_order() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let mut dict = Dict::new();
        dict.insert("b".into(), 1.into()).unwrap();
        dict.insert("a".into(), 2.into()).unwrap();
        dict.insert("b".into(), 3.into()).unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.keys(), vec![Value::from("b"), Value::from("a")]);
        assert_eq!(dict.get(&"b".into()).unwrap(), Some(Value::from(3)));
    }

    #[test]
    fn numeric_keys_collapse() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let mut dict = Dict::new();
        dict.insert(1.into(), "int".into()).unwrap();
        dict.insert(1.0.into(), "float".into()).unwrap();
        dict.insert(true.into(), "bool".into()).unwrap();

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&1.into()).unwrap(), Some(Value::from("bool")));
    }

    #[test]
    fn unhashable_keys() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let mut dict = Dict::new();
        let err = dict.insert(Value::from(vec![1]), 1.into()).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn many_keys_stay_indexed() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let mut dict = Dict::new();
        for i in 0..20_000 {
            dict.insert(Value::from(i), Value::from(i * 2)).unwrap();
        }
        assert_eq!(dict.len(), 20_000);
        assert_eq!(
            dict.get(&Value::from(19_999)).unwrap(),
            Some(Value::from(39_998))
        );

        for i in (0..20_000).step_by(2) {
            assert!(dict.remove(&Value::from(i)).unwrap().is_some());
        }
        assert_eq!(dict.len(), 10_000);
        assert_eq!(dict.get(&Value::from(4)).unwrap(), None);
        assert_eq!(dict.get(&Value::from(5)).unwrap(), Some(Value::from(10)));
        assert_eq!(dict.keys()[0], Value::from(1));

        dict.insert_str("name", Value::from("x"));
        dict.insert_str("name", Value::from("y"));
        assert_eq!(dict.get(&"name".into()).unwrap(), Some(Value::from("y")));
        assert_eq!(dict.len(), 10_001);
    }

    #[test]
    fn shared_access() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let dict = new_ref!(Dict, Dict::from_pairs(vec![("a", 1), ("b", 2)]).unwrap());

        shared_insert(&dict, "c".into(), 3.into()).unwrap();
        assert_eq!(shared_get(&dict, &"c".into()).unwrap(), Some(Value::from(3)));
        assert_eq!(shared_remove(&dict, &"a".into()).unwrap(), Some(Value::from(1)));
        assert_eq!(shared_remove(&dict, &"a".into()).unwrap(), None);
        assert_eq!(s_read!(dict).len(), 2);
    }

    #[test]
    fn comparisons_that_reshape_the_dict() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let table = Value::from(Dict::new());
        let inside = table.clone();
        let key_class = Value::from(
            Class::new("Key")
                .with(
                    "__hash__",
                    Function::new("__hash__", |_: &Args| Ok(Value::from(1))),
                )
                .with(
                    "__eq__",
                    Function::new("__eq__", move |_: &Args| {
                        let doomed = Value::from("doomed");
                        if inside.contains(&doomed)? {
                            inside.del_item(&doomed)?;
                        }
                        Ok(Value::from(true))
                    }),
                ),
        );
        let first = key_class.call_with([]).unwrap();
        let second = key_class.call_with([]).unwrap();

        table.set_item(&Value::from("doomed"), Value::from(0)).unwrap();
        table.set_item(&first, Value::from("old")).unwrap();
        table.set_item(&second, Value::from("new")).unwrap();

        assert_eq!(table.len().unwrap(), 1);
        assert_eq!(table.get_item(&first).unwrap(), Value::from("new"));

        table.set_item(&Value::from("doomed"), Value::from(0)).unwrap();
        table.del_item(&second).unwrap();
        assert_eq!(table.len().unwrap(), 0);
    }
}
