//! User defined classes and their instances
//!
//! A class is a named bag of attributes with an optional base class. Special
//! methods are ordinary function attributes with dunder names; the object model
//! finds them by walking the class chain.
use rustc_hash::FxHashMap as HashMap;

use crate::{
    error::{Result, SlothError, TypeSnafu},
    keywords::{ENTER, EXIT, INIT},
    new_ref, s_read,
    value::function::{bind, Args},
    RefType, Value,
};

#[derive(Debug)]
pub struct Class {
    name: String,
    qualname: String,
    module: String,
    doc: Option<String>,
    base: Option<RefType<Class>>,
    attrs: HashMap<String, Value>,
}

impl Class {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Class {
            name: name.as_ref().to_owned(),
            qualname: name.as_ref().to_owned(),
            module: "__main__".to_owned(),
            doc: None,
            base: None,
            attrs: HashMap::default(),
        }
    }

    pub fn with_base(mut self, base: RefType<Class>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_qualname<S: AsRef<str>>(mut self, qualname: S) -> Self {
        self.qualname = qualname.as_ref().to_owned();
        self
    }

    pub fn with_module<S: AsRef<str>>(mut self, module: S) -> Self {
        self.module = module.as_ref().to_owned();
        self
    }

    pub fn with_doc<S: AsRef<str>>(mut self, doc: S) -> Self {
        self.doc = Some(doc.as_ref().to_owned());
        self
    }

    /// Add an attribute, builder style.
    pub fn with<S: AsRef<str>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.define(name, value);
        self
    }

    pub fn define<S: AsRef<str>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.attrs.insert(name.as_ref().to_owned(), value.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn base(&self) -> Option<RefType<Class>> {
        self.base.clone()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_qualname(&mut self, qualname: String) {
        self.qualname = qualname;
    }

    pub(crate) fn set_module(&mut self, module: String) {
        self.module = module;
    }

    pub(crate) fn set_doc(&mut self, doc: Option<String>) {
        self.doc = doc;
    }

    pub(crate) fn attrs(&self) -> &HashMap<String, Value> {
        &self.attrs
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    /// Find an attribute on the class or one of its bases.
    pub(crate) fn lookup(class: &RefType<Class>, name: &str) -> Option<Value> {
        let mut current = Some(class.clone());
        while let Some(class) = current {
            let class = s_read!(class);
            if let Some(value) = class.attrs.get(name) {
                return Some(value.clone());
            }
            current = class.base.clone();
        }
        None
    }

    /// Every attribute name visible through the class, bases included.
    pub(crate) fn attr_names(class: &RefType<Class>) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(class.clone());
        while let Some(class) = current {
            let class = s_read!(class);
            names.extend(class.attrs.keys().cloned());
            current = class.base.clone();
        }
        names
    }
}

/// An instance of a [`Class`]
#[derive(Debug)]
pub struct Object {
    class: RefType<Class>,
    attrs: HashMap<String, Value>,
}

impl Object {
    pub fn new(class: RefType<Class>) -> Self {
        Object {
            class,
            attrs: HashMap::default(),
        }
    }

    pub fn class(&self) -> RefType<Class> {
        self.class.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).cloned()
    }

    pub fn set<S: AsRef<str>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.attrs.insert(name.as_ref().to_owned(), value.into());
    }

    pub(crate) fn set_class(&mut self, class: RefType<Class>) {
        self.class = class;
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    pub(crate) fn attrs(&self) -> &HashMap<String, Value> {
        &self.attrs
    }

    /// Create an instance and run `__init__` on it.
    pub(crate) fn instantiate(class: &RefType<Class>, args: &Args) -> Result<Value> {
        let object = Value::Object(new_ref!(Object, Object::new(class.clone())));
        if let Some(init) = Class::lookup(class, INIT) {
            bind(init, &object, &Value::Class(class.clone())).call(args)?;
        }
        Ok(object)
    }
}

impl Value {
    /// Run a special method from the value's class.
    ///
    /// Returns `None` when the class doesn't define it. Only user objects have
    /// special methods; built in values are handled by the operators directly.
    pub(crate) fn dunder(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        self.dunder_args(name, &Args::from(args))
    }

    pub(crate) fn dunder_args(&self, name: &str, args: &Args) -> Result<Option<Value>> {
        let Value::Object(object) = self else {
            return Ok(None);
        };
        let class = s_read!(object).class();
        match Class::lookup(&class, name) {
            Some(method) => bind(method, self, &Value::Class(class))
                .call(args)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Whether the value's class defines `name`.
    pub(crate) fn class_defines(&self, name: &str) -> bool {
        match self {
            Value::Object(object) => {
                let class = s_read!(object).class();
                Class::lookup(&class, name).is_some()
            }
            _ => false,
        }
    }

    /// Enter a context manager, returning what `with ... as` would bind.
    pub fn enter(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.enter(),
            _ => match self.dunder(ENTER, &[])? {
                Some(value) => Ok(value),
                None => TypeSnafu {
                    message: format!(
                        "'{}' object does not support the context manager protocol",
                        self.type_name()
                    ),
                }
                .fail(),
            },
        }
    }

    /// Exit a context manager
    ///
    /// `error` is the failure that ended the block, if any. The manager sees
    /// it as `(kind, message, None)`, or three `None`s on a clean exit. Returns
    /// true if the manager suppressed the error.
    pub fn exit(&self, error: Option<&SlothError>) -> Result<bool> {
        match self {
            Value::Proxy(proxy) => proxy.exit(error),
            _ => {
                let args = match error {
                    Some(error) => vec![
                        Value::from(error.kind()),
                        Value::from(error.message()),
                        Value::None,
                    ],
                    None => vec![Value::None, Value::None, Value::None],
                };
                match self.dunder(EXIT, &args)? {
                    Some(value) => value.truthy(),
                    None => TypeSnafu {
                        message: format!(
                            "'{}' object does not support the context manager protocol (missed {EXIT} method)",
                            self.type_name()
                        ),
                    }
                    .fail(),
                }
            }
        }
    }

    /// Run `body` inside the context manager.
    ///
    /// Returns `Ok(None)` if the body failed and the manager suppressed it.
    pub fn with_context<T, F>(&self, body: F) -> Result<Option<T>>
    where
        F: FnOnce(Value) -> Result<T>,
    {
        let entered = self.enter()?;
        match body(entered) {
            Ok(value) => {
                self.exit(None)?;
                Ok(Some(value))
            }
            Err(error) => {
                if self.exit(Some(&error))? {
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }
}
