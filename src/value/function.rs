//! Callables
use std::fmt;

use rustc_hash::FxHashMap as HashMap;

use crate::{
    error::{Result, TypeSnafu},
    keywords::CALL,
    proxy::class::ProxyClass,
    s_read, shared_fn,
    value::class::Object,
    RcType, RefType, Shareable, Value,
};

/// The body of a native function.
pub type NativeFn = shared_fn!(Fn(&Args) -> Result<Value>);

/// How a function found on a class binds when it's looked up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MethodKind {
    /// Bound to the instance it's looked up through.
    #[default]
    Instance,
    /// Bound to the class.
    Class,
    /// Never bound.
    Static,
}

/// Arguments to a call
#[derive(Clone, Debug, Default)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword<S: AsRef<str>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.keywords.push((name.as_ref().to_owned(), value.into()));
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Fetch a required positional argument.
    pub fn require(&self, index: usize) -> Result<&Value> {
        match self.positional.get(index) {
            Some(value) => Ok(value),
            None => TypeSnafu {
                message: format!(
                    "missing required positional argument {index}, got {} argument(s)",
                    self.positional.len()
                ),
            }
            .fail(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// The same arguments with `receiver` prepended.
    pub fn bound(&self, receiver: Value) -> Args {
        let mut positional = Vec::with_capacity(self.positional.len() + 1);
        positional.push(receiver);
        positional.extend(self.positional.iter().cloned());
        Args {
            positional,
            keywords: self.keywords.clone(),
        }
    }

    /// The positional arguments as a tuple.
    pub fn to_tuple(&self) -> Value {
        Value::Tuple(self.positional.clone())
    }

    /// The keyword arguments as a dict.
    pub fn keywords_dict(&self) -> Value {
        let mut dict = crate::Dict::new();
        for (key, value) in &self.keywords {
            dict.insert_str(key, value.clone());
        }
        Value::from(dict)
    }
}

impl From<Vec<Value>> for Args {
    fn from(positional: Vec<Value>) -> Self {
        Args {
            positional,
            keywords: Vec::new(),
        }
    }
}

impl From<&[Value]> for Args {
    fn from(positional: &[Value]) -> Self {
        Args::from(positional.to_vec())
    }
}

/// A function implemented in Rust
///
/// Functions carry the metadata a proxy passes through: a name, a qualified
/// name, a module and a docstring, plus a dictionary of arbitrary attributes.
pub struct Function {
    name: String,
    qualname: String,
    module: String,
    doc: Option<String>,
    kind: MethodKind,
    body: NativeFn,
    attrs: HashMap<String, Value>,
}

impl Function {
    pub fn new<S, F>(name: S, body: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&Args) -> Result<Value> + Shareable + 'static,
    {
        let body: NativeFn = RcType::new(body);
        Function {
            name: name.as_ref().to_owned(),
            qualname: name.as_ref().to_owned(),
            module: "__main__".to_owned(),
            doc: None,
            kind: MethodKind::Instance,
            body,
            attrs: HashMap::default(),
        }
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

    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
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

    pub fn kind(&self) -> MethodKind {
        self.kind
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

    pub(crate) fn attrs_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.attrs
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("qualname", &self.qualname)
            .field("module", &self.module)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A function bound to a receiver
#[derive(Debug)]
pub struct Method {
    receiver: Value,
    function: RefType<Function>,
}

impl Method {
    pub fn new(receiver: Value, function: RefType<Function>) -> Self {
        Method { receiver, function }
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn function(&self) -> &RefType<Function> {
        &self.function
    }

    pub fn function_value(&self) -> Value {
        Value::Function(self.function.clone())
    }
}

/// Bind an attribute found on a class to the value it was looked up through.
///
/// `owner` is what a class method binds to.
pub(crate) fn bind(attr: Value, receiver: &Value, owner: &Value) -> Value {
    match &attr {
        Value::Function(function) => {
            let kind = s_read!(function).kind();
            match kind {
                MethodKind::Instance => {
                    Value::from(Method::new(receiver.clone(), function.clone()))
                }
                MethodKind::Class => Value::from(Method::new(owner.clone(), function.clone())),
                MethodKind::Static => attr,
            }
        }
        _ => attr,
    }
}

impl Value {
    /// Call the value.
    pub fn call(&self, args: &Args) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.call(args),
            Value::Function(function) => {
                let body = s_read!(function).body.clone();
                body(args)
            }
            Value::Method(method) => method
                .function_value()
                .call(&args.bound(method.receiver.clone())),
            Value::Class(class) => Object::instantiate(class, args),
            Value::Type(builtin) => builtin.construct(args),
            Value::ProxyClass(class) => call_proxy_class(class, args),
            Value::Object(_) => match self.dunder_args(CALL, args)? {
                Some(value) => Ok(value),
                None => self.not_callable(),
            },
            _ => self.not_callable(),
        }
    }

    /// Call the value with positional arguments only.
    pub fn call_with<I: IntoIterator<Item = Value>>(&self, args: I) -> Result<Value> {
        self.call(&Args::from(args.into_iter().collect::<Vec<_>>()))
    }

    pub fn is_callable(&self) -> Result<bool> {
        match self {
            Value::Proxy(proxy) => proxy.is_callable(),
            Value::Function(_)
            | Value::Method(_)
            | Value::Class(_)
            | Value::Type(_)
            | Value::ProxyClass(_) => Ok(true),
            Value::Object(_) => Ok(self.class_defines(CALL)),
            _ => Ok(false),
        }
    }

    fn not_callable<T>(&self) -> Result<T> {
        TypeSnafu {
            message: format!("'{}' object is not callable", self.type_name()),
        }
        .fail()
    }
}

/// Calling a proxy class wraps its first argument.
fn call_proxy_class(class: &ProxyClass, args: &Args) -> Result<Value> {
    let target = args.require(0)?;
    class.instantiate(target.clone()).map(Value::Proxy)
}
