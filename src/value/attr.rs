//! Attribute access and introspection
use snafu::prelude::*;

use crate::{
    error::{AttributeSnafu, IndexSnafu, Result, TypeSnafu},
    keywords::{CALL, CLASS, DICT, DOC, FUNC, MODULE, NAME, QUALNAME, SELF},
    s_read, s_write,
    value::{
        class::Class,
        dict::{shared_get, Dict},
        function::{bind, Args, Function, Method, MethodKind},
        Builtin,
    },
    RefType, Value,
};

const OBJECT_NAMES: &[&str] = &[
    "__class__", "__doc__", "__eq__", "__hash__", "__ne__", "__repr__", "__str__",
];
const NUMBER_NAMES: &[&str] = &[
    "__abs__", "__add__", "__bool__", "__divmod__", "__float__", "__floordiv__", "__ge__",
    "__gt__", "__int__", "__le__", "__lt__", "__mod__", "__mul__", "__neg__", "__pos__",
    "__pow__", "__radd__", "__rmul__", "__round__", "__rsub__", "__sub__", "__truediv__",
];
const INTEGER_NAMES: &[&str] = &[
    "__and__", "__index__", "__invert__", "__lshift__", "__or__", "__rshift__", "__xor__",
];
const SEQUENCE_NAMES: &[&str] = &[
    "__add__", "__contains__", "__getitem__", "__iter__", "__len__", "__mul__",
];
const LIST_NAMES: &[&str] = &[
    "__delitem__", "__iadd__", "__imul__", "__reversed__", "__setitem__", "append", "extend",
    "pop",
];
const DICT_NAMES: &[&str] = &[
    "__contains__", "__delitem__", "__getitem__", "__ior__", "__iter__", "__len__", "__or__",
    "__setitem__", "get", "items", "keys", "values",
];
const STR_NAMES: &[&str] = &["lower", "upper"];
const FUNCTION_NAMES: &[&str] = &["__call__", "__module__", "__name__", "__qualname__"];

fn no_attribute<T>(value: &Value, name: &str) -> Result<T> {
    AttributeSnafu {
        ty: value.type_name(),
        name,
    }
    .fail()
}

fn string_attr(value: Value, name: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => TypeSnafu {
            message: format!(
                "can only assign string to {name}, not '{}'",
                other.type_name()
            ),
        }
        .fail(),
    }
}

fn optional_string(value: Value) -> Result<Option<String>> {
    match value {
        Value::None => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => other.to_str().map(Some),
    }
}

fn optional_value(value: Option<&str>) -> Value {
    value.map_or(Value::None, Value::from)
}

fn dict_of<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut dict = Dict::new();
    for (key, value) in pairs {
        dict.insert_str(key, value.clone());
    }
    Value::from(dict)
}

/// A native method bound to a list.
fn list_method(list: &RefType<Vec<Value>>, name: &str) -> Option<Value> {
    let list = list.clone();
    let function = match name {
        "append" => Function::new(name, move |args: &Args| {
            let item = args.require(0)?.clone();
            s_write!(list).push(item);
            Ok(Value::None)
        }),
        "extend" => Function::new(name, move |args: &Args| {
            let items = args.require(0)?.collect_items()?;
            s_write!(list).extend(items);
            Ok(Value::None)
        }),
        "pop" => Function::new(name, move |args: &Args| {
            let index = match args.get(0) {
                Some(index) => index.index()?,
                None => -1,
            };
            let mut list = s_write!(list);
            let len = list.len() as i64;
            let position = if index < 0 { index + len } else { index };
            ensure!(
                (0..len).contains(&position),
                IndexSnafu {
                    message: "pop index out of range"
                }
            );
            Ok(list.remove(position as usize))
        }),
        _ => return None,
    };
    Some(Value::from(
        function
            .with_qualname(format!("list.{name}"))
            .with_module("builtins"),
    ))
}

/// A native method bound to a dict.
fn dict_method(dict: &RefType<Dict>, name: &str) -> Option<Value> {
    let dict = dict.clone();
    let function = match name {
        "get" => Function::new(name, move |args: &Args| {
            let key = args.require(0)?;
            let default = args.get(1).cloned().unwrap_or_default();
            Ok(shared_get(&dict, key)?.unwrap_or(default))
        }),
        "keys" => Function::new(name, move |_: &Args| Ok(Value::list(s_read!(dict).keys()))),
        "values" => Function::new(name, move |_: &Args| Ok(Value::list(s_read!(dict).values()))),
        "items" => Function::new(name, move |_: &Args| {
            let items = s_read!(dict)
                .items()
                .into_iter()
                .map(|(k, v)| Value::tuple(vec![k, v]))
                .collect();
            Ok(Value::list(items))
        }),
        _ => return None,
    };
    Some(Value::from(
        function
            .with_qualname(format!("dict.{name}"))
            .with_module("builtins"),
    ))
}

fn str_method(s: &str, name: &str) -> Option<Value> {
    let s = s.to_owned();
    let function = match name {
        "upper" => Function::new(name, move |_: &Args| Ok(Value::from(s.to_uppercase()))),
        "lower" => Function::new(name, move |_: &Args| Ok(Value::from(s.to_lowercase()))),
        _ => return None,
    };
    Some(Value::from(
        function
            .with_qualname(format!("str.{name}"))
            .with_module("builtins"),
    ))
}

impl Value {
    /// Look up an attribute, `self.name`
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.get_attr(name),
            Value::ProxyClass(class) => class.get_attr(name),
            Value::Object(object) => {
                let found = s_read!(object).get(name);
                if let Some(value) = found {
                    return Ok(value);
                }
                let class = s_read!(object).class();
                match name {
                    CLASS => return Ok(Value::Class(class)),
                    DICT => return self.vars(),
                    _ => {}
                }
                if let Some(attr) = Class::lookup(&class, name) {
                    return Ok(bind(attr, self, &Value::Class(class)));
                }
                let class = s_read!(class);
                match name {
                    MODULE => Ok(Value::from(class.module())),
                    DOC => Ok(optional_value(class.doc())),
                    _ => AttributeSnafu {
                        ty: class.name(),
                        name,
                    }
                    .fail(),
                }
            }
            Value::Class(class) => {
                {
                    let class = s_read!(class);
                    match name {
                        NAME => return Ok(Value::from(class.name())),
                        QUALNAME => return Ok(Value::from(class.qualname())),
                        MODULE => return Ok(Value::from(class.module())),
                        DOC => return Ok(optional_value(class.doc())),
                        CLASS => return Ok(Value::Type(Builtin::Type)),
                        _ => {}
                    }
                }
                match name {
                    DICT => self.vars(),
                    CALL => Ok(self.clone()),
                    _ => match Class::lookup(class, name) {
                        // Instance methods looked up on the class come back unbound.
                        Some(Value::Function(function))
                            if s_read!(function).kind() == MethodKind::Class =>
                        {
                            Ok(Value::from(Method::new(self.clone(), function)))
                        }
                        Some(attr) => Ok(attr),
                        None => AttributeSnafu { ty: "type", name }.fail(),
                    },
                }
            }
            Value::Function(function) => {
                let function = s_read!(function);
                match name {
                    NAME => Ok(Value::from(function.name())),
                    QUALNAME => Ok(Value::from(function.qualname())),
                    MODULE => Ok(Value::from(function.module())),
                    DOC => Ok(optional_value(function.doc())),
                    CLASS => Ok(Value::Type(Builtin::Function)),
                    DICT => Ok(dict_of(function.attrs())),
                    CALL => Ok(self.clone()),
                    _ => match function.attrs().get(name) {
                        Some(value) => Ok(value.clone()),
                        None => AttributeSnafu {
                            ty: "function",
                            name,
                        }
                        .fail(),
                    },
                }
            }
            Value::Method(method) => match name {
                SELF => Ok(method.receiver().clone()),
                FUNC => Ok(method.function_value()),
                CLASS => Ok(Value::Type(Builtin::Method)),
                CALL => Ok(self.clone()),
                _ => method.function_value().get_attr(name),
            },
            Value::Type(builtin) => match name {
                NAME | QUALNAME => Ok(Value::from(builtin.name())),
                MODULE => Ok(Value::from("builtins")),
                CLASS => Ok(Value::Type(Builtin::Type)),
                CALL => Ok(self.clone()),
                _ => no_attribute(self, name),
            },
            Value::List(list) => match name {
                CLASS => Ok(self.type_of()),
                _ => list_method(list, name).map_or_else(|| no_attribute(self, name), Ok),
            },
            Value::Dict(dict) => match name {
                CLASS => Ok(self.type_of()),
                _ => dict_method(dict, name).map_or_else(|| no_attribute(self, name), Ok),
            },
            Value::String(s) => match name {
                CLASS => Ok(self.type_of()),
                _ => str_method(s, name).map_or_else(|| no_attribute(self, name), Ok),
            },
            _ => match name {
                CLASS => Ok(self.type_of()),
                _ => no_attribute(self, name),
            },
        }
    }

    /// Assign an attribute, `self.name = value`
    pub fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Proxy(proxy) => proxy.set_attr(name, value),
            Value::ProxyClass(class) => {
                class.set_class_attr(name, value);
                Ok(())
            }
            Value::Object(object) => match name {
                CLASS => match value {
                    Value::Class(class) => {
                        s_write!(object).set_class(class);
                        Ok(())
                    }
                    other => TypeSnafu {
                        message: format!(
                            "{CLASS} must be set to a class, not '{}' object",
                            other.type_name()
                        ),
                    }
                    .fail(),
                },
                DICT => TypeSnafu {
                    message: format!("{DICT} can't be replaced"),
                }
                .fail(),
                _ => {
                    s_write!(object).set(name, value);
                    Ok(())
                }
            },
            // Conversions may run user code, so they happen before the lock is taken.
            Value::Class(class) => {
                match name {
                    NAME => {
                        let new = string_attr(value, name)?;
                        s_write!(class).set_name(new);
                    }
                    QUALNAME => {
                        let new = string_attr(value, name)?;
                        s_write!(class).set_qualname(new);
                    }
                    MODULE => {
                        let new = value.to_str()?;
                        s_write!(class).set_module(new);
                    }
                    DOC => {
                        let new = optional_string(value)?;
                        s_write!(class).set_doc(new);
                    }
                    _ => s_write!(class).define(name, value),
                }
                Ok(())
            }
            Value::Function(function) => {
                match name {
                    NAME => {
                        let new = string_attr(value, name)?;
                        s_write!(function).set_name(new);
                    }
                    QUALNAME => {
                        let new = string_attr(value, name)?;
                        s_write!(function).set_qualname(new);
                    }
                    MODULE => {
                        let new = value.to_str()?;
                        s_write!(function).set_module(new);
                    }
                    DOC => {
                        let new = optional_string(value)?;
                        s_write!(function).set_doc(new);
                    }
                    CLASS | DICT | CALL => return no_attribute(self, name),
                    _ => {
                        s_write!(function).attrs_mut().insert(name.to_owned(), value);
                    }
                }
                Ok(())
            }
            _ => no_attribute(self, name),
        }
    }

    /// Remove an attribute, `del self.name`
    pub fn del_attr(&self, name: &str) -> Result<()> {
        match self {
            Value::Proxy(proxy) => proxy.del_attr(name),
            Value::ProxyClass(class) => class.del_class_attr(name),
            Value::Object(object) => {
                let removed = s_write!(object).remove(name);
                removed.map(|_| ()).context(AttributeSnafu {
                    ty: self.type_name(),
                    name,
                })
            }
            Value::Class(class) => {
                let removed = s_write!(class).remove(name);
                removed
                    .map(|_| ())
                    .context(AttributeSnafu { ty: "type", name })
            }
            Value::Function(function) => match name {
                DOC => {
                    s_write!(function).set_doc(None);
                    Ok(())
                }
                _ => {
                    let removed = s_write!(function).attrs_mut().remove(name);
                    removed.map(|_| ()).context(AttributeSnafu {
                        ty: "function",
                        name,
                    })
                }
            },
            _ => no_attribute(self, name),
        }
    }

    /// `hasattr(self, name)`
    ///
    /// Only an attribute error means "no"; anything else the lookup raises is
    /// passed along.
    pub fn has_attr(&self, name: &str) -> Result<bool> {
        match self.get_attr(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_attribute_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `getattr(self, name, default)`
    pub fn get_attr_or(&self, name: &str, default: Value) -> Result<Value> {
        match self.get_attr(name) {
            Ok(value) => Ok(value),
            Err(e) if e.is_attribute_error() => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// The sorted attribute names of the value, `dir(self)`
    pub fn dir(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = match self {
            Value::Proxy(proxy) => return proxy.dir(),
            Value::ProxyClass(class) => class.attr_names(),
            Value::Object(object) => {
                let (class, mut names) = {
                    let object = s_read!(object);
                    (object.class(), object.attrs().keys().cloned().collect::<Vec<_>>())
                };
                names.extend(Class::attr_names(&class));
                names.extend(["__dict__", "__module__"].map(String::from));
                names
            }
            Value::Class(class) => {
                let mut names = Class::attr_names(class);
                names.extend(["__dict__", "__module__", "__name__", "__qualname__"].map(String::from));
                names
            }
            Value::Function(function) => {
                let mut names = s_read!(function).attrs().keys().cloned().collect::<Vec<_>>();
                names.extend(FUNCTION_NAMES.iter().map(|s| s.to_string()));
                names.push(DICT.to_owned());
                names
            }
            Value::Method(_) => {
                let mut names = FUNCTION_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>();
                names.extend([FUNC, SELF].map(String::from));
                names
            }
            Value::Boolean(_) | Value::Integer(_) => NUMBER_NAMES
                .iter()
                .chain(INTEGER_NAMES)
                .map(|s| s.to_string())
                .collect(),
            Value::Float(_) => NUMBER_NAMES.iter().map(|s| s.to_string()).collect(),
            Value::String(_) => SEQUENCE_NAMES
                .iter()
                .chain(STR_NAMES)
                .map(|s| s.to_string())
                .collect(),
            Value::Bytes(_) | Value::Tuple(_) => {
                SEQUENCE_NAMES.iter().map(|s| s.to_string()).collect()
            }
            Value::List(_) => SEQUENCE_NAMES
                .iter()
                .chain(LIST_NAMES)
                .map(|s| s.to_string())
                .collect(),
            Value::Dict(_) => DICT_NAMES.iter().map(|s| s.to_string()).collect(),
            Value::Type(_) => FUNCTION_NAMES.iter().map(|s| s.to_string()).collect(),
            _ => Vec::new(),
        };
        names.extend(OBJECT_NAMES.iter().map(|s| s.to_string()));
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// The value's attribute dictionary, `vars(self)`
    ///
    /// This is a snapshot; writing to it doesn't change the value.
    pub fn vars(&self) -> Result<Value> {
        match self {
            Value::Proxy(proxy) => proxy.vars(),
            Value::ProxyClass(class) => Ok(class.vars()),
            Value::Object(object) => Ok(dict_of(s_read!(object).attrs())),
            Value::Class(class) => Ok(dict_of(s_read!(class).attrs())),
            Value::Function(function) => Ok(dict_of(s_read!(function).attrs())),
            _ => TypeSnafu {
                message: "vars() argument must have __dict__ attribute",
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_attributes() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = Value::from(Class::new("Thing").with("shared", 1));
        let thing = class.call_with([]).unwrap();

        assert_eq!(thing.get_attr("shared").unwrap(), Value::from(1));
        thing.set_attr("shared", Value::from(2)).unwrap();
        assert_eq!(thing.get_attr("shared").unwrap(), Value::from(2));
        thing.del_attr("shared").unwrap();
        assert_eq!(thing.get_attr("shared").unwrap(), Value::from(1));

        let err = thing.del_attr("shared").unwrap_err();
        assert!(err.is_attribute_error());
        assert_eq!(thing.get_attr(MODULE).unwrap(), Value::from("__main__"));
    }

    #[test]
    fn function_metadata() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let function = Value::from(
            Function::new("f", |_: &Args| Ok(Value::None))
                .with_qualname("Outer.f")
                .with_doc("Does nothing."),
        );

        assert_eq!(function.get_attr(NAME).unwrap(), Value::from("f"));
        assert_eq!(function.get_attr(QUALNAME).unwrap(), Value::from("Outer.f"));
        assert_eq!(function.get_attr(DOC).unwrap(), Value::from("Does nothing."));

        function.set_attr(NAME, Value::from("g")).unwrap();
        assert_eq!(function.get_attr(NAME).unwrap(), Value::from("g"));
        assert!(function.set_attr(NAME, Value::from(1)).unwrap_err().is_type_error());

        function.set_attr("tag", Value::from(true)).unwrap();
        assert_eq!(function.vars().unwrap().len().unwrap(), 1);
    }

    #[test]
    fn class_attribute_binding() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = Value::from(
            Class::new("Spam")
                .with("plain", Function::new("plain", |args: &Args| Ok(args.to_tuple())))
                .with(
                    "cls",
                    Function::new("cls", |args: &Args| Ok(args.require(0)?.clone()))
                        .with_kind(MethodKind::Class),
                ),
        );

        assert!(matches!(class.get_attr("plain").unwrap(), Value::Function(_)));
        let bound = class.get_attr("cls").unwrap().call(&Args::new()).unwrap();
        assert!(bound.is(&class));
    }

    #[test]
    fn builtin_methods() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let list = Value::from(vec![1, 2]);
        list.get_attr("append")
            .unwrap()
            .call_with([Value::from(3)])
            .unwrap();
        assert_eq!(list, Value::from(vec![1, 2, 3]));
        assert_eq!(
            list.get_attr("pop").unwrap().call(&Args::new()).unwrap(),
            Value::from(3)
        );

        let upper = Value::from("abc").get_attr("upper").unwrap();
        assert_eq!(upper.call(&Args::new()).unwrap(), Value::from("ABC"));
    }

    #[test]
    fn missing_attributes() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let err = Value::from(1).get_attr("nope").unwrap_err();
        assert_eq!(err.message(), "'int' object has no attribute 'nope'");
        assert!(!Value::from(1).has_attr("nope").unwrap());
        assert_eq!(
            Value::from(1).get_attr_or("nope", Value::None).unwrap(),
            Value::None
        );
        assert!(Value::from(1).vars().unwrap_err().is_type_error());
    }

    #[test]
    fn dir_is_sorted() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let names = Value::from(vec![1]).dir().unwrap();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"append".to_owned()));
        assert!(names.contains(&"__len__".to_owned()));
    }
}
