//! Attribute routing
//!
//! Deciding, for each attribute name, whether it belongs to the proxy or to
//! what the proxy wraps. A get looks in this order:
//!
//! 1. `__wrapped__`, `__factory__`, `__class__` and `__dict__`, which the proxy
//!    always answers itself
//! 2. `_self_` names, from the proxy's own storage
//! 3. properties of the proxy class
//! 4. instance values set over a class attribute
//! 5. class attributes, nearest class first
//! 6. `getattr` hooks, leaf class first
//! 7. the wrapped value
//!
//! Only the last two resolve the proxy.
use crate::{
    error::{AttributeSnafu, Result, TypeSnafu},
    keywords::{CLASS, DICT, FACTORY, OWN_PREFIX, WRAPPED},
    proxy::{
        class::{DelAttrHook, GetAttrHook, SetAttrHook},
        Proxy,
    },
    s_read, s_write, trace,
    value::function::bind,
    Value,
};

fn missing<T>(proxy: &Proxy, name: &str) -> Result<T> {
    AttributeSnafu {
        ty: proxy.class_name(),
        name,
    }
    .fail()
}

/// Instance values outlive the class attribute they were set over.
fn shadowed(proxy: &Proxy, name: &str) -> bool {
    s_read!(proxy.0).shadows.contains_key(name)
}

pub(super) fn get(proxy: &Proxy, name: &str) -> Result<Value> {
    match name {
        WRAPPED => return proxy.wrapped(),
        FACTORY => return Ok(proxy.factory().unwrap_or_default()),
        CLASS | DICT => return proxy.wrapped()?.get_attr(name),
        _ => {}
    }

    if let Some(own) = name.strip_prefix(OWN_PREFIX) {
        let found = s_read!(proxy.0).own.get(own).cloned();
        return match found {
            Some(value) => Ok(value),
            None => missing(proxy, name),
        };
    }

    let class = proxy.class();
    if let Some(property) = class.property(name) {
        return property.get(proxy);
    }

    let shadow = s_read!(proxy.0).shadows.get(name).cloned();
    if let Some(value) = shadow {
        return Ok(value);
    }

    if let Some(attr) = class.class_attr(name) {
        return Ok(bind(attr, &Value::from(proxy), &Value::from(class)));
    }

    get_through(proxy, &class.getattr_hooks(), name)
}

fn get_through(proxy: &Proxy, hooks: &[GetAttrHook], name: &str) -> Result<Value> {
    match hooks.split_first() {
        Some((hook, rest)) => hook(proxy, name, &|name: &str| get_through(proxy, rest, name)),
        None => forward_get(proxy, name),
    }
}

/// Look `name` up on the wrapped value.
pub(crate) fn forward_get(proxy: &Proxy, name: &str) -> Result<Value> {
    trace!("proxy", "forwarding get of `{name}`");
    proxy.wrapped()?.get_attr(name)
}

pub(super) fn set(proxy: &Proxy, name: &str, value: Value) -> Result<()> {
    set_through(proxy, &proxy.class().setattr_hooks(), name, value)
}

fn set_through(proxy: &Proxy, hooks: &[SetAttrHook], name: &str, value: Value) -> Result<()> {
    match hooks.split_first() {
        Some((hook, rest)) => hook(proxy, name, value, &|name: &str, value: Value| {
            set_through(proxy, rest, name, value)
        }),
        None => route_set(proxy, name, value),
    }
}

/// Assignment without any hooks.
pub(crate) fn route_set(proxy: &Proxy, name: &str, value: Value) -> Result<()> {
    match name {
        WRAPPED => {
            proxy.set_wrapped(value);
            return Ok(());
        }
        FACTORY => {
            proxy.set_factory(value);
            return Ok(());
        }
        _ => {}
    }

    if let Some(own) = name.strip_prefix(OWN_PREFIX) {
        s_write!(proxy.0).own.insert(own.to_owned(), value);
        return Ok(());
    }

    let class = proxy.class();
    if let Some(property) = class.property(name) {
        return property.set(proxy, name, value);
    }

    if class.defines(name) || shadowed(proxy, name) {
        s_write!(proxy.0).shadows.insert(name.to_owned(), value);
        return Ok(());
    }

    trace!("proxy", "forwarding set of `{name}`");
    proxy.wrapped()?.set_attr(name, value)
}

pub(super) fn delete(proxy: &Proxy, name: &str) -> Result<()> {
    delete_through(proxy, &proxy.class().delattr_hooks(), name)
}

fn delete_through(proxy: &Proxy, hooks: &[DelAttrHook], name: &str) -> Result<()> {
    match hooks.split_first() {
        Some((hook, rest)) => hook(proxy, name, &|name: &str| delete_through(proxy, rest, name)),
        None => route_delete(proxy, name),
    }
}

/// Deletion without any hooks.
pub(crate) fn route_delete(proxy: &Proxy, name: &str) -> Result<()> {
    if matches!(name, WRAPPED | FACTORY) {
        return TypeSnafu {
            message: format!("can't delete {name} attribute"),
        }
        .fail();
    }

    if let Some(own) = name.strip_prefix(OWN_PREFIX) {
        let removed = s_write!(proxy.0).own.remove(own);
        return match removed {
            Some(_) => Ok(()),
            None => missing(proxy, name),
        };
    }

    let class = proxy.class();
    if let Some(property) = class.property(name) {
        return property.delete(proxy, name);
    }

    if class.defines(name) || shadowed(proxy, name) {
        let removed = s_write!(proxy.0).shadows.remove(name);
        return match removed {
            Some(_) => Ok(()),
            None => missing(proxy, name),
        };
    }

    trace!("proxy", "forwarding delete of `{name}`");
    proxy.wrapped()?.del_attr(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Args, Class, Function};

    fn target() -> Value {
        Value::from(Class::new("Target").with_doc("documentation"))
            .call_with([])
            .unwrap()
    }

    #[test]
    fn own_attributes_stay_on_the_proxy() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let wrapped = target();
        let proxy = Proxy::new(wrapped.clone());

        proxy.set_attr("_self_variable", Value::from(true)).unwrap();
        assert_eq!(proxy.get_attr("_self_variable").unwrap(), Value::from(true));
        assert!(!wrapped.has_attr("_self_variable").unwrap());
        assert_eq!(
            proxy.own_attributes(),
            vec![("variable".to_owned(), Value::from(true))]
        );

        proxy.del_attr("_self_variable").unwrap();
        assert!(!proxy.has_attr("_self_variable").unwrap());
        assert!(proxy.del_attr("_self_variable").unwrap_err().is_attribute_error());
    }

    #[test]
    fn own_attributes_never_resolve() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::lazy_fn(|| Ok(Value::from(1)));
        proxy.set_attr("_self_note", Value::from("x")).unwrap();
        proxy.get_attr("_self_note").unwrap();
        assert!(!proxy.has_attr("_self_other").unwrap());
        assert!(!proxy.is_resolved());
    }

    #[test]
    fn plain_attributes_are_forwarded() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let wrapped = target();
        let proxy = Proxy::new(wrapped.clone());

        proxy.set_attr("variable", Value::from(1)).unwrap();
        assert_eq!(wrapped.get_attr("variable").unwrap(), Value::from(1));
        assert_eq!(proxy.get_attr("variable").unwrap(), Value::from(1));

        proxy.del_attr("variable").unwrap();
        assert!(!wrapped.has_attr("variable").unwrap());
        let err = proxy.get_attr("variable").unwrap_err();
        assert_eq!(err.message(), "'Target' object has no attribute 'variable'");
    }

    #[test]
    fn special_names() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let wrapped = target();
        let proxy = Proxy::new(wrapped.clone());

        assert!(proxy.get_attr(WRAPPED).unwrap().is(&wrapped));
        assert!(proxy.get_attr(FACTORY).unwrap().is_none());
        assert!(proxy
            .get_attr(CLASS)
            .unwrap()
            .is(&wrapped.get_attr(CLASS).unwrap()));
        assert_eq!(proxy.get_attr("__doc__").unwrap(), Value::from("documentation"));

        proxy.set_attr(WRAPPED, Value::from(5)).unwrap();
        assert_eq!(proxy.wrapped().unwrap(), Value::from(5));

        let err = proxy.del_attr(WRAPPED).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(proxy.wrapped().unwrap(), Value::from(5));
    }

    #[test]
    fn factory_attribute() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let factory = Value::from(Function::new("make", |_: &Args| Ok(Value::from(1))));
        let proxy = Proxy::lazy(factory.clone());
        assert!(proxy.get_attr(FACTORY).unwrap().is(&factory));
        assert!(!proxy.is_resolved());
    }

    #[test]
    fn base_hooks_are_class_attributes() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let proxy = Proxy::new(target());
        for name in ["__getattr__", "__setattr__", "__delattr__"] {
            assert!(proxy.has_attr(name).unwrap());
        }

        let setattr = proxy.get_attr("__setattr__").unwrap();
        setattr
            .call_with([Value::from("colour"), Value::from("red")])
            .unwrap();
        let getattr = proxy.get_attr("__getattr__").unwrap();
        assert_eq!(
            getattr.call_with([Value::from("colour")]).unwrap(),
            Value::from("red")
        );
    }
}
