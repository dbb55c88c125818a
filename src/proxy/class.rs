//! Proxy classes
//!
//! A [`ProxyClass`] specializes proxies the way a subclass would: it can add
//! class attributes and computed properties, intercept attribute access, and
//! set up a proxy's own state before the target is installed. Every class
//! descends from [`ProxyClass::base`], the plain `Proxy` type, and inherits the
//! whole forwarding table from it.
use std::fmt;

use rustc_hash::FxHashMap as HashMap;

use crate::{
    debug,
    error::{AttributeSnafu, Result, SlothError, TypeSnafu},
    keywords::{CLASS, DICT, DOC, MODULE, NAME, QUALNAME},
    new_ref,
    proxy::{router, Proxy, Target},
    ref_addr, s_read, s_write, shared_fn,
    value::{
        dict::Dict,
        function::{Args, Function, Method, MethodKind},
        Builtin,
    },
    RcType, RefType, Shareable, Value,
};

/// Runs the rest of the `getattr` chain.
pub type GetNext<'a> = dyn Fn(&str) -> Result<Value> + 'a;
/// Runs the rest of the `setattr` chain.
pub type SetNext<'a> = dyn Fn(&str, Value) -> Result<()> + 'a;
/// Runs the rest of the `delattr` chain.
pub type DelNext<'a> = dyn Fn(&str) -> Result<()> + 'a;

pub type InitHook = shared_fn!(Fn(&Proxy) -> Result<()>);
pub type GetAttrHook = shared_fn!(Fn(&Proxy, &str, &GetNext<'_>) -> Result<Value>);
pub type SetAttrHook = shared_fn!(Fn(&Proxy, &str, Value, &SetNext<'_>) -> Result<()>);
pub type DelAttrHook = shared_fn!(Fn(&Proxy, &str, &DelNext<'_>) -> Result<()>);

type Getter = shared_fn!(Fn(&Proxy) -> Result<Value>);
type Setter = shared_fn!(Fn(&Proxy, Value) -> Result<()>);
type Deleter = shared_fn!(Fn(&Proxy) -> Result<()>);

/// A computed attribute on a proxy class
///
/// Properties usually keep their state in the proxy's `_self_` attributes.
#[derive(Clone)]
pub struct Property {
    getter: Getter,
    setter: Option<Setter>,
    deleter: Option<Deleter>,
}

impl Property {
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn(&Proxy) -> Result<Value> + Shareable + 'static,
    {
        let getter: Getter = RcType::new(getter);
        Property {
            getter,
            setter: None,
            deleter: None,
        }
    }

    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&Proxy, Value) -> Result<()> + Shareable + 'static,
    {
        let setter: Setter = RcType::new(setter);
        self.setter = Some(setter);
        self
    }

    pub fn with_deleter<F>(mut self, deleter: F) -> Self
    where
        F: Fn(&Proxy) -> Result<()> + Shareable + 'static,
    {
        let deleter: Deleter = RcType::new(deleter);
        self.deleter = Some(deleter);
        self
    }

    pub(crate) fn get(&self, proxy: &Proxy) -> Result<Value> {
        (self.getter)(proxy)
    }

    pub(crate) fn set(&self, proxy: &Proxy, name: &str, value: Value) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(proxy, value),
            None => Err(read_only(proxy, name, "set")),
        }
    }

    pub(crate) fn delete(&self, proxy: &Proxy, name: &str) -> Result<()> {
        match &self.deleter {
            Some(deleter) => deleter(proxy),
            None => Err(read_only(proxy, name, "delete")),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Property")
            .field("setter", &self.setter.is_some())
            .field("deleter", &self.deleter.is_some())
            .finish_non_exhaustive()
    }
}

fn read_only(proxy: &Proxy, name: &str, action: &str) -> SlothError {
    SlothError::raised(
        "AttributeError",
        format!(
            "can't {action} attribute '{name}' of '{}' object",
            proxy.class_name()
        ),
    )
}

struct ClassState {
    name: String,
    module: String,
    doc: Option<String>,
    parent: Option<ProxyClass>,
    attrs: HashMap<String, Value>,
    properties: HashMap<String, Property>,
    init: Option<InitHook>,
    getattr: Option<GetAttrHook>,
    setattr: Option<SetAttrHook>,
    delattr: Option<DelAttrHook>,
}

impl ClassState {
    fn new(name: String, parent: Option<ProxyClass>) -> Self {
        ClassState {
            name,
            module: "__main__".to_owned(),
            doc: None,
            parent,
            attrs: HashMap::default(),
            properties: HashMap::default(),
            init: None,
            getattr: None,
            setattr: None,
            delattr: None,
        }
    }
}

/// A runtime proxy type
///
/// Cloning aliases the class. Class attributes may be changed after instances
/// exist; instances see the change on their next lookup.
#[derive(Clone)]
pub struct ProxyClass(RefType<ClassState>);

cfg_if::cfg_if! {
    if #[cfg(feature = "single")] {
        thread_local! {
            static BASE: ProxyClass = ProxyClass::root();
        }

        fn base_class() -> ProxyClass {
            BASE.with(|base| base.clone())
        }
    } else {
        lazy_static::lazy_static! {
            static ref BASE: ProxyClass = ProxyClass::root();
        }

        fn base_class() -> ProxyClass {
            BASE.clone()
        }
    }
}

fn receiver(args: &Args) -> Result<Proxy> {
    match args.require(0)? {
        Value::Proxy(proxy) => Ok(proxy.clone()),
        other => TypeSnafu {
            message: format!(
                "descriptor requires a 'Proxy' object but received a '{}'",
                other.type_name()
            ),
        }
        .fail(),
    }
}

fn attribute_name(args: &Args) -> Result<String> {
    match args.require(1)? {
        Value::String(name) => Ok(name.clone()),
        other => TypeSnafu {
            message: format!(
                "attribute name must be string, not '{}'",
                other.type_name()
            ),
        }
        .fail(),
    }
}

impl ProxyClass {
    /// The `Proxy` type every proxy class descends from.
    pub fn base() -> ProxyClass {
        base_class()
    }

    /// Start a new class that extends [`ProxyClass::base`].
    pub fn builder<S: AsRef<str>>(name: S) -> ProxyClassBuilder {
        ProxyClassBuilder {
            state: ClassState::new(name.as_ref().to_owned(), Some(ProxyClass::base())),
        }
    }

    /// The root class. Its attribute methods run the routing without any
    /// hooks, which is what a hook reaches for when it defers to the base.
    fn root() -> ProxyClass {
        let mut state = ClassState::new("Proxy".to_owned(), None);
        state.module = "sloth".to_owned();
        state.doc = Some("A lazy, transparent proxy.".to_owned());

        let getattr = Function::new("__getattr__", |args: &Args| {
            router::forward_get(&receiver(args)?, &attribute_name(args)?)
        });
        let setattr = Function::new("__setattr__", |args: &Args| {
            let value = args.require(2)?.clone();
            router::route_set(&receiver(args)?, &attribute_name(args)?, value)?;
            Ok(Value::None)
        });
        let delattr = Function::new("__delattr__", |args: &Args| {
            router::route_delete(&receiver(args)?, &attribute_name(args)?)?;
            Ok(Value::None)
        });
        for function in [getattr, setattr, delattr] {
            let name = function.name().to_owned();
            let function = function
                .with_qualname(format!("Proxy.{name}"))
                .with_module("sloth");
            state.attrs.insert(name, Value::from(function));
        }

        ProxyClass(new_ref!(ClassState, state))
    }

    pub fn name(&self) -> String {
        s_read!(self.0).name.clone()
    }

    pub fn module(&self) -> String {
        s_read!(self.0).module.clone()
    }

    pub fn doc(&self) -> Option<String> {
        s_read!(self.0).doc.clone()
    }

    pub fn parent(&self) -> Option<ProxyClass> {
        s_read!(self.0).parent.clone()
    }

    /// This class followed by its ancestors, ending with the base.
    pub fn lineage(&self) -> Vec<ProxyClass> {
        let mut lineage = vec![self.clone()];
        let mut current = self.parent();
        while let Some(class) = current {
            current = class.parent();
            lineage.push(class);
        }
        lineage
    }

    pub fn id(&self) -> usize {
        ref_addr(&self.0)
    }

    pub fn ptr_eq(&self, other: &ProxyClass) -> bool {
        self.id() == other.id()
    }

    /// Whether `ancestor` is this class or one of its ancestors.
    pub fn is_subclass_of(&self, ancestor: &ProxyClass) -> bool {
        self.lineage().iter().any(|class| class.ptr_eq(ancestor))
    }

    /// A class attribute, from this class or the nearest ancestor defining it.
    pub fn class_attr(&self, name: &str) -> Option<Value> {
        self.lineage()
            .into_iter()
            .find_map(|class| s_read!(class.0).attrs.get(name).cloned())
    }

    pub fn property(&self, name: &str) -> Option<Property> {
        self.lineage()
            .into_iter()
            .find_map(|class| s_read!(class.0).properties.get(name).cloned())
    }

    /// Whether the class hierarchy has an attribute or property `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.lineage().into_iter().any(|class| {
            let state = s_read!(class.0);
            state.attrs.contains_key(name) || state.properties.contains_key(name)
        })
    }

    /// Set a class attribute on this class.
    pub fn set_class_attr<V: Into<Value>>(&self, name: &str, value: V) {
        debug!("proxy", "setting `{name}` on proxy class {}", self.name());
        s_write!(self.0).attrs.insert(name.to_owned(), value.into());
    }

    /// Remove a class attribute or property defined on this class.
    pub fn del_class_attr(&self, name: &str) -> Result<()> {
        debug!("proxy", "removing `{name}` from proxy class {}", self.name());
        let mut state = s_write!(self.0);
        let removed =
            state.attrs.remove(name).is_some() || state.properties.remove(name).is_some();
        drop(state);

        if removed {
            Ok(())
        } else {
            AttributeSnafu { ty: "type", name }.fail()
        }
    }

    /// Attribute lookup on the class itself
    ///
    /// Functions marked [`MethodKind::Class`] come back bound to the class.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match name {
            NAME | QUALNAME => return Ok(Value::from(self.name())),
            MODULE => return Ok(Value::from(self.module())),
            DOC => return Ok(Value::from(self.doc())),
            CLASS => return Ok(Value::Type(Builtin::Type)),
            DICT => return Ok(self.vars()),
            _ => {}
        }
        match self.class_attr(name) {
            Some(Value::Function(function)) if s_read!(function).kind() == MethodKind::Class => {
                Ok(Value::from(Method::new(Value::from(self.clone()), function)))
            }
            Some(attr) => Ok(attr),
            None => AttributeSnafu { ty: "type", name }.fail(),
        }
    }

    /// The attributes defined directly on this class, sorted by name.
    pub fn vars(&self) -> Value {
        let state = s_read!(self.0);
        let mut names = state.attrs.keys().collect::<Vec<_>>();
        names.sort();

        let mut dict = Dict::new();
        for name in names {
            dict.insert_str(name, state.attrs[name].clone());
        }
        Value::from(dict)
    }

    /// Every name visible on the class, ancestors included.
    pub fn attr_names(&self) -> Vec<String> {
        let mut names = vec![
            NAME.to_owned(),
            QUALNAME.to_owned(),
            MODULE.to_owned(),
            DOC.to_owned(),
            DICT.to_owned(),
        ];
        for class in self.lineage() {
            let state = s_read!(class.0);
            names.extend(state.attrs.keys().cloned());
            names.extend(state.properties.keys().cloned());
        }
        names
    }

    pub(crate) fn init_hooks(&self) -> Vec<InitHook> {
        self.lineage()
            .into_iter()
            .filter_map(|class| s_read!(class.0).init.clone())
            .collect()
    }

    pub(crate) fn getattr_hooks(&self) -> Vec<GetAttrHook> {
        self.lineage()
            .into_iter()
            .filter_map(|class| s_read!(class.0).getattr.clone())
            .collect()
    }

    pub(crate) fn setattr_hooks(&self) -> Vec<SetAttrHook> {
        self.lineage()
            .into_iter()
            .filter_map(|class| s_read!(class.0).setattr.clone())
            .collect()
    }

    pub(crate) fn delattr_hooks(&self) -> Vec<DelAttrHook> {
        self.lineage()
            .into_iter()
            .filter_map(|class| s_read!(class.0).delattr.clone())
            .collect()
    }

    /// Create a proxy of this class around `value`.
    ///
    /// Init hooks run from the base down before the value is installed.
    pub fn instantiate<V: Into<Value>>(&self, value: V) -> Result<Proxy> {
        self.construct(Target::Ready {
            value: value.into(),
            factory: None,
        })
    }

    /// Create a proxy of this class that builds its value with `factory`.
    pub fn instantiate_lazy<V: Into<Value>>(&self, factory: V) -> Result<Proxy> {
        self.construct(Target::Lazy {
            factory: factory.into(),
        })
    }

    fn construct(&self, target: Target) -> Result<Proxy> {
        let proxy = Proxy::allocate(self.clone());
        for init in self.init_hooks().iter().rev() {
            init(&proxy)?;
        }
        proxy.install(target);
        Ok(proxy)
    }
}

impl fmt::Debug for ProxyClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProxyClass({})", self.name())
    }
}

/// Builds a [`ProxyClass`]
pub struct ProxyClassBuilder {
    state: ClassState,
}

impl ProxyClassBuilder {
    /// Extend `parent` rather than the base class.
    pub fn extends(mut self, parent: &ProxyClass) -> Self {
        self.state.parent = Some(parent.clone());
        self
    }

    pub fn module<S: AsRef<str>>(mut self, module: S) -> Self {
        self.state.module = module.as_ref().to_owned();
        self
    }

    pub fn doc<S: AsRef<str>>(mut self, doc: S) -> Self {
        self.state.doc = Some(doc.as_ref().to_owned());
        self
    }

    pub fn attribute<S: AsRef<str>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.state
            .attrs
            .insert(name.as_ref().to_owned(), value.into());
        self
    }

    /// Add a method. The proxy it's looked up through is the first argument.
    pub fn method<S, F>(self, name: S, body: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&Args) -> Result<Value> + Shareable + 'static,
    {
        let qualname = format!("{}.{}", self.state.name, name.as_ref());
        let module = self.state.module.clone();
        let function = Function::new(name.as_ref(), body)
            .with_qualname(qualname)
            .with_module(module);
        self.attribute(name, function)
    }

    pub fn property<S: AsRef<str>>(mut self, name: S, property: Property) -> Self {
        self.state
            .properties
            .insert(name.as_ref().to_owned(), property);
        self
    }

    /// Run `init` on every new instance, before its target is installed.
    pub fn on_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Proxy) -> Result<()> + Shareable + 'static,
    {
        let init: InitHook = RcType::new(init);
        self.state.init = Some(init);
        self
    }

    /// Intercept lookups that reach past the class. `next` carries on with
    /// the parent's hook, and finally the wrapped value.
    pub fn getattr<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, &str, &GetNext<'_>) -> Result<Value> + Shareable + 'static,
    {
        let hook: GetAttrHook = RcType::new(hook);
        self.state.getattr = Some(hook);
        self
    }

    /// Intercept every assignment.
    pub fn setattr<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, &str, Value, &SetNext<'_>) -> Result<()> + Shareable + 'static,
    {
        let hook: SetAttrHook = RcType::new(hook);
        self.state.setattr = Some(hook);
        self
    }

    /// Intercept every deletion.
    pub fn delattr<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proxy, &str, &DelNext<'_>) -> Result<()> + Shareable + 'static,
    {
        let hook: DelAttrHook = RcType::new(hook);
        self.state.delattr = Some(hook);
        self
    }

    pub fn build(self) -> ProxyClass {
        debug!("proxy", "new proxy class {}", self.state.name);
        ProxyClass(new_ref!(ClassState, self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_base_class() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let base = ProxyClass::base();
        assert_eq!(base.name(), "Proxy");
        assert!(base.parent().is_none());
        assert!(base.ptr_eq(&ProxyClass::base()));
        assert!(Proxy::new(1).class().ptr_eq(&base));
    }

    #[test]
    fn lineage_runs_to_the_base() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let middle = ProxyClass::builder("Middle").build();
        let leaf = ProxyClass::builder("Leaf").extends(&middle).build();

        let names = leaf
            .lineage()
            .iter()
            .map(|class| class.name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Leaf", "Middle", "Proxy"]);
        assert!(leaf.is_subclass_of(&middle));
        assert!(!middle.is_subclass_of(&leaf));
    }

    #[test]
    fn class_attributes_are_inherited() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let parent = ProxyClass::builder("Parent").attribute("LEVEL", 1).build();
        let child = ProxyClass::builder("Child").extends(&parent).build();

        assert_eq!(child.class_attr("LEVEL"), Some(Value::from(1)));
        assert!(child.defines("LEVEL"));

        child.set_class_attr("LEVEL", 2);
        assert_eq!(child.class_attr("LEVEL"), Some(Value::from(2)));
        assert_eq!(parent.class_attr("LEVEL"), Some(Value::from(1)));

        child.del_class_attr("LEVEL").unwrap();
        assert_eq!(child.class_attr("LEVEL"), Some(Value::from(1)));
        assert!(child.del_class_attr("LEVEL").unwrap_err().is_attribute_error());
    }

    #[test]
    fn class_level_lookup() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = ProxyClass::builder("Tagged")
            .module("tags")
            .doc("Tagged proxies.")
            .attribute("TAG", "t")
            .build();
        let value = Value::from(class.clone());

        assert_eq!(value.get_attr("__name__").unwrap(), Value::from("Tagged"));
        assert_eq!(value.get_attr("__module__").unwrap(), Value::from("tags"));
        assert_eq!(value.get_attr("TAG").unwrap(), Value::from("t"));
        assert!(value.get_attr("nope").unwrap_err().is_attribute_error());
        assert_eq!(value.repr().unwrap(), "<class 'tags.Tagged'>");
        assert_eq!(class.vars().len().unwrap(), 1);
        assert!(value.dir().unwrap().contains(&"TAG".to_owned()));
    }

    #[test]
    fn calling_a_class_instantiates_it() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = ProxyClass::builder("Wrapper").build();
        let proxy = Value::from(class.clone()).call_with([Value::from(3)]).unwrap();

        assert!(proxy.type_of().is(&Value::from(class)));
        assert_eq!(proxy, Value::from(3));
    }

    #[test]
    fn read_only_properties() {
        let _ = env_logger::builder().is_test(true).try_init();
        color_backtrace::install();

        let class = ProxyClass::builder("Fixed")
            .property("answer", Property::new(|_: &Proxy| Ok(Value::from(42))))
            .build();
        let proxy = class.instantiate(Value::None).unwrap();

        assert_eq!(proxy.get_attr("answer").unwrap(), Value::from(42));
        let err = proxy.set_attr("answer", Value::from(1)).unwrap_err();
        assert!(err.is_attribute_error());
        assert!(proxy.del_attr("answer").unwrap_err().is_attribute_error());
    }
}
