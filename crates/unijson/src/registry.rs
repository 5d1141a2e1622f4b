//! The type registry.
//!
//! Holds three independent tables:
//!
//! - custom encode functions, keyed by exact [`TypeId`];
//! - custom decode functions, keyed by exact [`TypeId`];
//! - type entries, indexed both by [`TypeId`] and by [`Locator`], which carry
//!   the capabilities a type opted into (decode hook, field dump, keyword
//!   construction, field replacement).
//!
//! Every table is last-write-wins and nothing is ever removed. Lookups are
//! exact: a registration for one type never applies to another.
//!
//! A [`Registry`] is a cheap handle; clones share the same tables.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HookError, HookResult, RegistryError, ResolveError};
use crate::locator::Locator;
use crate::value::{Composite, DynComposite, JsonMap, Map, Value};

/// Registered encode function, erased over the concrete type.
pub type EncodeFn = Arc<dyn Fn(&dyn DynComposite) -> HookResult<Map> + Send + Sync>;

/// Registered decode function.
pub type DecodeFn = Arc<dyn Fn(&Map) -> HookResult<Value> + Send + Sync>;

/// Builds a value from named arguments given as a plain JSON object.
pub type ConstructFn = Arc<dyn Fn(&JsonMap) -> HookResult<Value> + Send + Sync>;

type DecodeHookFn = fn(&Map) -> Option<HookResult<Value>>;
type FieldsFn = fn(&dyn DynComposite) -> HookResult<JsonMap>;

/// Everything the registry knows about one concrete type.
#[derive(Clone)]
pub struct TypeEntry {
    type_id: TypeId,
    type_name: &'static str,
    locator: Locator,
    decode_hook: DecodeHookFn,
    fields: Option<FieldsFn>,
    construct: Option<ConstructFn>,
    replace: Option<ConstructFn>,
}

impl TypeEntry {
    fn new<T: Composite>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            locator: Locator::of::<T>(),
            decode_hook: decode_hook::<T>,
            fields: None,
            construct: None,
            replace: None,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn has_field_dump(&self) -> bool {
        self.fields.is_some()
    }

    pub fn has_keyword_construction(&self) -> bool {
        self.construct.is_some()
    }

    pub fn has_field_replacement(&self) -> bool {
        self.replace.is_some()
    }

    pub(crate) fn decode_hook(&self, fields: &Map) -> Option<HookResult<Value>> {
        (self.decode_hook)(fields)
    }

    pub(crate) fn dump_fields(&self, value: &dyn DynComposite) -> Option<HookResult<JsonMap>> {
        self.fields.map(|dump| dump(value))
    }

    pub(crate) fn keyword_constructor(&self) -> Option<&ConstructFn> {
        self.construct.as_ref()
    }

    pub(crate) fn field_replacer(&self) -> Option<&ConstructFn> {
        self.replace.as_ref()
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("type_name", &self.type_name)
            .field("locator", &self.locator)
            .field("field_dump", &self.fields.is_some())
            .field("keyword_construction", &self.construct.is_some())
            .field("field_replacement", &self.replace.is_some())
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    encoders: HashMap<TypeId, EncodeFn>,
    decoders: HashMap<TypeId, DecodeFn>,
    types: HashMap<TypeId, Arc<TypeEntry>>,
    /// module -> class -> type
    modules: HashMap<String, HashMap<String, TypeId>>,
}

impl RegistryInner {
    fn entry_mut<T: Composite>(&mut self) -> &mut TypeEntry {
        let entry = self.types.entry(TypeId::of::<T>()).or_insert_with(|| {
            let entry = TypeEntry::new::<T>();
            index(&mut self.modules, &entry.locator, entry.type_id);
            Arc::new(entry)
        });
        Arc::make_mut(entry)
    }

    fn relocate<T: Composite>(&mut self, locator: Locator) {
        let type_id = TypeId::of::<T>();
        let previous = std::mem::replace(&mut self.entry_mut::<T>().locator, locator.clone());
        unindex(&mut self.modules, &previous, type_id);
        index(&mut self.modules, &locator, type_id);
    }
}

fn index(modules: &mut HashMap<String, HashMap<String, TypeId>>, locator: &Locator, type_id: TypeId) {
    modules
        .entry(locator.module().to_string())
        .or_default()
        .insert(locator.class().to_string(), type_id);
}

fn unindex(modules: &mut HashMap<String, HashMap<String, TypeId>>, locator: &Locator, type_id: TypeId) {
    if let Some(classes) = modules.get_mut(locator.module()) {
        if classes.get(locator.class()) == Some(&type_id) {
            classes.remove(locator.class());
        }
        if classes.is_empty() {
            modules.remove(locator.module());
        }
    }
}

/// Shared, internally synchronized registry handle.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("encoders", &inner.encoders.len())
            .field("decoders", &inner.decoders.len())
            .field("types", &inner.types.len())
            .finish()
    }
}

impl Registry {
    /// Registry without any registration.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in date/time registrations.
    pub fn new() -> Self {
        let registry = Self::empty();
        crate::builtins::register(&registry);
        registry
    }

    /// The process-wide registry used by the free functions of this crate.
    ///
    /// Seeded with the built-ins and, with the `auto_register` feature, with
    /// every registration submitted through [`submit!`](crate::submit).
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let registry = Registry::new();
            registry.auto_register();
            registry
        })
    }

    /// Apply every registration submitted with [`submit!`](crate::submit).
    ///
    /// Returns `false` when the `auto_register` feature is disabled.
    pub fn auto_register(&self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            for registration in inventory::iter::<Registration> {
                registration.apply(self);
            }
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    /// Register `encode` for values of exactly type `T`.
    pub fn register_encoder<T, F>(&self, encode: F)
    where
        T: Composite,
        F: Fn(&T) -> HookResult<Map> + Send + Sync + 'static,
    {
        let erased: EncodeFn =
            Arc::new(move |value: &dyn DynComposite| encode(downcast::<T>(value)?));
        self.inner.write().encoders.insert(TypeId::of::<T>(), erased);
    }

    /// Register `decode` for mappings whose locator resolves to `T`.
    ///
    /// Also makes `T` resolvable under its locator if it was not yet.
    pub fn register_decoder<T, F>(&self, decode: F)
    where
        T: Composite,
        F: Fn(&Map) -> HookResult<Value> + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        inner.entry_mut::<T>();
        inner.decoders.insert(TypeId::of::<T>(), Arc::new(decode));
    }

    /// Make `T` resolvable under its Rust-derived locator, keeping any
    /// previous registration, and return a builder for its capabilities.
    pub fn register_type<T: Composite>(&self) -> TypeRegistration<'_, T> {
        self.inner.write().entry_mut::<T>();
        TypeRegistration {
            registry: self,
            _marker: PhantomData,
        }
    }

    /// [`register_type`](Self::register_type) under an explicit locator.
    pub fn register_type_as<T: Composite>(
        &self,
        module: &str,
        class: &str,
    ) -> Result<TypeRegistration<'_, T>, RegistryError> {
        let locator = Locator::new(module, class)?;
        Ok(self.register_type::<T>().with_locator(locator))
    }

    pub fn has_encoder(&self, type_id: TypeId) -> bool {
        self.inner.read().encoders.contains_key(&type_id)
    }

    pub fn has_decoder(&self, type_id: TypeId) -> bool {
        self.inner.read().decoders.contains_key(&type_id)
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.inner.read().types.contains_key(&type_id)
    }

    pub fn entry(&self, type_id: TypeId) -> Option<Arc<TypeEntry>> {
        self.inner.read().types.get(&type_id).cloned()
    }

    pub(crate) fn encoder(&self, type_id: TypeId) -> Option<EncodeFn> {
        self.inner.read().encoders.get(&type_id).cloned()
    }

    pub(crate) fn decoder(&self, type_id: TypeId) -> Option<DecodeFn> {
        self.inner.read().decoders.get(&type_id).cloned()
    }

    /// Locator stamped on values of the given type.
    pub fn locator_for(&self, type_id: TypeId, type_name: &str) -> Locator {
        match self.inner.read().types.get(&type_id) {
            Some(entry) => entry.locator.clone(),
            None => Locator::from_type_name(type_name),
        }
    }

    /// Find the type registered under `locator`.
    pub fn resolve(&self, locator: &Locator) -> Result<Arc<TypeEntry>, ResolveError> {
        let inner = self.inner.read();
        let classes = inner
            .modules
            .get(locator.module())
            .ok_or_else(|| ResolveError::UnknownModule(locator.module().to_string()))?;
        classes
            .get(locator.class())
            .and_then(|type_id| inner.types.get(type_id))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownType {
                module: locator.module().to_string(),
                class: locator.class().to_string(),
            })
    }
}

/// Builder returned by [`Registry::register_type`]. Every call writes through
/// to the registry immediately.
pub struct TypeRegistration<'a, T> {
    registry: &'a Registry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Composite> TypeRegistration<'_, T> {
    fn update(self, f: impl FnOnce(&mut TypeEntry)) -> Self {
        f(self.registry.inner.write().entry_mut::<T>());
        self
    }

    /// Tag and resolve `T` under `locator` instead of its Rust path.
    pub fn with_locator(self, locator: Locator) -> Self {
        self.registry.inner.write().relocate::<T>(locator);
        self
    }

    /// Field dump through `Serialize`.
    pub fn with_fields(self) -> Self
    where
        T: Serialize,
    {
        self.update(|entry| entry.fields = Some(serde_fields::<T>))
    }

    /// Field dump through `Serialize` and keyword construction through
    /// `Deserialize`.
    pub fn with_serde(self) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        self.update(|entry| {
            entry.fields = Some(serde_fields::<T>);
            entry.construct = Some(Arc::new(serde_construct::<T>));
        })
    }

    /// Field replacement: start from `T::default()` and overwrite the fields
    /// present in the mapping.
    pub fn with_default(self) -> Self
    where
        T: Default + Serialize + DeserializeOwned,
    {
        self.update(|entry| entry.replace = Some(Arc::new(default_replace::<T>)))
    }

    /// Keyword construction through an explicit named-argument constructor.
    pub fn with_constructor<F>(self, construct: F) -> Self
    where
        F: Fn(&JsonMap) -> HookResult<T> + Send + Sync + 'static,
    {
        let construct: ConstructFn =
            Arc::new(move |kwargs: &JsonMap| construct(kwargs).map(Value::composite));
        self.update(|entry| entry.construct = Some(construct))
    }

    pub fn with_encoder<F>(self, encode: F) -> Self
    where
        F: Fn(&T) -> HookResult<Map> + Send + Sync + 'static,
    {
        self.registry.register_encoder::<T, F>(encode);
        self
    }

    pub fn with_decoder<F>(self, decode: F) -> Self
    where
        F: Fn(&Map) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.registry.register_decoder::<T, F>(decode);
        self
    }

    pub fn locator(&self) -> Locator {
        self.registry
            .inner
            .read()
            .types
            .get(&TypeId::of::<T>())
            .map_or_else(Locator::of::<T>, |entry| entry.locator.clone())
    }
}

/// A registration function collected at link time by [`submit!`](crate::submit).
pub struct Registration {
    register: fn(&Registry),
}

impl Registration {
    pub const fn new(register: fn(&Registry)) -> Self {
        Self { register }
    }

    pub fn apply(&self, registry: &Registry) {
        (self.register)(registry)
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(Registration);

fn downcast<T: Composite>(value: &dyn DynComposite) -> HookResult<&T> {
    value.as_any().downcast_ref::<T>().ok_or_else(|| {
        HookError::msg(format!(
            "expected `{}`, got `{}`",
            type_name::<T>(),
            value.type_name()
        ))
    })
}

fn decode_hook<T: Composite>(fields: &Map) -> Option<HookResult<Value>> {
    T::json_decode(fields).map(|decoded| decoded.map(Value::composite))
}

fn serde_fields<T: Composite + Serialize>(value: &dyn DynComposite) -> HookResult<JsonMap> {
    match serde_json::to_value(downcast::<T>(value)?)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(HookError::msg(format!(
            "`{}` serializes to {}, not an object",
            type_name::<T>(),
            Value::from(other).kind()
        ))),
    }
}

fn serde_construct<T: Composite + DeserializeOwned>(kwargs: &JsonMap) -> HookResult<Value> {
    let value: T = serde_json::from_value(serde_json::Value::Object(kwargs.clone()))?;
    Ok(Value::composite(value))
}

fn default_replace<T>(fields: &JsonMap) -> HookResult<Value>
where
    T: Composite + Default + Serialize + DeserializeOwned,
{
    let mut base = match serde_json::to_value(T::default())? {
        serde_json::Value::Object(map) => map,
        _ => {
            return Err(HookError::msg(format!(
                "default `{}` has no fields to replace",
                type_name::<T>()
            )))
        }
    };
    for (key, value) in fields {
        base.insert(key.clone(), value.clone());
    }
    let value: T = serde_json::from_value(serde_json::Value::Object(base))?;
    Ok(Value::composite(value))
}
