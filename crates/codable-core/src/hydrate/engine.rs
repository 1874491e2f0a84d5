//! The hydration engine.
//!
//! [`Decoder`] is the shareable entry point. Each decode call creates a
//! [`Hydrator`], which carries the per-call state: the field path used in
//! error messages, the type currently being hydrated, and whether map keys
//! of the current field are interned.
//!
//! # Polymorphic resolution
//!
//! A node decoded into `Box<dyn Base>` selects its concrete type in order:
//!
//! 1. A list node uses the category's array sugar and is assigned to the
//!    sugar type's array field.
//! 2. A string discriminator (`_field`) names a label, alias or class.
//! 3. A node with exactly one key, whose key resolves (or the category has
//!    no default type), is shorthand for that type with the key's object as
//!    its body.
//! 4. Otherwise the default type, if any.
//!
//! Defaults declared on the chosen label's alias chain are merged beneath
//! the node before population.

use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::mem;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult, RegistryError};
use crate::foundation::catalog::{ClassCatalog, ClassInfo};
use crate::foundation::descriptor::{FieldFlags, NumberKind, Setter};
use crate::foundation::node::{
    ConfigValueType, ObjectView, at_path, coerce_bool, coerce_number, coerce_string, with_fallback,
    with_shallow_fallback,
};
use crate::hydrate::codable::{Codable, CodableEnum, Decode, PluginBase};
use crate::hydrate::decode::MapKey;
use crate::plugins::registries::PluginRegistries;
use crate::plugins::registry::PluginRegistry;

// =============================================================================
// Decoder
// =============================================================================

/// Decodes config trees into typed values.
///
/// Cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Decoder {
    registries: Arc<PluginRegistries>,
}

impl Decoder {
    pub fn new(registries: Arc<PluginRegistries>) -> Self {
        Self { registries }
    }

    /// A decoder with no configured plugin categories.
    pub fn with_catalog(catalog: Arc<ClassCatalog>) -> Self {
        Self::new(Arc::new(PluginRegistries::new(catalog)))
    }

    pub fn registries(&self) -> &Arc<PluginRegistries> {
        &self.registries
    }

    /// Decodes `value` as a `T`.
    pub fn decode<T: Decode>(&self, value: &Value) -> DecodeResult<T> {
        let mut cx = Hydrator::new(&self.registries, type_name::<T>());
        cx.decode_value(value)
    }

    /// Decodes the value at a dotted `path` below `root`.
    ///
    /// Returns `Ok(None)` if the path is absent or null.
    pub fn decode_path<T: Decode>(&self, root: &Value, path: &str) -> DecodeResult<Option<T>> {
        let Some(value) = at_path(root, path) else {
            return Ok(None);
        };
        let mut cx = Hydrator::new(&self.registries, type_name::<T>());
        if !path.is_empty() {
            cx.path
                .extend(path.split('.').map(|segment| PathSegment::Key(segment.to_owned())));
        }
        T::decode(value, &mut cx).map(Some)
    }
}

// =============================================================================
// Hydrator
// =============================================================================

#[derive(Debug, Clone)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Per-call decoding state.
#[derive(Debug)]
pub struct Hydrator<'r> {
    registries: &'r PluginRegistries,
    path: Vec<PathSegment>,
    target: &'static str,
    intern_keys: bool,
}

impl<'r> Hydrator<'r> {
    pub fn new(registries: &'r PluginRegistries, target: &'static str) -> Self {
        Self {
            registries,
            path: Vec::new(),
            target,
            intern_keys: false,
        }
    }

    pub fn registries(&self) -> &'r PluginRegistries {
        self.registries
    }

    /// The current field path, e.g. `filters[2].pattern`.
    pub fn path(&self) -> String {
        if self.path.is_empty() {
            return String::from("<root>");
        }
        let mut rendered = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !rendered.is_empty() {
                        rendered.push('.');
                    }
                    rendered.push_str(key);
                }
                PathSegment::Index(index) => {
                    let _ = write!(rendered, "[{index}]");
                }
            }
        }
        rendered
    }

    /// The type currently being hydrated.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Builds an error located at the current path.
    pub fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.path(), self.target, kind)
    }

    /// Builds a [`DecodeErrorKind::Custom`] error at the current path.
    pub fn custom_error(&self, message: impl Into<String>) -> DecodeError {
        self.error(DecodeErrorKind::Custom(message.into()))
    }

    fn wrong_type(&self, expected: &'static str, value: &Value) -> DecodeError {
        self.error(DecodeErrorKind::WrongType {
            expected,
            found: ConfigValueType::of(value),
        })
    }

    fn at_key<R>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(PathSegment::Key(key.to_owned()));
        let result = f(self);
        self.path.pop();
        result
    }

    fn at_index<R>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(PathSegment::Index(index));
        let result = f(self);
        self.path.pop();
        result
    }

    /// Decodes `value`, routing `null` to [`Decode::decode_null`].
    pub fn decode_value<T: Decode>(&mut self, value: &Value) -> DecodeResult<T> {
        if value.is_null() {
            T::decode_null(self)
        } else {
            T::decode(value, self)
        }
    }

    /// Decodes `key` of `node`, or `None` if it is absent or null.
    ///
    /// Meant for custom-decode hooks.
    pub fn decode_field<T: Decode>(&mut self, node: ObjectView<'_>, key: &str) -> DecodeResult<Option<T>> {
        match node.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.at_key(key, |cx| T::decode(value, cx)).map(Some),
        }
    }

    // -------------------------------------------------------------------------
    // Scalars
    // -------------------------------------------------------------------------

    pub fn read_string(&self, value: &Value) -> DecodeResult<String> {
        coerce_string(value)
            .map(Cow::into_owned)
            .ok_or_else(|| self.wrong_type("STRING", value))
    }

    pub fn read_bool(&self, value: &Value) -> DecodeResult<bool> {
        coerce_bool(value).ok_or_else(|| self.wrong_type("BOOLEAN", value))
    }

    /// Reads an integer of the width described by `kind`.
    ///
    /// Values outside the target range and non-integral values are errors.
    pub fn read_integer<N>(&self, value: &Value, kind: NumberKind) -> DecodeResult<N>
    where
        N: TryFrom<i64> + TryFrom<u64>,
    {
        let number = coerce_number(value).ok_or_else(|| self.wrong_type("NUMBER", value))?;
        let out_of_range = || {
            self.error(DecodeErrorKind::NumberOutOfRange {
                value: number.to_string(),
                target: kind.name(),
            })
        };
        if let Some(signed) = number.as_i64() {
            return <N as TryFrom<i64>>::try_from(signed).map_err(|_| out_of_range());
        }
        if let Some(unsigned) = number.as_u64() {
            return <N as TryFrom<u64>>::try_from(unsigned).map_err(|_| out_of_range());
        }
        let Some(float) = number.as_f64() else {
            return Err(out_of_range());
        };
        if float.fract() != 0.0 {
            return Err(self.error(DecodeErrorKind::NotAnInteger {
                value: number.to_string(),
            }));
        }
        if (0.0..18_446_744_073_709_551_616.0).contains(&float) {
            return <N as TryFrom<u64>>::try_from(float as u64).map_err(|_| out_of_range());
        }
        if !(-9.223_372_036_854_775_808e18..0.0).contains(&float) {
            return Err(out_of_range());
        }
        <N as TryFrom<i64>>::try_from(float as i64).map_err(|_| out_of_range())
    }

    pub fn read_float(&self, value: &Value) -> DecodeResult<f64> {
        coerce_number(value)
            .and_then(|number| number.as_f64())
            .ok_or_else(|| self.wrong_type("NUMBER", value))
    }

    /// Reads a float narrowed to `f32`, rounding to nearest.
    ///
    /// Finite values beyond the `f32` range are errors.
    pub fn read_f32(&self, value: &Value) -> DecodeResult<f32> {
        let float = self.read_float(value)?;
        let narrowed = float as f32;
        if float.is_finite() && !narrowed.is_finite() {
            return Err(self.error(DecodeErrorKind::NumberOutOfRange {
                value: float.to_string(),
                target: NumberKind::F32.name(),
            }));
        }
        Ok(narrowed)
    }

    /// Fails for numeric types without a decoding rule.
    pub fn unsupported_number<N>(&self, kind: NumberKind) -> DecodeResult<N> {
        Err(self.error(DecodeErrorKind::UnsupportedNumber { target: kind.name() }))
    }

    /// Reads an enum variant by its upper-cased name.
    pub fn read_enum<E: CodableEnum>(&self, value: &Value) -> DecodeResult<E> {
        let raw = self.read_string(value)?;
        let wanted = raw.to_uppercase();
        E::variants()
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, variant)| *variant)
            .ok_or_else(|| {
                self.error(DecodeErrorKind::UnknownEnumVariant {
                    value: raw,
                    enum_name: E::NAME,
                })
            })
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    /// Decodes a list element by element.
    pub fn hydrate_array<T: Decode>(&mut self, value: &Value) -> DecodeResult<Vec<T>> {
        let Value::Array(items) = value else {
            return Err(self.wrong_type("LIST", value));
        };
        let mut decoded = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            decoded.push(self.at_index(index, |cx| cx.decode_value::<T>(item))?);
        }
        Ok(decoded)
    }

    /// Decodes an object into a string-keyed map.
    pub fn hydrate_map<K, V, M>(&mut self, value: &Value) -> DecodeResult<M>
    where
        K: MapKey,
        V: Decode,
        M: Default + Extend<(K, V)>,
    {
        let Value::Object(entries) = value else {
            return Err(self.wrong_type("OBJECT", value));
        };
        let intern = self.intern_keys;
        let mut map = M::default();
        for (key, item) in entries {
            let decoded = self.at_key(key, |cx| cx.decode_value::<V>(item))?;
            map.extend(std::iter::once((K::from_key(key, intern), decoded)));
        }
        Ok(map)
    }

    /// Decodes a list into any extendable collection.
    ///
    /// Each entry decodes as a `T`, so a collection of arrays gets one array
    /// per entry.
    pub fn hydrate_collection<T, C>(&mut self, value: &Value) -> DecodeResult<C>
    where
        T: Decode,
        C: Default + Extend<T>,
    {
        let mut collection = C::default();
        collection.extend(self.hydrate_array::<T>(value)?);
        Ok(collection)
    }

    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    /// Instantiates and populates a concrete type from an object node.
    pub fn hydrate_custom<T: Codable>(&mut self, value: &Value) -> DecodeResult<T> {
        match value {
            Value::Object(map) => self.instantiate(ObjectView::new(map)),
            other => Err(self.wrong_type("OBJECT", other)),
        }
    }

    pub(crate) fn instantiate<T: Codable>(&mut self, view: ObjectView<'_>) -> DecodeResult<T> {
        let previous_target = mem::replace(&mut self.target, T::descriptor().type_name());
        let previous_intern = mem::replace(&mut self.intern_keys, false);
        let result = self.construct_and_populate::<T>(view);
        self.target = previous_target;
        self.intern_keys = previous_intern;
        result
    }

    fn construct_and_populate<T: Codable>(&mut self, view: ObjectView<'_>) -> DecodeResult<T> {
        let mut object = T::construct().map_err(|err| {
            self.error(DecodeErrorKind::Construct {
                type_name: T::descriptor().type_name(),
                reason: err.to_string(),
            })
        })?;
        self.populate(&mut object, view)?;
        Ok(object)
    }

    /// Populates an existing instance, running its decode hooks.
    pub fn populate<T: Codable>(&mut self, object: &mut T, view: ObjectView<'_>) -> DecodeResult<()> {
        if let Some(custom) = object.as_custom_decode() {
            return custom.decode_from(view, self);
        }
        self.populate_fields(object, view)?;
        if let Some(hook) = object.as_post_decode() {
            hook.post_decode()
                .map_err(|err| self.error(DecodeErrorKind::Custom(err.to_string())))?;
        }
        Ok(())
    }

    /// Populates the descriptor fields of an instance, without hooks.
    ///
    /// Absent and null fields keep their constructed value.
    pub fn populate_fields<T: Codable>(&mut self, object: &mut T, view: ObjectView<'_>) -> DecodeResult<()> {
        for field in T::descriptor().fields() {
            if field.flags().contains(FieldFlags::WRITE_ONLY) {
                continue;
            }
            match field.setter() {
                Setter::Flatten(set) => set(object, view, self)?,
                Setter::Value(set) => {
                    let Some(value) = view.get(field.name()) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    let intern = field.flags().contains(FieldFlags::INTERN);
                    let previous = mem::replace(&mut self.intern_keys, intern);
                    let result = self.at_key(field.name(), |cx| set(object, value, cx));
                    self.intern_keys = previous;
                    result?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Plugins
    // -------------------------------------------------------------------------

    /// Decodes a node into the plugin base `B`, resolving its concrete type
    /// through the registry of `B::CATEGORY`.
    pub fn hydrate_plugin<B: PluginBase + ?Sized>(&mut self, value: &Value) -> DecodeResult<Box<B>> {
        let registry = self
            .registries
            .get_or_empty(B::CATEGORY, Some(B::base_info()));
        let previous = mem::replace(&mut self.target, type_name::<B>());
        let result = self.hydrate_plugin_in::<B>(&registry, value);
        self.target = previous;
        result
    }

    fn hydrate_plugin_in<B: PluginBase + ?Sized>(
        &mut self,
        registry: &PluginRegistry,
        value: &Value,
    ) -> DecodeResult<Box<B>> {
        let base = TypeId::of::<B>();
        let wrapped: Map<String, Value>;
        let merged: Map<String, Value>;

        let (map, forced) = match value {
            Value::Object(map) => (map, None),
            Value::Array(_) => {
                let unavailable = || {
                    self.error(DecodeErrorKind::ArraySugarUnavailable {
                        category: registry.category().to_owned(),
                    })
                };
                let sugar = registry.array_sugar().ok_or_else(unavailable)?;
                let field = sugar.class().array_field_for(base).ok_or_else(unavailable)?;
                trace!(origin = sugar.origin(), field, "Applying array sugar");
                wrapped = Map::from_iter([(field.to_owned(), value.clone())]);
                (&wrapped, Some(sugar.class()))
            }
            other => return Err(self.wrong_type("OBJECT", other)),
        };

        let class_field = registry.class_field();
        let mut view = ObjectView::new(map);
        let (class, label) = match forced {
            Some(class) => (class, None),
            None => match view.get(class_field) {
                Some(Value::String(label)) => {
                    view = view.hiding(class_field);
                    (self.resolve(registry, label)?, Some(label.as_str()))
                }
                None | Some(Value::Null) => self.infer_type(registry, &mut view)?,
                Some(other) => {
                    return Err(self.at_key(class_field, |cx| cx.wrong_type("STRING", other)));
                }
            },
        };

        if !class.implements(base) {
            return Err(self.not_subtype::<B>(registry, class));
        }

        if let Some(label) = label {
            let defaults = registry.defaults(label);
            if !defaults.is_empty() {
                merged = if registry.is_inlined(label) {
                    with_fallback(&view.to_map(), &defaults)
                } else {
                    with_shallow_fallback(&view.to_map(), &defaults)
                };
                view = ObjectView::new(&merged).hiding(class_field);
            }
        }

        trace!(
            category = registry.category(),
            class = %class.qualified_name(),
            "Hydrating plugin"
        );
        let object = (class.hydrate)(view, self)?;
        let upcast = class
            .upcast(base, object)
            .ok_or_else(|| self.not_subtype::<B>(registry, class))?;
        upcast
            .downcast::<Box<B>>()
            .map(|boxed| *boxed)
            .map_err(|_| self.not_subtype::<B>(registry, class))
    }

    fn infer_type<'a>(
        &self,
        registry: &'a PluginRegistry,
        view: &mut ObjectView<'a>,
    ) -> DecodeResult<(&'static ClassInfo, Option<&'a str>)> {
        if let Some((key, inner)) = view.single_entry() {
            let resolved = registry.resolve(key);
            if resolved.is_ok() || registry.default_sugar().is_none() {
                let class = resolved.map_err(|err| self.error(err.into()))?;
                let Value::Object(body) = inner else {
                    return Err(self.wrong_type("OBJECT", inner));
                };
                trace!(label = key, "Using single-key shorthand");
                *view = ObjectView::new(body).hiding(registry.class_field());
                return Ok((class, Some(key)));
            }
        }
        match registry.default_sugar() {
            Some(sugar) => {
                trace!(origin = sugar.origin(), "Applying default type");
                Ok((sugar.class(), Some(sugar.label())))
            }
            None => Err(self.error(DecodeErrorKind::MissingType {
                category: registry.category().to_owned(),
                class_field: registry.class_field().to_owned(),
            })),
        }
    }

    fn resolve(&self, registry: &PluginRegistry, label: &str) -> DecodeResult<&'static ClassInfo> {
        registry.resolve(label).map_err(|err| self.error(err.into()))
    }

    fn not_subtype<B: PluginBase + ?Sized>(&self, registry: &PluginRegistry, class: &ClassInfo) -> DecodeError {
        self.error(DecodeErrorKind::Resolve(RegistryError::NotSubtype {
            category: registry.category().to_owned(),
            base: B::base_info().qualified_name(),
            class_field: registry.class_field().to_owned(),
            class: class.qualified_name(),
        }))
    }
}

/// Type-erased hydration entry stored in [`ClassInfo`].
pub fn hydrate_erased<T: Codable>(
    view: ObjectView<'_>,
    cx: &mut Hydrator<'_>,
) -> DecodeResult<Box<dyn std::any::Any>> {
    cx.instantiate::<T>(view).map(|object| Box::new(object) as Box<dyn std::any::Any>)
}
