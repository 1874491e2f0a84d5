//! Field descriptors.
//!
//! A [`TypeDescriptor`] is the reflection table of one decodable type: an
//! ordered list of fields, each with a config key, a [`FieldKind`] that
//! drives dispatch, [`FieldFlags`], and a setter that writes a decoded value
//! into the target object. Descriptors are normally produced by
//! `#[derive(Codable)]` and cached for the life of the process.

use std::any::TypeId;
use std::fmt;

use bitflags::bitflags;
use serde_json::Value;

use crate::error::DecodeResult;
use crate::foundation::node::ObjectView;
use crate::hydrate::{Codable, Decode, Hydrator};

// =============================================================================
// Field Kinds
// =============================================================================

/// Native numeric representation of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    /// A numeric type without a decoding rule.
    Unsupported(&'static str),
}

impl NumberKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Unsupported(name) => name,
        }
    }
}

/// An object type referenced by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKind {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// True for plugin base types resolved through a registry.
    pub polymorphic: bool,
}

impl ObjectKind {
    pub fn of<T: ?Sized + 'static>(polymorphic: bool) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            polymorphic,
        }
    }
}

/// How a field's config value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean { atomic: bool },
    Number { kind: NumberKind, atomic: bool },
    Enum { name: &'static str },
    Object(ObjectKind),
    Array(Box<FieldKind>),
    Map { value: Box<FieldKind> },
    Collection { element: Box<FieldKind> },
    Optional(Box<FieldKind>),
    /// An embedded struct whose fields are read from the enclosing node.
    Flatten(ObjectKind),
}

impl FieldKind {
    /// Strips any `Optional` wrappers.
    pub fn unwrap_optional(&self) -> &FieldKind {
        match self {
            Self::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.unwrap_optional(), Self::Array(_))
    }

    /// Element kind of an array field.
    pub fn element(&self) -> Option<&FieldKind> {
        match self.unwrap_optional() {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The object type of an object field.
    pub fn object(&self) -> Option<ObjectKind> {
        match self.unwrap_optional() {
            Self::Object(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns true for arrays whose elements are the plugin base `base`.
    pub fn is_array_of(&self, base: TypeId) -> bool {
        self.element()
            .and_then(FieldKind::object)
            .is_some_and(|kind| kind.polymorphic && kind.type_id == base)
    }
}

bitflags! {
    /// Per-field decoding flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// Never populated from config.
        const WRITE_ONLY = 1;
        /// Map keys are interned.
        const INTERN = 1 << 1;
    }
}

// =============================================================================
// Field Descriptors
// =============================================================================

pub(crate) type ValueSetter<T> =
    Box<dyn Fn(&mut T, &Value, &mut Hydrator<'_>) -> DecodeResult<()> + Send + Sync>;
pub(crate) type FlattenSetter<T> =
    Box<dyn Fn(&mut T, ObjectView<'_>, &mut Hydrator<'_>) -> DecodeResult<()> + Send + Sync>;

pub(crate) enum Setter<T> {
    Value(ValueSetter<T>),
    Flatten(FlattenSetter<T>),
}

/// One decodable field of `T`.
pub struct FieldDescriptor<T> {
    name: &'static str,
    kind: FieldKind,
    flags: FieldFlags,
    setter: Setter<T>,
    nested: Option<fn() -> Vec<FieldSummary>>,
}

impl<T> FieldDescriptor<T> {
    /// The config key of the field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub(crate) fn setter(&self) -> &Setter<T> {
        &self.setter
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a field, used for array-sugar field lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSummary {
    pub name: &'static str,
    pub kind: FieldKind,
}

// =============================================================================
// Type Descriptors
// =============================================================================

/// The ordered field table of a decodable type.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> TypeDescriptor<T> {
    pub fn builder(type_name: &'static str) -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder {
            type_name,
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Field summaries in lookup order: own fields first, then the fields
    /// of each flattened struct, outermost last.
    pub fn summaries(&self) -> Vec<FieldSummary> {
        let mut own: Vec<FieldSummary> = self
            .fields
            .iter()
            .filter(|field| field.nested.is_none())
            .map(|field| FieldSummary {
                name: field.name,
                kind: field.kind.clone(),
            })
            .collect();
        for nested in self.fields.iter().filter_map(|field| field.nested) {
            own.extend(nested());
        }
        own
    }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Field summaries of a codable type.
pub fn field_summaries<T: Codable>() -> Vec<FieldSummary> {
    T::descriptor().summaries()
}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> TypeDescriptorBuilder<T> {
    /// Adds a field decoded from the key `name`.
    pub fn field<F>(self, name: &'static str, accessor: fn(&mut T) -> &mut F) -> Self
    where
        F: Decode + 'static,
    {
        self.field_with(name, FieldFlags::empty(), accessor)
    }

    /// Adds a field with explicit flags.
    pub fn field_with<F>(
        mut self,
        name: &'static str,
        flags: FieldFlags,
        accessor: fn(&mut T) -> &mut F,
    ) -> Self
    where
        F: Decode + 'static,
    {
        let setter: ValueSetter<T> =
            Box::new(move |object: &mut T, value: &Value, cx: &mut Hydrator<'_>| {
                *accessor(object) = F::decode(value, cx)?;
                Ok(())
            });
        self.fields.push(FieldDescriptor {
            name,
            kind: F::kind(),
            flags,
            setter: Setter::Value(setter),
            nested: None,
        });
        self
    }

    /// Adds an embedded struct whose fields are read from the same node.
    pub fn flatten<F>(mut self, name: &'static str, accessor: fn(&mut T) -> &mut F) -> Self
    where
        F: Codable,
    {
        let setter: FlattenSetter<T> =
            Box::new(move |object: &mut T, view: ObjectView<'_>, cx: &mut Hydrator<'_>| {
                cx.populate_fields(accessor(object), view)
            });
        self.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Flatten(ObjectKind::of::<F>(false)),
            flags: FieldFlags::empty(),
            setter: Setter::Flatten(setter),
            nested: Some(field_summaries::<F>),
        });
        self
    }

    pub fn build(self) -> TypeDescriptor<T> {
        TypeDescriptor {
            type_name: self.type_name,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape {}

    #[test]
    fn test_field_kind_queries() {
        let base = ObjectKind::of::<dyn Shape>(true);
        let array = FieldKind::Array(Box::new(FieldKind::Object(base)));
        assert!(array.is_array());
        assert!(array.is_array_of(TypeId::of::<dyn Shape>()));
        assert!(!array.is_array_of(TypeId::of::<String>()));

        let optional = FieldKind::Optional(Box::new(array.clone()));
        assert!(optional.is_array_of(TypeId::of::<dyn Shape>()));

        let concrete = FieldKind::Array(Box::new(FieldKind::Object(ObjectKind::of::<String>(false))));
        assert!(!concrete.is_array_of(TypeId::of::<String>()));
    }

    #[test]
    fn test_number_kind_names() {
        assert_eq!(NumberKind::I16.name(), "i16");
        assert_eq!(NumberKind::Unsupported("i128").name(), "i128");
    }

    #[test]
    fn test_flags() {
        let flags = FieldFlags::WRITE_ONLY | FieldFlags::INTERN;
        assert!(flags.contains(FieldFlags::INTERN));
        assert!(!FieldFlags::default().contains(FieldFlags::WRITE_ONLY));
    }
}
