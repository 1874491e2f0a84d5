//! [`Decode`] implementations for standard library types.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::DecodeResult;
use crate::foundation::descriptor::{FieldKind, NumberKind, ObjectKind};
use crate::foundation::intern::intern;
use crate::hydrate::codable::{Decode, PluginBase};
use crate::hydrate::engine::Hydrator;

// =============================================================================
// Map Keys
// =============================================================================

/// A string-like map key.
pub trait MapKey: Sized {
    /// Builds a key, interning it if `intern` is set and the key type
    /// supports sharing.
    fn from_key(key: &str, intern: bool) -> Self;
}

impl MapKey for String {
    fn from_key(key: &str, _intern: bool) -> Self {
        key.to_owned()
    }
}

impl MapKey for Box<str> {
    fn from_key(key: &str, _intern: bool) -> Self {
        Box::from(key)
    }
}

impl MapKey for Arc<str> {
    fn from_key(key: &str, intern_key: bool) -> Self {
        if intern_key { intern(key) } else { Arc::from(key) }
    }
}

// =============================================================================
// Scalars
// =============================================================================

impl Decode for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_string(value)
    }
}

impl Decode for Box<str> {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_string(value).map(String::into_boxed_str)
    }
}

impl Decode for Arc<str> {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_string(value).map(Arc::from)
    }
}

impl Decode for bool {
    fn kind() -> FieldKind {
        FieldKind::Boolean { atomic: false }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_bool(value)
    }
}

impl Decode for AtomicBool {
    fn kind() -> FieldKind {
        FieldKind::Boolean { atomic: true }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_bool(value).map(AtomicBool::new)
    }
}

macro_rules! decode_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Decode for $ty {
            fn kind() -> FieldKind {
                FieldKind::Number { kind: NumberKind::$kind, atomic: false }
            }

            fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
                cx.read_integer(value, NumberKind::$kind)
            }
        }
    )*};
}

decode_integer! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

macro_rules! decode_atomic {
    ($($ty:ty => $inner:ty, $kind:ident),* $(,)?) => {$(
        impl Decode for $ty {
            fn kind() -> FieldKind {
                FieldKind::Number { kind: NumberKind::$kind, atomic: true }
            }

            fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
                cx.read_integer::<$inner>(value, NumberKind::$kind).map(<$ty>::new)
            }
        }
    )*};
}

decode_atomic! {
    AtomicI32 => i32, I32,
    AtomicI64 => i64, I64,
    AtomicU32 => u32, U32,
    AtomicU64 => u64, U64,
    AtomicUsize => usize, Usize,
}

impl Decode for f64 {
    fn kind() -> FieldKind {
        FieldKind::Number { kind: NumberKind::F64, atomic: false }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_float(value)
    }
}

impl Decode for f32 {
    fn kind() -> FieldKind {
        FieldKind::Number { kind: NumberKind::F32, atomic: false }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.read_f32(value)
    }
}

macro_rules! decode_unsupported {
    ($($ty:ty),* $(,)?) => {$(
        impl Decode for $ty {
            fn kind() -> FieldKind {
                FieldKind::Number { kind: NumberKind::Unsupported(stringify!($ty)), atomic: false }
            }

            fn decode(_value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
                cx.unsupported_number(NumberKind::Unsupported(stringify!($ty)))
            }
        }
    )*};
}

decode_unsupported!(i128, u128);

// =============================================================================
// Wrappers
// =============================================================================

impl<T: Decode> Decode for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::kind()))
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        T::decode(value, cx).map(Some)
    }

    fn decode_null(_cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        Ok(None)
    }
}

impl<B: PluginBase + ?Sized> Decode for Box<B> {
    fn kind() -> FieldKind {
        FieldKind::Object(ObjectKind::of::<B>(true))
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_plugin::<B>(value)
    }
}

impl<B: PluginBase + ?Sized> Decode for Arc<B> {
    fn kind() -> FieldKind {
        FieldKind::Object(ObjectKind::of::<B>(true))
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_plugin::<B>(value).map(Arc::from)
    }
}

// =============================================================================
// Arrays and Collections
// =============================================================================

impl<T: Decode> Decode for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::Array(Box::new(T::kind()))
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_array(value)
    }
}

impl<T: Decode> Decode for Box<[T]> {
    fn kind() -> FieldKind {
        FieldKind::Array(Box::new(T::kind()))
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_array(value).map(Vec::into_boxed_slice)
    }
}

macro_rules! decode_collection {
    ($($ty:ident<T $(: $bound:path)?>),* $(,)?) => {$(
        impl<T: Decode $(+ $bound)?> Decode for $ty<T> {
            fn kind() -> FieldKind {
                FieldKind::Collection { element: Box::new(T::kind()) }
            }

            fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
                cx.hydrate_collection::<T, Self>(value)
            }
        }
    )*};
}

decode_collection! {
    VecDeque<T>,
    LinkedList<T>,
    BTreeSet<T: Ord>,
}

impl<T, S> Decode for HashSet<T, S>
where
    T: Decode + Eq + Hash,
    S: BuildHasher + Default,
{
    fn kind() -> FieldKind {
        FieldKind::Collection { element: Box::new(T::kind()) }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_collection::<T, Self>(value)
    }
}

// =============================================================================
// Maps
// =============================================================================

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Decode,
    S: BuildHasher + Default,
{
    fn kind() -> FieldKind {
        FieldKind::Map { value: Box::new(V::kind()) }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_map::<K, V, Self>(value)
    }
}

impl<K, V, S> Decode for IndexMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Decode,
    S: BuildHasher + Default,
{
    fn kind() -> FieldKind {
        FieldKind::Map { value: Box::new(V::kind()) }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_map::<K, V, Self>(value)
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Decode,
{
    fn kind() -> FieldKind {
        FieldKind::Map { value: Box::new(V::kind()) }
    }

    fn decode(value: &Value, cx: &mut Hydrator<'_>) -> DecodeResult<Self> {
        cx.hydrate_map::<K, V, Self>(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::foundation::catalog::ClassCatalog;
    use crate::hydrate::Decoder;
    use rstest::rstest;
    use serde_json::json;

    fn decoder() -> Decoder {
        Decoder::with_catalog(ClassCatalog::global())
    }

    #[test]
    fn test_scalars_and_coercions() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<String>(&json!("abc")).unwrap(), "abc");
        assert_eq!(decoder.decode::<String>(&json!(42)).unwrap(), "42");
        assert!(decoder.decode::<bool>(&json!("on")).unwrap());
        assert_eq!(decoder.decode::<i32>(&json!("17")).unwrap(), 17);
        assert_eq!(decoder.decode::<u8>(&json!(255)).unwrap(), 255);
        assert_eq!(decoder.decode::<i64>(&json!(2.0)).unwrap(), 2);
    }

    #[test]
    fn test_shared_strings_and_slices() {
        let decoder = decoder();
        assert_eq!(&*decoder.decode::<Box<str>>(&json!("boxed")).unwrap(), "boxed");
        assert_eq!(&*decoder.decode::<Arc<str>>(&json!(true)).unwrap(), "true");
        let slice = decoder.decode::<Box<[u16]>>(&json!([4, 5])).unwrap();
        assert_eq!(&*slice, &[4, 5]);
        assert!(<Box<[u16]>>::kind().is_array());
    }

    #[test]
    fn test_float_fidelity() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<f32>(&json!(3.5)).unwrap(), 3.5f32);
        assert_eq!(decoder.decode::<f64>(&json!(0.1)).unwrap(), 0.1);
        assert_eq!(decoder.decode::<f64>(&json!(7)).unwrap(), 7.0);
    }

    #[test]
    fn test_integer_extremes() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<i64>(&json!(i64::MAX)).unwrap(), i64::MAX);
        assert_eq!(decoder.decode::<u64>(&json!(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(decoder.decode::<i64>(&json!(i64::MIN)).unwrap(), i64::MIN);
    }

    #[test]
    fn test_f32_overflow_is_an_error() {
        let decoder = decoder();
        let err = decoder.decode::<f32>(&json!(1e300)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { target: "f32", .. }));
        let err = decoder.decode::<f32>(&json!(-1e300)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { target: "f32", .. }));
        assert_eq!(decoder.decode::<f32>(&json!(f32::MAX as f64)).unwrap(), f32::MAX);
        assert_eq!(decoder.decode::<f32>(&json!(1e-50)).unwrap(), 0.0);
    }

    #[rstest]
    #[case(json!(1.0e19), Some(10_000_000_000_000_000_000))]
    #[case(json!(9.223_372_036_854_775_808e18), Some(9_223_372_036_854_775_808))]
    #[case(json!(0.0), Some(0))]
    #[case(json!(1.8446744073709552e19), None)]
    #[case(json!(-1.0), None)]
    fn test_integral_floats_into_u64(#[case] value: Value, #[case] expected: Option<u64>) {
        let decoded = decoder().decode::<u64>(&value);
        match expected {
            Some(expected) => assert_eq!(decoded.unwrap(), expected),
            None => assert!(matches!(
                decoded.unwrap_err().kind(),
                DecodeErrorKind::NumberOutOfRange { target: "u64", .. }
            )),
        }
    }

    #[test]
    fn test_integral_floats_into_signed() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<i64>(&json!(-4.0e18)).unwrap(), -4_000_000_000_000_000_000);
        assert_eq!(decoder.decode::<i32>(&json!(-2.0)).unwrap(), -2);
        let err = decoder.decode::<i64>(&json!(1.0e19)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { target: "i64", .. }));
        let err = decoder.decode::<i64>(&json!(-1.0e19)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { target: "i64", .. }));
    }

    #[rstest]
    #[case(json!(i64::MAX))]
    #[case(json!(40000))]
    #[case(json!(-40000))]
    fn test_short_overflow_is_an_error(#[case] value: Value) {
        let err = decoder().decode::<i16>(&value).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { target: "i16", .. }));
    }

    #[test]
    fn test_negative_into_unsigned_is_an_error() {
        let err = decoder().decode::<u32>(&json!(-1)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NumberOutOfRange { .. }));
    }

    #[test]
    fn test_fraction_into_integer_is_an_error() {
        let err = decoder().decode::<i32>(&json!(1.5)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NotAnInteger { .. }));
    }

    #[test]
    fn test_unsupported_number() {
        let err = decoder().decode::<i128>(&json!(1)).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::UnsupportedNumber { target: "i128" }));
    }

    #[test]
    fn test_wrong_shapes() {
        let decoder = decoder();
        let err = decoder.decode::<String>(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { expected: "STRING", .. }));
        let err = decoder.decode::<Vec<i32>>(&json!("x")).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { expected: "LIST", .. }));
        let err = decoder.decode::<bool>(&json!("maybe")).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { expected: "BOOLEAN", .. }));
    }

    #[test]
    fn test_atomics() {
        let decoder = decoder();
        let flag = decoder.decode::<AtomicBool>(&json!(true)).unwrap();
        assert!(flag.into_inner());
        let counter = decoder.decode::<AtomicU64>(&json!(9)).unwrap();
        assert_eq!(counter.into_inner(), 9);
    }

    #[test]
    fn test_arrays_and_nulls() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<Vec<i32>>(&json!([1, 2, 3])).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            decoder.decode::<Vec<Option<i32>>>(&json!([1, null])).unwrap(),
            vec![Some(1), None]
        );
        let err = decoder.decode::<Vec<i32>>(&json!([1, null])).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::NullElement));
        assert_eq!(err.path(), "[1]");
    }

    #[test]
    fn test_collections() {
        let decoder = decoder();
        let set = decoder.decode::<BTreeSet<String>>(&json!(["b", "a", "b"])).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        let deque = decoder.decode::<VecDeque<Vec<u8>>>(&json!([[1], [2, 3]])).unwrap();
        assert_eq!(deque, VecDeque::from(vec![vec![1], vec![2, 3]]));
        let hashed = decoder.decode::<HashSet<i32>>(&json!([1, 1, 2])).unwrap();
        assert_eq!(hashed.len(), 2);
    }

    #[test]
    fn test_collection_of_arrays_errors() {
        let decoder = decoder();
        let err = decoder.decode::<VecDeque<Vec<u8>>>(&json!([[1], [2, "x"]])).unwrap_err();
        assert_eq!(err.path(), "[1][1]");

        let err = decoder.decode::<LinkedList<Vec<u8>>>(&json!([[1], 2])).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { expected: "LIST", .. }));
        assert_eq!(err.path(), "[1]");

        let err = decoder.decode::<BTreeSet<i32>>(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::WrongType { expected: "LIST", .. }));
    }

    #[test]
    fn test_maps() {
        let decoder = decoder();
        let map = decoder
            .decode::<BTreeMap<String, Vec<i32>>>(&json!({"a": [1], "b": [2, 3]}))
            .unwrap();
        assert_eq!(map["b"], vec![2, 3]);

        let ordered = decoder.decode::<IndexMap<Box<str>, u8>>(&json!({"z": 1, "y": 2})).unwrap();
        assert_eq!(ordered.keys().map(|key| &**key).collect::<Vec<_>>(), vec!["z", "y"]);

        let err = decoder.decode::<HashMap<String, i32>>(&json!({"a": "x"})).unwrap_err();
        assert_eq!(err.path(), "a");
    }

    #[test]
    fn test_empty_collection_is_present() {
        let decoder = decoder();
        let empty = decoder.decode::<Option<Vec<i32>>>(&json!([])).unwrap();
        assert_eq!(empty, Some(Vec::new()));
        assert_eq!(decoder.decode::<Option<Vec<i32>>>(&json!(null)).unwrap(), None);
    }

    #[test]
    fn test_kinds() {
        assert!(<Vec<String>>::kind().is_array());
        assert!(!<HashSet<String>>::kind().is_array());
        assert_eq!(
            <Option<u16>>::kind(),
            FieldKind::Optional(Box::new(FieldKind::Number { kind: NumberKind::U16, atomic: false }))
        );
    }
}
