use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde_core::{Serialize, Serializer};

use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::hash::HashMap;

// -----------------------------------------------------------------------------
// Scalar

/// A restricted scalar value.
///
/// Date/time and UUID values are carried in their canonical string forms
/// (ISO-8601 and hyphenated-hex respectively); the kind is preserved so that
/// key encoding and validation can distinguish them from plain text.
///
/// Runtime enum values are represented as a [`Scalar::Text`] holding the
/// variant name, paired with the enum's descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Unit,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    DateTime(String),
    Uuid(String),
}

impl Scalar {
    /// The [`TypeKind`] this scalar corresponds to.
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Unit => TypeKind::Unit,
            Self::Bool(_) => TypeKind::Bool,
            Self::Signed(_) => TypeKind::Signed,
            Self::Unsigned(_) => TypeKind::Unsigned,
            Self::Float(_) => TypeKind::Float,
            Self::Text(_) => TypeKind::Text,
            Self::DateTime(_) => TypeKind::DateTime,
            Self::Uuid(_) => TypeKind::Uuid,
        }
    }

    /// The built-in canonical string form, used for dictionary keys.
    ///
    /// `Unit` has no string form and returns `None`.
    pub fn canonical_string(&self) -> Option<String> {
        match self {
            Self::Unit => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Signed(value) => Some(value.to_string()),
            Self::Unsigned(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) | Self::DateTime(value) | Self::Uuid(value) => {
                Some(value.clone())
            }
        }
    }

    /// The descriptor of the scalar's own kind.
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Unit => TypeDescriptor::unit(),
            Self::Bool(_) => TypeDescriptor::boolean(),
            Self::Signed(_) => TypeDescriptor::signed(),
            Self::Unsigned(_) => TypeDescriptor::unsigned(),
            Self::Float(_) => TypeDescriptor::float(),
            Self::Text(_) => TypeDescriptor::text(),
            Self::DateTime(_) => TypeDescriptor::date_time(),
            Self::Uuid(_) => TypeDescriptor::uuid(),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unit => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Signed(value) => serializer.serialize_i64(*value),
            Self::Unsigned(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) | Self::DateTime(value) | Self::Uuid(value) => {
                serializer.serialize_str(value)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Inspect

/// Runtime value introspection.
///
/// `Inspect` is the statically-generated stand-in for runtime reflection: it
/// exposes a value's runtime [`TypeDescriptor`] and a structural view of its
/// contents. The validation walker reads member values through it during
/// serialize-direction checks, and dictionary key encoding reads key values
/// through it.
///
/// Domain types implement this by hand or through generated code; the
/// `Dynamic*` containers in this module implement it for values assembled at
/// runtime (decode results, tests).
pub trait Inspect {
    /// The value's runtime type.
    fn descriptor(&self) -> TypeDescriptor;

    /// A structural view of the value.
    fn inspect_ref(&self) -> InspectRef<'_>;
}

/// A structural view over an inspected value.
pub enum InspectRef<'a> {
    /// A restricted scalar.
    Scalar(Scalar),
    /// An absent nullable payload.
    Null,
    /// A value with named members.
    Struct(&'a dyn StructView),
    /// An ordered sequence or array.
    Sequence(&'a dyn SequenceView),
    /// A keyed dictionary.
    Map(&'a dyn MapView),
    /// A leaf the core does not look into; serialized through `serde`.
    Opaque(&'a dyn OpaqueView),
}

impl fmt::Debug for InspectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "Scalar({scalar:?})"),
            Self::Null => f.pad("Null"),
            Self::Struct(_) => f.pad("Struct"),
            Self::Sequence(_) => f.pad("Sequence"),
            Self::Map(_) => f.pad("Map"),
            Self::Opaque(_) => f.pad("Opaque"),
        }
    }
}

/// Named-member access for [`InspectRef::Struct`] values.
pub trait StructView {
    /// The member value for `name`, if the member exists.
    fn member(&self, name: &str) -> Option<&dyn Inspect>;

    /// All members, in declaration order.
    fn members(&self) -> Box<dyn Iterator<Item = (&str, &dyn Inspect)> + '_>;
}

/// Element access for [`InspectRef::Sequence`] values.
pub trait SequenceView {
    /// The number of elements.
    fn len(&self) -> usize;

    /// Whether the sequence contains no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All elements in order.
    fn iter(&self) -> Box<dyn Iterator<Item = &dyn Inspect> + '_>;
}

/// Entry access for [`InspectRef::Map`] values.
pub trait MapView {
    /// The number of entries.
    fn len(&self) -> usize;

    /// Whether the map contains no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in producer order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Inspect, &dyn Inspect)> + '_>;
}

/// Serde passthrough for [`InspectRef::Opaque`] leaves.
pub trait OpaqueView {
    /// The erased `serde` serialization of the leaf value.
    fn as_serialize(&self) -> &dyn erased_serde::Serialize;
}

// -----------------------------------------------------------------------------
// DynamicScalar

/// A runtime scalar paired with an explicit descriptor.
///
/// The descriptor usually matches the scalar's own kind, but may be a
/// user-defined enum descriptor whose value is the variant name.
pub struct DynamicScalar {
    descriptor: TypeDescriptor,
    value: Scalar,
}

impl DynamicScalar {
    /// Create a scalar value with an explicit runtime descriptor.
    pub fn new(descriptor: TypeDescriptor, value: Scalar) -> Self {
        Self { descriptor, value }
    }

    /// Create a scalar value described by its own kind.
    pub fn of(value: Scalar) -> Self {
        Self {
            descriptor: value.descriptor(),
            value,
        }
    }

    /// The wrapped scalar.
    #[inline]
    pub fn value(&self) -> &Scalar {
        &self.value
    }
}

impl Inspect for DynamicScalar {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor.clone()
    }

    fn inspect_ref(&self) -> InspectRef<'_> {
        InspectRef::Scalar(self.value.clone())
    }
}

// -----------------------------------------------------------------------------
// DynamicNull

/// An absent nullable payload with a declared descriptor.
pub struct DynamicNull {
    descriptor: TypeDescriptor,
}

impl DynamicNull {
    /// Create a null value declared as `descriptor`.
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Inspect for DynamicNull {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor.clone()
    }

    fn inspect_ref(&self) -> InspectRef<'_> {
        InspectRef::Null
    }
}

// -----------------------------------------------------------------------------
// DynamicStruct

/// A struct value assembled at runtime.
pub struct DynamicStruct {
    descriptor: TypeDescriptor,
    members: Vec<(Cow<'static, str>, Box<dyn Inspect>)>,
    index: HashMap<Cow<'static, str>, usize>,
}

impl DynamicStruct {
    /// Create an empty struct representing `descriptor`.
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            members: Vec::new(),
            index: HashMap::default(),
        }
    }

    /// Insert a member value, replacing and returning any previous one.
    pub fn insert(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: Box<dyn Inspect>,
    ) -> Option<Box<dyn Inspect>> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => Some(core::mem::replace(&mut self.members[slot].1, value)),
            None => {
                self.index.insert(name.clone(), self.members.len());
                self.members.push((name, value));
                None
            }
        }
    }

    /// Builder-style [`insert`](DynamicStruct::insert).
    pub fn with_member(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: Box<dyn Inspect>,
    ) -> Self {
        self.insert(name, value);
        self
    }
}

impl Inspect for DynamicStruct {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor.clone()
    }

    fn inspect_ref(&self) -> InspectRef<'_> {
        InspectRef::Struct(self)
    }
}

impl StructView for DynamicStruct {
    fn member(&self, name: &str) -> Option<&dyn Inspect> {
        self.index
            .get(name)
            .map(|&slot| self.members[slot].1.as_ref())
    }

    fn members(&self) -> Box<dyn Iterator<Item = (&str, &dyn Inspect)> + '_> {
        Box::new(
            self.members
                .iter()
                .map(|(name, value)| (name.as_ref(), value.as_ref())),
        )
    }
}

// -----------------------------------------------------------------------------
// DynamicSequence

/// A sequence value assembled at runtime.
pub struct DynamicSequence {
    descriptor: TypeDescriptor,
    items: Vec<Box<dyn Inspect>>,
}

impl DynamicSequence {
    /// Create an empty sequence representing `descriptor`.
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            items: Vec::new(),
        }
    }

    /// Append an element.
    pub fn push(&mut self, value: Box<dyn Inspect>) {
        self.items.push(value);
    }

    /// Builder-style [`push`](DynamicSequence::push).
    pub fn with_item(mut self, value: Box<dyn Inspect>) -> Self {
        self.push(value);
        self
    }
}

impl Inspect for DynamicSequence {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor.clone()
    }

    fn inspect_ref(&self) -> InspectRef<'_> {
        InspectRef::Sequence(self)
    }
}

impl SequenceView for DynamicSequence {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &dyn Inspect> + '_> {
        Box::new(self.items.iter().map(Box::as_ref))
    }
}

// -----------------------------------------------------------------------------
// DynamicMap

/// A dictionary value assembled at runtime.
///
/// Entries keep insertion order; whether two entries share a key is the
/// producer's concern, matching the pair-sequence wire shape.
pub struct DynamicMap {
    descriptor: TypeDescriptor,
    entries: Vec<(Box<dyn Inspect>, Box<dyn Inspect>)>,
}

impl DynamicMap {
    /// Create an empty dictionary representing `descriptor`.
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    pub fn insert(&mut self, key: Box<dyn Inspect>, value: Box<dyn Inspect>) {
        self.entries.push((key, value));
    }

    /// Builder-style [`insert`](DynamicMap::insert).
    pub fn with_entry(mut self, key: Box<dyn Inspect>, value: Box<dyn Inspect>) -> Self {
        self.insert(key, value);
        self
    }
}

impl Inspect for DynamicMap {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor.clone()
    }

    fn inspect_ref(&self) -> InspectRef<'_> {
        InspectRef::Map(self)
    }
}

impl MapView for DynamicMap {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Inspect, &dyn Inspect)> + '_> {
        Box::new(
            self.entries
                .iter()
                .map(|(key, value)| (key.as_ref(), value.as_ref())),
        )
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::ToString;

    use crate::descriptor::{TypeDescriptor, TypeKind};

    use super::{DynamicScalar, DynamicStruct, Inspect, InspectRef, Scalar, StructView};

    #[test]
    fn canonical_strings() {
        assert_eq!(Scalar::Bool(true).canonical_string().unwrap(), "true");
        assert_eq!(Scalar::Signed(-41).canonical_string().unwrap(), "-41");
        assert_eq!(Scalar::Unit.canonical_string(), None);
        assert_eq!(
            Scalar::DateTime("2023-04-05T06:07:08Z".to_string())
                .canonical_string()
                .unwrap(),
            "2023-04-05T06:07:08Z"
        );
    }

    #[test]
    fn scalar_serializes_to_json() {
        let json = serde_json::to_string(&Scalar::Signed(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&Scalar::Text("hi".to_string())).unwrap();
        assert_eq!(json, "\"hi\"");
    }

    #[test]
    fn dynamic_struct_replaces_members() {
        let mut value = DynamicStruct::new(TypeDescriptor::new(TypeKind::Struct, "a::B"));
        assert!(
            value
                .insert("x", Box::new(DynamicScalar::of(Scalar::Signed(1))))
                .is_none()
        );
        assert!(
            value
                .insert("x", Box::new(DynamicScalar::of(Scalar::Signed(2))))
                .is_some()
        );

        let member = value.member("x").unwrap();
        match member.inspect_ref() {
            InspectRef::Scalar(Scalar::Signed(2)) => {}
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(value.members().count(), 1);
    }

    #[test]
    fn enum_values_carry_their_descriptor() {
        let mode = TypeDescriptor::new(TypeKind::Enum, "lighting::Mode");
        let value = DynamicScalar::new(mode.clone(), Scalar::Text("Dimmed".to_string()));
        assert_eq!(value.descriptor(), mode);
    }
}
