use serde_core::ser::{SerializeMap, SerializeSeq};
use serde_core::{Serialize, Serializer};

use sf_model::value::{Inspect, InspectRef};

// -----------------------------------------------------------------------------
// InspectSerializer

/// Serde emission of any introspected value.
///
/// Structs emit as maps of their members, sequences as serde sequences,
/// dictionaries as pair sequences (the representation that supports
/// arbitrary keys; the configuration-aware keyed-object path lives in
/// [`serialize_dictionary`](crate::dictionary::serialize_dictionary)).
/// Opaque leaves delegate to their own erased `serde` implementation.
///
/// # Examples
///
/// ```
/// use sf_codec::InspectSerializer;
/// use sf_model::value::{DynamicScalar, Scalar};
///
/// let value = DynamicScalar::of(Scalar::Signed(60));
/// let json = serde_json::to_string(&InspectSerializer(&value)).unwrap();
/// assert_eq!(json, "60");
/// ```
pub struct InspectSerializer<'a>(pub &'a dyn Inspect);

impl Serialize for InspectSerializer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.inspect_ref() {
            InspectRef::Scalar(scalar) => scalar.serialize(serializer),
            InspectRef::Null => serializer.serialize_none(),
            InspectRef::Struct(view) => {
                let mut map = serializer.serialize_map(None)?;
                for (name, value) in view.members() {
                    map.serialize_entry(name, &InspectSerializer(value))?;
                }
                map.end()
            }
            InspectRef::Sequence(view) => {
                let mut seq = serializer.serialize_seq(Some(view.len()))?;
                for element in view.iter() {
                    seq.serialize_element(&InspectSerializer(element))?;
                }
                seq.end()
            }
            InspectRef::Map(view) => {
                let mut seq = serializer.serialize_seq(Some(view.len()))?;
                for (key, value) in view.iter() {
                    seq.serialize_element(&KeyValuePair { key, value })?;
                }
                seq.end()
            }
            InspectRef::Opaque(view) => erased_serde::serialize(view.as_serialize(), serializer),
        }
    }
}

// -----------------------------------------------------------------------------
// KeyValuePair

/// One `{key, value}` entry of a pair-sequence dictionary.
pub(crate) struct KeyValuePair<'a> {
    pub key: &'a dyn Inspect,
    pub value: &'a dyn Inspect,
}

impl Serialize for KeyValuePair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("key", &InspectSerializer(self.key))?;
        map.serialize_entry("value", &InspectSerializer(self.value))?;
        map.end()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::ToString;

    use serde::Serialize;

    use sf_model::descriptor::{TypeDescriptor, TypeKind};
    use sf_model::value::{
        DynamicMap, DynamicNull, DynamicScalar, DynamicSequence, DynamicStruct, Inspect,
        InspectRef, OpaqueView, Scalar,
    };

    use super::InspectSerializer;

    #[test]
    fn structs_emit_as_member_maps() {
        let led = DynamicStruct::new(TypeDescriptor::new(TypeKind::Struct, "lighting::Led"))
            .with_member("watts", Box::new(DynamicScalar::of(Scalar::Signed(60))))
            .with_member(
                "label",
                Box::new(DynamicScalar::of(Scalar::Text("desk".to_string()))),
            );
        let json = serde_json::to_string(&InspectSerializer(&led)).unwrap();
        assert_eq!(json, r#"{"watts":60,"label":"desk"}"#);
    }

    #[test]
    fn sequences_and_nulls() {
        let seq = DynamicSequence::new(TypeDescriptor::sequence_of(TypeDescriptor::nullable_of(
            TypeDescriptor::signed(),
        )))
        .with_item(Box::new(DynamicScalar::of(Scalar::Signed(1))))
        .with_item(Box::new(DynamicNull::new(TypeDescriptor::nullable_of(
            TypeDescriptor::signed(),
        ))));
        let json = serde_json::to_string(&InspectSerializer(&seq)).unwrap();
        assert_eq!(json, "[1,null]");
    }

    #[test]
    fn maps_default_to_pair_sequences() {
        let map = DynamicMap::new(TypeDescriptor::dictionary_of(
            TypeDescriptor::signed(),
            TypeDescriptor::text(),
        ))
        .with_entry(
            Box::new(DynamicScalar::of(Scalar::Signed(2))),
            Box::new(DynamicScalar::of(Scalar::Text("two".to_string()))),
        );
        let json = serde_json::to_string(&InspectSerializer(&map)).unwrap();
        assert_eq!(json, r#"[{"key":2,"value":"two"}]"#);
    }

    #[test]
    fn opaque_leaves_use_their_own_serde() {
        #[derive(Serialize)]
        struct Raw {
            r: u8,
            g: u8,
            b: u8,
        }

        struct Color(Raw);

        impl OpaqueView for Color {
            fn as_serialize(&self) -> &dyn erased_serde::Serialize {
                &self.0
            }
        }

        impl Inspect for Color {
            fn descriptor(&self) -> TypeDescriptor {
                TypeDescriptor::new(TypeKind::Struct, "paint::Color")
            }

            fn inspect_ref(&self) -> InspectRef<'_> {
                InspectRef::Opaque(self)
            }
        }

        let color = Color(Raw { r: 1, g: 2, b: 3 });
        let json = serde_json::to_string(&InspectSerializer(&color)).unwrap();
        assert_eq!(json, r#"{"r":1,"g":2,"b":3}"#);
    }
}
