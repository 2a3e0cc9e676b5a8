use alloc::boxed::Box;
use alloc::string::String;

use serde_core::ser::{Error as _, SerializeMap, SerializeSeq};
use serde_core::Serializer;

use sf_model::descriptor::TypeDescriptor;
use sf_model::key::DictionaryKeyError;
use sf_model::value::{Inspect, MapView};
use sf_registry::compose::ComposedConfiguration;

use crate::ser::{InspectSerializer, KeyValuePair};
use crate::string_codec;

// -----------------------------------------------------------------------------
// DictionaryRepresentation

/// The wire shape of one dictionary occurrence.
///
/// Chosen once per occurrence, deterministically from the static key type —
/// never from runtime values — so that producer and consumer agree without
/// seeing each other's data first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryRepresentation {
    /// An object whose property names are the encoded key strings. Compact,
    /// but requires every key to encode to a non-blank string.
    KeyedObject,
    /// An ordered sequence of `{key, value}` pairs. Supports arbitrary
    /// (including complex-object) keys and null values without ambiguity.
    PairSequence,
}

// -----------------------------------------------------------------------------
// DictionaryKeyCodec

/// Key⇄string conversion against one composed configuration.
///
/// Built-in-encodable key types (scalars, enums) stringify canonically;
/// other types need a [`KeyStringCodec`](sf_model::key::KeyStringCodec)
/// registered with their registration request. A type with neither forces
/// the dictionary into the pair-sequence representation.
///
/// Distinct keys encoding to the same string are not detected here; the
/// producer of the keys owns that invariant.
pub struct DictionaryKeyCodec<'a> {
    config: &'a ComposedConfiguration,
}

impl<'a> DictionaryKeyCodec<'a> {
    /// Create a codec over one composed configuration.
    pub fn new(config: &'a ComposedConfiguration) -> Self {
        Self { config }
    }

    /// Whether `key_type` has any viable string encoding.
    pub fn has_string_encoding(&self, key_type: &TypeDescriptor) -> bool {
        string_codec::has_builtin_encoding(key_type)
            || self.config.key_codec_for(key_type).is_some()
    }

    /// The representation a dictionary keyed by `key_type` uses.
    pub fn representation(&self, key_type: &TypeDescriptor) -> DictionaryRepresentation {
        if self.config.compact_dictionaries() && self.has_string_encoding(key_type) {
            DictionaryRepresentation::KeyedObject
        } else {
            DictionaryRepresentation::PairSequence
        }
    }

    /// Encode one key to its string form.
    ///
    /// Fails with [`DictionaryKeyError::BlankKey`] when the produced string
    /// is empty or whitespace-only: in a keyed object such a key would
    /// silently merge or drop entries.
    pub fn encode_key(
        &self,
        key: &dyn Inspect,
        key_type: &TypeDescriptor,
    ) -> Result<String, DictionaryKeyError> {
        let raw = if string_codec::has_builtin_encoding(key_type) {
            string_codec::encode_builtin(key, key_type)?
        } else {
            match self.config.key_codec_for(key_type) {
                Some(codec) => codec.encode(key)?,
                None => {
                    return Err(DictionaryKeyError::NotEncodable {
                        key_type: key_type.clone(),
                    });
                }
            }
        };
        if raw.trim().is_empty() {
            return Err(DictionaryKeyError::BlankKey {
                key_type: key_type.clone(),
            });
        }
        Ok(raw)
    }

    /// Decode one key from its string form.
    pub fn decode_key(
        &self,
        raw: &str,
        key_type: &TypeDescriptor,
    ) -> Result<Box<dyn Inspect>, DictionaryKeyError> {
        if string_codec::has_builtin_encoding(key_type) {
            return string_codec::decode_builtin(raw, key_type);
        }
        match self.config.key_codec_for(key_type) {
            Some(codec) => codec.decode(raw),
            None => Err(DictionaryKeyError::NotEncodable {
                key_type: key_type.clone(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Serialization

/// Serialize a dictionary in the representation its static key type earns.
///
/// Key-encoding failures (including blank keys) surface through the
/// serializer's error type.
pub fn serialize_dictionary<S: Serializer>(
    codec: &DictionaryKeyCodec<'_>,
    view: &dyn MapView,
    key_type: &TypeDescriptor,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match codec.representation(key_type) {
        DictionaryRepresentation::KeyedObject => {
            let mut map = serializer.serialize_map(Some(view.len()))?;
            for (key, value) in view.iter() {
                let raw = codec.encode_key(key, key_type).map_err(S::Error::custom)?;
                map.serialize_entry(&raw, &InspectSerializer(value))?;
            }
            map.end()
        }
        DictionaryRepresentation::PairSequence => {
            let mut seq = serializer.serialize_seq(Some(view.len()))?;
            for (key, value) in view.iter() {
                seq.serialize_element(&KeyValuePair { key, value })?;
            }
            seq.end()
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::{String, ToString};
    use alloc::sync::Arc;

    use sf_model::catalog::TypeCatalog;
    use sf_model::descriptor::{TypeDescriptor, TypeKind};
    use sf_model::key::{DictionaryKeyError, FnKeyCodec};
    use sf_model::manifest::{MemberInfo, TypeManifest};
    use sf_model::value::{
        DynamicMap, DynamicScalar, DynamicStruct, Inspect, InspectRef, Scalar,
    };
    use sf_registry::compose::{
        CodecFamily, ComposedConfiguration, ConfigurationDefinition, ConfigurationId,
        ConfigurationStore,
    };
    use sf_registry::request::TypeToRegister;

    use super::{DictionaryKeyCodec, DictionaryRepresentation, serialize_dictionary};

    fn badge() -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::Struct, "access::Badge")
    }

    fn badge_value(number: i64) -> DynamicStruct {
        DynamicStruct::new(badge())
            .with_member("number", Box::new(DynamicScalar::of(Scalar::Signed(number))))
    }

    fn encode_badge(key: &dyn Inspect) -> Result<String, DictionaryKeyError> {
        let InspectRef::Struct(view) = key.inspect_ref() else {
            return Err(DictionaryKeyError::NotEncodable { key_type: badge() });
        };
        let Some(number) = view.member("number") else {
            return Err(DictionaryKeyError::NotEncodable { key_type: badge() });
        };
        match number.inspect_ref() {
            InspectRef::Scalar(Scalar::Signed(0)) => Ok("  ".to_string()),
            InspectRef::Scalar(Scalar::Signed(n)) => Ok(alloc::format!("badge-{n}")),
            _ => Err(DictionaryKeyError::NotEncodable { key_type: badge() }),
        }
    }

    fn decode_badge(raw: &str) -> Result<Box<dyn Inspect>, DictionaryKeyError> {
        let number = raw
            .strip_prefix("badge-")
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| DictionaryKeyError::Malformed {
                key_type: badge(),
                raw: raw.into(),
            })?;
        Ok(Box::new(badge_value(number)))
    }

    fn composed(compact: bool) -> (ConfigurationStore, Arc<ComposedConfiguration>) {
        let mut catalog = TypeCatalog::new();
        catalog.add(
            TypeManifest::builder(badge())
                .member(MemberInfo::new("number", TypeDescriptor::signed()))
                .finish(),
        );
        catalog.add(TypeManifest::builder(TypeDescriptor::new(TypeKind::Struct, "access::Door")).finish());

        let store = ConfigurationStore::new(Arc::new(catalog));
        store.define(
            ConfigurationDefinition::new(ConfigurationId::new("access"), CodecFamily::Json)
                .compact_dictionaries(compact)
                .register(
                    TypeToRegister::originating(badge())
                        .with_key_codec(Arc::new(FnKeyCodec::new(encode_badge, decode_badge))),
                )
                .register(TypeToRegister::originating(TypeDescriptor::new(
                    TypeKind::Struct,
                    "access::Door",
                ))),
        );
        let config = store.compose(&ConfigurationId::new("access")).unwrap();
        (store, config)
    }

    #[test]
    fn representation_is_decided_by_the_static_key_type() {
        let (_store, config) = composed(true);
        let codec = DictionaryKeyCodec::new(&config);

        assert_eq!(
            codec.representation(&TypeDescriptor::text()),
            DictionaryRepresentation::KeyedObject
        );
        assert_eq!(
            codec.representation(&badge()),
            DictionaryRepresentation::KeyedObject
        );
        // Registered, but no codec and no built-in form.
        assert_eq!(
            codec.representation(&TypeDescriptor::new(TypeKind::Struct, "access::Door")),
            DictionaryRepresentation::PairSequence
        );

        // Without compact mode everything is a pair sequence.
        let (_store, plain) = composed(false);
        let codec = DictionaryKeyCodec::new(&plain);
        assert_eq!(
            codec.representation(&TypeDescriptor::text()),
            DictionaryRepresentation::PairSequence
        );
    }

    #[test]
    fn custom_codec_round_trip() {
        let (_store, config) = composed(true);
        let codec = DictionaryKeyCodec::new(&config);

        let raw = codec.encode_key(&badge_value(41), &badge()).unwrap();
        assert_eq!(raw, "badge-41");

        let decoded = codec.decode_key(&raw, &badge()).unwrap();
        let InspectRef::Struct(view) = decoded.inspect_ref() else {
            panic!("badge keys decode to structs");
        };
        match view.member("number").unwrap().inspect_ref() {
            InspectRef::Scalar(Scalar::Signed(41)) => {}
            other => panic!("unexpected member: {other:?}"),
        }
    }

    #[test]
    fn blank_keys_fail_at_encode_time() {
        let (_store, config) = composed(true);
        let codec = DictionaryKeyCodec::new(&config);

        // Badge zero encodes to whitespace; the guard catches it before it
        // can merge entries in a keyed object.
        let result = codec.encode_key(&badge_value(0), &badge());
        assert!(matches!(result, Err(DictionaryKeyError::BlankKey { .. })));

        let result = codec.encode_key(
            &DynamicScalar::of(Scalar::Text(String::new())),
            &TypeDescriptor::text(),
        );
        assert!(matches!(result, Err(DictionaryKeyError::BlankKey { .. })));
    }

    #[test]
    fn keyed_object_emission() {
        let (_store, config) = composed(true);
        let codec = DictionaryKeyCodec::new(&config);

        let dict = DynamicMap::new(TypeDescriptor::dictionary_of(
            TypeDescriptor::signed(),
            TypeDescriptor::text(),
        ))
        .with_entry(
            Box::new(DynamicScalar::of(Scalar::Signed(2))),
            Box::new(DynamicScalar::of(Scalar::Text("two".to_string()))),
        )
        .with_entry(
            Box::new(DynamicScalar::of(Scalar::Signed(3))),
            Box::new(DynamicScalar::of(Scalar::Text("three".to_string()))),
        );

        let mut out = alloc::vec::Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut out);
        serialize_dictionary(&codec, &dict, &TypeDescriptor::signed(), &mut serializer).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"2":"two","3":"three"}"#
        );
    }

    #[test]
    fn unencodable_keys_fall_back_to_pair_sequences() {
        let (_store, config) = composed(true);
        let codec = DictionaryKeyCodec::new(&config);
        let door = TypeDescriptor::new(TypeKind::Struct, "access::Door");

        let dict = DynamicMap::new(TypeDescriptor::dictionary_of(
            door.clone(),
            TypeDescriptor::text(),
        ))
        .with_entry(
            Box::new(DynamicStruct::new(door.clone())),
            Box::new(DynamicScalar::of(Scalar::Text("front".to_string()))),
        );

        let mut out = alloc::vec::Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut out);
        serialize_dictionary(&codec, &dict, &door, &mut serializer).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"[{"key":{},"value":"front"}]"#
        );
    }
}
