//! Built-in canonical key⇄string conversions.
//!
//! Scalar key types and enums stringify without a registered codec: booleans
//! and numbers use their decimal forms, date/times and UUIDs pass their
//! canonical string payloads through, enum values use their variant name.

use alloc::boxed::Box;
use alloc::string::String;

use sf_model::descriptor::{TypeDescriptor, TypeKind};
use sf_model::key::DictionaryKeyError;
use sf_model::value::{DynamicScalar, Inspect, InspectRef, Scalar};

/// Whether `key_type` stringifies without a registered codec.
pub fn has_builtin_encoding(key_type: &TypeDescriptor) -> bool {
    matches!(
        key_type.kind(),
        TypeKind::Text
            | TypeKind::Bool
            | TypeKind::Signed
            | TypeKind::Unsigned
            | TypeKind::Float
            | TypeKind::DateTime
            | TypeKind::Uuid
            | TypeKind::Enum
    )
}

/// Encode a key of a built-in-encodable type.
pub fn encode_builtin(
    key: &dyn Inspect,
    key_type: &TypeDescriptor,
) -> Result<String, DictionaryKeyError> {
    match key.inspect_ref() {
        InspectRef::Scalar(scalar) => {
            scalar
                .canonical_string()
                .ok_or_else(|| DictionaryKeyError::NotEncodable {
                    key_type: key_type.clone(),
                })
        }
        _ => Err(DictionaryKeyError::NotEncodable {
            key_type: key_type.clone(),
        }),
    }
}

/// Decode the string form of a key of a built-in-encodable type.
pub fn decode_builtin(
    raw: &str,
    key_type: &TypeDescriptor,
) -> Result<Box<dyn Inspect>, DictionaryKeyError> {
    let malformed = || DictionaryKeyError::Malformed {
        key_type: key_type.clone(),
        raw: raw.into(),
    };
    let scalar = match key_type.kind() {
        TypeKind::Text => Scalar::Text(raw.into()),
        TypeKind::Bool => Scalar::Bool(raw.parse().map_err(|_| malformed())?),
        TypeKind::Signed => Scalar::Signed(raw.parse().map_err(|_| malformed())?),
        TypeKind::Unsigned => Scalar::Unsigned(raw.parse().map_err(|_| malformed())?),
        TypeKind::Float => Scalar::Float(raw.parse().map_err(|_| malformed())?),
        TypeKind::DateTime => Scalar::DateTime(raw.into()),
        TypeKind::Uuid => Scalar::Uuid(raw.into()),
        // The variant name is the canonical form.
        TypeKind::Enum => Scalar::Text(raw.into()),
        _ => {
            return Err(DictionaryKeyError::NotEncodable {
                key_type: key_type.clone(),
            });
        }
    };
    Ok(Box::new(DynamicScalar::new(key_type.clone(), scalar)))
}

// -----------------------------------------------------------------------------
// Tests
