use alloc::boxed::Box;
use alloc::string::String;
use core::{error, fmt};

use crate::descriptor::TypeDescriptor;
use crate::value::Inspect;

// -----------------------------------------------------------------------------
// DictionaryKeyError

/// An error converting a dictionary key to or from its string form.
#[derive(Debug, Clone)]
pub enum DictionaryKeyError {
    /// The key encoded to an empty or whitespace-only string. Such a key
    /// would silently merge or drop entries in a keyed-object payload.
    BlankKey { key_type: TypeDescriptor },
    /// The key type has no built-in string form and no registered codec.
    NotEncodable { key_type: TypeDescriptor },
    /// The string form could not be decoded back into a key.
    Malformed {
        key_type: TypeDescriptor,
        raw: String,
    },
}

impl fmt::Display for DictionaryKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankKey { key_type } => {
                write!(
                    f,
                    "dictionary key of type `{key_type}` serialized to a null or whitespace string"
                )
            }
            Self::NotEncodable { key_type } => {
                write!(
                    f,
                    "type `{key_type}` has no string form and cannot key a compact dictionary"
                )
            }
            Self::Malformed { key_type, raw } => {
                write!(f, "cannot decode `{raw}` as a dictionary key of type `{key_type}`")
            }
        }
    }
}

impl error::Error for DictionaryKeyError {}

// -----------------------------------------------------------------------------
// KeyStringCodec

/// Per-type key⇄string conversion capability.
///
/// A codec is registered alongside a type's registration request and lets
/// values of that type key a compact ("keyed object") dictionary. Types
/// without one fall back to the pair-sequence dictionary shape unless they
/// have a built-in string form.
///
/// Implementations must be total inverses over the values they accept:
/// `decode(encode(k))` reproduces `k`.
pub trait KeyStringCodec: Send + Sync {
    /// Encode a key value to its string form.
    fn encode(&self, key: &dyn Inspect) -> Result<String, DictionaryKeyError>;

    /// Decode a string form back into a key value.
    fn decode(&self, raw: &str) -> Result<Box<dyn Inspect>, DictionaryKeyError>;
}

// -----------------------------------------------------------------------------
// FnKeyCodec

/// A [`KeyStringCodec`] built from two function pointers.
///
/// The conversion functions are type specific even though the codec itself
/// carries no type flag; pairing a codec with the wrong key type is a
/// configuration mistake surfaced by the functions' own errors.
pub struct FnKeyCodec {
    encode: fn(&dyn Inspect) -> Result<String, DictionaryKeyError>,
    decode: fn(&str) -> Result<Box<dyn Inspect>, DictionaryKeyError>,
}

impl FnKeyCodec {
    /// Create a codec from an encode and a decode function.
    pub fn new(
        encode: fn(&dyn Inspect) -> Result<String, DictionaryKeyError>,
        decode: fn(&str) -> Result<Box<dyn Inspect>, DictionaryKeyError>,
    ) -> Self {
        Self { encode, decode }
    }
}

impl KeyStringCodec for FnKeyCodec {
    #[inline]
    fn encode(&self, key: &dyn Inspect) -> Result<String, DictionaryKeyError> {
        (self.encode)(key)
    }

    #[inline]
    fn decode(&self, raw: &str) -> Result<Box<dyn Inspect>, DictionaryKeyError> {
        (self.decode)(raw)
    }
}
