use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::{error, fmt};

use sf_model::descriptor::TypeDescriptor;
use sf_model::value::Inspect;
use sf_registry::compose::{
    CodecFamily, ComposedConfiguration, ConfigurationId, ConfigurationStore,
};
use sf_registry::error::{ConfigurationError, UnregisteredTypeError};
use sf_registry::walk::{Direction, ValidationWalker};

// -----------------------------------------------------------------------------
// CodecError

/// An error reported by the byte codec backend.
#[derive(Debug, Clone)]
pub struct CodecError {
    message: Cow<'static, str>,
}

impl CodecError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl error::Error for CodecError {}

// -----------------------------------------------------------------------------
// CodecBackend

/// The pluggable byte codec the core drives but does not implement.
///
/// Implementations own tokenizing, emission, envelopes and compression.
/// They may assume every object graph they receive has already passed
/// [`ValidationWalker::ensure_registered`]; the [`GuardedCodec`] enforces
/// that.
pub trait CodecBackend: Send + Sync {
    /// The codec family this backend emits.
    fn family(&self) -> CodecFamily;

    /// Write one object graph.
    fn write_object(&self, value: &dyn Inspect) -> Result<Vec<u8>, CodecError>;

    /// Read one object graph declared as `target`.
    fn read_object(
        &self,
        bytes: &[u8],
        target: &TypeDescriptor,
    ) -> Result<Box<dyn Inspect>, CodecError>;
}

// -----------------------------------------------------------------------------
// GuardError

/// An error from a guarded serialize/deserialize call.
#[derive(Debug, Clone)]
pub enum GuardError {
    /// The graph touched an unregistered type; nothing reached the backend.
    Unregistered(UnregisteredTypeError),
    /// Composing the configuration failed.
    Configuration(ConfigurationError),
    /// The backend emits a different codec family than the configuration
    /// was composed for.
    FamilyMismatch {
        configuration: ConfigurationId,
        configured: CodecFamily,
        backend: CodecFamily,
    },
    /// The backend itself failed.
    Codec(CodecError),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered(error) => fmt::Display::fmt(error, f),
            Self::Configuration(error) => fmt::Display::fmt(error, f),
            Self::FamilyMismatch {
                configuration,
                configured,
                backend,
            } => {
                write!(
                    f,
                    "configuration `{configuration}` is {configured} but the backend emits {backend}"
                )
            }
            Self::Codec(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl error::Error for GuardError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Unregistered(error) => Some(error),
            Self::Configuration(error) => Some(error),
            Self::FamilyMismatch { .. } => None,
            Self::Codec(error) => Some(error),
        }
    }
}

impl From<UnregisteredTypeError> for GuardError {
    #[inline]
    fn from(error: UnregisteredTypeError) -> Self {
        Self::Unregistered(error)
    }
}

impl From<ConfigurationError> for GuardError {
    #[inline]
    fn from(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }
}

impl From<CodecError> for GuardError {
    #[inline]
    fn from(error: CodecError) -> Self {
        Self::Codec(error)
    }
}

// -----------------------------------------------------------------------------
// GuardedCodec

/// The entry point for serialize/deserialize calls.
///
/// Wraps a [`CodecBackend`] and runs the validation walk before every call;
/// the backend never sees a graph that touches an unregistered type. Closed
/// generics discovered mid-call register post-initialization and are visible
/// configuration-wide before the call returns.
pub struct GuardedCodec<'a, B> {
    store: &'a ConfigurationStore,
    config: Arc<ComposedConfiguration>,
    backend: B,
}

impl<'a, B: CodecBackend> GuardedCodec<'a, B> {
    /// Compose `id` and wrap `backend` for it.
    ///
    /// Fails when composition fails or when the backend's codec family does
    /// not match the configuration's.
    pub fn new(
        store: &'a ConfigurationStore,
        id: &ConfigurationId,
        backend: B,
    ) -> Result<Self, GuardError> {
        let config = store.compose(id)?;
        if backend.family() != config.family() {
            return Err(GuardError::FamilyMismatch {
                configuration: id.clone(),
                configured: config.family(),
                backend: backend.family(),
            });
        }
        Ok(Self {
            store,
            config,
            backend,
        })
    }

    /// The composed configuration this codec validates against.
    #[inline]
    pub fn configuration(&self) -> &Arc<ComposedConfiguration> {
        &self.config
    }

    /// Validate and write one object graph.
    pub fn serialize(
        &self,
        declared: &TypeDescriptor,
        value: &dyn Inspect,
    ) -> Result<Vec<u8>, GuardError> {
        ValidationWalker::new(self.store, &self.config).ensure_registered(
            declared,
            Direction::Serialize,
            Some(value),
        )?;
        Ok(self.backend.write_object(value)?)
    }

    /// Validate and read one object graph.
    pub fn deserialize(
        &self,
        declared: &TypeDescriptor,
        bytes: &[u8],
    ) -> Result<Box<dyn Inspect>, GuardError> {
        ValidationWalker::new(self.store, &self.config).ensure_registered(
            declared,
            Direction::Deserialize,
            None,
        )?;
        Ok(self.backend.read_object(bytes, declared)?)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use sf_model::catalog::TypeCatalog;
    use sf_model::descriptor::{TypeDescriptor, TypeKind};
    use sf_model::manifest::{MemberInfo, TypeManifest};
    use sf_model::value::{DynamicNull, DynamicScalar, DynamicStruct, Inspect, Scalar};
    use sf_registry::compose::{
        CodecFamily, ConfigurationDefinition, ConfigurationId, ConfigurationStore,
    };
    use sf_registry::request::TypeToRegister;

    use crate::ser::InspectSerializer;

    use super::{CodecBackend, CodecError, GuardError, GuardedCodec};

    struct JsonBackend;

    impl CodecBackend for JsonBackend {
        fn family(&self) -> CodecFamily {
            CodecFamily::Json
        }

        fn write_object(&self, value: &dyn Inspect) -> Result<Vec<u8>, CodecError> {
            serde_json::to_vec(&InspectSerializer(value))
                .map_err(|error| CodecError::new(alloc::format!("json write failed: {error}")))
        }

        fn read_object(
            &self,
            _bytes: &[u8],
            target: &TypeDescriptor,
        ) -> Result<Box<dyn Inspect>, CodecError> {
            // Token-level reading is outside this core; the guard only cares
            // that validation ran first.
            Ok(Box::new(DynamicNull::new(target.clone())))
        }
    }

    struct BsonBackend;

    impl CodecBackend for BsonBackend {
        fn family(&self) -> CodecFamily {
            CodecFamily::Bson
        }

        fn write_object(&self, _value: &dyn Inspect) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::new("unreachable in these tests"))
        }

        fn read_object(
            &self,
            _bytes: &[u8],
            target: &TypeDescriptor,
        ) -> Result<Box<dyn Inspect>, CodecError> {
            Ok(Box::new(DynamicNull::new(target.clone())))
        }
    }

    fn ty(kind: TypeKind, path: &'static str) -> TypeDescriptor {
        TypeDescriptor::new(kind, path)
    }

    fn store() -> ConfigurationStore {
        let lamp = ty(TypeKind::Struct, "lighting::Lamp");
        let param = TypeDescriptor::generic_param("T");

        let mut catalog = TypeCatalog::new();
        catalog.add(
            TypeManifest::builder(lamp.clone())
                .member(MemberInfo::new("watts", TypeDescriptor::signed()))
                .finish(),
        );
        catalog.add(TypeManifest::builder(ty(TypeKind::Struct, "lighting::Rogue")).finish());
        catalog.add(
            TypeManifest::builder(
                ty(TypeKind::Struct, "util::Batch").with_args(alloc::vec![param.clone()]),
            )
            .member(MemberInfo::new("items", TypeDescriptor::sequence_of(param)))
            .finish(),
        );

        let store = ConfigurationStore::new(Arc::new(catalog));
        store.define(
            ConfigurationDefinition::new(ConfigurationId::new("domain"), CodecFamily::Json)
                .register(TypeToRegister::originating(lamp))
                .register(TypeToRegister::originating(
                    ty(TypeKind::Struct, "util::Batch")
                        .with_args(alloc::vec![TypeDescriptor::boolean()]),
                )),
        );
        store.define(
            ConfigurationDefinition::new(ConfigurationId::new("app"), CodecFamily::Json)
                .depends_on(ConfigurationId::new("domain")),
        );
        store
    }

    #[test]
    fn registered_graphs_reach_the_backend() {
        let store = store();
        let codec = GuardedCodec::new(&store, &ConfigurationId::new("domain"), JsonBackend).unwrap();

        let lamp = ty(TypeKind::Struct, "lighting::Lamp");
        let value = DynamicStruct::new(lamp.clone())
            .with_member("watts", Box::new(DynamicScalar::of(Scalar::Signed(60))));
        let bytes = codec.serialize(&lamp, &value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"watts":60}"#);

        codec.deserialize(&lamp, b"{}").unwrap();
    }

    #[test]
    fn unregistered_graphs_never_reach_the_backend() {
        let store = store();
        let codec = GuardedCodec::new(&store, &ConfigurationId::new("domain"), JsonBackend).unwrap();

        let rogue = ty(TypeKind::Struct, "lighting::Rogue");
        let value = DynamicStruct::new(rogue.clone());
        let error = codec.serialize(&rogue, &value).unwrap_err();
        assert!(matches!(error, GuardError::Unregistered(_)));

        let error = match codec.deserialize(&rogue, b"{}") {
            Ok(_) => panic!("expected deserialize to be rejected"),
            Err(error) => error,
        };
        assert!(matches!(error, GuardError::Unregistered(_)));
    }

    #[test]
    fn family_mismatch_is_rejected_up_front() {
        let store = store();
        let error = match GuardedCodec::new(&store, &ConfigurationId::new("domain"), BsonBackend) {
            Ok(_) => panic!("expected family mismatch to be rejected"),
            Err(error) => error,
        };
        assert!(matches!(error, GuardError::FamilyMismatch { .. }));
    }

    #[test]
    fn runtime_generics_become_visible_to_dependents_mid_call() {
        let store = store();
        let app = store.compose(&ConfigurationId::new("app")).unwrap();
        let codec = GuardedCodec::new(&store, &ConfigurationId::new("domain"), JsonBackend).unwrap();

        // Batch<text> was never registered; Batch<bool> was, so the open
        // definition is known and the closed form registers during the call.
        let batch = ty(TypeKind::Struct, "util::Batch")
            .with_args(alloc::vec![TypeDescriptor::text()]);
        assert!(!app.is_registered(&batch));

        codec.deserialize(&batch, b"{}").unwrap();

        assert!(codec.configuration().is_registered(&batch));
        assert!(app.is_registered(&batch));
    }
}
