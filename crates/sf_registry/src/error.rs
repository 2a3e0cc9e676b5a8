use core::{error, fmt};

use sf_model::descriptor::TypeDescriptor;

use crate::compose::{CodecFamily, ConfigurationId};

// -----------------------------------------------------------------------------
// ConfigurationError

/// A fatal error raised while composing a configuration.
///
/// All variants are author mistakes: the configuration definitions must be
/// fixed, retrying cannot help.
#[derive(Debug, Clone)]
pub enum ConfigurationError {
    /// An originating request named a type that can never be registered:
    /// a scalar, a container form, or an open generic.
    UnregistrableType {
        ty: TypeDescriptor,
        configuration: ConfigurationId,
    },
    /// The same type was registered by two configurations (or twice by one).
    DuplicateRegistration {
        ty: TypeDescriptor,
        first: ConfigurationId,
        second: ConfigurationId,
    },
    /// A configuration depends on a configuration of a different codec family.
    MixedFamilies {
        configuration: ConfigurationId,
        family: CodecFamily,
        dependency: ConfigurationId,
        dependency_family: CodecFamily,
    },
    /// A dependency names a configuration that was never defined.
    UnknownConfiguration { configuration: ConfigurationId },
    /// The dependency graph is not a DAG.
    DependencyCycle { configuration: ConfigurationId },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregistrableType { ty, configuration } => {
                write!(
                    f,
                    "configuration `{configuration}` explicitly registers `{ty}`, which can never be registered"
                )
            }
            Self::DuplicateRegistration { ty, first, second } => {
                write!(
                    f,
                    "type `{ty}` is registered by both configuration `{first}` and configuration `{second}`"
                )
            }
            Self::MixedFamilies {
                configuration,
                family,
                dependency,
                dependency_family,
            } => {
                write!(
                    f,
                    "{family} configuration `{configuration}` cannot depend on {dependency_family} configuration `{dependency}`"
                )
            }
            Self::UnknownConfiguration { configuration } => {
                write!(f, "configuration `{configuration}` has not been defined")
            }
            Self::DependencyCycle { configuration } => {
                write!(
                    f,
                    "configuration `{configuration}` participates in a dependency cycle"
                )
            }
        }
    }
}

impl error::Error for ConfigurationError {}

// -----------------------------------------------------------------------------
// UnregisteredTypeError

/// A type reachable from a serialize/deserialize root is not registered.
///
/// Carries both the unregistered type and the top-level type the call was
/// processing; when the two differ, the top-level type *contains* the
/// unregistered one. Recoverable by registering the named type and retrying.
#[derive(Debug, Clone)]
pub struct UnregisteredTypeError {
    unregistered: TypeDescriptor,
    top_level: TypeDescriptor,
}

impl UnregisteredTypeError {
    /// Create an error for `unregistered`, found while processing `top_level`.
    pub fn new(unregistered: TypeDescriptor, top_level: TypeDescriptor) -> Self {
        Self {
            unregistered,
            top_level,
        }
    }

    /// The type that is not registered.
    #[inline]
    pub fn unregistered(&self) -> &TypeDescriptor {
        &self.unregistered
    }

    /// The top-level type the failing call was processing.
    #[inline]
    pub fn top_level(&self) -> &TypeDescriptor {
        &self.top_level
    }

    /// Whether the top-level type itself is the unregistered one.
    #[inline]
    pub fn is_top_level(&self) -> bool {
        self.unregistered == self.top_level
    }
}

impl fmt::Display for UnregisteredTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_top_level() {
            write!(
                f,
                "type `{}` is not registered for serialization",
                self.unregistered
            )
        } else {
            write!(
                f,
                "type `{}` contains `{}`, which is not registered for serialization",
                self.top_level, self.unregistered
            )
        }
    }
}

impl error::Error for UnregisteredTypeError {}
