//! Type registration and pre-flight validation for the SerFence core.
//!
//! ## Menu
//!
//! - [`graph`]: pure related-type and member-type discovery over a catalog.
//! - [`TypeToRegister`]: one registration request, originating or spawned.
//! - [`RegistrationEngine`]: the queue-based closure algorithm.
//! - [`ConfigurationStore`]: memoized composition of the configuration DAG,
//!   plus post-initialization registration of runtime generics.
//! - [`ValidationWalker`]: proves every type reachable from a root is
//!   registered before a serialize/deserialize call may proceed.
//!
//! A configuration is composed at most once per [`ConfigurationId`]; the
//! resulting registration map is immutable except for the one
//! post-initialization path, which registers closed generic types discovered
//! during live calls and propagates them to every dependent configuration
//! before the triggering call returns.

#![no_std]

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

pub mod compose;
pub mod engine;
pub mod error;
pub mod graph;
pub mod request;
pub mod walk;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use compose::{
    CodecFamily, ComposedConfiguration, ConfigurationDefinition, ConfigurationId,
    ConfigurationStore,
};
pub use engine::{RegistrationDetails, RegistrationEngine, RegistrationMap, RegistrationPhase};
pub use error::{ConfigurationError, UnregisteredTypeError};
pub use request::{MemberTypeInclusion, RegistrationOrigin, RelatedTypes, TypeToRegister};
pub use walk::{Direction, ValidationWalker};
