//! Data model for the SerFence serialization-safety core.
//!
//! ## Menu
//!
//! - [`TypeDescriptor`]: immutable value identifying a type, usable as a map key.
//! - [`TypeManifest`]: structural metadata (members, constructors, base, interfaces).
//! - [`TypeCatalog`]: the explicit closed catalog of candidate types.
//! - [`Inspect`]: runtime value introspection for serialize-direction validation.
//! - [`KeyStringCodec`]: per-type key⇄string conversion capability.
//!
//! Everything here is a passive value: no locks, no registration logic.
//! The closure and validation algorithms live in `sf_registry`, the
//! serde-facing drivers in `sf_codec`.

#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod catalog;
pub mod descriptor;
pub mod hash;
pub mod key;
pub mod manifest;
pub mod value;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use catalog::TypeCatalog;
pub use descriptor::{ModuleOrigin, TypeDescriptor, TypeKind};
pub use key::{DictionaryKeyError, FnKeyCodec, KeyStringCodec};
pub use manifest::{ConstructorInfo, ManifestBuilder, MemberInfo, TypeManifest};
pub use value::{Inspect, InspectRef, Scalar};
