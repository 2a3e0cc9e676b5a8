//! Codec-facing surfaces of the SerFence core.
//!
//! ## Menu
//!
//! - [`DictionaryKeyCodec`]: key⇄string conversion and the keyed-object vs
//!   pair-sequence representation decision.
//! - [`serialize_dictionary`]: serde emission of a dictionary in whichever
//!   representation its static key type earns.
//! - [`InspectSerializer`]: serde emission of any introspected value.
//! - [`resolve`]: polymorphic candidate resolution for abstract targets.
//! - [`GuardedCodec`]: the facade that refuses to hand an unvalidated graph
//!   to the byte codec.

#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod dictionary;
pub mod guard;
pub mod resolve;
pub mod ser;
pub mod string_codec;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use dictionary::{DictionaryKeyCodec, DictionaryRepresentation, serialize_dictionary};
pub use guard::{CodecBackend, CodecError, GuardError, GuardedCodec};
pub use resolve::{PolymorphicResolutionError, resolve};
pub use ser::InspectSerializer;

// The key-codec capability lives with the value model; re-exported here
// because this is where it is consumed.
pub use sf_model::key::{DictionaryKeyError, FnKeyCodec, KeyStringCodec};
