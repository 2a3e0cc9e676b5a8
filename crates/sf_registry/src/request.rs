use alloc::sync::Arc;
use core::fmt;

use sf_model::descriptor::TypeDescriptor;
use sf_model::key::KeyStringCodec;

// -----------------------------------------------------------------------------
// RelatedTypes

/// Which inheritance-related types a registration request pulls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelatedTypes {
    /// No related types.
    #[default]
    None,
    /// Base types and implemented interfaces, transitively.
    Ancestors,
    /// Every catalog type that has this type among its ancestors.
    Descendants,
    /// Both directions.
    AncestorsAndDescendants,
}

impl RelatedTypes {
    /// Whether ancestors are included.
    #[inline]
    pub const fn includes_ancestors(self) -> bool {
        matches!(self, Self::Ancestors | Self::AncestorsAndDescendants)
    }

    /// Whether descendants are included.
    #[inline]
    pub const fn includes_descendants(self) -> bool {
        matches!(self, Self::Descendants | Self::AncestorsAndDescendants)
    }
}

// -----------------------------------------------------------------------------
// MemberTypeInclusion

bitflags::bitflags! {
    /// Which structurally-referenced types a registration request pulls in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberTypeInclusion: u8 {
        /// The declared types of the type's members.
        const DECLARED_MEMBERS = 1 << 0;
        /// The bound generic arguments of a closed generic type.
        const GENERIC_ARGUMENTS = 1 << 1;
        /// The element, key and value types of container forms.
        const ELEMENT_TYPES = 1 << 2;
        /// Everything above.
        const ALL = Self::DECLARED_MEMBERS.bits()
            | Self::GENERIC_ARGUMENTS.bits()
            | Self::ELEMENT_TYPES.bits();
    }
}

// -----------------------------------------------------------------------------
// RegistrationOrigin

/// How a registration request came to exist.
///
/// Only [`Originating`](RegistrationOrigin::Originating) requests may be
/// supplied by a configuration author; the spawned origins are produced
/// internally while the closure runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationOrigin {
    /// Authored directly in a configuration definition.
    Originating,
    /// Discovered as an ancestor or descendant of another request's type.
    SpawnedFromRelated,
    /// Discovered through members, generic arguments or container elements.
    SpawnedFromMember,
}

// -----------------------------------------------------------------------------
// TypeToRegister

/// One registration request.
///
/// Spawned requests inherit the inclusion flags of the request that produced
/// them, so an originating request's policy propagates through its whole
/// closure.
#[derive(Clone)]
pub struct TypeToRegister {
    descriptor: TypeDescriptor,
    member_types: MemberTypeInclusion,
    related_types: RelatedTypes,
    origin: RegistrationOrigin,
    key_codec: Option<Arc<dyn KeyStringCodec>>,
}

impl TypeToRegister {
    /// An author-supplied request with the default inclusion policy:
    /// all member types, no related types.
    pub fn originating(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            member_types: MemberTypeInclusion::ALL,
            related_types: RelatedTypes::None,
            origin: RegistrationOrigin::Originating,
            key_codec: None,
        }
    }

    /// Override the related-type inclusion.
    pub fn with_related_types(mut self, related_types: RelatedTypes) -> Self {
        self.related_types = related_types;
        self
    }

    /// Override the member-type inclusion.
    pub fn with_member_types(mut self, member_types: MemberTypeInclusion) -> Self {
        self.member_types = member_types;
        self
    }

    /// Attach a key⇄string codec, letting the type key compact dictionaries.
    pub fn with_key_codec(mut self, key_codec: Arc<dyn KeyStringCodec>) -> Self {
        self.key_codec = Some(key_codec);
        self
    }

    pub(crate) fn spawned_from_related(descriptor: TypeDescriptor, parent: &Self) -> Self {
        Self {
            descriptor,
            member_types: parent.member_types,
            related_types: parent.related_types,
            origin: RegistrationOrigin::SpawnedFromRelated,
            key_codec: None,
        }
    }

    pub(crate) fn spawned_from_member(descriptor: TypeDescriptor, parent: &Self) -> Self {
        Self {
            descriptor,
            member_types: parent.member_types,
            related_types: parent.related_types,
            origin: RegistrationOrigin::SpawnedFromMember,
            key_codec: None,
        }
    }

    /// A closed generic discovered during a live call. No further expansion:
    /// its arguments are validated separately by the walker.
    pub(crate) fn runtime(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            member_types: MemberTypeInclusion::empty(),
            related_types: RelatedTypes::None,
            origin: RegistrationOrigin::SpawnedFromMember,
            key_codec: None,
        }
    }

    /// The type to register.
    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The member-type inclusion flags.
    #[inline]
    pub fn member_types(&self) -> MemberTypeInclusion {
        self.member_types
    }

    /// The related-type inclusion.
    #[inline]
    pub fn related_types(&self) -> RelatedTypes {
        self.related_types
    }

    /// How this request came to exist.
    #[inline]
    pub fn origin(&self) -> RegistrationOrigin {
        self.origin
    }

    /// The attached key codec, if any.
    #[inline]
    pub fn key_codec(&self) -> Option<&Arc<dyn KeyStringCodec>> {
        self.key_codec.as_ref()
    }

    /// The visited-set key: requests for the same type with different
    /// inclusion flags expand independently.
    pub(crate) fn visited_key(&self) -> (TypeDescriptor, RelatedTypes, MemberTypeInclusion) {
        (self.descriptor.clone(), self.related_types, self.member_types)
    }
}

impl fmt::Debug for TypeToRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeToRegister")
            .field("descriptor", &self.descriptor)
            .field("member_types", &self.member_types)
            .field("related_types", &self.related_types)
            .field("origin", &self.origin)
            .field("has_key_codec", &self.key_codec.is_some())
            .finish()
    }
}
