use alloc::borrow::Cow;

use crate::descriptor::TypeDescriptor;
use crate::hash::HashMap;
use crate::manifest::TypeManifest;

// -----------------------------------------------------------------------------
// TypeCatalog

/// The explicit closed catalog of candidate types.
///
/// Everything the registration machinery may ever discover — descendants of a
/// base type, interface implementers, member types — is found by consulting
/// this catalog, never by scanning the process for loaded code. The catalog
/// is built once at startup and shared read-only afterwards.
///
/// Open generic types are stored under their open descriptor; closed
/// instantiations resolve through [`manifest_for`](TypeCatalog::manifest_for),
/// which substitutes the bound arguments on demand.
pub struct TypeCatalog {
    manifests: HashMap<TypeDescriptor, TypeManifest>,
    by_path: HashMap<Cow<'static, str>, TypeDescriptor>,
}

impl Default for TypeCatalog {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            manifests: HashMap::default(),
            by_path: HashMap::default(),
        }
    }

    /// Try to add a manifest.
    ///
    /// - If the described type already exists, the function does nothing and
    ///   returns `false`.
    /// - Otherwise the manifest is inserted and the function returns `true`.
    pub fn add(&mut self, manifest: TypeManifest) -> bool {
        let descriptor = manifest.descriptor().clone();
        if self.manifests.contains_key(&descriptor) {
            return false;
        }
        self.by_path
            .insert(Cow::Owned(descriptor.path().into()), descriptor.clone());
        self.manifests.insert(descriptor, manifest);
        true
    }

    /// Whether the catalog holds a manifest for exactly this descriptor.
    #[inline]
    pub fn contains(&self, descriptor: &TypeDescriptor) -> bool {
        self.manifests.contains_key(descriptor)
    }

    /// The manifest stored for exactly this descriptor, if present.
    #[inline]
    pub fn get(&self, descriptor: &TypeDescriptor) -> Option<&TypeManifest> {
        self.manifests.get(descriptor)
    }

    /// The manifest stored for the given canonical path, if present.
    pub fn get_with_path(&self, path: &str) -> Option<&TypeManifest> {
        match self.by_path.get(path) {
            Some(descriptor) => self.get(descriptor),
            None => None,
        }
    }

    /// Resolve a manifest for `descriptor`, instantiating open generics.
    ///
    /// An exact hit clones the stored manifest. A closed generic with no
    /// exact hit falls back to its [`definition`](TypeDescriptor::definition)
    /// and substitutes the bound arguments into the open manifest. Returns
    /// `None` for types the catalog does not know.
    pub fn manifest_for(&self, descriptor: &TypeDescriptor) -> Option<TypeManifest> {
        if let Some(manifest) = self.manifests.get(descriptor) {
            return Some(manifest.clone());
        }
        if !descriptor.is_closed_generic() {
            return None;
        }
        let definition = descriptor.definition();
        self.manifests
            .get(&definition)
            .map(|open| open.substitute(descriptor))
    }

    /// The number of stored manifests.
    #[inline]
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// An iterator over all stored manifests, in arbitrary order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeManifest> {
        self.manifests.values()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::descriptor::{TypeDescriptor, TypeKind};
    use crate::manifest::{MemberInfo, TypeManifest};

    use super::TypeCatalog;

    #[test]
    fn add_is_first_wins() {
        let descriptor = TypeDescriptor::new(TypeKind::Struct, "a::B");
        let mut catalog = TypeCatalog::new();
        assert!(catalog.add(TypeManifest::builder(descriptor.clone()).finish()));
        assert!(!catalog.add(
            TypeManifest::builder(descriptor.clone())
                .member(MemberInfo::new("x", TypeDescriptor::signed()))
                .finish()
        ));
        assert!(catalog.get(&descriptor).unwrap().members().is_empty());
    }

    #[test]
    fn closed_generics_resolve_through_the_definition() {
        let param = TypeDescriptor::generic_param("T");
        let open = TypeDescriptor::new(TypeKind::Struct, "util::Holder")
            .with_args(alloc::vec![param.clone()]);
        let mut catalog = TypeCatalog::new();
        catalog.add(
            TypeManifest::builder(open)
                .member(MemberInfo::new("value", param))
                .finish(),
        );

        let closed = TypeDescriptor::new(TypeKind::Struct, "util::Holder")
            .with_args(alloc::vec![TypeDescriptor::text()]);
        assert!(!catalog.contains(&closed));

        let manifest = catalog.manifest_for(&closed).unwrap();
        assert_eq!(manifest.member("value").unwrap().declared(), &TypeDescriptor::text());
    }

    #[test]
    fn path_lookup() {
        let mut catalog = TypeCatalog::new();
        let descriptor = TypeDescriptor::new(TypeKind::Enum, "lighting::Mode");
        catalog.add(TypeManifest::builder(descriptor.clone()).finish());
        assert_eq!(
            catalog.get_with_path("lighting::Mode").unwrap().descriptor(),
            &descriptor
        );
        assert!(catalog.get_with_path("lighting::Missing").is_none());
    }
}
