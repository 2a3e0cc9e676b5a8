//! Pure type-relationship discovery over a [`TypeCatalog`].
//!
//! Nothing here mutates anything: these functions answer "which types does
//! this type lead to" and leave registration policy to the engine. All
//! discovery is driven by the explicit catalog, never by scanning loaded
//! code.

use alloc::vec::Vec;

use sf_model::catalog::TypeCatalog;
use sf_model::descriptor::TypeDescriptor;
use sf_model::hash::HashSet;

use crate::request::{MemberTypeInclusion, RelatedTypes};

// -----------------------------------------------------------------------------
// Related types

/// The related types of `descriptor` selected by `related`.
pub fn related_types(
    catalog: &TypeCatalog,
    descriptor: &TypeDescriptor,
    related: RelatedTypes,
) -> Vec<TypeDescriptor> {
    let mut out = Vec::new();
    if related.includes_ancestors() {
        out.extend(ancestors(catalog, descriptor));
    }
    if related.includes_descendants() {
        out.extend(descendants(catalog, descriptor));
    }
    out
}

/// The transitive base types and implemented interfaces of `descriptor`.
///
/// Interfaces contribute their own ancestors as well. The result holds each
/// type once, in discovery order.
pub fn ancestors(catalog: &TypeCatalog, descriptor: &TypeDescriptor) -> Vec<TypeDescriptor> {
    let mut out = Vec::new();
    let mut seen: HashSet<TypeDescriptor> = HashSet::default();
    let mut pending = alloc::vec![descriptor.clone()];

    while let Some(current) = pending.pop() {
        let Some(manifest) = catalog.manifest_for(&current) else {
            continue;
        };
        if let Some(base) = manifest.base() {
            if seen.insert(base.clone()) {
                out.push(base.clone());
                pending.push(base.clone());
            }
        }
        for interface in manifest.interfaces() {
            if seen.insert(interface.clone()) {
                out.push(interface.clone());
                pending.push(interface.clone());
            }
        }
    }
    out
}

/// Every catalog type that has `descriptor` among its ancestors.
pub fn descendants(catalog: &TypeCatalog, descriptor: &TypeDescriptor) -> Vec<TypeDescriptor> {
    catalog
        .iter()
        .filter_map(|manifest| {
            let candidate = manifest.descriptor().clone();
            if candidate == *descriptor {
                return None;
            }
            if ancestors(catalog, &candidate).contains(descriptor) {
                Some(candidate)
            } else {
                None
            }
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Member types

/// The structurally-referenced types of `descriptor` selected by `include`.
///
/// Container forms contribute their element/key/value types; user-defined
/// types contribute their bound generic arguments and the declared types of
/// their members (substituted for closed generics). The result holds each
/// type once.
pub fn member_types(
    catalog: &TypeCatalog,
    descriptor: &TypeDescriptor,
    include: MemberTypeInclusion,
) -> Vec<TypeDescriptor> {
    let mut out = Vec::new();
    let mut seen: HashSet<TypeDescriptor> = HashSet::default();
    let mut push = |item: TypeDescriptor, out: &mut Vec<TypeDescriptor>| {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    };

    let kind = descriptor.kind();
    if kind.is_container() && include.contains(MemberTypeInclusion::ELEMENT_TYPES) {
        for arg in descriptor.args() {
            push(arg.clone(), &mut out);
        }
    }
    if kind.is_user_defined() {
        if include.contains(MemberTypeInclusion::GENERIC_ARGUMENTS) {
            for arg in descriptor.args() {
                push(arg.clone(), &mut out);
            }
        }
        if include.contains(MemberTypeInclusion::DECLARED_MEMBERS) {
            if let Some(manifest) = catalog.manifest_for(descriptor) {
                for member in manifest.members() {
                    push(member.declared().clone(), &mut out);
                }
            }
        }
    }
    out
}

// -----------------------------------------------------------------------------
// Tests
