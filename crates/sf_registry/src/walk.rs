use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use sf_model::descriptor::{TypeDescriptor, TypeKind};
use sf_model::hash::HashSet;
use sf_model::manifest::MemberInfo;
use sf_model::value::{Inspect, InspectRef};

use crate::compose::{ComposedConfiguration, ConfigurationStore};
use crate::error::UnregisteredTypeError;
use crate::graph;

// -----------------------------------------------------------------------------
// Direction

/// The direction a validation walk runs for.
///
/// The exploration differs: deserialization only has declared types
/// available, while serialization can additionally read runtime values and
/// their (possibly polymorphic) runtime types. Successful validations are
/// memoized separately per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Serialize,
    Deserialize,
    Unknown,
}

// -----------------------------------------------------------------------------
// ValidationWalker

/// Proves that every type reachable from a root is registered.
///
/// Invoked before every serialize/deserialize call. The walk covers the
/// declared type, its ancestor chain, its members (declared and inherited)
/// and, in [`Serialize`](Direction::Serialize) direction with an instance,
/// the runtime types of member values and of individual collection elements,
/// since a collection's runtime element types can vary per element.
///
/// Restricted scalar types terminate recursion. Closed generic types whose
/// open definition is registered are registered on the spot
/// (post-initialization) after their arguments validate.
///
/// The first unregistered type anywhere in the walk aborts with an
/// [`UnregisteredTypeError`] naming both it and the top-level type.
pub struct ValidationWalker<'a> {
    store: &'a ConfigurationStore,
    config: &'a Arc<ComposedConfiguration>,
}

impl<'a> ValidationWalker<'a> {
    /// Create a walker over one composed configuration.
    pub fn new(store: &'a ConfigurationStore, config: &'a Arc<ComposedConfiguration>) -> Self {
        Self { store, config }
    }

    /// Validate `declared` (and, when serializing, the runtime graph of
    /// `instance`) for a call in `direction`.
    pub fn ensure_registered(
        &self,
        declared: &TypeDescriptor,
        direction: Direction,
        instance: Option<&dyn Inspect>,
    ) -> Result<(), UnregisteredTypeError> {
        let mut seen = HashSet::default();
        self.walk(declared, direction, instance, declared, &mut seen)
    }

    fn walk(
        &self,
        ty: &TypeDescriptor,
        direction: Direction,
        instance: Option<&dyn Inspect>,
        top: &TypeDescriptor,
        seen: &mut HashSet<TypeDescriptor>,
    ) -> Result<(), UnregisteredTypeError> {
        let kind = ty.kind();
        // Restricted types end the recursion; placeholders cannot occur in a
        // well-formed runtime graph and have nothing to check.
        if kind.is_scalar() || kind == TypeKind::GenericParam {
            return Ok(());
        }

        match kind {
            TypeKind::Nullable => {
                if let Some(inner) = ty.element() {
                    let payload = instance
                        .filter(|value| !matches!(value.inspect_ref(), InspectRef::Null));
                    return self.walk(inner, direction, payload, top, seen);
                }
                Ok(())
            }
            TypeKind::Array | TypeKind::Sequence => {
                if let Some(element) = ty.element() {
                    self.walk(element, direction, None, top, seen)?;
                }
                if direction == Direction::Serialize {
                    if let Some(value) = instance {
                        self.walk_runtime_elements(value, direction, top, seen)?;
                    }
                }
                Ok(())
            }
            TypeKind::Dictionary => {
                if let Some(key) = ty.key_type() {
                    self.walk(key, direction, None, top, seen)?;
                }
                if let Some(value_ty) = ty.value_type() {
                    self.walk(value_ty, direction, None, top, seen)?;
                }
                if direction == Direction::Serialize {
                    if let Some(value) = instance {
                        self.walk_runtime_elements(value, direction, top, seen)?;
                    }
                }
                Ok(())
            }
            _ => self.walk_user_defined(ty, direction, instance, top, seen),
        }
    }

    fn walk_user_defined(
        &self,
        ty: &TypeDescriptor,
        direction: Direction,
        instance: Option<&dyn Inspect>,
        top: &TypeDescriptor,
        seen: &mut HashSet<TypeDescriptor>,
    ) -> Result<(), UnregisteredTypeError> {
        if !seen.insert(ty.clone()) {
            return Ok(());
        }

        if !ty.args().is_empty() {
            return self.walk_generic(ty, direction, top, seen);
        }

        let memoized = self.config.is_validated(ty, direction);
        if !memoized {
            if !self.config.is_registered(ty) {
                return Err(UnregisteredTypeError::new(ty.clone(), top.clone()));
            }
            for ancestor in graph::ancestors(self.store.catalog(), ty) {
                if ancestor.kind().is_user_defined()
                    && !ancestor.has_generic_params()
                    && !self.config.is_registered(&ancestor)
                {
                    return Err(UnregisteredTypeError::new(ancestor, top.clone()));
                }
            }
            for member in self.collected_members(ty) {
                self.walk(member.declared(), direction, None, top, seen)?;
            }
        }

        // Runtime values may be polymorphic: the value's runtime type can
        // differ from the member's declared type.
        if direction == Direction::Serialize {
            if let Some(value) = instance {
                if let InspectRef::Struct(view) = value.inspect_ref() {
                    for member in self.collected_members(ty) {
                        let Some(member_value) = view.member(member.name()) else {
                            continue;
                        };
                        if matches!(member_value.inspect_ref(), InspectRef::Null) {
                            continue;
                        }
                        let runtime = member_value.descriptor();
                        self.walk(&runtime, direction, Some(member_value), top, seen)?;
                    }
                }
            }
        }

        if !memoized {
            self.config.mark_validated(ty, direction);
        }
        Ok(())
    }

    // A collection's runtime element types can vary per element, so each
    // element (and each dictionary key and value) validates individually.
    fn walk_runtime_elements(
        &self,
        value: &dyn Inspect,
        direction: Direction,
        top: &TypeDescriptor,
        seen: &mut HashSet<TypeDescriptor>,
    ) -> Result<(), UnregisteredTypeError> {
        match value.inspect_ref() {
            InspectRef::Sequence(view) => {
                for element in view.iter() {
                    if matches!(element.inspect_ref(), InspectRef::Null) {
                        continue;
                    }
                    let runtime = element.descriptor();
                    self.walk(&runtime, direction, Some(element), top, seen)?;
                }
            }
            InspectRef::Map(view) => {
                for (key, entry_value) in view.iter() {
                    let key_runtime = key.descriptor();
                    self.walk(&key_runtime, direction, Some(key), top, seen)?;
                    if matches!(entry_value.inspect_ref(), InspectRef::Null) {
                        continue;
                    }
                    let value_runtime = entry_value.descriptor();
                    self.walk(&value_runtime, direction, Some(entry_value), top, seen)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn walk_generic(
        &self,
        ty: &TypeDescriptor,
        direction: Direction,
        top: &TypeDescriptor,
        seen: &mut HashSet<TypeDescriptor>,
    ) -> Result<(), UnregisteredTypeError> {
        if self.config.is_registered(ty) {
            return Ok(());
        }
        let definition = ty.definition();
        if !self.config.is_registered(&definition) {
            return Err(UnregisteredTypeError::new(ty.clone(), top.clone()));
        }
        for arg in ty.args() {
            self.walk(arg, direction, None, top, seen)?;
        }
        self.store.register_post_initialization(self.config, ty);
        if !self.config.is_registered(ty) {
            return Err(UnregisteredTypeError::new(ty.clone(), top.clone()));
        }
        Ok(())
    }

    // Declared and inherited members; a derived member shadows a base member
    // of the same name.
    fn collected_members(&self, ty: &TypeDescriptor) -> Vec<MemberInfo> {
        let catalog = self.store.catalog();
        let mut members = Vec::new();
        let mut names: HashSet<String> = HashSet::default();
        let mut current = Some(ty.clone());
        while let Some(cursor) = current {
            let Some(manifest) = catalog.manifest_for(&cursor) else {
                break;
            };
            for member in manifest.members() {
                if names.insert(member.name().into()) {
                    members.push(member.clone());
                }
            }
            current = manifest.base().cloned();
        }
        members
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::ToString;
    use alloc::sync::Arc;

    use sf_model::catalog::TypeCatalog;
    use sf_model::descriptor::{TypeDescriptor, TypeKind};
    use sf_model::manifest::{MemberInfo, TypeManifest};
    use sf_model::value::{DynamicScalar, DynamicSequence, DynamicStruct, Scalar};

    use crate::compose::{
        CodecFamily, ComposedConfiguration, ConfigurationDefinition, ConfigurationId,
        ConfigurationStore,
    };
    use crate::request::{RelatedTypes, TypeToRegister};

    use super::{Direction, ValidationWalker};

    fn ty(kind: TypeKind, path: &'static str) -> TypeDescriptor {
        TypeDescriptor::new(kind, path)
    }

    fn catalog() -> Arc<TypeCatalog> {
        let lamp = ty(TypeKind::Struct, "lighting::Lamp");
        let led = ty(TypeKind::Struct, "lighting::Led");
        let rogue = ty(TypeKind::Struct, "lighting::Rogue");

        let mut catalog = TypeCatalog::new();
        catalog.add(
            TypeManifest::builder(lamp.clone())
                .member(MemberInfo::new("watts", TypeDescriptor::signed()))
                .finish(),
        );
        catalog.add(
            TypeManifest::builder(led.clone())
                .base(lamp.clone())
                .member(MemberInfo::new(
                    "history",
                    TypeDescriptor::sequence_of(lamp.clone()),
                ))
                .finish(),
        );
        // Derives from Lamp but is registered by no configuration.
        catalog.add(TypeManifest::builder(rogue).base(lamp).finish());

        let param = TypeDescriptor::generic_param("T");
        catalog.add(
            TypeManifest::builder(
                ty(TypeKind::Struct, "util::Holder").with_args(alloc::vec![param.clone()]),
            )
            .member(MemberInfo::new("value", param))
            .finish(),
        );
        Arc::new(catalog)
    }

    fn composed() -> (ConfigurationStore, Arc<ComposedConfiguration>) {
        let store = ConfigurationStore::new(catalog());
        store.define(
            ConfigurationDefinition::new(ConfigurationId::new("lighting"), CodecFamily::Json)
                .register(
                    TypeToRegister::originating(ty(TypeKind::Struct, "lighting::Led"))
                        .with_related_types(RelatedTypes::Ancestors),
                )
                .register(TypeToRegister::originating(
                    ty(TypeKind::Struct, "util::Holder")
                        .with_args(alloc::vec![TypeDescriptor::boolean()]),
                )),
        );
        let config = store.compose(&ConfigurationId::new("lighting")).unwrap();
        (store, config)
    }

    #[test]
    fn registered_graphs_validate_in_both_directions() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);
        let led = ty(TypeKind::Struct, "lighting::Led");

        walker
            .ensure_registered(&led, Direction::Deserialize, None)
            .unwrap();
        walker
            .ensure_registered(
                &TypeDescriptor::sequence_of(led),
                Direction::Serialize,
                None,
            )
            .unwrap();
        walker
            .ensure_registered(&TypeDescriptor::signed(), Direction::Unknown, None)
            .unwrap();
    }

    #[test]
    fn unregistered_declared_types_are_named() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);
        let rogue = ty(TypeKind::Struct, "lighting::Rogue");

        let error = walker
            .ensure_registered(&rogue, Direction::Deserialize, None)
            .unwrap_err();
        assert!(error.is_top_level());
        assert_eq!(error.unregistered(), &rogue);
    }

    #[test]
    fn unregistered_runtime_element_types_fail_serialization() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);
        let lamp = ty(TypeKind::Struct, "lighting::Lamp");
        let led = ty(TypeKind::Struct, "lighting::Led");
        let rogue = ty(TypeKind::Struct, "lighting::Rogue");

        // A Led whose history holds a Rogue at runtime.
        let mut history = DynamicSequence::new(TypeDescriptor::sequence_of(lamp));
        history.push(Box::new(
            DynamicStruct::new(rogue.clone())
                .with_member("watts", Box::new(DynamicScalar::of(Scalar::Signed(40)))),
        ));
        let instance = DynamicStruct::new(led.clone())
            .with_member("watts", Box::new(DynamicScalar::of(Scalar::Signed(60))))
            .with_member("history", Box::new(history));

        let error = walker
            .ensure_registered(&led, Direction::Serialize, Some(&instance))
            .unwrap_err();
        assert!(!error.is_top_level());
        assert_eq!(error.unregistered(), &rogue);
        assert_eq!(error.top_level(), &led);

        // The same declared type without the rogue element passes.
        let clean = DynamicStruct::new(led.clone())
            .with_member("watts", Box::new(DynamicScalar::of(Scalar::Signed(60))));
        walker
            .ensure_registered(&led, Direction::Serialize, Some(&clean))
            .unwrap();
    }

    #[test]
    fn closed_generics_defer_register_and_propagate() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);

        // Holder<bool> was registered at initialization; Holder<text> is a
        // new runtime instantiation.
        let runtime = ty(TypeKind::Struct, "util::Holder")
            .with_args(alloc::vec![TypeDescriptor::text()]);
        assert!(!config.is_registered(&runtime));

        walker
            .ensure_registered(&runtime, Direction::Deserialize, None)
            .unwrap();
        assert!(config.is_registered(&runtime));

        // A generic instantiated with an unregistered argument fails.
        let bad = ty(TypeKind::Struct, "util::Holder")
            .with_args(alloc::vec![ty(TypeKind::Struct, "lighting::Rogue")]);
        let error = walker
            .ensure_registered(&bad, Direction::Deserialize, None)
            .unwrap_err();
        assert_eq!(error.unregistered(), &ty(TypeKind::Struct, "lighting::Rogue"));
    }

    #[test]
    fn unknown_generic_definitions_fail() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);
        let stranger = ty(TypeKind::Struct, "util::Stranger")
            .with_args(alloc::vec![TypeDescriptor::text()]);
        let error = walker
            .ensure_registered(&stranger, Direction::Deserialize, None)
            .unwrap_err();
        assert_eq!(error.unregistered().to_string(), "util::Stranger<text>");
    }

    #[test]
    fn validation_is_memoized_per_direction() {
        let (store, config) = composed();
        let walker = ValidationWalker::new(&store, &config);
        let led = ty(TypeKind::Struct, "lighting::Led");

        walker
            .ensure_registered(&led, Direction::Deserialize, None)
            .unwrap();
        assert!(config.is_validated(&led, Direction::Deserialize));
        assert!(!config.is_validated(&led, Direction::Serialize));
    }
}
