use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::fmt;

use sf_model::catalog::TypeCatalog;
use sf_model::descriptor::TypeDescriptor;
use sf_model::hash::{HashMap, HashSet};
use sf_model::key::KeyStringCodec;

use crate::compose::ConfigurationId;
use crate::error::ConfigurationError;
use crate::graph;
use crate::request::{MemberTypeInclusion, RegistrationOrigin, RelatedTypes, TypeToRegister};

// -----------------------------------------------------------------------------
// RegistrationDetails

/// When a registration happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationPhase {
    /// During the one-time closure computation of the owning configuration.
    Initialization,
    /// After closure completed, for a closed generic discovered at runtime.
    PostInitialization,
}

/// One completed registration: the request that caused it, the configuration
/// that owns it, and when it happened. Created exactly once per distinct
/// type across a composed configuration set.
#[derive(Clone)]
pub struct RegistrationDetails {
    request: TypeToRegister,
    owner: ConfigurationId,
    phase: RegistrationPhase,
}

impl RegistrationDetails {
    pub(crate) fn new(
        request: TypeToRegister,
        owner: ConfigurationId,
        phase: RegistrationPhase,
    ) -> Self {
        Self {
            request,
            owner,
            phase,
        }
    }

    /// The request that caused this registration.
    #[inline]
    pub fn request(&self) -> &TypeToRegister {
        &self.request
    }

    /// The registered type.
    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.request.descriptor()
    }

    /// The configuration that owns this registration.
    #[inline]
    pub fn owner(&self) -> &ConfigurationId {
        &self.owner
    }

    /// When the registration happened.
    #[inline]
    pub fn phase(&self) -> RegistrationPhase {
        self.phase
    }

    /// The key⇄string codec registered with the type, if any.
    #[inline]
    pub fn key_codec(&self) -> Option<&Arc<dyn KeyStringCodec>> {
        self.request.key_codec()
    }
}

impl fmt::Debug for RegistrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationDetails")
            .field("descriptor", self.descriptor())
            .field("owner", &self.owner)
            .field("phase", &self.phase)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// RegistrationMap

/// The outcome of a closure run: type → registration, plus the set of types
/// the module-path allow-list filtered out (recorded, expanded, never
/// registered).
#[derive(Default)]
pub struct RegistrationMap {
    entries: HashMap<TypeDescriptor, RegistrationDetails>,
    filtered: HashSet<TypeDescriptor>,
}

impl RegistrationMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `descriptor` is registered.
    #[inline]
    pub fn contains(&self, descriptor: &TypeDescriptor) -> bool {
        self.entries.contains_key(descriptor)
    }

    /// The registration for `descriptor`, if present.
    #[inline]
    pub fn get(&self, descriptor: &TypeDescriptor) -> Option<&RegistrationDetails> {
        self.entries.get(descriptor)
    }

    /// The number of registrations.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no registrations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An iterator over all registrations, in arbitrary order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &RegistrationDetails> {
        self.entries.values()
    }

    /// Whether `descriptor` fell outside the allow-list.
    #[inline]
    pub fn is_filtered(&self, descriptor: &TypeDescriptor) -> bool {
        self.filtered.contains(descriptor)
    }

    /// An iterator over the filtered-out types.
    pub fn filtered(&self) -> impl ExactSizeIterator<Item = &TypeDescriptor> {
        self.filtered.iter()
    }

    pub(crate) fn insert(&mut self, details: RegistrationDetails) {
        self.entries.insert(details.descriptor().clone(), details);
    }

    pub(crate) fn insert_filtered(&mut self, descriptor: TypeDescriptor) {
        self.filtered.insert(descriptor);
    }
}

impl fmt::Debug for RegistrationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationMap")
            .field("registered", &self.entries.len())
            .field("filtered", &self.filtered.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// RegistrationEngine

/// The queue-based closure algorithm.
///
/// Seeded with the originating requests of one configuration, the engine
/// discovers every reachable type and registers each registrable one exactly
/// once. Two sets drive termination:
///
/// - a *visited* set keyed by `(type, related-types, member-types)`, so the
///   same type may be expanded again under different inclusion flags;
/// - the *registered* map keyed by type alone, so a type registers only once.
///
/// The asymmetry is deliberate and has a consequence worth knowing: once a
/// type is registered, reaching it again with broader inclusion flags does
/// not re-expand it. The first registration wins, which keeps closure output
/// independent of discovery order.
///
/// Scalars, container forms and open generics are never registered. A
/// spawned request for one of those is a stepping stone: it is expanded and
/// dropped. An *originating* request for one is an authoring error. The one
/// exception is the open definition of a registered closed generic, which is
/// recorded so that later instantiations can be validated against it.
pub struct RegistrationEngine<'a> {
    catalog: &'a TypeCatalog,
    owner: ConfigurationId,
    type_filter: Option<&'a [Cow<'static, str>]>,
}

impl<'a> RegistrationEngine<'a> {
    /// Create an engine registering on behalf of `owner`.
    pub fn new(catalog: &'a TypeCatalog, owner: ConfigurationId) -> Self {
        Self {
            catalog,
            owner,
            type_filter: None,
        }
    }

    /// Restrict registration to types whose path starts with one of the
    /// given prefixes. Types outside the list are recorded as filtered out
    /// but still expanded for further discovery.
    pub fn with_type_filter(mut self, prefixes: &'a [Cow<'static, str>]) -> Self {
        self.type_filter = Some(prefixes);
        self
    }

    /// Run the closure over `seeds`.
    ///
    /// `inherited` holds the registrations contributed by dependency
    /// configurations: reaching one of those types is a no-op for spawned
    /// requests and a duplicate-registration error for originating ones.
    pub fn register(
        &self,
        seeds: &[TypeToRegister],
        inherited: &HashMap<TypeDescriptor, ConfigurationId>,
    ) -> Result<RegistrationMap, ConfigurationError> {
        let mut map = RegistrationMap::new();
        let mut visited: HashSet<(TypeDescriptor, RelatedTypes, MemberTypeInclusion)> =
            HashSet::default();
        let mut queue: VecDeque<TypeToRegister> = VecDeque::with_capacity(seeds.len());

        for seed in seeds {
            visited.insert(seed.visited_key());
            queue.push_back(seed.clone());
        }

        while let Some(request) = queue.pop_front() {
            let descriptor = request.descriptor().clone();

            if let Some(existing) = map.get(&descriptor) {
                if request.origin() == RegistrationOrigin::Originating {
                    return Err(ConfigurationError::DuplicateRegistration {
                        ty: descriptor,
                        first: existing.owner().clone(),
                        second: self.owner.clone(),
                    });
                }
                continue;
            }
            if let Some(first) = inherited.get(&descriptor) {
                if request.origin() == RegistrationOrigin::Originating {
                    return Err(ConfigurationError::DuplicateRegistration {
                        ty: descriptor,
                        first: first.clone(),
                        second: self.owner.clone(),
                    });
                }
                continue;
            }
            if map.is_filtered(&descriptor) {
                continue;
            }

            if Self::registrable(&descriptor) {
                if self.allowed(&descriptor) {
                    #[cfg(feature = "debug")]
                    log::trace!("configuration `{}` registers `{}`", self.owner, descriptor);
                    map.insert(RegistrationDetails::new(
                        request.clone(),
                        self.owner.clone(),
                        RegistrationPhase::Initialization,
                    ));
                    // Later instantiations validate against the definition.
                    if descriptor.is_closed_generic() {
                        let definition = descriptor.definition();
                        if !map.contains(&definition) && !inherited.contains_key(&definition) {
                            map.insert(RegistrationDetails::new(
                                TypeToRegister::spawned_from_member(definition, &request),
                                self.owner.clone(),
                                RegistrationPhase::Initialization,
                            ));
                        }
                    }
                } else {
                    #[cfg(feature = "debug")]
                    log::trace!(
                        "configuration `{}` filters out `{}`",
                        self.owner,
                        descriptor
                    );
                    map.insert_filtered(descriptor.clone());
                }
            } else if request.origin() == RegistrationOrigin::Originating {
                return Err(ConfigurationError::UnregistrableType {
                    ty: descriptor,
                    configuration: self.owner.clone(),
                });
            }

            for related in graph::related_types(self.catalog, &descriptor, request.related_types())
            {
                let spawn = TypeToRegister::spawned_from_related(related, &request);
                if visited.insert(spawn.visited_key()) {
                    queue.push_back(spawn);
                }
            }
            for member in graph::member_types(self.catalog, &descriptor, request.member_types()) {
                let spawn = TypeToRegister::spawned_from_member(member, &request);
                if visited.insert(spawn.visited_key()) {
                    queue.push_back(spawn);
                }
            }
        }

        Ok(map)
    }

    fn registrable(descriptor: &TypeDescriptor) -> bool {
        descriptor.kind().is_user_defined() && !descriptor.has_generic_params()
    }

    fn allowed(&self, descriptor: &TypeDescriptor) -> bool {
        match self.type_filter {
            None => true,
            Some(prefixes) => prefixes
                .iter()
                .any(|prefix| descriptor.path().starts_with(prefix.as_ref())),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
