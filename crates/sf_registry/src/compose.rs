use alloc::borrow::Cow;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

use sf_model::catalog::TypeCatalog;
use sf_model::descriptor::TypeDescriptor;
use sf_model::hash::{HashMap, HashSet};
use sf_model::key::KeyStringCodec;

use crate::engine::{
    RegistrationDetails, RegistrationEngine, RegistrationMap, RegistrationPhase,
};
use crate::error::ConfigurationError;
use crate::request::TypeToRegister;
use crate::walk::Direction;

// -----------------------------------------------------------------------------
// ConfigurationId

/// The identity of one configuration node in the dependency DAG.
///
/// # Examples
///
/// ```
/// use sf_registry::compose::ConfigurationId;
///
/// let id = ConfigurationId::new("lighting");
/// assert_eq!(id.name(), "lighting");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationId(Cow<'static, str>);

impl ConfigurationId {
    /// Create an id from a configuration name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The configuration name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// CodecFamily

/// The codec family a configuration belongs to.
///
/// Configurations of different families must never depend on each other:
/// their registrations carry family-specific codec expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    Json,
    Bson,
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.pad("JSON"),
            Self::Bson => f.pad("BSON"),
        }
    }
}

// -----------------------------------------------------------------------------
// ConfigurationDefinition

/// The authored description of one configuration: its originating
/// registration requests, its dependencies, and its serialization options.
///
/// Definitions are declarative; nothing runs until the configuration is
/// composed through a [`ConfigurationStore`].
#[derive(Clone)]
pub struct ConfigurationDefinition {
    id: ConfigurationId,
    family: CodecFamily,
    dependencies: Vec<ConfigurationId>,
    types: Vec<TypeToRegister>,
    type_filter: Option<Vec<Cow<'static, str>>>,
    compact_dictionaries: bool,
}

impl ConfigurationDefinition {
    /// Start a definition for `id` in the given codec family.
    pub fn new(id: ConfigurationId, family: CodecFamily) -> Self {
        Self {
            id,
            family,
            dependencies: Vec::new(),
            types: Vec::new(),
            type_filter: None,
            compact_dictionaries: false,
        }
    }

    /// Add a dependency configuration.
    pub fn depends_on(mut self, dependency: ConfigurationId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add an originating registration request.
    pub fn register(mut self, request: TypeToRegister) -> Self {
        self.types.push(request);
        self
    }

    /// Restrict registration to types under the given path prefixes.
    pub fn filter_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Cow<'static, str>>,
    {
        self.type_filter = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    /// Serialize dictionaries with encodable key types as keyed objects
    /// instead of pair sequences.
    pub fn compact_dictionaries(mut self, compact: bool) -> Self {
        self.compact_dictionaries = compact;
        self
    }

    /// The configuration id.
    #[inline]
    pub fn id(&self) -> &ConfigurationId {
        &self.id
    }

    /// The codec family.
    #[inline]
    pub fn family(&self) -> CodecFamily {
        self.family
    }
}

// -----------------------------------------------------------------------------
// ComposedConfiguration

/// A composed configuration: the flattened type → registration map across
/// the configuration and everything it depends on.
///
/// Immutable after composition, except for post-initialization registration
/// of runtime-discovered closed generics — see
/// [`ConfigurationStore::register_post_initialization`].
pub struct ComposedConfiguration {
    id: ConfigurationId,
    family: CodecFamily,
    compact_dictionaries: bool,
    dependencies: Vec<ConfigurationId>,
    registrations: RwLock<RegistrationMap>,
    validated: RwLock<HashSet<(TypeDescriptor, Direction)>>,
}

impl ComposedConfiguration {
    /// The configuration id.
    #[inline]
    pub fn id(&self) -> &ConfigurationId {
        &self.id
    }

    /// The codec family.
    #[inline]
    pub fn family(&self) -> CodecFamily {
        self.family
    }

    /// Whether dictionaries with encodable key types use the keyed-object
    /// representation.
    #[inline]
    pub fn compact_dictionaries(&self) -> bool {
        self.compact_dictionaries
    }

    /// The direct dependencies.
    #[inline]
    pub fn dependencies(&self) -> &[ConfigurationId] {
        &self.dependencies
    }

    /// Whether `descriptor` is registered here (directly or inherited).
    pub fn is_registered(&self, descriptor: &TypeDescriptor) -> bool {
        self.read_registrations().contains(descriptor)
    }

    /// The registration for `descriptor`, if present.
    pub fn registration(&self, descriptor: &TypeDescriptor) -> Option<RegistrationDetails> {
        self.read_registrations().get(descriptor).cloned()
    }

    /// The key⇄string codec registered for `descriptor`, if any.
    pub fn key_codec_for(&self, descriptor: &TypeDescriptor) -> Option<Arc<dyn KeyStringCodec>> {
        self.read_registrations()
            .get(descriptor)
            .and_then(|details| details.key_codec().cloned())
    }

    /// All registered types, in arbitrary order.
    pub fn registered_types(&self) -> Vec<TypeDescriptor> {
        self.read_registrations()
            .iter()
            .map(|details| details.descriptor().clone())
            .collect()
    }

    /// Whether `descriptor` was recorded as filtered out by the allow-list.
    pub fn is_filtered(&self, descriptor: &TypeDescriptor) -> bool {
        self.read_registrations().is_filtered(descriptor)
    }

    // Re-checks under the write lock so that concurrent discovery of the
    // same type collapses to one registration. Returns whether this call
    // performed the insert.
    pub(crate) fn insert_post_initialization(&self, details: RegistrationDetails) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registrations.contains(details.descriptor()) {
            return false;
        }
        registrations.insert(details);
        true
    }

    pub(crate) fn is_validated(&self, descriptor: &TypeDescriptor, direction: Direction) -> bool {
        self.validated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(descriptor.clone(), direction))
    }

    pub(crate) fn mark_validated(&self, descriptor: &TypeDescriptor, direction: Direction) {
        self.validated
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((descriptor.clone(), direction));
    }

    fn read_registrations(&self) -> std::sync::RwLockReadGuard<'_, RegistrationMap> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ComposedConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedConfiguration")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("registered", &self.read_registrations().len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ConfigurationStore

struct ConfigCell {
    slot: OnceLock<Result<Arc<ComposedConfiguration>, ConfigurationError>>,
}

/// Holds configuration definitions and composes each at most once.
///
/// Many threads may request the same configuration concurrently; exactly one
/// performs the closure, the others block on the per-id cell and then read
/// the shared immutable result. A configuration instantiated as a dependency
/// is the same instance every dependent sees.
pub struct ConfigurationStore {
    catalog: Arc<TypeCatalog>,
    definitions: RwLock<HashMap<ConfigurationId, ConfigurationDefinition>>,
    cells: Mutex<HashMap<ConfigurationId, Arc<ConfigCell>>>,
}

impl ConfigurationStore {
    /// Create a store over the given catalog.
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            catalog,
            definitions: RwLock::new(HashMap::default()),
            cells: Mutex::new(HashMap::default()),
        }
    }

    /// The catalog all compositions consult.
    #[inline]
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Add a configuration definition.
    ///
    /// Definitions must be in place before the first composition that needs
    /// them; redefining an already-composed configuration has no effect on
    /// the composed result.
    pub fn define(&self, definition: ConfigurationDefinition) {
        self.definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition.id.clone(), definition);
    }

    /// Compose `id`, or return the memoized result.
    pub fn compose(
        &self,
        id: &ConfigurationId,
    ) -> Result<Arc<ComposedConfiguration>, ConfigurationError> {
        let mut stack = Vec::new();
        self.compose_inner(id, &mut stack)
    }

    fn compose_inner(
        &self,
        id: &ConfigurationId,
        stack: &mut Vec<ConfigurationId>,
    ) -> Result<Arc<ComposedConfiguration>, ConfigurationError> {
        if stack.contains(id) {
            return Err(ConfigurationError::DependencyCycle {
                configuration: id.clone(),
            });
        }
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells
                .entry(id.clone())
                .or_insert_with(|| {
                    Arc::new(ConfigCell {
                        slot: OnceLock::new(),
                    })
                })
                .clone()
        };
        cell.slot.get_or_init(|| self.build(id, stack)).clone()
    }

    fn build(
        &self,
        id: &ConfigurationId,
        stack: &mut Vec<ConfigurationId>,
    ) -> Result<Arc<ComposedConfiguration>, ConfigurationError> {
        let definition = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownConfiguration {
                configuration: id.clone(),
            })?;

        stack.push(id.clone());
        let mut dependencies = Vec::with_capacity(definition.dependencies.len());
        for dependency in &definition.dependencies {
            dependencies.push(self.compose_inner(dependency, stack)?);
        }
        stack.pop();

        for dependency in &dependencies {
            if dependency.family() != definition.family {
                return Err(ConfigurationError::MixedFamilies {
                    configuration: id.clone(),
                    family: definition.family,
                    dependency: dependency.id().clone(),
                    dependency_family: dependency.family(),
                });
            }
        }

        // Flattened dependency maps share entries through their common
        // transitive dependencies: the same owner means the same
        // registration, a different owner is a sibling collision.
        let mut merged = RegistrationMap::new();
        for dependency in &dependencies {
            merge_flattened(dependency, &mut merged)?;
        }

        let inherited: HashMap<TypeDescriptor, ConfigurationId> = merged
            .iter()
            .map(|details| (details.descriptor().clone(), details.owner().clone()))
            .collect();

        let mut engine = RegistrationEngine::new(&self.catalog, id.clone());
        if let Some(prefixes) = definition.type_filter.as_deref() {
            engine = engine.with_type_filter(prefixes);
        }
        let own = engine.register(&definition.types, &inherited)?;
        for details in own.iter() {
            merged.insert(details.clone());
        }
        for filtered in own.filtered() {
            merged.insert_filtered(filtered.clone());
        }

        #[cfg(feature = "debug")]
        log::debug!(
            "composed configuration `{}`: {} registered types",
            id,
            merged.len()
        );

        Ok(Arc::new(ComposedConfiguration {
            id: id.clone(),
            family: definition.family,
            compact_dictionaries: definition.compact_dictionaries,
            dependencies: definition.dependencies,
            registrations: RwLock::new(merged),
            validated: RwLock::new(HashSet::default()),
        }))
    }

    /// Register a closed generic type discovered during a live call.
    ///
    /// The registration lands in `discovering` first, then propagates
    /// synchronously to every composed configuration that depends on it,
    /// directly or transitively, under each one's own lock. Idempotent:
    /// configurations that already know the type silently keep their first
    /// registration. The new type is visible configuration-wide before this
    /// function returns.
    pub fn register_post_initialization(
        &self,
        discovering: &ComposedConfiguration,
        descriptor: &TypeDescriptor,
    ) {
        let details = RegistrationDetails::new(
            TypeToRegister::runtime(descriptor.clone()),
            discovering.id().clone(),
            RegistrationPhase::PostInitialization,
        );
        if discovering.insert_post_initialization(details.clone()) {
            #[cfg(feature = "debug")]
            log::debug!(
                "post-initialization: configuration `{}` registered `{}`",
                discovering.id(),
                descriptor
            );
        }
        for dependent in self.dependents_of(discovering.id()) {
            dependent.insert_post_initialization(details.clone());
        }
    }

    // Every composed configuration that depends on `target`, directly or
    // transitively.
    fn dependents_of(&self, target: &ConfigurationId) -> Vec<Arc<ComposedConfiguration>> {
        let composed: Vec<Arc<ComposedConfiguration>> = {
            let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells
                .values()
                .filter_map(|cell| cell.slot.get())
                .filter_map(|slot| slot.as_ref().ok().cloned())
                .collect()
        };
        let by_id: HashMap<ConfigurationId, Arc<ComposedConfiguration>> = composed
            .iter()
            .map(|config| (config.id().clone(), config.clone()))
            .collect();

        composed
            .iter()
            .filter(|config| {
                config.id() != target && depends_transitively(config, target, &by_id)
            })
            .cloned()
            .collect()
    }
}

fn merge_flattened(
    dependency: &ComposedConfiguration,
    merged: &mut RegistrationMap,
) -> Result<(), ConfigurationError> {
    let map = dependency.read_registrations();
    for details in map.iter() {
        match merged.get(details.descriptor()) {
            None => merged.insert(details.clone()),
            Some(existing) if existing.owner() == details.owner() => {}
            Some(existing) => {
                // A runtime-discovered generic may surface through several
                // dependency paths; whichever ancestor observed it first
                // keeps it.
                if existing.phase() == RegistrationPhase::PostInitialization
                    || details.phase() == RegistrationPhase::PostInitialization
                {
                    continue;
                }
                return Err(ConfigurationError::DuplicateRegistration {
                    ty: details.descriptor().clone(),
                    first: existing.owner().clone(),
                    second: details.owner().clone(),
                });
            }
        }
    }
    for filtered in map.filtered() {
        merged.insert_filtered(filtered.clone());
    }
    Ok(())
}

fn depends_transitively(
    config: &ComposedConfiguration,
    target: &ConfigurationId,
    by_id: &HashMap<ConfigurationId, Arc<ComposedConfiguration>>,
) -> bool {
    let mut pending: Vec<&ConfigurationId> = config.dependencies().iter().collect();
    let mut seen: HashSet<&ConfigurationId> = HashSet::default();
    while let Some(current) = pending.pop() {
        if current == target {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(dependency) = by_id.get(current) {
            pending.extend(dependency.dependencies().iter());
        }
    }
    false
}

// -----------------------------------------------------------------------------
// Tests
