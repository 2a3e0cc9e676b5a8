use alloc::borrow::Cow;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};

// -----------------------------------------------------------------------------
// TypeKind

/// An enumeration of the "kinds" of a described type.
///
/// The scalar kinds are *restricted*: they terminate recursive validation
/// without member checks and never require registration. The container kinds
/// are structural: they are traversed into their arguments but are never
/// registered themselves. Only the user-defined kinds
/// ([`Enum`](TypeKind::Enum), [`Struct`](TypeKind::Struct),
/// [`Interface`](TypeKind::Interface)) participate in registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Unit,
    Bool,
    Signed,
    Unsigned,
    Float,
    Text,
    DateTime,
    Uuid,
    Enum,
    Struct,
    Interface,
    Array,
    Sequence,
    Dictionary,
    Nullable,
    GenericParam,
}

impl TypeKind {
    /// Whether this kind is a restricted scalar.
    #[inline]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Unit
                | Self::Bool
                | Self::Signed
                | Self::Unsigned
                | Self::Float
                | Self::Text
                | Self::DateTime
                | Self::Uuid
        )
    }

    /// Whether this kind is a structural container.
    #[inline]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Sequence | Self::Dictionary | Self::Nullable
        )
    }

    /// Whether this kind is user-defined and therefore registrable.
    #[inline]
    pub const fn is_user_defined(self) -> bool {
        matches!(self, Self::Enum | Self::Struct | Self::Interface)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.pad("Unit"),
            Self::Bool => f.pad("Bool"),
            Self::Signed => f.pad("Signed"),
            Self::Unsigned => f.pad("Unsigned"),
            Self::Float => f.pad("Float"),
            Self::Text => f.pad("Text"),
            Self::DateTime => f.pad("DateTime"),
            Self::Uuid => f.pad("Uuid"),
            Self::Enum => f.pad("Enum"),
            Self::Struct => f.pad("Struct"),
            Self::Interface => f.pad("Interface"),
            Self::Array => f.pad("Array"),
            Self::Sequence => f.pad("Sequence"),
            Self::Dictionary => f.pad("Dictionary"),
            Self::Nullable => f.pad("Nullable"),
            Self::GenericParam => f.pad("GenericParam"),
        }
    }
}

// -----------------------------------------------------------------------------
// ModuleOrigin

/// The module (and optionally module version) a type was declared in.
///
/// Equality and hashing ignore the version: two descriptors that differ only
/// by the version of their defining module identify the same type. This keeps
/// registration maps stable across rolling upgrades where producer and
/// consumer load different builds of the same domain module.
#[derive(Debug, Clone)]
pub struct ModuleOrigin {
    module: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
}

impl ModuleOrigin {
    /// Create an origin for the given module name.
    pub fn new(module: impl Into<Cow<'static, str>>) -> Self {
        Self {
            module: module.into(),
            version: None,
        }
    }

    /// Attach a version string. Informational only; never part of identity.
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// The module name.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The module version, if recorded.
    #[inline]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl PartialEq for ModuleOrigin {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
    }
}

impl Eq for ModuleOrigin {}

impl Hash for ModuleOrigin {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// An immutable, cheaply-clonable value identifying a type.
///
/// A descriptor carries a canonical path, a [`TypeKind`], generic arguments
/// (themselves descriptors) and an optional [`ModuleOrigin`]. Descriptors are
/// the map keys of the whole registration machinery, so their equality rules
/// matter:
///
/// - origin versions are ignored (see [`ModuleOrigin`]);
/// - generic parameter placeholders compare equal regardless of their name,
///   so `Wrapper<T>` authored in a catalog equals `Wrapper<U>` derived from a
///   closed form via [`definition`](TypeDescriptor::definition).
///
/// # Examples
///
/// ```
/// use sf_model::descriptor::{TypeDescriptor, TypeKind};
///
/// let led = TypeDescriptor::new(TypeKind::Struct, "lighting::Led");
/// assert_eq!(led.name(), "Led");
///
/// let dict = TypeDescriptor::dictionary_of(TypeDescriptor::text(), led.clone());
/// assert_eq!(dict.key_type(), Some(&TypeDescriptor::text()));
/// assert_eq!(dict.value_type(), Some(&led));
/// ```
#[derive(Clone)]
pub struct TypeDescriptor {
    data: Arc<DescriptorData>,
}

#[derive(Debug)]
struct DescriptorData {
    path: Cow<'static, str>,
    name: Cow<'static, str>,
    kind: TypeKind,
    args: Vec<TypeDescriptor>,
    origin: Option<ModuleOrigin>,
}

impl TypeDescriptor {
    /// Create a descriptor with the given kind and canonical path.
    ///
    /// The short name is the path segment after the last `::`.
    pub fn new(kind: TypeKind, path: impl Into<Cow<'static, str>>) -> Self {
        let path = path.into();
        let name = tail(&path);
        Self {
            data: Arc::new(DescriptorData {
                name,
                path,
                kind,
                args: Vec::new(),
                origin: None,
            }),
        }
    }

    /// Rebuild this descriptor with the given generic arguments.
    pub fn with_args(self, args: Vec<TypeDescriptor>) -> Self {
        let data = &self.data;
        Self {
            data: Arc::new(DescriptorData {
                path: data.path.clone(),
                name: data.name.clone(),
                kind: data.kind,
                args,
                origin: data.origin.clone(),
            }),
        }
    }

    /// Rebuild this descriptor with the given module origin.
    pub fn with_origin(self, origin: ModuleOrigin) -> Self {
        let data = &self.data;
        Self {
            data: Arc::new(DescriptorData {
                path: data.path.clone(),
                name: data.name.clone(),
                kind: data.kind,
                args: data.args.clone(),
                origin: Some(origin),
            }),
        }
    }

    /// The unit scalar.
    pub fn unit() -> Self {
        Self::new(TypeKind::Unit, "unit")
    }

    /// The boolean scalar.
    pub fn boolean() -> Self {
        Self::new(TypeKind::Bool, "bool")
    }

    /// The signed integer scalar.
    pub fn signed() -> Self {
        Self::new(TypeKind::Signed, "int")
    }

    /// The unsigned integer scalar.
    pub fn unsigned() -> Self {
        Self::new(TypeKind::Unsigned, "uint")
    }

    /// The floating-point scalar.
    pub fn float() -> Self {
        Self::new(TypeKind::Float, "float")
    }

    /// The text scalar.
    pub fn text() -> Self {
        Self::new(TypeKind::Text, "text")
    }

    /// The date/time scalar (carried as an ISO-8601 string payload).
    pub fn date_time() -> Self {
        Self::new(TypeKind::DateTime, "datetime")
    }

    /// The UUID scalar (carried as its canonical string payload).
    pub fn uuid() -> Self {
        Self::new(TypeKind::Uuid, "uuid")
    }

    /// A fixed-size array of `element`.
    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::new(TypeKind::Array, "array").with_args(alloc::vec![element])
    }

    /// A growable sequence of `element`.
    pub fn sequence_of(element: TypeDescriptor) -> Self {
        Self::new(TypeKind::Sequence, "sequence").with_args(alloc::vec![element])
    }

    /// A dictionary from `key` to `value`.
    pub fn dictionary_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::new(TypeKind::Dictionary, "dictionary").with_args(alloc::vec![key, value])
    }

    /// An optional `inner`.
    pub fn nullable_of(inner: TypeDescriptor) -> Self {
        Self::new(TypeKind::Nullable, "nullable").with_args(alloc::vec![inner])
    }

    /// A generic parameter placeholder with the given name.
    pub fn generic_param(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(TypeKind::GenericParam, name)
    }

    /// The kind of this type.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.data.kind
    }

    /// The canonical path, without generic arguments.
    #[inline]
    pub fn path(&self) -> &str {
        &self.data.path
    }

    /// The short name (last path segment).
    #[inline]
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The generic arguments.
    #[inline]
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.data.args
    }

    /// The module origin, if recorded.
    #[inline]
    pub fn origin(&self) -> Option<&ModuleOrigin> {
        self.data.origin.as_ref()
    }

    /// The element type of an array, sequence or nullable.
    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self.data.kind {
            TypeKind::Array | TypeKind::Sequence | TypeKind::Nullable => self.data.args.first(),
            _ => None,
        }
    }

    /// The key type of a dictionary.
    pub fn key_type(&self) -> Option<&TypeDescriptor> {
        match self.data.kind {
            TypeKind::Dictionary => self.data.args.first(),
            _ => None,
        }
    }

    /// The value type of a dictionary.
    pub fn value_type(&self) -> Option<&TypeDescriptor> {
        match self.data.kind {
            TypeKind::Dictionary => self.data.args.get(1),
            _ => None,
        }
    }

    /// Whether this descriptor contains a generic parameter anywhere,
    /// including being one itself.
    pub fn has_generic_params(&self) -> bool {
        self.data.kind == TypeKind::GenericParam
            || self.data.args.iter().any(TypeDescriptor::has_generic_params)
    }

    /// Whether this is a user-defined generic type with all arguments bound.
    pub fn is_closed_generic(&self) -> bool {
        self.data.kind.is_user_defined()
            && !self.data.args.is_empty()
            && !self.has_generic_params()
    }

    /// The open definition of this type.
    ///
    /// For a user-defined generic, the arguments are replaced by placeholder
    /// parameters; placeholder names never participate in equality, so the
    /// result equals the catalog's authored open descriptor. Non-generic
    /// descriptors return themselves.
    pub fn definition(&self) -> TypeDescriptor {
        if self.data.args.is_empty() {
            return self.clone();
        }
        let args = (0..self.data.args.len())
            .map(|index| {
                TypeDescriptor::generic_param(alloc::format!("T{index}"))
            })
            .collect();
        self.clone().with_args(args)
    }

    /// Replace generic parameters by name according to `bindings`.
    pub fn substitute(&self, bindings: &[(Cow<'static, str>, TypeDescriptor)]) -> TypeDescriptor {
        if self.data.kind == TypeKind::GenericParam {
            for (name, bound) in bindings {
                if name.as_ref() == self.path() {
                    return bound.clone();
                }
            }
            return self.clone();
        }
        if !self.has_generic_params() {
            return self.clone();
        }
        let args = self
            .data
            .args
            .iter()
            .map(|arg| arg.substitute(bindings))
            .collect();
        self.clone().with_args(args)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.data, &other.data) {
            return true;
        }
        // Placeholders identify by position, not by name.
        if self.data.kind == TypeKind::GenericParam {
            return other.data.kind == TypeKind::GenericParam;
        }
        self.data.kind == other.data.kind
            && self.data.path == other.data.path
            && self.data.origin == other.data.origin
            && self.data.args == other.data.args
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.kind.hash(state);
        if self.data.kind == TypeKind::GenericParam {
            return;
        }
        self.data.path.hash(state);
        self.data.origin.hash(state);
        self.data.args.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())?;
        if self.data.args.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        for (index, arg) in self.data.args.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(arg, f)?;
        }
        f.write_str(">")
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({}: {})", self, self.kind())
    }
}

/// The path segment after the last `::`, borrowed when the path is.
fn tail(path: &Cow<'static, str>) -> Cow<'static, str> {
    match path {
        Cow::Borrowed(path) => {
            let path: &'static str = *path;
            match path.rfind("::") {
                Some(index) => Cow::Borrowed(&path[index + 2..]),
                None => Cow::Borrowed(path),
            }
        }
        Cow::Owned(path) => match path.rfind("::") {
            Some(index) => Cow::Owned(path[index + 2..].into()),
            None => Cow::Owned(path.clone()),
        },
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::{ModuleOrigin, TypeDescriptor, TypeKind};

    fn wrapper(arg: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::Struct, "collections::Wrapper")
            .with_args(alloc::vec![arg])
    }

    #[test]
    fn version_is_not_identity() {
        let a = TypeDescriptor::new(TypeKind::Struct, "lighting::Led")
            .with_origin(ModuleOrigin::new("lighting").with_version("1.0.3"));
        let b = TypeDescriptor::new(TypeKind::Struct, "lighting::Led")
            .with_origin(ModuleOrigin::new("lighting").with_version("2.7.0"));
        assert_eq!(a, b);

        let c = TypeDescriptor::new(TypeKind::Struct, "lighting::Led")
            .with_origin(ModuleOrigin::new("fixtures"));
        assert_ne!(a, c);
    }

    #[test]
    fn placeholder_names_are_not_identity() {
        let authored = wrapper(TypeDescriptor::generic_param("T"));
        let closed = wrapper(TypeDescriptor::signed());
        assert_eq!(closed.definition(), authored);
        assert_ne!(closed, authored);
    }

    #[test]
    fn substitute_binds_by_name() {
        let open = wrapper(TypeDescriptor::generic_param("T"));
        let closed = open.substitute(&[("T".into(), TypeDescriptor::boolean())]);
        assert_eq!(closed, wrapper(TypeDescriptor::boolean()));
        assert!(!closed.has_generic_params());
    }

    #[test]
    fn display_composes_arguments() {
        let dict = TypeDescriptor::dictionary_of(
            TypeDescriptor::text(),
            TypeDescriptor::sequence_of(TypeDescriptor::signed()),
        );
        assert_eq!(format!("{dict}"), "dictionary<text, sequence<int>>");
    }

    #[test]
    fn container_accessors() {
        let elem = TypeDescriptor::new(TypeKind::Enum, "lighting::Mode");
        let seq = TypeDescriptor::sequence_of(elem.clone());
        assert_eq!(seq.element(), Some(&elem));
        assert!(seq.kind().is_container());
        assert!(!seq.kind().is_user_defined());
        assert!(elem.kind().is_user_defined());
    }
}
