use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;

use crate::descriptor::TypeDescriptor;
use crate::hash::HashMap;

// -----------------------------------------------------------------------------
// MemberInfo

/// Information for one declared member of a type.
///
/// # Examples
///
/// ```
/// use sf_model::descriptor::TypeDescriptor;
/// use sf_model::manifest::MemberInfo;
///
/// let member = MemberInfo::new("watts", TypeDescriptor::signed());
/// assert_eq!(member.name(), "watts");
/// assert!(!member.is_optional());
/// ```
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: Cow<'static, str>,
    declared: TypeDescriptor,
    is_ctor_param: bool,
    is_nullable: bool,
}

impl MemberInfo {
    /// Create a member with the given name and declared type.
    pub fn new(name: impl Into<Cow<'static, str>>, declared: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            declared,
            is_ctor_param: false,
            is_nullable: false,
        }
    }

    /// Mark this member as settable through a constructor parameter.
    pub fn ctor_param(mut self) -> Self {
        self.is_ctor_param = true;
        self
    }

    /// Mark this member as nullable even when its declared type is not
    /// wrapped in a nullable container.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// The member name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    #[inline]
    pub fn declared(&self) -> &TypeDescriptor {
        &self.declared
    }

    /// Whether this member corresponds to a constructor parameter.
    #[inline]
    pub fn is_ctor_param(&self) -> bool {
        self.is_ctor_param
    }

    /// Whether absence of this member in a payload is legitimate.
    ///
    /// True when the member is flagged nullable or its declared type is a
    /// nullable container.
    pub fn is_optional(&self) -> bool {
        self.is_nullable || self.declared.kind() == crate::descriptor::TypeKind::Nullable
    }

    fn substitute(&self, bindings: &[(Cow<'static, str>, TypeDescriptor)]) -> Self {
        Self {
            name: self.name.clone(),
            declared: self.declared.substitute(bindings),
            is_ctor_param: self.is_ctor_param,
            is_nullable: self.is_nullable,
        }
    }
}

// -----------------------------------------------------------------------------
// ConstructorInfo

/// One public constructor: the member names it binds, in order.
#[derive(Debug, Clone, Default)]
pub struct ConstructorInfo {
    params: Vec<Cow<'static, str>>,
}

impl ConstructorInfo {
    /// A parameterless constructor.
    pub fn parameterless() -> Self {
        Self::default()
    }

    /// A constructor binding the given member names.
    pub fn new<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Cow<'static, str>>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// The bound member names.
    #[inline]
    pub fn params(&self) -> &[Cow<'static, str>] {
        &self.params
    }
}

// -----------------------------------------------------------------------------
// TypeManifest

/// Structural metadata for one catalog type.
///
/// A manifest records what introspection would otherwise discover at runtime:
/// declared members, public constructors, the base type and implemented
/// interfaces. Manifests are authored once (typically generated) and stored
/// in a [`TypeCatalog`](crate::catalog::TypeCatalog).
///
/// Members keep their declaration order; lookup by name goes through an
/// index table.
#[derive(Debug, Clone)]
pub struct TypeManifest {
    descriptor: TypeDescriptor,
    base: Option<TypeDescriptor>,
    interfaces: Vec<TypeDescriptor>,
    members: Vec<MemberInfo>,
    member_index: HashMap<Cow<'static, str>, usize>,
    constructors: Vec<ConstructorInfo>,
}

impl TypeManifest {
    /// Start building a manifest for `descriptor`.
    pub fn builder(descriptor: TypeDescriptor) -> ManifestBuilder {
        ManifestBuilder {
            descriptor,
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// The described type.
    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The direct base type, if any.
    #[inline]
    pub fn base(&self) -> Option<&TypeDescriptor> {
        self.base.as_ref()
    }

    /// The directly implemented interfaces.
    #[inline]
    pub fn interfaces(&self) -> &[TypeDescriptor] {
        &self.interfaces
    }

    /// The declared members in declaration order.
    #[inline]
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// The [`MemberInfo`] for the given `name`, if present.
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.member_index.get(name).map(|index| &self.members[*index])
    }

    /// The public constructors.
    #[inline]
    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    /// Produce the manifest of a closed instantiation of this open generic.
    ///
    /// `closed` must share this manifest's path and arity; its arguments are
    /// bound to the open descriptor's parameter names positionally.
    pub fn substitute(&self, closed: &TypeDescriptor) -> TypeManifest {
        let bindings: Vec<(Cow<'static, str>, TypeDescriptor)> = self
            .descriptor
            .args()
            .iter()
            .zip(closed.args())
            .map(|(param, bound)| (Cow::Owned(param.path().into()), bound.clone()))
            .collect();

        let members: Vec<MemberInfo> = self
            .members
            .iter()
            .map(|member| member.substitute(&bindings))
            .collect();
        let member_index = index_members(&members);

        TypeManifest {
            descriptor: closed.clone(),
            base: self.base.as_ref().map(|base| base.substitute(&bindings)),
            interfaces: self
                .interfaces
                .iter()
                .map(|interface| interface.substitute(&bindings))
                .collect(),
            members,
            member_index,
            constructors: self.constructors.clone(),
        }
    }
}

impl fmt::Display for TypeManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest of `{}`", self.descriptor)
    }
}

fn index_members(members: &[MemberInfo]) -> HashMap<Cow<'static, str>, usize> {
    members
        .iter()
        .enumerate()
        .map(|(index, member)| (member.name.clone(), index))
        .collect()
}

// -----------------------------------------------------------------------------
// ManifestBuilder

/// Builder returned by [`TypeManifest::builder`].
pub struct ManifestBuilder {
    descriptor: TypeDescriptor,
    base: Option<TypeDescriptor>,
    interfaces: Vec<TypeDescriptor>,
    members: Vec<MemberInfo>,
    constructors: Vec<ConstructorInfo>,
}

impl ManifestBuilder {
    /// Set the direct base type.
    pub fn base(mut self, base: TypeDescriptor) -> Self {
        self.base = Some(base);
        self
    }

    /// Add a directly implemented interface.
    pub fn implements(mut self, interface: TypeDescriptor) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a declared member.
    pub fn member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Add a public constructor.
    pub fn constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Finish the manifest.
    pub fn finish(self) -> TypeManifest {
        let member_index = index_members(&self.members);
        TypeManifest {
            descriptor: self.descriptor,
            base: self.base,
            interfaces: self.interfaces,
            members: self.members,
            member_index,
            constructors: self.constructors,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
