use alloc::vec::Vec;
use core::{error, fmt};

use sf_model::catalog::TypeCatalog;
use sf_model::descriptor::TypeDescriptor;

// -----------------------------------------------------------------------------
// PolymorphicResolutionError

/// Resolution of a polymorphic payload failed.
///
/// Both variants carry the candidate types worth investigating, so the error
/// is actionable without a debugger.
#[derive(Debug, Clone)]
pub enum PolymorphicResolutionError {
    /// No candidate matched strictly. `considered` holds the candidates
    /// whose constructors were at least satisfiable; empty when nothing came
    /// close, in which case the abstract target itself is the lead.
    NoMatch {
        target: TypeDescriptor,
        considered: Vec<TypeDescriptor>,
    },
    /// More than one candidate matched strictly. `matches` holds exactly
    /// the strict candidates.
    AmbiguousMatch {
        target: TypeDescriptor,
        matches: Vec<TypeDescriptor>,
    },
}

impl fmt::Display for PolymorphicResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch { target, considered } => {
                if considered.is_empty() {
                    write!(f, "no candidate type matches a payload for `{target}`")
                } else {
                    write!(
                        f,
                        "no candidate type matches a payload for `{target}`; closest candidates: "
                    )?;
                    write_names(f, considered)
                }
            }
            Self::AmbiguousMatch { target, matches } => {
                write!(f, "payload for `{target}` matches multiple candidate types: ")?;
                write_names(f, matches)
            }
        }
    }
}

impl error::Error for PolymorphicResolutionError {}

fn write_names(f: &mut fmt::Formatter<'_>, types: &[TypeDescriptor]) -> fmt::Result {
    for (index, ty) in types.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "`{ty}`")?;
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// resolve

/// Determine which candidate concrete type a polymorphic payload binds to.
///
/// A candidate matches *strictly* when all three hold:
///
/// 1. it has a public constructor whose every parameter name corresponds,
///    case-insensitively, to a payload field;
/// 2. every other member absent from the payload is nullable/optional, so
///    its absence is legitimate;
/// 3. the payload has no field that corresponds to no member.
///
/// Exactly one strict match resolves. Zero strict matches fall back to the
/// *loose* candidates — constructor satisfiable, extra payload fields
/// ignored — which are reported, not returned: they focus the diagnostic.
///
/// Candidates without a manifest, or whose manifest declares no
/// constructors, never match.
pub fn resolve(
    target: &TypeDescriptor,
    payload_fields: &[&str],
    candidates: &[TypeDescriptor],
    catalog: &TypeCatalog,
) -> Result<TypeDescriptor, PolymorphicResolutionError> {
    let mut strict: Vec<TypeDescriptor> = Vec::new();
    let mut loose: Vec<TypeDescriptor> = Vec::new();

    for candidate in candidates {
        let Some(manifest) = catalog.manifest_for(candidate) else {
            continue;
        };
        let constructible = manifest.constructors().iter().any(|ctor| {
            ctor.params()
                .iter()
                .all(|param| contains_field(payload_fields, param))
        });
        if !constructible {
            continue;
        }
        loose.push(candidate.clone());

        let members = manifest.members();
        let no_extras = payload_fields.iter().all(|field| {
            members
                .iter()
                .any(|member| member.name().eq_ignore_ascii_case(field))
        });
        let absences_legitimate = members
            .iter()
            .filter(|member| !contains_field(payload_fields, member.name()))
            .all(|member| member.is_optional());
        if no_extras && absences_legitimate {
            strict.push(candidate.clone());
        }
    }

    match strict.len() {
        1 => Ok(strict.remove(0)),
        0 => Err(PolymorphicResolutionError::NoMatch {
            target: target.clone(),
            considered: loose,
        }),
        _ => Err(PolymorphicResolutionError::AmbiguousMatch {
            target: target.clone(),
            matches: strict,
        }),
    }
}

fn contains_field(payload_fields: &[&str], name: &str) -> bool {
    payload_fields
        .iter()
        .any(|field| field.eq_ignore_ascii_case(name))
}

// -----------------------------------------------------------------------------
// Tests
