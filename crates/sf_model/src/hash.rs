//! Hash containers, re-exporting *hashbrown* seeded with a fixed *foldhash*
//! state so that closure output does not depend on process randomness.

use core::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// FixedHashState

/// A fixed hash seed.
const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x4D1F_9A37_C25B_80E9);

/// A hasher whose results depend only on the input.
///
/// A type alias for [`foldhash::fast::FoldHasher`].
pub type FixedHasher = FoldHasher<'static>;

/// Hash state based upon a random but fixed seed.
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// Containers

/// [`hashbrown::HashMap`] with the fixed hash state.
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// [`hashbrown::HashSet`] with the fixed hash state.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
