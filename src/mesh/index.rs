//! Index types for mesh elements.
//!
//! Index buffers may be 16- or 32-bit ([`MeshIndex`]). Adjacency tables,
//! point representatives and all atlas outputs always use `u32`, with
//! [`UNUSED32`] as the "no element" sentinel.

use std::fmt::{self, Debug};
use std::hash::Hash;

use serde::Serialize;

/// Sentinel stored in adjacency tables for a boundary edge.
pub const UNUSED32: u32 = u32::MAX;

/// Trait for integer types usable in an index buffer.
///
/// Implemented for `u16` and `u32`. The all-ones value of each type is the
/// "unused" sentinel: a triangle whose three indices are all `INVALID` is
/// an unused triangle and is skipped by every operation that tolerates it.
pub trait MeshIndex: Copy + Clone + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// A sentinel value representing an invalid/unused index.
    const INVALID: Self;

    /// Convert to usize.
    fn to_usize(self) -> usize;

    /// Check if this is a valid (non-sentinel) index.
    #[inline]
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl MeshIndex for u16 {
    const INVALID: Self = u16::MAX;

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl MeshIndex for u32 {
    const INVALID: Self = u32::MAX;

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct VertexId(u32);

/// A type-safe face (triangle) index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct FaceId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < UNUSED32 as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(UNUSED32)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != UNUSED32
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Debug::fmt(self, f)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(FaceId, "F");
