// This file is part of Tollgate.

// Copyright (C) 2025-2026 Tollgate Team.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Identifiers for contracts and code blobs.

use blake2::{Blake2b, Digest, digest::typenum::U32};
use scale_info::{
    TypeInfo,
    scale::{Decode, Encode, MaxEncodedLen},
};

const HASH_LEN: usize = 32;
type Hash = [u8; HASH_LEN];

/// BLAKE2b-256 hasher state.
type Blake2b256 = Blake2b<U32>;

/// Hashes the argument into a unique 32-byte identifier.
fn hash(data: &[u8]) -> Hash {
    let mut ctx = Blake2b256::new();
    ctx.update(data);
    ctx.finalize().into()
}

/// Error converting a byte slice into a 32-byte identifier.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
#[display("Identifier must be {HASH_LEN} bytes long")]
pub struct InvalidIdLength;

/// Declares a 32-byte identifier newtype.
macro_rules! declare_id {
    ($name:ident: $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Clone,
            Copy,
            Default,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            derive_more::From,
            Encode,
            Decode,
            MaxEncodedLen,
            TypeInfo,
        )]
        pub struct $name(Hash);

        impl $name {
            /// Returns the id as a byte array.
            pub fn into_bytes(self) -> Hash {
                self.0
            }
        }

        impl From<$name> for Hash {
            fn from(id: $name) -> Hash {
                id.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                let mut id = Self(Hash::default());
                id.0[..8].copy_from_slice(&value.to_le_bytes());
                id
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = InvalidIdLength;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: Hash = slice.try_into().map_err(|_| InvalidIdLength)?;
                Ok(Self(arr))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                let len = self.0.len();
                let median = len.div_ceil(2);

                let mut end1 = median;
                let mut start2 = median;

                if let Some(precision) = f.precision() {
                    if precision < median {
                        end1 = precision;
                        start2 = len - precision;
                    }
                }

                let p1 = hex::encode(&self.0[..end1]);
                let p2 = hex::encode(&self.0[start2..]);
                let sep = if end1 != start2 { ".." } else { "" };

                if f.alternate() {
                    write!(f, "{}(0x{p1}{sep}{p2})", stringify!($name))
                } else {
                    write!(f, "0x{p1}{sep}{p2}")
                }
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                core::fmt::Display::fmt(self, f)
            }
        }
    };
}

declare_id!(ActorId: "Contract or user account identifier");

impl ActorId {
    /// Derives the address of a contract instantiated from `code_id` with
    /// the given salt.
    pub fn generate(code_id: CodeId, salt: &[u8]) -> Self {
        let argument = [b"contract", code_id.as_ref(), salt].concat();
        hash(&argument).into()
    }
}

declare_id!(CodeId: "Code blob identifier");

impl CodeId {
    /// Derives the id of the given code blob.
    pub fn generate(code: &[u8]) -> Self {
        hash(code).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn generation_is_deterministic() {
        let code_id = CodeId::generate(&[0, 1, 2]);

        let a = ActorId::generate(code_id, b"salt");
        let b = ActorId::generate(code_id, b"salt");
        let c = ActorId::generate(code_id, b"other salt");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn formatting() {
        let id = ActorId::from(1);

        assert_eq!(
            format!("{id}"),
            "0x0100000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(format!("{id:.2}"), "0x0100..0000");
        assert_eq!(format!("{id:#.2}"), "ActorId(0x0100..0000)");
    }

    #[test]
    fn slice_conversion() {
        let bytes = [7u8; HASH_LEN];

        assert_eq!(ActorId::try_from(&bytes[..]).unwrap().into_bytes(), bytes);
        assert_eq!(ActorId::try_from(&bytes[..5]), Err(InvalidIdLength));
    }
}
