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

//! Engine configuration.

use tollgate_core::gas::Gas;

/// Host gas charged for contract storage access, flat per operation plus
/// per byte of key and value.
///
/// Charges go through the active contract meter, so they are translated
/// like any other host-side work of the contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StorageCosts {
    /// Flat cost of a read.
    pub read_flat: Gas,
    /// Cost per byte read, key and value.
    pub read_per_byte: Gas,
    /// Flat cost of a write.
    pub write_flat: Gas,
    /// Cost per byte written, key and value.
    pub write_per_byte: Gas,
    /// Flat cost of a delete.
    pub delete_flat: Gas,
}

impl Default for StorageCosts {
    fn default() -> Self {
        Self {
            read_flat: 1_000,
            read_per_byte: 3,
            write_flat: 2_000,
            write_per_byte: 30,
            delete_flat: 1_000,
        }
    }
}
