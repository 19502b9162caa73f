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

//! Contract storage seam.

use alloc::vec::Vec;

/// Key-value storage namespace of one contract for one call.
///
/// The host supplies an implementation per entrypoint call; the engine
/// never accesses it directly but routes every contract storage operation
/// through the gas-charged host interface.
pub trait Storage {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stores `value` under `key`.
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Removes the value stored under `key`.
    fn remove(&mut self, key: &[u8]);
}
