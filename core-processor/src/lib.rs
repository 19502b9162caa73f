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

//! Tollgate gas-tracked execution engine.
//!
//! Wraps a contract VM so that every entrypoint call runs inside a gas
//! tracking session: per-contract translating meters, a session stack
//! mirroring nested calls, a pluggable gas processor for recomputation and
//! billing, and a gas-charged host interface for the running contract.

#![no_std]
#![warn(missing_docs)]
#![cfg_attr(feature = "strict", deny(warnings))]

extern crate alloc;

pub mod common;
pub mod configs;

mod engine;
mod ext;
mod processor;
mod storage;
mod vm;

#[cfg(any(feature = "mock", test))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use engine::TrackingEngine;
pub use ext::Ext;
pub use processor::{GasProcessor, NoopGasProcessor};
pub use storage::Storage;
pub use vm::{BlockInfo, CallEnv, MessageInfo, Querier, QueryError, Response, Vm};
