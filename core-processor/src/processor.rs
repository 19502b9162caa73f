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

//! The gas accounting plugin seam.

use alloc::sync::Arc;
use core::fmt;
use tollgate_core::{
    gas::GasUsage,
    ids::ActorId,
    meter::GasCalcFn,
    record::{GasRecord, SessionRecord},
};

/// Host-pluggable gas accounting policy.
///
/// The engine consults the processor at three points of a call: once
/// before execution for the contract's gas translation function, once
/// after execution to recompute the figure reported to the VM caller,
/// and once per root call with the consolidated session records. The VM
/// itself never observes any of this.
pub trait GasProcessor {
    /// Processor-side failure.
    type Error: fmt::Debug + fmt::Display;

    /// Returns the gas translation function for `contract`.
    fn calc_fn(&self, contract: &ActorId) -> Result<GasCalcFn, Self::Error>;

    /// Recomputes the gas figure reported upwards for a finished call.
    fn recompute(&self, record: GasRecord) -> Result<GasUsage, Self::Error>;

    /// Consumes the consolidated records of a finished root call.
    fn ingest(&self, records: &[SessionRecord]) -> Result<(), Self::Error>;
}

/// Processor that changes nothing: identity translation, verbatim
/// recomputation, records dropped on the floor.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGasProcessor;

impl GasProcessor for NoopGasProcessor {
    type Error = core::convert::Infallible;

    fn calc_fn(&self, _contract: &ActorId) -> Result<GasCalcFn, Self::Error> {
        Ok(Arc::new(|_, gas| gas))
    }

    fn recompute(&self, record: GasRecord) -> Result<GasUsage, Self::Error> {
        Ok(record.original_gas)
    }

    fn ingest(&self, _records: &[SessionRecord]) -> Result<(), Self::Error> {
        Ok(())
    }
}
