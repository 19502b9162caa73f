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

//! Common outcome and error types for traced calls.

use tollgate_core::{gas::Gas, session::SessionError};

/// Gas bookkeeping failure around a VM call.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum TrackingFailure<P> {
    /// The session stack refused an operation.
    #[display("session error: {_0}")]
    Session(SessionError),
    /// The gas processor failed.
    #[display("gas processor error: {_0}")]
    Processor(P),
}

/// Failure of a traced VM invocation.
///
/// A VM error and a tracking failure arising in the same call are both
/// preserved; a lone error stays unwrapped.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Display)]
pub enum CallError<V, P> {
    /// The contract call itself failed.
    #[display("{_0}")]
    Vm(V),
    /// Only the gas bookkeeping failed.
    #[display("{_0}")]
    Tracking(TrackingFailure<P>),
    /// Both failed on the same call.
    #[display("vm error: {vm}; {tracking}")]
    VmAndTracking {
        /// The VM-side error.
        vm: V,
        /// The bookkeeping failure.
        tracking: TrackingFailure<P>,
    },
}

impl<V, P> CallError<V, P> {
    /// The VM-side error, if any.
    pub fn vm_error(&self) -> Option<&V> {
        match self {
            Self::Vm(vm) | Self::VmAndTracking { vm, .. } => Some(vm),
            Self::Tracking(_) => None,
        }
    }

    /// The bookkeeping failure, if any.
    pub fn tracking_failure(&self) -> Option<&TrackingFailure<P>> {
        match self {
            Self::Tracking(tracking) | Self::VmAndTracking { tracking, .. } => Some(tracking),
            Self::Vm(_) => None,
        }
    }
}

/// Outcome of one traced entrypoint call.
///
/// The gas figure survives failures: whatever the VM reported flows through
/// recomputation into `vm_gas_used` even when `result` is an error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallOutcome<R, V, P> {
    /// The call result; composite on double failure.
    pub result: Result<R, CallError<V, P>>,
    /// Best-known actual VM gas for the call.
    pub vm_gas_used: Gas,
}

impl<R, V, P> CallOutcome<R, V, P> {
    /// Outcome of a call aborted before the VM was invoked.
    pub(crate) fn aborted(failure: TrackingFailure<P>) -> Self {
        Self {
            result: Err(CallError::Tracking(failure)),
            vm_gas_used: 0,
        }
    }

    /// Combines the VM result with an optional bookkeeping failure.
    pub(crate) fn settle(
        vm_result: Result<R, V>,
        tracking: Option<TrackingFailure<P>>,
        vm_gas_used: Gas,
    ) -> Self {
        let result = match (vm_result, tracking) {
            (Ok(value), None) => Ok(value),
            (Ok(_), Some(tracking)) => Err(CallError::Tracking(tracking)),
            (Err(vm), None) => Err(CallError::Vm(vm)),
            (Err(vm), Some(tracking)) => Err(CallError::VmAndTracking { vm, tracking }),
        };

        Self {
            result,
            vm_gas_used,
        }
    }
}
