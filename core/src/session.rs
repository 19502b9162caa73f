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

//! Session tracking for nested contract calls.
//!
//! A [`SessionStack`] mirrors the synchronous call stack of one top-level
//! contract execution. Each frame carries the meter billing for the contract
//! that runs in it, plus optionally the meter of its caller, so finished
//! frames can be settled onto the root meter and reported per contract and
//! operation.

use crate::{
    gas::{ChargeError, Gas, GasMeter},
    meter::ContractGasMeter,
    record::{SessionRecord, VmGasRecord},
};
use alloc::{boxed::Box, vec::Vec};
use core::mem;

/// Session state machine error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum SessionError {
    /// Gas tracking is already running for this execution context.
    #[display("Gas tracking is already initialized")]
    AlreadyInitialized,
    /// No gas tracking is running.
    #[display("Gas tracking is not initialized")]
    NotInitialized,
    /// The operation needs an open call frame but none is left.
    #[display("No active call session")]
    NoActiveSession,
    /// The current frame already has a contract meter bound.
    #[display("A contract meter is associated already")]
    AlreadyAssociated,
    /// The current frame has no contract meter bound.
    #[display("No contract meter is associated with the current session")]
    MeterNotAssociated,
    /// VM gas was already recorded for the current frame.
    #[display("VM gas is already recorded for the current session")]
    VmGasAlreadyRecorded,
    /// The frame is being closed without its VM gas recorded.
    #[display("VM gas is not recorded for the current session")]
    VmGasNotRecorded,
    /// Terminate found nested sessions still open.
    #[display("Multiple sessions are still active")]
    NestedSessionsOpen,
    /// Charging settled gas onto the root meter failed.
    #[display("Root meter charge failed: {_0}")]
    RootCharge(ChargeError),
}

/// Progress of the invoked side of a frame.
#[derive(Debug)]
enum InvokedState {
    /// Frame opened for a sub-call, no contract meter bound yet.
    Empty,
    /// Contract meter bound, VM gas not yet reported.
    MeterAssigned { meter: ContractGasMeter },
    /// VM gas reported, the frame is ready to close.
    GasRecorded {
        meter: ContractGasMeter,
        vm_gas: VmGasRecord,
    },
}

/// One level of contract call nesting.
#[derive(Debug)]
struct Frame {
    /// Meter of the calling side, billing the dispatch overhead of the
    /// sub-call. Present on frames opened by [`SessionStack::create_session`].
    invoker: Option<ContractGasMeter>,
    invoked: InvokedState,
}

/// Gas tracking state for one execution context.
///
/// Owned by the caller and threaded through the engine explicitly. After a
/// successful [`terminate`](Self::terminate) the stack returns to the idle
/// state with its root meter retained, ready for the next top-level call.
#[derive(Debug)]
pub struct SessionStack {
    root: Box<dyn GasMeter>,
    frames: Vec<Frame>,
    records: Vec<SessionRecord>,
    active: bool,
}

impl SessionStack {
    /// Creates an idle stack settling onto `root`.
    pub fn new(root: impl GasMeter + 'static) -> Self {
        Self {
            root: Box::new(root),
            frames: Vec::new(),
            records: Vec::new(),
            active: false,
        }
    }

    /// Whether a tracking session is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The meter charges are routed to right now: the current frame's
    /// invoked meter if assigned, else its invoker meter, else the root.
    pub fn active_meter(&self) -> &dyn GasMeter {
        if let Some(frame) = self.frames.last() {
            match &frame.invoked {
                InvokedState::MeterAssigned { meter }
                | InvokedState::GasRecorded { meter, .. } => return meter,
                InvokedState::Empty => {
                    if let Some(invoker) = &frame.invoker {
                        return invoker;
                    }
                }
            }
        }

        self.root.as_ref()
    }

    /// Mutable access to the active meter.
    pub fn active_meter_mut(&mut self) -> &mut dyn GasMeter {
        if let Some(frame) = self.frames.last_mut() {
            match &mut frame.invoked {
                InvokedState::MeterAssigned { meter }
                | InvokedState::GasRecorded { meter, .. } => return meter,
                InvokedState::Empty => {
                    if let Some(invoker) = &mut frame.invoker {
                        return invoker;
                    }
                }
            }
        }

        self.root.as_mut()
    }

    /// The meter all finished frames settle onto.
    pub fn root_meter(&self) -> &dyn GasMeter {
        self.root.as_ref()
    }

    /// Consumes the stack, returning the root meter.
    pub fn into_root(self) -> Box<dyn GasMeter> {
        self.root
    }

    /// Starts tracking with `meter` billing for the top-level contract.
    pub fn initialize(&mut self, meter: ContractGasMeter) -> Result<(), SessionError> {
        if self.active {
            return Err(SessionError::AlreadyInitialized);
        }

        log::trace!(
            "Gas tracking initialized for {} ({:?})",
            meter.contract(),
            meter.operation()
        );

        self.frames.push(Frame {
            invoker: None,
            invoked: InvokedState::MeterAssigned { meter },
        });
        self.active = true;

        Ok(())
    }

    /// Opens a frame for a sub-call with `gas_limit`, billing its dispatch
    /// overhead on a fresh clone of the current contract meter.
    pub fn create_session(&mut self, gas_limit: Gas) -> Result<(), SessionError> {
        self.ensure_active()?;

        let current = self.frames.last().ok_or(SessionError::NoActiveSession)?;
        let invoker = match &current.invoked {
            InvokedState::MeterAssigned { meter } | InvokedState::GasRecorded { meter, .. } => {
                meter.clone_with_limit(gas_limit)
            }
            InvokedState::Empty => return Err(SessionError::MeterNotAssociated),
        };

        self.frames.push(Frame {
            invoker: Some(invoker),
            invoked: InvokedState::Empty,
        });

        Ok(())
    }

    /// Binds the meter of the contract running in the current frame.
    pub fn associate_meter(&mut self, meter: ContractGasMeter) -> Result<(), SessionError> {
        self.ensure_active()?;

        let frame = self.frames.last_mut().ok_or(SessionError::NoActiveSession)?;
        match frame.invoked {
            InvokedState::Empty => {
                log::trace!(
                    "Meter associated for {} ({:?})",
                    meter.contract(),
                    meter.operation()
                );
                frame.invoked = InvokedState::MeterAssigned { meter };
                Ok(())
            }
            _ => Err(SessionError::AlreadyAssociated),
        }
    }

    /// Records the VM-reported gas of the current frame, original and
    /// recomputed actual.
    pub fn add_vm_record(&mut self, vm_gas: VmGasRecord) -> Result<(), SessionError> {
        self.ensure_active()?;

        let frame = self.frames.last_mut().ok_or(SessionError::NoActiveSession)?;
        match mem::replace(&mut frame.invoked, InvokedState::Empty) {
            InvokedState::MeterAssigned { meter } => {
                frame.invoked = InvokedState::GasRecorded { meter, vm_gas };
                Ok(())
            }
            state @ InvokedState::GasRecorded { .. } => {
                frame.invoked = state;
                Err(SessionError::VmGasAlreadyRecorded)
            }
            InvokedState::Empty => Err(SessionError::MeterNotAssociated),
        }
    }

    /// Closes the current frame, settling its gas onto the root meter.
    pub fn destroy_session(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.close_top_frame()
    }

    /// Ends tracking: closes the sole remaining frame, consolidates the
    /// accumulated records by contract and operation, clears state and
    /// returns the consolidated records.
    pub fn terminate(&mut self) -> Result<Vec<SessionRecord>, SessionError> {
        self.ensure_active()?;

        match self.frames.len() {
            0 => return Err(SessionError::NoActiveSession),
            1 => {}
            _ => return Err(SessionError::NestedSessionsOpen),
        }

        self.close_top_frame()?;
        self.active = false;

        let consolidated = consolidate(mem::take(&mut self.records));

        log::debug!(
            "Gas tracking terminated: {} consolidated records, root meter at {}",
            consolidated.len(),
            self.root.consumed()
        );

        Ok(consolidated)
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.active {
            Ok(())
        } else {
            Err(SessionError::NotInitialized)
        }
    }

    /// Pops the top frame and settles it: the invoked meter's consumed gas,
    /// the frame's actual VM gas and the invoker meter's consumed gas all
    /// charge the root meter; one record is appended per present meter.
    ///
    /// Validation happens before the pop so a refused close leaves the
    /// stack intact.
    fn close_top_frame(&mut self) -> Result<(), SessionError> {
        let top = self.frames.last().ok_or(SessionError::NoActiveSession)?;
        if let InvokedState::MeterAssigned { .. } = top.invoked {
            return Err(SessionError::VmGasNotRecorded);
        }

        let frame = self.frames.pop().ok_or(SessionError::NoActiveSession)?;

        if let InvokedState::GasRecorded { meter, vm_gas } = frame.invoked {
            self.root
                .consume(meter.consumed(), "contract call")
                .map_err(SessionError::RootCharge)?;
            self.root
                .consume(vm_gas.actual, "contract vm gas")
                .map_err(SessionError::RootCharge)?;

            log::trace!(
                "Session closed for {} ({:?}): host gas {}/{}, vm gas {}/{}",
                meter.contract(),
                meter.operation(),
                meter.original_gas(),
                meter.actual_gas(),
                vm_gas.original,
                vm_gas.actual
            );

            self.records.push(SessionRecord {
                actual_host_gas: meter.actual_gas(),
                original_host_gas: meter.original_gas(),
                actual_vm_gas: vm_gas.actual,
                original_vm_gas: vm_gas.original,
                contract: meter.contract(),
                operation: meter.operation(),
                description: "invoked",
            });
        }

        if let Some(invoker) = frame.invoker {
            self.root
                .consume(invoker.consumed(), "call dispatch")
                .map_err(SessionError::RootCharge)?;

            self.records.push(SessionRecord {
                actual_host_gas: invoker.actual_gas(),
                original_host_gas: invoker.original_gas(),
                actual_vm_gas: 0,
                original_vm_gas: 0,
                contract: invoker.contract(),
                operation: invoker.operation(),
                description: "invoker",
            });
        }

        Ok(())
    }
}

/// Merges records sharing a `(contract, operation)` key, summing the four
/// gas fields element-wise. First-seen key order is preserved; merged
/// records lose their description.
fn consolidate(records: Vec<SessionRecord>) -> Vec<SessionRecord> {
    let mut merged: Vec<SessionRecord> = Vec::with_capacity(records.len());

    for record in records {
        let existing = merged
            .iter_mut()
            .find(|m| m.contract == record.contract && m.operation == record.operation);

        match existing {
            Some(existing) => {
                existing.actual_host_gas =
                    existing.actual_host_gas.saturating_add(record.actual_host_gas);
                existing.original_host_gas = existing
                    .original_host_gas
                    .saturating_add(record.original_host_gas);
                existing.actual_vm_gas =
                    existing.actual_vm_gas.saturating_add(record.actual_vm_gas);
                existing.original_vm_gas =
                    existing.original_vm_gas.saturating_add(record.original_vm_gas);
                existing.description = "";
            }
            None => merged.push(record),
        }
    }

    merged
}
