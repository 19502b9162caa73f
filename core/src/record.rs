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

//! Gas accounting records.

use crate::{
    gas::{Gas, GasUsage},
    ids::ActorId,
};
use enum_iterator::Sequence;
use scale_info::{
    TypeInfo,
    scale::{Decode, Encode},
};

/// The kind of contract entrypoint a charge is attributed to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence, Encode, Decode, TypeInfo)]
pub enum OperationKind {
    /// Contract instantiation.
    Instantiate,
    /// Message execution.
    Execute,
    /// Read-only query.
    Query,
    /// Code migration.
    Migrate,
    /// Privileged chain-side call.
    Sudo,
    /// Submessage reply delivery.
    Reply,
    /// IBC channel open handshake step.
    IbcChannelOpen,
    /// IBC channel connect handshake step.
    IbcChannelConnect,
    /// IBC channel close.
    IbcChannelClose,
    /// IBC packet delivery.
    IbcPacketReceive,
    /// IBC packet acknowledgement.
    IbcPacketAck,
    /// IBC packet timeout.
    IbcPacketTimeout,
    /// Attribution fallback.
    Unknown,
}

/// Input to a gas translation or billing computation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, TypeInfo)]
pub struct GasRecord {
    /// Entrypoint the gas was burned in.
    pub operation: OperationKind,
    /// Contract the gas was burned by.
    pub contract: ActorId,
    /// Pre-translation gas figures.
    pub original_gas: GasUsage,
}

/// VM-reported gas for one call frame, before and after recomputation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VmGasRecord {
    /// Gas as reported by the VM.
    pub original: Gas,
    /// Gas after the processor's recomputation.
    pub actual: Gas,
}

/// Completed accounting for one call frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionRecord {
    /// Host gas charged after translation.
    pub actual_host_gas: Gas,
    /// Host gas as requested before translation.
    pub original_host_gas: Gas,
    /// VM gas after recomputation.
    pub actual_vm_gas: Gas,
    /// VM gas as reported by the VM.
    pub original_vm_gas: Gas,
    /// Contract the frame belongs to.
    pub contract: ActorId,
    /// Entrypoint the frame ran.
    pub operation: OperationKind,
    pub(crate) description: &'static str,
}

impl SessionRecord {
    /// Which side of a frame produced this record: `"invoked"` for the
    /// contract that ran, `"invoker"` for its caller's dispatch overhead,
    /// empty once records have been merged.
    pub fn description(&self) -> &'static str {
        self.description
    }
}
