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

//! Gas-tracked execution of VM entrypoints.

use crate::{
    common::{CallOutcome, TrackingFailure},
    configs::StorageCosts,
    ext::Ext,
    processor::GasProcessor,
    storage::Storage,
    vm::{CallEnv, MessageInfo, Querier, Response, Vm},
};
use alloc::vec::Vec;
use core::mem;
use tollgate_core::{
    gas::{Gas, GasUsage},
    ids::{ActorId, CodeId},
    meter::ContractGasMeter,
    record::{GasRecord, OperationKind, VmGasRecord},
    session::SessionStack,
};

/// A VM front that meters every entrypoint.
///
/// The engine exposes the same entrypoint set as the wrapped VM, so it
/// drops in wherever the bare VM would be used. Each call runs the same
/// traced sequence: fetch the contract's gas translation from the
/// processor, bind a [`ContractGasMeter`] on the session stack (opening a
/// nested session when tracking is already running), execute the VM with
/// a charged host interface, then recompute the reported VM gas, record
/// it and settle the frame. Root-level calls additionally terminate the
/// session and hand the consolidated records to the processor.
///
/// The caller owns the [`SessionStack`] and threads it through every
/// call, which keeps one execution context per stack without any global
/// state.
#[derive(Debug)]
pub struct TrackingEngine<V, P> {
    vm: V,
    processor: P,
    costs: StorageCosts,
}

impl<V: Vm, P: GasProcessor> TrackingEngine<V, P> {
    /// Creates an engine with default storage costs.
    pub fn new(vm: V, processor: P) -> Self {
        Self::with_costs(vm, processor, StorageCosts::default())
    }

    /// Creates an engine charging storage access per `costs`.
    pub fn with_costs(vm: V, processor: P, costs: StorageCosts) -> Self {
        Self {
            vm,
            processor,
            costs,
        }
    }

    /// Replaces the gas processor, returning the previous one.
    pub fn set_processor(&mut self, processor: P) -> P {
        mem::replace(&mut self.processor, processor)
    }

    /// The wrapped VM.
    pub fn vm(&self) -> &V {
        &self.vm
    }

    /// The active gas processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Storage costs charged by the host interface.
    pub fn costs(&self) -> &StorageCosts {
        &self.costs
    }

    /// Instantiates a new contract from `code`.
    pub fn instantiate(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        info: &MessageInfo,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Instantiate,
            gas_limit,
            |vm, ext, gas_limit| vm.instantiate(code, env, info, msg, ext, gas_limit),
        )
    }

    /// Executes a message on the contract.
    pub fn execute(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        info: &MessageInfo,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Execute,
            gas_limit,
            |vm, ext, gas_limit| vm.execute(code, env, info, msg, ext, gas_limit),
        )
    }

    /// Runs a read-only query against the contract.
    pub fn query(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Vec<u8>, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Query,
            gas_limit,
            |vm, ext, gas_limit| vm.query(code, env, msg, ext, gas_limit),
        )
    }

    /// Migrates the contract to new code.
    pub fn migrate(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Migrate,
            gas_limit,
            |vm, ext, gas_limit| vm.migrate(code, env, msg, ext, gas_limit),
        )
    }

    /// Runs a privileged chain-side call.
    pub fn sudo(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Sudo,
            gas_limit,
            |vm, ext, gas_limit| vm.sudo(code, env, msg, ext, gas_limit),
        )
    }

    /// Delivers a submessage reply to the contract.
    pub fn reply(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::Reply,
            gas_limit,
            |vm, ext, gas_limit| vm.reply(code, env, msg, ext, gas_limit),
        )
    }

    /// Runs the IBC channel open handshake step.
    pub fn ibc_channel_open(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcChannelOpen,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_channel_open(code, env, msg, ext, gas_limit),
        )
    }

    /// Runs the IBC channel connect handshake step.
    pub fn ibc_channel_connect(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcChannelConnect,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_channel_connect(code, env, msg, ext, gas_limit),
        )
    }

    /// Closes an IBC channel.
    pub fn ibc_channel_close(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcChannelClose,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_channel_close(code, env, msg, ext, gas_limit),
        )
    }

    /// Delivers an IBC packet to the contract.
    pub fn ibc_packet_receive(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcPacketReceive,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_packet_receive(code, env, msg, ext, gas_limit),
        )
    }

    /// Delivers an IBC packet acknowledgement to the contract.
    pub fn ibc_packet_ack(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcPacketAck,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_packet_ack(code, env, msg, ext, gas_limit),
        )
    }

    /// Notifies the contract of an IBC packet timeout.
    pub fn ibc_packet_timeout(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        gas_limit: Gas,
    ) -> CallOutcome<Response, V::Error, P::Error> {
        self.run_traced(
            tracking,
            querier,
            store,
            env.contract,
            OperationKind::IbcPacketTimeout,
            gas_limit,
            |vm, ext, gas_limit| vm.ibc_packet_timeout(code, env, msg, ext, gas_limit),
        )
    }

    /// Runs one entrypoint under gas tracking.
    ///
    /// Failures before the VM is invoked abort the call with zero gas.
    /// After the VM ran, bookkeeping failures are composed with the VM
    /// result instead of discarding either side. The reported gas figure
    /// degrades to zero only when recomputation failed; once recomputed
    /// it survives recording and settling failures.
    fn run_traced<R>(
        &self,
        tracking: &mut SessionStack,
        querier: &mut dyn Querier,
        store: &mut dyn Storage,
        contract: ActorId,
        operation: OperationKind,
        gas_limit: Gas,
        call: impl FnOnce(&V, &mut Ext<'_>, Gas) -> (Result<R, V::Error>, Gas),
    ) -> CallOutcome<R, V::Error, P::Error> {
        let calc_fn = match self.processor.calc_fn(&contract) {
            Ok(calc_fn) => calc_fn,
            Err(error) => {
                log::debug!("No calc function for {contract}: {error}");
                return CallOutcome::aborted(TrackingFailure::Processor(error));
            }
        };

        let meter = ContractGasMeter::new(gas_limit, calc_fn, contract, operation);

        let nested = tracking.is_active();
        let opened = if nested {
            tracking
                .create_session(gas_limit)
                .and_then(|()| tracking.associate_meter(meter))
        } else {
            tracking.initialize(meter)
        };
        if let Err(error) = opened {
            return CallOutcome::aborted(TrackingFailure::Session(error));
        }

        log::trace!("{operation:?} dispatched to {contract} with gas limit {gas_limit}");

        let mut ext = Ext::new(tracking, store, &self.costs, querier);
        let (vm_result, vm_gas) = call(&self.vm, &mut ext, gas_limit);

        let record = GasRecord {
            operation,
            contract,
            original_gas: GasUsage::from_vm(vm_gas),
        };
        let (actual_vm_gas, mut failure) = match self.processor.recompute(record) {
            Ok(usage) => (usage.total(), None),
            Err(error) => (0, Some(TrackingFailure::Processor(error))),
        };

        // The frame is closed even when recomputation failed, with a zeroed
        // actual figure, so the stack stays usable.
        let vm_record = VmGasRecord {
            original: vm_gas,
            actual: actual_vm_gas,
        };
        if let Err(error) = tracking.add_vm_record(vm_record) {
            if failure.is_none() {
                failure = Some(TrackingFailure::Session(error));
            }
        }

        let settled = if nested {
            tracking.destroy_session().map_err(TrackingFailure::Session)
        } else {
            match tracking.terminate() {
                Ok(records) => self
                    .processor
                    .ingest(&records)
                    .map_err(TrackingFailure::Processor),
                Err(error) => Err(TrackingFailure::Session(error)),
            }
        };
        if let Err(error) = settled {
            log::debug!("Settling {operation:?} on {contract} failed: {error}");
            if failure.is_none() {
                failure = Some(error);
            }
        }

        CallOutcome::settle(vm_result, failure, actual_vm_gas)
    }
}
