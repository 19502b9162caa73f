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

//! Scriptable VM, processor and querier doubles.

use crate::{
    engine::TrackingEngine,
    ext::Ext,
    processor::GasProcessor,
    storage::Storage,
    vm::{CallEnv, MessageInfo, Querier, QueryError, Response, Vm},
};
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::cell::RefCell;
use tollgate_core::{
    gas::{Gas, GasUsage},
    ids::{ActorId, CodeId},
    meter::GasCalcFn,
    record::{GasRecord, OperationKind, SessionRecord},
    session::SessionStack,
};

/// In-memory [`Storage`].
#[derive(Clone, Debug, Default)]
pub struct MemStorage(BTreeMap<Vec<u8>, Vec<u8>>);

impl Storage for MemStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.0.insert(key.to_vec(), value.to_vec());
    }

    fn remove(&mut self, key: &[u8]) {
        self.0.remove(key);
    }
}

/// Scripted behavior of one contract in [`MockVm`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CallScript {
    /// Host gas the contract charges for its own work.
    pub host_gas: Gas,
    /// VM gas the call reports.
    pub vm_gas: Gas,
    /// Nested query to dispatch mid-call, as (target, gas limit).
    pub sub_query: Option<(ActorId, Gas)>,
    /// Fail the call after charging and querying.
    pub fail: bool,
}

/// Scripted VM error.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
#[display("{_0}")]
pub struct MockVmError(
    /// The failure message.
    pub String,
);

/// VM double running per-contract scripts.
///
/// Unscripted contracts succeed without charging anything. Every call is
/// logged, failed ones included, so tests can assert what actually ran.
#[derive(Debug, Default)]
pub struct MockVm {
    scripts: BTreeMap<ActorId, CallScript>,
    calls: RefCell<Vec<(ActorId, OperationKind)>>,
}

impl MockVm {
    /// A VM with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behavior of `contract`.
    pub fn with_script(mut self, contract: ActorId, script: CallScript) -> Self {
        self.scripts.insert(contract, script);
        self
    }

    /// Calls dispatched so far, in order.
    pub fn calls(&self) -> Vec<(ActorId, OperationKind)> {
        self.calls.borrow().clone()
    }

    fn run(
        &self,
        contract: ActorId,
        operation: OperationKind,
        ext: &mut Ext<'_>,
    ) -> (Result<(), MockVmError>, Gas) {
        self.calls.borrow_mut().push((contract, operation));

        let script = self.scripts.get(&contract).copied().unwrap_or_default();

        if script.host_gas > 0 {
            if let Err(error) = ext.charge_gas(script.host_gas, "contract work") {
                return (Err(MockVmError(error.to_string())), script.vm_gas);
            }
        }

        if let Some((target, gas_limit)) = script.sub_query {
            if let Err(error) = ext.query_contract(target, b"", gas_limit) {
                return (Err(MockVmError(error.to_string())), script.vm_gas);
            }
        }

        if script.fail {
            return (Err(MockVmError("scripted failure".into())), script.vm_gas);
        }

        (Ok(()), script.vm_gas)
    }

    fn run_response(
        &self,
        contract: ActorId,
        operation: OperationKind,
        ext: &mut Ext<'_>,
    ) -> (Result<Response, MockVmError>, Gas) {
        let (result, gas) = self.run(contract, operation, ext);
        (result.map(|()| Response::empty()), gas)
    }
}

impl Vm for MockVm {
    type Error = MockVmError;

    fn instantiate(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _info: &MessageInfo,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::Instantiate, ext)
    }

    fn execute(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _info: &MessageInfo,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::Execute, ext)
    }

    fn query(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Vec<u8>, Self::Error>, Gas) {
        let (result, gas) = self.run(env.contract, OperationKind::Query, ext);
        (result.map(|()| Vec::new()), gas)
    }

    fn migrate(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::Migrate, ext)
    }

    fn sudo(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::Sudo, ext)
    }

    fn reply(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::Reply, ext)
    }

    fn ibc_channel_open(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcChannelOpen, ext)
    }

    fn ibc_channel_connect(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcChannelConnect, ext)
    }

    fn ibc_channel_close(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcChannelClose, ext)
    }

    fn ibc_packet_receive(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcPacketReceive, ext)
    }

    fn ibc_packet_ack(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcPacketAck, ext)
    }

    fn ibc_packet_timeout(
        &self,
        _code: CodeId,
        env: &CallEnv,
        _msg: &[u8],
        ext: &mut Ext<'_>,
        _gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas) {
        self.run_response(env.contract, OperationKind::IbcPacketTimeout, ext)
    }
}

/// Scripted processor error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
#[display("{_0}")]
pub struct MockProcessorError(
    /// The refusal message.
    pub &'static str,
);

/// Processor double with per-contract multiplier translations.
///
/// Contracts without an explicit factor translate at identity.
/// Recomputation is identity. Ingested record batches are kept for
/// inspection, one batch per root call.
#[derive(Debug, Default)]
pub struct RecordingProcessor {
    factors: BTreeMap<ActorId, u64>,
    ingested: RefCell<Vec<Vec<SessionRecord>>>,
    fail_calc_for: Option<ActorId>,
    fail_recompute: bool,
    fail_ingest: bool,
}

impl RecordingProcessor {
    /// Identity processor recording all ingested batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates `contract` charges by `factor`.
    pub fn with_factor(mut self, contract: ActorId, factor: u64) -> Self {
        self.factors.insert(contract, factor);
        self
    }

    /// Refuses to hand out a calc function for `contract`.
    pub fn with_calc_failure(mut self, contract: ActorId) -> Self {
        self.fail_calc_for = Some(contract);
        self
    }

    /// Fails every recomputation.
    pub fn with_recompute_failure(mut self) -> Self {
        self.fail_recompute = true;
        self
    }

    /// Fails every ingestion.
    pub fn with_ingest_failure(mut self) -> Self {
        self.fail_ingest = true;
        self
    }

    /// Record batches ingested so far.
    pub fn ingested(&self) -> Vec<Vec<SessionRecord>> {
        self.ingested.borrow().clone()
    }
}

impl GasProcessor for RecordingProcessor {
    type Error = MockProcessorError;

    fn calc_fn(&self, contract: &ActorId) -> Result<GasCalcFn, Self::Error> {
        if self.fail_calc_for.as_ref() == Some(contract) {
            return Err(MockProcessorError("no calc function"));
        }

        let factor = self.factors.get(contract).copied().unwrap_or(1);
        Ok(Arc::new(move |_, gas: GasUsage| GasUsage {
            vm: gas.vm * factor,
            host: gas.host * factor,
        }))
    }

    fn recompute(&self, record: GasRecord) -> Result<GasUsage, Self::Error> {
        if self.fail_recompute {
            return Err(MockProcessorError("recompute refused"));
        }

        Ok(record.original_gas)
    }

    fn ingest(&self, records: &[SessionRecord]) -> Result<(), Self::Error> {
        if self.fail_ingest {
            return Err(MockProcessorError("ingest refused"));
        }

        self.ingested.borrow_mut().push(records.to_vec());
        Ok(())
    }
}

/// Querier dispatching nested queries back into an engine.
///
/// Each query runs against a fresh empty store; queries are read-only,
/// so nothing is lost. Gas flows through the shared tracking object the
/// querier is handed on each call.
pub struct EngineQuerier<'e, V, P> {
    engine: &'e TrackingEngine<V, P>,
}

impl<'e, V: Vm, P: GasProcessor> EngineQuerier<'e, V, P> {
    /// Querier re-entering `engine`.
    pub fn new(engine: &'e TrackingEngine<V, P>) -> Self {
        Self { engine }
    }
}

impl<V: Vm, P: GasProcessor> Querier for EngineQuerier<'_, V, P> {
    fn query(
        &mut self,
        tracking: &mut SessionStack,
        contract: ActorId,
        msg: &[u8],
        gas_limit: Gas,
    ) -> Result<Vec<u8>, QueryError> {
        let engine = self.engine;
        let mut store = MemStorage::default();
        let env = CallEnv::new(contract);

        let outcome = engine.query(
            tracking,
            self,
            &mut store,
            CodeId::from(0),
            &env,
            msg,
            gas_limit,
        );

        outcome.result.map_err(Into::into)
    }
}
