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

use crate::{
    TrackingEngine,
    common::{CallError, TrackingFailure},
    mock::{
        CallScript, EngineQuerier, MemStorage, MockProcessorError, MockVm, MockVmError,
        RecordingProcessor,
    },
    vm::{CallEnv, MessageInfo, Querier, QueryError},
};
use alloc::{vec, vec::Vec};
use tollgate_core::{
    gas::{Gas, GasCounter},
    ids::{ActorId, CodeId},
    record::{OperationKind, VmGasRecord},
    session::{SessionError, SessionStack},
};

const GAS: Gas = 1_000_000;

fn stack() -> SessionStack {
    SessionStack::new(GasCounter::new(Gas::MAX))
}

fn code() -> CodeId {
    CodeId::from(9)
}

/// Answers queries outside the engine and attributes the VM gas it thinks
/// the answer cost to the calling frame.
struct ShortcutQuerier;

impl Querier for ShortcutQuerier {
    fn query(
        &mut self,
        tracking: &mut SessionStack,
        _contract: ActorId,
        _msg: &[u8],
        _gas_limit: Gas,
    ) -> Result<Vec<u8>, QueryError> {
        tracking
            .add_vm_record(VmGasRecord {
                original: 3,
                actual: 4,
            })
            .unwrap();
        Ok(Vec::new())
    }
}

#[test]
fn root_call_bills_host_and_vm_gas() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            vm_gas: 100,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.instantiate(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"init",
        GAS,
    );

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.vm_gas_used, 100);
    assert_eq!(tracking.root_meter().consumed(), 110);
    assert!(!tracking.is_active());

    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    let record = &batches[0][0];
    assert_eq!(record.contract, a);
    assert_eq!(record.operation, OperationKind::Instantiate);
    assert_eq!(record.original_host_gas, 10);
    assert_eq!(record.actual_host_gas, 10);
    assert_eq!(record.original_vm_gas, 100);
    assert_eq!(record.actual_vm_gas, 100);
    assert_eq!(record.description(), "invoked");
}

#[test]
fn nested_queries_consolidate_per_contract() {
    let a = ActorId::from(1);
    let b = ActorId::from(2);
    let c = ActorId::from(3);

    // A does 10 of its own work and queries B; B does 20 and queries C;
    // C does 5. Translation is identity for A, x2 for B, x3 for C. The
    // root call reports 100 VM gas under identity recomputation.
    let vm = MockVm::new()
        .with_script(
            a,
            CallScript {
                host_gas: 10,
                vm_gas: 100,
                sub_query: Some((b, 500_000)),
                ..Default::default()
            },
        )
        .with_script(
            b,
            CallScript {
                host_gas: 20,
                sub_query: Some((c, 400_000)),
                ..Default::default()
            },
        )
        .with_script(
            c,
            CallScript {
                host_gas: 5,
                ..Default::default()
            },
        );
    let processor = RecordingProcessor::new()
        .with_factor(b, 2)
        .with_factor(c, 3);
    let engine = TrackingEngine::new(vm, processor);

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.instantiate(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"init",
        GAS,
    );

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.vm_gas_used, 100);

    // 15 for C, 40 for B, 10 + 100 for A.
    assert_eq!(tracking.root_meter().consumed(), 165);

    assert_eq!(
        engine.vm().calls(),
        vec![
            (a, OperationKind::Instantiate),
            (b, OperationKind::Query),
            (c, OperationKind::Query),
        ]
    );

    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    let records = &batches[0];
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].contract, c);
    assert_eq!(records[0].operation, OperationKind::Query);
    assert_eq!(records[0].original_host_gas, 5);
    assert_eq!(records[0].actual_host_gas, 15);

    // B's own frame merged with the dispatch clone from C's frame.
    assert_eq!(records[1].contract, b);
    assert_eq!(records[1].operation, OperationKind::Query);
    assert_eq!(records[1].original_host_gas, 20);
    assert_eq!(records[1].actual_host_gas, 40);
    assert_eq!(records[1].description(), "");

    assert_eq!(records[2].contract, a);
    assert_eq!(records[2].operation, OperationKind::Instantiate);
    assert_eq!(records[2].original_host_gas, 10);
    assert_eq!(records[2].actual_host_gas, 10);
    assert_eq!(records[2].original_vm_gas, 100);
    assert_eq!(records[2].actual_vm_gas, 100);
}

#[test]
fn entrypoints_run_under_their_operation_kind() {
    let contract = ActorId::from(4);
    let engine = TrackingEngine::new(MockVm::new(), RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();
    let env = CallEnv::new(contract);
    let info = MessageInfo::default();

    engine.instantiate(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &env,
        &info,
        b"",
        GAS,
    );
    engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &env,
        &info,
        b"",
        GAS,
    );
    engine.query(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.migrate(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.sudo(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.reply(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_channel_open(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_channel_connect(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_channel_close(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_packet_receive(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_packet_ack(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);
    engine.ibc_packet_timeout(&mut tracking, &mut querier, &mut store, code(), &env, b"", GAS);

    let kinds: Vec<_> = engine
        .vm()
        .calls()
        .into_iter()
        .map(|(_, kind)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Instantiate,
            OperationKind::Execute,
            OperationKind::Query,
            OperationKind::Migrate,
            OperationKind::Sudo,
            OperationKind::Reply,
            OperationKind::IbcChannelOpen,
            OperationKind::IbcChannelConnect,
            OperationKind::IbcChannelClose,
            OperationKind::IbcPacketReceive,
            OperationKind::IbcPacketAck,
            OperationKind::IbcPacketTimeout,
        ]
    );

    // The context went idle after each call and was reused for the next.
    assert!(!tracking.is_active());
    assert_eq!(engine.processor().ingested().len(), 12);
}

#[test]
fn vm_failure_still_bills_gas() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 30,
            vm_gas: 70,
            fail: true,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::Vm(MockVmError("scripted failure".into())))
    );
    assert_eq!(outcome.vm_gas_used, 70);
    assert_eq!(tracking.root_meter().consumed(), 100);

    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].actual_host_gas, 30);
    assert_eq!(batches[0][0].actual_vm_gas, 70);
}

#[test]
fn out_of_gas_contract_is_billed_what_it_burned() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 50,
            vm_gas: 5,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        40,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::Vm(MockVmError("Gas limit exceeded".into())))
    );
    assert_eq!(outcome.vm_gas_used, 5);
    // The failing charge stays on the contract's counter and settles onto
    // the root meter with the reported VM gas.
    assert_eq!(tracking.root_meter().consumed(), 55);
    assert!(!tracking.is_active());
}

#[test]
fn ingest_failure_surfaces_after_a_clean_call() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            vm_gas: 20,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new().with_ingest_failure());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::Tracking(TrackingFailure::Processor(
            MockProcessorError("ingest refused")
        )))
    );
    // The gas figure survives a billing-sink failure.
    assert_eq!(outcome.vm_gas_used, 20);
    assert_eq!(tracking.root_meter().consumed(), 30);
}

#[test]
fn vm_and_tracking_failures_compose() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            vm_gas: 20,
            fail: true,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new().with_ingest_failure());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::VmAndTracking {
            vm: MockVmError("scripted failure".into()),
            tracking: TrackingFailure::Processor(MockProcessorError("ingest refused")),
        })
    );
    assert_eq!(outcome.vm_gas_used, 20);
    assert_eq!(tracking.root_meter().consumed(), 30);
}

#[test]
fn calc_failure_aborts_before_the_vm() {
    let a = ActorId::from(1);
    let engine = TrackingEngine::new(
        MockVm::new(),
        RecordingProcessor::new().with_calc_failure(a),
    );

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.query(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        b"peek",
        GAS,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::Tracking(TrackingFailure::Processor(
            MockProcessorError("no calc function")
        )))
    );
    assert_eq!(outcome.vm_gas_used, 0);
    assert!(engine.vm().calls().is_empty());
    assert_eq!(tracking.root_meter().consumed(), 0);
    assert!(!tracking.is_active());
}

#[test]
fn recompute_failure_zeroes_reported_gas() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            vm_gas: 90,
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new().with_recompute_failure());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    assert_eq!(
        outcome.result,
        Err(CallError::Tracking(TrackingFailure::Processor(
            MockProcessorError("recompute refused")
        )))
    );
    assert_eq!(outcome.vm_gas_used, 0);

    // The session still settles, with the unknown VM figure zeroed: only
    // the host-side 10 reaches the root meter.
    assert_eq!(tracking.root_meter().consumed(), 10);
    assert!(!tracking.is_active());

    let batches = engine.processor().ingested();
    assert_eq!(batches[0][0].original_vm_gas, 90);
    assert_eq!(batches[0][0].actual_vm_gas, 0);
}

#[test]
fn record_clash_keeps_the_recomputed_gas() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            vm_gas: 50,
            sub_query: Some((ActorId::from(2), 1_000)),
            ..Default::default()
        },
    );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = ShortcutQuerier;
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    // The querier already recorded VM gas for the frame, so the engine's
    // own record is refused.
    assert_eq!(
        outcome.result,
        Err(CallError::Tracking(TrackingFailure::Session(
            SessionError::VmGasAlreadyRecorded
        )))
    );
    // The figure recomputed from the VM report is kept, not zeroed.
    assert_eq!(outcome.vm_gas_used, 50);

    // The frame settled with the gas the querier attributed to it.
    assert_eq!(tracking.root_meter().consumed(), 14);
    assert!(!tracking.is_active());

    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].original_vm_gas, 3);
    assert_eq!(batches[0][0].actual_vm_gas, 4);
}

#[test]
fn processor_swap_changes_billing() {
    let a = ActorId::from(1);
    let vm = MockVm::new().with_script(
        a,
        CallScript {
            host_gas: 10,
            ..Default::default()
        },
    );
    let mut engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut store = MemStorage::default();

    let mut querier = EngineQuerier::new(&engine);
    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );
    assert!(outcome.result.is_ok());
    assert_eq!(tracking.root_meter().consumed(), 10);

    let old = engine.set_processor(RecordingProcessor::new().with_factor(a, 2));
    assert_eq!(old.ingested().len(), 1);

    let mut querier = EngineQuerier::new(&engine);
    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );
    assert!(outcome.result.is_ok());

    // Same work, now billed at x2 by the replacement processor.
    assert_eq!(tracking.root_meter().consumed(), 30);
    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].actual_host_gas, 20);
    assert_eq!(batches[0][0].original_host_gas, 10);
}

#[test]
fn nested_failure_reaches_the_calling_contract() {
    let a = ActorId::from(1);
    let b = ActorId::from(2);
    let vm = MockVm::new()
        .with_script(
            a,
            CallScript {
                host_gas: 10,
                sub_query: Some((b, 100_000)),
                ..Default::default()
            },
        )
        .with_script(
            b,
            CallScript {
                host_gas: 7,
                fail: true,
                ..Default::default()
            },
        );
    let engine = TrackingEngine::new(vm, RecordingProcessor::new());

    let mut tracking = stack();
    let mut querier = EngineQuerier::new(&engine);
    let mut store = MemStorage::default();

    let outcome = engine.execute(
        &mut tracking,
        &mut querier,
        &mut store,
        code(),
        &CallEnv::new(a),
        &MessageInfo::default(),
        b"do",
        GAS,
    );

    // A surfaces the nested failure as its own error; B's work stays
    // billed regardless.
    assert_eq!(
        outcome.result,
        Err(CallError::Vm(MockVmError("scripted failure".into())))
    );
    assert_eq!(tracking.root_meter().consumed(), 17);

    let batches = engine.processor().ingested();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0].contract, b);
    assert_eq!(batches[0][0].actual_host_gas, 7);
    assert_eq!(batches[0][1].contract, a);
    assert_eq!(batches[0][1].actual_host_gas, 10);
}
