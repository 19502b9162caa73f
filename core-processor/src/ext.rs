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

//! Charged host interface handed to the VM.

use crate::{
    configs::StorageCosts,
    storage::Storage,
    vm::{Querier, QueryError},
};
use alloc::vec::Vec;
use tollgate_core::{
    gas::{ChargeError, Gas},
    ids::ActorId,
    session::SessionStack,
};

/// Host functions available to a running contract.
///
/// All resource access is charged on the session's active meter, so the
/// charges flow through the invoked contract's gas translation. Storage
/// charges follow the key-value store pattern: flat cost before the
/// access, per-byte cost on the bytes moved.
pub struct Ext<'a> {
    tracking: &'a mut SessionStack,
    store: &'a mut dyn Storage,
    costs: &'a StorageCosts,
    querier: &'a mut dyn Querier,
}

impl<'a> Ext<'a> {
    pub(crate) fn new(
        tracking: &'a mut SessionStack,
        store: &'a mut dyn Storage,
        costs: &'a StorageCosts,
        querier: &'a mut dyn Querier,
    ) -> Self {
        Self {
            tracking,
            store,
            costs,
            querier,
        }
    }

    /// Charges `amount` of host gas on the active meter.
    pub fn charge_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError> {
        self.tracking.active_meter_mut().consume(amount, descriptor)
    }

    /// Reads `key` from storage.
    ///
    /// The flat cost is charged before the access, the per-byte cost once
    /// the value size is known. A refused flat charge leaves the store
    /// untouched.
    pub fn storage_read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, ChargeError> {
        let flat = self.costs.read_flat;
        self.charge_gas(flat, "storage read flat")?;

        let value = self.store.get(key);

        let bytes = (key.len() + value.as_ref().map_or(0, Vec::len)) as Gas;
        let per_byte = self.costs.read_per_byte.saturating_mul(bytes);
        self.charge_gas(per_byte, "storage read per byte")?;

        Ok(value)
    }

    /// Writes `value` under `key`, charging flat and per-byte costs before
    /// the write.
    pub fn storage_write(&mut self, key: &[u8], value: &[u8]) -> Result<(), ChargeError> {
        let flat = self.costs.write_flat;
        let per_byte = self
            .costs
            .write_per_byte
            .saturating_mul((key.len() + value.len()) as Gas);

        self.charge_gas(flat, "storage write flat")?;
        self.charge_gas(per_byte, "storage write per byte")?;

        self.store.set(key, value);

        Ok(())
    }

    /// Removes `key` from storage, charging the flat delete cost.
    pub fn storage_remove(&mut self, key: &[u8]) -> Result<(), ChargeError> {
        let flat = self.costs.delete_flat;
        self.charge_gas(flat, "storage delete")?;

        self.store.remove(key);

        Ok(())
    }

    /// Dispatches a read-only query into another contract.
    ///
    /// The querier re-enters the engine with this call's tracking object,
    /// so the nested call runs as a session of the current stack.
    pub fn query_contract(
        &mut self,
        contract: ActorId,
        msg: &[u8],
        gas_limit: Gas,
    ) -> Result<Vec<u8>, QueryError> {
        self.querier.query(self.tracking, contract, msg, gas_limit)
    }

    /// Gas left on the active meter.
    pub fn gas_remaining(&self) -> Gas {
        self.tracking.active_meter().remaining()
    }

    /// Gas consumed so far on the active meter.
    pub fn gas_consumed(&self) -> Gas {
        self.tracking.active_meter().consumed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemStorage;
    use alloc::sync::Arc;
    use tollgate_core::{
        gas::{GasCounter, GasUsage},
        meter::{ContractGasMeter, GasCalcFn},
        record::OperationKind,
    };

    struct NoQuerier;

    impl Querier for NoQuerier {
        fn query(
            &mut self,
            _tracking: &mut SessionStack,
            _contract: ActorId,
            _msg: &[u8],
            _gas_limit: Gas,
        ) -> Result<Vec<u8>, QueryError> {
            Err(QueryError::new("queries unsupported"))
        }
    }

    fn doubling() -> GasCalcFn {
        Arc::new(|_, gas: GasUsage| GasUsage {
            vm: gas.vm * 2,
            host: gas.host * 2,
        })
    }

    fn tracked_stack(gas_limit: Gas) -> SessionStack {
        let mut stack = SessionStack::new(GasCounter::new(Gas::MAX));
        let meter =
            ContractGasMeter::new(gas_limit, doubling(), ActorId::from(7), OperationKind::Execute);
        stack.initialize(meter).unwrap();
        stack
    }

    #[test]
    fn reads_charge_flat_then_per_byte() {
        let mut stack = tracked_stack(1_000_000);
        let mut store = MemStorage::default();
        store.set(b"abc", b"value");
        let costs = StorageCosts::default();
        let mut querier = NoQuerier;
        let mut ext = Ext::new(&mut stack, &mut store, &costs, &mut querier);

        let value = ext.storage_read(b"abc").unwrap();
        assert_eq!(value.as_deref(), Some(&b"value"[..]));

        // Flat 1000 + 3 per byte over key (3) and value (5).
        assert_eq!(ext.gas_consumed(), 2 * (1_000 + 3 * 8));

        let missing = ext.storage_read(b"nope").unwrap();
        assert!(missing.is_none());
        assert_eq!(ext.gas_consumed(), 2 * (1_024 + 1_000 + 3 * 4));
    }

    #[test]
    fn writes_and_removes_charge_upfront() {
        let mut stack = tracked_stack(1_000_000);
        let mut store = MemStorage::default();
        let costs = StorageCosts::default();
        let mut querier = NoQuerier;
        let mut ext = Ext::new(&mut stack, &mut store, &costs, &mut querier);

        ext.storage_write(b"k", b"ten_bytes.").unwrap();
        // Flat 2000 + 30 per byte over key (1) and value (10).
        assert_eq!(ext.gas_consumed(), 2 * (2_000 + 30 * 11));
        assert!(store.get(b"k").is_some());

        let mut querier = NoQuerier;
        let mut ext = Ext::new(&mut stack, &mut store, &costs, &mut querier);
        ext.storage_remove(b"k").unwrap();
        assert_eq!(ext.gas_consumed(), 2 * (2_330 + 1_000));
        assert!(store.get(b"k").is_none());
    }

    #[test]
    fn out_of_gas_read_skips_the_store() {
        // Limit below the doubled flat read cost.
        let mut stack = tracked_stack(1_500);
        let mut store = MemStorage::default();
        store.set(b"abc", b"value");
        let costs = StorageCosts::default();
        let mut querier = NoQuerier;
        let mut ext = Ext::new(&mut stack, &mut store, &costs, &mut querier);

        assert_eq!(
            ext.storage_read(b"abc"),
            Err(ChargeError::GasLimitExceeded)
        );
    }

    #[test]
    fn introspection_reads_the_active_meter() {
        let mut stack = tracked_stack(1_000);
        let mut store = MemStorage::default();
        let costs = StorageCosts::default();
        let mut querier = NoQuerier;
        let mut ext = Ext::new(&mut stack, &mut store, &costs, &mut querier);

        ext.charge_gas(100, "work").unwrap();

        assert_eq!(ext.gas_consumed(), 200);
        assert_eq!(ext.gas_remaining(), 800);
    }
}
