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

//! Per-contract translating gas meter.

use crate::{
    gas::{ChargeError, Gas, GasCounter, GasMeter, GasUsage},
    ids::ActorId,
    record::OperationKind,
};
use alloc::sync::Arc;
use core::fmt;

/// Gas translation function.
///
/// Maps the gas a contract requests to the gas its caller is billed for,
/// given the entrypoint kind. Shared between a meter and its clones.
pub type GasCalcFn = Arc<dyn Fn(OperationKind, GasUsage) -> GasUsage + Send + Sync>;

/// A gas meter billing on behalf of one contract.
///
/// Every charge is translated through the contract's calc function before it
/// reaches the wrapped counter. The meter keeps both totals: `original` is
/// the sum of requested amounts, `actual` the sum of translated ones.
pub struct ContractGasMeter {
    inner: GasCounter,
    original_gas: Gas,
    actual_gas: Gas,
    contract: ActorId,
    operation: OperationKind,
    calc_fn: GasCalcFn,
}

impl ContractGasMeter {
    /// Creates a meter for `contract` running `operation` under `gas_limit`.
    pub fn new(
        gas_limit: Gas,
        calc_fn: GasCalcFn,
        contract: ActorId,
        operation: OperationKind,
    ) -> Self {
        Self {
            inner: GasCounter::new(gas_limit),
            original_gas: 0,
            actual_gas: 0,
            contract,
            operation,
            calc_fn,
        }
    }

    /// Fresh meter for the same contract and operation, zeroed counters,
    /// enforcing `gas_limit`.
    pub fn clone_with_limit(&self, gas_limit: Gas) -> Self {
        Self {
            inner: GasCounter::new(gas_limit),
            original_gas: 0,
            actual_gas: 0,
            contract: self.contract,
            operation: self.operation,
            calc_fn: Arc::clone(&self.calc_fn),
        }
    }

    /// Contract this meter bills for.
    pub fn contract(&self) -> ActorId {
        self.contract
    }

    /// Entrypoint kind this meter bills under.
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Sum of requested amounts, before translation.
    pub fn original_gas(&self) -> Gas {
        self.original_gas
    }

    /// Sum of charged amounts, after translation.
    pub fn actual_gas(&self) -> Gas {
        self.actual_gas
    }
}

impl GasMeter for ContractGasMeter {
    fn consume(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError> {
        let updated = (self.calc_fn)(self.operation, GasUsage::from_host(amount));

        let original = self
            .original_gas
            .checked_add(amount)
            .ok_or(ChargeError::GasOverflow)?;
        let actual = self
            .actual_gas
            .checked_add(updated.host)
            .ok_or(ChargeError::GasOverflow)?;

        self.inner.consume(updated.host, descriptor)?;

        self.original_gas = original;
        self.actual_gas = actual;

        Ok(())
    }

    fn refund(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError> {
        let updated = (self.calc_fn)(self.operation, GasUsage::from_host(amount));

        let original = self
            .original_gas
            .checked_sub(amount)
            .ok_or(ChargeError::RefundExceedsConsumed)?;
        let actual = self
            .actual_gas
            .checked_sub(updated.host)
            .ok_or(ChargeError::RefundExceedsConsumed)?;

        self.inner.refund(updated.host, descriptor)?;

        self.original_gas = original;
        self.actual_gas = actual;

        Ok(())
    }

    fn consumed(&self) -> Gas {
        self.inner.consumed()
    }

    fn limit(&self) -> Gas {
        self.inner.limit()
    }
}

impl fmt::Debug for ContractGasMeter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ContractGasMeter")
            .field("contract", &self.contract)
            .field("operation", &self.operation)
            .field("original_gas", &self.original_gas)
            .field("actual_gas", &self.actual_gas)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn multiplier(factor: u64) -> GasCalcFn {
        Arc::new(move |_, gas: GasUsage| GasUsage {
            vm: gas.vm * factor,
            host: gas.host * factor,
        })
    }

    fn meter(factor: u64, limit: Gas) -> ContractGasMeter {
        ContractGasMeter::new(
            limit,
            multiplier(factor),
            ActorId::from(1),
            OperationKind::Execute,
        )
    }

    #[test]
    fn charges_are_translated() {
        let mut meter = meter(2, 1_000);

        meter.consume(10, "work").unwrap();
        meter.consume(15, "more work").unwrap();

        assert_eq!(meter.original_gas(), 25);
        assert_eq!(meter.actual_gas(), 50);
        assert_eq!(meter.consumed(), 50);
    }

    #[test]
    fn refund_reverses_translation() {
        let mut meter = meter(3, 1_000);

        meter.consume(30, "work").unwrap();
        meter.refund(10, "rollback").unwrap();

        assert_eq!(meter.original_gas(), 20);
        assert_eq!(meter.actual_gas(), 60);
        assert_eq!(meter.consumed(), 60);
    }

    #[test]
    fn refund_underflow_is_rejected() {
        let mut meter = meter(2, 1_000);

        meter.consume(5, "work").unwrap();
        assert_eq!(
            meter.refund(6, "rollback"),
            Err(ChargeError::RefundExceedsConsumed)
        );

        assert_eq!(meter.original_gas(), 5);
        assert_eq!(meter.actual_gas(), 10);
    }

    #[test]
    fn failed_charge_leaves_totals_untouched() {
        let mut meter = meter(2, 100);

        assert_eq!(
            meter.consume(60, "too much"),
            Err(ChargeError::GasLimitExceeded)
        );

        assert_eq!(meter.original_gas(), 0);
        assert_eq!(meter.actual_gas(), 0);
        // The wrapped counter keeps the failing charge, like any base meter.
        assert!(meter.is_past_limit());
    }

    #[test]
    fn clone_resets_counters() {
        let mut meter = meter(2, 1_000);
        meter.consume(10, "work").unwrap();

        let clone = meter.clone_with_limit(500);

        assert_eq!(clone.original_gas(), 0);
        assert_eq!(clone.actual_gas(), 0);
        assert_eq!(clone.limit(), 500);
        assert_eq!(clone.contract(), meter.contract());
        assert_eq!(clone.operation(), meter.operation());
    }

    proptest! {
        #[test]
        fn totals_track_every_charge(
            factor in 1u64..=5,
            amounts in proptest::collection::vec(0u64..1_000, 0..50),
        ) {
            let mut meter = meter(factor, Gas::MAX);

            for amount in &amounts {
                meter.consume(*amount, "work").unwrap();
            }

            let original: Gas = amounts.iter().sum();
            prop_assert_eq!(meter.original_gas(), original);
            prop_assert_eq!(meter.actual_gas(), original * factor);
            prop_assert_eq!(meter.consumed(), meter.actual_gas());
        }
    }
}
