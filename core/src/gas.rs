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

//! Gas currencies and the base gas meter.

use core::fmt;
use scale_info::{
    TypeInfo,
    scale::{Decode, Encode, MaxEncodedLen},
};

/// Gas in the host chain's metering currency.
pub type Gas = u64;

/// Charging error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum ChargeError {
    /// An attempt to charge more gas than the meter's limit allows.
    #[display("Gas limit exceeded")]
    GasLimitExceeded,
    /// The charged total does not fit into the gas counter.
    #[display("Gas amount overflowed")]
    GasOverflow,
    /// An attempt to refund more gas than was consumed.
    #[display("Refund exceeds consumed gas")]
    RefundExceedsConsumed,
}

/// A pair of gas figures, one per currency.
///
/// `vm` is interpreter-reported gas, `host` is gas in the chain's own
/// metering currency. Translation functions map one such pair to another.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Encode, Decode, MaxEncodedLen, TypeInfo,
)]
pub struct GasUsage {
    /// VM-side gas.
    pub vm: Gas,
    /// Host-side gas.
    pub host: Gas,
}

impl GasUsage {
    /// Usage consisting of host gas only.
    pub fn from_host(host: Gas) -> Self {
        Self { vm: 0, host }
    }

    /// Usage consisting of VM gas only.
    pub fn from_vm(vm: Gas) -> Self {
        Self { vm, host: 0 }
    }

    /// Both currencies summed, saturating.
    pub fn total(&self) -> Gas {
        self.vm.saturating_add(self.host)
    }
}

/// The base gas meter contract.
///
/// Charging may fail; a failed charge reports why and the caller decides
/// whether the execution can continue. Implementations keep enough state to
/// answer how much was consumed and against which limit.
pub trait GasMeter: fmt::Debug {
    /// Charges `amount` of gas, attributed to `descriptor`.
    fn consume(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError>;

    /// Returns `amount` of previously consumed gas, attributed to
    /// `descriptor`.
    fn refund(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError>;

    /// Total gas consumed so far.
    fn consumed(&self) -> Gas;

    /// The limit this meter enforces.
    fn limit(&self) -> Gas;

    /// Whether the meter has reached its limit.
    fn is_out_of_gas(&self) -> bool {
        self.consumed() >= self.limit()
    }

    /// Whether a charge has pushed the meter beyond its limit.
    fn is_past_limit(&self) -> bool {
        self.consumed() > self.limit()
    }

    /// Gas still available under the limit.
    fn remaining(&self) -> Gas {
        self.limit().saturating_sub(self.consumed())
    }
}

/// Limited gas counter, the standard [`GasMeter`] implementation.
///
/// The consumed total may exceed the limit by the amount of the failing
/// charge, so `is_past_limit` stays observable after an out-of-gas failure.
#[derive(Clone, Debug)]
pub struct GasCounter {
    limit: Gas,
    consumed: Gas,
}

impl GasCounter {
    /// Creates a counter enforcing `limit`.
    pub fn new(limit: Gas) -> Self {
        Self { limit, consumed: 0 }
    }
}

impl GasMeter for GasCounter {
    fn consume(&mut self, amount: Gas, descriptor: &str) -> Result<(), ChargeError> {
        let consumed = self
            .consumed
            .checked_add(amount)
            .ok_or(ChargeError::GasOverflow)?;

        self.consumed = consumed;

        if consumed > self.limit {
            log::trace!("Out of gas charging {amount} for '{descriptor}'");
            return Err(ChargeError::GasLimitExceeded);
        }

        Ok(())
    }

    fn refund(&mut self, amount: Gas, _descriptor: &str) -> Result<(), ChargeError> {
        self.consumed = self
            .consumed
            .checked_sub(amount)
            .ok_or(ChargeError::RefundExceedsConsumed)?;

        Ok(())
    }

    fn consumed(&self) -> Gas {
        self.consumed
    }

    fn limit(&self) -> Gas {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_counter_charging() {
        let mut counter = GasCounter::new(100);

        counter.consume(40, "first").unwrap();
        counter.consume(60, "second").unwrap();

        assert_eq!(counter.consumed(), 100);
        assert!(counter.is_out_of_gas());
        assert!(!counter.is_past_limit());
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn charge_past_limit_fails_but_is_recorded() {
        let mut counter = GasCounter::new(100);

        counter.consume(90, "work").unwrap();
        assert_eq!(
            counter.consume(20, "more work"),
            Err(ChargeError::GasLimitExceeded)
        );

        assert_eq!(counter.consumed(), 110);
        assert!(counter.is_past_limit());
    }

    #[test]
    fn charge_overflow_leaves_counter_unchanged() {
        let mut counter = GasCounter::new(Gas::MAX);

        counter.consume(10, "work").unwrap();
        assert_eq!(
            counter.consume(Gas::MAX, "too much"),
            Err(ChargeError::GasOverflow)
        );

        assert_eq!(counter.consumed(), 10);
    }

    #[test]
    fn refund_mirrors_consume() {
        let mut counter = GasCounter::new(100);

        counter.consume(50, "work").unwrap();
        counter.refund(20, "rollback").unwrap();

        assert_eq!(counter.consumed(), 30);
        assert_eq!(counter.remaining(), 70);
    }

    #[test]
    fn refund_more_than_consumed_fails() {
        let mut counter = GasCounter::new(100);

        counter.consume(5, "work").unwrap();
        assert_eq!(
            counter.refund(6, "rollback"),
            Err(ChargeError::RefundExceedsConsumed)
        );

        assert_eq!(counter.consumed(), 5);
    }
}
