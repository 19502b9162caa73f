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

//! The contract VM execution contract.

use crate::ext::Ext;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;
use tollgate_core::{
    gas::Gas,
    ids::{ActorId, CodeId},
    session::SessionStack,
};

/// Block-level execution context.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockInfo {
    /// Block height.
    pub height: u32,
    /// Block timestamp.
    pub timestamp: u64,
}

/// Environment of one entrypoint invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CallEnv {
    /// The contract being invoked; gas is attributed to this address.
    pub contract: ActorId,
    /// Block context of the invocation.
    pub block: BlockInfo,
}

impl CallEnv {
    /// Environment for `contract` with default block context.
    pub fn new(contract: ActorId) -> Self {
        Self {
            contract,
            block: BlockInfo::default(),
        }
    }
}

/// Sender-side metadata of instantiate and execute calls.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MessageInfo {
    /// The account that sent the message.
    pub sender: ActorId,
    /// Value transferred with the message.
    pub value: u128,
}

/// Data returned by a non-query entrypoint.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    /// Opaque payload for the caller, if any.
    pub data: Option<Vec<u8>>,
}

impl Response {
    /// Response carrying `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// Response with no payload.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Why a nested contract query failed, as seen by the calling contract.
///
/// Typed engine errors erase to a message at this boundary; the contract
/// may handle or forward it, while session-level damage keeps surfacing
/// through the outer call's own teardown.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
#[display("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    /// Creates an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<V: fmt::Display, P: fmt::Display> From<crate::common::CallError<V, P>> for QueryError {
    fn from(error: crate::common::CallError<V, P>) -> Self {
        Self::new(error.to_string())
    }
}

/// Read-only dispatch into other contracts.
///
/// Supplied by the host: resolving a contract address to its code and
/// storage is host business. An implementation re-enters the tracking
/// engine with the `tracking` object it is handed, which keeps the nested
/// call inside the same session stack.
pub trait Querier {
    /// Runs a read-only call into `contract` under `gas_limit`.
    fn query(
        &mut self,
        tracking: &mut SessionStack,
        contract: ActorId,
        msg: &[u8],
        gas_limit: Gas,
    ) -> Result<Vec<u8>, QueryError>;
}

/// A contract VM.
///
/// Every entrypoint reports the VM gas it consumed alongside its result,
/// including on failure; message payloads are opaque bytes. The host
/// interface handed in carries charged storage access, gas introspection
/// and nested queries.
pub trait Vm {
    /// VM-side execution error.
    type Error: fmt::Debug + fmt::Display;

    /// Instantiates a new contract from `code`.
    fn instantiate(
        &self,
        code: CodeId,
        env: &CallEnv,
        info: &MessageInfo,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Executes a message on the contract.
    fn execute(
        &self,
        code: CodeId,
        env: &CallEnv,
        info: &MessageInfo,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Runs a read-only query against the contract.
    fn query(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Vec<u8>, Self::Error>, Gas);

    /// Migrates the contract to new code.
    fn migrate(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Runs a privileged chain-side call.
    fn sudo(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Delivers a submessage reply to the contract.
    fn reply(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Runs the IBC channel open handshake step.
    fn ibc_channel_open(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Runs the IBC channel connect handshake step.
    fn ibc_channel_connect(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Closes an IBC channel.
    fn ibc_channel_close(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Delivers an IBC packet to the contract.
    fn ibc_packet_receive(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Delivers an IBC packet acknowledgement to the contract.
    fn ibc_packet_ack(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);

    /// Notifies the contract of an IBC packet timeout.
    fn ibc_packet_timeout(
        &self,
        code: CodeId,
        env: &CallEnv,
        msg: &[u8],
        ext: &mut Ext<'_>,
        gas_limit: Gas,
    ) -> (Result<Response, Self::Error>, Gas);
}
