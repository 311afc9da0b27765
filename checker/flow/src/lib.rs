// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Flow-sensitive transfer functions for pluggable type-qualifier checkers.
//!
//! A checker plugs in its qualifier lattice ([`AbstractValue`]), a store
//! implementation ([`Store`]) and an [`AnalysisDriver`] giving access to its
//! type factory. The [`TransferEngine`] then computes, for each node of a
//! control flow graph, the value of the node and the store(s) after it.

pub mod ast;
pub mod cfg;
pub mod contracts;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod lattice;
pub mod options;
pub mod receiver;
pub mod store;
pub mod transfer;

#[cfg(test)]
mod unit_tests;

pub use contracts::{ContractRegistry, ContractTable};
pub use driver::AnalysisDriver;
pub use error::{ContractParseError, FlowResult, TransferError};
pub use lattice::{most_specific, AbstractValue, Prefer, QualifierHierarchy, QualifierValue};
pub use options::TransferOptions;
pub use receiver::{can_insert, Receiver};
pub use store::{FlowStore, Store};
pub use transfer::{NodeValues, Stores, TransferEngine, TransferInput, TransferResult};
