// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors which abort the analysis of the current unit.
///
/// These indicate a broken collaborator (lattice or store implementation), not
/// a problem in the checked program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("lattice violation: no most specific value of {first} and {second} despite a default")]
    LatticeViolation { first: String, second: String },
}

/// A contract expression which does not resolve against its context.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[error("cannot parse contract expression `{expression}`: {reason}")]
pub struct ContractParseError {
    pub expression: String,
    pub reason: String,
}

impl ContractParseError {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

pub type FlowResult<T> = Result<T, TransferError>;
