// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

/// Defines options for a run of the flow analysis. Fixed for the duration of
/// one checker run.
#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[clap(author, version, about)]
pub struct TransferOptions {
    /// Assume that other threads may mutate shared state at any time. Facts
    /// about non-final fields are then never recorded and every call
    /// invalidates them.
    #[clap(long = "concurrent-semantics")]
    pub concurrent_semantics: bool,
    /// Treat every invoked method as side-effect free.
    #[clap(long = "assume-side-effect-free")]
    pub assume_side_effect_free: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Parser::parse_from(std::iter::empty::<String>())
    }
}

impl TransferOptions {
    /// Returns true if only one thread is assumed to run at any time.
    pub fn sequential_semantics(&self) -> bool {
        !self.concurrent_semantics
    }

    pub fn set_concurrent_semantics(self, value: bool) -> Self {
        Self {
            concurrent_semantics: value,
            ..self
        }
    }

    pub fn set_assume_side_effect_free(self, value: bool) -> Self {
        Self {
            assume_side_effect_free: value,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sequential() {
        let options = TransferOptions::default();
        assert!(options.sequential_semantics());
        assert!(!options.assume_side_effect_free);
    }

    #[test]
    fn parse_flags() {
        let options = TransferOptions::parse_from(["flow", "--concurrent-semantics"]);
        assert!(!options.sequential_semantics());
    }
}
