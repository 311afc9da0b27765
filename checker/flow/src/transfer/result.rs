// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{ast::NodeId, lattice::AbstractValue, store::Store};
use std::collections::BTreeMap;

/// Values the analysis has computed so far for CFG nodes.
pub type NodeValues<V> = BTreeMap<NodeId, V>;

/// The store(s) flowing into a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stores<S> {
    Regular(S),
    Conditional { then_store: S, else_store: S },
}

/// Input of a transfer function: incoming store(s) and the values of nodes
/// already evaluated, in particular the operands of the current node.
#[derive(Debug, Clone)]
pub struct TransferInput<'a, V, S> {
    stores: Stores<S>,
    node_values: &'a NodeValues<V>,
}

impl<'a, V: AbstractValue, S: Store<V>> TransferInput<'a, V, S> {
    pub fn regular(store: S, node_values: &'a NodeValues<V>) -> Self {
        Self {
            stores: Stores::Regular(store),
            node_values,
        }
    }

    pub fn conditional(then_store: S, else_store: S, node_values: &'a NodeValues<V>) -> Self {
        Self {
            stores: Stores::Conditional {
                then_store,
                else_store,
            },
            node_values,
        }
    }

    pub fn value_of(&self, node: NodeId) -> Option<&V> {
        self.node_values.get(&node)
    }

    pub fn into_stores(self) -> Stores<S> {
        self.stores
    }

    /// The single store of this input; then and else stores are joined.
    pub fn into_regular_store(self) -> S {
        match self.stores {
            Stores::Regular(store) => store,
            Stores::Conditional {
                then_store,
                else_store,
            } => then_store.join(&else_store),
        }
    }
}

/// Output of a transfer function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult<V, S> {
    Regular {
        value: Option<V>,
        store: S,
    },
    Conditional {
        value: Option<V>,
        then_store: S,
        else_store: S,
    },
}

impl<V: AbstractValue, S: Store<V>> TransferResult<V, S> {
    pub fn regular(value: Option<V>, store: S) -> Self {
        TransferResult::Regular { value, store }
    }

    pub fn conditional(value: Option<V>, then_store: S, else_store: S) -> Self {
        TransferResult::Conditional {
            value,
            then_store,
            else_store,
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            TransferResult::Regular { value, .. } | TransferResult::Conditional { value, .. } => {
                value.as_ref()
            },
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, TransferResult::Conditional { .. })
    }

    /// The store on the branch where the node evaluated to true.
    pub fn then_store(&self) -> &S {
        match self {
            TransferResult::Regular { store, .. } => store,
            TransferResult::Conditional { then_store, .. } => then_store,
        }
    }

    /// The store on the branch where the node evaluated to false.
    pub fn else_store(&self) -> &S {
        match self {
            TransferResult::Regular { store, .. } => store,
            TransferResult::Conditional { else_store, .. } => else_store,
        }
    }

    /// The single store of this result; then and else stores are joined.
    pub fn regular_store(&self) -> S {
        match self {
            TransferResult::Regular { store, .. } => store.clone(),
            TransferResult::Conditional {
                then_store,
                else_store,
                ..
            } => then_store.join(else_store),
        }
    }

    /// Splits into value, then-store and else-store. A regular store is
    /// copied so the two branches never share state.
    pub fn into_branches(self) -> (Option<V>, S, S) {
        match self {
            TransferResult::Regular { value, store } => {
                let else_store = store.clone();
                (value, store, else_store)
            },
            TransferResult::Conditional {
                value,
                then_store,
                else_store,
            } => (value, then_store, else_store),
        }
    }
}
