// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Abstract values and the reference qualifier lattice.
//!
//! The engine treats values as opaque apart from the two operations of
//! [`AbstractValue`]. [`QualifierHierarchy`] is a finite poset of named
//! qualifiers which checkers (and the tests of this crate) can use directly.

use crate::error::{FlowResult, TransferError};
use petgraph::{algo::has_path_connecting, graph::NodeIndex, Graph};
use std::{collections::BTreeMap, fmt, sync::Arc};

pub trait AbstractValue: Clone + Eq + fmt::Debug {
    /// Symmetric join.
    fn least_upper_bound(&self, other: &Self) -> Self;

    /// Returns the more precise of `self` and `other`. If the two are
    /// incomparable, returns `default`, or `None` if no default was given.
    fn most_specific(&self, other: &Self, default: Option<&Self>) -> Option<Self>;
}

/// Which argument of [`most_specific`] wins when the two are incomparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    First,
    Second,
}

/// Returns the more specific of two optional values. An absent value yields
/// the other one; incomparable values yield the `prefer`red side.
pub fn most_specific<V: AbstractValue>(
    first: Option<&V>,
    second: Option<&V>,
    prefer: Prefer,
) -> FlowResult<Option<V>> {
    match (first, second) {
        (None, None) => Ok(None),
        (Some(v), None) | (None, Some(v)) => Ok(Some(v.clone())),
        (Some(a), Some(b)) => {
            let default = match prefer {
                Prefer::First => a,
                Prefer::Second => b,
            };
            a.most_specific(b, Some(default))
                .map(Some)
                .ok_or_else(|| TransferError::LatticeViolation {
                    first: format!("{:?}", a),
                    second: format!("{:?}", b),
                })
        },
    }
}

/// Join of two optional values; absent if either side is absent.
pub fn least_upper_bound<V: AbstractValue>(first: Option<&V>, second: Option<&V>) -> Option<V> {
    match (first, second) {
        (Some(a), Some(b)) => Some(a.least_upper_bound(b)),
        _ => None,
    }
}

// =================================================================================================
// Qualifier hierarchy

/// A finite partial order of qualifiers with a single top element.
///
/// Edges point from a qualifier to its direct supertypes. The hierarchy must
/// be acyclic; `lub` picks the unique minimal common supertype and falls back
/// to top when several exist.
#[derive(Debug)]
pub struct QualifierHierarchy {
    graph: Graph<String, ()>,
    by_name: BTreeMap<String, NodeIndex>,
    top: NodeIndex,
}

impl QualifierHierarchy {
    /// Creates a hierarchy from `(qualifier, direct supertypes)` pairs. The
    /// first qualifier is the top.
    ///
    /// # Panics
    ///
    /// Panics if `qualifiers` is empty.
    pub fn new<'a>(
        qualifiers: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>,
    ) -> Arc<QualifierHierarchy> {
        let qualifiers = qualifiers.into_iter().collect::<Vec<_>>();
        let mut graph = Graph::new();
        let mut by_name = BTreeMap::new();
        for (name, _) in &qualifiers {
            by_name.insert(name.to_string(), graph.add_node(name.to_string()));
        }
        for (name, supers) in &qualifiers {
            let sub = by_name[*name];
            for sup in supers {
                if let Some(sup) = by_name.get(*sup) {
                    graph.add_edge(sub, *sup, ());
                }
            }
        }
        let top = by_name[qualifiers[0].0];
        Arc::new(QualifierHierarchy {
            graph,
            by_name,
            top,
        })
    }

    pub fn top(self: &Arc<Self>) -> QualifierValue {
        QualifierValue {
            hierarchy: self.clone(),
            qualifier: self.top,
        }
    }

    /// Returns the value for a qualifier name, if it belongs to this hierarchy.
    pub fn value(self: &Arc<Self>, name: &str) -> Option<QualifierValue> {
        self.by_name.get(name).map(|idx| QualifierValue {
            hierarchy: self.clone(),
            qualifier: *idx,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn is_subtype(&self, sub: NodeIndex, sup: NodeIndex) -> bool {
        has_path_connecting(&self.graph, sub, sup, None)
    }

    fn lub(&self, a: NodeIndex, b: NodeIndex) -> NodeIndex {
        if self.is_subtype(a, b) {
            return b;
        }
        if self.is_subtype(b, a) {
            return a;
        }
        let common = self
            .graph
            .node_indices()
            .filter(|n| self.is_subtype(a, *n) && self.is_subtype(b, *n))
            .collect::<Vec<_>>();
        let minimal = common
            .iter()
            .filter(|n| !common.iter().any(|m| m != *n && self.is_subtype(*m, **n)))
            .collect::<Vec<_>>();
        match minimal.as_slice() {
            [single] => **single,
            _ => self.top,
        }
    }
}

/// A single qualifier drawn from a [`QualifierHierarchy`].
#[derive(Clone)]
pub struct QualifierValue {
    hierarchy: Arc<QualifierHierarchy>,
    qualifier: NodeIndex,
}

impl QualifierValue {
    pub fn name(&self) -> &str {
        &self.hierarchy.graph[self.qualifier]
    }

    pub fn is_subtype_of(&self, other: &QualifierValue) -> bool {
        self.hierarchy.is_subtype(self.qualifier, other.qualifier)
    }
}

impl PartialEq for QualifierValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy) && self.qualifier == other.qualifier
    }
}

impl Eq for QualifierValue {}

impl fmt::Debug for QualifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

impl fmt::Display for QualifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

impl AbstractValue for QualifierValue {
    fn least_upper_bound(&self, other: &Self) -> Self {
        QualifierValue {
            hierarchy: self.hierarchy.clone(),
            qualifier: self.hierarchy.lub(self.qualifier, other.qualifier),
        }
    }

    fn most_specific(&self, other: &Self, default: Option<&Self>) -> Option<Self> {
        if self.is_subtype_of(other) {
            Some(self.clone())
        } else if other.is_subtype_of(self) {
            Some(other.clone())
        } else {
            default.cloned()
        }
    }
}
