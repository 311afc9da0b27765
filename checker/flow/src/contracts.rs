// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Method contracts: preconditions, postconditions and conditional
//! postconditions, each naming an expression and the qualifier it carries.

use crate::{
    ast::{MethodId, NodeId},
    error::ContractParseError,
    receiver::Receiver,
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

/// The qualifier `qualifier` holds for `expression` on method entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precondition {
    pub expression: String,
    pub qualifier: String,
}

/// The qualifier `qualifier` holds for `expression` on normal method exit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Postcondition {
    pub expression: String,
    pub qualifier: String,
}

/// The qualifier `qualifier` holds for `expression` if the method returns `result`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConditionalPostcondition {
    pub expression: String,
    pub qualifier: String,
    pub result: bool,
}

pub trait ContractRegistry {
    fn preconditions_of(&self, method: &MethodId) -> BTreeSet<Precondition>;

    fn postconditions_of(&self, method: &MethodId) -> BTreeSet<Postcondition>;

    fn conditional_postconditions_of(
        &self,
        method: &MethodId,
    ) -> BTreeSet<ConditionalPostcondition>;
}

#[derive(Debug, Clone, Default)]
struct MethodContracts {
    pre: BTreeSet<Precondition>,
    post: BTreeSet<Postcondition>,
    conditional_post: BTreeSet<ConditionalPostcondition>,
}

/// A registry populated up front, e.g. from annotations extracted by the driver.
#[derive(Debug, Clone, Default)]
pub struct ContractTable {
    methods: BTreeMap<MethodId, MethodContracts>,
}

impl ContractTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_precondition(&mut self, method: MethodId, expression: &str, qualifier: &str) {
        self.methods.entry(method).or_default().pre.insert(Precondition {
            expression: expression.to_string(),
            qualifier: qualifier.to_string(),
        });
    }

    pub fn add_postcondition(&mut self, method: MethodId, expression: &str, qualifier: &str) {
        self.methods.entry(method).or_default().post.insert(Postcondition {
            expression: expression.to_string(),
            qualifier: qualifier.to_string(),
        });
    }

    pub fn add_conditional_postcondition(
        &mut self,
        method: MethodId,
        expression: &str,
        qualifier: &str,
        result: bool,
    ) {
        self.methods
            .entry(method)
            .or_default()
            .conditional_post
            .insert(ConditionalPostcondition {
                expression: expression.to_string(),
                qualifier: qualifier.to_string(),
                result,
            });
    }
}

impl ContractRegistry for ContractTable {
    fn preconditions_of(&self, method: &MethodId) -> BTreeSet<Precondition> {
        self.methods
            .get(method)
            .map(|c| c.pre.clone())
            .unwrap_or_default()
    }

    fn postconditions_of(&self, method: &MethodId) -> BTreeSet<Postcondition> {
        self.methods
            .get(method)
            .map(|c| c.post.clone())
            .unwrap_or_default()
    }

    fn conditional_postconditions_of(
        &self,
        method: &MethodId,
    ) -> BTreeSet<ConditionalPostcondition> {
        self.methods
            .get(method)
            .map(|c| c.conditional_post.clone())
            .unwrap_or_default()
    }
}

/// Where a contract expression is resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseSite {
    /// At the declaration of a method, against its formal parameters.
    Declaration(MethodId),
    /// At a call node, against the actual receiver and arguments. Node ids
    /// are only unique within one unit.
    CallSite { node: NodeId, callee: MethodId },
}

/// Memoizes contract parses. A parse depends only on the expression text and
/// the site it is resolved at, so the fixpoint iteration revisiting a node does
/// not parse again. Call-site entries are only valid for the unit being
/// analyzed and must be dropped with [`ParseCache::clear_call_sites`] when the
/// next unit starts.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: RefCell<BTreeMap<(ParseSite, String), Result<Receiver, ContractParseError>>>,
}

impl ParseCache {
    pub fn get_or_parse(
        &self,
        site: ParseSite,
        expression: &str,
        parse: impl FnOnce() -> Result<Receiver, ContractParseError>,
    ) -> Result<Receiver, ContractParseError> {
        let key = (site, expression.to_string());
        if let Some(cached) = self.entries.borrow().get(&key) {
            return cached.clone();
        }
        let result = parse();
        self.entries.borrow_mut().insert(key, result.clone());
        result
    }

    /// Forgets every parse resolved at a call site.
    pub fn clear_call_sites(&self) {
        self.entries
            .borrow_mut()
            .retain(|(site, _), _| matches!(site, ParseSite::Declaration(_)));
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeId;
    use std::cell::Cell;

    #[test]
    fn table_groups_contracts_per_method() {
        let mut table = ContractTable::new();
        table.add_precondition(MethodId(0), "this.x", "NonNull");
        table.add_postcondition(MethodId(0), "#1", "NonNull");
        table.add_conditional_postcondition(MethodId(1), "#1", "NonNull", true);
        assert_eq!(table.preconditions_of(&MethodId(0)).len(), 1);
        assert_eq!(table.postconditions_of(&MethodId(0)).len(), 1);
        assert!(table.conditional_postconditions_of(&MethodId(0)).is_empty());
        assert_eq!(
            table
                .conditional_postconditions_of(&MethodId(1))
                .into_iter()
                .next()
                .map(|c| c.result),
            Some(true)
        );
        assert!(table.preconditions_of(&MethodId(7)).is_empty());
    }

    #[test]
    fn cache_parses_once_per_site() {
        let cache = ParseCache::default();
        let parses = Cell::new(0);
        let parse = || {
            parses.set(parses.get() + 1);
            Ok(Receiver::ThisReference(TypeId(0)))
        };
        let site = ParseSite::Declaration(MethodId(0));
        assert!(cache.get_or_parse(site.clone(), "this", parse).is_ok());
        assert!(cache.get_or_parse(site, "this", parse).is_ok());
        assert_eq!(parses.get(), 1);
        let call_site = ParseSite::CallSite {
            node: NodeId(4),
            callee: MethodId(0),
        };
        assert!(cache.get_or_parse(call_site.clone(), "this", parse).is_ok());
        assert_eq!(parses.get(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear_call_sites();
        assert_eq!(cache.len(), 1);
        assert!(cache.get_or_parse(call_site, "this", parse).is_ok());
        assert_eq!(parses.get(), 3);
    }
}
