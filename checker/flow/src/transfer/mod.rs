// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Transfer functions of the qualifier flow analysis.
//!
//! For each CFG node the engine computes the most precise value of the node's
//! result and the store(s) after it. Boolean-valued nodes feeding a branch
//! produce separate then/else stores so that facts learned from a comparison,
//! a type test or a conditional postcondition only hold on the right branch.
//!
//! The engine is invoked once per node by the fixpoint driver and never walks
//! the graph itself. Facts are only ever written for receivers passing
//! [`can_insert`].

mod contract_processing;
mod result;

pub use result::{NodeValues, Stores, TransferInput, TransferResult};

use crate::{
    ast::{FileId, MethodId, SyntaxNode},
    cfg::{CfgNode, NodeKind, Operand},
    contracts::{ContractRegistry, ParseCache},
    driver::AnalysisDriver,
    error::FlowResult,
    lattice::{least_upper_bound, most_specific, Prefer},
    options::TransferOptions,
    receiver::{can_insert, Receiver},
    store::Store,
};
use codespan_reporting::diagnostic::Diagnostic;
use log::{debug, trace};
use std::{cell::RefCell, collections::BTreeMap, marker::PhantomData};

type Value<D> = <D as AnalysisDriver>::Value;

pub struct TransferEngine<'env, D, C, S> {
    driver: &'env D,
    contracts: &'env C,
    options: TransferOptions,
    parse_cache: ParseCache,
    /// Keyed by method and expression so that a precondition which fails to
    /// resolve is reported once.
    diagnostics: RefCell<BTreeMap<(MethodId, String), Diagnostic<FileId>>>,
    _store: PhantomData<S>,
}

impl<'env, D, C, S> TransferEngine<'env, D, C, S>
where
    D: AnalysisDriver,
    C: ContractRegistry,
    S: Store<Value<D>>,
{
    pub fn new(driver: &'env D, contracts: &'env C, options: TransferOptions) -> Self {
        Self {
            driver,
            contracts,
            options,
            parse_cache: ParseCache::default(),
            diagnostics: RefCell::new(BTreeMap::new()),
            _store: PhantomData,
        }
    }

    /// Drains the diagnostics collected so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic<FileId>> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
            .into_values()
            .collect()
    }

    /// Computes the result value and outgoing store(s) of `node`.
    pub fn transfer(
        &self,
        node: &CfgNode,
        input: TransferInput<'_, Value<D>, S>,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        trace!("transfer {} ({})", node.id, node.kind_name());
        match &node.kind {
            NodeKind::Assignment { target, source } => {
                Ok(self.visit_assignment(target, source, input))
            },
            NodeKind::CompoundAssignment { target, source } => {
                Ok(self.visit_compound_assignment(node, target, source, input))
            },
            NodeKind::FieldAccess { receiver } | NodeKind::LocalVariable { receiver } => {
                self.visit_read(node, receiver, input)
            },
            NodeKind::EqualTo { left, right } => {
                self.visit_equality(node, left, right, false, input)
            },
            NodeKind::NotEqual { left, right } => {
                self.visit_equality(node, left, right, true, input)
            },
            NodeKind::ConditionalNot { .. } => Ok(self.visit_conditional_not(node, input)),
            NodeKind::Ternary {
                then_operand,
                else_operand,
                ..
            } => Ok(self.visit_ternary(then_operand, else_operand, input)),
            NodeKind::InstanceOf {
                operand,
                tested_type,
            } => self.visit_instance_of(node, operand, tested_type, input),
            NodeKind::MethodInvocation(call) => self.visit_method_invocation(node, call, input),
            NodeKind::Case { .. } => Ok(self.visit_case(input)),
            NodeKind::VariableDeclaration { .. } => Ok(self.visit_variable_declaration(input)),
            NodeKind::Other => Ok(self.visit_node(node, input)),
        }
    }

    // =============================================================================================
    // Values from the driver

    /// The value of `tree` as computed by the type factory. The current tree
    /// is recorded for the duration of the query only.
    fn value_from_driver(&self, tree: &SyntaxNode) -> Option<Value<D>> {
        self.driver.set_current_tree(Some(tree.id));
        let value = self.driver.unrefined_value(tree);
        self.driver.set_current_tree(None);
        value
    }

    /// Like `value_from_driver`, without flow-sensitive refinement.
    fn effective_value_from_driver(&self, tree: &SyntaxNode) -> Option<Value<D>> {
        self.driver.set_current_tree(Some(tree.id));
        let value = self.driver.effective_unrefined_value(tree);
        self.driver.set_current_tree(None);
        value
    }

    // =============================================================================================
    // Transfer rules

    /// Default rule: the driver's value for typed syntax, stores unchanged.
    fn visit_node(
        &self,
        node: &CfgNode,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        let value = node
            .tree
            .as_ref()
            .filter(|tree| tree.typed)
            .and_then(|tree| self.value_from_driver(tree));
        match input.into_stores() {
            Stores::Regular(store) => TransferResult::regular(value, store),
            Stores::Conditional {
                then_store,
                else_store,
            } => TransferResult::conditional(value, then_store, else_store),
        }
    }

    /// A field or local read yields the more specific of the driver's and the store's value.
    /// The driver's value wins on incomparable pairs.
    fn visit_read(
        &self,
        node: &CfgNode,
        receiver: &Receiver,
        input: TransferInput<'_, Value<D>, S>,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        let store = input.into_regular_store();
        let factory_value = node
            .tree
            .as_ref()
            .and_then(|tree| self.value_from_driver(tree));
        let value = most_specific(
            factory_value.as_ref(),
            store.value_of(receiver),
            Prefer::First,
        )?;
        Ok(TransferResult::regular(value, store))
    }

    fn visit_assignment(
        &self,
        target: &Operand,
        source: &Operand,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        let source_value = input.value_of(source.id).cloned();
        let mut store = input.into_regular_store();
        self.process_common_assignment(&mut store, target, source, source_value.clone());
        TransferResult::regular(source_value, store)
    }

    fn visit_compound_assignment(
        &self,
        node: &CfgNode,
        target: &Operand,
        source: &Operand,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        let result = self.visit_node(node, input);
        let value = result.value().cloned();
        let mut store = result.regular_store();
        self.process_common_assignment(&mut store, target, source, value.clone());
        TransferResult::regular(value, store)
    }

    /// Updates `store` for `target = source` where `source` evaluated to `value`.
    fn process_common_assignment(
        &self,
        store: &mut S,
        target: &Operand,
        source: &Operand,
        value: Option<Value<D>>,
    ) {
        // A refinement of a type variable only holds for the unknown type
        // argument; a target of concrete type gets the upper bound.
        let value = if source.ty.is_type_variable_or_wildcard()
            && !target.ty.is_type_variable_or_wildcard()
        {
            source
                .tree
                .as_ref()
                .and_then(|tree| self.effective_value_from_driver(tree))
        } else {
            value
        };
        match &target.receiver {
            Receiver::LocalVariable(_) | Receiver::FieldAccess { .. }
                if can_insert(&target.receiver) =>
            {
                debug!("assign {} := {:?}", target.receiver, value);
                store.update_for_assignment(&target.receiver, value)
            },
            _ => store.update_for_unknown_assignment(&target.receiver),
        }
    }

    fn visit_equality(
        &self,
        node: &CfgNode,
        left: &Operand,
        right: &Operand,
        not_equal: bool,
        input: TransferInput<'_, Value<D>, S>,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        let left_value = input.value_of(left.id).cloned();
        let right_value = input.value_of(right.id).cloned();
        let result = self.visit_node(node, input);
        let result = self.strengthen_equal_to(
            result,
            right,
            left_value.as_ref(),
            right_value.as_ref(),
            not_equal,
        )?;
        self.strengthen_equal_to(
            result,
            left,
            right_value.as_ref(),
            left_value.as_ref(),
            not_equal,
        )
    }

    /// If `first_value` differs from the value of `second`, `second` takes
    /// over `first_value` on the branch where both sides are equal: the then
    /// branch of `==`, the else branch of `!=`. A more specific value already
    /// known on that branch is kept.
    fn strengthen_equal_to(
        &self,
        result: TransferResult<Value<D>, S>,
        second: &Operand,
        first_value: Option<&Value<D>>,
        second_value: Option<&Value<D>>,
        not_equal: bool,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        let Some(first_value) = first_value else {
            return Ok(result);
        };
        if Some(first_value) == second_value || !can_insert(&second.receiver) {
            return Ok(result);
        }
        let (value, mut then_store, mut else_store) = result.into_branches();
        let branch = if not_equal {
            &mut else_store
        } else {
            &mut then_store
        };
        let refined = most_specific(
            Some(first_value),
            branch.value_of(&second.receiver),
            Prefer::First,
        )?;
        if let Some(refined) = refined {
            debug!(
                "equality refines {} to {:?} on {} branch",
                second.receiver,
                refined,
                if not_equal { "else" } else { "then" }
            );
            branch.insert(second.receiver.clone(), refined);
        }
        Ok(TransferResult::conditional(value, then_store, else_store))
    }

    fn visit_conditional_not(
        &self,
        node: &CfgNode,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        let (value, then_store, else_store) = self.visit_node(node, input).into_branches();
        TransferResult::conditional(value, else_store, then_store)
    }

    /// The value of `c ? x : y` is the join of both operands; the branches
    /// have already been merged into a single store.
    fn visit_ternary(
        &self,
        then_operand: &Operand,
        else_operand: &Operand,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        let value = least_upper_bound(
            input.value_of(then_operand.id),
            input.value_of(else_operand.id),
        );
        TransferResult::regular(value, input.into_regular_store())
    }

    /// A successful type test refines the operand with the qualifier of the
    /// tested type. A failed one teaches nothing.
    fn visit_instance_of(
        &self,
        node: &CfgNode,
        operand: &Operand,
        tested_type: &SyntaxNode,
        input: TransferInput<'_, Value<D>, S>,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        let operand_value = input.value_of(operand.id).cloned();
        let result = self.visit_node(node, input);
        let factory_value = self.value_from_driver(tested_type);
        let value = most_specific(
            factory_value.as_ref(),
            operand_value.as_ref(),
            Prefer::First,
        )?;
        let (_, mut then_store, else_store) = result.into_branches();
        if let Some(refined) = &value {
            if can_insert(&operand.receiver) {
                debug!("instanceof refines {} to {:?}", operand.receiver, refined);
                then_store.insert(operand.receiver.clone(), refined.clone());
            }
        }
        Ok(TransferResult::conditional(value, then_store, else_store))
    }

    /// The relation of a case label to the switch expression is not modeled.
    fn visit_case(&self, input: TransferInput<'_, Value<D>, S>) -> TransferResult<Value<D>, S> {
        TransferResult::regular(None, input.into_regular_store())
    }

    fn visit_variable_declaration(
        &self,
        input: TransferInput<'_, Value<D>, S>,
    ) -> TransferResult<Value<D>, S> {
        TransferResult::regular(None, input.into_regular_store())
    }
}
