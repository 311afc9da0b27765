// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Initial stores and method invocations: the transfer rules driven by
//! method contracts.

use super::{TransferEngine, TransferInput, TransferResult, Value};
use crate::{
    ast::{MethodDecl, NodeId, Parameter, UnderlyingAst},
    cfg::{CallSite, CfgNode},
    contracts::{ContractRegistry, ParseSite},
    diagnostics::contract_parse_diagnostic,
    driver::AnalysisDriver,
    error::FlowResult,
    lattice::{most_specific, Prefer},
    receiver::{can_insert, Receiver},
    store::Store,
};
use log::{debug, trace};

impl<D, C, S> TransferEngine<'_, D, C, S>
where
    D: AnalysisDriver,
    C: ContractRegistry,
    S: Store<Value<D>>,
{
    /// Builds the store at the entry of `unit`.
    ///
    /// For a method body this is seeded with the declared values of the
    /// parameters, the facts promised by the method's preconditions and the
    /// field values inferred for the enclosing class. Final fields are always
    /// taken over; other fields only inside a constructor. Call-site parses
    /// of the previously analyzed unit are dropped.
    pub fn initial_store(&self, unit: &UnderlyingAst, parameters: &[Parameter]) -> S {
        let mut store = S::empty(&self.options);
        self.parse_cache.clear_call_sites();
        let Some(method) = unit.method() else {
            return store;
        };
        debug!("initial store of `{}`", method.name);

        for param in parameters {
            let value = self.value_from_driver(&param.decl);
            store.initialize_parameter(&param.var, value);
        }

        self.add_information_from_preconditions(&mut store, method);

        for (field, value) in self.driver.field_values() {
            if field.is_final || method.is_constructor {
                let receiver = Receiver::this_field(method.declaring_type, field);
                if can_insert(&receiver) {
                    store.insert(receiver, value);
                }
            }
        }
        store
    }

    /// Adds the facts of every precondition of `method` concerning this
    /// checker. Expressions which do not resolve are reported at the
    /// declaration.
    fn add_information_from_preconditions(&self, store: &mut S, method: &MethodDecl) {
        let mut context = None;
        for pre in self.contracts.preconditions_of(&method.id) {
            if !self.driver.is_supported_qualifier(&pre.qualifier) {
                continue;
            }
            let parsed = self.parse_cache.get_or_parse(
                ParseSite::Declaration(method.id),
                &pre.expression,
                || {
                    let context = context
                        .get_or_insert_with(|| self.driver.context_for_declaration(method));
                    self.driver
                        .parse_contract_expression(&pre.expression, context)
                },
            );
            match parsed {
                Ok(receiver) => self.insert_contract_fact(store, receiver, &pre.qualifier),
                Err(err) => {
                    debug!("precondition of `{}` not resolved: {}", method.name, err);
                    self.diagnostics
                        .borrow_mut()
                        .entry((method.id, pre.expression.clone()))
                        .or_insert_with(|| contract_parse_diagnostic(method, &err));
                },
            }
        }
    }

    /// A call yields the more specific of the driver's and the store's value
    /// for the invocation, invalidates what the call may change, and adds the
    /// facts promised by the callee's postconditions. Conditional
    /// postconditions go to the then- or else-store depending on the result
    /// they are promised for.
    pub(super) fn visit_method_invocation(
        &self,
        node: &CfgNode,
        call: &CallSite,
        input: TransferInput<'_, Value<D>, S>,
    ) -> FlowResult<TransferResult<Value<D>, S>> {
        let mut store = input.into_regular_store();
        let factory_value = node
            .tree
            .as_ref()
            .and_then(|tree| self.value_from_driver(tree));
        let value = most_specific(
            factory_value.as_ref(),
            store.value_of(&call.receiver),
            Prefer::First,
        )?;

        store.update_for_call(call, self.driver, value.as_ref());

        self.process_postconditions(node.id, call, &mut store);

        let mut else_store = store.clone();
        let mut then_store = store;
        self.process_conditional_postconditions(node.id, call, &mut then_store, &mut else_store);

        Ok(TransferResult::conditional(value, then_store, else_store))
    }

    fn process_postconditions(&self, node: NodeId, call: &CallSite, store: &mut S) {
        let mut context = None;
        for post in self.contracts.postconditions_of(&call.method) {
            if !self.driver.is_supported_qualifier(&post.qualifier) {
                continue;
            }
            if let Some(receiver) =
                self.parse_at_call_site(node, call, &post.expression, &mut context)
            {
                self.insert_contract_fact(store, receiver, &post.qualifier);
            }
        }
    }

    fn process_conditional_postconditions(
        &self,
        node: NodeId,
        call: &CallSite,
        then_store: &mut S,
        else_store: &mut S,
    ) {
        let mut context = None;
        for post in self.contracts.conditional_postconditions_of(&call.method) {
            if !self.driver.is_supported_qualifier(&post.qualifier) {
                continue;
            }
            if let Some(receiver) =
                self.parse_at_call_site(node, call, &post.expression, &mut context)
            {
                let store = if post.result {
                    &mut *then_store
                } else {
                    &mut *else_store
                };
                self.insert_contract_fact(store, receiver, &post.qualifier);
            }
        }
    }

    /// Resolves a postcondition expression against the call site. Failures
    /// were already reported at the callee's declaration and are dropped.
    fn parse_at_call_site(
        &self,
        node: NodeId,
        call: &CallSite,
        expression: &str,
        context: &mut Option<D::Context>,
    ) -> Option<Receiver> {
        self.parse_cache
            .get_or_parse(
                ParseSite::CallSite {
                    node,
                    callee: call.method,
                },
                expression,
                || {
                    let context =
                        context.get_or_insert_with(|| self.driver.context_for_call_site(call));
                    self.driver.parse_contract_expression(expression, context)
                },
            )
            .map_err(|err| trace!("postcondition dropped at {}: {}", node, err))
            .ok()
    }

    fn insert_contract_fact(&self, store: &mut S, receiver: Receiver, qualifier: &str) {
        if !can_insert(&receiver) {
            return;
        }
        if let Some(value) = self.driver.qualifier_value(qualifier) {
            debug!("contract establishes {} -> {:?}", receiver, value);
            store.insert(receiver, value);
        }
    }
}
