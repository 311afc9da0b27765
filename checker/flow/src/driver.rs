// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Services the analysis driver provides to the transfer engine.

use crate::{
    ast::{FieldRef, MethodDecl, MethodId, SyntaxId, SyntaxNode},
    cfg::CallSite,
    error::ContractParseError,
    lattice::AbstractValue,
    receiver::Receiver,
};

pub trait AnalysisDriver {
    type Value: AbstractValue;
    /// Resolution context for contract expressions, e.g. what `this` and
    /// parameter references denote.
    type Context;

    /// Records the tree whose type is currently computed, for attributing
    /// diagnostics raised by the type factory. `None` clears it.
    fn set_current_tree(&self, tree: Option<SyntaxId>);

    /// The value the type factory computes for `tree`, including flow refinement.
    fn unrefined_value(&self, tree: &SyntaxNode) -> Option<Self::Value>;

    /// Like [`Self::unrefined_value`], but stripped of flow refinement, i.e.
    /// the upper bound from static typing only.
    fn effective_unrefined_value(&self, tree: &SyntaxNode) -> Option<Self::Value>;

    /// Whether the running checker handles the named qualifier.
    fn is_supported_qualifier(&self, qualifier: &str) -> bool;

    /// The value denoted by a qualifier name.
    fn qualifier_value(&self, qualifier: &str) -> Option<Self::Value>;

    fn context_for_declaration(&self, method: &MethodDecl) -> Self::Context;

    fn context_for_call_site(&self, call: &CallSite) -> Self::Context;

    fn parse_contract_expression(
        &self,
        expression: &str,
        context: &Self::Context,
    ) -> Result<Receiver, ContractParseError>;

    /// Field values inferred so far for the enclosing class, from static
    /// initializers and other constructors.
    fn field_values(&self) -> Vec<(FieldRef, Self::Value)>;

    fn is_side_effect_free(&self, method: &MethodId) -> bool;
}
