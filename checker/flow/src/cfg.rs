// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! The control flow graph nodes the transfer engine understands.
//!
//! Graph construction is the driver's business. A node only carries what the
//! transfer rules need: its syntax handle, the receivers of its operands, and
//! the static type kinds relevant to assignment.

use crate::{
    ast::{MethodId, NodeId, StaticTypeKind, SyntaxNode},
    receiver::Receiver,
};

/// A node used as an operand of another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub id: NodeId,
    pub receiver: Receiver,
    pub ty: StaticTypeKind,
    pub tree: Option<SyntaxNode>,
}

impl Operand {
    pub fn new(
        id: NodeId,
        receiver: Receiver,
        ty: StaticTypeKind,
        tree: Option<SyntaxNode>,
    ) -> Self {
        Self {
            id,
            receiver,
            ty,
            tree,
        }
    }
}

/// An invocation of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub method: MethodId,
    /// The canonical representation of the invocation itself. A
    /// `PureMethodCall` for calls to pure methods, `Unknown` otherwise.
    pub receiver: Receiver,
    pub arguments: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Assignment {
        target: Operand,
        source: Operand,
    },
    /// `target op= source`.
    CompoundAssignment {
        target: Operand,
        source: Operand,
    },
    FieldAccess {
        receiver: Receiver,
    },
    LocalVariable {
        receiver: Receiver,
    },
    EqualTo {
        left: Operand,
        right: Operand,
    },
    NotEqual {
        left: Operand,
        right: Operand,
    },
    ConditionalNot {
        operand: Operand,
    },
    Ternary {
        condition: Operand,
        then_operand: Operand,
        else_operand: Operand,
    },
    InstanceOf {
        operand: Operand,
        /// The type literal tested against.
        tested_type: SyntaxNode,
    },
    MethodInvocation(CallSite),
    Case {
        switch_expr: Operand,
    },
    VariableDeclaration {
        receiver: Receiver,
    },
    /// Any node without a dedicated transfer rule.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    pub id: NodeId,
    pub tree: Option<SyntaxNode>,
    pub kind: NodeKind,
}

impl CfgNode {
    pub fn new(id: NodeId, tree: Option<SyntaxNode>, kind: NodeKind) -> Self {
        Self { id, tree, kind }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::CompoundAssignment { .. } => "compound_assignment",
            NodeKind::FieldAccess { .. } => "field_access",
            NodeKind::LocalVariable { .. } => "local_variable",
            NodeKind::EqualTo { .. } => "equal_to",
            NodeKind::NotEqual { .. } => "not_equal",
            NodeKind::ConditionalNot { .. } => "conditional_not",
            NodeKind::Ternary { .. } => "ternary",
            NodeKind::InstanceOf { .. } => "instance_of",
            NodeKind::MethodInvocation(_) => "method_invocation",
            NodeKind::Case { .. } => "case",
            NodeKind::VariableDeclaration { .. } => "variable_declaration",
            NodeKind::Other => "other",
        }
    }
}
