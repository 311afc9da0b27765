// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    ast::{
        FieldId, FieldRef, LocalId, LocalVar, MethodDecl, MethodId, NodeId, Span, StaticTypeKind,
        SyntaxId, SyntaxNode, TypeId,
    },
    cfg::{CallSite, Operand},
    contracts::ContractTable,
    driver::AnalysisDriver,
    error::ContractParseError,
    lattice::{QualifierHierarchy, QualifierValue},
    options::TransferOptions,
    receiver::Receiver,
    store::{FlowStore, Store},
    transfer::TransferEngine,
};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

mod store_test;

const CLASS: TypeId = TypeId(0);

type TestStore = FlowStore<QualifierValue>;
type Engine<'a> = TransferEngine<'a, TestDriver, ContractTable, TestStore>;

// Nullable
//  |      \
// NonNull  Initialized
fn nullness() -> Arc<QualifierHierarchy> {
    QualifierHierarchy::new([
        ("Nullable", vec![]),
        ("NonNull", vec!["Nullable"]),
        ("Initialized", vec!["Nullable"]),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TestContext {
    Declaration(MethodId),
    /// The callee and the receivers of the actual arguments.
    CallSite(MethodId, Vec<Receiver>),
}

/// A driver whose type factory answers from fixed tables.
struct TestDriver {
    hierarchy: Arc<QualifierHierarchy>,
    tree_values: BTreeMap<SyntaxId, QualifierValue>,
    effective_values: BTreeMap<SyntaxId, QualifierValue>,
    expressions: BTreeMap<String, Receiver>,
    field_values: Vec<(FieldRef, QualifierValue)>,
    side_effect_free: BTreeSet<MethodId>,
    current_tree: Cell<Option<SyntaxId>>,
    parses: Cell<usize>,
    contexts: RefCell<Vec<TestContext>>,
}

impl TestDriver {
    fn new() -> Self {
        Self {
            hierarchy: nullness(),
            tree_values: BTreeMap::new(),
            effective_values: BTreeMap::new(),
            expressions: BTreeMap::new(),
            field_values: vec![],
            side_effect_free: BTreeSet::new(),
            current_tree: Cell::new(None),
            parses: Cell::new(0),
            contexts: RefCell::new(vec![]),
        }
    }

    fn value(&self, qualifier: &str) -> QualifierValue {
        self.hierarchy.value(qualifier).unwrap()
    }

    fn with_tree_value(mut self, tree: u32, qualifier: &str) -> Self {
        let value = self.value(qualifier);
        self.tree_values.insert(SyntaxId(tree), value);
        self
    }

    fn with_effective_value(mut self, tree: u32, qualifier: &str) -> Self {
        let value = self.value(qualifier);
        self.effective_values.insert(SyntaxId(tree), value);
        self
    }

    fn with_expression(mut self, expression: &str, receiver: Receiver) -> Self {
        self.expressions.insert(expression.to_string(), receiver);
        self
    }

    fn with_field_value(mut self, field: FieldRef, qualifier: &str) -> Self {
        let value = self.value(qualifier);
        self.field_values.push((field, value));
        self
    }

    fn with_side_effect_free(mut self, method: MethodId) -> Self {
        self.side_effect_free.insert(method);
        self
    }
}

impl AnalysisDriver for TestDriver {
    type Context = TestContext;
    type Value = QualifierValue;

    fn set_current_tree(&self, tree: Option<SyntaxId>) {
        self.current_tree.set(tree);
    }

    fn unrefined_value(&self, tree: &SyntaxNode) -> Option<QualifierValue> {
        assert_eq!(self.current_tree.get(), Some(tree.id));
        self.tree_values.get(&tree.id).cloned()
    }

    fn effective_unrefined_value(&self, tree: &SyntaxNode) -> Option<QualifierValue> {
        assert_eq!(self.current_tree.get(), Some(tree.id));
        self.effective_values.get(&tree.id).cloned()
    }

    fn is_supported_qualifier(&self, qualifier: &str) -> bool {
        self.hierarchy.contains(qualifier)
    }

    fn qualifier_value(&self, qualifier: &str) -> Option<QualifierValue> {
        self.hierarchy.value(qualifier)
    }

    fn context_for_declaration(&self, method: &MethodDecl) -> TestContext {
        let context = TestContext::Declaration(method.id);
        self.contexts.borrow_mut().push(context.clone());
        context
    }

    fn context_for_call_site(&self, call: &CallSite) -> TestContext {
        let arguments = call.arguments.iter().map(|arg| arg.receiver.clone()).collect();
        let context = TestContext::CallSite(call.method, arguments);
        self.contexts.borrow_mut().push(context.clone());
        context
    }

    fn parse_contract_expression(
        &self,
        expression: &str,
        context: &TestContext,
    ) -> Result<Receiver, ContractParseError> {
        self.parses.set(self.parses.get() + 1);
        // `#i` denotes the i-th actual argument at a call site.
        if let TestContext::CallSite(_, arguments) = context {
            let argument = expression
                .strip_prefix('#')
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| arguments.get(index));
            if let Some(argument) = argument {
                return Ok(argument.clone());
            }
        }
        self.expressions
            .get(expression)
            .cloned()
            .ok_or_else(|| ContractParseError::new(expression, "unknown identifier"))
    }

    fn field_values(&self) -> Vec<(FieldRef, QualifierValue)> {
        self.field_values.clone()
    }

    fn is_side_effect_free(&self, method: &MethodId) -> bool {
        self.side_effect_free.contains(method)
    }
}

fn engine<'a>(driver: &'a TestDriver, contracts: &'a ContractTable) -> Engine<'a> {
    let _ = env_logger::builder().is_test(true).try_init();
    TransferEngine::new(driver, contracts, TransferOptions::default())
}

fn empty_store() -> TestStore {
    TestStore::empty(&TransferOptions::default())
}

fn tree(id: u32) -> SyntaxNode {
    SyntaxNode::new(SyntaxId(id), Span::new(0, 0..1), true)
}

fn local(id: u32, name: &str) -> Receiver {
    Receiver::local(LocalVar::new(LocalId(id), name))
}

fn field(id: u32, name: &str, is_final: bool) -> FieldRef {
    FieldRef::new(FieldId(id), name, is_final)
}

fn this_field(id: u32, name: &str, is_final: bool) -> Receiver {
    Receiver::this_field(CLASS, field(id, name, is_final))
}

/// An operand whose node and tree share the id `id`.
fn operand(id: u32, receiver: Receiver) -> Operand {
    Operand::new(
        NodeId(id),
        receiver,
        StaticTypeKind::Declared,
        Some(tree(id)),
    )
}

fn method(id: u32, name: &str, is_constructor: bool) -> MethodDecl {
    MethodDecl {
        id: MethodId(id),
        name: name.to_string(),
        declaring_type: CLASS,
        is_constructor,
        syntax: SyntaxNode::new(SyntaxId(100 + id), Span::new(0, 12..22), false),
    }
}
