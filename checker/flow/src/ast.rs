// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Identifiers and syntax handles shared between the engine and its driver.
//!
//! The engine never inspects source syntax itself. It only carries opaque
//! handles (`SyntaxNode`) back to the driver, which owns the typing of trees.

use std::{fmt, ops::Range};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(idx: u32) -> Self {
                Self(idx)
            }

            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a node of the control flow graph.
    NodeId,
    "n"
);
define_id!(
    /// Identifies a syntax tree handed out by the driver.
    SyntaxId,
    "t"
);
define_id!(
    /// Identifies a local variable or formal parameter.
    LocalId,
    "l"
);
define_id!(
    /// Identifies a field declaration.
    FieldId,
    "f"
);
define_id!(
    /// Identifies a class or interface declaration.
    TypeId,
    "T"
);
define_id!(
    /// Identifies a method or constructor declaration.
    MethodId,
    "m"
);

/// Source files are referenced by index, matching `codespan_reporting::files::SimpleFiles`.
pub type FileId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub file_id: FileId,
    pub range: Range<usize>,
}

impl Span {
    pub fn new(file_id: FileId, range: Range<usize>) -> Self {
        Self { file_id, range }
    }
}

/// Opaque handle on a syntax tree owned by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxNode {
    pub id: SyntaxId,
    pub span: Span,
    /// Whether the tree can carry a type qualifier (expressions, type literals).
    /// Statements and declarations without a type cannot.
    pub typed: bool,
}

impl SyntaxNode {
    pub fn new(id: SyntaxId, span: Span, typed: bool) -> Self {
        Self { id, span, typed }
    }
}

/// Coarse classification of a static type, enough to decide whether a flow
/// refinement can be propagated through an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StaticTypeKind {
    Primitive,
    Declared,
    Array,
    TypeVariable,
    Wildcard,
    Null,
    Void,
}

impl StaticTypeKind {
    /// Type variables and wildcards only have an upper bound, not a concrete qualifier.
    pub fn is_type_variable_or_wildcard(self) -> bool {
        matches!(self, StaticTypeKind::TypeVariable | StaticTypeKind::Wildcard)
    }
}

/// A local variable or formal parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalVar {
    pub id: LocalId,
    pub name: String,
}

impl LocalVar {
    pub fn new(id: LocalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A field declaration as seen from a use site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef {
    pub id: FieldId,
    pub name: String,
    pub is_final: bool,
}

impl FieldRef {
    pub fn new(id: FieldId, name: impl Into<String>, is_final: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_final,
        }
    }
}

/// A formal parameter of the analyzed method, with its declaration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub var: LocalVar,
    pub decl: SyntaxNode,
}

/// A method declaration being analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub id: MethodId,
    pub name: String,
    pub declaring_type: TypeId,
    pub is_constructor: bool,
    pub syntax: SyntaxNode,
}

/// The unit a control flow graph was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnderlyingAst {
    /// The body of a method or constructor.
    Method(MethodDecl),
    /// Any other code: field initializers, initializer blocks, lambdas.
    Arbitrary,
}

impl UnderlyingAst {
    pub fn method(&self) -> Option<&MethodDecl> {
        match self {
            UnderlyingAst::Method(decl) => Some(decl),
            UnderlyingAst::Arbitrary => None,
        }
    }
}
