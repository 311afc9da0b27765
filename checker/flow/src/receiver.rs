// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Canonical descriptions of storage locations, used as store keys.

use crate::ast::{FieldRef, LocalVar, MethodId, TypeId};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Receiver {
    LocalVariable(LocalVar),
    FieldAccess {
        owner: Box<Receiver>,
        field: FieldRef,
    },
    /// The implicit or explicit `this` of the given class.
    ThisReference(TypeId),
    /// A class literal, e.g. the owner of a static field.
    ClassName(TypeId),
    ArrayAccess {
        array: Box<Receiver>,
        index: Box<Receiver>,
    },
    /// A call of a method known to be deterministic and side-effect free.
    PureMethodCall {
        receiver: Box<Receiver>,
        method: MethodId,
        args: Vec<Receiver>,
    },
    /// An expression that has no canonical representation.
    Unknown(TypeId),
}

impl Receiver {
    pub fn local(var: LocalVar) -> Self {
        Receiver::LocalVariable(var)
    }

    pub fn field(owner: Receiver, field: FieldRef) -> Self {
        Receiver::FieldAccess {
            owner: Box::new(owner),
            field,
        }
    }

    pub fn this_field(class: TypeId, field: FieldRef) -> Self {
        Self::field(Receiver::ThisReference(class), field)
    }

    pub fn array_access(array: Receiver, index: Receiver) -> Self {
        Receiver::ArrayAccess {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn pure_call(receiver: Receiver, method: MethodId, args: Vec<Receiver>) -> Self {
        Receiver::PureMethodCall {
            receiver: Box::new(receiver),
            method,
            args,
        }
    }

    pub fn is_field_access(&self) -> bool {
        matches!(self, Receiver::FieldAccess { .. })
    }

    /// Returns the direct sub-receivers.
    fn children(&self) -> Vec<&Receiver> {
        match self {
            Receiver::LocalVariable(_)
            | Receiver::ThisReference(_)
            | Receiver::ClassName(_)
            | Receiver::Unknown(_) => vec![],
            Receiver::FieldAccess { owner, .. } => vec![owner.as_ref()],
            Receiver::ArrayAccess { array, index } => vec![array.as_ref(), index.as_ref()],
            Receiver::PureMethodCall { receiver, args, .. } => std::iter::once(receiver.as_ref())
                .chain(args.iter())
                .collect(),
        }
    }

    /// Returns true if this receiver or any of its parts is `Unknown`.
    pub fn contains_unknown(&self) -> bool {
        matches!(self, Receiver::Unknown(_))
            || self.children().into_iter().any(Self::contains_unknown)
    }

    /// Returns true if `other` occurs syntactically in this receiver, including
    /// the receiver itself.
    pub fn contains_receiver(&self, other: &Receiver) -> bool {
        self == other
            || self
                .children()
                .into_iter()
                .any(|child| child.contains_receiver(other))
    }

    /// Returns true if no code other than the analyzed unit can change the value
    /// stored at this location.
    pub fn is_unmodifiable_by_other_code(&self) -> bool {
        match self {
            Receiver::LocalVariable(_) | Receiver::ThisReference(_) | Receiver::ClassName(_) => {
                true
            },
            Receiver::FieldAccess { owner, field } => {
                field.is_final && owner.is_unmodifiable_by_other_code()
            },
            Receiver::PureMethodCall { receiver, args, .. } => {
                receiver.is_unmodifiable_by_other_code()
                    && args.iter().all(Self::is_unmodifiable_by_other_code)
            },
            Receiver::ArrayAccess { .. } | Receiver::Unknown(_) => false,
        }
    }
}

/// Returns true if facts about `receiver` may be recorded in a store.
///
/// Every store write in the engine is guarded by this predicate; stores do not
/// check it themselves.
pub fn can_insert(receiver: &Receiver) -> bool {
    match receiver {
        Receiver::LocalVariable(_)
        | Receiver::ThisReference(_)
        | Receiver::ClassName(_)
        | Receiver::FieldAccess { .. }
        | Receiver::PureMethodCall { .. } => !receiver.contains_unknown(),
        Receiver::ArrayAccess { .. } | Receiver::Unknown(_) => false,
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::LocalVariable(var) => write!(f, "{}", var.name),
            Receiver::FieldAccess { owner, field } => write!(f, "{}.{}", owner, field.name),
            Receiver::ThisReference(_) => f.write_str("this"),
            Receiver::ClassName(ty) => write!(f, "{}", ty),
            Receiver::ArrayAccess { array, index } => write!(f, "{}[{}]", array, index),
            Receiver::PureMethodCall {
                receiver,
                method,
                args,
            } => write!(f, "{}.{}({})", receiver, method, args.iter().join(", ")),
            Receiver::Unknown(_) => f.write_str("?"),
        }
    }
}
