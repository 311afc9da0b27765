// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Abstract stores mapping receivers to values.
//!
//! [`Store`] is the contract the transfer engine relies on. [`FlowStore`] is a
//! reference implementation which satisfies the minimum invalidation rules
//! required by the engine.

use crate::{
    ast::{LocalVar, MethodId},
    cfg::CallSite,
    driver::AnalysisDriver,
    lattice::AbstractValue,
    options::TransferOptions,
    receiver::Receiver,
};
use itertools::Itertools;
use std::{collections::BTreeMap, fmt};

/// A flow-sensitive store. `Clone` is the independent deep copy used when
/// then/else facts start to diverge.
pub trait Store<V: AbstractValue>: Clone + fmt::Debug {
    /// Creates the empty store for a unit.
    fn empty(options: &TransferOptions) -> Self;

    /// Returns the current value for `receiver`, if any.
    fn value_of(&self, receiver: &Receiver) -> Option<&V>;

    /// Records `value` for `receiver`, overwriting what was there. Callers
    /// must check [`crate::receiver::can_insert`] first.
    fn insert(&mut self, receiver: Receiver, value: V);

    /// Updates the store for an assignment to a local or a field. An absent
    /// value forgets what was known about the target.
    fn update_for_assignment(&mut self, target: &Receiver, value: Option<V>);

    /// Updates the store for an assignment to a target without canonical
    /// representation, e.g. an array element.
    fn update_for_unknown_assignment(&mut self, target: &Receiver);

    /// Updates the store for a method invocation whose result is `value`.
    fn update_for_call<D>(&mut self, call: &CallSite, driver: &D, value: Option<&V>)
    where
        D: AnalysisDriver<Value = V>;

    fn initialize_parameter(&mut self, param: &LocalVar, value: Option<V>);

    /// Merge used where control flow paths rejoin.
    fn join(&self, other: &Self) -> Self;
}

/// Reference store backed by an ordered map.
#[derive(Clone, PartialEq, Eq)]
pub struct FlowStore<V> {
    values: BTreeMap<Receiver, V>,
    sequential_semantics: bool,
    assume_side_effect_free: bool,
}

impl<V: AbstractValue> FlowStore<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&Receiver, &V)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, receiver: &Receiver) -> bool {
        self.values.contains_key(receiver)
    }

    /// Fields which may change behind our back are only tracked under
    /// sequential semantics.
    fn is_trackable(&self, receiver: &Receiver) -> bool {
        self.sequential_semantics
            || !receiver.is_field_access()
            || receiver.is_unmodifiable_by_other_code()
    }

    /// Removes every entry whose key mentions `target`, except `target` itself.
    fn remove_dependents(&mut self, target: &Receiver) {
        self.values
            .retain(|key, _| key == target || !key.contains_receiver(target));
    }

    /// Drops facts which an arbitrary side effect could falsify.
    fn remove_modifiable(&mut self) {
        self.values.retain(|key, _| match key {
            Receiver::FieldAccess { .. } => key.is_unmodifiable_by_other_code(),
            Receiver::PureMethodCall { .. } | Receiver::ArrayAccess { .. } => false,
            _ => true,
        });
    }

    fn is_side_effect_free<D>(&self, method: &MethodId, driver: &D) -> bool
    where
        D: AnalysisDriver<Value = V>,
    {
        self.assume_side_effect_free || driver.is_side_effect_free(method)
    }
}

impl<V: AbstractValue> Store<V> for FlowStore<V> {
    fn empty(options: &TransferOptions) -> Self {
        FlowStore {
            values: BTreeMap::new(),
            sequential_semantics: options.sequential_semantics(),
            assume_side_effect_free: options.assume_side_effect_free,
        }
    }

    fn value_of(&self, receiver: &Receiver) -> Option<&V> {
        self.values.get(receiver)
    }

    fn insert(&mut self, receiver: Receiver, value: V) {
        if self.is_trackable(&receiver) {
            self.values.insert(receiver, value);
        }
    }

    fn update_for_assignment(&mut self, target: &Receiver, value: Option<V>) {
        self.remove_dependents(target);
        if let Receiver::FieldAccess { field, .. } = target {
            // Another owner expression may alias the assigned one, so facts
            // about the same field elsewhere are weakened to the join.
            let aliased = self
                .values
                .iter()
                .filter(|(key, _)| match key {
                    Receiver::FieldAccess { field: other, .. } => *key != target && other == field,
                    _ => false,
                })
                .map(|(key, _)| key.clone())
                .collect_vec();
            for key in aliased {
                match &value {
                    Some(v) => {
                        if let Some(old) = self.values.get_mut(&key) {
                            *old = old.least_upper_bound(v);
                        }
                    },
                    None => {
                        self.values.remove(&key);
                    },
                }
            }
        }
        match value {
            Some(v) => self.insert(target.clone(), v),
            None => {
                self.values.remove(target);
            },
        }
    }

    fn update_for_unknown_assignment(&mut self, target: &Receiver) {
        self.values.retain(|key, _| match key {
            // Any array element or pure call result may depend on the target.
            Receiver::ArrayAccess { .. } | Receiver::PureMethodCall { .. } => false,
            Receiver::FieldAccess { field, .. } => match target {
                // An array element never overlaps a field.
                Receiver::ArrayAccess { .. } => true,
                Receiver::FieldAccess { field: assigned, .. } => field != assigned,
                _ => key.is_unmodifiable_by_other_code(),
            },
            _ => true,
        });
        self.values.remove(target);
    }

    fn update_for_call<D>(&mut self, call: &CallSite, driver: &D, value: Option<&V>)
    where
        D: AnalysisDriver<Value = V>,
    {
        if !self.sequential_semantics || !self.is_side_effect_free(&call.method, driver) {
            self.remove_modifiable();
        }
        if let (Some(v), Receiver::PureMethodCall { .. }) = (value, &call.receiver) {
            if !call.receiver.contains_unknown() {
                self.values.insert(call.receiver.clone(), v.clone());
            }
        }
    }

    fn initialize_parameter(&mut self, param: &LocalVar, value: Option<V>) {
        if let Some(v) = value {
            self.values.insert(Receiver::LocalVariable(param.clone()), v);
        }
    }

    fn join(&self, other: &Self) -> Self {
        let values = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                other
                    .values
                    .get(key)
                    .map(|o| (key.clone(), value.least_upper_bound(o)))
            })
            .collect();
        FlowStore {
            values,
            sequential_semantics: self.sequential_semantics,
            assume_side_effect_free: self.assume_side_effect_free,
        }
    }
}

impl<V: AbstractValue> fmt::Debug for FlowStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.values
                .iter()
                .map(|(key, value)| format!("{} -> {:?}", key, value))
                .join(", ")
        )
    }
}
