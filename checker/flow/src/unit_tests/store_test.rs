// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use super::*;

fn store_with(options: &TransferOptions) -> TestStore {
    TestStore::empty(options)
}

fn plain_call(method: u32) -> CallSite {
    CallSite {
        method: MethodId(method),
        receiver: Receiver::Unknown(CLASS),
        arguments: vec![],
    }
}

#[test]
fn insert_overwrites_previous_value() {
    let driver = TestDriver::new();
    let x = local(0, "x");
    let mut store = empty_store();
    store.insert(x.clone(), driver.value("NonNull"));
    store.insert(x.clone(), driver.value("Nullable"));
    assert_eq!(store.value_of(&x), Some(&driver.value("Nullable")));
    assert_eq!(store.len(), 1);
}

#[test]
fn assignment_drops_facts_about_dependents() {
    let driver = TestDriver::new();
    let x = local(0, "x");
    let x_f = Receiver::field(x.clone(), field(0, "f", true));
    let call = Receiver::pure_call(Receiver::ThisReference(CLASS), MethodId(1), vec![x.clone()]);
    let y = local(1, "y");
    let mut store = empty_store();
    for receiver in [&x, &x_f, &call, &y] {
        store.insert(receiver.clone(), driver.value("NonNull"));
    }

    store.update_for_assignment(&x, Some(driver.value("Initialized")));
    assert_eq!(store.value_of(&x), Some(&driver.value("Initialized")));
    assert!(!store.contains(&x_f));
    assert!(!store.contains(&call));
    assert!(store.contains(&y));
}

#[test]
fn field_assignment_weakens_possible_aliases() {
    let driver = TestDriver::new();
    let f = field(0, "f", false);
    let a_f = Receiver::field(local(0, "a"), f.clone());
    let b_f = Receiver::field(local(1, "b"), f.clone());
    let b_g = Receiver::field(local(1, "b"), field(1, "g", false));
    let mut store = empty_store();
    store.insert(b_f.clone(), driver.value("Initialized"));
    store.insert(b_g.clone(), driver.value("Initialized"));

    store.update_for_assignment(&a_f, Some(driver.value("NonNull")));
    assert_eq!(store.value_of(&a_f), Some(&driver.value("NonNull")));
    assert_eq!(store.value_of(&b_f), Some(&driver.value("Nullable")));
    assert_eq!(store.value_of(&b_g), Some(&driver.value("Initialized")));

    store.update_for_assignment(&a_f, None);
    assert!(!store.contains(&a_f));
    assert!(!store.contains(&b_f));
    assert!(store.contains(&b_g));
}

#[test]
fn unknown_field_assignment_drops_same_field_only() {
    let driver = TestDriver::new();
    let f = field(0, "f", false);
    let b_f = Receiver::field(local(1, "b"), f.clone());
    let b_g = Receiver::field(local(1, "b"), field(1, "g", false));
    let x = local(0, "x");
    let mut store = empty_store();
    for receiver in [&b_f, &b_g, &x] {
        store.insert(receiver.clone(), driver.value("NonNull"));
    }

    store.update_for_unknown_assignment(&Receiver::field(Receiver::Unknown(CLASS), f));
    assert!(!store.contains(&b_f));
    assert!(store.contains(&b_g));
    assert!(store.contains(&x));
}

#[test]
fn side_effect_free_call_keeps_fields() {
    let driver = TestDriver::new().with_side_effect_free(MethodId(1));
    let f = this_field(0, "f", false);
    let mut store = empty_store();
    store.insert(f.clone(), driver.value("NonNull"));

    store.update_for_call(&plain_call(1), &driver, None);
    assert!(store.contains(&f));
    store.update_for_call(&plain_call(2), &driver, None);
    assert!(!store.contains(&f));
}

#[test]
fn assumed_side_effect_freedom_keeps_fields() {
    let driver = TestDriver::new();
    let options = TransferOptions::default().set_assume_side_effect_free(true);
    let f = this_field(0, "f", false);
    let mut store = store_with(&options);
    store.insert(f.clone(), driver.value("NonNull"));

    store.update_for_call(&plain_call(2), &driver, None);
    assert!(store.contains(&f));
}

#[test]
fn concurrent_semantics_never_tracks_shared_fields() {
    let driver = TestDriver::new().with_side_effect_free(MethodId(1));
    let options = TransferOptions::default().set_concurrent_semantics(true);
    let f = this_field(0, "f", false);
    let g = this_field(1, "g", true);
    let x = local(0, "x");
    let x_h = Receiver::field(x.clone(), field(2, "h", true));
    let mut store = store_with(&options);
    store.insert(f.clone(), driver.value("NonNull"));
    store.insert(g.clone(), driver.value("NonNull"));
    store.insert(x_h.clone(), driver.value("NonNull"));
    assert!(!store.contains(&f));
    assert!(store.contains(&g));
    assert!(store.contains(&x_h));

    // Even a side-effect free callee cannot rule out other threads.
    let pure = Receiver::pure_call(Receiver::ThisReference(CLASS), MethodId(1), vec![]);
    store.insert(pure.clone(), driver.value("NonNull"));
    store.update_for_call(&plain_call(1), &driver, None);
    assert!(!store.contains(&pure));
    assert!(store.contains(&g));
}

#[test]
fn call_result_is_recorded_for_pure_calls() {
    let driver = TestDriver::new();
    let pure = Receiver::pure_call(Receiver::ThisReference(CLASS), MethodId(1), vec![]);
    let call = CallSite {
        method: MethodId(1),
        receiver: pure.clone(),
        arguments: vec![],
    };
    let mut store = empty_store();
    store.update_for_call(&call, &driver, Some(&driver.value("NonNull")));
    assert_eq!(store.value_of(&pure), Some(&driver.value("NonNull")));

    let mut store = empty_store();
    store.update_for_call(&plain_call(1), &driver, Some(&driver.value("NonNull")));
    assert!(store.is_empty());
}

#[test]
fn join_keeps_common_facts() {
    let driver = TestDriver::new();
    let (x, y) = (local(0, "x"), local(1, "y"));
    let mut left = empty_store();
    left.insert(x.clone(), driver.value("NonNull"));
    left.insert(y.clone(), driver.value("NonNull"));
    let mut right = empty_store();
    right.insert(x.clone(), driver.value("Initialized"));

    let joined = left.join(&right);
    assert_eq!(joined.value_of(&x), Some(&driver.value("Nullable")));
    assert!(!joined.contains(&y));
    assert_eq!(format!("{:?}", joined), "{x -> @Nullable}");
}
