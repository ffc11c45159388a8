//! Incrementing a counter inside a map, six ways.
//!
//! Run with `RUST_LOG=mutstore=trace` to see every publish.

use std::collections::HashMap;

use mutstore::{mutable, safe_mutable, MutableStore, Writable};
use tracing_subscriber::EnvFilter;

type Counts = HashMap<&'static str, u32>;

fn data() -> Counts {
    HashMap::from([("a", 0), ("b", 0)])
}

fn bump(counts: &mut Counts) {
    *counts.entry("a").or_insert(0) += 1;
}

fn run_mutable_store<S: MutableStore<Counts>>(label: &str, store: S) {
    let label = label.to_string();
    let sub = store.subscribe(move |w| println!("   [{}] a = {}", label, w.value()["a"]));
    store.mutate(bump);
    store.mutate(bump);
    sub.unsubscribe();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Map counter ===\n");

    println!("1. Writable map, same map set again");
    let writable_map = Writable::new(std::rc::Rc::new(std::cell::RefCell::new(data())));
    let sub = writable_map.subscribe(|m| println!("   [writable] a = {}", m.borrow()["a"]));
    let current = writable_map.get();
    bump(&mut current.borrow_mut());
    writable_map.set(current);
    sub.unsubscribe();

    println!("\n2. Writable map, cloned on every update");
    let cloned_map = Writable::new(data());
    let sub = cloned_map.subscribe(|m| println!("   [cloned] a = {}", m["a"]));
    cloned_map.update(|m| {
        let mut next = m.clone();
        bump(&mut next);
        next
    });
    sub.unsubscribe();

    println!("\n3. Double-buffered store with a mutator");
    run_mutable_store("mutable", mutable(data()));

    println!("\n4. Fresh-wrapper store with a mutator");
    run_mutable_store("safe_mutable", safe_mutable(data()));

    println!("\n5. Double-buffered store, mutated directly then touched");
    let manual = mutable(data());
    let sub = manual.subscribe(|w| println!("   [manual] a = {}", w.value()["a"]));
    bump(&mut manual.current().value_mut());
    manual.touch();
    sub.unsubscribe();

    println!("\n6. Fallible mutator");
    let strict = mutable(data());
    let result = strict.try_mutate(|m| match m.get_mut("z") {
        Some(n) => {
            *n += 1;
            Ok(())
        }
        None => Err("no counter named z"),
    });
    if let Err(e) = result {
        println!("   [strict] {}", e);
    }
}
