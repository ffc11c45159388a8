//! Building a replacement map outside the store and swapping it in.

use std::collections::HashMap;

use mutstore::{mutable, safe_mutable, Wrapper};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Swap ===\n");

    let store = mutable(HashMap::from([("a", 1u32)]));
    let sub = store.subscribe(|w| println!("   [mutable] a = {}", w.value()["a"]));

    let mut next = store.current().get();
    *next.entry("a").or_insert(0) += 1;
    let previous = store.replace(next);
    println!("   previous map had a = {}", previous["a"]);
    sub.unsubscribe();

    let safe = safe_mutable(HashMap::from([("a", 1u32)]));
    let before = safe.current();
    safe.swap(HashMap::from([("a", 99)]));
    let after = safe.current();
    println!(
        "   [safe_mutable] before a = {}, after a = {}, same wrapper: {}",
        before.value()["a"],
        after.value()["a"],
        Wrapper::same(&before, &after)
    );
}
