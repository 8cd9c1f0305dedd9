//! Counter application wired to real configuration and logging.
//!
//! Run twice to see the count survive a restart:
//!
//! ```text
//! RUST_LOG=counter_store=debug cargo run --example counter_app
//! ```
//!
//! An optional first argument points at a TOML config file.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use counter_store::{Config, CounterStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load()?,
    };

    println!("=== Persisted Counter ===\n");
    let counter = CounterStore::from_config(&config);
    println!("Restored count: {}", counter.count());

    counter.subscribe(|state| {
        println!("   [State] Count: {}", state.count);
    });
    counter.subscribe_is_even(|even, _| {
        println!("   [Parity] now {}", if even { "even" } else { "odd" });
    });

    println!("\nIncrementing twice, decrementing once...");
    counter.increment();
    counter.increment();
    counter.decrement();

    println!(
        "\nCount: {} | Even: {}",
        counter.count(),
        counter.is_even()
    );
    println!("Saved under '{}'", counter.name());
    Ok(())
}
