//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `medialib_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use medialib_core::db::migrations::latest_version;
use medialib_core::db::open_db_in_memory;

fn main() {
    println!("medialib_core version={}", medialib_core::core_version());
    match open_db_in_memory() {
        Ok(_) => println!("medialib_core schema_version={}", latest_version()),
        Err(err) => {
            eprintln!("medialib_core bootstrap failed: {err}");
            std::process::exit(1);
        }
    }
}
