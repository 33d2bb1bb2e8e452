//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lazylife_core` linkage and migrations outside the app shell.
//! - Usage: `lazylife_cli [db_path]`; without a path an in-memory store is used.

use lazylife_core::{core_version, latest_version, open_db, open_db_in_memory, schema_version};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("lazylife_core version={}", core_version());

    let opened = match std::env::args().nth(1) {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    match opened {
        Ok(conn) => {
            match schema_version(&conn) {
                Ok(version) => {
                    println!("schema version={version} latest={}", latest_version());
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("failed to read schema version: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("failed to open store: {err}");
            ExitCode::FAILURE
        }
    }
}
