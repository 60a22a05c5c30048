//! marktask - tasks in plain-text markdown notes

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = marktask::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
