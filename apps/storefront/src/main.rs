//! # `cuota` Entry Point
//!
//! ```text
//! $ CUOTA_ACCESS_TOKEN=... cuota orders --status processing
//! $ cuota rate
//! $ cuota conditions 42 --currency usd
//! ```
//!
//! Prints JSON on success. Failures print the `ApiError` as JSON on stderr
//! and exit non-zero.

use std::process::ExitCode;

use cuota_storefront::{init_tracing, run, Args};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            match serde_json::to_string(&err) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}
