//! `pgvet` command-line utilities.
//!
//! This crate powers the `pgvet` binary (see `crates/pgvet-cli/src/main.rs`).
//! The public surface is intentionally small: most logic lives in internal
//! modules and is dispatched from [`run`].

mod check;
mod cli;
mod config;
mod schema;

/// Runs the `pgvet` CLI with an argv-style argument list.
///
/// Most callers should pass `std::env::args().collect()`.
pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Check(args) => check::run(args),
        cli::Command::Schema(args) => schema::run(args),
    }
}
