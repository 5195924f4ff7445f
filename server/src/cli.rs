//! # CLI Interface
//!
//! Defines the command-line argument structure for `vendo-server` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vendo_machine::config::{DEFAULT_API_PORT, DEFAULT_INVENTORY_FILE, DEFAULT_METRICS_PORT};

/// VENDO vending machine service.
///
/// Serves one vending machine unit over HTTP: coin handling, inventory
/// queries, purchases, and an authenticated admin reset. Exposes
/// Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "vendo-server",
    about = "VENDO vending machine HTTP service",
    version,
    propagate_version = true
)]
pub struct VendoCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VENDO binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the vending machine service.
    Run(RunArgs),
    /// Initialize an inventory file — writes the built-in seed catalog.
    Init(InitArgs),
    /// Query the status of a running server via its HTTP endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the inventory snapshot file (JSON).
    ///
    /// Must exist — create one with `vendo-server init` first.
    #[arg(
        long,
        short = 'i',
        env = "VENDO_INVENTORY",
        default_value = DEFAULT_INVENTORY_FILE
    )]
    pub inventory: PathBuf,

    /// Port for the customer-facing HTTP API.
    #[arg(long, env = "VENDO_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VENDO_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Username for the admin reset endpoint.
    #[arg(long, env = "VENDO_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    /// Password for the admin reset endpoint.
    ///
    /// **Prefer the environment variable over the flag in production** —
    /// flags leak into process listings.
    #[arg(long, env = "VENDO_ADMIN_PASSWORD")]
    pub admin_password: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VENDO_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the inventory file to create.
    #[arg(
        long,
        short = 'i',
        env = "VENDO_INVENTORY",
        default_value = DEFAULT_INVENTORY_FILE
    )]
    pub inventory: PathBuf,

    /// Overwrite an existing inventory file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// HTTP endpoint of the running server.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        VendoCli::command().debug_assert();
    }

    #[test]
    fn run_args_parse_with_defaults() {
        let cli = VendoCli::parse_from(["vendo-server", "run", "--admin-password", "hunter2"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.port, DEFAULT_API_PORT);
        assert_eq!(args.admin_user, "admin");
        assert_eq!(args.inventory, PathBuf::from("beverages.json"));
    }
}
