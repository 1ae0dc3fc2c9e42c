//! Command-line interface for dosport.

mod commands;

use clap::{Parser, Subcommand};

/// dosport - sport event membership platform
#[derive(Parser)]
#[command(name = "dosport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,

    /// Register an admin account, or grant ADMIN to an existing one
    CreateAdmin {
        /// Login name of the account
        username: String,
        /// Password, used only when the account is created
        password: String,
        /// First name for a newly created account
        #[arg(long, default_value = "Administrator")]
        first_name: String,
    },

    /// Create default config file
    #[command(alias = "init")]
    InitConfig,
}

pub use commands::*;
