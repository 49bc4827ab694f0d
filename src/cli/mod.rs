//! CLI entry point for keyfetch.

pub mod auth;

use clap::{Parser, Subcommand};

/// keyfetch CLI
#[derive(Parser, Debug)]
#[command(name = "keyfetch", version, about = "Resolve an API credential, logging in if needed")]
pub struct Cli {
    /// Authorization server base URL (overrides KEYFETCH_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a usable credential on stdout
    Token(TokenArgs),
    /// Authentication management
    Auth(AuthArgs),
}

/// Arguments for `keyfetch token`.
#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Fail instead of starting a device login when nothing is cached
    #[arg(long)]
    pub no_interactive: bool,
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Authorize this device and cache the credential
    Login,
    /// Show authentication status
    Status,
    /// Remove the cached credential
    Logout,
}
