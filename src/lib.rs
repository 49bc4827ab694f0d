//! keyfetch — API credential resolution
//!
//! Produces a bearer credential from, in order: an explicit override, the
//! local credential cache, or an interactive OAuth device-code login whose
//! result is cached for the next run.
//!
//! # Quick Start
//!
//! ```no_run
//! use keyfetch::prelude::*;
//!
//! # async fn example() -> keyfetch::error::Result<()> {
//! let config = KeyfetchConfig::from_env()?;
//! let resolved = AuthService::from_config(&config)?.resolve().await?;
//! eprintln!("credential from {}", resolved.source);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
