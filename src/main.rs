//! keyfetch CLI binary entry point.

use clap::Parser;
use keyfetch::cli::{AuthCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("KEYFETCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_url = cli.base_url;

    let result = match cli.command {
        Commands::Token(args) => keyfetch::cli::auth::handle_token(base_url, !args.no_interactive).await,
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => keyfetch::cli::auth::handle_login(base_url).await,
            AuthCommands::Status => keyfetch::cli::auth::handle_status(base_url).await,
            AuthCommands::Logout => keyfetch::cli::auth::handle_logout(base_url).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
