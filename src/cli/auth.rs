//! CLI command handlers. Only the credential itself goes to stdout.

use crate::auth::AuthService;
use crate::config::KeyfetchConfig;
use crate::error::Result;

fn service(base_url: Option<String>) -> Result<AuthService> {
    let mut config = KeyfetchConfig::from_env()?;
    if let Some(url) = base_url {
        config = config.with_base_url(url);
    }
    Ok(AuthService::from_config(&config)?)
}

/// Handle `keyfetch token`.
pub async fn handle_token(base_url: Option<String>, interactive: bool) -> Result<()> {
    let service = service(base_url)?;
    let resolved = service.resolver(interactive).resolve().await?;
    eprintln!("credential source: {}", resolved.source);
    println!("{}", resolved.credential);
    Ok(())
}

/// Handle `keyfetch auth login`.
pub async fn handle_login(base_url: Option<String>) -> Result<()> {
    let service = service(base_url)?;
    let outcome = service.login().await?;
    match outcome.record.identity_label.as_deref() {
        Some(label) => eprintln!("Logged in as {label}"),
        None => eprintln!("Logged in"),
    }
    if !outcome.cached {
        eprintln!("Warning: the credential could not be cached and is valid for this run only");
    }
    Ok(())
}

/// Handle `keyfetch auth status`.
pub async fn handle_status(base_url: Option<String>) -> Result<()> {
    let service = service(base_url)?;
    let status = service.status();

    let override_state = if status.explicit_override {
        "set (takes precedence)"
    } else {
        "not set"
    };
    eprintln!("{}: {override_state}", crate::config::API_KEY_ENV);

    match status.cached {
        Some(record) => {
            let who = record
                .identity_label
                .or(record.subject_id)
                .unwrap_or_else(|| "unknown identity".to_string());
            eprintln!(
                "Cached credential: {who} (since {})",
                record.cached_at.format("%Y-%m-%d %H:%M")
            );
        }
        None => eprintln!("Cached credential: none"),
    }
    Ok(())
}

/// Handle `keyfetch auth logout`.
pub async fn handle_logout(base_url: Option<String>) -> Result<()> {
    service(base_url)?.logout()?;
    eprintln!("Cached credential removed");
    Ok(())
}
