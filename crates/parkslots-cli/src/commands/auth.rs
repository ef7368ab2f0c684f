//! Auth commands - sign-in state for the Microsoft 365 account
//!
//! Provides the `parkslots auth` CLI subcommands which:
//! 1. `login`  - Signs in through the browser unless an account is cached.
//! 2. `logout` - Opens the sign-out page and forgets local tokens and account.
//! 3. `status` - Shows the active account and whether its token is still valid.
//! 4. `token`  - Prints an access token, refreshing or signing in as needed.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use parkslots_graph::{KeyringTokenStorage, TokenStorage};
use tracing::info;

use crate::app::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with a Microsoft 365 account
    Login,
    /// Sign out and remove stored credentials
    Logout,
    /// Check authentication status
    Status,
    /// Print an access token for Microsoft Graph
    Token,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Login => execute_login(ctx, &*fmt).await,
            AuthCommand::Logout => execute_logout(ctx, &*fmt).await,
            AuthCommand::Status => execute_status(ctx, &*fmt, format),
            AuthCommand::Token => execute_token(ctx, &*fmt, format).await,
        }
    }
}

async fn execute_login(ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
    let session = ctx.session(ctx.open_store()?);

    info!(client_id = %ctx.config.auth.client_id, "Starting login");
    fmt.info("Opening browser for Microsoft login if needed...");

    let account = session.sign_in().await.context("Login failed")?;

    fmt.success(&format!(
        "Authenticated as {} ({})",
        account.display_name(),
        account.username
    ));
    Ok(())
}

async fn execute_logout(ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
    let identity = ctx.identity(ctx.open_store()?);

    if identity.current_account().is_none() {
        fmt.info("No account signed in. Nothing to log out.");
        return Ok(());
    }

    identity.logout().await.context("Logout failed")?;

    fmt.success("Logged out successfully");
    fmt.info("Credentials removed from keyring");
    Ok(())
}

fn execute_status(ctx: &AppContext, fmt: &dyn OutputFormatter, format: OutputFormat) -> Result<()> {
    let identity = ctx.identity(ctx.open_store()?);

    let account = match identity.current_account() {
        Some(account) => account,
        None => {
            if format == OutputFormat::Json {
                fmt.print_json(&serde_json::json!({ "authenticated": false }));
            } else {
                fmt.info("Authentication status: Not signed in");
                fmt.info("Run 'parkslots auth login' to authenticate");
            }
            return Ok(());
        }
    };

    let (token_status, expires_at) = match KeyringTokenStorage.load(&account.username) {
        Ok(Some(tokens)) if tokens.expires_at > Utc::now() => ("Valid", Some(tokens.expires_at)),
        Ok(Some(tokens)) if tokens.refresh_token.is_some() => {
            ("Expired (refreshable)", Some(tokens.expires_at))
        }
        Ok(Some(tokens)) => ("Expired", Some(tokens.expires_at)),
        Ok(None) => ("Not found", None),
        Err(_) => ("Error reading keyring", None),
    };

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "authenticated": true,
            "username": account.username,
            "name": account.name,
            "home_account_id": account.home_account_id,
            "token_status": token_status,
            "expires_at": expires_at.map(|t| t.to_rfc3339()),
            "scopes": identity.scopes(),
        }));
    } else {
        fmt.success(&format!(
            "Authenticated as {} ({})",
            account.display_name(),
            account.username
        ));
        fmt.info(&format!("Token status:  {}", token_status));
        if let Some(expires_at) = expires_at {
            fmt.info(&format!(
                "Expires:       {}",
                expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        fmt.info(&format!("Scopes:        {}", identity.scopes().join(" ")));
    }
    Ok(())
}

async fn execute_token(
    ctx: &AppContext,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let session = ctx.session(ctx.open_store()?);
    session.start().await;
    if session.account().await.is_none() {
        anyhow::bail!("Not signed in. Run 'parkslots auth login' first");
    }

    let token = session
        .get_token()
        .await
        .context("Failed to acquire access token")?;

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({ "access_token": token }));
    } else {
        println!("{}", token);
    }
    Ok(())
}
