use std::io::{self, BufRead, Write};

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::auth::Credentials;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::session::TokenClaims;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the console")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and clear the stored session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh the access token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };

            let identity = ctx.auth.login(Credentials::new(username, password)).await?;
            output_success(
                &output_format,
                &format!("Logged in as '{}'", identity.username),
                Some(json!({ "user": identity })),
            )
        }
        AuthCommands::Logout => {
            if !ctx.session.is_authenticated() {
                return output_success(&output_format, "Not logged in", None);
            }
            ctx.logout().await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let snapshot = ctx.session.snapshot();
            let claims = snapshot.access_token.as_deref().and_then(TokenClaims::inspect);
            let expires_at = claims.as_ref().and_then(TokenClaims::expires_at);
            let expired = claims.as_ref().map(|c| c.is_expired_at(Utc::now()));

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "authenticated": snapshot.access_token.is_some(),
                    "username": snapshot.identity.as_ref().map(|i| i.username.clone()),
                    "has_refresh_token": snapshot.refresh_token.is_some(),
                    "expires_at": expires_at,
                    "expired": expired,
                    "base_url": ctx.config.api.base_url,
                })),
                OutputFormat::Text => {
                    if snapshot.access_token.is_none() {
                        println!("Not logged in ({})", ctx.config.api.base_url);
                        return Ok(());
                    }
                    let user = snapshot.identity.as_ref().map(|i| i.username.as_str());
                    println!("Logged in as {} on {}", or_dash(user), ctx.config.api.base_url);
                    if let Some(expires_at) = expires_at {
                        let state = if expired == Some(true) { "expired" } else { "valid" };
                        println!("Access token {} until {}", state, expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                    println!(
                        "Refresh token: {}",
                        if snapshot.refresh_token.is_some() { "present" } else { "absent" }
                    );
                    Ok(())
                }
            }
        }
        AuthCommands::Refresh => {
            ctx.client.refresh_now().await?;
            output_success(&output_format, "Access token refreshed", None)
        }
        AuthCommands::Whoami => {
            if !ctx.session.is_authenticated() {
                return Err(anyhow::anyhow!("Not logged in"));
            }
            let identity = match ctx.session.identity() {
                Some(identity) => identity,
                None => ctx.auth.reload_identity().await?,
            };

            match output_format {
                OutputFormat::Json => output_json(&identity),
                OutputFormat::Text => {
                    println!("{} ({})", identity.display_name, identity.username);
                    if let Some(tenant) = identity.tenant() {
                        println!("Tenant: {}", or_dash(tenant.code.as_deref()));
                    }
                    let roles: Vec<&str> = identity.roles.iter().map(String::as_str).collect();
                    println!("Roles: {}", roles.join(", "));
                    println!("Permissions: {}", identity.permissions.len());
                    Ok(())
                }
            }
        }
    }
}

fn prompt_password() -> anyhow::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(anyhow::anyhow!("Password is required"));
    }
    Ok(password)
}
