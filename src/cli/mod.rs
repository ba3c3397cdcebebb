pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::context::AppContext;
use crate::error::ClientError;

#[derive(Parser)]
#[command(name = "staoo")]
#[command(about = "Staoo CLI - Command-line client for the Staoo admin console")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Menu, routes and navigation for the current identity")]
    Nav {
        #[command(subcommand)]
        cmd: commands::nav::NavCommands,
    },

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::system::UserCommands,
    },

    #[command(about = "Role management")]
    Role {
        #[command(subcommand)]
        cmd: commands::system::RoleCommands,
    },

    #[command(about = "Department management")]
    Dept {
        #[command(subcommand)]
        cmd: commands::system::DeptCommands,
    },

    #[command(about = "Tenant management")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::system::TenantCommands,
    },

    #[command(about = "Menu administration")]
    Menu {
        #[command(subcommand)]
        cmd: commands::system::MenuCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = AppContext::from_config(config::config().clone())?;

    // A fresh login does not need the previous session
    if !matches!(cli.command, Commands::Auth { cmd: commands::auth::AuthCommands::Login { .. } }) {
        let outcome = ctx.restore().await;
        tracing::debug!("Session restore: {:?}", outcome);
    }

    let format = output_format.clone();
    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx, output_format).await,
        Commands::Nav { cmd } => commands::nav::handle(cmd, &ctx, output_format).await,
        Commands::User { cmd } => commands::system::handle_user(cmd, &ctx, output_format).await,
        Commands::Role { cmd } => commands::system::handle_role(cmd, &ctx, output_format).await,
        Commands::Dept { cmd } => commands::system::handle_dept(cmd, &ctx, output_format).await,
        Commands::Tenant { cmd } => commands::system::handle_tenant(cmd, &ctx, output_format).await,
        Commands::Menu { cmd } => commands::system::handle_menu(cmd, &ctx, output_format).await,
    };

    // JSON consumers get the stable error code on stdout as well
    if let (Err(e), OutputFormat::Json) = (&result, &format) {
        if let Some(client_error) = e.downcast_ref::<ClientError>() {
            utils::output_error(&format, &client_error.to_string(), Some(client_error.error_code()))?;
        }
    }
    result
}
