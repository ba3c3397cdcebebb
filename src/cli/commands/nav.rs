use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::guard::{GuardState, NavigationOutcome};
use crate::menu::MenuSource;

#[derive(Subcommand)]
pub enum NavCommands {
    #[command(about = "Show the route table synthesized for the current identity")]
    Routes,

    #[command(about = "Show the sidebar menu")]
    Menu,

    #[command(about = "Run a navigation through the guard and show the outcome")]
    Go {
        #[arg(help = "Target path, e.g. /system/user")]
        path: String,
    },

    #[command(about = "Check whether the current identity holds a permission")]
    Can {
        #[arg(help = "Permission string, e.g. system:user:list")]
        permission: String,
    },
}

pub async fn handle(cmd: NavCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        NavCommands::Routes => {
            prepare(ctx).await?;
            let routes = ctx.guard.routes();
            if routes.is_empty() {
                return output_empty_collection(&output_format, "routes", "No routes available for this identity");
            }
            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "routes": routes,
                    "fallback": ctx.guard.menu_source() == Some(MenuSource::Fallback),
                })),
                OutputFormat::Text => {
                    if ctx.guard.menu_source() == Some(MenuSource::Fallback) {
                        println!("(menu service unavailable, showing fallback menu)");
                    }
                    println!("{:<36} {:<22} {}", "PATH", "NAME", "VIEW");
                    println!("{}", "-".repeat(90));
                    print_route_tree(&routes, 0);
                    Ok(())
                }
            }
        }
        NavCommands::Menu => {
            prepare(ctx).await?;
            let sidebar = ctx.guard.sidebar();
            if sidebar.is_empty() {
                return output_empty_collection(&output_format, "menu", "Menu is empty");
            }
            match output_format {
                OutputFormat::Json => output_json(&json!({ "menu": sidebar })),
                OutputFormat::Text => {
                    print_menu(&sidebar, 0);
                    Ok(())
                }
            }
        }
        NavCommands::Go { path } => {
            let outcome = ctx.guard.navigate(&path).await;
            match output_format {
                OutputFormat::Json => output_json(&outcome),
                OutputFormat::Text => {
                    match outcome {
                        NavigationOutcome::Proceed { route, title } => {
                            println!("→ {} [{}] {}", route.path, route.record.name, route.record.view.module);
                            println!("Title: {}", title);
                        }
                        NavigationOutcome::Redirect { to, reason } => {
                            println!("↪ redirect to {} ({:?})", to, reason);
                        }
                    }
                    Ok(())
                }
            }
        }
        NavCommands::Can { permission } => {
            // Button permissions arrive with the menu, not with the identity
            if ctx.session.is_authenticated() {
                prepare(ctx).await?;
            }
            let allowed = ctx.session.has_permission(&permission);
            match output_format {
                OutputFormat::Json => output_json(&json!({ "permission": permission, "allowed": allowed })),
                OutputFormat::Text => {
                    println!("{}: {}", permission, if allowed { "allowed" } else { "denied" });
                    Ok(())
                }
            }
        }
    }
}

async fn prepare(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.guard.state() == GuardState::Unauthenticated {
        return Err(anyhow::anyhow!("Not logged in"));
    }
    if let Err(e) = ctx.guard.prepare_routes().await {
        if e.requires_login() {
            ctx.logout().await?;
        }
        return Err(e.into());
    }
    Ok(())
}

fn print_menu(routes: &[crate::routing::RouteDefinition], depth: usize) {
    for route in routes {
        let icon = route.meta.icon.as_deref().map(|i| format!(" [{}]", i)).unwrap_or_default();
        println!("{}{}{}  {}", "  ".repeat(depth), route.meta.title, icon, route.path);
        print_menu(&route.children, depth + 1);
    }
}
