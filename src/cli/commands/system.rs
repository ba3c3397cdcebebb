use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::services::{DepartmentRecord, MenuRecord, UserQuery};
use crate::types::PageQuery;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List users")]
    List {
        #[arg(long, default_value_t = 1, help = "Page number")]
        page: u32,
        #[arg(long, default_value_t = 10, help = "Page size")]
        size: u32,
        #[arg(long, help = "Filter by username")]
        username: Option<String>,
    },

    #[command(about = "Show one user")]
    Show {
        #[arg(help = "User ID")]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RoleCommands {
    #[command(about = "List roles")]
    List {
        #[arg(long, default_value_t = 1, help = "Page number")]
        page: u32,
        #[arg(long, default_value_t = 10, help = "Page size")]
        size: u32,
    },

    #[command(about = "Show one role and its menus")]
    Show {
        #[arg(help = "Role ID")]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum DeptCommands {
    #[command(about = "List departments")]
    List,

    #[command(about = "Show the department tree")]
    Tree,
}

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List tenants")]
    List {
        #[arg(long, default_value_t = 1, help = "Page number")]
        page: u32,
        #[arg(long, default_value_t = 10, help = "Page size")]
        size: u32,
    },

    #[command(about = "Show one tenant")]
    Show {
        #[arg(help = "Tenant ID")]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MenuCommands {
    #[command(about = "List menu entries")]
    List,

    #[command(about = "Show the menu tree")]
    Tree,
}

pub async fn handle_user(cmd: UserCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = ctx.users();
    match cmd {
        UserCommands::List { page, size, username } => {
            let query = UserQuery {
                page: PageQuery::page(page, size),
                username,
                ..UserQuery::default()
            };
            let result = users.list(&query).await?;
            if result.list.is_empty() {
                return output_empty_collection(&output_format, "users", "No users found");
            }
            match output_format {
                OutputFormat::Json => output_json(&result),
                OutputFormat::Text => {
                    println!("{:<8} {:<20} {:<20} {:<16} {}", "ID", "USERNAME", "NICKNAME", "DEPARTMENT", "STATUS");
                    println!("{}", "-".repeat(80));
                    for user in &result.list {
                        println!(
                            "{:<8} {:<20} {:<20} {:<16} {}",
                            user.id.unwrap_or_default(),
                            user.username,
                            or_dash(user.nickname.as_deref()),
                            or_dash(user.dept_name.as_deref()),
                            status_label(user.status)
                        );
                    }
                    println!("{} of {} user(s)", result.list.len(), result.total);
                    Ok(())
                }
            }
        }
        UserCommands::Show { id } => {
            let user = users.detail(id).await?;
            output_json(&user)
        }
    }
}

pub async fn handle_role(cmd: RoleCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let roles = ctx.roles();
    match cmd {
        RoleCommands::List { page, size } => {
            let result = roles.list(&PageQuery::page(page, size)).await?;
            if result.list.is_empty() {
                return output_empty_collection(&output_format, "roles", "No roles found");
            }
            match output_format {
                OutputFormat::Json => output_json(&result),
                OutputFormat::Text => {
                    println!("{:<8} {:<24} {:<20} {}", "ID", "NAME", "KEY", "STATUS");
                    println!("{}", "-".repeat(70));
                    for role in &result.list {
                        println!(
                            "{:<8} {:<24} {:<20} {}",
                            role.id.unwrap_or_default(),
                            role.role_name,
                            or_dash(role.role_key.as_deref()),
                            status_label(role.status)
                        );
                    }
                    Ok(())
                }
            }
        }
        RoleCommands::Show { id } => {
            let role = roles.detail(id).await?;
            let menus = roles.menus(id).await?;
            match output_format {
                OutputFormat::Json => output_json(&json!({ "role": role, "menu_ids": menus })),
                OutputFormat::Text => {
                    println!("{} ({})", role.role_name, or_dash(role.role_key.as_deref()));
                    println!("Status: {}", status_label(role.status));
                    println!("Menus: {:?}", menus);
                    Ok(())
                }
            }
        }
    }
}

pub async fn handle_dept(cmd: DeptCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let departments = ctx.departments();
    let (records, collection) = match cmd {
        DeptCommands::List => (departments.list(&PageQuery::default()).await?, "departments"),
        DeptCommands::Tree => (departments.tree().await?, "tree"),
    };
    if records.is_empty() {
        return output_empty_collection(&output_format, collection, "No departments found");
    }
    match output_format {
        OutputFormat::Json => output_json(&json!({ collection: records })),
        OutputFormat::Text => {
            print_departments(&records, 0);
            Ok(())
        }
    }
}

pub async fn handle_tenant(cmd: TenantCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let tenants = ctx.tenants();
    match cmd {
        TenantCommands::List { page, size } => {
            let result = tenants.list(&PageQuery::page(page, size)).await?;
            if result.list.is_empty() {
                return output_empty_collection(&output_format, "tenants", "No tenants found");
            }
            match output_format {
                OutputFormat::Json => output_json(&result),
                OutputFormat::Text => {
                    println!("{:<8} {:<24} {:<16} {}", "ID", "NAME", "CODE", "STATUS");
                    println!("{}", "-".repeat(60));
                    for tenant in &result.list {
                        println!(
                            "{:<8} {:<24} {:<16} {}",
                            tenant.id.unwrap_or_default(),
                            tenant.tenant_name,
                            or_dash(tenant.tenant_code.as_deref()),
                            status_label(tenant.status)
                        );
                    }
                    Ok(())
                }
            }
        }
        TenantCommands::Show { id } => {
            let tenant = tenants.detail(id).await?;
            output_json(&tenant)
        }
    }
}

pub async fn handle_menu(cmd: MenuCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let menus = ctx.menu_admin();
    let (records, collection) = match cmd {
        MenuCommands::List => (menus.list(&PageQuery::default()).await?, "menus"),
        MenuCommands::Tree => (menus.tree().await?, "tree"),
    };
    if records.is_empty() {
        return output_empty_collection(&output_format, collection, "No menu entries found");
    }
    match output_format {
        OutputFormat::Json => output_json(&json!({ collection: records })),
        OutputFormat::Text => {
            print_menus(&records, 0);
            Ok(())
        }
    }
}

fn status_label(status: Option<i32>) -> &'static str {
    match status {
        Some(0) => "disabled",
        Some(_) => "enabled",
        None => "-",
    }
}

fn print_departments(records: &[DepartmentRecord], depth: usize) {
    for dept in records {
        println!(
            "{}{} (#{}) leader: {}",
            "  ".repeat(depth),
            dept.dept_name,
            dept.id.unwrap_or_default(),
            or_dash(dept.leader_name.as_deref())
        );
        print_departments(&dept.children, depth + 1);
    }
}

fn print_menus(records: &[MenuRecord], depth: usize) {
    for menu in records {
        let kind = match menu.menu_type {
            Some(0) => "dir",
            Some(2) => "button",
            _ => "menu",
        };
        println!(
            "{}{} [{}] {} {}",
            "  ".repeat(depth),
            menu.menu_name,
            kind,
            or_dash(menu.path.as_deref()),
            or_dash(menu.perms.as_deref())
        );
        print_menus(&menu.children, depth + 1);
    }
}
