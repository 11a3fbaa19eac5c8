//! Account CLI command handlers

use crate::auth::{LoginFlow, LoginOptions};
use crate::cli::build_manager;
use crate::cli::commands::AccountsCommand;
use crate::cli::login::StdinLoginFlow;
use crate::core::{ClientManager, Config};
use crate::error::{CredentialError, Result};

/// Handle account commands
pub async fn handle_accounts(command: AccountsCommand) -> Result<()> {
    let config = Config::load()?;
    let manager = build_manager(&config);

    match command {
        AccountsCommand::List => handle_list(&manager),
        AccountsCommand::Add { login_server } => {
            let login_server = login_server.or(config.default_login_server);
            handle_add(&manager, login_server).await
        }
        AccountsCommand::Remove { name, all } => handle_remove(&manager, name, all).await,
    }
}

fn handle_list(manager: &ClientManager) -> Result<()> {
    let accounts = manager.resolver().list_all()?;
    if accounts.is_empty() {
        println!("No accounts of type {}.", manager.context().account_type());
        return Ok(());
    }

    for (index, account) in accounts.iter().enumerate() {
        let marker = if index == 0 { "*" } else { " " };
        println!("{} {}", marker, account.name);
    }
    println!();
    println!("  * active account");
    Ok(())
}

async fn handle_add(manager: &ClientManager, login_server: Option<String>) -> Result<()> {
    let options = LoginOptions {
        account_type: manager.context().account_type().to_string(),
        login_server,
    };
    let credentials = StdinLoginFlow::new().login(&options).await?;
    manager.provisioner().create_or_update(&credentials)?;

    println!();
    println!("✓ Stored account {}.", credentials.username);
    Ok(())
}

async fn handle_remove(manager: &ClientManager, name: Option<String>, all: bool) -> Result<()> {
    let accounts = if all {
        manager.resolver().list_all()?
    } else if let Some(name) = name {
        let account = manager.resolver().resolve_by_name(&name)?.ok_or_else(|| {
            CredentialError::InvalidInput(format!("No account named '{}'", name))
        })?;
        vec![account]
    } else {
        manager
            .resolver()
            .active_account()?
            .into_iter()
            .collect()
    };

    if accounts.is_empty() {
        println!("No accounts to remove.");
        return Ok(());
    }

    let report = manager.provisioner().remove_all(&accounts).await;
    for name in &report.removed {
        println!("✓ Removed {}", name);
    }
    for (name, reason) in &report.failed {
        eprintln!("✗ Could not remove {}: {}", name, reason);
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CredentialError::Store(format!(
            "{} of {} accounts could not be removed",
            report.failed.len(),
            accounts.len()
        )))
    }
}
