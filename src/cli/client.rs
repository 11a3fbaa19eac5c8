//! Client CLI command handlers

use chrono::Local;
use serde_json::Value;

use crate::cli::build_manager;
use crate::cli::commands::ClientCommand;
use crate::core::{ClientDescriptor, Config};
use crate::error::{CredentialError, Result};
use crate::rest::RestClient;

/// Handle client commands
pub async fn handle_client(command: ClientCommand) -> Result<()> {
    let manager = build_manager(&Config::load()?);

    match command {
        ClientCommand::Peek => {
            let descriptor = manager.peek_client()?;
            print_descriptor(&descriptor);
            Ok(())
        }
        ClientCommand::Refresh => {
            let descriptor = manager.peek_client()?;
            descriptor.refresh_access_token().await?;
            println!("✓ Access token refreshed.");
            println!();
            print_descriptor(&descriptor);
            Ok(())
        }
        ClientCommand::Ensure => {
            // The failure cause is logged; this path only reports availability
            let descriptor = manager
                .ensure_client()
                .await
                .ok_or_else(|| CredentialError::InvalidInput("No client available.".into()))?;
            print_descriptor(&descriptor);
            Ok(())
        }
        ClientCommand::Get { path } => {
            let client = RestClient::new(manager.peek_client()?);
            let body: Value = client.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}

fn print_descriptor(descriptor: &ClientDescriptor) {
    println!("{}", descriptor);
    let refresher = descriptor.refresher();
    println!(
        "Refreshable:  {}",
        if refresher.has_refresh_token() {
            "yes"
        } else {
            "no (sign in again to refresh)"
        }
    );
    if let Some(at) = refresher.last_refresh_time() {
        println!(
            "Refreshed at: {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
}
