//! CLI command definitions using clap
//!
//! Defines the command structure for the `accmgr` CLI tool.

use clap::{Parser, Subcommand, ValueEnum};

/// accmgr - OAuth account manager
///
/// Stores OAuth accounts in the system keyring and turns them into
/// authenticated REST clients, refreshing access tokens as needed.
#[derive(Parser, Debug)]
#[command(name = "accmgr", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage stored accounts
    Accounts(AccountsArgs),

    /// Resolve and use the active client
    Client(ClientArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Account Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Account commands
#[derive(Parser, Debug)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// List stored accounts of the configured type
    List,

    /// Sign in and store a new account
    Add {
        /// Login server to authenticate against
        #[arg(long)]
        login_server: Option<String>,
    },

    /// Remove stored accounts
    Remove {
        /// Remove only the account with this name (defaults to the active one)
        #[arg(long, conflicts_with = "all")]
        name: Option<String>,

        /// Remove every account of the configured type
        #[arg(long)]
        all: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Client commands
#[derive(Parser, Debug)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Show the active client without signing in
    Peek,

    /// Refresh the access token of the active client
    Refresh,

    /// Show the active client, signing in first if needed
    Ensure,

    /// Issue an authenticated GET request against the instance server
    Get {
        /// Request path relative to the instance URL
        path: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Reset a configuration value to its default
    Remove {
        /// Configuration key
        key: ConfigKey,
    },
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigKey {
    /// Account type namespace
    #[value(name = "account-type")]
    AccountType,

    /// When a missing refresh token is reported (lazy or eager)
    #[value(name = "refresh-policy")]
    RefreshPolicy,

    /// Token refresh timeout in seconds
    #[value(name = "refresh-timeout")]
    RefreshTimeout,

    /// Default login server
    #[value(name = "login-server")]
    LoginServer,

    /// Keyring service name
    #[value(name = "keyring-service")]
    KeyringService,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_remove_name_conflicts_with_all() {
        let result = Cli::try_parse_from(["accmgr", "accounts", "remove", "--name", "a", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["accmgr", "config", "set", "refresh-policy", "eager"])
            .unwrap();
        match cli.command {
            Commands::Config(ConfigArgs {
                command: ConfigCommand::Set { key, value },
            }) => {
                assert!(matches!(key, ConfigKey::RefreshPolicy));
                assert_eq!(value, "eager");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
