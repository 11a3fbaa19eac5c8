//! Terminal login flow
//!
//! The authorization-code exchange happens elsewhere (a browser, another
//! tool); this flow collects the resulting token pair and identity fields
//! from the terminal. An empty answer to the first prompt cancels.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::auth::{LoginFlow, LoginOptions};
use crate::core::AccountCredentials;
use crate::error::{CredentialError, Result};

/// Login flow prompting on stdout and reading answers line by line
pub struct StdinLoginFlow {
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl StdinLoginFlow {
    pub fn new() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    /// Read answers from any source instead of stdin
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(reader)),
        }
    }

    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => print!("{} [{}]: ", label, default),
            None => print!("{}: ", label),
        }
        io::stdout().flush()?;

        let mut line = String::new();
        self.input
            .lock()
            .map_err(|_| CredentialError::LoginFailed("input lock poisoned".into()))?
            .read_line(&mut line)?;
        let answer = line.trim();

        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer.to_string())
    }

    fn required(&self, label: &str, default: Option<&str>) -> Result<String> {
        let value = self.prompt(label, default)?;
        if value.is_empty() {
            return Err(CredentialError::InvalidInput(format!("No {} provided", label)));
        }
        Ok(value)
    }

    fn collect(&self, options: &LoginOptions) -> Result<AccountCredentials> {
        println!("Sign in ({})", options.account_type);
        println!("==========");
        println!();
        println!("Complete the authorization in your browser, then paste the");
        println!("values returned by the identity provider. Leave the username");
        println!("empty to cancel.");
        println!();

        let username = self.prompt("Username", None)?;
        if username.is_empty() {
            return Err(CredentialError::LoginCancelled);
        }

        let login_url = self.required("Login server", options.login_server.as_deref())?;
        let instance_url = self.required("Instance URL", None)?;
        let client_id = self.required("Client ID", None)?;
        let org_id = self.required("Org ID", None)?;
        let user_id = self.required("User ID", None)?;
        let access_token = self.required("Access token", None)?;
        let refresh_token = self.required("Refresh token", None)?;

        Ok(AccountCredentials {
            username,
            refresh_token: SecretString::from(refresh_token),
            access_token: SecretString::from(access_token),
            instance_url,
            login_url,
            client_id,
            org_id,
            user_id,
        })
    }
}

impl Default for StdinLoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoginFlow for StdinLoginFlow {
    async fn login(&self, options: &LoginOptions) -> Result<AccountCredentials> {
        // Prompts block on terminal input
        tokio::task::block_in_place(|| self.collect(options))
    }
}
