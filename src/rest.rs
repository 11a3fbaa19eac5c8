//! Bearer-authenticated REST calls for a resolved client
//!
//! Requests go to paths relative to the descriptor's instance URL. A 401
//! response triggers one refresh through the descriptor's refresher and one
//! retry; anything else is returned as-is.

use reqwest::{Client, Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::core::ClientDescriptor;
use crate::error::{CredentialError, Result};

/// HTTP client bound to one account
#[derive(Debug)]
pub struct RestClient {
    http: Client,
    descriptor: ClientDescriptor,
}

impl RestClient {
    pub fn new(descriptor: ClientDescriptor) -> Self {
        Self::with_http_client(Client::new(), descriptor)
    }

    pub fn with_http_client(http: Client, descriptor: ClientDescriptor) -> Self {
        Self { http, descriptor }
    }

    pub fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    /// GET a path and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// POST a JSON body to a path and decode the JSON answer
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Send a request, refreshing the access token once on 401
    ///
    /// The returned response may still carry an error status.
    pub async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;

        let token = match self.descriptor.access_token() {
            Some(token) => token,
            // A previous refresh failed; try once more before the first call
            None => self.descriptor.refresh_access_token().await?,
        };

        let response = self.execute(&method, &url, body, token.expose_secret()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        info!(account = %self.descriptor.account(), "Access token rejected, refreshing");
        let token = self.descriptor.refresh_access_token().await?;
        self.execute(&method, &url, body, token.expose_secret()).await
    }

    async fn execute<B>(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&B>,
        token: &str,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        debug!("{} {}", method, url);
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.descriptor
            .instance_url()
            .join(path)
            .map_err(|e| {
                CredentialError::InvalidInput(format!("Invalid request path '{}': {}", path, e))
            })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(CredentialError::Api {
        status: status.as_u16(),
        message,
    })
}
