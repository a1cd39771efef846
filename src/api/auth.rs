//! Login and current-user lookups against the WMS backend.

use log::info;

use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::types::{TokenResponse, UserProfile};

/// Exchange credentials for a bearer token and store it.
///
/// The token endpoint takes the OAuth2 password-flow form encoding.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<UserProfile, ApiError> {
    let form = [("username", username), ("password", password)];
    let token: TokenResponse = client.post_form("/auth/token", &form).await?;
    client.tokens().set(&token.access_token);
    info!("Logged in as {}", username);
    current_user(client).await
}

/// `GET /auth/me`.
pub async fn current_user(client: &ApiClient) -> Result<UserProfile, ApiError> {
    client.get("/auth/me", &[]).await
}

/// Drop the stored token. Purely local; the backend keeps no session.
pub fn logout(client: &ApiClient) {
    client.tokens().clear();
    info!("Logged out");
}
