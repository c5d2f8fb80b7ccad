//! Client-credentials token exchange for the Spotify Web API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::config::SpotifyCredentials;
use crate::error::{Error, Result};

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

impl TokenResponse {
    /// Only bearer tokens can be used for catalog requests.
    fn into_access_token(self) -> Result<AccessToken> {
        if !self.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::Auth(format!("unexpected token type: {}", self.token_type)));
        }
        Ok(AccessToken { token: self.access_token })
    }
}

/// A bearer token for catalog requests.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
}

impl AccessToken {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Value of the `Authorization` header for the token request.
fn basic_auth_header(creds: &SpotifyCredentials) -> String {
    let raw = format!("{}:{}", creds.client_id, creds.client_secret);
    format!("Basic {}", STANDARD.encode(raw))
}

/// Exchange client credentials for an access token.
pub fn fetch_token(agent: &ureq::Agent, creds: &SpotifyCredentials) -> Result<AccessToken> {
    let response = agent
        .post(TOKEN_URL)
        .set("Authorization", &basic_auth_header(creds))
        .send_form(&[("grant_type", "client_credentials")])
        .map_err(|e| Error::Auth(format!("unable to retrieve token: {}", e)))?;

    let token = response
        .into_json::<TokenResponse>()
        .map_err(|e| Error::Auth(format!("invalid token response: {}", e)))?
        .into_access_token()?;

    log::info!("Authenticated with Spotify");
    Ok(token)
}
