/*
    playlist-transfer-rs | Rust CLI tool to copy Spotify playlists to YouTube.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::platform::BearerToken;
use rspotify::{prelude::*, scopes, AuthCodeSpotify, Config, Credentials as ClientCredentials, OAuth};
use std::env;
use thiserror::Error;

pub const SPOTIFY_TOKEN_VAR: &str = "SPOTIFY_ACCESS_TOKEN";
pub const YOUTUBE_TOKEN_VAR: &str = "YOUTUBE_ACCESS_TOKEN";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to initialize Spotify client: {0}")]
    ClientConfig(String),
    #[error("Spotify authentication failed: {0}")]
    Spotify(#[from] rspotify::ClientError),
    #[error("Spotify returned no access token")]
    MissingToken,
}

/// Supplies the bearer tokens a transfer needs. Read once at the start of
/// every playlist job.
pub trait CredentialStore: Send + Sync {
    fn source_credential(&self) -> Option<BearerToken>;
    fn destination_credential(&self) -> Option<BearerToken>;
}

/// Plain pair of tokens handed to the transfer engine.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    source: Option<BearerToken>,
    destination: Option<BearerToken>,
}

impl Credentials {
    pub fn new(source: Option<BearerToken>, destination: Option<BearerToken>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Reads `SPOTIFY_ACCESS_TOKEN` and `YOUTUBE_ACCESS_TOKEN`. Blank values
    /// count as absent.
    pub fn from_env() -> Self {
        Self::new(token_from_env(SPOTIFY_TOKEN_VAR), token_from_env(YOUTUBE_TOKEN_VAR))
    }

    pub fn with_source(mut self, token: BearerToken) -> Self {
        self.source = Some(token);
        self
    }

    pub fn with_destination(mut self, token: BearerToken) -> Self {
        self.destination = Some(token);
        self
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }
}

impl CredentialStore for Credentials {
    fn source_credential(&self) -> Option<BearerToken> {
        self.source.clone()
    }

    fn destination_credential(&self) -> Option<BearerToken> {
        self.destination.clone()
    }
}

fn token_from_env(var: &str) -> Option<BearerToken> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(BearerToken::new)
}

/// Obtains a Spotify access token using the Authorization Code Flow.
///
/// Reads `RSPOTIFY_CLIENT_ID`, `RSPOTIFY_CLIENT_SECRET` and
/// `RSPOTIFY_REDIRECT_URI` from the environment and only asks for read access
/// to the user's playlists. Tokens are cached and refreshed by `rspotify`;
/// without a cached token the user is prompted (via stdout) to authorize.
pub async fn spotify_access_token() -> Result<BearerToken, AuthError> {
    let creds = ClientCredentials::from_env().ok_or_else(|| {
        AuthError::ClientConfig("Missing RSPOTIFY_CLIENT_ID or RSPOTIFY_CLIENT_SECRET".to_string())
    })?;

    let scopes = scopes!("playlist-read-private", "playlist-read-collaborative");

    let oauth = OAuth::from_env(scopes)
        .ok_or_else(|| AuthError::ClientConfig("Missing RSPOTIFY_REDIRECT_URI".to_string()))?;

    let config = Config {
        token_cached: true,
        token_refreshing: true,
        ..Default::default()
    };

    let spotify = AuthCodeSpotify::with_config(creds, oauth, config);

    let url = spotify.get_authorize_url(false)?;
    spotify.prompt_for_token(&url).await?;

    let token = spotify.get_token();
    let guard = token
        .lock()
        .await
        .map_err(|_| AuthError::ClientConfig("Spotify token lock is poisoned".to_string()))?;
    (*guard)
        .as_ref()
        .map(|t| BearerToken::new(t.access_token.clone()))
        .ok_or(AuthError::MissingToken)
}
