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

//! Ports to the two third-party platforms.
//!
//! The transfer engine only ever talks to these traits; `spotify` and
//! `youtube` hold the production adapters.

use crate::models::{PlaylistEntry, PlaylistRef, SearchCandidate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Spotify,
    YouTube,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Spotify => f.write_str("Spotify"),
            Platform::YouTube => f.write_str("YouTube"),
        }
    }
}

/// Opaque OAuth access token sent as `Authorization: Bearer ...`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("credential rejected (401)")]
    Auth,
    #[error("quota or rate limit exceeded ({status})")]
    Quota { status: u16, reason: Option<String> },
    #[error("upstream request failed: {message}")]
    Upstream {
        status: Option<u16>,
        reason: Option<String>,
        message: String,
    },
}

/// Reasons the destination reports when a video is already in the playlist.
const DUPLICATE_ITEM_REASONS: &[&str] = &["videoAlreadyInPlaylist", "playlistItemsNotAccessible"];

impl PlatformError {
    /// Classifies a non-2xx response from the destination platform.
    pub fn from_status(status: u16, reason: Option<String>, message: String) -> Self {
        match status {
            401 => PlatformError::Auth,
            403 | 429 => PlatformError::Quota { status, reason },
            _ => PlatformError::Upstream {
                status: Some(status),
                reason,
                message,
            },
        }
    }

    /// Classifies a non-2xx response from the source platform, which has no
    /// quota class of its own.
    pub fn from_source_status(status: u16, message: String) -> Self {
        match status {
            401 => PlatformError::Auth,
            _ => PlatformError::Upstream {
                status: Some(status),
                reason: None,
                message,
            },
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        PlatformError::Upstream {
            status: None,
            reason: None,
            message: message.into(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PlatformError::Auth => None,
            PlatformError::Quota { reason, .. } | PlatformError::Upstream { reason, .. } => {
                reason.as_deref()
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PlatformError::Quota { .. })
    }

    pub fn is_duplicate_item(&self) -> bool {
        self.reason()
            .is_some_and(|reason| DUPLICATE_ITEM_REASONS.contains(&reason))
    }
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage<T> {
    pub items: Vec<T>,
    /// Total number of items the listing reports across all pages.
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistPrivacy {
    Private,
    Unlisted,
    Public,
}

impl PlaylistPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistPrivacy::Private => "private",
            PlaylistPrivacy::Unlisted => "unlisted",
            PlaylistPrivacy::Public => "public",
        }
    }
}

/// The platform playlists are read from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourcePlatform: Send + Sync {
    async fn playlists_page(
        &self,
        credential: &BearerToken,
        offset: u32,
        limit: u32,
    ) -> Result<CatalogPage<PlaylistRef>, PlatformError>;

    async fn tracks_page(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<CatalogPage<PlaylistEntry>, PlatformError>;
}

/// The platform playlists are written to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DestinationPlatform: Send + Sync {
    /// Searches embeddable public videos.
    async fn search_videos(
        &self,
        credential: &BearerToken,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchCandidate>, PlatformError>;

    async fn create_playlist(
        &self,
        credential: &BearerToken,
        title: &str,
        description: &str,
        privacy: PlaylistPrivacy,
    ) -> Result<String, PlatformError>;

    async fn insert_playlist_item(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), PlatformError>;
}
