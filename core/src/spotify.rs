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

use crate::models::{PlaylistEntry, PlaylistRef, Track};
use crate::platform::{BearerToken, CatalogPage, PlatformError, SourcePlatform};
use async_trait::async_trait;
use log::debug;
use rspotify::{
    http::HttpError,
    model::{FullTrack, Market, PlayableItem, PlaylistId, SimplifiedPlaylist, Token},
    prelude::*,
    AuthCodeSpotify, ClientError, Config, Credentials, OAuth,
};

/// Source platform backed by the Spotify Web API.
///
/// Holds no token of its own; every call builds a client around the
/// credential it is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpotifySource;

impl SpotifySource {
    pub fn new() -> Self {
        Self
    }

    fn client(credential: &BearerToken) -> AuthCodeSpotify {
        let token = Token {
            access_token: credential.secret().to_string(),
            ..Default::default()
        };
        // Refreshing is the caller's business, between jobs.
        let config = Config {
            token_refreshing: false,
            ..Default::default()
        };
        AuthCodeSpotify::from_token_with_config(
            token,
            Credentials::default(),
            OAuth::default(),
            config,
        )
    }
}

#[async_trait]
impl SourcePlatform for SpotifySource {
    async fn playlists_page(
        &self,
        credential: &BearerToken,
        offset: u32,
        limit: u32,
    ) -> Result<CatalogPage<PlaylistRef>, PlatformError> {
        let page = Self::client(credential)
            .current_user_playlists_manual(Some(limit), Some(offset))
            .await
            .map_err(classify)?;

        Ok(CatalogPage {
            total: page.total,
            items: page.items.into_iter().map(playlist_ref).collect(),
        })
    }

    async fn tracks_page(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<CatalogPage<PlaylistEntry>, PlatformError> {
        let id = PlaylistId::from_id(playlist_id)
            .map_err(|_| PlatformError::transport(format!("Invalid Playlist ID: {}", playlist_id)))?;

        let page = Self::client(credential)
            .playlist_items_manual(id, None, Some(Market::FromToken), Some(limit), Some(offset))
            .await
            .map_err(classify)?;

        let items = page
            .items
            .into_iter()
            .map(|item| match item.track {
                Some(PlayableItem::Track(track)) => Some(track_from(track)),
                // Removed tracks and podcast episodes cannot be searched for.
                _ => None,
            })
            .collect();

        Ok(CatalogPage {
            items,
            total: page.total,
        })
    }
}

fn playlist_ref(pl: SimplifiedPlaylist) -> PlaylistRef {
    let owner_name = pl.owner.display_name.unwrap_or(pl.owner.id.id().to_string());

    PlaylistRef {
        id: pl.id.id().to_string(),
        name: pl.name,
        track_count: pl.tracks.total,
        owner_name,
        thumbnail_url: pl.images.into_iter().next().map(|image| image.url),
    }
}

fn track_from(track: FullTrack) -> Track {
    Track {
        source_id: track
            .id
            .as_ref()
            .map(|id| id.id().to_string())
            .unwrap_or_default(),
        title: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
    }
}

/// Maps an rspotify failure onto the source error classes.
fn classify(err: ClientError) -> PlatformError {
    match err {
        ClientError::Http(http) => match *http {
            HttpError::StatusCode(response) => {
                let status = response.status().as_u16();
                debug!("Spotify responded with status {}", status);
                PlatformError::from_source_status(
                    status,
                    format!("Spotify responded with status {}", status),
                )
            }
            other => PlatformError::transport(other.to_string()),
        },
        other => PlatformError::transport(other.to_string()),
    }
}
