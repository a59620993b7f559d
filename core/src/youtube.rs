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

use crate::config::DEFAULT_YOUTUBE_API_BASE;
use crate::models::SearchCandidate;
use crate::platform::{BearerToken, DestinationPlatform, PlatformError, PlaylistPrivacy};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Destination platform backed by the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTubeDestination {
    client: Client,
    base_url: String,
}

impl Default for YouTubeDestination {
    fn default() -> Self {
        Self::new(DEFAULT_YOUTUBE_API_BASE)
    }
}

impl YouTubeDestination {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }
}

#[async_trait]
impl DestinationPlatform for YouTubeDestination {
    async fn search_videos(
        &self,
        credential: &BearerToken,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchCandidate>, PlatformError> {
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(self.url("search"))
            .bearer_auth(credential.secret())
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("videoEmbeddable", "true"),
                ("maxResults", max_results.as_str()),
                ("q", query),
            ])
            .send()
            .await
            .map_err(transport)?;

        let body: SearchResponse = check(response).await?.json().await.map_err(transport)?;
        Ok(candidates(body))
    }

    async fn create_playlist(
        &self,
        credential: &BearerToken,
        title: &str,
        description: &str,
        privacy: PlaylistPrivacy,
    ) -> Result<String, PlatformError> {
        let response = self
            .client
            .post(self.url("playlists"))
            .bearer_auth(credential.secret())
            .query(&[("part", "snippet,status")])
            .json(&json!({
                "snippet": { "title": title, "description": description },
                "status": { "privacyStatus": privacy.as_str() },
            }))
            .send()
            .await
            .map_err(transport)?;

        let playlist: PlaylistResource = check(response).await?.json().await.map_err(transport)?;
        Ok(playlist.id)
    }

    async fn insert_playlist_item(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), PlatformError> {
        let response = self
            .client
            .post(self.url("playlistItems"))
            .bearer_auth(credential.secret())
            .query(&[("part", "snippet")])
            .json(&json!({
                "snippet": {
                    "playlistId": playlist_id,
                    "resourceId": { "kind": "youtube#video", "videoId": video_id },
                },
            }))
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }
}

fn candidates(body: SearchResponse) -> Vec<SearchCandidate> {
    body.items
        .into_iter()
        .filter_map(|item| item.id.video_id)
        .map(|video_id| SearchCandidate { video_id })
        .collect()
}

fn transport(err: reqwest::Error) -> PlatformError {
    PlatformError::transport(err.to_string())
}

async fn check(response: Response) -> Result<Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

/// Classifies a failed response using the first `reason` of the error body.
fn error_from_body(status: u16, body: &str) -> PlatformError {
    let (reason, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.errors.into_iter().find_map(|e| e.reason),
            envelope.error.message,
        ),
        Err(_) => (None, format!("YouTube responded with status {}", status)),
    };
    debug!("YouTube error {} ({:?}): {}", status, reason, message);
    PlatformError::from_status(status, reason, message)
}
