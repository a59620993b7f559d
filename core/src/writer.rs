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

use crate::platform::{BearerToken, DestinationPlatform, PlatformError, PlaylistPrivacy};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Pacing and retry rules for destination writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delayed retries allowed after a quota or rate-limit rejection.
    pub max_retries: u32,
    pub backoff: Duration,
    /// Fixed wait before every append, whatever the previous call took.
    pub min_call_spacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(2000),
            min_call_spacing: Duration::from_millis(500),
        }
    }
}

/// Creates destination playlists and appends videos to them.
pub struct PlaylistWriter<D> {
    destination: Arc<D>,
    policy: RetryPolicy,
}

impl<D: DestinationPlatform> PlaylistWriter<D> {
    pub fn new(destination: Arc<D>, policy: RetryPolicy) -> Self {
        Self {
            destination,
            policy,
        }
    }

    /// Creates a private playlist. Never retried: auth and quota failures
    /// need the user to reconnect first.
    pub async fn create_playlist(
        &self,
        credential: &BearerToken,
        title: &str,
        description: &str,
    ) -> Result<String, PlatformError> {
        let id = self
            .destination
            .create_playlist(credential, title, description, PlaylistPrivacy::Private)
            .await?;
        debug!("Created destination playlist '{}' ({})", title, id);
        Ok(id)
    }

    /// Appends one video. Returns `true` when the video is in the playlist
    /// afterwards, including when it already was.
    pub async fn append_item(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        video_id: &str,
    ) -> bool {
        self.append(credential, playlist_id, video_id).await.is_ok()
    }

    /// Same as [`append_item`](Self::append_item) but keeps the final
    /// failure, so callers can tell a rejected credential from the rest.
    pub async fn append(
        &self,
        credential: &BearerToken,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), PlatformError> {
        sleep(self.policy.min_call_spacing).await;

        let mut retries = 0;
        loop {
            match self
                .destination
                .insert_playlist_item(credential, playlist_id, video_id)
                .await
            {
                Ok(()) => {
                    debug!("Appended {} to {}", video_id, playlist_id);
                    return Ok(());
                }
                Err(err) if err.is_duplicate_item() => {
                    debug!("{} already present in {}", video_id, playlist_id);
                    return Ok(());
                }
                Err(err) if err.is_rate_limited() && retries < self.policy.max_retries => {
                    retries += 1;
                    warn!(
                        "Append of {} throttled ({}), retrying in {:?}",
                        video_id, err, self.policy.backoff
                    );
                    sleep(self.policy.backoff).await;
                }
                Err(err) => {
                    warn!("Append of {} to {} failed: {}", video_id, playlist_id, err);
                    return Err(err);
                }
            }
        }
    }
}
