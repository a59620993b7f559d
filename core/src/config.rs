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

use crate::writer::RetryPolicy;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' is not a non-negative integer")]
    InvalidNumber { name: String, value: String },
}

/// Settings for a transfer run, usually taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub retry: RetryPolicy,
    /// Appended to the source playlist name to title the new playlist.
    pub title_suffix: String,
    pub description: String,
    pub youtube_api_base: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            title_suffix: " (from Spotify)".to_string(),
            description: "This playlist was transferred automatically from Spotify.".to_string(),
            youtube_api_base: DEFAULT_YOUTUBE_API_BASE.to_string(),
        }
    }
}

impl TransferConfig {
    /// Builds the config from `TRANSFER_*` and `YOUTUBE_API_BASE` variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let number = |name: &str| -> Result<Option<u64>, ConfigError> {
            match lookup(name) {
                None => Ok(None),
                Some(value) => value.trim().parse().map(Some).map_err(|_| {
                    ConfigError::InvalidNumber {
                        name: name.to_string(),
                        value,
                    }
                }),
            }
        };
        let millis = |name: &str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(number(name)?.map_or(default, Duration::from_millis))
        };

        let max_retries = match number("TRANSFER_MAX_RETRIES")? {
            Some(n) => u32::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                name: "TRANSFER_MAX_RETRIES".to_string(),
                value: n.to_string(),
            })?,
            None => defaults.retry.max_retries,
        };

        Ok(Self {
            retry: RetryPolicy {
                max_retries,
                backoff: millis("TRANSFER_BACKOFF_MS", defaults.retry.backoff)?,
                min_call_spacing: millis(
                    "TRANSFER_MIN_CALL_SPACING_MS",
                    defaults.retry.min_call_spacing,
                )?,
            },
            title_suffix: lookup("TRANSFER_TITLE_SUFFIX").unwrap_or(defaults.title_suffix),
            description: lookup("TRANSFER_DESCRIPTION").unwrap_or(defaults.description),
            youtube_api_base: lookup("YOUTUBE_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.youtube_api_base),
        })
    }
}
