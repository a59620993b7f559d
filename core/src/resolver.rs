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

use crate::models::{SearchCandidate, Track};
use crate::platform::{BearerToken, DestinationPlatform, PlatformError};
use log::debug;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Tokens kept by the last, shortest query.
const SHORT_QUERY_TOKENS: usize = 6;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").expect("valid regex"));
static STRAY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[()\[\]{}]").expect("valid regex"));
static FEATURING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(feat\.|ft\.|featuring\b)").expect("valid regex"));
static OFFICIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bofficial\s*(music\s*video|video|audio)\b").expect("valid regex")
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `"{title} {artists}"`.
pub fn full_query(track: &Track) -> String {
    format!("{} {}", track.title, track.artist_line())
        .trim()
        .to_string()
}

/// Drops bracketed parts, featuring markers and "official video" noise.
pub fn simplify_query(query: &str) -> String {
    let out = BRACKETED.replace_all(query, " ");
    let out = STRAY_BRACKETS.replace_all(&out, " ");
    let out = FEATURING.replace_all(&out, " ");
    let out = OFFICIAL.replace_all(&out, " ");
    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

pub fn short_query(simplified: &str) -> String {
    simplified
        .split_whitespace()
        .take(SHORT_QUERY_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The three progressively looser queries tried for a track, in order.
pub fn cascade_queries(track: &Track) -> [String; 3] {
    let full = full_query(track);
    let simplified = simplify_query(&full);
    let short = short_query(&simplified);
    [full, simplified, short]
}

/// Finds a destination video for a source track.
///
/// Takes the first hit of the first query tier that returns anything. There
/// is no scoring; a wrong video is an accepted outcome.
pub struct MatchResolver<D> {
    destination: Arc<D>,
}

impl<D: DestinationPlatform> MatchResolver<D> {
    pub fn new(destination: Arc<D>) -> Self {
        Self { destination }
    }

    /// Returns `Ok(None)` only when every tier came back empty. A failed
    /// search request is returned as an error, never as "no match".
    pub async fn resolve(
        &self,
        credential: &BearerToken,
        track: &Track,
    ) -> Result<Option<SearchCandidate>, PlatformError> {
        for (tier, query) in cascade_queries(track).iter().enumerate() {
            if query.is_empty() {
                continue;
            }
            debug!("Search tier {} for '{}': \"{}\"", tier + 1, track.title, query);

            let mut results = self.destination.search_videos(credential, query, 1).await?;
            if !results.is_empty() {
                let candidate = results.swap_remove(0);
                debug!("Matched '{}' to video {}", track.title, candidate.video_id);
                return Ok(Some(candidate));
            }
        }

        debug!("No search tier matched '{}'", track.title);
        Ok(None)
    }
}
