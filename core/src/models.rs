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

use crate::transfer::TransferError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A playlist as listed by the source platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
    pub track_count: u32,
    pub owner_name: String,
    pub thumbnail_url: Option<String>,
}

/// One resolvable entry of a source playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artists: Vec<String>,
    pub source_id: String,
}

impl Track {
    /// Artist names joined the way search queries and reports expect them.
    pub fn artist_line(&self) -> String {
        self.artists.join(" ")
    }
}

/// A playlist slot. `None` marks an entry the source reports as unavailable
/// (removed track, podcast episode, ...).
pub type PlaylistEntry = Option<Track>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub video_id: String,
}

/// A track that could not be carried over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTrack {
    pub title: String,
    pub artists: Vec<String>,
}

impl From<&Track> for FailedTrack {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artists: track.artists.clone(),
        }
    }
}

impl fmt::Display for FailedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artists.join(" "))
    }
}

/// Where a single playlist job currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Idle,
    Loading,
    CreatingDestination,
    Transferring,
    Completed,
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferState::Idle => "idle",
            TransferState::Loading => "loading tracks",
            TransferState::CreatingDestination => "creating destination playlist",
            TransferState::Transferring => "transferring",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Mutable bookkeeping for one source playlist within a run.
///
/// `processed` counts resolution attempts, `skipped` counts unavailable
/// entries. At any point `processed == succeeded + failed.len()` and
/// `processed + skipped <= total`.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub source_playlist: PlaylistRef,
    destination_playlist_id: Option<String>,
    pub total: u32,
    pub processed: u32,
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: Vec<FailedTrack>,
}

impl TransferJob {
    pub fn new(source_playlist: PlaylistRef) -> Self {
        Self {
            source_playlist,
            destination_playlist_id: None,
            total: 0,
            processed: 0,
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
        }
    }

    pub fn destination_playlist_id(&self) -> Option<&str> {
        self.destination_playlist_id.as_deref()
    }

    /// Binds the destination container. Only the first call has an effect.
    pub fn bind_destination(&mut self, playlist_id: String) -> &str {
        self.destination_playlist_id.get_or_insert(playlist_id).as_str()
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, track: FailedTrack) {
        self.processed += 1;
        self.failed.push(track);
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Number of entries handled so far, skipped ones included.
    pub fn position(&self) -> u32 {
        self.processed + self.skipped
    }

    pub fn is_finished(&self) -> bool {
        self.position() >= self.total
    }

    pub fn into_outcome(self, status: JobStatus) -> PlaylistOutcome {
        PlaylistOutcome {
            playlist: self.source_playlist,
            destination_playlist_id: self.destination_playlist_id,
            status,
            total: self.total,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JobStatus {
    Completed,
    /// The source playlist had no entries; nothing was created.
    Empty,
    Failed(TransferError),
}

/// Terminal summary of one playlist job.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistOutcome {
    pub playlist: PlaylistRef,
    pub destination_playlist_id: Option<String>,
    pub status: JobStatus,
    pub total: u32,
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: Vec<FailedTrack>,
}

impl PlaylistOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, JobStatus::Failed(_))
    }
}

impl fmt::Display for PlaylistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            JobStatus::Completed => write!(
                f,
                "{}: {}/{} tracks transferred",
                self.playlist.name, self.succeeded, self.total
            ),
            JobStatus::Empty => write!(f, "{}: playlist is empty, skipped", self.playlist.name),
            JobStatus::Failed(err) => write!(f, "{}: failed ({})", self.playlist.name, err),
        }
    }
}

/// Summary of a whole run over the selected playlists.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<PlaylistOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: PlaylistOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn total_succeeded(&self) -> u32 {
        self.outcomes.iter().map(|o| o.succeeded).sum()
    }

    pub fn total_tracks(&self) -> u32 {
        self.outcomes.iter().map(|o| o.total).sum()
    }

    pub fn failed_playlists(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}
