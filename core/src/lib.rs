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

pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod platform;
pub mod resolver;
pub mod spotify;
pub mod transfer;
pub mod writer;
pub mod youtube;

// Re-export key items for convenience
pub use auth::{spotify_access_token, CredentialStore, Credentials};
pub use config::TransferConfig;
pub use models::{BatchReport, FailedTrack, JobStatus, PlaylistOutcome, PlaylistRef, Track};
pub use platform::{BearerToken, Platform};
pub use spotify::SpotifySource;
pub use transfer::{LogSink, ProgressSink, TransferError, TransferEvent, TransferOrchestrator};
pub use youtube::YouTubeDestination;
