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

use crate::auth::CredentialStore;
use crate::catalog::SourceCatalog;
use crate::config::TransferConfig;
use crate::models::{
    BatchReport, FailedTrack, JobStatus, PlaylistEntry, PlaylistOutcome, PlaylistRef, Track,
    TransferJob, TransferState,
};
use crate::platform::{BearerToken, DestinationPlatform, Platform, PlatformError, SourcePlatform};
use crate::resolver::MatchResolver;
use crate::writer::PlaylistWriter;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// What went wrong with a playlist job, as shown to the user. Raw upstream
/// details only ever reach the log.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransferError {
    #[error("no {0} credential available")]
    MissingCredential(Platform),
    #[error("{0} rejected the credential")]
    Auth(Platform),
    #[error("{0} quota or rate limit exceeded")]
    Quota(Platform),
    #[error("{0} request failed")]
    Upstream(Platform),
}

impl TransferError {
    pub fn from_platform(platform: Platform, err: &PlatformError) -> Self {
        match err {
            PlatformError::Auth => TransferError::Auth(platform),
            PlatformError::Quota { .. } => TransferError::Quota(platform),
            PlatformError::Upstream { .. } => TransferError::Upstream(platform),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            TransferError::MissingCredential(p)
            | TransferError::Auth(p)
            | TransferError::Quota(p)
            | TransferError::Upstream(p) => *p,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            TransferError::MissingCredential(_) | TransferError::Auth(_)
        )
    }

    pub fn corrective_action(&self) -> Option<String> {
        match self {
            TransferError::MissingCredential(p) => Some(format!("connect your {} account", p)),
            TransferError::Auth(p) => Some(format!("reconnect your {} account", p)),
            TransferError::Quota(p) => Some(format!(
                "wait for the {} quota to reset, or reconnect your account",
                p
            )),
            TransferError::Upstream(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Progress {
        playlist_name: String,
        state: TransferState,
        current: u32,
        total: u32,
    },
    ReauthRequired {
        platform: Platform,
    },
    PlaylistFinished(PlaylistOutcome),
    BatchFinished(BatchReport),
}

/// Receives progress while a batch runs. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: TransferEvent);
}

/// Sink that only writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: TransferEvent) {
        match event {
            TransferEvent::Progress {
                playlist_name,
                state,
                current,
                total,
            } => info!("[{}] {} ({}/{})", playlist_name, state, current, total),
            TransferEvent::ReauthRequired { platform } => {
                warn!("{} needs to be reconnected", platform)
            }
            TransferEvent::PlaylistFinished(outcome) => info!("{}", outcome),
            TransferEvent::BatchFinished(report) => info!(
                "Batch finished: {}/{} tracks across {} playlists",
                report.total_succeeded(),
                report.total_tracks(),
                report.outcomes.len()
            ),
        }
    }
}

/// Per-job event helper; asks for re-authentication at most once per platform.
struct JobEvents<'a> {
    sink: &'a dyn ProgressSink,
    playlist_name: String,
    reauth_requested: Vec<Platform>,
}

impl<'a> JobEvents<'a> {
    fn new(sink: &'a dyn ProgressSink, playlist_name: &str) -> Self {
        Self {
            sink,
            playlist_name: playlist_name.to_string(),
            reauth_requested: Vec::new(),
        }
    }

    fn progress(&self, state: TransferState, job: &TransferJob) {
        self.sink.emit(TransferEvent::Progress {
            playlist_name: self.playlist_name.clone(),
            state,
            current: job.position(),
            total: job.total,
        });
    }

    fn reauth(&mut self, platform: Platform) {
        if !self.reauth_requested.contains(&platform) {
            self.reauth_requested.push(platform);
            self.sink.emit(TransferEvent::ReauthRequired { platform });
        }
    }

    fn fail(&mut self, job: TransferJob, err: TransferError) -> PlaylistOutcome {
        if err.requires_reauth() {
            self.reauth(err.platform());
        }
        self.progress(TransferState::Failed, &job);
        job.into_outcome(JobStatus::Failed(err))
    }
}

/// Drives playlist transfers one playlist at a time, one track at a time.
pub struct TransferOrchestrator<S, D> {
    catalog: SourceCatalog<S>,
    resolver: MatchResolver<D>,
    writer: PlaylistWriter<D>,
    title_suffix: String,
    description: String,
}

impl<S: SourcePlatform, D: DestinationPlatform> TransferOrchestrator<S, D> {
    pub fn new(source: Arc<S>, destination: Arc<D>, config: &TransferConfig) -> Self {
        Self {
            catalog: SourceCatalog::new(source),
            resolver: MatchResolver::new(destination.clone()),
            writer: PlaylistWriter::new(destination, config.retry),
            title_suffix: config.title_suffix.clone(),
            description: config.description.clone(),
        }
    }

    pub fn catalog(&self) -> &SourceCatalog<S> {
        &self.catalog
    }

    pub fn resolver(&self) -> &MatchResolver<D> {
        &self.resolver
    }

    /// Transfers every selected playlist in order. A failed playlist never
    /// stops the ones after it.
    pub async fn run_batch(
        &self,
        credentials: &dyn CredentialStore,
        playlists: &[PlaylistRef],
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        let mut report = BatchReport::new();

        for playlist in playlists {
            let outcome = self.run_job(credentials, playlist.clone(), sink).await;
            sink.emit(TransferEvent::PlaylistFinished(outcome.clone()));
            report.push(outcome);
        }

        info!(
            "Transferred {}/{} tracks, {} playlist(s) failed",
            report.total_succeeded(),
            report.total_tracks(),
            report.failed_playlists()
        );
        sink.emit(TransferEvent::BatchFinished(report.clone()));
        report
    }

    /// Runs the full state machine for one playlist.
    pub async fn run_job(
        &self,
        credentials: &dyn CredentialStore,
        playlist: PlaylistRef,
        sink: &dyn ProgressSink,
    ) -> PlaylistOutcome {
        let mut events = JobEvents::new(sink, &playlist.name);
        let mut job = TransferJob::new(playlist);
        events.progress(TransferState::Idle, &job);

        let Some(source_credential) = credentials.source_credential() else {
            error!("No Spotify credential, skipping '{}'", job.source_playlist.name);
            return events.fail(job, TransferError::MissingCredential(Platform::Spotify));
        };
        let Some(destination_credential) = credentials.destination_credential() else {
            error!("No YouTube credential, skipping '{}'", job.source_playlist.name);
            return events.fail(job, TransferError::MissingCredential(Platform::YouTube));
        };

        events.progress(TransferState::Loading, &job);
        let entries = match self
            .catalog
            .list_tracks(&source_credential, &job.source_playlist.id)
            .await
        {
            Ok(entries) => entries,
            Err(err) => {
                error!(
                    "Could not load tracks of '{}': {}",
                    job.source_playlist.name, err
                );
                return events.fail(job, TransferError::from_platform(Platform::Spotify, &err));
            }
        };
        job.total = entries.len() as u32;
        info!(
            "Loaded {} entries from '{}'",
            job.total, job.source_playlist.name
        );

        if entries.is_empty() {
            events.progress(TransferState::Completed, &job);
            return job.into_outcome(JobStatus::Empty);
        }

        events.progress(TransferState::CreatingDestination, &job);
        let title = format!("{}{}", job.source_playlist.name, self.title_suffix);
        let destination_id = match self
            .writer
            .create_playlist(&destination_credential, &title, &self.description)
            .await
        {
            Ok(id) => job.bind_destination(id).to_string(),
            Err(err) => {
                error!("Could not create playlist '{}': {}", title, err);
                // No further writes without a reconnect, quota included.
                if err.is_rate_limited() {
                    events.reauth(Platform::YouTube);
                }
                return events.fail(job, TransferError::from_platform(Platform::YouTube, &err));
            }
        };

        events.progress(TransferState::Transferring, &job);
        for entry in entries {
            self.transfer_entry(
                &destination_credential,
                &destination_id,
                entry,
                &mut job,
                &mut events,
            )
            .await;
            events.progress(TransferState::Transferring, &job);
        }

        if !job.failed.is_empty() {
            info!(
                "{} track(s) of '{}' could not be transferred:",
                job.failed.len(),
                job.source_playlist.name
            );
            for (i, failed) in job.failed.iter().enumerate() {
                info!("{}. {}", i + 1, failed);
            }
        }
        info!(
            "Finished '{}': {}/{} tracks transferred",
            job.source_playlist.name, job.succeeded, job.total
        );

        debug_assert!(job.is_finished());
        events.progress(TransferState::Completed, &job);
        job.into_outcome(JobStatus::Completed)
    }

    async fn transfer_entry(
        &self,
        credential: &BearerToken,
        destination_id: &str,
        entry: PlaylistEntry,
        job: &mut TransferJob,
        events: &mut JobEvents<'_>,
    ) {
        let Some(track) = entry else {
            job.record_skip();
            return;
        };

        if self.transfer_track(credential, destination_id, &track, events).await {
            job.record_success();
        } else {
            job.record_failure(FailedTrack::from(&track));
        }
    }

    async fn transfer_track(
        &self,
        credential: &BearerToken,
        destination_id: &str,
        track: &Track,
        events: &mut JobEvents<'_>,
    ) -> bool {
        match self.resolver.resolve(credential, track).await {
            Ok(Some(candidate)) => match self
                .writer
                .append(credential, destination_id, &candidate.video_id)
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    if err == PlatformError::Auth {
                        events.reauth(Platform::YouTube);
                    }
                    false
                }
            },
            Ok(None) => {
                info!("No video found for '{} - {}'", track.title, track.artist_line());
                false
            }
            Err(err) => {
                warn!("Search for '{}' failed: {}", track.title, err);
                if err == PlatformError::Auth {
                    events.reauth(Platform::YouTube);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::models::SearchCandidate;
    use crate::platform::{CatalogPage, MockDestinationPlatform, MockSourcePlatform};
    use crate::writer::RetryPolicy;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TransferEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, event: TransferEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn progress(&self) -> Vec<(TransferState, u32, u32)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    TransferEvent::Progress {
                        state,
                        current,
                        total,
                        ..
                    } => Some((state.clone(), *current, *total)),
                    _ => None,
                })
                .collect()
        }

        fn reauth_count(&self) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, TransferEvent::ReauthRequired { .. }))
                .count()
        }

        fn batch_finished(&self) -> bool {
            matches!(
                self.events.lock().unwrap().last(),
                Some(TransferEvent::BatchFinished(_))
            )
        }
    }

    fn config() -> TransferConfig {
        TransferConfig {
            retry: RetryPolicy {
                max_retries: 1,
                backoff: Duration::ZERO,
                min_call_spacing: Duration::ZERO,
            },
            ..TransferConfig::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials::new(
            Some(BearerToken::new("spotify")),
            Some(BearerToken::new("youtube")),
        )
    }

    fn playlist(id: &str, name: &str, count: u32) -> PlaylistRef {
        PlaylistRef {
            id: id.to_string(),
            name: name.to_string(),
            track_count: count,
            owner_name: "me".to_string(),
            thumbnail_url: None,
        }
    }

    fn track(title: &str, artist: &str) -> PlaylistEntry {
        Some(Track {
            title: title.to_string(),
            artists: vec![artist.to_string()],
            source_id: format!("{}-id", title),
        })
    }

    fn source_with(entries: Vec<PlaylistEntry>) -> MockSourcePlatform {
        let mut source = MockSourcePlatform::new();
        source.expect_tracks_page().returning(move |_, _, _, _| {
            Ok(CatalogPage {
                items: entries.clone(),
                total: entries.len() as u32,
            })
        });
        source
    }

    /// Matches every query mentioning SongA or SongB, nothing else.
    fn destination_matching_a_and_b() -> MockDestinationPlatform {
        let mut destination = MockDestinationPlatform::new();
        destination
            .expect_create_playlist()
            .times(1)
            .returning(|_, _, _, _| Ok("PLdest".to_string()));
        destination.expect_search_videos().returning(|_, query, _| {
            if query.contains("SongA") || query.contains("SongB") {
                Ok(vec![SearchCandidate {
                    video_id: format!("vid-{}", &query[..5]),
                }])
            } else {
                Ok(Vec::new())
            }
        });
        destination
            .expect_insert_playlist_item()
            .times(2)
            .withf(|_, playlist_id, _| playlist_id == "PLdest")
            .returning(|_, _, _| Ok(()));
        destination
    }

    #[tokio::test]
    async fn test_road_trip_summary() {
        let source = source_with(vec![
            track("SongA", "ArtistA"),
            track("SongB", "ArtistB"),
            track("SongC", "ArtistC"),
        ]);
        let orchestrator = TransferOrchestrator::new(
            Arc::new(source),
            Arc::new(destination_matching_a_and_b()),
            &config(),
        );
        let sink = RecordingSink::default();

        let report = orchestrator
            .run_batch(&credentials(), &[playlist("pl1", "Road Trip", 3)], &sink)
            .await;

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.total, 3);
        let failed: Vec<String> = outcome.failed.iter().map(|f| f.to_string()).collect();
        assert_eq!(failed, vec!["SongC - ArtistC"]);
        assert_eq!(outcome.destination_playlist_id.as_deref(), Some("PLdest"));
        assert_eq!(
            outcome.succeeded + outcome.failed.len() as u32 + outcome.skipped,
            outcome.total
        );
        assert!(sink.batch_finished());
    }

    #[tokio::test]
    async fn test_progress_follows_state_machine() {
        let source = source_with(vec![
            track("SongA", "ArtistA"),
            track("SongB", "ArtistB"),
            track("SongC", "ArtistC"),
        ]);
        let orchestrator = TransferOrchestrator::new(
            Arc::new(source),
            Arc::new(destination_matching_a_and_b()),
            &config(),
        );
        let sink = RecordingSink::default();

        orchestrator
            .run_job(&credentials(), playlist("pl1", "Road Trip", 3), &sink)
            .await;

        let progress = sink.progress();
        let states: Vec<TransferState> = progress.iter().map(|p| p.0.clone()).collect();
        assert_eq!(states[0], TransferState::Idle);
        assert_eq!(states[1], TransferState::Loading);
        assert_eq!(states[2], TransferState::CreatingDestination);
        assert_eq!(states.last(), Some(&TransferState::Completed));

        let per_track: Vec<u32> = progress
            .iter()
            .filter(|p| p.0 == TransferState::Transferring)
            .map(|p| p.1)
            .collect();
        assert_eq!(per_track, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unavailable_entries_are_skipped_not_failed() {
        let source = source_with(vec![track("SongA", "ArtistA"), None, track("SongB", "ArtistB")]);
        let orchestrator = TransferOrchestrator::new(
            Arc::new(source),
            Arc::new(destination_matching_a_and_b()),
            &config(),
        );

        let outcome = orchestrator
            .run_job(&credentials(), playlist("pl1", "Mixed", 3), &RecordingSink::default())
            .await;

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_each_job_but_batch_continues() {
        let orchestrator = TransferOrchestrator::new(
            Arc::new(MockSourcePlatform::new()),
            Arc::new(MockDestinationPlatform::new()),
            &config(),
        );
        let sink = RecordingSink::default();
        let credentials = Credentials::new(Some(BearerToken::new("spotify")), None);

        let report = orchestrator
            .run_batch(
                &credentials,
                &[playlist("a", "A", 1), playlist("b", "B", 1)],
                &sink,
            )
            .await;

        assert_eq!(report.outcomes.len(), 2);
        for outcome in &report.outcomes {
            assert_eq!(
                outcome.status,
                JobStatus::Failed(TransferError::MissingCredential(Platform::YouTube))
            );
        }
        assert!(sink.batch_finished());
    }

    #[tokio::test]
    async fn test_create_failure_isolated_to_its_playlist() {
        let source = source_with(vec![track("SongA", "ArtistA")]);

        let mut destination = MockDestinationPlatform::new();
        let mut created = 0;
        destination
            .expect_create_playlist()
            .times(2)
            .returning(move |_, _, _, _| {
                created += 1;
                if created == 1 {
                    Err(PlatformError::from_status(403, Some("quotaExceeded".to_string()), String::new()))
                } else {
                    Ok("PLsecond".to_string())
                }
            });
        destination
            .expect_search_videos()
            .returning(|_, _, _| Ok(vec![SearchCandidate { video_id: "v".to_string() }]));
        destination
            .expect_insert_playlist_item()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let orchestrator =
            TransferOrchestrator::new(Arc::new(source), Arc::new(destination), &config());
        let report = orchestrator
            .run_batch(
                &credentials(),
                &[playlist("a", "First", 1), playlist("b", "Second", 1)],
                &RecordingSink::default(),
            )
            .await;

        assert_eq!(
            report.outcomes[0].status,
            JobStatus::Failed(TransferError::Quota(Platform::YouTube))
        );
        assert!(report.outcomes[0].destination_playlist_id.is_none());
        assert_eq!(report.outcomes[1].status, JobStatus::Completed);
        assert_eq!(report.outcomes[1].succeeded, 1);
    }

    #[tokio::test]
    async fn test_source_auth_error_requests_reauth() {
        let mut source = MockSourcePlatform::new();
        source
            .expect_tracks_page()
            .returning(|_, _, _, _| Err(PlatformError::Auth));
        let orchestrator = TransferOrchestrator::new(
            Arc::new(source),
            Arc::new(MockDestinationPlatform::new()),
            &config(),
        );
        let sink = RecordingSink::default();

        let outcome = orchestrator
            .run_job(&credentials(), playlist("a", "A", 5), &sink)
            .await;

        assert_eq!(
            outcome.status,
            JobStatus::Failed(TransferError::Auth(Platform::Spotify))
        );
        assert_eq!(outcome.total, 0);
        assert_eq!(sink.reauth_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_playlist_creates_nothing() {
        let orchestrator = TransferOrchestrator::new(
            Arc::new(source_with(Vec::new())),
            Arc::new(MockDestinationPlatform::new()),
            &config(),
        );

        let outcome = orchestrator
            .run_job(&credentials(), playlist("a", "Empty", 0), &RecordingSink::default())
            .await;

        assert_eq!(outcome.status, JobStatus::Empty);
        assert!(outcome.destination_playlist_id.is_none());
    }

    #[tokio::test]
    async fn test_per_track_errors_do_not_abort_the_job() {
        let source = source_with(vec![track("SongA", "ArtistA"), track("SongB", "ArtistB")]);

        let mut destination = MockDestinationPlatform::new();
        destination
            .expect_create_playlist()
            .returning(|_, _, _, _| Ok("PLdest".to_string()));
        destination.expect_search_videos().returning(|_, query, _| {
            if query.contains("SongA") {
                Err(PlatformError::Auth)
            } else {
                Ok(vec![SearchCandidate { video_id: "vidB".to_string() }])
            }
        });
        destination
            .expect_insert_playlist_item()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let orchestrator =
            TransferOrchestrator::new(Arc::new(source), Arc::new(destination), &config());
        let sink = RecordingSink::default();
        let outcome = orchestrator
            .run_job(&credentials(), playlist("a", "A", 2), &sink)
            .await;

        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].title, "SongA");
        assert_eq!(sink.reauth_count(), 1);
    }

    #[tokio::test]
    async fn test_create_quota_error_requests_reauth() {
        let mut destination = MockDestinationPlatform::new();
        destination
            .expect_create_playlist()
            .times(1)
            .returning(|_, _, _, _| {
                Err(PlatformError::from_status(403, Some("forbidden".to_string()), String::new()))
            });

        let orchestrator = TransferOrchestrator::new(
            Arc::new(source_with(vec![track("SongA", "ArtistA")])),
            Arc::new(destination),
            &config(),
        );
        let sink = RecordingSink::default();

        let outcome = orchestrator
            .run_job(&credentials(), playlist("a", "A", 1), &sink)
            .await;

        assert_eq!(
            outcome.status,
            JobStatus::Failed(TransferError::Quota(Platform::YouTube))
        );
        assert_eq!(sink.reauth_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_append_requests_reauth_once() {
        let source = source_with(vec![
            track("SongA", "ArtistA"),
            track("SongB", "ArtistB"),
            track("SongC", "ArtistC"),
        ]);

        let mut destination = MockDestinationPlatform::new();
        destination
            .expect_create_playlist()
            .returning(|_, _, _, _| Ok("PLdest".to_string()));
        destination
            .expect_search_videos()
            .returning(|_, _, _| Ok(vec![SearchCandidate { video_id: "v".to_string() }]));
        destination
            .expect_insert_playlist_item()
            .times(3)
            .returning(|_, _, _| Err(PlatformError::Auth));

        let orchestrator =
            TransferOrchestrator::new(Arc::new(source), Arc::new(destination), &config());
        let sink = RecordingSink::default();
        let outcome = orchestrator
            .run_job(&credentials(), playlist("a", "A", 3), &sink)
            .await;

        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failed.len(), 3);
        assert_eq!(sink.reauth_count(), 1);
    }

    #[test]
    fn test_corrective_actions() {
        assert_eq!(
            TransferError::Auth(Platform::YouTube).corrective_action().as_deref(),
            Some("reconnect your YouTube account")
        );
        assert!(TransferError::Upstream(Platform::Spotify)
            .corrective_action()
            .is_none());
        assert!(!TransferError::Quota(Platform::YouTube).requires_reauth());
    }
}
