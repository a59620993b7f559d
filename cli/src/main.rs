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

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::fs::File;
use std::io::Write;
use std::process;
use std::sync::Arc;
use transfer_core::models::TransferState;
use transfer_core::{
    spotify_access_token, BatchReport, BearerToken, CredentialStore, Credentials, JobStatus,
    LogSink, Platform, PlaylistOutcome, PlaylistRef, ProgressSink, SpotifySource, Track,
    TransferConfig, TransferError, TransferEvent, TransferOrchestrator, YouTubeDestination,
};

type Orchestrator = TransferOrchestrator<SpotifySource, YouTubeDestination>;

#[derive(Parser)]
#[command(name = "playlist-transfer")]
#[command(about = "Copies your Spotify playlists to YouTube", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists your Spotify playlists with their IDs
    List,
    /// Transfers one or more Spotify playlists to new private YouTube playlists
    Transfer {
        /// Spotify IDs of the playlists to transfer, in order
        #[arg(value_name = "PLAYLIST_ID")]
        playlist_ids: Vec<String>,
        /// Transfer every playlist you have
        #[arg(long, conflicts_with = "playlist_ids")]
        all: bool,
        /// Output the transfer report to a JSON file (e.g., --json=report.json)
        #[arg(long)]
        json: Option<String>,
        /// Report progress through the log (RUST_LOG=info) instead of the terminal
        #[arg(long, short = 'q')]
        quiet: bool,
        /// YouTube OAuth access token with the youtube scope
        #[arg(long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
        youtube_token: Option<String>,
    },
    /// Shows which YouTube video a track would be matched to
    Resolve {
        /// Track title as it appears on Spotify
        #[arg(long)]
        title: String,
        /// Artist name (repeat for several artists)
        #[arg(long = "artist", required = true)]
        artists: Vec<String>,
        #[arg(long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
        youtube_token: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if dotenv().is_err() {
        // Silently ignore
    }

    env_logger::init();

    let cli = Cli::parse();

    let config = match TransferConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::List => {
            handle_list(&config).await;
        }
        Commands::Transfer {
            playlist_ids,
            all,
            json,
            quiet,
            youtube_token,
        } => {
            let sink: &dyn ProgressSink = if quiet { &LogSink } else { &ConsoleSink };
            handle_transfer(&config, &playlist_ids, all, json.as_deref(), sink, youtube_token)
                .await;
        }
        Commands::Resolve {
            title,
            artists,
            youtube_token,
        } => {
            handle_resolve(&config, title, artists, youtube_token).await;
        }
    }
}

fn get_orchestrator(config: &TransferConfig) -> Orchestrator {
    TransferOrchestrator::new(
        Arc::new(SpotifySource::new()),
        Arc::new(YouTubeDestination::new(config.youtube_api_base.clone())),
        config,
    )
}

/// Uses `SPOTIFY_ACCESS_TOKEN` when present, otherwise runs the OAuth flow.
async fn get_credentials(youtube_token: Option<String>) -> anyhow::Result<Credentials> {
    let mut credentials = Credentials::from_env();
    if !credentials.has_source() {
        let token = spotify_access_token()
            .await
            .context("Error initializing Spotify client")?;
        credentials = credentials.with_source(token);
    }
    if let Some(token) = youtube_token.filter(|t| !t.trim().is_empty()) {
        credentials = credentials.with_destination(BearerToken::new(token.trim()));
    }
    Ok(credentials)
}

async fn credentials_or_exit(youtube_token: Option<String>) -> Credentials {
    match get_credentials(youtube_token).await {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn fetch_playlists(orchestrator: &Orchestrator, credentials: &Credentials) -> Vec<PlaylistRef> {
    let Some(token) = credentials.source_credential() else {
        eprintln!("[ERROR] {}", TransferError::MissingCredential(Platform::Spotify));
        process::exit(1);
    };

    match orchestrator.catalog().list_playlists(&token).await {
        Ok(playlists) => playlists,
        Err(e) => {
            let kind = TransferError::from_platform(Platform::Spotify, &e);
            eprintln!("Failed to list playlists: {}", kind);
            if let Some(action) = kind.corrective_action() {
                eprintln!("Try to {}.", action);
            }
            process::exit(1);
        }
    }
}

async fn handle_list(config: &TransferConfig) {
    let orchestrator = get_orchestrator(config);
    let credentials = credentials_or_exit(None).await;
    println!("Fetching your playlists...");

    let playlists = fetch_playlists(&orchestrator, &credentials).await;

    println!();
    println!(
        "{:<25} | {:<30} | {:<20} | {:<6}",
        "ID", "Name", "Owner", "Tracks"
    );
    println!("{:-<25}-+-{:-<30}-+-{:-<20}-+-{:-<6}", "", "", "", "");

    for pl in playlists {
        println!(
            "{:<25} | {:<30} | {:<20} | {:<6}",
            pl.id,
            truncate(&pl.name, 28),
            truncate(&pl.owner_name, 18),
            pl.track_count
        );
    }
    println!();
    println!("Tip: Copy an ID and run 'playlist-transfer transfer <ID>'");
}

async fn handle_transfer(
    config: &TransferConfig,
    playlist_ids: &[String],
    all: bool,
    json_path: Option<&str>,
    sink: &dyn ProgressSink,
    youtube_token: Option<String>,
) {
    if playlist_ids.is_empty() && !all {
        eprintln!("[ERROR] Give at least one PLAYLIST_ID, or --all");
        process::exit(1);
    }

    let orchestrator = get_orchestrator(config);
    let credentials = credentials_or_exit(youtube_token).await;
    let available = fetch_playlists(&orchestrator, &credentials).await;

    let selected: Vec<PlaylistRef> = if all {
        available
    } else {
        playlist_ids
            .iter()
            .filter_map(|id| {
                let id = id.trim_start_matches("spotify:playlist:");
                let found = available.iter().find(|pl| pl.id == id).cloned();
                if found.is_none() {
                    eprintln!("[WARN] Playlist {} not found in your library, skipping", id);
                }
                found
            })
            .collect()
    };

    if selected.is_empty() {
        println!("Nothing to transfer.");
        return;
    }

    println!("Transferring {} playlist(s) to YouTube...", selected.len());
    println!("This can take a while, please keep the terminal open.");

    let report = orchestrator
        .run_batch(&credentials, &selected, sink)
        .await;

    print_report(&report);

    if let Some(path) = json_path {
        match File::create(path) {
            Ok(mut file) => {
                let json_content = serde_json::to_string_pretty(&report).unwrap_or_default();
                if let Err(e) = file.write_all(json_content.as_bytes()) {
                    eprintln!();
                    eprintln!("[ERROR] Failed to write report to file: {}", e);
                } else {
                    println!();
                    println!("[SAVED] Report saved to: {}", path);
                }
            }
            Err(e) => eprintln!("[ERROR] Failed to create file '{}': {}", path, e),
        }
    }

    if report.failed_playlists() > 0 {
        process::exit(1);
    }
}

async fn handle_resolve(
    config: &TransferConfig,
    title: String,
    artists: Vec<String>,
    youtube_token: Option<String>,
) {
    let Some(token) = youtube_token.filter(|t| !t.trim().is_empty()) else {
        eprintln!("[ERROR] {}", TransferError::MissingCredential(Platform::YouTube));
        process::exit(1);
    };

    let orchestrator = get_orchestrator(config);
    let track = Track {
        title,
        artists,
        source_id: String::new(),
    };
    println!("Searching YouTube for: {} - {} ...", track.title, track.artist_line());

    match orchestrator
        .resolver()
        .resolve(&BearerToken::new(token.trim()), &track)
        .await
    {
        Ok(Some(candidate)) => {
            println!();
            println!("[MATCH] https://www.youtube.com/watch?v={}", candidate.video_id);
        }
        Ok(None) => {
            println!();
            println!("[NO MATCH] None of the search queries returned a video.");
        }
        Err(e) => {
            let kind = TransferError::from_platform(Platform::YouTube, &e);
            eprintln!();
            eprintln!("[ERROR] Search failed: {}", kind);
            if let Some(action) = kind.corrective_action() {
                eprintln!("Try to {}.", action);
            }
            process::exit(1);
        }
    }
}

/// Renders transfer events on the terminal.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: TransferEvent) {
        match event {
            TransferEvent::Progress {
                playlist_name,
                state: TransferState::Transferring,
                current,
                total,
            } if current > 0 => {
                let percent = if total == 0 { 100 } else { current * 100 / total };
                print!("\r   {}: {} / {} tracks ({}%)", playlist_name, current, total, percent);
                let _ = std::io::stdout().flush();
                if current == total {
                    println!();
                }
            }
            TransferEvent::Progress {
                playlist_name,
                state,
                ..
            } => match state {
                TransferState::Loading | TransferState::CreatingDestination => {
                    println!("[{}] {}...", playlist_name, state)
                }
                _ => {}
            },
            TransferEvent::ReauthRequired { platform } => {
                eprintln!("[AUTH] {} needs to be reconnected.", platform);
            }
            TransferEvent::PlaylistFinished(_) | TransferEvent::BatchFinished(_) => {}
        }
    }
}

fn print_report(report: &BatchReport) {
    println!();
    println!("---------------------------------------------------");
    println!("TRANSFER COMPLETE");
    println!("---------------------------------------------------");
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }
    println!("---------------------------------------------------");
    println!(
        "Total: {}/{} tracks transferred, {} playlist(s) failed",
        report.total_succeeded(),
        report.total_tracks(),
        report.failed_playlists()
    );
    println!("---------------------------------------------------");
}

fn print_outcome(outcome: &PlaylistOutcome) {
    println!("{}", outcome);
    if let JobStatus::Failed(err) = &outcome.status {
        if let Some(action) = err.corrective_action() {
            println!("   -> Try to {}.", action);
        }
        return;
    }
    if outcome.skipped > 0 {
        println!("   {} unavailable entries skipped", outcome.skipped);
    }
    if !outcome.failed.is_empty() {
        println!("   Not transferred:");
        for (i, track) in outcome.failed.iter().enumerate() {
            println!("   {}. {}", i + 1, track);
        }
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}..", value.chars().take(max).collect::<String>())
    } else {
        value.to_string()
    }
}
