//! v2p - create Spotify playlists from venue performance history

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use v2p_common::config::Settings;
use v2p_common::models::PlaylistResult;

use v2p_cli::cache::Cache;
use v2p_cli::pipeline::{Pipeline, PlaylistRequest};
use v2p_cli::services::{MusicBrainzClient, SpotifyClient};
use v2p_cli::sources::{setlist_fm::SetlistFmSource, SourceRegistry};

/// Command-line arguments for v2p
#[derive(Parser, Debug)]
#[command(name = "v2p")]
#[command(about = "Create Spotify playlists from a venue's performance history")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Skip the local result cache for this run
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a playlist from a venue's performance history
    Create {
        /// Venue name, e.g. "CBGB"
        venue: String,

        /// City the venue is in, e.g. "New York"
        #[arg(short, long)]
        city: String,

        /// Earliest performance date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Latest performance date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Track selection strategy: top-N, random-N, era-N, deep-N
        #[arg(short, long, default_value = "top-3")]
        strategy: String,

        /// Exclude records below this confidence (0.0-1.0)
        #[arg(long, default_value = "0.5")]
        min_confidence: f64,

        /// Only include artists matching these genres (repeatable)
        #[arg(short, long)]
        genre: Vec<String>,

        /// Popularity ceiling for deep-cut selection (0-100)
        #[arg(long)]
        max_popularity: Option<u32>,

        /// Canonicalize artist names and genres via MusicBrainz
        #[arg(long)]
        enrich: bool,

        /// Playlist name (defaults to the venue name)
        #[arg(short, long)]
        name: Option<String>,

        /// Make the playlist public
        #[arg(long)]
        public: bool,

        /// Select tracks but do not create the playlist
        #[arg(long)]
        dry_run: bool,

        /// Write the full result as JSON to this file
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Search for a venue across data sources without creating anything
    SearchVenue {
        /// Venue name
        venue: String,

        /// City the venue is in
        #[arg(short, long)]
        city: String,
    },

    /// Remove cached API results
    ClearCache {
        /// Remove everything, not just expired entries
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "v2p=info,v2p_cli=info,v2p_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::load().context("Failed to load configuration")?;

    let cache = if args.no_cache {
        None
    } else {
        Some(Arc::new(
            Cache::open(&settings.cache_path)
                .await
                .context("Failed to open result cache")?,
        ))
    };

    match args.command {
        Command::Create {
            venue,
            city,
            start_date,
            end_date,
            strategy,
            min_confidence,
            genre,
            max_popularity,
            enrich,
            name,
            public,
            dry_run,
            output,
        } => {
            if start_date.is_some() != end_date.is_some() {
                bail!("--start-date and --end-date must be given together");
            }
            if let (Some(start), Some(end)) = (start_date, end_date) {
                if start > end {
                    bail!("--start-date {} is after --end-date {}", start, end);
                }
            }

            let request = PlaylistRequest {
                venue_name: venue,
                city,
                start_date,
                end_date,
                strategy,
                min_confidence,
                genres: genre,
                max_popularity,
                enrich,
                playlist_name: name,
                public,
                dry_run,
            };

            let pipeline = build_pipeline(&settings, cache)?;
            let result = pipeline.run(&request).await?;

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "Result written");
            }

            print_summary(&result, request.dry_run);
        }

        Command::SearchVenue { venue, city } => {
            let pipeline = build_pipeline(&settings, cache)?;
            match pipeline.find_venue(&venue, &city).await? {
                Some(m) => {
                    println!(
                        "{} in {} ({}) found on {} [id: {}]",
                        m.venue_name,
                        m.city,
                        m.country.as_deref().unwrap_or("??"),
                        m.source_name,
                        m.venue_id
                    );
                }
                None => {
                    bail!("No venue matching '{}' in {}", venue, city);
                }
            }
        }

        Command::ClearCache { all } => {
            let cache = match cache {
                Some(cache) => cache,
                None => bail!("--no-cache makes no sense with clear-cache"),
            };
            if all {
                cache.clear_all().await?;
                println!("Cache cleared");
            } else {
                let removed = cache.clear_expired().await?;
                println!("Removed {} expired cache entries", removed);
            }
        }
    }

    Ok(())
}

fn build_pipeline(settings: &Settings, cache: Option<Arc<Cache>>) -> Result<Pipeline> {
    let mut sources = SourceRegistry::new();
    sources.register(
        SetlistFmSource::new(&settings.setlist_fm_api_key, cache.clone())
            .context("Failed to build setlist.fm client")?,
    );

    let musicbrainz =
        MusicBrainzClient::new(cache.clone()).context("Failed to build MusicBrainz client")?;

    let spotify = SpotifyClient::new(
        settings.spotify_client_id.clone(),
        settings.spotify_client_secret.clone(),
        settings.spotify_refresh_token.clone(),
        cache,
    )
    .context("Failed to build Spotify client")?;

    Ok(Pipeline::new(sources, musicbrainz, spotify))
}

fn print_summary(result: &PlaylistResult, dry_run: bool) {
    if dry_run {
        println!("Dry run: playlist '{}' not created", result.playlist_name);
    } else {
        println!("Created playlist '{}'", result.playlist_name);
        println!("  {}", result.playlist_url);
    }
    println!(
        "  {} artists, {} tracks (sources: {})",
        result.total_artists,
        result.tracks.len(),
        result.sources_used.join(", ")
    );

    for track in &result.tracks {
        println!(
            "  + {} - {} [{}]",
            track.artist_name, track.name, track.selection_reason
        );
    }

    if !result.excluded_items.is_empty() {
        // Group repeated reasons so a long exclusion list stays readable
        let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
        for item in &result.excluded_items {
            *by_reason.entry(item.reason.as_str()).or_insert(0) += 1;
        }

        println!("  {} items excluded:", result.excluded_items.len());
        let mut reasons: Vec<(&str, usize)> = by_reason.into_iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1));
        for (reason, count) in reasons.into_iter().take(5) {
            println!("    {} x{}", reason, count);
        }
    }
}
