//! Crawler coordinator - artist → album → track fan-out
//!
//! This module contains the orchestration of a crawl, including:
//! - Launching one task per seed artist
//! - Filtering artists by popularity
//! - Deduplicating albums within an artist's traversal
//! - Assembling artist, album and track records into the shared collector
//! - Isolating failures so one artist never takes down another

use crate::config::{CrawlerConfig, PauseRange};
use crate::crawler::endpoints::CatalogApi;
use crate::model::{Album, Artist, EntityRef, Provenance, Track};
use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Everything a crawl produced, ready for the result sinks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutput {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
}

/// Append-only record store shared by all artist tasks
///
/// Tasks run on a multi-threaded runtime, so each collection sits behind
/// its own mutex. A lock is only held for the duration of one push.
#[derive(Debug, Default)]
pub struct Collector {
    artists: Mutex<Vec<Artist>>,
    albums: Mutex<Vec<Album>>,
    tracks: Mutex<Vec<Track>>,
}

// Pushes never leave a vector half-written, so a poisoned lock is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_artist(&self, artist: Artist) {
        lock(&self.artists).push(artist);
    }

    pub fn push_album(&self, album: Album) {
        lock(&self.albums).push(album);
    }

    pub fn push_track(&self, track: Track) {
        lock(&self.tracks).push(track);
    }

    /// Current `(artists, albums, tracks)` counts
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            lock(&self.artists).len(),
            lock(&self.albums).len(),
            lock(&self.tracks).len(),
        )
    }

    pub fn into_output(self) -> CrawlOutput {
        CrawlOutput {
            artists: self
                .artists
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            albums: self
                .albums
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            tracks: self
                .tracks
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Copies the collected records without consuming the collector
    pub fn snapshot(&self) -> CrawlOutput {
        CrawlOutput {
            artists: lock(&self.artists).clone(),
            albums: lock(&self.albums).clone(),
            tracks: lock(&self.tracks).clone(),
        }
    }
}

/// How one artist's traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistOutcome {
    /// The artist itself could not be fetched
    Missing,
    /// Popularity at or below the threshold; nothing emitted
    Filtered { popularity: u32 },
    /// Artist emitted, possibly with albums and tracks
    Crawled { albums: usize, tracks: usize },
}

/// Tallies of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub seeds: usize,
    pub artists_crawled: usize,
    pub artists_filtered: usize,
    pub artists_missing: usize,
    pub artist_failures: usize,
    pub albums: usize,
    pub tracks: usize,
    /// HTTP attempts made by the fetcher
    pub requests: u64,
    pub rate_limited: u64,
    /// Resources that were abandoned or failed permanently
    pub failed_requests: u64,
    pub peak_in_flight: usize,
    pub duration: Duration,
}

impl CrawlSummary {
    /// Counts one joined artist task
    ///
    /// A task that panicked or was cancelled counts as an artist failure.
    fn record(&mut self, joined: Result<Option<ArtistOutcome>, JoinError>) {
        match joined.map_err(CatalogError::from) {
            Ok(Some(ArtistOutcome::Crawled { .. })) => self.artists_crawled += 1,
            Ok(Some(ArtistOutcome::Filtered { .. })) => self.artists_filtered += 1,
            Ok(Some(ArtistOutcome::Missing)) => self.artists_missing += 1,
            Ok(None) => self.artist_failures += 1,
            Err(e) => {
                tracing::error!("{}", e);
                self.artist_failures += 1;
            }
        }
    }

    fn artists_finished(&self) -> usize {
        self.artists_crawled + self.artists_filtered + self.artists_missing + self.artist_failures
    }
}

/// Output and tallies of one run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub output: CrawlOutput,
    pub summary: CrawlSummary,
}

#[derive(Debug, Clone)]
struct CrawlSettings {
    popularity_threshold: u32,
    artist_pause: PauseRange,
    album_pause: PauseRange,
}

struct CrawlContext {
    api: CatalogApi,
    collector: Collector,
    provenance: Arc<Provenance>,
    settings: CrawlSettings,
    artist_slots: Option<Semaphore>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    context: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `api` - Catalog API bound to the run's fetcher and token
    /// * `provenance` - Metadata stamped on every record of this run
    /// * `config` - The crawler configuration
    pub fn new(api: CatalogApi, provenance: Provenance, config: &CrawlerConfig) -> Self {
        let settings = CrawlSettings {
            popularity_threshold: config.popularity_threshold,
            artist_pause: config.artist_pause(),
            album_pause: config.album_pause(),
        };

        Self {
            context: Arc::new(CrawlContext {
                api,
                collector: Collector::new(),
                provenance: Arc::new(provenance),
                settings,
                artist_slots: config
                    .max_concurrent_artists
                    .map(|n| Semaphore::new(n as usize)),
            }),
        }
    }

    /// Crawls every seed artist and returns what was collected
    ///
    /// All artist tasks are spawned up front and compete for the fetcher's
    /// admission gate. The call returns once every task has finished; a
    /// failing or panicking task is logged and counted, never propagated.
    pub async fn run<I>(self, seeds: I) -> CrawlReport
    where
        I: IntoIterator<Item = String>,
    {
        let start_time = Instant::now();
        let mut tasks = JoinSet::new();
        let mut summary = CrawlSummary::default();

        for artist_id in seeds {
            summary.seeds += 1;
            let context = Arc::clone(&self.context);
            tasks.spawn(async move { run_artist_task(context, artist_id).await });
        }

        tracing::info!("Launched {} artist tasks", summary.seeds);

        while let Some(joined) = tasks.join_next().await {
            summary.record(joined);

            let finished = summary.artists_finished();
            if finished % 10 == 0 {
                let (artists, albums, tracks) = self.context.collector.counts();
                tracing::info!(
                    "Progress: {}/{} artists done, {} artists, {} albums, {} tracks collected",
                    finished,
                    summary.seeds,
                    artists,
                    albums,
                    tracks
                );
            }
        }

        let fetcher = self.context.api.fetcher();
        summary.requests = fetcher.stats().attempts();
        summary.rate_limited = fetcher.stats().rate_limited();
        summary.failed_requests =
            fetcher.stats().abandoned() + fetcher.stats().failed_permanently();
        summary.peak_in_flight = fetcher.gate().peak();

        let output = match Arc::try_unwrap(self.context) {
            Ok(context) => context.collector.into_output(),
            // Unreachable once the join set is drained, but a copy is still correct
            Err(shared) => shared.collector.snapshot(),
        };

        summary.albums = output.albums.len();
        summary.tracks = output.tracks.len();
        summary.duration = start_time.elapsed();

        tracing::info!(
            "Crawl finished in {:?}: {} artists, {} albums, {} tracks",
            summary.duration,
            output.artists.len(),
            summary.albums,
            summary.tracks
        );

        CrawlReport { output, summary }
    }
}

/// Runs one artist's traversal; `None` means it failed and was logged
async fn run_artist_task(context: Arc<CrawlContext>, artist_id: String) -> Option<ArtistOutcome> {
    let _slot = match &context.artist_slots {
        Some(slots) => Some(slots.acquire().await.ok()?),
        None => None,
    };

    match crawl_artist(&context, &artist_id).await {
        Ok(outcome) => {
            tracing::debug!("Artist {} finished: {:?}", artist_id, outcome);
            Some(outcome)
        }
        Err(e) => {
            tracing::error!("Error processing artist {}: {}", artist_id, e);
            None
        }
    }
}

/// Walks one artist: details, album page, then every album's tracks
///
/// Steps are strictly sequential because each needs the previous one's
/// output. Records already pushed stay in the collector if a later step fails.
async fn crawl_artist(
    context: &CrawlContext,
    artist_id: &str,
) -> Result<ArtistOutcome, CatalogError> {
    let api = &context.api;
    let settings = &context.settings;

    let Some(artist) = api.artist(artist_id).await? else {
        return Ok(ArtistOutcome::Missing);
    };

    if artist.popularity <= settings.popularity_threshold {
        tracing::debug!(
            "Skipping artist {} (popularity {} <= {})",
            artist_id,
            artist.popularity,
            settings.popularity_threshold
        );
        return Ok(ArtistOutcome::Filtered {
            popularity: artist.popularity,
        });
    }

    context
        .collector
        .push_artist(Artist::from_api(artist, &context.provenance));

    tokio::time::sleep(settings.artist_pause.sample()).await;

    let Some(album_page) = api.artist_albums(artist_id).await? else {
        return Ok(ArtistOutcome::Crawled {
            albums: 0,
            tracks: 0,
        });
    };

    let mut seen_albums = HashSet::new();
    let mut album_count = 0;
    let mut track_count = 0;

    for stub in album_page.items {
        if !seen_albums.insert(stub.id.clone()) {
            continue;
        }

        let Some(album) = api.album(&stub.id).await? else {
            continue;
        };

        let mut summaries: Vec<EntityRef> = Vec::with_capacity(album.tracks.items.len());
        for track_stub in &album.tracks.items {
            let Some(track) = api.track(&track_stub.id).await? else {
                continue;
            };

            let record = Track::from_api(track, &album, &context.provenance);
            summaries.push(record.summary());
            context.collector.push_track(record);
            track_count += 1;
        }

        context
            .collector
            .push_album(Album::from_api(&album, summaries, &context.provenance));
        album_count += 1;

        tokio::time::sleep(settings.album_pause.sample()).await;
    }

    Ok(ArtistOutcome::Crawled {
        albums: album_count,
        tracks: track_count,
    })
}
