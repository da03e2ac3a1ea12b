use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::checkpoint::CheckpointWriter;
use crate::collectors::{Pacer, PageFetcher, PageQuery};
use crate::error::FetchError;
use crate::models::job::JobRecord;
use crate::models::query::Combination;
use crate::normalize;

/// Cool-down before the single retry of a rate-limited page.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Stop once this many rows are accumulated.
    pub target_count: usize,
    pub pages_per_combo: u32,
    /// Politeness delay after every processed page.
    pub pause: Duration,
    pub rate_limit_cooldown: Duration,
    /// Seed from the existing checkpoint file if there is one.
    pub resume: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            target_count: 1200,
            pages_per_combo: 8,
            pause: Duration::from_secs(1),
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            resume: true,
        }
    }
}

/// Accumulated rows plus the identities already accepted. Only grows.
#[derive(Debug, Default)]
pub struct CollectionState {
    records: Vec<JobRecord>,
    seen_ids: HashSet<String>,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a loaded table. Rows are kept as-is.
    pub fn from_records(records: Vec<JobRecord>) -> Self {
        let seen_ids = records.iter().map(JobRecord::identity).collect();
        Self { records, seen_ids }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.seen_ids.contains(identity)
    }

    /// Append `record` unless its identity was already seen. Stamps the
    /// combination's role and country on accepted records.
    pub fn accept(&mut self, mut record: JobRecord, combo: &Combination) -> bool {
        let id = record.assign_identity();
        if !self.seen_ids.insert(id) {
            return false;
        }
        record.role_query = Some(combo.role.clone());
        record.country_query = Some(combo.country_code.clone());
        self.records.push(record);
        true
    }

    pub fn into_records(self) -> Vec<JobRecord> {
        self.records
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageStats {
    pub new: usize,
    pub duplicates: usize,
}

/// Normalize a page of raw items and fold the new ones into `state`.
pub fn absorb_page(state: &mut CollectionState, items: &[Value], combo: &Combination) -> PageStats {
    let mut stats = PageStats::default();
    for item in items {
        if state.accept(normalize::normalize(item), combo) {
            stats.new += 1;
        } else {
            stats.duplicates += 1;
        }
    }
    stats
}

/// Fetch one page, applying the retry policy.
///
/// A rate-limited page is retried once after `cooldown`. Any non-transport
/// failure, including a second rate limit, becomes an empty page. Only
/// transport failures are returned as errors.
pub async fn fetch_page(
    fetcher: &dyn PageFetcher,
    pacer: &dyn Pacer,
    query: &PageQuery,
    cooldown: Duration,
) -> Result<Vec<Value>, FetchError> {
    let result = match fetcher.fetch(query).await {
        Err(FetchError::RateLimited) => {
            tracing::warn!(
                "429 Too Many Requests, sleeping {}s and retrying once",
                cooldown.as_secs_f64()
            );
            pacer.pause(cooldown).await;
            fetcher.fetch(query).await
        }
        other => other,
    };

    match result {
        Ok(items) => Ok(items),
        Err(e @ FetchError::Transport(_)) => Err(e),
        Err(e) => {
            tracing::warn!(
                "{e} for {} | {} | Page {}",
                query.role,
                query.location,
                query.page
            );
            Ok(Vec::new())
        }
    }
}

/// Summary of a finished (or short-circuited) run.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub records: Vec<JobRecord>,
    /// Rows present before any fetching (loaded on resume).
    pub resumed: usize,
    pub pages_fetched: usize,
    pub new_records: usize,
    pub duplicates: usize,
    pub target_reached: bool,
    /// Where the last checkpoint landed, if one was written.
    pub written_to: Option<PathBuf>,
}

/// Drives the combination × page loop with resume, dedup and
/// checkpoint-after-every-page.
pub struct CollectionEngine<'a> {
    fetcher: &'a dyn PageFetcher,
    pacer: &'a dyn Pacer,
    checkpoint: CheckpointWriter,
    settings: EngineSettings,
}

impl<'a> CollectionEngine<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        pacer: &'a dyn Pacer,
        checkpoint: CheckpointWriter,
        settings: EngineSettings,
    ) -> Self {
        Self {
            fetcher,
            pacer,
            checkpoint,
            settings,
        }
    }

    pub async fn run(&self, combos: &[Combination]) -> CollectionOutcome {
        tracing::info!("Collecting from {}", self.fetcher.name());
        let loaded = self.load_checkpoint();
        let from_checkpoint = loaded.is_some();
        let mut state = loaded.unwrap_or_default();
        let resumed = state.len();
        let target = self.settings.target_count;

        if from_checkpoint && resumed >= target {
            tracing::info!("Target already reached in existing checkpoint, nothing to fetch");
            return CollectionOutcome {
                records: state.into_records(),
                resumed,
                pages_fetched: 0,
                new_records: 0,
                duplicates: 0,
                target_reached: true,
                written_to: None,
            };
        }

        let mut pages_fetched = 0;
        let mut new_records = 0;
        let mut duplicates = 0;
        let mut written_to = None;

        'combos: for (idx, combo) in combos.iter().enumerate() {
            tracing::info!(
                "Combo {}/{} -> Role: {} | Location: {}",
                idx + 1,
                combos.len(),
                combo.role,
                combo.location
            );

            for page in 1..=self.settings.pages_per_combo {
                if state.len() >= target {
                    tracing::info!("Target reached, stopping collection loop");
                    break 'combos;
                }

                let query = combo.page(page);

                pages_fetched += 1;
                let items = match fetch_page(
                    self.fetcher,
                    self.pacer,
                    &query,
                    self.settings.rate_limit_cooldown,
                )
                .await
                {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::error!(
                            "Request failed for {} | {} | Page {page}: {e}",
                            combo.role,
                            combo.location
                        );
                        break;
                    }
                };

                if items.is_empty() {
                    tracing::info!("No items returned, moving to next combo");
                    break;
                }

                let stats = absorb_page(&mut state, &items, combo);
                new_records += stats.new;
                duplicates += stats.duplicates;
                tracing::info!(
                    "Collected so far: {} jobs (+{} this page, {} duplicates)",
                    state.len(),
                    stats.new,
                    stats.duplicates
                );

                written_to = self.save(&state).or(written_to);
                self.pacer.pause(self.settings.pause).await;
            }
        }

        written_to = self.save(&state).or(written_to);

        CollectionOutcome {
            target_reached: state.len() >= target,
            records: state.into_records(),
            resumed,
            pages_fetched,
            new_records,
            duplicates,
            written_to,
        }
    }

    /// Loaded checkpoint when resuming, `None` when there is nothing to
    /// resume from. Load failures are logged and discarded.
    fn load_checkpoint(&self) -> Option<CollectionState> {
        let path = self.checkpoint.path();
        if !self.settings.resume || !path.exists() {
            return None;
        }

        match self.checkpoint.load() {
            Ok(records) => {
                tracing::info!(
                    "Found existing checkpoint {} with {} rows",
                    path.display(),
                    records.len()
                );
                Some(CollectionState::from_records(records))
            }
            Err(e) => {
                tracing::warn!("Failed to load existing checkpoint, starting fresh: {e}");
                None
            }
        }
    }

    fn save(&self, state: &CollectionState) -> Option<PathBuf> {
        match self.checkpoint.persist(state.records()) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("Checkpoint failed, continuing: {e}");
                None
            }
        }
    }
}
