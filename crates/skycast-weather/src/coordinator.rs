//! Search & weather coordinator.
//!
//! Owns every piece of mutable search state. Text edits are debounced into
//! location searches, each search result list triggers concurrent weather
//! prefetches, and selections are persisted through the location store.
//!
//! State lives inside a `watch` channel so the presentation layer can observe
//! it; every write goes through `send_modify`/`send_if_modified` and does no
//! I/O while holding the channel's lock. Bookkeeping that must be checked
//! atomically with a state write (search generation, last settled query,
//! in-flight prefetches) lives behind `pipeline`, which is always locked
//! before the state, never after.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::debounce::Debouncer;
use crate::gateway::WeatherGateway;
use crate::store::LocationStore;
use crate::types::{LocationCandidate, WeatherSnapshot};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Quiet period after the last edit before a search is issued
    pub debounce: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Observable snapshot of the coordinator's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Text as typed, updated on every edit
    pub query: String,
    /// A search request is in flight
    pub loading: bool,
    /// Latest search response, in gateway order
    pub search_results: Vec<LocationCandidate>,
    /// Weather by candidate id. May hold entries from abandoned searches;
    /// render through [`SearchState::visible_weather`].
    pub cached_weather: HashMap<i64, WeatherSnapshot>,
    pub selected_weather: Option<WeatherSnapshot>,
}

impl SearchState {
    /// Current results paired with their prefetched weather, if it has landed.
    pub fn visible_weather(
        &self,
    ) -> impl Iterator<Item = (&LocationCandidate, Option<&WeatherSnapshot>)> + '_ {
        self.search_results
            .iter()
            .map(|c| (c, self.weather_for(c)))
    }

    pub fn weather_for(&self, candidate: &LocationCandidate) -> Option<&WeatherSnapshot> {
        self.cached_weather.get(&candidate.id)
    }
}

/// Where the query lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Searching,
    ResultsReady,
    Selected,
}

#[derive(Debug, Default)]
struct Pipeline {
    /// Bumped for every search started (and on reset); responses carrying an
    /// older value are dropped.
    generation: u64,
    /// Trimmed value of the last query the debouncer delivered.
    last_settled: Option<String>,
    /// Candidate ids with a weather fetch in flight.
    prefetching: HashSet<i64>,
}

struct Inner {
    gateway: Arc<dyn WeatherGateway>,
    store: Arc<dyn LocationStore>,
    runtime: Handle,
    state: watch::Sender<SearchState>,
    pipeline: Mutex<Pipeline>,
}

/// Owns the search and selection state for one presentation surface.
///
/// Construction does not touch the location store. Call
/// [`SearchCoordinator::restore_saved_location`] once at startup to bring
/// back the previous selection; it is kept separate so the caller decides
/// when the first network request goes out.
pub struct SearchCoordinator {
    inner: Arc<Inner>,
    debouncer: Arc<Debouncer>,
}

impl SearchCoordinator {
    /// Background work (debounce timers, requests) is spawned on `runtime`.
    pub fn new(
        gateway: Arc<dyn WeatherGateway>,
        store: Arc<dyn LocationStore>,
        options: CoordinatorOptions,
        runtime: Handle,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        let debouncer = Debouncer::new(options.debounce, runtime.clone());

        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                runtime,
                state,
                pipeline: Mutex::new(Pipeline::default()),
            }),
            debouncer,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> SearchPhase {
        let state = self.inner.state.borrow();
        if state.selected_weather.is_some() {
            SearchPhase::Selected
        } else if state.loading {
            SearchPhase::Searching
        } else if self.debouncer.is_pending() && !state.query.trim().is_empty() {
            SearchPhase::Debouncing
        } else if state.search_results.is_empty() && state.query.trim().is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::ResultsReady
        }
    }

    /// Record a raw text edit and (re)start the debounce timer for it.
    ///
    /// Non-empty text hides any selected weather immediately; results stay
    /// until the debounced search replaces them.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let clears_selection = !text.is_empty();

        self.inner.state.send_modify(|s| {
            s.query.clone_from(&text);
            if clears_selection {
                s.selected_weather = None;
            }
        });

        let inner = Arc::clone(&self.inner);
        self.debouncer
            .schedule(async move { inner.on_query_settled(text).await });
    }

    /// Show cached weather for `candidate` and remember it for next launch.
    ///
    /// Returns false, changing nothing, if its prefetch has not landed yet.
    pub fn select_location(&self, candidate: &LocationCandidate) -> bool {
        let selected = self.inner.state.send_if_modified(|s| {
            match s.cached_weather.get(&candidate.id) {
                Some(weather) => {
                    s.selected_weather = Some(weather.clone());
                    true
                }
                None => false,
            }
        });

        if !selected {
            tracing::debug!(
                "Ignoring selection of {} ({}): weather not cached yet",
                candidate.name,
                candidate.id
            );
            return false;
        }

        if let Err(e) = self.inner.store.save(candidate) {
            tracing::warn!("Failed to persist selected location: {}", e);
        }
        true
    }

    /// Clear results and selection. Cached weather and the persisted
    /// selection are kept.
    pub fn reset_search(&self) {
        let mut pipeline = self.inner.pipeline.lock();
        pipeline.generation += 1;
        pipeline.last_settled = None;
        self.inner.state.send_modify(|s| {
            s.search_results.clear();
            s.selected_weather = None;
            s.loading = false;
        });
    }

    /// Load the persisted selection and fetch its weather in the background.
    ///
    /// Returns the restore task, or `None` if nothing was saved (or the slot
    /// could not be read).
    pub fn restore_saved_location(&self) -> Option<JoinHandle<()>> {
        let candidate = match self.inner.store.load() {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                tracing::debug!("No saved location to restore");
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load saved location: {}", e);
                return None;
            }
        };

        tracing::info!("Restoring saved location {} ({})", candidate.name, candidate.id);
        let inner = Arc::clone(&self.inner);
        Some(
            self.inner
                .runtime
                .spawn(async move { inner.restore(candidate).await }),
        )
    }

    /// Stop any pending debounce timer. In-flight requests still complete.
    pub fn shutdown(&self) {
        self.debouncer.shutdown();
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.debouncer.shutdown();
    }
}

impl Inner {
    async fn on_query_settled(self: Arc<Self>, raw: String) {
        let query = raw.trim().to_string();

        let generation = {
            let mut pipeline = self.pipeline.lock();
            if pipeline.last_settled.as_deref() == Some(query.as_str()) {
                tracing::debug!("Query {:?} unchanged since last search, skipping", query);
                return;
            }
            pipeline.last_settled = Some(query.clone());
            pipeline.generation += 1;
            pipeline.generation
        };

        if query.is_empty() {
            self.commit_search(generation, Vec::new());
            return;
        }

        if !self.begin_search(generation) {
            return;
        }

        let candidates = match self.gateway.search_locations(&query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    retryable = e.is_retryable(),
                    "Location search for {:?} failed: {}",
                    query,
                    e
                );
                Vec::new()
            }
        };

        if self.commit_search(generation, candidates.clone()) {
            self.prefetch(&candidates);
        } else {
            tracing::debug!("Discarding stale results for {:?}", query);
        }
    }

    fn begin_search(&self, generation: u64) -> bool {
        let pipeline = self.pipeline.lock();
        if pipeline.generation != generation {
            return false;
        }
        self.state.send_modify(|s| s.loading = true);
        true
    }

    /// Replace the results if `generation` is still the newest search.
    fn commit_search(&self, generation: u64, candidates: Vec<LocationCandidate>) -> bool {
        let pipeline = self.pipeline.lock();
        if pipeline.generation != generation {
            return false;
        }
        self.state.send_modify(|s| {
            s.search_results = candidates;
            s.loading = false;
        });
        true
    }

    /// Fetch weather for every candidate not already cached or in flight.
    fn prefetch(self: &Arc<Self>, candidates: &[LocationCandidate]) {
        let to_fetch: Vec<LocationCandidate> = {
            let mut pipeline = self.pipeline.lock();
            let state = self.state.borrow();
            candidates
                .iter()
                .filter(|c| {
                    !state.cached_weather.contains_key(&c.id) && pipeline.prefetching.insert(c.id)
                })
                .cloned()
                .collect()
        };

        for candidate in to_fetch {
            let inner = Arc::clone(self);
            self.runtime.spawn(async move {
                let result = inner.gateway.fetch_weather(&candidate).await;

                let mut pipeline = inner.pipeline.lock();
                match result {
                    Ok(weather) => {
                        inner.state.send_modify(|s| {
                            s.cached_weather.insert(candidate.id, weather);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            retryable = e.is_retryable(),
                            "Weather prefetch for {} ({}) failed: {}",
                            candidate.name,
                            candidate.id,
                            e
                        );
                    }
                }
                pipeline.prefetching.remove(&candidate.id);
            });
        }
    }

    async fn restore(&self, candidate: LocationCandidate) {
        let weather = match self.gateway.fetch_weather(&candidate).await {
            Ok(weather) => weather,
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch weather for saved location {}: {}",
                    candidate.name,
                    e
                );
                return;
            }
        };

        self.state.send_modify(|s| {
            s.cached_weather.insert(candidate.id, weather.clone());
            // The user has moved on; keep the reading but don't take over the screen
            if s.selected_weather.is_none() && s.query.is_empty() {
                s.selected_weather = Some(weather);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64) -> LocationCandidate {
        LocationCandidate {
            id,
            name: format!("City {}", id),
            region: String::new(),
            country: "Country".into(),
            lat: 0.0,
            lon: 0.0,
            url: format!("city-{}", id),
        }
    }

    #[test]
    fn test_visible_weather_hides_abandoned_entries() {
        let mut state = SearchState {
            search_results: vec![candidate(1), candidate(2)],
            ..Default::default()
        };
        let json = serde_json::json!({
            "location": {"name": "x", "region": "", "country": "", "lat": 0.0, "lon": 0.0,
                         "tz_id": "UTC", "localtime_epoch": 0, "localtime": "1970-01-01 00:00"},
            "current": {"temp_f": 50.0, "condition": {"text": "Clear", "icon": ""},
                        "humidity": 10, "feelslike_f": 50.0, "uv": 1.0}
        });
        let weather: WeatherSnapshot = serde_json::from_value(json).unwrap();
        state.cached_weather.insert(1, weather.clone());
        state.cached_weather.insert(99, weather);

        let visible: Vec<_> = state
            .visible_weather()
            .map(|(c, w)| (c.id, w.is_some()))
            .collect();

        assert_eq!(visible, vec![(1, true), (2, false)]);
        assert!(state.weather_for(&candidate(99)).is_some());
    }

    #[test]
    fn test_default_debounce() {
        assert_eq!(CoordinatorOptions::default().debounce, Duration::from_millis(800));
    }
}
