//! Discovery session: one slot per adapter, refreshed by generation
//!
//! Every refresh issues a new generation for each slot and spawns one task
//! per adapter. A finished task only lands in its slot if the slot has not
//! been re-issued in the meantime, so late answers for an old query are
//! discarded whatever order they arrive in.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::CompassError;
use crate::cache::PersistentCache;
use crate::models::{DisplayItem, FilterCriteria, WeatherData};
use crate::pipeline::{View, merge};
use crate::providers::{ItemProvider, ProviderSet, SearchQuery, curated_activities};

/// Loading state of one adapter's slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    Idle,
    Loading,
    Ready,
    /// Provider failed; cached or built-in data is shown instead
    Fallback { message: String },
    Failed { message: String },
}

struct SlotState<T> {
    status: SourceStatus,
    data: Option<T>,
}

/// Latest issued generation plus the last accepted result of one adapter
pub struct SourceSlot<T> {
    generation: AtomicU64,
    state: Mutex<SlotState<T>>,
}

impl<T: Clone> SourceSlot<T> {
    fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: Mutex::new(SlotState {
                status: SourceStatus::Idle,
                data: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation and mark the slot as loading
    pub fn issue(&self) -> u64 {
        let mut state = self.lock();
        state.status = SourceStatus::Loading;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Store a result if `generation` is still the latest issued one
    pub fn accept(&self, generation: u64, status: SourceStatus, data: Option<T>) -> bool {
        let mut state = self.lock();
        if !self.is_current(generation) {
            return false;
        }
        state.status = status;
        state.data = data;
        true
    }

    #[must_use]
    pub fn status(&self) -> SourceStatus {
        self.lock().status.clone()
    }

    #[must_use]
    pub fn data(&self) -> Option<T> {
        self.lock().data.clone()
    }
}

/// Status of each item section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sections {
    pub activities: SourceStatus,
    pub ticketed_events: SourceStatus,
    pub generic_events: SourceStatus,
}

#[derive(Debug, Clone)]
struct ViewWindow {
    query: Option<SearchQuery>,
    criteria: FilterCriteria,
    page: usize,
}

/// Handle on the tasks spawned by one refresh
pub struct RefreshHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Wait until every adapter of this refresh has settled
    pub async fn wait(self) {
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                warn!("Fetch task ended abnormally: {}", e);
            }
        }
    }
}

pub struct DiscoverySession {
    providers: ProviderSet,
    cache: Option<Arc<PersistentCache>>,
    fetch_timeout: Duration,
    page_size: usize,
    weather: Arc<SourceSlot<WeatherData>>,
    activities: Arc<SourceSlot<Vec<DisplayItem>>>,
    ticketed: Arc<SourceSlot<Vec<DisplayItem>>>,
    generic: Arc<SourceSlot<Vec<DisplayItem>>>,
    window: Mutex<ViewWindow>,
}

impl DiscoverySession {
    #[must_use]
    pub fn new(
        providers: ProviderSet,
        cache: Option<Arc<PersistentCache>>,
        fetch_timeout: Duration,
        page_size: usize,
    ) -> Self {
        Self {
            providers,
            cache,
            fetch_timeout,
            page_size: page_size.max(1),
            weather: Arc::new(SourceSlot::new()),
            activities: Arc::new(SourceSlot::new()),
            ticketed: Arc::new(SourceSlot::new()),
            generic: Arc::new(SourceSlot::new()),
            window: Mutex::new(ViewWindow {
                query: None,
                criteria: FilterCriteria::default(),
                page: 1,
            }),
        }
    }

    fn window(&self) -> MutexGuard<'_, ViewWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a new generation for every adapter and fetch `query` in the background.
    ///
    /// A query that differs from the previous one resets the window to the first page.
    pub fn refresh(&self, query: SearchQuery) -> RefreshHandle {
        {
            let mut window = self.window();
            if window.query.as_ref() != Some(&query) {
                window.page = 1;
            }
            window.query = Some(query.clone());
        }
        info!(
            "Refreshing discovery for {} on {}",
            query.location_name, query.date
        );

        let weather = {
            let slot = Arc::clone(&self.weather);
            let generation = slot.issue();
            let provider = Arc::clone(&self.providers.weather);
            let settings = self.settings(query.cache_key("weather"));
            let query = query.clone();
            tokio::spawn(async move {
                let name = provider.name();
                settle(&slot, generation, name, provider.fetch(&query), settings, None).await;
            })
        };

        let tasks = vec![
            weather,
            self.spawn_items(&self.activities, &self.providers.activities, &query, true),
            self.spawn_items(&self.ticketed, &self.providers.ticketed, &query, false),
            self.spawn_items(&self.generic, &self.providers.generic, &query, false),
        ];
        RefreshHandle { tasks }
    }

    fn settings(&self, cache_key: String) -> FetchSettings {
        FetchSettings {
            cache: self.cache.clone(),
            cache_key,
            timeout: self.fetch_timeout,
        }
    }

    fn spawn_items(
        &self,
        slot: &Arc<SourceSlot<Vec<DisplayItem>>>,
        provider: &Arc<dyn ItemProvider>,
        query: &SearchQuery,
        curated_fallback: bool,
    ) -> JoinHandle<()> {
        let slot = Arc::clone(slot);
        let generation = slot.issue();
        let provider = Arc::clone(provider);
        let settings = self.settings(query.cache_key(provider.source().as_str()));
        let query = query.clone();

        tokio::spawn(async move {
            let fallback = curated_fallback.then(curated_activities);
            let name = provider.name();
            settle(&slot, generation, name, provider.fetch(&query), settings, fallback).await;
        })
    }

    /// Replace the filter criteria; a change resets the window to the first page
    pub fn set_criteria(&self, criteria: FilterCriteria) -> View {
        {
            let mut window = self.window();
            if window.criteria != criteria {
                window.criteria = criteria;
                window.page = 1;
            }
        }
        self.view()
    }

    /// Grow the window by one page
    pub fn load_more(&self) -> View {
        {
            let mut window = self.window();
            window.page += 1;
        }
        self.view()
    }

    /// Show the first `page` pages at once
    pub fn set_page(&self, page: usize) -> View {
        self.window().page = page.max(1);
        self.view()
    }

    /// Recompute the visible list from the latest accepted snapshots
    #[must_use]
    pub fn view(&self) -> View {
        let (criteria, page) = {
            let window = self.window();
            (window.criteria, window.page)
        };
        let items = merge(
            self.activities.data().unwrap_or_default(),
            self.ticketed.data().unwrap_or_default(),
            self.generic.data().unwrap_or_default(),
        );
        View::compute(&items, &criteria, self.page_size, page)
    }

    #[must_use]
    pub fn weather(&self) -> (SourceStatus, Option<WeatherData>) {
        (self.weather.status(), self.weather.data())
    }

    #[must_use]
    pub fn sections(&self) -> Sections {
        Sections {
            activities: self.activities.status(),
            ticketed_events: self.ticketed.status(),
            generic_events: self.generic.status(),
        }
    }

    #[must_use]
    pub fn criteria(&self) -> FilterCriteria {
        self.window().criteria
    }
}

struct FetchSettings {
    cache: Option<Arc<PersistentCache>>,
    cache_key: String,
    timeout: Duration,
}

/// Run one bounded fetch and record its outcome in `slot`.
///
/// Failures fall back to the cached snapshot, then to `fallback`, and only
/// then mark the slot as failed.
async fn settle<T, F>(
    slot: &SourceSlot<T>,
    generation: u64,
    provider: &str,
    fetch: F,
    settings: FetchSettings,
    fallback: Option<T>,
) where
    T: Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
    F: Future<Output = Result<T, CompassError>>,
{
    let result = match tokio::time::timeout(settings.timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(CompassError::provider(
            provider,
            None,
            format!("no answer within {}s", settings.timeout.as_secs_f32()),
        )),
    };

    match result {
        Ok(data) => {
            if let Some(cache) = &settings.cache {
                if let Err(e) = cache.put(&settings.cache_key, data.clone()).await {
                    warn!("Failed to cache {} snapshot: {}", provider, e);
                }
            }
            if !slot.accept(generation, SourceStatus::Ready, Some(data)) {
                debug!("Discarding stale {} result (generation {})", provider, generation);
            }
        }
        Err(error) => {
            warn!("{} fetch failed: {}", provider, error);
            let message = error.user_message();

            let cached = match &settings.cache {
                Some(cache) => cache.get::<T>(&settings.cache_key).await.unwrap_or_else(|e| {
                    warn!("Failed to read {} snapshot: {}", provider, e);
                    None
                }),
                None => None,
            };

            let (status, data) = match cached.or(fallback) {
                Some(data) => (SourceStatus::Fallback { message }, Some(data)),
                None => (SourceStatus::Failed { message }, None),
            };
            if !slot.accept(generation, status, data) {
                debug!("Discarding stale {} failure (generation {})", provider, generation);
            }
        }
    }
}
