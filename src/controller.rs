//! Location resolution and hotspot retrieval.
//!
//! The [`Controller`] owns the dashboard's [`RetrievalState`] and is its only
//! writer. Three triggers feed it: the startup geolocation lookup, a submitted
//! search and a manual refresh. Each trigger spawns its network work on the
//! runtime and the task posts an [`Event`] back to the main loop, which hands it
//! to the matching `on_*` handler. Because every mutation happens inside those
//! handlers, the state never needs a lock.
//!
//! Every lookup carries a sequence number. When fencing is on (the default), a
//! completion that is not the latest of its kind is dropped, so a slow, older
//! retrieval can never overwrite newer results.

use crate::api::RemoteDataSource;
use crate::config::Config;
use crate::error::{ErrorKind, FetchError, LocationError};
use crate::events::Event;
use crate::location::GeolocationProvider;
use crate::models::{Coordinate, Hotspot, HotspotBundle, WeatherSnapshot};
use crate::projection::{self, RiskCounts};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Where the current center came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    Default,
    Device,
    Search(String),
}

/// Snapshot of everything the views render.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalState {
    pub center: Coordinate,
    pub user_location: Option<Coordinate>,
    pub location_source: LocationSource,
    pub hotspots: Vec<Hotspot>,
    /// At most [`projection::TOP_N`] entries.
    pub top_ranked: Vec<Hotspot>,
    pub weather: Option<WeatherSnapshot>,
    pub loading: bool,
    pub error: Option<ErrorKind>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RetrievalState {
    pub fn new(center: Coordinate) -> Self {
        Self {
            center,
            user_location: None,
            location_source: LocationSource::Default,
            hotspots: Vec::new(),
            top_ranked: Vec::new(),
            weather: None,
            loading: false,
            error: None,
            last_updated: None,
        }
    }

    /// Entries for the ranked list view.
    pub fn ranked(&self) -> &[Hotspot] {
        projection::list_view(&self.top_ranked, &self.hotspots)
    }

    pub fn risk_counts(&self) -> RiskCounts {
        RiskCounts::tally(&self.hotspots)
    }
}

/// Result of one retrieval. Failures never surface as errors here: they are
/// already replaced by sample data.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Live(HotspotBundle),
    Degraded(HotspotBundle),
}

impl Retrieval {
    pub async fn run(source: &dyn RemoteDataSource, at: Coordinate) -> Self {
        match source.fetch_nearby(at).await {
            Ok(bundle) => Retrieval::Live(bundle),
            Err(e) => {
                warn!("Hotspot retrieval for ({}) failed: {}. Serving sample data.", at, e);
                Self::degraded(at)
            }
        }
    }

    pub fn degraded(at: Coordinate) -> Self {
        Retrieval::Degraded(HotspotBundle::mock(at, Utc::now()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub default_center: Coordinate,
    pub fence_stale_results: bool,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_center: config.location.default_center(),
            fence_stale_results: config.retrieval.fence_stale_results,
        }
    }
}

/// Bookkeeping for one kind of lookup.
#[derive(Debug, Default)]
struct Track {
    latest: u64,
    awaiting: Option<u64>,
    in_flight: usize,
}

impl Track {
    fn issue(&mut self, seq: u64) {
        self.latest = seq;
        self.awaiting = Some(seq);
        self.in_flight += 1;
    }

    /// Records a completion and says whether its result should be applied.
    fn complete(&mut self, seq: u64, fence: bool) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        let is_latest = seq == self.latest;
        if is_latest {
            self.awaiting = None;
        }
        is_latest || !fence
    }

    fn pending(&self, fence: bool) -> bool {
        if fence {
            self.awaiting.is_some()
        } else {
            self.in_flight > 0
        }
    }
}

/// Delivers exactly one event for a spawned lookup. If the task ends without
/// calling [`Completion::send`] (panic, runtime shutdown), the fallback event is
/// posted from `Drop` so the main loop is never left waiting.
struct Completion<F: FnOnce() -> Event> {
    tx: mpsc::UnboundedSender<Event>,
    on_abandon: Option<F>,
}

impl<F: FnOnce() -> Event> Completion<F> {
    fn new(tx: mpsc::UnboundedSender<Event>, on_abandon: F) -> Self {
        Self {
            tx,
            on_abandon: Some(on_abandon),
        }
    }

    fn send(mut self, event: Event) {
        self.on_abandon = None;
        let _ = self.tx.send(event);
    }
}

impl<F: FnOnce() -> Event> Drop for Completion<F> {
    fn drop(&mut self) {
        if let Some(fallback) = self.on_abandon.take() {
            warn!("Background lookup ended without a result");
            let _ = self.tx.send(fallback());
        }
    }
}

pub struct Controller {
    settings: ControllerSettings,
    source: Arc<dyn RemoteDataSource>,
    geolocator: Option<Arc<dyn GeolocationProvider>>,
    tx: mpsc::UnboundedSender<Event>,
    state: RetrievalState,
    published: watch::Sender<RetrievalState>,
    next_seq: u64,
    locates: Track,
    searches: Track,
    retrievals: Track,
    /// Sequence number of the last search that resolved to a coordinate.
    last_search_hit: u64,
    /// A location fix waiting on a newer search that has not resolved yet.
    deferred_fix: Option<(Coordinate, LocationSource)>,
}

impl Controller {
    /// `tx` is where background tasks post their completions; the owner of the
    /// matching receiver must feed those events back through [`Controller::handle`].
    pub fn new(
        settings: ControllerSettings,
        source: Arc<dyn RemoteDataSource>,
        geolocator: Option<Arc<dyn GeolocationProvider>>,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let state = RetrievalState::new(settings.default_center);
        let (published, _) = watch::channel(state.clone());
        Self {
            settings,
            source,
            geolocator,
            tx,
            state,
            published,
            next_seq: 0,
            locates: Track::default(),
            searches: Track::default(),
            retrievals: Track::default(),
            last_search_hit: 0,
            deferred_fix: None,
        }
    }

    pub fn state(&self) -> &RetrievalState {
        &self.state
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<RetrievalState> {
        self.published.subscribe()
    }

    /// Routes a completion event to its handler. Terminal events are ignored.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::LocationFix { seq, result } => self.on_location_fix(seq, result),
            Event::SearchResolved { seq, query, result } => {
                self.on_search_resolved(seq, query, result)
            }
            Event::RetrievalFinished { seq, at, outcome } => {
                self.on_retrieval_finished(seq, at, outcome)
            }
            Event::Tick | Event::Input(_) => {}
        }
    }

    /// Starts the auto-geolocation path. Without a provider the default
    /// coordinate is queried straight away.
    pub fn activate(&mut self) {
        let seq = self.bump_seq();
        self.locates.issue(seq);

        let Some(provider) = self.geolocator.clone() else {
            debug!("No geolocation provider configured");
            self.on_location_fix(seq, Err(LocationError::Disabled));
            return;
        };

        let completion = Completion::new(self.tx.clone(), move || Event::LocationFix {
            seq,
            result: Err(LocationError::Lookup("lookup task ended early".to_string())),
        });
        tokio::spawn(async move {
            let result = provider.current_position().await;
            completion.send(Event::LocationFix { seq, result });
        });

        self.sync_loading();
        self.publish();
    }

    /// Starts the search path. Blank queries are ignored; returns whether a
    /// lookup was started.
    pub fn submit_search(&mut self, query: &str) -> bool {
        let query = query.trim().to_string();
        if query.is_empty() {
            return false;
        }

        let seq = self.bump_seq();
        self.searches.issue(seq);
        self.state.error = None;
        info!(seq, query = %query, "Searching for location");

        let source = Arc::clone(&self.source);
        let abandoned_query = query.clone();
        let completion = Completion::new(self.tx.clone(), move || Event::SearchResolved {
            seq,
            query: abandoned_query,
            result: Err(FetchError::Abandoned),
        });
        tokio::spawn(async move {
            let result = source.geocode(&query).await;
            completion.send(Event::SearchResolved { seq, query, result });
        });

        self.sync_loading();
        self.publish();
        true
    }

    /// Re-queries the current center.
    pub fn refresh(&mut self) -> u64 {
        self.issue_retrieval(self.state.center)
    }

    pub fn on_location_fix(&mut self, seq: u64, result: Result<Coordinate, LocationError>) {
        let fence = self.settings.fence_stale_results;
        if !self.locates.complete(seq, fence) {
            debug!(seq, "Discarding stale location fix");
            self.finish();
            return;
        }

        let target = match result {
            Ok(position) => {
                self.state.user_location = Some(position);
                (position, LocationSource::Device)
            }
            Err(e) => {
                // Silent: the user only sees the default area.
                warn!("{}. Falling back to default area ({}).", e, self.settings.default_center);
                debug!(kind = ?ErrorKind::from(&e), "Geolocation unavailable");
                (self.settings.default_center, LocationSource::Default)
            }
        };

        // Only a newer search that actually found a place owns the center.
        // One still in flight decides when it resolves.
        if fence && self.last_search_hit > seq {
            info!("Location fix ({}) arrived after a search; keeping searched area", target.0);
        } else if fence && self.searches.awaiting.is_some_and(|pending| pending > seq) {
            debug!(seq, "Holding location fix until the pending search resolves");
            self.deferred_fix = Some(target);
        } else {
            self.move_center(target);
        }
        self.finish();
    }

    pub fn on_search_resolved(
        &mut self,
        seq: u64,
        query: String,
        result: Result<Option<Coordinate>, FetchError>,
    ) {
        if !self.searches.complete(seq, self.settings.fence_stale_results) {
            debug!(seq, query = %query, "Discarding stale search result");
            self.finish();
            return;
        }

        match result {
            Ok(Some(found)) => {
                info!(query = %query, "Search resolved to ({})", found);
                self.last_search_hit = seq;
                self.deferred_fix = None;
                self.move_center((found, LocationSource::Search(query)));
            }
            Ok(None) => {
                info!(query = %query, "Search found no location");
                self.release_deferred_fix();
                self.state.error = Some(ErrorKind::LocationNotFound);
            }
            Err(e) => {
                warn!(query = %query, "Search failed: {}", e);
                self.release_deferred_fix();
                self.state.error = Some(ErrorKind::SearchFailed);
            }
        }
        self.finish();
    }

    pub fn on_retrieval_finished(&mut self, seq: u64, at: Coordinate, outcome: Retrieval) {
        if self.retrievals.complete(seq, self.settings.fence_stale_results) {
            let bundle = match outcome {
                Retrieval::Live(bundle) => bundle,
                Retrieval::Degraded(bundle) => {
                    self.state.error = Some(ErrorKind::BackendUnavailable);
                    bundle
                }
            };
            info!(seq, count = bundle.hotspots.len(), "Hotspots updated for ({})", at);
            self.apply_bundle(bundle);
        } else {
            debug!(seq, latest = self.retrievals.latest, "Discarding stale retrieval for ({})", at);
        }
        self.finish();
    }

    fn move_center(&mut self, (center, source): (Coordinate, LocationSource)) {
        self.state.center = center;
        self.state.location_source = source;
        self.issue_retrieval(center);
    }

    /// Applies a held location fix once the search it waited on came up empty.
    fn release_deferred_fix(&mut self) {
        if let Some(target) = self.deferred_fix.take() {
            debug!("Search did not move the map; applying held location fix");
            self.move_center(target);
        }
    }

    fn issue_retrieval(&mut self, at: Coordinate) -> u64 {
        let seq = self.bump_seq();
        self.retrievals.issue(seq);
        self.state.error = None;
        debug!(seq, "Retrieving hotspots near ({})", at);

        let source = Arc::clone(&self.source);
        let completion = Completion::new(self.tx.clone(), move || Event::RetrievalFinished {
            seq,
            at,
            outcome: Retrieval::degraded(at),
        });
        tokio::spawn(async move {
            let outcome = Retrieval::run(source.as_ref(), at).await;
            completion.send(Event::RetrievalFinished { seq, at, outcome });
        });

        self.sync_loading();
        self.publish();
        seq
    }

    fn apply_bundle(&mut self, bundle: HotspotBundle) {
        let HotspotBundle {
            hotspots,
            top_ranked,
            weather,
        } = bundle;
        self.state.top_ranked = projection::select_top_ranked(&hotspots, top_ranked);
        self.state.hotspots = hotspots;
        self.state.weather = weather;
        self.state.last_updated = Some(Utc::now());
    }

    /// Common tail of every completion handler.
    fn finish(&mut self) {
        self.sync_loading();
        self.publish();
    }

    fn sync_loading(&mut self) {
        let fence = self.settings.fence_stale_results;
        self.state.loading = self.locates.pending(fence)
            || self.searches.pending(fence)
            || self.retrievals.pending(fence);
    }

    fn publish(&self) {
        self.published.send_replace(self.state.clone());
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
