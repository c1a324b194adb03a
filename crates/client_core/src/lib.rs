use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{LocationId, TourId, TourSummary},
    protocol::{
        CandidateKey, CreateTourRequest, NewLocation, SearchResult, TourMembershipRequest,
    },
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tour_geometry::{compute_bounds, compute_polyline, plan_tour, Bounds, RoutePlan};
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use config::{load_settings, Settings};
pub use error::SyncError;
pub use transport::{HttpTourBackend, TourBackend, TransportError};
pub use types::{
    ActiveTour, SearchCandidate, SearchPhase, SearchSession, SessionEvent, SessionSnapshot,
    SyncOperation,
};

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Default)]
struct SessionState {
    tours: Vec<TourSummary>,
    active: ActiveTour,
    search: SearchSession,
}

/// Client-side owner of the tour registry, the selected tour and the
/// location search.
///
/// Every mutation is followed by a re-fetch of the affected server record;
/// local state is never patched. The state lock is never held across a
/// backend call, so overlapping flows interleave and the last response to
/// arrive wins.
pub struct TourSession {
    backend: Arc<dyn TourBackend>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

/// Keeps the mount-time registry fetch alive. Dropping it (or calling
/// [`MountGuard::unmount`]) discards a response that has not landed yet.
pub struct MountGuard {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl MountGuard {
    pub fn unmount(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Waits for the initial fetch to settle, whether applied or discarded.
    /// Returns at once after the first call.
    pub async fn settled(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl TourSession {
    pub fn new(backend: Arc<dyn TourBackend>) -> Arc<Self> {
        Self::with_event_buffer(backend, DEFAULT_EVENT_BUFFER)
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>, TransportError> {
        let backend = HttpTourBackend::from_settings(settings)?;
        Ok(Self::with_event_buffer(
            Arc::new(backend),
            settings.event_buffer,
        ))
    }

    pub fn with_event_buffer(backend: Arc<dyn TourBackend>, capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            backend,
            inner: Mutex::new(SessionState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            tours: guard.tours.clone(),
            active_tour: guard.active.tour().cloned(),
            loading_tour: guard.active.loading(),
            search: guard.search.clone(),
        }
    }

    /// Starts the initial registry fetch in the background.
    pub fn mount(self: &Arc<Self>) -> MountGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        let session = Arc::clone(self);
        let flag = Arc::clone(&cancelled);
        let task = tokio::spawn(async move {
            let outcome = session.backend.list_tours().await;
            if flag.load(Ordering::SeqCst) {
                debug!("session unmounted; discarding initial tour list");
                return;
            }
            match outcome {
                Ok(tours) => session.replace_registry(tours).await,
                Err(err) => {
                    session.fail(SyncOperation::RefreshRegistry, err.into());
                }
            }
        });
        MountGuard {
            cancelled,
            task: Some(task),
        }
    }

    /// Replaces the registry with the backend's full tour list. On failure
    /// the previous list stays in place.
    pub async fn refresh_registry(&self) -> Result<(), SyncError> {
        match self.backend.list_tours().await {
            Ok(tours) => {
                self.replace_registry(tours).await;
                Ok(())
            }
            Err(err) => Err(self.fail(SyncOperation::RefreshRegistry, err.into())),
        }
    }

    /// Ids below 1 clear the selection without touching the network.
    pub async fn select_tour(&self, tour_id: TourId) -> Result<(), SyncError> {
        if !tour_id.is_selectable() {
            self.settle_active(ActiveTour::Unselected).await;
            return Ok(());
        }

        let previous = {
            let mut guard = self.inner.lock().await;
            let previous = std::mem::take(&mut guard.active).settled();
            guard.active = ActiveTour::Loading {
                requested: tour_id,
                previous: previous.clone(),
            };
            previous
        };

        match self.backend.get_tour(tour_id).await {
            Ok(tour) => {
                debug!(
                    tour_id = tour.id.0,
                    locations = tour.locations.len(),
                    "tour loaded"
                );
                self.settle_active(ActiveTour::Loaded(tour)).await;
                Ok(())
            }
            Err(err) => {
                {
                    let mut guard = self.inner.lock().await;
                    if guard.active.loading() == Some(tour_id) {
                        guard.active = ActiveTour::restore(previous);
                    }
                }
                Err(self.fail(SyncOperation::SelectTour, err.into()))
            }
        }
    }

    /// Creates a tour, refreshes the registry, then selects the new tour.
    /// The name is cut to the backend's 100 character limit first.
    pub async fn create_tour(&self, name: &str) -> Result<TourId, SyncError> {
        let request = CreateTourRequest::new(name);
        let created = self.backend.create_tour(&request).await;

        // The registry is refreshed whether or not the create went through.
        let _ = self.refresh_registry().await;

        let created = match created {
            Ok(created) => created,
            Err(err) => return Err(self.fail(SyncOperation::CreateTour, err.into())),
        };
        info!(tour_id = created.id.0, name = %created.name, "tour created");

        self.select_tour(created.id).await?;
        Ok(created.id)
    }

    /// Deletes the selected tour. Returns `false` without any request when
    /// nothing is selected. A failed delete leaves all state untouched.
    pub async fn delete_tour(&self) -> Result<bool, SyncError> {
        let Some(tour_id) = self.selected_tour_id().await else {
            debug!("delete ignored: no tour selected");
            return Ok(false);
        };

        if let Err(err) = self.backend.delete_tour(tour_id).await {
            return Err(self.fail(SyncOperation::DeleteTour, err.into()));
        }
        info!(tour_id = tour_id.0, "tour deleted");

        let _ = self.refresh_registry().await;
        self.select_tour(TourId(-1)).await?;
        Ok(true)
    }

    /// Looks up `query` with the geocoder. Blank queries are ignored and
    /// return `Ok(None)`. The selection modal opens once the lookup settles,
    /// even with no results.
    pub async fn search(&self, query: &str) -> Result<Option<usize>, SyncError> {
        let query = query.trim();
        if query.is_empty() {
            debug!("blank search ignored");
            return Ok(None);
        }

        {
            let mut guard = self.inner.lock().await;
            guard.search.query = query.to_string();
            guard.search.results.clear();
            guard.search.loading = true;
            guard.search.modal_open = false;
            self.emit(SessionEvent::SearchUpdated(guard.search.clone()));
        }

        let outcome = self.backend.search_locations(query).await;

        let outcome = {
            let mut guard = self.inner.lock().await;
            let outcome = match outcome {
                Ok(results) => {
                    let count = results.len();
                    guard.search.results = results;
                    Ok(count)
                }
                Err(err) => Err(err),
            };
            guard.search.loading = false;
            guard.search.modal_open = true;
            self.emit(SessionEvent::SearchUpdated(guard.search.clone()));
            outcome
        };

        match outcome {
            Ok(count) => {
                debug!(query, results = count, "search settled");
                Ok(Some(count))
            }
            Err(err) => Err(self.fail(SyncOperation::Search, err.into())),
        }
    }

    pub async fn close_search(&self) {
        let mut guard = self.inner.lock().await;
        guard.search.clear();
        self.emit(SessionEvent::SearchUpdated(guard.search.clone()));
    }

    /// Adds the search result at `index` to the selected tour.
    ///
    /// The candidate is resolved before any request is issued.
    pub async fn add_location_to_tour(&self, index: usize) -> Result<LocationId, SyncError> {
        let resolved = {
            let guard = self.inner.lock().await;
            match guard.active.tour_id() {
                None => Err(SyncError::NoTourSelected),
                Some(tour_id) => guard
                    .search
                    .candidate_at(index)
                    .cloned()
                    .map(|result| (tour_id, result))
                    .ok_or(SyncError::NoCandidateAtIndex(index)),
            }
        };
        match resolved {
            Ok((tour_id, result)) => self.attach_new_location(tour_id, result).await,
            Err(err) => Err(self.fail(SyncOperation::AddLocation, err)),
        }
    }

    /// Same as [`TourSession::add_location_to_tour`], keyed by the candidate's
    /// name and coordinates instead of its list position.
    pub async fn add_candidate(&self, key: &CandidateKey) -> Result<LocationId, SyncError> {
        let resolved = {
            let guard = self.inner.lock().await;
            match guard.active.tour_id() {
                None => Err(SyncError::NoTourSelected),
                Some(tour_id) => guard
                    .search
                    .find(key)
                    .cloned()
                    .map(|result| (tour_id, result))
                    .ok_or_else(|| SyncError::UnknownCandidate(key.name.clone())),
            }
        };
        match resolved {
            Ok((tour_id, result)) => self.attach_new_location(tour_id, result).await,
            Err(err) => Err(self.fail(SyncOperation::AddLocation, err)),
        }
    }

    /// Create-location then attach, strictly in that order. If the attach
    /// fails the created location is left orphaned on the server.
    async fn attach_new_location(
        &self,
        tour_id: TourId,
        result: SearchResult,
    ) -> Result<LocationId, SyncError> {
        let location = NewLocation::from(&result);
        let created = match self.backend.create_location(&location).await {
            Ok(created) => created,
            Err(err) => return Err(self.fail(SyncOperation::AddLocation, err.into())),
        };

        let membership = TourMembershipRequest {
            tour_id,
            location_id: created.id,
        };
        if let Err(source) = self.backend.add_to_tour(membership).await {
            return Err(self.fail(
                SyncOperation::AddLocation,
                SyncError::OrphanedLocation {
                    location_id: created.id,
                    tour_id,
                    source,
                },
            ));
        }
        info!(
            tour_id = tour_id.0,
            location_id = created.id.0,
            name = %location.name,
            "location added to tour"
        );

        let refreshed = self.select_tour(tour_id).await;
        self.close_search().await;
        refreshed?;
        Ok(created.id)
    }

    /// Detaches a location from the selected tour. The location entity
    /// itself is kept.
    pub async fn remove_location_from_tour(
        &self,
        location_id: LocationId,
    ) -> Result<(), SyncError> {
        let Some(tour_id) = self.selected_tour_id().await else {
            return Err(self.fail(SyncOperation::RemoveLocation, SyncError::NoTourSelected));
        };

        let membership = TourMembershipRequest {
            tour_id,
            location_id,
        };
        if let Err(err) = self.backend.remove_from_tour(membership).await {
            return Err(self.fail(SyncOperation::RemoveLocation, err.into()));
        }
        info!(
            tour_id = tour_id.0,
            location_id = location_id.0,
            "location removed from tour"
        );

        self.select_tour(tour_id).await
    }

    pub async fn polyline(&self) -> Vec<[f64; 2]> {
        let guard = self.inner.lock().await;
        guard
            .active
            .tour()
            .map(|tour| compute_polyline(&tour.locations))
            .unwrap_or_default()
    }

    pub async fn bounds(&self) -> Option<Bounds> {
        let guard = self.inner.lock().await;
        guard
            .active
            .tour()
            .and_then(|tour| compute_bounds(&tour.locations))
    }

    /// Shortest round trip through the selected tour, starting at its first
    /// stop. `None` when no tour with locations is loaded.
    pub async fn planned_route(&self) -> Option<RoutePlan> {
        let guard = self.inner.lock().await;
        let tour = guard.active.tour()?;
        if tour.locations.is_empty() {
            return None;
        }
        plan_tour(&tour.locations, 0).ok()
    }

    async fn selected_tour_id(&self) -> Option<TourId> {
        self.inner.lock().await.active.tour_id()
    }

    // State writes and their events happen under one lock so subscribers
    // see them in the same order as `snapshot`.
    async fn replace_registry(&self, tours: Vec<TourSummary>) {
        debug!(tours = tours.len(), "tour registry refreshed");
        let mut guard = self.inner.lock().await;
        guard.tours = tours.clone();
        self.emit(SessionEvent::RegistryUpdated(tours));
    }

    async fn settle_active(&self, active: ActiveTour) {
        let visible = active.tour().cloned();
        let mut guard = self.inner.lock().await;
        guard.active = active;
        self.emit(SessionEvent::ActiveTourChanged(visible));
    }

    fn fail(&self, operation: SyncOperation, err: SyncError) -> SyncError {
        warn!(operation = operation.as_str(), error = %err, "tour sync failed");
        self.emit(SessionEvent::SyncFailed {
            operation,
            message: err.to_string(),
        });
        err
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; renderers come and go.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
