use std::fmt;

use shared::{
    domain::{Tour, TourId, TourSummary},
    protocol::{CandidateKey, SearchResult},
};

/// Which tour the session is showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveTour {
    /// The "no tour selected" sentinel. Renders as nothing.
    #[default]
    Unselected,
    /// A fetch for `requested` is in flight. `previous` is restored if it fails.
    Loading {
        requested: TourId,
        previous: Option<Tour>,
    },
    Loaded(Tour),
}

impl ActiveTour {
    pub fn tour(&self) -> Option<&Tour> {
        match self {
            Self::Loaded(tour) => Some(tour),
            _ => None,
        }
    }

    pub fn tour_id(&self) -> Option<TourId> {
        self.tour().map(|tour| tour.id)
    }

    pub fn loading(&self) -> Option<TourId> {
        match self {
            Self::Loading { requested, .. } => Some(*requested),
            _ => None,
        }
    }

    /// The last settled tour, looking through an in-flight load.
    pub(crate) fn settled(self) -> Option<Tour> {
        match self {
            Self::Unselected => None,
            Self::Loading { previous, .. } => previous,
            Self::Loaded(tour) => Some(tour),
        }
    }

    pub(crate) fn restore(previous: Option<Tour>) -> Self {
        previous.map_or(Self::Unselected, Self::Loaded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Searching,
    Results,
}

/// Transient state of one location search and its selection modal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSession {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub loading: bool,
    pub modal_open: bool,
}

impl SearchSession {
    pub fn phase(&self) -> SearchPhase {
        if self.loading {
            SearchPhase::Searching
        } else if self.modal_open {
            SearchPhase::Results
        } else {
            SearchPhase::Idle
        }
    }

    pub fn candidate_at(&self, index: usize) -> Option<&SearchResult> {
        self.results.get(index)
    }

    pub fn find(&self, key: &CandidateKey) -> Option<&SearchResult> {
        self.results.iter().find(|result| key.matches(result))
    }

    pub fn candidates(&self) -> Vec<SearchCandidate> {
        self.results
            .iter()
            .enumerate()
            .map(|(index, result)| SearchCandidate {
                index,
                key: result.key(),
                result: result.clone(),
            })
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub index: usize,
    pub key: CandidateKey,
    pub result: SearchResult,
}

/// Everything a renderer needs to draw the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub tours: Vec<TourSummary>,
    pub active_tour: Option<Tour>,
    pub loading_tour: Option<TourId>,
    pub search: SearchSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    RefreshRegistry,
    SelectTour,
    CreateTour,
    DeleteTour,
    Search,
    AddLocation,
    RemoveLocation,
}

impl SyncOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RefreshRegistry => "refresh_registry",
            Self::SelectTour => "select_tour",
            Self::CreateTour => "create_tour",
            Self::DeleteTour => "delete_tour",
            Self::Search => "search",
            Self::AddLocation => "add_location",
            Self::RemoveLocation => "remove_location",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RegistryUpdated(Vec<TourSummary>),
    ActiveTourChanged(Option<Tour>),
    SearchUpdated(SearchSession),
    SyncFailed {
        operation: SyncOperation,
        message: String,
    },
}
