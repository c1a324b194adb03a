use shared::domain::{LocationId, TourId};
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no tour is selected")]
    NoTourSelected,
    #[error("no search result at index {0}")]
    NoCandidateAtIndex(usize),
    #[error("search result {0:?} is no longer listed")]
    UnknownCandidate(String),
    /// The location entity exists server-side but never joined the tour.
    #[error("location {location_id} was created but not attached to tour {tour_id}: {source}")]
    OrphanedLocation {
        location_id: LocationId,
        tour_id: TourId,
        #[source]
        source: TransportError,
    },
}

impl SyncError {
    /// True for failures rejected locally before any request went out.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            Self::NoTourSelected | Self::NoCandidateAtIndex(_) | Self::UnknownCandidate(_)
        )
    }
}
