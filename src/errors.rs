use thiserror::Error;
use uuid::Uuid;

use crate::records::AppointmentStatus;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid service: {id}")]
    InvalidService {
        id: Uuid,
    },

    #[error("invalid coordinates: lat {lat}, lng {lng}")]
    InvalidCoordinates {
        lat: f64,
        lng: f64,
    },

    #[error("invalid commission percent: {percent}")]
    InvalidPercent {
        percent: u32,
    },

    #[error("invalid time window: {message}")]
    InvalidTimeWindow {
        message: String,
    },

    #[error("provider not found: {id}")]
    ProviderNotFound {
        id: Uuid,
    },

    #[error("client not found: {id}")]
    ClientNotFound {
        id: Uuid,
    },

    #[error("appointment not found: {id}")]
    AppointmentNotFound {
        id: Uuid,
    },

    #[error("statement not found: {id}")]
    StatementNotFound {
        id: Uuid,
    },

    #[error("invalid transition: cannot {action} appointment in status {from:?}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: &'static str,
    },

    #[error("statement already paid: {id}")]
    AlreadyPaid {
        id: Uuid,
    },

    #[error("no current location set for provider {id}")]
    NoCurrentLocation {
        id: Uuid,
    },

    #[error("published location is locked for provider {id}")]
    LocationPublishLocked {
        id: Uuid,
    },

    #[error("store unavailable: {message}")]
    StoreUnavailable {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
