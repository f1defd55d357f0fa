use std::sync::Arc;

use crate::errors::{EngineError, Result};
use crate::records::{Coordinates, Provider, ProviderId};
use crate::store::Store;

/// a provider's location publishing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    NoLocation,
    CurrentOnly,
    PublishedLocked,
    PublishedUnlocked,
}

/// derive the publish/lock state from a provider record
pub fn location_state(provider: &Provider) -> LocationState {
    match (&provider.published_location, &provider.current_location) {
        (Some(_), _) if provider.location_locked => LocationState::PublishedLocked,
        (Some(_), _) => LocationState::PublishedUnlocked,
        (None, Some(_)) => LocationState::CurrentOnly,
        (None, None) => LocationState::NoLocation,
    }
}

/// location publish/lock: a provider's live position stays private until an
/// explicit publish copies it into the searchable field
#[derive(Clone)]
pub struct LocationEngine {
    store: Arc<dyn Store>,
}

impl LocationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// update the private current position; published fields are never touched
    pub fn set_current(
        &self,
        provider_id: ProviderId,
        lat: f64,
        lng: f64,
        address: Option<&str>,
    ) -> Result<Provider> {
        let coords = Coordinates::new(lat, lng);
        if !coords.is_valid() {
            return Err(EngineError::InvalidCoordinates { lat, lng });
        }
        self.store.update_provider(provider_id, &mut |p| {
            p.current_location = Some(coords);
            if let Some(a) = address {
                p.address = Some(a.to_string());
            }
        })
    }

    /// copy current coordinates into the published fields and lock them.
    /// fails if no current location is set or the publish lock is held.
    pub fn publish(&self, provider_id: ProviderId, label: Option<&str>) -> Result<Provider> {
        let mut failure: Option<EngineError> = None;
        let updated = self.store.update_provider(provider_id, &mut |p| {
            let current = match p.current_location {
                Some(c) => c,
                None => {
                    failure = Some(EngineError::NoCurrentLocation { id: provider_id });
                    return;
                }
            };
            if p.location_locked {
                failure = Some(EngineError::LocationPublishLocked { id: provider_id });
                return;
            }
            p.published_location = Some(current);
            if let Some(l) = label {
                p.published_label = Some(l.to_string());
            }
            p.location_locked = true;
        })?;
        match failure {
            Some(err) => Err(err),
            None => Ok(updated),
        }
    }

    /// clear the publish lock; the published pin stays visible until the next publish
    pub fn unlock(&self, provider_id: ProviderId) -> Result<Provider> {
        self.store
            .update_provider(provider_id, &mut |p| p.location_locked = false)
    }

    pub fn state(&self, provider_id: ProviderId) -> Result<LocationState> {
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or(EngineError::ProviderNotFound { id: provider_id })?;
        Ok(location_state(&provider))
    }
}
