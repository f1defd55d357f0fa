use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::notify::{best_effort, Notifier};
use crate::records::{
    Appointment, AppointmentId, AppointmentStatus, ClientId, ProviderId, ServiceId,
};
use crate::store::Store;

/// appointment state machine:
/// Requested -> Confirmed | Denied | Cancelled,
/// Confirmed -> Cancelled | Completed,
/// Denied / Cancelled / Completed terminal
#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    tz: Tz,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self { store, notifier, tz }
    }

    /// book an appointment request. the service's current list price is
    /// captured onto the appointment and never changes afterwards.
    pub fn request(
        &self,
        client_id: ClientId,
        provider_id: ProviderId,
        service_id: ServiceId,
        starts_at: DateTime<Utc>,
    ) -> Result<Appointment> {
        let service = self
            .store
            .service(service_id)?
            .filter(|s| s.active && s.provider_id == provider_id)
            .ok_or(EngineError::InvalidService { id: service_id })?;
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or(EngineError::ProviderNotFound { id: provider_id })?;
        let client = self
            .store
            .client(client_id)?
            .ok_or(EngineError::ClientNotFound { id: client_id })?;

        let ends_at = starts_at + Duration::minutes(service.duration_min as i64);
        if ends_at <= starts_at {
            return Err(EngineError::InvalidTimeWindow {
                message: format!("appointment must end after it starts: {starts_at}"),
            });
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id,
            client_id: client.id,
            service_id,
            starts_at,
            ends_at,
            price: service.price,
            status: AppointmentStatus::Requested,
        };
        self.store.insert_appointment(appointment.clone())?;

        best_effort(
            self.notifier.as_ref(),
            &provider.contact,
            &format!(
                "New appointment request: {} on {} for {}.",
                service.name,
                self.local_label(starts_at),
                service.price,
            ),
        );

        Ok(appointment)
    }

    /// provider accepts a requested appointment
    pub fn confirm(&self, id: AppointmentId) -> Result<Appointment> {
        let appointment =
            self.transition(id, "confirm", &[AppointmentStatus::Requested], AppointmentStatus::Confirmed)?;
        if let Some(client) = self.store.client(appointment.client_id)? {
            best_effort(
                self.notifier.as_ref(),
                &client.contact,
                &format!(
                    "Your appointment is CONFIRMED for {}.",
                    self.local_label(appointment.starts_at)
                ),
            );
        }
        Ok(appointment)
    }

    /// provider rejects a requested appointment
    pub fn deny(&self, id: AppointmentId) -> Result<Appointment> {
        let appointment =
            self.transition(id, "deny", &[AppointmentStatus::Requested], AppointmentStatus::Denied)?;
        if let Some(client) = self.store.client(appointment.client_id)? {
            best_effort(
                self.notifier.as_ref(),
                &client.contact,
                "Sorry, your appointment was DENIED. You can rebook another slot.",
            );
        }
        Ok(appointment)
    }

    /// withdraw a pending or confirmed appointment; both parties are told
    pub fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let appointment = self.transition(
            id,
            "cancel",
            &[AppointmentStatus::Requested, AppointmentStatus::Confirmed],
            AppointmentStatus::Cancelled,
        )?;
        if let Some(client) = self.store.client(appointment.client_id)? {
            best_effort(
                self.notifier.as_ref(),
                &client.contact,
                "Your appointment was CANCELLED.",
            );
        }
        if let Some(provider) = self.store.provider(appointment.provider_id)? {
            best_effort(
                self.notifier.as_ref(),
                &provider.contact,
                "Appointment was CANCELLED by client or admin.",
            );
        }
        Ok(appointment)
    }

    /// external time-driven completion of a confirmed appointment; feeds the ledger
    pub fn complete(&self, id: AppointmentId) -> Result<Appointment> {
        self.transition(id, "complete", &[AppointmentStatus::Confirmed], AppointmentStatus::Completed)
    }

    fn transition(
        &self,
        id: AppointmentId,
        action: &'static str,
        allowed: &[AppointmentStatus],
        to: AppointmentStatus,
    ) -> Result<Appointment> {
        let mut rejected_from: Option<AppointmentStatus> = None;
        let appointment = self.store.update_appointment(id, &mut |a| {
            if allowed.contains(&a.status) {
                a.status = to;
            } else {
                rejected_from = Some(a.status);
            }
        })?;
        if let Some(from) = rejected_from {
            return Err(EngineError::InvalidTransition { from, action });
        }
        Ok(appointment)
    }

    fn local_label(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.tz)
            .format("%a, %d %b %Y %H:%M")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::notify::MemoryNotifier;
    use crate::records::{Client, Provider, Service};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn tz() -> Tz {
        "America/Guyana".parse().unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<MemoryNotifier>,
        engine: BookingEngine,
        provider_id: ProviderId,
        client_id: ClientId,
        service_id: ServiceId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());

        let provider = Provider::new("+5926000001", "Sharp Cutz", "barber");
        let provider_id = provider.id;
        store.insert_provider(provider).unwrap();

        let client = Client::new("+5927000001", "Keisha Grant");
        let client_id = client.id;
        store.insert_client(client).unwrap();

        let service = Service::new(provider_id, "Fade + beard trim", Money::from_cents(1500), 45);
        let service_id = service.id;
        store.insert_service(service).unwrap();

        let engine = BookingEngine::new(store.clone(), notifier.clone(), tz());
        Fixture {
            store,
            notifier,
            engine,
            provider_id,
            client_id,
            service_id,
        }
    }

    fn starts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_request_captures_current_price() {
        let f = fixture();
        let appt = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();

        assert_eq!(appt.status, AppointmentStatus::Requested);
        assert_eq!(appt.price, Money::from_cents(1500));
        assert_eq!(appt.ends_at - appt.starts_at, Duration::minutes(45));
        assert_eq!(f.notifier.sent_to("+5926000001").len(), 1);
    }

    #[test]
    fn test_price_protected_against_later_service_change() {
        let f = fixture();
        let appt = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();

        // the provider raises the list price afterwards
        let mut service = f.store.service(f.service_id).unwrap().unwrap();
        service.price = Money::from_cents(2000);
        f.store.insert_service(service).unwrap();

        let confirmed = f.engine.confirm(appt.id).unwrap();
        assert_eq!(confirmed.price, Money::from_cents(1500));
        let done = f.engine.complete(appt.id).unwrap();
        assert_eq!(done.price, Money::from_cents(1500));
    }

    #[test]
    fn test_unknown_or_inactive_service_is_rejected() {
        let f = fixture();
        let err = f
            .engine
            .request(f.client_id, f.provider_id, Uuid::new_v4(), starts())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidService { .. }));

        let mut service = f.store.service(f.service_id).unwrap().unwrap();
        service.active = false;
        f.store.insert_service(service).unwrap();
        let err = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidService { .. }));
    }

    #[test]
    fn test_happy_path_transitions_notify_counterparty() {
        let f = fixture();
        let appt = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();

        let confirmed = f.engine.confirm(appt.id).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        let client_msgs = f.notifier.sent_to("+5927000001");
        assert_eq!(client_msgs.len(), 1);
        assert!(client_msgs[0].contains("CONFIRMED"));

        let done = f.engine.complete(appt.id).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_cancel_allowed_from_requested_and_confirmed() {
        let f = fixture();
        let pending = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();
        assert_eq!(
            f.engine.cancel(pending.id).unwrap().status,
            AppointmentStatus::Cancelled
        );

        let second = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();
        f.engine.confirm(second.id).unwrap();
        assert_eq!(
            f.engine.cancel(second.id).unwrap().status,
            AppointmentStatus::Cancelled
        );
        // both parties were told, twice
        assert_eq!(
            f.notifier
                .sent_to("+5927000001")
                .iter()
                .filter(|m| m.contains("CANCELLED"))
                .count(),
            2
        );
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let f = fixture();
        let appt = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();
        f.engine.deny(appt.id).unwrap();

        for result in [
            f.engine.confirm(appt.id),
            f.engine.cancel(appt.id),
            f.engine.complete(appt.id),
        ] {
            assert!(matches!(
                result.unwrap_err(),
                EngineError::InvalidTransition {
                    from: AppointmentStatus::Denied,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_complete_requires_confirmation() {
        let f = fixture();
        let appt = f
            .engine
            .request(f.client_id, f.provider_id, f.service_id, starts())
            .unwrap();
        let err = f.engine.complete(appt.id).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: AppointmentStatus::Requested,
                action: "complete",
            }
        ));
    }
}
