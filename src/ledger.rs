use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::errors::Result;
use crate::money::Money;
use crate::period::Period;
use crate::records::{AppointmentId, ProviderId};
use crate::store::Store;

/// one completed, chargeable appointment in a billing period
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub appointment_id: AppointmentId,
    pub starts_at: DateTime<Utc>,
    pub price: Money,
}

/// read-only view of a provider's completed appointments in a period,
/// ordered oldest first for deterministic promo consumption
pub fn ledger(
    store: &dyn Store,
    provider_id: ProviderId,
    period: Period,
    tz: Tz,
) -> Result<Vec<LedgerEntry>> {
    let (from, to) = period.bounds_utc(tz);
    let rows = store.completed_appointments(provider_id, from, to)?;
    Ok(rows
        .into_iter()
        .map(|a| LedgerEntry {
            appointment_id: a.id,
            starts_at: a.starts_at,
            price: a.price,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Appointment, AppointmentStatus};
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn tz() -> Tz {
        "America/Guyana".parse().unwrap()
    }

    fn completed(provider_id: ProviderId, starts_at: DateTime<Utc>, cents: i64) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            provider_id,
            client_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(1),
            price: Money::from_cents(cents),
            status: AppointmentStatus::Completed,
        }
    }

    #[test]
    fn test_ledger_restricted_to_period() {
        let store = MemoryStore::new();
        let provider_id = Uuid::new_v4();

        let inside = Utc.with_ymd_and_hms(2026, 7, 10, 14, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 6, 30, 14, 0, 0).unwrap();
        // 02:00 UTC Aug 1 is still July 31 in Guyana, so it belongs to July
        let local_edge = Utc.with_ymd_and_hms(2026, 8, 1, 2, 0, 0).unwrap();

        store.insert_appointment(completed(provider_id, inside, 1000)).unwrap();
        store.insert_appointment(completed(provider_id, before, 2000)).unwrap();
        store.insert_appointment(completed(provider_id, local_edge, 3000)).unwrap();

        let entries = ledger(&store, provider_id, Period::new(2026, 7), tz()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].price, Money::from_cents(1000));
        assert_eq!(entries[1].price, Money::from_cents(3000));
    }

    #[test]
    fn test_empty_ledger_is_valid() {
        let store = MemoryStore::new();
        let entries = ledger(&store, Uuid::new_v4(), Period::new(2026, 7), tz()).unwrap();
        assert!(entries.is_empty());
    }
}
