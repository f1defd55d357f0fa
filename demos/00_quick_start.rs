/// quick start - minimal example to get started
use marketplace_billing_rs::{
    BillingEngine, BookingEngine, Client, MemoryStore, Money, NullNotifier, Period, Provider,
    SafeTimeProvider, Service, Store, TimeSource,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tz: chrono_tz::Tz = "America/Guyana".parse()?;
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(NullNotifier);

    // register a barber, a client and a priced service
    let provider = Provider::new("+5926001234", "Sharp Cutz", "barber");
    let provider_id = provider.id;
    store.insert_provider(provider)?;

    let client = Client::new("+5927005678", "Keisha Grant");
    let client_id = client.id;
    store.insert_client(client)?;

    let service = Service::new(provider_id, "Fade + beard trim", Money::from_cents(2500), 45);
    let service_id = service.id;
    store.insert_service(service)?;

    // book and complete an appointment in July
    let booking = BookingEngine::new(store.clone(), notifier.clone(), tz);
    let appt = booking.request(
        client_id,
        provider_id,
        service_id,
        Utc.with_ymd_and_hms(2026, 7, 10, 14, 0, 0).unwrap(),
    )?;
    booking.confirm(appt.id)?;
    booking.complete(appt.id)?;

    // compute the July statement at 10% commission
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2026, 8, 1, 4, 5, 0).unwrap(),
    ));
    let billing = BillingEngine::new(store, notifier, tz);
    let statement = billing.compute(provider_id, Period::new(2026, 7), &time)?;

    println!("gross for {}: {}", statement.period.label(), statement.gross);
    println!("commission due: {}", statement.commission);

    Ok(())
}
