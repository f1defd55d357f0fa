/// billing cycle - a full month of commissions, dunning and settlement
/// under controlled time
use marketplace_billing_rs::{
    BookingEngine, Client, DunningJobs, MemoryNotifier, MemoryStore, Money, PaymentMethod,
    Provider, SafeTimeProvider, Service, Store, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== billing cycle example ===\n");

    let tz: chrono_tz::Tz = "America/Guyana".parse()?;
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());

    // July 1st, 00:00 Guyana time (UTC-4)
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2026, 7, 1, 4, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let provider = Provider::new("+5926001234", "Sharp Cutz", "barber");
    let provider_id = provider.id;
    store.insert_provider(provider)?;
    let client = Client::new("+5927005678", "Keisha Grant");
    let client_id = client.id;
    store.insert_client(client)?;
    let service = Service::new(provider_id, "Fade + beard trim", Money::from_cents(2500), 45);
    let service_id = service.id;
    store.insert_service(service)?;

    let jobs = DunningJobs::new(store.clone(), notifier.clone(), tz);
    let booking = BookingEngine::new(store.clone(), notifier.clone(), tz);

    // two promo credits: the first two completed jobs of the month are free
    jobs.billing().grant_promo_credits(provider_id, 2)?;
    println!("granted 2 promo credits\n");

    // four completed appointments across July
    for week in 0..4u32 {
        let starts = time.now() + Duration::days(7 * week as i64 + 2);
        let appt = booking.request(client_id, provider_id, service_id, starts)?;
        booking.confirm(appt.id)?;
        booking.complete(appt.id)?;
        println!("completed job on {}", starts.format("%Y-%m-%d"));
    }

    // mid-month running total (pure preview, consumes nothing)
    controller.advance(Duration::days(20));
    let total = jobs.billing().running_total(provider_id, &time)?;
    println!("\nrunning total on {}: gross {}, commission so far {}",
        time.now().format("%Y-%m-%d"), total.gross, total.commission);

    // August 1st, 00:05 local: the statement run fires
    controller.advance(Duration::days(11) + Duration::minutes(5));
    let report = jobs.generate_statements(&time)?;
    println!("\nstatement run: {} processed, {} succeeded", report.processed, report.succeeded);

    let statement = store
        .statement_for(provider_id, jobs.billing().clock().target_period(time.now()))?
        .ok_or("statement missing")?;
    println!("{}\n", serde_json::to_string_pretty(&statement)?);

    // August 5th, 08:00 local: first reminder goes out
    controller.advance(Duration::days(4) + Duration::hours(7) + Duration::minutes(55));
    jobs.send_reminders(&time)?;
    for msg in notifier.sent_to("+5926001234").iter().filter(|m| m.contains("REMINDER")) {
        println!("reminder sent: {msg}");
    }

    // the provider pays by mobile money before the 16th
    let paid = jobs.billing().mark_paid(
        statement.id,
        PaymentMethod::MobileMoney,
        "MMG-778812",
        &time,
    )?;
    println!("\npaid: {} via mobile money ({})", paid.commission, paid.payment_reference.unwrap_or_default());

    // August 16th, 00:00 local: the sweep finds nothing left to lock
    controller.advance(Duration::days(10) + Duration::hours(16));
    let sweep = jobs.lock_sweep(&time)?;
    println!("lock sweep: {} providers locked", sweep.succeeded);

    Ok(())
}
