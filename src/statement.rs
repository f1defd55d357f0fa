use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::errors::{EngineError, Result};
use crate::ledger;
use crate::money::Money;
use crate::notify::{best_effort, Notifier};
use crate::period::{Period, PeriodClock};
use crate::promo;
use crate::records::{MonthlyStatement, PaymentMethod, Provider, ProviderId, StatementId};
use crate::store::Store;

/// unofficial month-to-date preview over the current open period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningTotal {
    pub gross: Money,
    pub commission: Money,
    pub percent: u32,
}

/// statement computation and lifecycle: turns a period's completed
/// appointments into a commission statement and tracks payment state
#[derive(Clone)]
pub struct BillingEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: PeriodClock,
}

impl BillingEngine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self {
            store,
            notifier,
            clock: PeriodClock::new(tz),
        }
    }

    pub fn clock(&self) -> &PeriodClock {
        &self.clock
    }

    /// compute and persist the statement for one provider and period.
    ///
    /// upsert is keyed by (provider, period): a new statement is created
    /// unpaid, an unpaid one has its financial fields overwritten, and a
    /// paid one is left untouched entirely. promo credits are decremented
    /// and the notice sent only when financial fields actually changed.
    pub fn compute(
        &self,
        provider_id: ProviderId,
        period: Period,
        time: &SafeTimeProvider,
    ) -> Result<MonthlyStatement> {
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or(EngineError::ProviderNotFound { id: provider_id })?;

        let entries = ledger::ledger(self.store.as_ref(), provider_id, period, self.clock.tz)?;
        let outcome = promo::apply(&entries, provider.promo_balance);
        let percent = provider.commission_percent;
        let commission = outcome.billable_gross.commission_at(percent);
        let now = time.now();

        let mut settled = false;
        let statement = self.store.upsert_statement(provider_id, period, now, &mut |st| {
            if st.is_paid {
                settled = true;
                return;
            }
            st.gross = outcome.billable_gross;
            st.percent = percent;
            st.commission = commission;
            st.computed_at = now;
        })?;

        if settled {
            tracing::debug!(provider = %provider_id, ?period, "statement already paid, recomputation skipped");
            return Ok(statement);
        }

        if outcome.credits_consumed > 0 {
            self.store
                .adjust_promo_balance(provider_id, -(outcome.credits_consumed as i64))?;
        }

        let due = self.clock.due_date(period);
        best_effort(
            self.notifier.as_ref(),
            &provider.contact,
            &format!(
                "Your service charge for {} is {}. Due by {}. Method: cash/bank/mobile money.",
                period.label(),
                statement.commission,
                due.format("%d %b %Y"),
            ),
        );

        Ok(statement)
    }

    /// record a manual payment confirmation, exactly once.
    ///
    /// paying a statement does not clear a provider lock; unlocking is a
    /// separate administrative action.
    pub fn mark_paid(
        &self,
        statement_id: StatementId,
        method: PaymentMethod,
        reference: &str,
        time: &SafeTimeProvider,
    ) -> Result<MonthlyStatement> {
        let now = time.now();
        let mut already_paid = false;
        let statement = self.store.update_statement(statement_id, &mut |st| {
            if st.is_paid {
                already_paid = true;
                return;
            }
            st.is_paid = true;
            st.payment_method = Some(method);
            st.payment_reference = Some(reference.to_string());
            st.paid_at = Some(now);
        })?;

        if already_paid {
            return Err(EngineError::AlreadyPaid { id: statement_id });
        }
        Ok(statement)
    }

    /// read-only month-to-date figure for the current open period: same
    /// gross/commission formula, no promo consumption, nothing persisted
    pub fn running_total(&self, provider_id: ProviderId, time: &SafeTimeProvider) -> Result<RunningTotal> {
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or(EngineError::ProviderNotFound { id: provider_id })?;

        let now = time.now();
        let (start, _) = self.clock.current_period(now).bounds_utc(self.clock.tz);
        let rows = self.store.completed_appointments(provider_id, start, now)?;
        let gross: Money = rows.iter().map(|a| a.price).sum();

        Ok(RunningTotal {
            gross,
            commission: gross.commission_at(provider.commission_percent),
            percent: provider.commission_percent,
        })
    }

    /// provider settings: change the commission percent applied to future computations
    pub fn set_commission_percent(&self, provider_id: ProviderId, percent: u32) -> Result<Provider> {
        if percent > 100 {
            return Err(EngineError::InvalidPercent { percent });
        }
        self.store
            .update_provider(provider_id, &mut |p| p.commission_percent = percent)
    }

    /// admin re-credit of promo balance, always a relative adjustment
    pub fn grant_promo_credits(&self, provider_id: ProviderId, count: u32) -> Result<u32> {
        self.store.adjust_promo_balance(provider_id, count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::records::{Appointment, AppointmentStatus};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn tz() -> Tz {
        "America/Guyana".parse().unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<MemoryNotifier>,
        engine: BillingEngine,
        provider_id: ProviderId,
    }

    fn fixture(percent: u32, promo_balance: u32) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let mut provider = Provider::new("+5926000001", "Sharp Cutz", "barber");
        provider.commission_percent = percent;
        provider.promo_balance = promo_balance;
        let provider_id = provider.id;
        store.insert_provider(provider).unwrap();

        let engine = BillingEngine::new(store.clone(), notifier.clone(), tz());
        Fixture {
            store,
            notifier,
            engine,
            provider_id,
        }
    }

    fn completed(f: &Fixture, day: u32, cents: i64) {
        let starts_at = Utc.with_ymd_and_hms(2026, 7, day, 14, 0, 0).unwrap();
        f.store
            .insert_appointment(Appointment {
                id: Uuid::new_v4(),
                provider_id: f.provider_id,
                client_id: Uuid::new_v4(),
                service_id: Uuid::new_v4(),
                starts_at,
                ends_at: starts_at + chrono::Duration::hours(1),
                price: Money::from_cents(cents),
                status: AppointmentStatus::Completed,
            })
            .unwrap();
    }

    fn august_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2026, 8, 1, 4, 5, 0).unwrap(),
        ))
    }

    #[test]
    fn test_statement_with_promo_exemption() {
        // provider at 10% with one promo credit and appointments
        // priced 1000/2000/3000 cents in chronological order
        let f = fixture(10, 1);
        completed(&f, 3, 1000);
        completed(&f, 10, 2000);
        completed(&f, 20, 3000);

        let time = august_time();
        let st = f.engine.compute(f.provider_id, Period::new(2026, 7), &time).unwrap();

        assert_eq!(st.gross, Money::from_cents(5000));
        assert_eq!(st.percent, 10);
        assert_eq!(st.commission, Money::from_cents(500));
        assert!(!st.is_paid);
        assert_eq!(
            f.store.provider(f.provider_id).unwrap().unwrap().promo_balance,
            0
        );

        let notices = f.notifier.sent_to("+5926000001");
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("July 2026"));
        assert!(notices[0].contains("5.00"));
        assert!(notices[0].contains("15 Aug 2026"));
    }

    #[test]
    fn test_recompute_unpaid_overwrites_financials() {
        let f = fixture(10, 0);
        completed(&f, 3, 1000);

        let time = august_time();
        let period = Period::new(2026, 7);
        let first = f.engine.compute(f.provider_id, period, &time).unwrap();
        assert_eq!(first.gross, Money::from_cents(1000));

        // a late correction lands, recomputation picks it up
        completed(&f, 25, 4000);
        let second = f.engine.compute(f.provider_id, period, &time).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.gross, Money::from_cents(5000));
        assert_eq!(second.commission, Money::from_cents(500));
    }

    #[test]
    fn test_recompute_after_paid_is_noop() {
        let f = fixture(10, 2);
        completed(&f, 3, 1000);

        let time = august_time();
        let period = Period::new(2026, 7);
        let st = f.engine.compute(f.provider_id, period, &time).unwrap();
        f.engine
            .mark_paid(st.id, PaymentMethod::Cash, "receipt-17", &time)
            .unwrap();

        let balance_before = f.store.provider(f.provider_id).unwrap().unwrap().promo_balance;
        let notices_before = f.notifier.sent().len();

        completed(&f, 25, 9000);
        let after = f.engine.compute(f.provider_id, period, &time).unwrap();

        // financial fields, payment state, promo balance and notices all untouched
        assert_eq!(after.gross, st.gross);
        assert_eq!(after.commission, st.commission);
        assert!(after.is_paid);
        assert_eq!(after.paid_at, st.paid_at);
        assert_eq!(
            f.store.provider(f.provider_id).unwrap().unwrap().promo_balance,
            balance_before
        );
        assert_eq!(f.notifier.sent().len(), notices_before);
    }

    #[test]
    fn test_percent_snapshot_is_independent_of_later_changes() {
        let f = fixture(10, 0);
        completed(&f, 3, 10000);

        let time = august_time();
        let st = f.engine.compute(f.provider_id, Period::new(2026, 7), &time).unwrap();
        assert_eq!(st.commission, Money::from_cents(1000));

        f.engine.set_commission_percent(f.provider_id, 20).unwrap();
        let reread = f.store.statement(st.id).unwrap().unwrap();
        assert_eq!(reread.percent, 10);
    }

    #[test]
    fn test_mark_paid_is_exactly_once() {
        let f = fixture(10, 0);
        completed(&f, 3, 1000);

        let time = august_time();
        let st = f.engine.compute(f.provider_id, Period::new(2026, 7), &time).unwrap();

        let paid = f
            .engine
            .mark_paid(st.id, PaymentMethod::BankDeposit, "slip-204", &time)
            .unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::BankDeposit));
        assert_eq!(paid.payment_reference.as_deref(), Some("slip-204"));
        assert!(paid.paid_at.is_some());

        let err = f
            .engine
            .mark_paid(st.id, PaymentMethod::Cash, "slip-205", &time)
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyPaid { .. }));

        // original payment metadata survives the rejected second attempt
        let reread = f.store.statement(st.id).unwrap().unwrap();
        assert_eq!(reread.payment_reference.as_deref(), Some("slip-204"));
    }

    #[test]
    fn test_running_total_is_a_pure_preview() {
        let f = fixture(10, 5);
        // current period is August under this clock
        let starts_at = Utc.with_ymd_and_hms(2026, 8, 5, 14, 0, 0).unwrap();
        f.store
            .insert_appointment(Appointment {
                id: Uuid::new_v4(),
                provider_id: f.provider_id,
                client_id: Uuid::new_v4(),
                service_id: Uuid::new_v4(),
                starts_at,
                ends_at: starts_at + chrono::Duration::hours(1),
                price: Money::from_cents(2500),
                status: AppointmentStatus::Completed,
            })
            .unwrap();

        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap(),
        ));
        let total = f.engine.running_total(f.provider_id, &time).unwrap();

        assert_eq!(total.gross, Money::from_cents(2500));
        assert_eq!(total.commission, Money::from_cents(250));
        assert_eq!(total.percent, 10);

        // no statement persisted, no promo consumed
        assert!(f
            .store
            .statement_for(f.provider_id, Period::new(2026, 8))
            .unwrap()
            .is_none());
        assert_eq!(
            f.store.provider(f.provider_id).unwrap().unwrap().promo_balance,
            5
        );
    }

    #[test]
    fn test_percent_validation() {
        let f = fixture(10, 0);
        let err = f.engine.set_commission_percent(f.provider_id, 101).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPercent { percent: 101 }));
    }

    #[test]
    fn test_unknown_provider() {
        let f = fixture(10, 0);
        let time = august_time();
        let err = f
            .engine
            .compute(Uuid::new_v4(), Period::new(2026, 7), &time)
            .unwrap_err();
        assert!(matches!(err, EngineError::ProviderNotFound { .. }));
    }
}
