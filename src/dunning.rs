use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::errors::Result;
use crate::notify::{best_effort, Notifier};
use crate::records::{MonthlyStatement, Provider, ProviderId};
use crate::statement::BillingEngine;
use crate::store::Store;

/// lock reason set by the automatic sweep
pub const UNPAID_LOCK_REASON: &str = "Unpaid service charge";

/// outcome of one batch run with per-item isolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    fn ok(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    fn fail(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

/// the recurring billing jobs: statement generation after period close,
/// payment reminders through the due window, and the post-deadline lock
/// sweep. each run isolates per-provider failures and reports an aggregate.
#[derive(Clone)]
pub struct DunningJobs {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    billing: BillingEngine,
}

impl DunningJobs {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        let billing = BillingEngine::new(store.clone(), notifier.clone(), tz);
        Self {
            store,
            notifier,
            billing,
        }
    }

    pub fn billing(&self) -> &BillingEngine {
        &self.billing
    }

    /// compute the just-closed period's statement for every provider.
    /// safe to re-run: computation is idempotent and paid statements are
    /// never touched, so a missed or repeated tick cannot double-charge.
    pub fn generate_statements(&self, time: &SafeTimeProvider) -> Result<BatchReport> {
        let period = self.billing.clock().target_period(time.now());
        let mut report = BatchReport::default();

        for provider in self.store.providers()? {
            match self.billing.compute(provider.id, period, time) {
                Ok(_) => report.ok(),
                Err(e) => {
                    tracing::warn!(provider = %provider.id, error = %e, "statement computation failed, skipping");
                    report.fail();
                }
            }
        }

        tracing::info!(?period, ?report, "statement generation finished");
        Ok(report)
    }

    /// remind every provider with an unpaid statement for the just-closed
    /// period. resending on each configured day is acceptable by design of
    /// the due window; there is no further de-duplication.
    pub fn send_reminders(&self, time: &SafeTimeProvider) -> Result<BatchReport> {
        let period = self.billing.clock().target_period(time.now());
        let due = self.billing.clock().due_date(period);
        let mut report = BatchReport::default();

        for statement in self.store.unpaid_statements(period)? {
            match self.provider_of(&statement) {
                Ok(provider) => {
                    best_effort(
                        self.notifier.as_ref(),
                        &provider.contact,
                        &format!(
                            "REMINDER: Service charge {} for {} due by {}.",
                            statement.commission,
                            period.label(),
                            due.format("%d %b %Y"),
                        ),
                    );
                    report.ok();
                }
                Err(e) => {
                    tracing::warn!(statement = %statement.id, error = %e, "reminder skipped");
                    report.fail();
                }
            }
        }

        tracing::info!(?period, ?report, "reminder run finished");
        Ok(report)
    }

    /// suspend every provider still unpaid for the just-closed period.
    /// providers with no statement or a paid one are untouched. marking the
    /// statement paid later does NOT clear the lock; see `unlock_provider`.
    pub fn lock_sweep(&self, time: &SafeTimeProvider) -> Result<BatchReport> {
        let period = self.billing.clock().target_period(time.now());
        let mut report = BatchReport::default();

        for statement in self.store.unpaid_statements(period)? {
            let locked = self.store.update_provider(statement.provider_id, &mut |p| {
                p.is_locked = true;
                p.lock_reason = Some(UNPAID_LOCK_REASON.to_string());
            });
            match locked {
                Ok(_) => {
                    tracing::info!(provider = %statement.provider_id, ?period, "provider locked for unpaid statement");
                    report.ok();
                }
                Err(e) => {
                    tracing::warn!(provider = %statement.provider_id, error = %e, "lock sweep skipped provider");
                    report.fail();
                }
            }
        }

        tracing::info!(?period, ?report, "lock sweep finished");
        Ok(report)
    }

    /// administrative suspension
    pub fn lock_provider(&self, provider_id: ProviderId, reason: &str) -> Result<Provider> {
        self.store.update_provider(provider_id, &mut |p| {
            p.is_locked = true;
            p.lock_reason = Some(reason.to_string());
        })
    }

    /// administrative unlock; the only way a locked provider becomes
    /// searchable again
    pub fn unlock_provider(&self, provider_id: ProviderId) -> Result<Provider> {
        self.store.update_provider(provider_id, &mut |p| {
            p.is_locked = false;
            p.lock_reason = None;
        })
    }

    fn provider_of(&self, statement: &MonthlyStatement) -> Result<Provider> {
        self.store
            .provider(statement.provider_id)?
            .ok_or(crate::errors::EngineError::ProviderNotFound {
                id: statement.provider_id,
            })
    }
}
