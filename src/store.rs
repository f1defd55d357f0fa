use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{EngineError, Result};
use crate::period::Period;
use crate::records::{
    Appointment, AppointmentId, AppointmentStatus, Client, ClientId, MonthlyStatement, Provider,
    ProviderId, Service, ServiceId, StatementId,
};

/// persistence collaborator: a transactional record store with point lookups,
/// predicate queries, and closure-based atomic updates keyed by id
pub trait Store: Send + Sync {
    fn insert_provider(&self, provider: Provider) -> Result<()>;
    fn provider(&self, id: ProviderId) -> Result<Option<Provider>>;
    /// all providers in insertion order
    fn providers(&self) -> Result<Vec<Provider>>;
    /// atomic read-modify-write on one provider record
    fn update_provider(&self, id: ProviderId, apply: &mut dyn FnMut(&mut Provider)) -> Result<Provider>;
    /// relative promo-balance adjustment, floored at zero; never an absolute set
    fn adjust_promo_balance(&self, id: ProviderId, delta: i64) -> Result<u32>;

    fn insert_client(&self, client: Client) -> Result<()>;
    fn client(&self, id: ClientId) -> Result<Option<Client>>;

    fn insert_service(&self, service: Service) -> Result<()>;
    fn service(&self, id: ServiceId) -> Result<Option<Service>>;

    fn insert_appointment(&self, appointment: Appointment) -> Result<()>;
    fn appointment(&self, id: AppointmentId) -> Result<Option<Appointment>>;
    fn update_appointment(
        &self,
        id: AppointmentId,
        apply: &mut dyn FnMut(&mut Appointment),
    ) -> Result<Appointment>;
    /// completed appointments for a provider with start in [from, to), oldest first
    fn completed_appointments(
        &self,
        provider_id: ProviderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>>;

    fn statement(&self, id: StatementId) -> Result<Option<MonthlyStatement>>;
    fn statement_for(&self, provider_id: ProviderId, period: Period) -> Result<Option<MonthlyStatement>>;
    /// atomic upsert keyed by (provider, period); creates a fresh unpaid
    /// statement when none exists, then applies the mutation under the lock
    fn upsert_statement(
        &self,
        provider_id: ProviderId,
        period: Period,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut MonthlyStatement),
    ) -> Result<MonthlyStatement>;
    fn update_statement(
        &self,
        id: StatementId,
        apply: &mut dyn FnMut(&mut MonthlyStatement),
    ) -> Result<MonthlyStatement>;
    fn unpaid_statements(&self, period: Period) -> Result<Vec<MonthlyStatement>>;
}

#[derive(Debug, Default)]
struct Tables {
    providers: Vec<Provider>,
    clients: Vec<Client>,
    services: Vec<Service>,
    appointments: Vec<Appointment>,
    statements: Vec<MonthlyStatement>,
}

/// in-memory store backing tests and demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|e| EngineError::StoreUnavailable {
            message: e.to_string(),
        })
    }
}

fn upsert_by_id<T, F>(rows: &mut Vec<T>, row: T, same: F)
where
    F: Fn(&T) -> bool,
{
    match rows.iter_mut().find(|r| same(r)) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

impl Store for MemoryStore {
    fn insert_provider(&self, provider: Provider) -> Result<()> {
        let mut t = self.guard()?;
        let id = provider.id;
        upsert_by_id(&mut t.providers, provider, |p| p.id == id);
        Ok(())
    }

    fn provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        Ok(self.guard()?.providers.iter().find(|p| p.id == id).cloned())
    }

    fn providers(&self) -> Result<Vec<Provider>> {
        Ok(self.guard()?.providers.clone())
    }

    fn update_provider(&self, id: ProviderId, apply: &mut dyn FnMut(&mut Provider)) -> Result<Provider> {
        let mut t = self.guard()?;
        let provider = t
            .providers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EngineError::ProviderNotFound { id })?;
        apply(provider);
        Ok(provider.clone())
    }

    fn adjust_promo_balance(&self, id: ProviderId, delta: i64) -> Result<u32> {
        let updated = self.update_provider(id, &mut |p| {
            p.promo_balance = (p.promo_balance as i64 + delta).max(0) as u32;
        })?;
        Ok(updated.promo_balance)
    }

    fn insert_client(&self, client: Client) -> Result<()> {
        let mut t = self.guard()?;
        let id = client.id;
        upsert_by_id(&mut t.clients, client, |c| c.id == id);
        Ok(())
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.guard()?.clients.iter().find(|c| c.id == id).cloned())
    }

    fn insert_service(&self, service: Service) -> Result<()> {
        let mut t = self.guard()?;
        let id = service.id;
        upsert_by_id(&mut t.services, service, |s| s.id == id);
        Ok(())
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self.guard()?.services.iter().find(|s| s.id == id).cloned())
    }

    fn insert_appointment(&self, appointment: Appointment) -> Result<()> {
        let mut t = self.guard()?;
        let id = appointment.id;
        upsert_by_id(&mut t.appointments, appointment, |a| a.id == id);
        Ok(())
    }

    fn appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.guard()?.appointments.iter().find(|a| a.id == id).cloned())
    }

    fn update_appointment(
        &self,
        id: AppointmentId,
        apply: &mut dyn FnMut(&mut Appointment),
    ) -> Result<Appointment> {
        let mut t = self.guard()?;
        let appointment = t
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(EngineError::AppointmentNotFound { id })?;
        apply(appointment);
        Ok(appointment.clone())
    }

    fn completed_appointments(
        &self,
        provider_id: ProviderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let t = self.guard()?;
        let mut rows: Vec<Appointment> = t
            .appointments
            .iter()
            .filter(|a| {
                a.provider_id == provider_id
                    && a.status == AppointmentStatus::Completed
                    && a.starts_at >= from
                    && a.starts_at < to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.starts_at);
        Ok(rows)
    }

    fn statement(&self, id: StatementId) -> Result<Option<MonthlyStatement>> {
        Ok(self.guard()?.statements.iter().find(|s| s.id == id).cloned())
    }

    fn statement_for(&self, provider_id: ProviderId, period: Period) -> Result<Option<MonthlyStatement>> {
        Ok(self
            .guard()?
            .statements
            .iter()
            .find(|s| s.provider_id == provider_id && s.period == period)
            .cloned())
    }

    fn upsert_statement(
        &self,
        provider_id: ProviderId,
        period: Period,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut MonthlyStatement),
    ) -> Result<MonthlyStatement> {
        let mut t = self.guard()?;
        if let Some(existing) = t
            .statements
            .iter_mut()
            .find(|s| s.provider_id == provider_id && s.period == period)
        {
            apply(existing);
            return Ok(existing.clone());
        }
        let mut fresh = MonthlyStatement::new(provider_id, period, now);
        apply(&mut fresh);
        t.statements.push(fresh.clone());
        Ok(fresh)
    }

    fn update_statement(
        &self,
        id: StatementId,
        apply: &mut dyn FnMut(&mut MonthlyStatement),
    ) -> Result<MonthlyStatement> {
        let mut t = self.guard()?;
        let statement = t
            .statements
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(EngineError::StatementNotFound { id })?;
        apply(statement);
        Ok(statement.clone())
    }

    fn unpaid_statements(&self, period: Period) -> Result<Vec<MonthlyStatement>> {
        Ok(self
            .guard()?
            .statements
            .iter()
            .filter(|s| s.period == period && !s.is_paid)
            .cloned()
            .collect())
    }
}
