use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::period::Period;

/// unique identifier for a provider
pub type ProviderId = Uuid;
/// unique identifier for a client
pub type ClientId = Uuid;
/// unique identifier for a service
pub type ServiceId = Uuid;
/// unique identifier for an appointment
pub type AppointmentId = Uuid;
/// unique identifier for a monthly statement
pub type StatementId = Uuid;

/// default platform commission percent for new providers
pub const DEFAULT_COMMISSION_PERCENT: u32 = 10;

/// geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// booked by a client, awaiting provider action
    Requested,
    /// accepted by the provider
    Confirmed,
    /// rejected by the provider
    Denied,
    /// withdrawn by client, provider, or admin
    Cancelled,
    /// service delivered, eligible for billing
    Completed,
}

impl AppointmentStatus {
    /// terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Cancelled | Self::Completed)
    }
}

/// how a provider settled a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankDeposit,
    MobileMoney,
}

/// a service provider on the marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    /// notification destination (phone number)
    pub contact: String,
    pub business_name: String,
    pub category: String,

    pub commission_percent: u32,
    /// free-appointment credits, consumed oldest-appointment-first at billing
    pub promo_balance: u32,

    pub is_locked: bool,
    pub lock_reason: Option<String>,

    // private position, never exposed through search
    pub current_location: Option<Coordinates>,
    pub address: Option<String>,

    // public position, only ever copied from current_location at publish time
    pub published_location: Option<Coordinates>,
    pub published_label: Option<String>,
    pub location_locked: bool,
}

impl Provider {
    pub fn new(contact: impl Into<String>, business_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact: contact.into(),
            business_name: business_name.into(),
            category: category.into(),
            commission_percent: DEFAULT_COMMISSION_PERCENT,
            promo_balance: 0,
            is_locked: false,
            lock_reason: None,
            current_location: None,
            address: None,
            published_location: None,
            published_label: None,
            location_locked: false,
        }
    }
}

/// a client who books appointments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub contact: String,
    pub full_name: String,
}

impl Client {
    pub fn new(contact: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact: contact.into(),
            full_name: full_name.into(),
        }
    }
}

/// a bookable service offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub provider_id: ProviderId,
    pub name: String,
    /// current list price; appointments capture it at booking time
    pub price: Money,
    pub duration_min: u32,
    pub active: bool,
}

impl Service {
    pub fn new(provider_id: ProviderId, name: impl Into<String>, price: Money, duration_min: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id,
            name: name.into(),
            price,
            duration_min,
            active: true,
        }
    }
}

/// a booked appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub provider_id: ProviderId,
    pub client_id: ClientId,
    pub service_id: ServiceId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// captured from the service's list price at booking, immutable thereafter
    pub price: Money,
    pub status: AppointmentStatus,
}

/// a provider's commission statement for one billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStatement {
    pub id: StatementId,
    pub provider_id: ProviderId,
    pub period: Period,

    /// billable gross after promo exemption
    pub gross: Money,
    /// commission percent snapshotted at computation time
    pub percent: u32,
    pub commission: Money,

    pub is_paid: bool,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,

    pub computed_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl MonthlyStatement {
    /// fresh unpaid statement, financial fields zeroed until computation fills them
    pub fn new(provider_id: ProviderId, period: Period, computed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id,
            period,
            gross: Money::ZERO,
            percent: DEFAULT_COMMISSION_PERCENT,
            commission: Money::ZERO,
            is_paid: false,
            payment_method: None,
            payment_reference: None,
            computed_at,
            paid_at: None,
        }
    }
}
