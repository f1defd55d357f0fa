pub mod appointment;
pub mod dunning;
pub mod errors;
pub mod ledger;
pub mod location;
pub mod money;
pub mod notify;
pub mod period;
pub mod promo;
pub mod records;
pub mod scheduler;
pub mod search;
pub mod statement;
pub mod store;

// re-export key types
pub use money::Money;
pub use errors::{EngineError, Result};
pub use period::{DueWindow, Period, PeriodClock};
pub use records::{
    Appointment, AppointmentStatus, Client, Coordinates, MonthlyStatement, PaymentMethod,
    Provider, Service, DEFAULT_COMMISSION_PERCENT,
};
pub use store::{MemoryStore, Store};
pub use notify::{MemoryNotifier, Notifier, NullNotifier};
pub use ledger::{ledger, LedgerEntry};
pub use promo::{apply as apply_promo, PromoOutcome};
pub use statement::{BillingEngine, RunningTotal};
pub use dunning::{BatchReport, DunningJobs, UNPAID_LOCK_REASON};
pub use scheduler::{standing_jobs, MonthlySchedule, Scheduler};
pub use appointment::BookingEngine;
pub use location::{location_state, LocationEngine, LocationState};
pub use search::{haversine_km, search, NearFilter, SearchHit, SearchQuery};

// re-export external dependencies that users will need
pub use chrono;
pub use chrono_tz;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
