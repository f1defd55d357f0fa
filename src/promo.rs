use crate::ledger::LedgerEntry;
use crate::money::Money;
use crate::records::AppointmentId;

/// result of applying promo credits to a period's ledger
#[derive(Debug, Clone, PartialEq)]
pub struct PromoOutcome {
    /// gross of the non-exempt appointments
    pub billable_gross: Money,
    /// number of credits to subtract from the provider's balance, exactly once
    pub credits_consumed: u32,
    pub exempted: Vec<AppointmentId>,
}

/// exempt the earliest min(balance, len) appointments from billing;
/// the remainder sums into billable gross
pub fn apply(entries: &[LedgerEntry], promo_balance: u32) -> PromoOutcome {
    let exempt_count = (promo_balance as usize).min(entries.len());
    let exempted = entries[..exempt_count]
        .iter()
        .map(|e| e.appointment_id)
        .collect();
    let billable_gross = entries[exempt_count..].iter().map(|e| e.price).sum();

    PromoOutcome {
        billable_gross,
        credits_consumed: exempt_count as u32,
        exempted,
    }
}
