//! Wait-time heuristics.
//!
//! Two deliberately different estimates coexist. At admission the quote is
//! the sum of service durations over everyone already active. After each
//! completion every waiting ticket is rewritten to a flat per-slot figure
//! based on its rank. Both are rough; the queue is a barbershop, not an
//! airline.

use crate::catalog::ServiceCatalog;

use super::Ticket;

/// Admission-time estimate: total duration of every active ticket ahead,
/// unknown services counted at the catalog's fallback duration.
pub fn wait_ahead(catalog: &ServiceCatalog, active: &[Ticket]) -> u32 {
    active
        .iter()
        .map(|ticket| catalog.duration_of(&ticket.services))
        .sum()
}

/// Post-completion estimate for the waiting ticket at `rank` (1-based).
pub fn slot_estimate(slot_minutes: u32, rank: u32) -> u32 {
    slot_minutes * rank
}
