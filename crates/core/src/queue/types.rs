//! Core queue data types.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Current status of a ticket.
///
/// State machine flow:
/// ```text
/// waiting -> serving -> completed
///    |          |
///    |          +-----> completed (walk-up served without being marked first)
///    +-----> cancelled
///
/// completed and cancelled are terminal.
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    Serving,
    Completed,
    Cancelled,
}

impl TicketStatus {
    /// Returns the status as a string (for storage and filtering).
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::Serving => "serving",
            TicketStatus::Completed => "completed",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(TicketStatus::Waiting),
            "serving" => Some(TicketStatus::Serving),
            "completed" => Some(TicketStatus::Completed),
            "cancelled" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }

    /// Active tickets occupy a spot in the queue.
    pub fn is_active(&self) -> bool {
        matches!(self, TicketStatus::Waiting | TicketStatus::Serving)
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queue ticket for one walk-in customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier (UUID).
    pub id: String,

    pub customer_name: String,

    pub phone_number: String,

    /// Requested services, referencing the catalog by name.
    pub services: Vec<String>,

    /// Total price quoted at admission, surcharge included.
    pub price: u32,

    /// Local calendar day the ticket belongs to (`YYYY-MM-DD`).
    pub day: String,

    /// Daily ticket number, starts at 1 each day. Unique per day.
    pub queue_number: u32,

    pub status: TicketStatus,

    /// Priority customers pay a surcharge and sort first on the staff
    /// dashboard. Their customer-facing position is unaffected.
    pub is_priority: bool,

    pub estimated_wait_minutes: u32,

    pub joined_at: DateTime<Utc>,

    /// Set when service starts; overwritten when it finishes.
    pub served_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

/// The shop's open/closed gate. A single record, open by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopStatus {
    pub is_open: bool,
    pub last_updated_by: String,
    pub updated_at: DateTime<Utc>,
}

/// What a customer gets back from a successful join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinReceipt {
    pub queue_number: u32,
    /// 1-based position among active tickets.
    pub position: u32,
    pub estimated_wait_minutes: u32,
    pub price: u32,
}

/// Position lookup result for an active ticket. The name is the
/// caller's own, unmasked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionView {
    pub queue_number: u32,
    pub customer_name: String,
    pub position: u32,
    pub status: TicketStatus,
    pub estimated_wait_minutes: u32,
}

/// One entry in the public stats board. Names are masked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicTicket {
    pub queue_number: u32,
    pub customer_name: String,
    pub services: String,
    pub status: TicketStatus,
    pub joined_at: DateTime<Utc>,
}

/// Public queue statistics, safe to show in the shop window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueStats {
    pub active_count: u32,
    pub waiting_count: u32,
    /// Average estimated wait among waiting tickets, rounded to minutes.
    pub average_wait_minutes: u32,
    pub served_today: u32,
    pub is_open: bool,
    pub active: Vec<PublicTicket>,
}

/// One row of the staff dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardEntry {
    /// 1-based index after priority-first ordering.
    pub position: u32,
    #[serde(flatten)]
    pub ticket: Ticket,
}

/// Staff view over one day's tickets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    pub day: String,
    pub tickets: Vec<DashboardEntry>,
    /// Sum of prices over completed tickets in this view.
    pub total_earnings: u64,
    pub served_count: u32,
}

/// The local calendar day used for queue scoping, as `YYYY-MM-DD`.
pub fn local_day() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Mask a customer name for public display: the first word is kept, every
/// following word is reduced to its initial. `"John Doe"` becomes
/// `"John D."`.
pub fn mask_name(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };
    let mut masked = first.to_string();
    for word in words {
        if let Some(initial) = word.chars().next() {
            masked.push(' ');
            masked.push(initial);
            masked.push('.');
        }
    }
    masked
}
