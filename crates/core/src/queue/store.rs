//! Queue storage traits and error type.

use thiserror::Error;

use super::{ShopStatus, Ticket, TicketStatus};

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Request failed validation before touching the store.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The shop gate is closed; no new tickets are admitted.
    #[error("The shop is currently closed")]
    ShopClosed,

    /// The phone number already has an active ticket.
    #[error("Already in queue as number {queue_number} (position {position})")]
    AlreadyQueued { queue_number: u32, position: u32 },

    /// No active ticket exists for the given phone number.
    #[error("No active ticket for this phone number")]
    NotInQueue,

    /// No ticket with this number is eligible for the requested transition.
    #[error("Ticket {0} not found")]
    TicketNotFound(u32),

    /// Storage infrastructure failure.
    #[error("Store error: {0}")]
    Store(String),
}

/// Request to admit a new ticket. The store assigns id, day and queue
/// number; everything else is computed by the caller beforehand.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub customer_name: String,
    pub phone_number: String,
    pub services: Vec<String>,
    pub price: u32,
    pub is_priority: bool,
    pub estimated_wait_minutes: u32,
}

/// Trait for ticket storage backends.
///
/// Transition methods return `Ok(None)` when no row matched the expected
/// current status. That conditional write is the only concurrency
/// primitive the engine relies on.
pub trait QueueStore: Send + Sync {
    /// Insert a ticket for the given day, claiming the next queue number
    /// atomically. Numbers are gapless and never reused within a day.
    fn insert_ticket(&self, day: &str, request: NewTicket) -> Result<Ticket, QueueError>;

    /// Find the active (waiting or serving) ticket for a phone number,
    /// regardless of day. At most one exists.
    fn find_active_by_phone(&self, phone: &str) -> Result<Option<Ticket>, QueueError>;

    /// Find a ticket by day and queue number.
    fn find_by_number(&self, day: &str, queue_number: u32) -> Result<Option<Ticket>, QueueError>;

    /// All active tickets for a day, ascending by queue number.
    fn active_tickets(&self, day: &str) -> Result<Vec<Ticket>, QueueError>;

    /// All waiting tickets for a day, ascending by queue number.
    fn waiting_tickets(&self, day: &str) -> Result<Vec<Ticket>, QueueError>;

    /// Number of active tickets for the day with a lower queue number.
    fn count_active_before(&self, day: &str, queue_number: u32) -> Result<u32, QueueError>;

    /// Conditionally transition a ticket identified by day and number.
    /// `stamp_served` also sets `served_at` to now.
    fn transition_by_number(
        &self,
        day: &str,
        queue_number: u32,
        from: TicketStatus,
        to: TicketStatus,
        stamp_served: bool,
    ) -> Result<Option<Ticket>, QueueError>;

    /// Conditionally transition the active ticket for a phone number.
    fn transition_active_by_phone(
        &self,
        phone: &str,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, QueueError>;

    /// Overwrite a ticket's wait estimate.
    fn set_wait_estimate(&self, id: &str, minutes: u32) -> Result<(), QueueError>;

    /// Count of tickets completed during the given day.
    fn served_count(&self, day: &str) -> Result<u32, QueueError>;

    /// Today's dashboard rows: active tickets plus terminal tickets last
    /// updated within the day.
    fn tickets_for_today(&self, day: &str) -> Result<Vec<Ticket>, QueueError>;

    /// Historical dashboard rows: every ticket created on the given day.
    fn tickets_created_on(&self, day: &str) -> Result<Vec<Ticket>, QueueError>;
}

/// Trait for the shop open/closed gate.
pub trait ShopStatusStore: Send + Sync {
    /// Current gate state. Created open on first read.
    fn get(&self) -> Result<ShopStatus, QueueError>;

    /// Flip the gate.
    fn set(&self, is_open: bool, updated_by: &str) -> Result<ShopStatus, QueueError>;
}
