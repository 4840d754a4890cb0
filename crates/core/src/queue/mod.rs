//! Single-queue engine for walk-in customers.

pub mod estimator;

mod engine;
mod sqlite_store;
mod store;
mod types;

pub use engine::{JoinRequest, QueueEngine};
pub use sqlite_store::SqliteQueueStore;
pub use store::{NewTicket, QueueError, QueueStore, ShopStatusStore};
pub use types::{
    local_day, mask_name, DashboardEntry, DashboardView, JoinReceipt, PositionView, PublicTicket,
    QueueStats, ShopStatus, Ticket, TicketStatus,
};
