//! Queue engine: admission, position lookups, lifecycle transitions and
//! the post-completion wait rebuild.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::ServiceCatalog;
use crate::config::QueueConfig;
use crate::notify::{self, EventSink, QueueEvent, SmsSender};

use super::{
    estimator, local_day, mask_name, DashboardEntry, DashboardView, JoinReceipt, NewTicket,
    PositionView, PublicTicket, QueueError, QueueStats, QueueStore, ShopStatus, ShopStatusStore,
    Ticket, TicketStatus,
};

/// Request to join the queue.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub customer_name: String,
    pub phone_number: String,
    pub services: Vec<String>,
    pub is_priority: bool,
}

/// Single-queue engine for one shop.
///
/// The store is the only shared mutable resource; every transition is a
/// conditional write, so concurrent staff clicks and customer requests
/// settle without locks above the store.
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    shop: Arc<dyn ShopStatusStore>,
    catalog: ServiceCatalog,
    slot_minutes: u32,
    sink: Arc<dyn EventSink>,
    sms: Arc<dyn SmsSender>,
}

impl QueueEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        shop: Arc<dyn ShopStatusStore>,
        config: &QueueConfig,
        sink: Arc<dyn EventSink>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        Self {
            store,
            shop,
            catalog: ServiceCatalog::from_config(config),
            slot_minutes: config.completion_slot_minutes,
            sink,
            sms,
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Admit a customer. Validates, checks the gate, rejects duplicate
    /// active phones, quotes price and wait, and claims the next daily
    /// queue number.
    pub async fn join(&self, request: JoinRequest) -> Result<JoinReceipt, QueueError> {
        let customer_name = request.customer_name.trim().to_string();
        let phone_number = request.phone_number.trim().to_string();

        if customer_name.is_empty() {
            return Err(QueueError::Validation("customer name is required".into()));
        }
        if phone_number.is_empty() {
            return Err(QueueError::Validation("phone number is required".into()));
        }
        if request.services.is_empty() || request.services.iter().any(|s| s.trim().is_empty()) {
            return Err(QueueError::Validation(
                "at least one service is required".into(),
            ));
        }

        if !self.shop.get()?.is_open {
            return Err(QueueError::ShopClosed);
        }

        if let Some(existing) = self.store.find_active_by_phone(&phone_number)? {
            let position = self
                .store
                .count_active_before(&existing.day, existing.queue_number)?
                + 1;
            return Err(QueueError::AlreadyQueued {
                queue_number: existing.queue_number,
                position,
            });
        }

        let day = local_day();
        let active = self.store.active_tickets(&day)?;
        let estimated_wait_minutes = estimator::wait_ahead(&self.catalog, &active);
        let price = self
            .catalog
            .price_of(&request.services, request.is_priority);

        let ticket = self.store.insert_ticket(
            &day,
            NewTicket {
                customer_name,
                phone_number,
                services: request.services,
                price,
                is_priority: request.is_priority,
                estimated_wait_minutes,
            },
        )?;

        let position = self
            .store
            .count_active_before(&day, ticket.queue_number)?
            + 1;

        info!(
            queue_number = ticket.queue_number,
            position, estimated_wait_minutes, "customer joined queue"
        );

        if !self
            .sms
            .send(
                &ticket.phone_number,
                &notify::joined_message(
                    &ticket.customer_name,
                    ticket.queue_number,
                    estimated_wait_minutes,
                ),
            )
            .await
        {
            warn!(queue_number = ticket.queue_number, "join sms not delivered");
        }

        self.sink.publish(QueueEvent::Joined {
            queue_number: ticket.queue_number,
            customer_name: mask_name(&ticket.customer_name),
            position,
            estimated_wait_minutes,
        });

        Ok(JoinReceipt {
            queue_number: ticket.queue_number,
            position,
            estimated_wait_minutes,
            price,
        })
    }

    /// Current position of the active ticket for a phone number. Ranking
    /// is by queue number alone; priority never moves anyone here.
    pub fn position(&self, phone: &str) -> Result<PositionView, QueueError> {
        let ticket = self
            .store
            .find_active_by_phone(phone.trim())?
            .ok_or(QueueError::NotInQueue)?;

        let position = self
            .store
            .count_active_before(&ticket.day, ticket.queue_number)?
            + 1;

        Ok(PositionView {
            queue_number: ticket.queue_number,
            customer_name: ticket.customer_name,
            position,
            status: ticket.status,
            estimated_wait_minutes: ticket.estimated_wait_minutes,
        })
    }

    /// Public statistics with masked names.
    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let day = local_day();
        let active = self.store.active_tickets(&day)?;
        let shop = self.shop.get()?;

        let waiting: Vec<&Ticket> = active
            .iter()
            .filter(|t| t.status == TicketStatus::Waiting)
            .collect();

        let average_wait_minutes = if waiting.is_empty() {
            0
        } else {
            let total: u32 = waiting.iter().map(|t| t.estimated_wait_minutes).sum();
            let n = waiting.len() as u32;
            (total + n / 2) / n
        };

        let mut seen = HashSet::new();
        let public: Vec<PublicTicket> = active
            .iter()
            .filter(|t| seen.insert(t.queue_number))
            .map(|t| PublicTicket {
                queue_number: t.queue_number,
                customer_name: mask_name(&t.customer_name),
                services: t.services.join(", "),
                status: t.status,
                joined_at: t.joined_at,
            })
            .collect();

        Ok(QueueStats {
            active_count: active.len() as u32,
            waiting_count: waiting.len() as u32,
            average_wait_minutes,
            served_today: self.store.served_count(&day)?,
            is_open: shop.is_open,
            active: public,
        })
    }

    /// Staff dashboard for a day. Today shows active tickets plus the
    /// day's terminal ones; past days show everything created then.
    /// Priority tickets sort first, then queue number.
    pub fn dashboard(&self, date: Option<&str>) -> Result<DashboardView, QueueError> {
        let today = local_day();
        let day = date.unwrap_or(&today).to_string();

        let mut tickets = if day == today {
            self.store.tickets_for_today(&day)?
        } else {
            self.store.tickets_created_on(&day)?
        };

        tickets.sort_by(|a, b| {
            b.is_priority
                .cmp(&a.is_priority)
                .then(a.queue_number.cmp(&b.queue_number))
        });

        let total_earnings: u64 = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Completed)
            .map(|t| t.price as u64)
            .sum();
        let served_count = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Completed)
            .count() as u32;

        let entries = tickets
            .into_iter()
            .enumerate()
            .map(|(idx, ticket)| DashboardEntry {
                position: idx as u32 + 1,
                ticket,
            })
            .collect();

        Ok(DashboardView {
            day,
            tickets: entries,
            total_earnings,
            served_count,
        })
    }

    /// Call a customer to the chair. Idempotent: marking an already
    /// serving ticket succeeds without re-notifying.
    ///
    /// Numbers are only meaningful within a day, so the lookup is scoped
    /// to today's queue; a ticket left active across midnight is not
    /// reachable by number anymore, only by phone via [`Self::cancel`].
    pub async fn mark_serving(&self, queue_number: u32) -> Result<Ticket, QueueError> {
        let day = local_day();

        let transitioned = self.store.transition_by_number(
            &day,
            queue_number,
            TicketStatus::Waiting,
            TicketStatus::Serving,
            true,
        )?;

        let ticket = match transitioned {
            Some(ticket) => ticket,
            None => {
                return match self.store.find_by_number(&day, queue_number)? {
                    Some(t) if t.status == TicketStatus::Serving => Ok(t),
                    _ => Err(QueueError::TicketNotFound(queue_number)),
                };
            }
        };

        info!(queue_number, "serving customer");

        if !self
            .sms
            .send(
                &ticket.phone_number,
                &notify::your_turn_message(&ticket.customer_name),
            )
            .await
        {
            warn!(queue_number, "turn sms not delivered");
        }

        self.sink.publish(QueueEvent::Serving {
            queue_number,
            customer_name: mask_name(&ticket.customer_name),
            status: TicketStatus::Serving,
        });

        Ok(ticket)
    }

    /// Finish a customer's service. Works from `serving`, and from
    /// `waiting` for walk-ups the staff never marked. Kicks off the
    /// wait rebuild in the background. Scoped to today's queue, same
    /// as [`Self::mark_serving`].
    pub fn mark_complete(&self, queue_number: u32) -> Result<Ticket, QueueError> {
        let day = local_day();

        let from_serving = self.store.transition_by_number(
            &day,
            queue_number,
            TicketStatus::Serving,
            TicketStatus::Completed,
            true,
        )?;

        // Walk-ups sometimes get completed without ever being marked
        // serving, so fall back to the waiting row.
        let ticket = match from_serving {
            Some(ticket) => ticket,
            None => self
                .store
                .transition_by_number(
                    &day,
                    queue_number,
                    TicketStatus::Waiting,
                    TicketStatus::Completed,
                    true,
                )?
                .ok_or(QueueError::TicketNotFound(queue_number))?,
        };

        info!(queue_number, price = ticket.price, "service completed");

        self.sink.publish(QueueEvent::Completed {
            queue_number,
            customer_name: mask_name(&ticket.customer_name),
        });

        // Estimates refresh in the background; the staff response never
        // waits on it.
        let store = Arc::clone(&self.store);
        let slot_minutes = self.slot_minutes;
        tokio::spawn(async move {
            recompute_wait_estimates(store.as_ref(), &day, slot_minutes);
        });

        Ok(ticket)
    }

    /// Cancel the caller's active ticket.
    pub fn cancel(&self, phone: &str) -> Result<Ticket, QueueError> {
        let ticket = self
            .store
            .transition_active_by_phone(phone.trim(), TicketStatus::Cancelled)?
            .ok_or(QueueError::NotInQueue)?;

        info!(queue_number = ticket.queue_number, "ticket cancelled");

        self.sink.publish(QueueEvent::Cancelled {
            queue_number: ticket.queue_number,
            customer_name: mask_name(&ticket.customer_name),
        });

        Ok(ticket)
    }

    pub fn shop_status(&self) -> Result<ShopStatus, QueueError> {
        self.shop.get()
    }

    pub fn set_shop_status(
        &self,
        is_open: bool,
        updated_by: &str,
    ) -> Result<ShopStatus, QueueError> {
        let status = self.shop.set(is_open, updated_by)?;

        info!(is_open, updated_by, "shop status changed");

        self.sink
            .publish(QueueEvent::ShopStatusUpdated { is_open });

        Ok(status)
    }
}

/// Rewrite every waiting ticket's estimate to `rank * slot_minutes`.
/// Each write is independent; one failure doesn't stop the rest.
pub(crate) fn recompute_wait_estimates(store: &dyn QueueStore, day: &str, slot_minutes: u32) {
    let waiting = match store.waiting_tickets(day) {
        Ok(waiting) => waiting,
        Err(e) => {
            warn!(error = %e, "wait recompute: could not load waiting tickets");
            return;
        }
    };

    for (idx, ticket) in waiting.iter().enumerate() {
        let minutes = estimator::slot_estimate(slot_minutes, idx as u32 + 1);
        if let Err(e) = store.set_wait_estimate(&ticket.id, minutes) {
            warn!(
                queue_number = ticket.queue_number,
                error = %e,
                "wait recompute: estimate write failed"
            );
        }
    }

    debug!(count = waiting.len(), "wait estimates rebuilt");
}
