//! SQLite-backed queue store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{NewTicket, QueueError, QueueStore, ShopStatus, ShopStatusStore, Ticket, TicketStatus};

const TICKET_COLUMNS: &str = "id, customer_name, phone_number, services, price, day, \
     queue_number, status, is_priority, estimated_wait_minutes, joined_at, served_at, updated_at";

/// SQLite-backed queue store. Also holds the shop gate record.
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    /// Open (or create) the database file and initialize tables.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Store(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().map_err(|e| QueueError::Store(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                customer_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                services TEXT NOT NULL,
                price INTEGER NOT NULL,
                day TEXT NOT NULL,
                queue_number INTEGER NOT NULL,
                status TEXT NOT NULL,
                is_priority INTEGER NOT NULL DEFAULT 0,
                estimated_wait_minutes INTEGER NOT NULL DEFAULT 0,
                joined_at TEXT NOT NULL,
                served_at TEXT,
                updated_at TEXT NOT NULL,
                UNIQUE(day, queue_number)
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_phone_status ON tickets(phone_number, status);
            CREATE INDEX IF NOT EXISTS idx_tickets_day_status ON tickets(day, status);
            CREATE INDEX IF NOT EXISTS idx_tickets_updated_at ON tickets(updated_at);

            CREATE TABLE IF NOT EXISTS queue_counters (
                day TEXT PRIMARY KEY,
                last_number INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS shop_status (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_open INTEGER NOT NULL,
                last_updated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| QueueError::Store(e.to_string()))?;

        Ok(())
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let customer_name: String = row.get(1)?;
        let phone_number: String = row.get(2)?;
        let services_json: String = row.get(3)?;
        let price: u32 = row.get(4)?;
        let day: String = row.get(5)?;
        let queue_number: u32 = row.get(6)?;
        let status_str: String = row.get(7)?;
        let is_priority: bool = row.get(8)?;
        let estimated_wait_minutes: u32 = row.get(9)?;
        let joined_at_str: String = row.get(10)?;
        let served_at_str: Option<String> = row.get(11)?;
        let updated_at_str: String = row.get(12)?;

        let services: Vec<String> = serde_json::from_str(&services_json).unwrap_or_default();
        let status = TicketStatus::parse(&status_str).unwrap_or(TicketStatus::Waiting);

        Ok(Ticket {
            id,
            customer_name,
            phone_number,
            services,
            price,
            day,
            queue_number,
            status,
            is_priority,
            estimated_wait_minutes,
            joined_at: parse_timestamp(&joined_at_str),
            served_at: served_at_str.as_deref().map(parse_timestamp),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn query_tickets(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Ticket>, QueueError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| QueueError::Store(e.to_string()))?;

        let rows = stmt
            .query_map(params, Self::row_to_ticket)
            .map_err(|e| QueueError::Store(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            tickets.push(row_result.map_err(|e| QueueError::Store(e.to_string()))?);
        }
        Ok(tickets)
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl QueueStore for SqliteQueueStore {
    fn insert_ticket(&self, day: &str, request: NewTicket) -> Result<Ticket, QueueError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| QueueError::Store(e.to_string()))?;

        // Bump the per-day counter and read the claimed number in one
        // statement so concurrent joins can never share a number or leave
        // a gap.
        let queue_number: u32 = tx
            .query_row(
                "INSERT INTO queue_counters (day, last_number) VALUES (?, 1)
                 ON CONFLICT(day) DO UPDATE SET last_number = last_number + 1
                 RETURNING last_number",
                params![day],
                |row| row.get(0),
            )
            .map_err(|e| QueueError::Store(e.to_string()))?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let services_json = serde_json::to_string(&request.services)
            .map_err(|e| QueueError::Store(e.to_string()))?;

        tx.execute(
            "INSERT INTO tickets (id, customer_name, phone_number, services, price, day, \
             queue_number, status, is_priority, estimated_wait_minutes, joined_at, served_at, \
             updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)",
            params![
                id,
                request.customer_name,
                request.phone_number,
                services_json,
                request.price,
                day,
                queue_number,
                TicketStatus::Waiting.as_str(),
                request.is_priority,
                request.estimated_wait_minutes,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| QueueError::Store(e.to_string()))?;

        tx.commit().map_err(|e| QueueError::Store(e.to_string()))?;

        Ok(Ticket {
            id,
            customer_name: request.customer_name,
            phone_number: request.phone_number,
            services: request.services,
            price: request.price,
            day: day.to_string(),
            queue_number,
            status: TicketStatus::Waiting,
            is_priority: request.is_priority,
            estimated_wait_minutes: request.estimated_wait_minutes,
            joined_at: now,
            served_at: None,
            updated_at: now,
        })
    }

    fn find_active_by_phone(&self, phone: &str) -> Result<Option<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE phone_number = ? AND status IN ('waiting', 'serving') \
             ORDER BY joined_at DESC LIMIT 1"
        );

        conn.query_row(&sql, params![phone], Self::row_to_ticket)
            .optional()
            .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn find_by_number(&self, day: &str, queue_number: u32) -> Result<Option<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE day = ? AND queue_number = ?");

        conn.query_row(&sql, params![day, queue_number], Self::row_to_ticket)
            .optional()
            .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn active_tickets(&self, day: &str) -> Result<Vec<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE day = ? AND status IN ('waiting', 'serving') \
             ORDER BY queue_number ASC"
        );

        Self::query_tickets(&conn, &sql, &[&day])
    }

    fn waiting_tickets(&self, day: &str) -> Result<Vec<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE day = ? AND status = 'waiting' \
             ORDER BY queue_number ASC"
        );

        Self::query_tickets(&conn, &sql, &[&day])
    }

    fn count_active_before(&self, day: &str, queue_number: u32) -> Result<u32, QueueError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT COUNT(*) FROM tickets \
             WHERE day = ? AND queue_number < ? AND status IN ('waiting', 'serving')",
            params![day, queue_number],
            |row| row.get(0),
        )
        .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn transition_by_number(
        &self,
        day: &str,
        queue_number: u32,
        from: TicketStatus,
        to: TicketStatus,
        stamp_served: bool,
    ) -> Result<Option<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        // Rows-affected is the compare-and-swap: a concurrent transition
        // that got there first leaves nothing to update.
        let sql = if stamp_served {
            format!(
                "UPDATE tickets SET status = ?, served_at = ?, updated_at = ? \
                 WHERE day = ? AND queue_number = ? AND status = ? \
                 RETURNING {TICKET_COLUMNS}"
            )
        } else {
            format!(
                "UPDATE tickets SET status = ?, updated_at = ? \
                 WHERE day = ? AND queue_number = ? AND status = ? \
                 RETURNING {TICKET_COLUMNS}"
            )
        };

        let result = if stamp_served {
            conn.query_row(
                &sql,
                params![to.as_str(), now, now, day, queue_number, from.as_str()],
                Self::row_to_ticket,
            )
        } else {
            conn.query_row(
                &sql,
                params![to.as_str(), now, day, queue_number, from.as_str()],
                Self::row_to_ticket,
            )
        };

        result
            .optional()
            .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn transition_active_by_phone(
        &self,
        phone: &str,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let sql = format!(
            "UPDATE tickets SET status = ?, updated_at = ? \
             WHERE id = (SELECT id FROM tickets \
                         WHERE phone_number = ? AND status IN ('waiting', 'serving') \
                         ORDER BY joined_at DESC LIMIT 1) \
             RETURNING {TICKET_COLUMNS}"
        );

        conn.query_row(&sql, params![to.as_str(), now, phone], Self::row_to_ticket)
            .optional()
            .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn set_wait_estimate(&self, id: &str, minutes: u32) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE tickets SET estimated_wait_minutes = ?, updated_at = ? WHERE id = ?",
            params![minutes, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| QueueError::Store(e.to_string()))?;

        Ok(())
    }

    fn served_count(&self, day: &str) -> Result<u32, QueueError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT COUNT(*) FROM tickets \
             WHERE status = 'completed' AND date(updated_at, 'localtime') = ?",
            params![day],
            |row| row.get(0),
        )
        .map_err(|e| QueueError::Store(e.to_string()))
    }

    fn tickets_for_today(&self, day: &str) -> Result<Vec<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE (day = ? AND status IN ('waiting', 'serving')) \
                OR (status IN ('completed', 'cancelled') AND date(updated_at, 'localtime') = ?) \
             ORDER BY queue_number ASC"
        );

        Self::query_tickets(&conn, &sql, &[&day, &day])
    }

    fn tickets_created_on(&self, day: &str) -> Result<Vec<Ticket>, QueueError> {
        let conn = self.conn.lock().unwrap();

        let sql =
            format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE day = ? ORDER BY queue_number ASC");

        Self::query_tickets(&conn, &sql, &[&day])
    }
}

impl ShopStatusStore for SqliteQueueStore {
    fn get(&self) -> Result<ShopStatus, QueueError> {
        let conn = self.conn.lock().unwrap();

        let existing = conn
            .query_row(
                "SELECT is_open, last_updated_by, updated_at FROM shop_status WHERE id = 1",
                [],
                |row| {
                    let is_open: bool = row.get(0)?;
                    let last_updated_by: String = row.get(1)?;
                    let updated_at: String = row.get(2)?;
                    Ok(ShopStatus {
                        is_open,
                        last_updated_by,
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()
            .map_err(|e| QueueError::Store(e.to_string()))?;

        if let Some(status) = existing {
            return Ok(status);
        }

        // First read creates the record: the shop starts open.
        let now = Utc::now();
        conn.execute(
            "INSERT OR IGNORE INTO shop_status (id, is_open, last_updated_by, updated_at) \
             VALUES (1, 1, 'system', ?)",
            params![now.to_rfc3339()],
        )
        .map_err(|e| QueueError::Store(e.to_string()))?;

        Ok(ShopStatus {
            is_open: true,
            last_updated_by: "system".to_string(),
            updated_at: now,
        })
    }

    fn set(&self, is_open: bool, updated_by: &str) -> Result<ShopStatus, QueueError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO shop_status (id, is_open, last_updated_by, updated_at) \
             VALUES (1, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET is_open = excluded.is_open, \
             last_updated_by = excluded.last_updated_by, updated_at = excluded.updated_at",
            params![is_open, updated_by, now.to_rfc3339()],
        )
        .map_err(|e| QueueError::Store(e.to_string()))?;

        Ok(ShopStatus {
            is_open,
            last_updated_by: updated_by.to_string(),
            updated_at: now,
        })
    }
}
