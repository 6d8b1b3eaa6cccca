use anyhow::Result;
use sqlx::SqlitePool;
use stadium_models::{Page, Ticket, TicketInput, TicketStatus, TicketSummary, Window};

const TICKET_COLUMNS: &str = "id, game_id, section, seat_row, seat, price, status, owner_id, notes";

/// List tickets, optionally restricted to one game.
pub async fn list_tickets(
    pool: &SqlitePool,
    game_id: Option<i64>,
    window: Window,
) -> Result<Page<Ticket>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE (? IS NULL OR game_id = ?)")
        .bind(game_id)
        .bind(game_id)
        .fetch_one(pool)
        .await?;
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE (? IS NULL OR game_id = ?) \
         ORDER BY id LIMIT ? OFFSET ?"
    );
    let tickets = sqlx::query_as::<_, Ticket>(&sql)
        .bind(game_id)
        .bind(game_id)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(pool)
        .await?;
    Ok(Page::new(tickets, window, total))
}

pub async fn list_tickets_for_game(pool: &SqlitePool, game_id: i64) -> Result<Vec<Ticket>> {
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE game_id = ? ORDER BY section, seat_row, seat"
    );
    let tickets = sqlx::query_as::<_, Ticket>(&sql)
        .bind(game_id)
        .fetch_all(pool)
        .await?;
    Ok(tickets)
}

pub async fn list_tickets_for_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Ticket>> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE owner_id = ? ORDER BY id");
    let tickets = sqlx::query_as::<_, Ticket>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    Ok(tickets)
}

pub async fn get_ticket(pool: &SqlitePool, id: i64) -> Result<Option<Ticket>> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?");
    let ticket = sqlx::query_as::<_, Ticket>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(ticket)
}

pub async fn insert_ticket(pool: &SqlitePool, ticket: &TicketInput) -> Result<Ticket> {
    let sql = format!(
        "INSERT INTO tickets (game_id, section, seat_row, seat, price, status, owner_id, notes) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {TICKET_COLUMNS}"
    );
    let ticket = sqlx::query_as::<_, Ticket>(&sql)
        .bind(ticket.game_id)
        .bind(&ticket.section)
        .bind(&ticket.row)
        .bind(&ticket.seat)
        .bind(ticket.price)
        .bind(ticket.status)
        .bind(ticket.owner_id)
        .bind(&ticket.notes)
        .fetch_one(pool)
        .await?;
    Ok(ticket)
}

pub async fn update_ticket(pool: &SqlitePool, id: i64, ticket: &TicketInput) -> Result<Option<Ticket>> {
    let sql = format!(
        "UPDATE tickets SET game_id = ?, section = ?, seat_row = ?, seat = ?, price = ?, \
            status = ?, owner_id = ?, notes = ?, updated_at = datetime('now') \
         WHERE id = ? RETURNING {TICKET_COLUMNS}"
    );
    let ticket = sqlx::query_as::<_, Ticket>(&sql)
        .bind(ticket.game_id)
        .bind(&ticket.section)
        .bind(&ticket.row)
        .bind(&ticket.seat)
        .bind(ticket.price)
        .bind(ticket.status)
        .bind(ticket.owner_id)
        .bind(&ticket.notes)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(ticket)
}

pub async fn delete_ticket(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tickets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark an available ticket as sold to `owner_id`. Returns `None` when the
/// ticket does not exist or is no longer available.
pub async fn purchase_ticket(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<Option<Ticket>> {
    let sql = format!(
        "UPDATE tickets SET status = ?, owner_id = ?, updated_at = datetime('now') \
         WHERE id = ? AND status = ? RETURNING {TICKET_COLUMNS}"
    );
    let ticket = sqlx::query_as::<_, Ticket>(&sql)
        .bind(TicketStatus::Sold)
        .bind(owner_id)
        .bind(id)
        .bind(TicketStatus::Available)
        .fetch_optional(pool)
        .await?;
    Ok(ticket)
}

/// Per-game ticket counts: (game_id, total, available).
pub async fn ticket_summary(pool: &SqlitePool) -> Result<Vec<TicketSummary>> {
    let rows = sqlx::query_as::<_, TicketSummary>(
        "SELECT game_id, COUNT(*) AS total, \
            CAST(SUM(CASE WHEN status = 'available' THEN 1 ELSE 0 END) AS INTEGER) AS available \
         FROM tickets GROUP BY game_id ORDER BY game_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
