use anyhow::Result;
use sqlx::SqlitePool;
use stadium_models::{Game, GameInput, Page, Window};

const GAME_COLUMNS: &str = "id, name, date, image, home, visitor";

pub async fn list_games(pool: &SqlitePool, window: Window) -> Result<Page<Game>> {
    let total = super::count(pool, "games").await?;
    let sql = format!("SELECT {GAME_COLUMNS} FROM games ORDER BY id LIMIT ? OFFSET ?");
    let games = sqlx::query_as::<_, Game>(&sql)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(pool)
        .await?;
    Ok(Page::new(games, window, total))
}

pub async fn get_game(pool: &SqlitePool, id: i64) -> Result<Option<Game>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?");
    let game = sqlx::query_as::<_, Game>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(game)
}

pub async fn insert_game(pool: &SqlitePool, game: &GameInput) -> Result<Game> {
    let sql = format!(
        "INSERT INTO games (name, date, image, home, visitor) VALUES (?, ?, ?, ?, ?) \
         RETURNING {GAME_COLUMNS}"
    );
    let game = sqlx::query_as::<_, Game>(&sql)
        .bind(&game.name)
        .bind(&game.date)
        .bind(&game.image)
        .bind(&game.team.home)
        .bind(&game.team.visitor)
        .fetch_one(pool)
        .await?;
    Ok(game)
}

pub async fn update_game(pool: &SqlitePool, id: i64, game: &GameInput) -> Result<Option<Game>> {
    let sql = format!(
        "UPDATE games SET name = ?, date = ?, image = ?, home = ?, visitor = ?, \
            updated_at = datetime('now') \
         WHERE id = ? RETURNING {GAME_COLUMNS}"
    );
    let game = sqlx::query_as::<_, Game>(&sql)
        .bind(&game.name)
        .bind(&game.date)
        .bind(&game.image)
        .bind(&game.team.home)
        .bind(&game.team.visitor)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(game)
}

/// Tickets for the game are left in place.
pub async fn delete_game(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM games WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
