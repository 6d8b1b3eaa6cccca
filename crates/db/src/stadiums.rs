use anyhow::Result;
use sqlx::SqlitePool;
use stadium_models::{Page, Stadium, StadiumInput, Window};

const STADIUM_COLUMNS: &str = "id, name, city, capacity, description, image";

pub async fn list_stadiums(pool: &SqlitePool, window: Window) -> Result<Page<Stadium>> {
    let total = super::count(pool, "stadiums").await?;
    let sql = format!("SELECT {STADIUM_COLUMNS} FROM stadiums ORDER BY id LIMIT ? OFFSET ?");
    let stadiums = sqlx::query_as::<_, Stadium>(&sql)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(pool)
        .await?;
    Ok(Page::new(stadiums, window, total))
}

pub async fn get_stadium(pool: &SqlitePool, id: i64) -> Result<Option<Stadium>> {
    let sql = format!("SELECT {STADIUM_COLUMNS} FROM stadiums WHERE id = ?");
    let stadium = sqlx::query_as::<_, Stadium>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(stadium)
}

pub async fn insert_stadium(pool: &SqlitePool, stadium: &StadiumInput) -> Result<Stadium> {
    let sql = format!(
        "INSERT INTO stadiums (name, city, capacity, description, image) VALUES (?, ?, ?, ?, ?) \
         RETURNING {STADIUM_COLUMNS}"
    );
    let stadium = sqlx::query_as::<_, Stadium>(&sql)
        .bind(&stadium.name)
        .bind(&stadium.city)
        .bind(stadium.capacity)
        .bind(&stadium.description)
        .bind(&stadium.image)
        .fetch_one(pool)
        .await?;
    Ok(stadium)
}

pub async fn update_stadium(pool: &SqlitePool, id: i64, stadium: &StadiumInput) -> Result<Option<Stadium>> {
    let sql = format!(
        "UPDATE stadiums SET name = ?, city = ?, capacity = ?, description = ?, image = ? \
         WHERE id = ? RETURNING {STADIUM_COLUMNS}"
    );
    let stadium = sqlx::query_as::<_, Stadium>(&sql)
        .bind(&stadium.name)
        .bind(&stadium.city)
        .bind(stadium.capacity)
        .bind(&stadium.description)
        .bind(&stadium.image)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(stadium)
}

pub async fn delete_stadium(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM stadiums WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
