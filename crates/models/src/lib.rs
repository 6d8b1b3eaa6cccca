use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

pub mod page;
pub mod schema;
pub mod table;

pub use page::{Page, PageRequest, Pagination, Window};
pub use schema::{Schema, ValidationError};

// --- Games ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub image: String,
    #[sqlx(flatten)]
    pub team: Team,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Team {
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub visitor: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameInput {
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub team: Team,
}

impl GameInput {
    /// Validate a create/update payload. Accepts `team` nested or
    /// `home`/`visitor` at the top level, as the admin form submits them.
    pub fn from_payload(mut value: Value) -> Result<Self, ValidationError> {
        lift_team(&mut value);
        schema::parse(&schema::GAME, &value)
    }
}

/// Move top-level `home`/`visitor` keys into the nested `team` object.
/// Flattened keys win over nested ones when both are present.
pub fn lift_team(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let home = obj.remove("home");
    let visitor = obj.remove("visitor");
    if home.is_none() && visitor.is_none() {
        return;
    }
    let team = obj
        .entry("team")
        .or_insert_with(|| Value::Object(Default::default()));
    if !team.is_object() {
        *team = Value::Object(Default::default());
    }
    if let Some(team) = team.as_object_mut() {
        if let Some(home) = home {
            team.insert("home".to_string(), home);
        }
        if let Some(visitor) = visitor {
            team.insert("visitor".to_string(), visitor);
        }
    }
}

// --- Users ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

/// A user row together with its password hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// --- Tickets ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Available,
    Reserved,
    Sold,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Available => "available",
            TicketStatus::Reserved => "reserved",
            TicketStatus::Sold => "sold",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub game_id: i64,
    pub section: String,
    #[sqlx(rename = "seat_row")]
    pub row: String,
    pub seat: String,
    pub price: f64,
    pub status: TicketStatus,
    pub owner_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TicketInput {
    pub game_id: i64,
    pub section: String,
    pub row: String,
    pub seat: String,
    pub price: f64,
    #[serde(default)]
    pub status: TicketStatus,
    pub owner_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TicketSummary {
    pub game_id: i64,
    pub total: i64,
    pub available: i64,
}

// --- Stadium ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stadium {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub capacity: i64,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StadiumInput {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattened_form_payload_becomes_nested_team() {
        let input = GameInput::from_payload(json!({
            "name": "Game Porto",
            "date": "2020-01-02",
            "image": "url",
            "home": "home",
            "visitor": ""
        }))
        .unwrap();
        assert_eq!(input.team.home, "home");
        assert_eq!(input.team.visitor, "");
        assert_eq!(input.image, "url");
    }

    #[test]
    fn nested_team_is_accepted_as_is() {
        let input = GameInput::from_payload(json!({
            "name": "Derby",
            "date": "2024-05-01",
            "team": { "home": "Porto", "visitor": "Benfica" }
        }))
        .unwrap();
        assert_eq!(input.team, Team { home: "Porto".into(), visitor: "Benfica".into() });
        assert_eq!(input.image, "");
    }

    #[test]
    fn flattened_keys_override_nested_team() {
        let mut value = json!({ "team": { "home": "old", "visitor": "kept" }, "home": "new" });
        lift_team(&mut value);
        assert_eq!(value, json!({ "team": { "home": "new", "visitor": "kept" } }));
    }

    #[test]
    fn game_without_name_is_rejected() {
        let err = GameInput::from_payload(json!({ "date": "2024-05-01" })).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn ticket_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(TicketStatus::Sold).unwrap(), json!("sold"));
    }
}
