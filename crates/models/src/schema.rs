//! Declarative per-entity payload schemas.
//!
//! Every create/update body is checked against one of the schemas below
//! before it reaches a handler's business logic. Checking returns a
//! normalized copy: undeclared keys are dropped, numeric fields that
//! arrived as form strings are converted to JSON numbers, and optional
//! fields left blank (`null`, or `""` for numbers) are omitted so the
//! target type's default applies.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use validator::{ValidateEmail, ValidateLength};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Text,
    Integer,
    Number,
    Object(&'static [Field]),
}

impl Kind {
    fn is_numeric(&self) -> bool {
        matches!(self, Kind::Integer | Kind::Number)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    NonEmpty,
    MinLength(usize),
    Email,
    OneOf(&'static [&'static str]),
    NonNegative,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub rules: &'static [Rule],
}

impl Field {
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Self { name, kind, required: true, rules: &[] }
    }

    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Self { name, kind, required: false, rules: &[] }
    }

    pub const fn with(mut self, rules: &'static [Rule]) -> Self {
        self.rules = rules;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub entity: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub fn check(&self, input: &Value) -> Result<Value, ValidationError> {
        check_object(self.fields, input, "")
    }
}

/// Check `input` against `schema` and deserialize the normalized result.
pub fn parse<T: DeserializeOwned>(schema: &Schema, input: &Value) -> Result<T, ValidationError> {
    let checked = schema.check(input)?;
    serde_json::from_value(checked)
        .map_err(|e| ValidationError::new(schema.entity, e.to_string()))
}

/// Deep-merge `patch` into `base`. Objects merge key by key, anything else
/// replaces the base value.
pub fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                if !nested {
                    base.insert(key, value);
                } else if let Some(existing) = base.get_mut(&key) {
                    merge(existing, value);
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn check_object(fields: &[Field], input: &Value, prefix: &str) -> Result<Value, ValidationError> {
    let Some(obj) = input.as_object() else {
        let field = if prefix.is_empty() { "body" } else { prefix };
        return Err(ValidationError::new(field, "must be an object"));
    };

    let mut out = Map::new();
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };

        let value = match obj.get(field.name) {
            Some(Value::String(s)) if field.kind.is_numeric() && s.trim().is_empty() => None,
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        };

        match value {
            None if field.required => {
                return Err(ValidationError::new(path, "is required"));
            }
            None => {}
            Some(value) => {
                let value = coerce(field.kind, value, &path)?;
                for rule in field.rules {
                    apply_rule(rule, &value, &path)?;
                }
                out.insert(field.name.to_string(), value);
            }
        }
    }
    Ok(Value::Object(out))
}

fn coerce(kind: Kind, value: &Value, path: &str) -> Result<Value, ValidationError> {
    match kind {
        Kind::Text => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(ValidationError::new(path, "must be a string")),
        },
        Kind::Integer => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| ValidationError::new(path, "must be an integer"))
        }
        Kind::Number => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| ValidationError::new(path, "must be a number"))
        }
        Kind::Object(fields) => check_object(fields, value, path),
    }
}

fn apply_rule(rule: &Rule, value: &Value, path: &str) -> Result<(), ValidationError> {
    let text = match value {
        Value::String(s) => s.clone(),
        _ => String::new(),
    };
    let ok = match rule {
        Rule::NonEmpty => !text.trim().is_empty(),
        Rule::MinLength(n) => text.validate_length(Some(*n as u64), None, None),
        Rule::Email => text.validate_email(),
        Rule::OneOf(allowed) => allowed.iter().any(|a| *a == text),
        Rule::NonNegative => value.as_f64().is_some_and(|n| n >= 0.0),
    };
    if ok {
        return Ok(());
    }
    let message = match rule {
        Rule::NonEmpty => "must not be empty".to_string(),
        Rule::MinLength(n) => format!("must be at least {n} characters"),
        Rule::Email => "must be a valid email address".to_string(),
        Rule::OneOf(allowed) => format!("must be one of: {}", allowed.join(", ")),
        Rule::NonNegative => "must not be negative".to_string(),
    };
    Err(ValidationError::new(path, message))
}

// --- Entity schemas ---

const ROLES: &[&str] = &["admin", "user"];
const TICKET_STATUSES: &[&str] = &["available", "reserved", "sold", "cancelled"];

const TEAM_FIELDS: &[Field] = &[
    Field::optional("home", Kind::Text),
    Field::optional("visitor", Kind::Text),
];

pub static GAME: Schema = Schema {
    entity: "game",
    fields: &[
        Field::required("name", Kind::Text).with(&[Rule::NonEmpty]),
        Field::required("date", Kind::Text).with(&[Rule::NonEmpty]),
        Field::optional("image", Kind::Text),
        Field::optional("team", Kind::Object(TEAM_FIELDS)),
    ],
};

pub static REGISTER: Schema = Schema {
    entity: "user",
    fields: &[
        Field::required("username", Kind::Text).with(&[Rule::NonEmpty, Rule::MinLength(3)]),
        Field::required("email", Kind::Text).with(&[Rule::Email]),
        Field::required("password", Kind::Text).with(&[Rule::MinLength(6)]),
    ],
};

pub static NEW_USER: Schema = Schema {
    entity: "user",
    fields: &[
        Field::required("username", Kind::Text).with(&[Rule::NonEmpty, Rule::MinLength(3)]),
        Field::required("email", Kind::Text).with(&[Rule::Email]),
        Field::required("password", Kind::Text).with(&[Rule::MinLength(6)]),
        Field::optional("role", Kind::Text).with(&[Rule::OneOf(ROLES)]),
    ],
};

pub static USER_UPDATE: Schema = Schema {
    entity: "user",
    fields: &[
        Field::required("username", Kind::Text).with(&[Rule::NonEmpty, Rule::MinLength(3)]),
        Field::required("email", Kind::Text).with(&[Rule::Email]),
        Field::required("role", Kind::Text).with(&[Rule::OneOf(ROLES)]),
        Field::optional("password", Kind::Text).with(&[Rule::MinLength(6)]),
    ],
};

pub static LOGIN: Schema = Schema {
    entity: "credentials",
    fields: &[
        Field::required("username", Kind::Text).with(&[Rule::NonEmpty]),
        Field::required("password", Kind::Text).with(&[Rule::NonEmpty]),
    ],
};

pub static TICKET: Schema = Schema {
    entity: "ticket",
    fields: &[
        Field::required("game_id", Kind::Integer),
        Field::required("section", Kind::Text).with(&[Rule::NonEmpty]),
        Field::required("row", Kind::Text).with(&[Rule::NonEmpty]),
        Field::required("seat", Kind::Text).with(&[Rule::NonEmpty]),
        Field::required("price", Kind::Number).with(&[Rule::NonNegative]),
        Field::optional("status", Kind::Text).with(&[Rule::OneOf(TICKET_STATUSES)]),
        Field::optional("owner_id", Kind::Integer),
        Field::optional("notes", Kind::Text),
    ],
};

pub static STADIUM: Schema = Schema {
    entity: "stadium",
    fields: &[
        Field::required("name", Kind::Text).with(&[Rule::NonEmpty]),
        Field::optional("city", Kind::Text),
        Field::optional("capacity", Kind::Integer).with(&[Rule::NonNegative]),
        Field::optional("description", Kind::Text),
        Field::optional("image", Kind::Text),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn undeclared_keys_are_dropped() {
        let checked = STADIUM.check(&json!({ "name": "Dragão", "id": 7, "extra": true })).unwrap();
        assert_eq!(checked, json!({ "name": "Dragão" }));
    }

    #[test]
    fn form_strings_become_numbers() {
        let checked = TICKET
            .check(&json!({
                "game_id": "3",
                "section": "A",
                "row": "1",
                "seat": 12,
                "price": "25.5",
                "owner_id": ""
            }))
            .unwrap();
        assert_eq!(checked["game_id"], json!(3));
        assert_eq!(checked["price"], json!(25.5));
        assert_eq!(checked["seat"], json!("12"));
        assert!(checked.get("owner_id").is_none());
    }

    #[test]
    fn blank_optional_fields_fall_back_to_defaults() {
        let input: crate::StadiumInput =
            parse(&STADIUM, &json!({ "name": "X", "capacity": "", "image": null })).unwrap();
        assert_eq!(input.capacity, 0);
        assert_eq!(input.image, "");

        let game: crate::GameInput =
            parse(&GAME, &json!({ "name": "G", "date": "2024-01-01", "image": null, "team": null })).unwrap();
        assert_eq!(game.image, "");
        assert_eq!(game.team, crate::Team::default());
    }

    #[test]
    fn nested_fields_report_their_path() {
        let err = GAME
            .check(&json!({ "name": "x", "date": "2024-01-01", "team": { "home": true } }))
            .unwrap_err();
        assert_eq!(err.field, "team.home");
        assert_eq!(err.message, "must be a string");
    }

    #[test]
    fn empty_optional_text_is_preserved() {
        let checked = GAME
            .check(&json!({ "name": "x", "date": "d", "team": { "home": "h", "visitor": "" } }))
            .unwrap();
        assert_eq!(checked["team"]["visitor"], json!(""));
    }

    #[test]
    fn rules_are_enforced() {
        let err = REGISTER
            .check(&json!({ "username": "ana", "email": "not-an-email", "password": "secret1" }))
            .unwrap_err();
        assert_eq!(err.to_string(), "email: must be a valid email address");

        let err = TICKET
            .check(&json!({ "game_id": 1, "section": "A", "row": "1", "seat": "1", "price": -1 }))
            .unwrap_err();
        assert_eq!(err.field, "price");

        let err = NEW_USER
            .check(&json!({ "username": "ana", "email": "a@b.pt", "password": "secret1", "role": "root" }))
            .unwrap_err();
        assert_eq!(err.message, "must be one of: admin, user");
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(GAME.check(&json!([1, 2])).unwrap_err().field, "body");
    }

    #[test]
    fn merge_is_deep_for_objects() {
        let mut base = json!({ "name": "a", "team": { "home": "h", "visitor": "v" } });
        merge(&mut base, json!({ "team": { "visitor": "" }, "date": "2024-01-01" }));
        assert_eq!(
            base,
            json!({ "name": "a", "date": "2024-01-01", "team": { "home": "h", "visitor": "" } })
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let register = |email: &str| {
            REGISTER.check(&json!({ "username": "fan", "email": email, "password": "secret1" }))
        };
        assert!(register("fan@stadium.pt").is_ok());
        for email in ["<script>@x.y", "a\"b,c@d.e", "fan@-.-", "@stadium.pt", "fan @stadium.pt"] {
            let err = register(email).unwrap_err();
            assert_eq!(err.field, "email", "{email}");
        }
    }

    #[test]
    fn min_length_counts_characters() {
        let user = |name: &str| {
            REGISTER.check(&json!({ "username": name, "email": "a@b.pt", "password": "secret1" }))
        };
        assert!(user("Zé").is_err());
        assert!(user("Joã").is_ok());
    }
}
