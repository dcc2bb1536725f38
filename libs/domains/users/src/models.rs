use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{UserError, UserResult};

/// User entity as stored and as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Store-assigned identifier, never reused
    pub id: u64,
    /// Display name, trimmed
    #[serde(rename = "nome")]
    pub name: String,
    /// Email, trimmed and lowercased (unique among live users)
    pub email: String,
    /// Creation timestamp
    #[serde(rename = "criadoEm", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp, absent until the first update
    #[serde(
        rename = "atualizadoEm",
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for create and update.
///
/// Both fields are optional on the wire so that a missing or `null` field is
/// reported as a validation error instead of a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UserInput {
    #[serde(rename = "nome")]
    #[validate(required)]
    pub name: Option<String>,
    #[validate(required, contains(pattern = "@"))]
    pub email: Option<String>,
}

impl UserInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }

    /// Validate and normalize into the values the store persists.
    ///
    /// Blank fields count as missing, and missing fields are reported before
    /// a malformed email.
    pub fn normalize(&self) -> UserResult<UserFields> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let email = self.email.as_deref().map(str::trim).unwrap_or_default();

        if name.is_empty() || email.is_empty() {
            return Err(UserError::MissingFields);
        }

        self.validate()?;

        Ok(UserFields {
            name: name.to_string(),
            email: email.to_lowercase(),
        })
    }
}

/// Validated, normalized user fields handed to the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub name: String,
    pub email: String,
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn test_user_json_shape_before_update() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1,
                "nome": "Ana",
                "email": "ana@x.com",
                "criadoEm": "2024-05-01T12:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_user_json_includes_updated_at_after_update() {
        let mut user = sample_user();
        user.updated_at = Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 15).unwrap());
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["atualizadoEm"], "2024-05-02T08:30:15.000Z");

        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let fields = UserInput::new("  Ana  ", "  ANA@X.com ").normalize().unwrap();
        assert_eq!(fields.name, "Ana");
        assert_eq!(fields.email, "ana@x.com");
    }

    #[test]
    fn test_normalize_rejects_missing_fields() {
        let input: UserInput = serde_json::from_value(json!({ "nome": "Ana" })).unwrap();
        assert!(matches!(input.normalize(), Err(UserError::MissingFields)));

        let input: UserInput =
            serde_json::from_value(json!({ "nome": null, "email": "a@b.c" })).unwrap();
        assert!(matches!(input.normalize(), Err(UserError::MissingFields)));
    }

    #[test]
    fn test_normalize_treats_blank_as_missing() {
        let input = UserInput::new("   ", "ana@x.com");
        assert!(matches!(input.normalize(), Err(UserError::MissingFields)));
        let input = UserInput::new("Ana", "");
        assert!(matches!(input.normalize(), Err(UserError::MissingFields)));
    }

    #[test]
    fn test_normalize_rejects_email_without_at() {
        let input = UserInput::new("Ana", "ana.x.com");
        assert!(matches!(input.normalize(), Err(UserError::InvalidEmail)));
    }

    #[test]
    fn test_missing_fields_take_precedence_over_invalid_email() {
        let input: UserInput = serde_json::from_value(json!({ "email": "sem-arroba" })).unwrap();
        assert!(matches!(input.normalize(), Err(UserError::MissingFields)));
    }
}
