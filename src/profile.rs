//! Stored user profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Age sentinel for "the user chose not to say".
pub const AGE_NOT_PROVIDED: i64 = -1;

/// User-state property the profile is stored under.
pub const USER_PROFILE: &str = "USER_PROFILE";

fn age_not_provided() -> i64 {
    AGE_NOT_PROVIDED
}

/// Profile written at the end of a confirmed order dialog.
///
/// Stored in user state as JSON under `"USER_PROFILE"`. Each confirmed run
/// replaces every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    /// Cup size. Older records named this field `transport`.
    #[serde(default, alias = "transport")]
    pub size: String,
    /// `-1` when not provided, otherwise in `1..150`.
    #[serde(default = "age_not_provided")]
    pub age: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: String::new(),
            age: AGE_NOT_PROVIDED,
            updated_at: None,
        }
    }
}

impl UserProfile {
    /// Age if the user gave one.
    pub fn age(&self) -> Option<i64> {
        (self.age != AGE_NOT_PROVIDED).then_some(self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_age() {
        let profile = UserProfile::default();
        assert_eq!(profile.age, AGE_NOT_PROVIDED);
        assert_eq!(profile.age(), None);
    }

    #[test]
    fn legacy_transport_field_reads_as_size() {
        let profile: UserProfile =
            serde_json::from_value(serde_json::json!({"name": "Ana", "transport": "700ml", "age": 30}))
                .unwrap();
        assert_eq!(profile.size, "700ml");
        assert_eq!(profile.age(), Some(30));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(profile, UserProfile::default());
    }

    #[test]
    fn serializes_size_not_transport() {
        let profile = UserProfile {
            name: "Ana".into(),
            size: "500ml".into(),
            age: -1,
            updated_at: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ana", "size": "500ml", "age": -1}));
    }
}
