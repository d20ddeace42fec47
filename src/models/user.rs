use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub bio: String,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4(),
            handle: "wanderer".to_string(),
            email: "wanderer@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: String::new(),
            bio: String::new(),
            date_of_birth: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_user("Ada", "Osei").full_name(), "Ada Osei");
    }

    #[test]
    fn test_full_name_trims_when_partial() {
        assert_eq!(sample_user("Ada", "").full_name(), "Ada");
        assert_eq!(sample_user("", "").full_name(), "");
    }
}
