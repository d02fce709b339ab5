use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A platform account as seen by the inference passes.
///
/// IDs are handed out in registration order, so for any two users the one with
/// the smaller `id` registered no later than the other. Every algorithm in this
/// crate leans on that ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric account id, unique across the population
    pub id: u64,

    /// Display handle used to locate the profile page
    pub username: String,

    /// Registration date, `None` while still undetermined
    pub member_since: Option<NaiveDate>,

    /// Whether a profile fetch already completed for this user.
    /// Once set it is never cleared, so a user is fetched at most once.
    #[serde(default)]
    pub fetched: bool,
}

impl User {
    /// Create a user whose registration date is not known yet
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            member_since: None,
            fetched: false,
        }
    }

    /// Create a user with an already known registration date
    pub fn with_date(id: u64, username: impl Into<String>, member_since: NaiveDate) -> Self {
        Self {
            member_since: Some(member_since),
            ..Self::new(id, username)
        }
    }

    pub fn has_member_since(&self) -> bool {
        self.member_since.is_some()
    }

    /// Record the outcome of a completed fetch.
    /// A `None` result keeps whatever date the user already carried.
    pub fn mark_fetched(&mut self, member_since: Option<NaiveDate>) {
        if member_since.is_some() {
            self.member_since = member_since;
        }
        self.fetched = true;
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}, {}>", self.id, self.username)
    }
}

/// Predicate form of [`User::has_member_since`] for search helpers
pub fn has_member_since(user: &User) -> bool {
    user.has_member_since()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_new_user_is_undated() {
        let user = User::new(1, "asdasdsa");
        assert!(!has_member_since(&user));
        assert!(!user.fetched);
    }

    #[test]
    fn test_mark_fetched_with_date() {
        let mut user = User::new(7, "ojiqwe");
        user.mark_fetched(Some(date("2014-08-21")));
        assert!(user.fetched);
        assert_eq!(user.member_since, Some(date("2014-08-21")));
    }

    #[test]
    fn test_mark_fetched_without_date_keeps_existing() {
        let mut user = User::with_date(7, "ojiqwe", date("2014-08-21"));
        user.mark_fetched(None);
        assert!(user.fetched);
        assert_eq!(user.member_since, Some(date("2014-08-21")));
    }

    #[test]
    fn test_display() {
        assert_eq!(User::new(3, "qiojas").to_string(), "<3, qiojas>");
    }
}
