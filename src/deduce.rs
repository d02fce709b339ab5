//! Cross-snapshot date propagation.
//!
//! Snapshots are outputs of separate narrowing runs, visited in order. While
//! scanning a snapshot the deducer remembers the last date it saw; an undated
//! user gets that date when the next dated user after it (in the same
//! snapshot, or failing that at the head of the following one) agrees.
//!
//! The running date only moves forward. A dated user that appears before the
//! last one seen is never consulted again, even if undated users sit between
//! them.

use chrono::NaiveDate;

use crate::models::{has_member_since, User};
use crate::progress::ProgressSink;

/// First user strictly after `index` that satisfies `condition`
pub fn search_next_user<F>(users: &[User], index: usize, condition: F) -> Option<&User>
where
    F: Fn(&User) -> bool,
{
    users.iter().skip(index + 1).find(|&user| condition(user))
}

#[derive(Debug, Clone, Default)]
pub struct CrossSnapshotDeducer {
    last_known: Option<NaiveDate>,
}

impl CrossSnapshotDeducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent date seen across all snapshots processed so far
    pub fn last_known(&self) -> Option<NaiveDate> {
        self.last_known
    }

    /// Fill gaps in `current`, looking into `lookahead` (the next snapshot)
    /// when no dated user follows inside `current`.
    ///
    /// Returns how many users received a date.
    pub fn deduce(
        &mut self,
        current: &mut [User],
        lookahead: Option<&[User]>,
        progress: &dyn ProgressSink,
    ) -> usize {
        let lookahead_date = lookahead
            .and_then(|next| next.iter().find(|u| has_member_since(u)))
            .and_then(|u| u.member_since);

        // Nearest dated user after each position, taken before any assignment.
        // Assignments only touch positions already passed, so this matches a
        // forward search done at each step.
        let mut next_dated = vec![lookahead_date; current.len()];
        let mut upcoming = lookahead_date;
        for (i, user) in current.iter().enumerate().rev() {
            next_dated[i] = upcoming;
            if user.member_since.is_some() {
                upcoming = user.member_since;
            }
        }

        let mut filled = 0;
        for (i, user) in current.iter_mut().enumerate() {
            if let Some(date) = user.member_since {
                self.last_known = Some(date);
                continue;
            }

            match (next_dated[i], self.last_known) {
                (Some(next), Some(last)) if next == last => {
                    user.member_since = Some(last);
                    progress.date_deduced(user.id, last);
                    filled += 1;
                }
                _ => {}
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn snapshot(first_id: u64, dates: &[Option<&str>]) -> Vec<User> {
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let id = first_id + i as u64;
                let mut user = User::new(id, format!("user{}", id));
                user.member_since = d.map(date);
                user
            })
            .collect()
    }

    #[test]
    fn test_search_next_user() {
        let users = vec![
            User::new(1, "asdas"),
            User::with_date(2, "ojiqwe", date("2014-08-21")),
            User::new(3, "qiojas"),
        ];
        assert_eq!(search_next_user(&users, 0, has_member_since).map(|u| u.id), Some(2));
        assert!(search_next_user(&users, 1, has_member_since).is_none());
        assert!(search_next_user(&users, 5, has_member_since).is_none());
    }

    #[test]
    fn test_fills_gap_inside_one_snapshot() {
        let mut current = snapshot(1, &[Some("2014-08-21"), None, Some("2014-08-21"), None]);
        let mut deducer = CrossSnapshotDeducer::new();

        assert_eq!(deducer.deduce(&mut current, None, &NoopProgress), 1);
        assert_eq!(current[1].member_since, Some(date("2014-08-21")));
        assert_eq!(current[3].member_since, None);
    }

    #[test]
    fn test_trailing_user_backfilled_from_next_snapshot() {
        let mut first = snapshot(1, &[Some("2014-08-21"), None]);
        let second = snapshot(3, &[Some("2014-08-21"), Some("2014-08-22")]);
        let mut deducer = CrossSnapshotDeducer::new();

        assert_eq!(deducer.deduce(&mut first, Some(&second), &NoopProgress), 1);
        assert_eq!(first[1].member_since, Some(date("2014-08-21")));
    }

    #[test]
    fn test_lookahead_with_different_date_is_ignored() {
        let mut first = snapshot(1, &[Some("2014-08-21"), None]);
        let second = snapshot(3, &[None, Some("2014-09-01")]);
        let mut deducer = CrossSnapshotDeducer::new();

        assert_eq!(deducer.deduce(&mut first, Some(&second), &NoopProgress), 0);
        assert_eq!(first[1].member_since, None);
    }

    #[test]
    fn test_needs_an_earlier_date() {
        let mut current = snapshot(1, &[None, Some("2014-08-21")]);
        let mut deducer = CrossSnapshotDeducer::new();

        assert_eq!(deducer.deduce(&mut current, None, &NoopProgress), 0);
        assert_eq!(deducer.last_known(), Some(date("2014-08-21")));
    }

    #[test]
    fn test_last_known_date_carries_across_snapshots() {
        let mut deducer = CrossSnapshotDeducer::new();
        let mut first = snapshot(1, &[Some("2016-02-02")]);
        deducer.deduce(&mut first, None, &NoopProgress);

        let mut second = snapshot(2, &[None, None, Some("2016-02-02")]);
        assert_eq!(deducer.deduce(&mut second, None, &NoopProgress), 2);
        assert!(second.iter().all(|u| u.member_since == Some(date("2016-02-02"))));
    }
}
