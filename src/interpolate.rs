use chrono::NaiveDate;

use crate::models::User;
use crate::progress::ProgressSink;

/// Fill undated users bracketed by two dated neighbors that agree.
///
/// `users` must be sorted by id. For each undated user the nearest dated user
/// before it and the nearest dated user after it are looked up; only when both
/// exist and carry the same date is that date assigned. Neighbors are taken from
/// the population as it was before this call, so a date filled in here never
/// serves as evidence for another user in the same call.
///
/// Returns how many users received a date.
pub fn interpolate(users: &mut [User], progress: &dyn ProgressSink) -> usize {
    let mut next_dated: Vec<Option<NaiveDate>> = vec![None; users.len()];
    let mut upcoming = None;
    for (i, user) in users.iter().enumerate().rev() {
        next_dated[i] = upcoming;
        if user.member_since.is_some() {
            upcoming = user.member_since;
        }
    }

    let mut filled = 0;
    let mut previous: Option<NaiveDate> = None;
    for (i, user) in users.iter_mut().enumerate() {
        match user.member_since {
            Some(date) => previous = Some(date),
            None => {
                if let (Some(prev), Some(next)) = (previous, next_dated[i]) {
                    if prev == next {
                        user.member_since = Some(prev);
                        progress.date_deduced(user.id, prev);
                        filled += 1;
                    }
                }
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::recording::RecordingProgress;
    use crate::progress::NoopProgress;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn population(dates: &[Option<&str>]) -> Vec<User> {
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut user = User::new(10 + i as u64, format!("u{}", i));
                user.member_since = d.map(date);
                user
            })
            .collect()
    }

    #[test]
    fn test_agreeing_neighbors_fill_the_gap() {
        let mut users = population(&[Some("2020-01-01"), None, None, Some("2020-01-01")]);
        let progress = RecordingProgress::default();

        assert_eq!(interpolate(&mut users, &progress), 2);
        assert_eq!(users[1].member_since, Some(date("2020-01-01")));
        assert_eq!(users[2].member_since, Some(date("2020-01-01")));
        assert_eq!(
            *progress.deduced.lock().unwrap(),
            vec![(11, date("2020-01-01")), (12, date("2020-01-01"))]
        );
    }

    #[test]
    fn test_disagreeing_neighbors_leave_gap() {
        let mut users = population(&[Some("2020-01-01"), None, None, Some("2020-02-01")]);
        assert_eq!(interpolate(&mut users, &NoopProgress), 0);
        assert_eq!(users[1].member_since, None);
        assert_eq!(users[2].member_since, None);
    }

    #[test]
    fn test_population_edges_stay_undated() {
        let mut users = population(&[None, Some("2020-01-01"), None, Some("2020-01-01"), None]);
        assert_eq!(interpolate(&mut users, &NoopProgress), 1);
        assert_eq!(users[0].member_since, None);
        assert_eq!(users[2].member_since, Some(date("2020-01-01")));
        assert_eq!(users[4].member_since, None);
    }

    #[test]
    fn test_left_undated_only_when_evidence_is_missing_or_conflicting() {
        let mut users = population(&[
            None,
            Some("2015-01-01"),
            None,
            Some("2015-03-01"),
            None,
            None,
            Some("2015-03-01"),
            None,
        ]);
        interpolate(&mut users, &NoopProgress);

        for (i, user) in users.iter().enumerate() {
            if user.member_since.is_some() {
                continue;
            }
            let prev = users[..i].iter().rev().find_map(|u| u.member_since);
            let next = users[i + 1..].iter().find_map(|u| u.member_since);
            assert!(prev.is_none() || next.is_none() || prev != next, "user {}", user.id);
        }
    }

    #[test]
    fn test_empty_population() {
        assert_eq!(interpolate(&mut [], &NoopProgress), 0);
    }
}
