use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::config::Config;
use crate::models::User;

#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed row at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Read `id,username[,member_since]` rows, sorted by id on return.
///
/// Any row that cannot be read exactly aborts the load: the passes downstream
/// rely on the id order, so a skipped or misread row would corrupt them.
pub fn parse_population<R: BufRead>(reader: R) -> Result<Vec<User>, PopulationError> {
    let mut users = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let row = line.trim_end_matches('\r');
        if row.trim().is_empty() {
            continue;
        }

        let user = parse_row(row).map_err(|reason| PopulationError::Malformed {
            line: line_no,
            reason,
        })?;
        if !seen.insert(user.id) {
            return Err(PopulationError::Malformed {
                line: line_no,
                reason: format!("duplicate user id {}", user.id),
            });
        }
        users.push(user);
    }

    users.sort_by_key(|u| u.id);
    Ok(users)
}

fn parse_row(row: &str) -> Result<User, String> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(format!("expected 2 or 3 fields, found {}", fields.len()));
    }

    let id = fields[0]
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid user id {:?}: {}", fields[0], e))?;

    let username = fields[1].trim();
    if username.is_empty() {
        return Err("empty username".to_string());
    }

    let member_since = match fields.get(2).map(|f| f.trim()) {
        None | Some("") => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, Config::DATE_FORMAT)
                .map_err(|e| format!("invalid date {:?}: {}", raw, e))?,
        ),
    };

    Ok(User {
        id,
        username: username.to_string(),
        member_since,
        fetched: false,
    })
}

pub fn load_population<P: AsRef<Path>>(path: P) -> Result<Vec<User>, PopulationError> {
    let file = File::open(path)?;
    parse_population(BufReader::new(file))
}

/// Write one `id,username,member_since` row per user; the date column is
/// left empty for users still undated.
pub fn write_rows<W: Write>(users: &[User], writer: &mut W) -> std::io::Result<()> {
    for user in users {
        let date = user
            .member_since
            .map(|d| d.format(Config::DATE_FORMAT).to_string())
            .unwrap_or_default();
        writeln!(writer, "{},{},{}", user.id, user.username, date)?;
    }
    Ok(())
}

pub fn write_population<P: AsRef<Path>>(path: P, users: &[User]) -> Result<(), PopulationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_rows(users, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn parse(input: &str) -> Result<Vec<User>, PopulationError> {
        parse_population(Cursor::new(input))
    }

    #[test]
    fn test_parse_mixed_rows_sorted_by_id() {
        let users = parse("3,qiojas,\n1,asdas\n\n2,ojiqwe,2014-08-21\r\n").unwrap();

        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(users[0].member_since, None);
        assert_eq!(users[1].username, "ojiqwe");
        assert_eq!(users[1].member_since, NaiveDate::from_ymd_opt(2014, 8, 21));
        assert!(users.iter().all(|u| !u.fetched));
    }

    #[test]
    fn test_bad_id_reports_line() {
        let err = parse("1,a,\nxx,b,\n").unwrap_err();
        assert!(matches!(err, PopulationError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_bad_date_reports_line() {
        let err = parse("1,a,2014-13-40\n").unwrap_err();
        match err {
            PopulationError::Malformed { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("invalid date"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rejects_missing_username_and_extra_fields() {
        assert!(parse("1\n").is_err());
        assert!(parse("1,,\n").is_err());
        assert!(parse("1,a,2014-08-21,extra\n").is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = parse("1,a,\n1,b,\n").unwrap_err();
        assert!(matches!(err, PopulationError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_write_then_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("10_users.csv");
        let users = vec![
            User::new(1, "asdas"),
            User::with_date(2, "ojiqwe", NaiveDate::from_ymd_opt(2014, 8, 21).unwrap()),
        ];

        write_population(&path, &users).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1,asdas,\n2,ojiqwe,2014-08-21\n");
        assert_eq!(load_population(&path).unwrap(), users);
    }
}
