use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

const VITALS_SELECTOR: &str = "#profile_user_vitals";
const LABEL_ELEMENTS: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid CSS selector {0}: {1}")]
    Selector(&'static str, String),
}

fn member_since_label() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| Regex::new(r"(?i)member\s+since").expect("Invalid label regex"))
}

fn selector(css: &'static str) -> Result<Selector, ProfileError> {
    Selector::parse(css).map_err(|e| ProfileError::Selector(css, e.to_string()))
}

/// Extract the "Member Since" date from a profile page.
///
/// The date lives in the `<span>` that follows the label inside the
/// `#profile_user_vitals` block. A page without that block, label or span
/// yields `Ok(None)`: the profile was read, it just has no date.
///
/// # Examples
/// ```
/// use kong_member_since::profile::extract_member_since;
///
/// let html = r#"<div id="profile_user_vitals"><li><span>Member Since</span>
///     <span>Aug. 21, 2014</span></li></div>"#;
/// let date = extract_member_since(html).unwrap().unwrap();
/// assert_eq!(date.to_string(), "2014-08-21");
/// ```
pub fn extract_member_since(html_body: &str) -> Result<Option<NaiveDate>, ProfileError> {
    let document = Html::parse_document(html_body);
    let vitals_selector = selector(VITALS_SELECTOR)?;
    let any_selector = selector(LABEL_ELEMENTS)?;

    let Some(vitals) = document.select(&vitals_selector).next() else {
        return Ok(None);
    };

    let label = vitals.select(&any_selector).find(|element| {
        element.children().any(|child| {
            child
                .value()
                .as_text()
                .is_some_and(|text| member_since_label().is_match(text))
        })
    });
    let Some(label) = label else {
        return Ok(None);
    };

    let value = label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "span");
    let Some(value) = value else {
        return Ok(None);
    };

    let raw = value.text().collect::<String>();
    let parsed = parse_profile_date(&raw);
    if parsed.is_none() {
        tracing::warn!(raw = raw.trim(), "Unrecognised member since date");
    }
    Ok(parsed)
}

/// Parse dates shaped like `Aug. 21, 2014` or `May 4, 2010`
pub fn parse_profile_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim().replace('.', "");
    NaiveDate::parse_from_str(&cleaned, "%b %d, %Y").ok()
}
