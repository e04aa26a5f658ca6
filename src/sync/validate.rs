// Pure validation helpers shared by the table handlers.
use chrono::NaiveDate;
use serde_json::Value;

/// Structural check for a 24-hex-char record id. No existence check.
pub fn is_valid_object_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// `H:mm` / `HH:mm`, hour 0-23, minute 0-59
pub fn validate_time_format(time: &str) -> bool {
    let Some((hours, minutes)) = time.split_once(':') else {
        return false;
    };
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return false;
    }
    if !hours.chars().all(|c| c.is_ascii_digit()) || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let h: u32 = hours.parse().unwrap_or(24);
    let m: u32 = minutes.parse().unwrap_or(60);
    h <= 23 && m <= 59
}

/// Cross-field time check. Returns a human-readable violation, or None if valid.
/// Full-day entries are exempt from the start<end ordering rule.
pub fn validate_time_logic(start: &str, end: &str, is_full_day: bool) -> Option<String> {
    if !validate_time_format(start) {
        return Some(format!("startTime '{}' is not a valid HH:mm time", start));
    }
    if !validate_time_format(end) {
        return Some(format!("endTime '{}' is not a valid HH:mm time", end));
    }
    if is_full_day {
        return None;
    }
    if minutes_of_day(start) >= minutes_of_day(end) {
        return Some(format!("startTime '{}' must be before endTime '{}'", start, end));
    }
    None
}

fn minutes_of_day(time: &str) -> u32 {
    // Callers validate the format first
    let (h, m) = time.split_once(':').unwrap_or(("0", "0"));
    h.parse::<u32>().unwrap_or(0) * 60 + m.parse::<u32>().unwrap_or(0)
}

/// `YYYY-MM-DD` calendar date
pub fn is_valid_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// String field accessor; None when absent or not a string
pub fn str_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Non-empty string field, or an error naming the field
pub fn require_str<'a>(doc: &'a Value, field: &str) -> Result<&'a str, String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(format!("{} must not be empty", field)),
        Some(_) => Err(format!("{} must be a string", field)),
        None => Err(format!("{} is required", field)),
    }
}

/// Boolean field accessor, defaulting when absent
pub fn bool_field(doc: &Value, field: &str, default: bool) -> bool {
    doc.get(field).and_then(Value::as_bool).unwrap_or(default)
}

/// Validated record id from a payload's `id` field
pub fn require_record_id(doc: &Value) -> Result<String, String> {
    let id = require_str(doc, "id")?;
    if !is_valid_object_id(id) {
        return Err(format!("id '{}' is not a valid record id", id));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_id_is_structural_only() {
        assert!(is_valid_object_id("507f1f77bcf86cd799439011"));
        assert!(is_valid_object_id("507F1F77BCF86CD799439011"));
        assert!(!is_valid_object_id("507f1f77bcf86cd79943901")); // 23 chars
        assert!(!is_valid_object_id("507f1f77bcf86cd7994390111")); // 25 chars
        assert!(!is_valid_object_id("507f1f77bcf86cd79943901z"));
        assert!(!is_valid_object_id(""));
    }

    #[test]
    fn time_format_accepts_single_digit_hour() {
        assert!(validate_time_format("9:30"));
        assert!(validate_time_format("09:30"));
        assert!(validate_time_format("0:00"));
        assert!(validate_time_format("23:59"));
        assert!(!validate_time_format("24:00"));
        assert!(!validate_time_format("12:60"));
        assert!(!validate_time_format("12:5"));
        assert!(!validate_time_format("12-30"));
        assert!(!validate_time_format("aa:bb"));
        assert!(!validate_time_format(""));
    }

    #[test]
    fn time_logic_requires_ordering_unless_full_day() {
        assert_eq!(validate_time_logic("09:00", "17:00", false), None);
        assert!(validate_time_logic("17:00", "09:00", false).is_some());
        assert!(validate_time_logic("09:00", "09:00", false).is_some());
        // Full day is exempt from ordering
        assert_eq!(validate_time_logic("17:00", "09:00", true), None);
        // Format still checked for full-day entries
        assert!(validate_time_logic("25:00", "09:00", true).is_some());
    }

    #[test]
    fn date_validation_rejects_impossible_dates() {
        assert!(is_valid_date("2025-02-28"));
        assert!(!is_valid_date("2025-02-30"));
        assert!(!is_valid_date("2025-13-01"));
        assert!(!is_valid_date("02-28-2025"));
        assert!(!is_valid_date("not a date"));
    }

    #[test]
    fn require_str_names_the_field() {
        let doc = json!({"name": "", "count": 3});
        assert_eq!(require_str(&doc, "missing").unwrap_err(), "missing is required");
        assert_eq!(require_str(&doc, "name").unwrap_err(), "name must not be empty");
        assert_eq!(require_str(&doc, "count").unwrap_err(), "count must be a string");
        assert_eq!(require_str(&json!({"a": "x"}), "a").unwrap(), "x");
    }

    #[test]
    fn record_id_must_be_well_formed() {
        assert!(require_record_id(&json!({"id": "507f1f77bcf86cd799439011"})).is_ok());
        assert!(require_record_id(&json!({"id": "short"})).is_err());
        assert!(require_record_id(&json!({})).is_err());
    }
}
