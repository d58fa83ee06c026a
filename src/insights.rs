//! Display helpers for analysis results: condition severity and advice,
//! confidence bands and relative timestamps.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// How urgently a condition needs medical attention
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Usually self-limiting or treatable over the counter
    Low,
    /// Needs treatment or a consultation
    Medium,
    /// Needs prompt medical attention
    High,
}

/// Severity and advice for one condition label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ConditionInfo {
    /// Severity band
    pub severity: Severity,
    /// Short advice shown with the result
    pub description: &'static str,
}

/// Advice for labels the catalogue does not know
pub const UNKNOWN_CONDITION: ConditionInfo = ConditionInfo {
    severity: Severity::Medium,
    description: "Please consult a healthcare professional for proper diagnosis.",
};

const CATALOGUE: &[(&str, Severity, &str)] = &[
    ("Melanoma", Severity::High, "A serious form of skin cancer. Seek medical attention immediately."),
    ("Actinic Carcinoma", Severity::High, "A type of skin cancer. Consult a dermatologist."),
    ("Acne", Severity::Low, "Common skin condition. Usually treatable with over-the-counter products."),
    ("Atopic Dermatitis", Severity::Medium, "A chronic skin condition. May require prescription treatment."),
    ("Benign Tumors", Severity::Low, "Non-cancerous growth. Monitor for changes."),
    ("Bullous Disease", Severity::Medium, "Blistering skin disorder. Consult a dermatologist."),
    ("Cellulitis", Severity::Medium, "Bacterial skin infection. May require antibiotics."),
    ("Drug Eruptions", Severity::Medium, "Skin reaction to medication. Consult your doctor."),
    ("Eczema", Severity::Medium, "Inflammatory skin condition. Treatable with moisturizers and medications."),
    ("Herpes HPV", Severity::Medium, "Viral skin infection. Consult a healthcare provider."),
    ("Light Diseases", Severity::Medium, "Photodermatosis. Avoid sun exposure and use sunscreen."),
    ("Lupus", Severity::High, "Autoimmune disease. Requires medical supervision."),
    ("Poison IVY", Severity::Low, "Allergic skin reaction. Usually resolves with topical treatment."),
    ("Psoriasis", Severity::Medium, "Chronic autoimmune condition. Multiple treatment options available."),
    ("Ringworm", Severity::Low, "Fungal infection. Treatable with antifungal medication."),
    ("Systemic Disease", Severity::High, "May indicate underlying condition. Seek medical evaluation."),
    ("Urticarial Hives", Severity::Low, "Allergic reaction. Usually temporary and treatable."),
    ("Vascular Tumors", Severity::Medium, "Abnormal blood vessel growth. Monitor and consult specialist."),
    ("Vasculitis", Severity::Medium, "Inflammation of blood vessels. May require treatment."),
    ("Viral Infections", Severity::Low, "Viral skin condition. Often resolves on its own."),
];

/// Look up a condition label (exact match), falling back to [`UNKNOWN_CONDITION`]
pub fn condition_info(label: &str) -> ConditionInfo {
    CATALOGUE
        .iter()
        .find(|(name, _, _)| *name == label)
        .map(|&(_, severity, description)| ConditionInfo {
            severity,
            description,
        })
        .unwrap_or(UNKNOWN_CONDITION)
}

/// Confidence band of a prediction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Below 0.5
    Low,
    /// 0.5 up to 0.75
    Medium,
    /// 0.75 and above
    High,
}

impl ConfidenceLevel {
    /// Band for a probability in 0.0..=1.0
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.75 {
            ConfidenceLevel::High
        } else if confidence >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Whole-number percentage of a probability
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Human-friendly age of `timestamp` as seen at `now`
///
/// "Just now" under a minute, then minutes, then hours; after a day the
/// short date, with the year only when it differs from `now`'s.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp);

    if age.num_seconds() < 60 {
        return "Just now".to_string();
    }
    if age.num_minutes() < 60 {
        return plural(age.num_minutes(), "minute");
    }
    if age.num_hours() < 24 {
        return plural(age.num_hours(), "hour");
    }

    if timestamp.year() == now.year() {
        timestamp.format("%b %-d").to_string()
    } else {
        timestamp.format("%b %-d, %Y").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn known_and_unknown_conditions() {
        let melanoma = condition_info("Melanoma");
        assert_eq!(melanoma.severity, Severity::High);
        assert!(melanoma.description.contains("Seek medical attention"));

        assert_eq!(condition_info("Acne").severity, Severity::Low);
        assert_eq!(condition_info("melanoma"), UNKNOWN_CONDITION);
        assert_eq!(condition_info("Chickenpox"), UNKNOWN_CONDITION);
        assert_eq!(CATALOGUE.len(), 20);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(ConfidenceLevel::from_confidence(0.75), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.7499), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.49), ConfidenceLevel::Low);
        assert_eq!(confidence_percent(0.874), 87);
        assert_eq!(confidence_percent(0.875), 88);
    }

    #[test]
    fn relative_times() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        assert_eq!(format_relative(now - Duration::seconds(59), now), "Just now");
        assert_eq!(format_relative(now - Duration::seconds(60), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(format_relative(now - Duration::minutes(60), now), "1 hour ago");
        assert_eq!(format_relative(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_relative(now - Duration::days(3), now), "Jun 12");

        let last_year = Utc.with_ymd_and_hms(2023, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(format_relative(last_year, now), "Dec 31, 2023");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now + Duration::minutes(5), now), "Just now");
    }
}
