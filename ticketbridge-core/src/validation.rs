//! Field validation for escalation payloads
//!
//! Shared by the ingest endpoint and the tool entry points so both surfaces
//! enforce identical constraints.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

static OA_KEY_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,64}$").ok());
static E164_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").ok());

fn matches(re: &Lazy<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Validate an external correlation key (6-64 chars of `[A-Za-z0-9_-]`).
pub fn validate_oa_key(value: &str) -> Result<(), ValidationError> {
    if matches(&OA_KEY_RE, value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "oaKey".to_string(),
            reason: "must be 6-64 characters of letters, digits, '_' or '-'".to_string(),
        })
    }
}

/// Validate an E.164 phone number such as `+12345678900`.
pub fn validate_caller_number(value: &str) -> Result<(), ValidationError> {
    if matches(&E164_RE, value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "callerNumber".to_string(),
            reason: "must be an E.164 phone number".to_string(),
        })
    }
}

/// Trait for validating non-empty strings.
pub trait ValidateNonEmpty {
    /// Fails with `RequiredFieldMissing` when the value is empty or whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        if self.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            });
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            }),
        }
    }
}

/// Confidence score in `[0.0, 1.0]` with two-decimal precision.
///
/// Stored as hundredths so equality and hashing are exact. Serialized as a
/// string with at most two and at least one decimal (`"0.0"`, `"0.5"`,
/// `"0.85"`); deserialization also accepts a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const MAX: Confidence = Confidence(100);

    /// Build from hundredths (0..=100).
    pub fn from_hundredths(hundredths: u8) -> Result<Self, ValidationError> {
        if hundredths > 100 {
            return Err(out_of_range(&format!("{}", f64::from(hundredths) / 100.0)));
        }
        Ok(Self(hundredths))
    }

    /// Build from a float, rounding to two decimals.
    pub fn from_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(out_of_range(&value.to_string()));
        }
        let hundredths = (value * 100.0).round();
        // Range-checked above, so the rounded value is within 0..=100.
        Ok(Self(hundredths as u8))
    }

    pub fn hundredths(&self) -> u8 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

fn out_of_range(value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: "confidence".to_string(),
        reason: format!("{} is not a number between 0.0 and 1.0", value),
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (units, hundredths) = (self.0 / 100, self.0 % 100);
        if hundredths % 10 == 0 {
            write!(f, "{}.{}", units, hundredths / 10)
        } else {
            write!(f, "{}.{:02}", units, hundredths)
        }
    }
}

impl FromStr for Confidence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: f64 = trimmed.parse().map_err(|_| out_of_range(trimmed))?;
        Self::from_f64(value)
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
            Raw::Number(number) => Confidence::from_f64(number).map_err(de::Error::custom),
        }
    }
}

#[cfg(feature = "openapi")]
impl utoipa::PartialSchema for Confidence {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        utoipa::openapi::ObjectBuilder::new()
            .schema_type(utoipa::openapi::schema::Type::String)
            .description(Some("Decimal between 0.0 and 1.0, two-decimal precision"))
            .into()
    }
}

#[cfg(feature = "openapi")]
impl utoipa::ToSchema for Confidence {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_oa_key_bounds() {
        assert!(validate_oa_key("oa-12345").is_ok());
        assert!(validate_oa_key("abc_DEF-123").is_ok());
        assert!(validate_oa_key("short").is_err());
        assert!(validate_oa_key(&"a".repeat(65)).is_err());
        assert!(validate_oa_key("has space1").is_err());
    }

    #[test]
    fn test_caller_number_e164() {
        assert!(validate_caller_number("+12345678900").is_ok());
        assert!(validate_caller_number("12345678900").is_err());
        assert!(validate_caller_number("+0123456").is_err());
        assert!(validate_caller_number("+1234567890123456").is_err());
    }

    #[test]
    fn test_confidence_display_shortest_form() {
        assert_eq!(Confidence::ZERO.to_string(), "0.0");
        assert_eq!(Confidence::MAX.to_string(), "1.0");
        assert_eq!(Confidence(7).to_string(), "0.07");
        assert_eq!("0.85".parse::<Confidence>().map(|c| c.to_string()), Ok("0.85".to_string()));
        assert_eq!("0.5".parse::<Confidence>().map(|c| c.to_string()), Ok("0.5".to_string()));
        assert_eq!("0.50".parse::<Confidence>().map(|c| c.to_string()), Ok("0.5".to_string()));
        assert_eq!("1".parse::<Confidence>().map(|c| c.to_string()), Ok("1.0".to_string()));
    }

    #[test]
    fn test_confidence_rejects_out_of_range() {
        assert!("1.01".parse::<Confidence>().is_err());
        assert!("-0.1".parse::<Confidence>().is_err());
        assert!("high".parse::<Confidence>().is_err());
        assert!("NaN".parse::<Confidence>().is_err());
    }

    #[test]
    fn test_confidence_serde_accepts_string_and_number() {
        let from_str: Result<Confidence, _> = serde_json::from_str("\"0.85\"");
        let from_num: Result<Confidence, _> = serde_json::from_str("0.85");
        assert_eq!(from_str.ok(), Some(Confidence(85)));
        assert_eq!(from_num.ok(), Some(Confidence(85)));
        assert_eq!(
            serde_json::to_string(&Confidence(7)).ok(),
            Some("\"0.07\"".to_string())
        );
    }

    #[test]
    fn test_validate_non_empty() {
        assert!("  ".validate_non_empty("note").is_err());
        assert!(Some("x".to_string()).validate_non_empty("note").is_ok());
        assert!(None::<String>.validate_non_empty("note").is_err());
    }

    proptest! {
        #[test]
        fn prop_confidence_display_parses_back(hundredths in 0u8..=100) {
            let confidence = Confidence::from_hundredths(hundredths).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let parsed: Confidence = confidence.to_string().parse().map_err(|e: ValidationError| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(parsed, confidence);
        }
    }
}
