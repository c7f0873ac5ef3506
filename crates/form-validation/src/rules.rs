//! Validation rules
//!
//! One function per constraint family. Each returns the first failing check
//! as a [`RuleResult`]; custom messages from the schema replace the defaults.

use chrono::NaiveDate;
use dashmap::DashMap;
use form_ir::{DATE_FORMAT, FormValue};
use form_schema::{Bound, Constraints, StringFormat};
use regex::Regex;
use std::sync::LazyLock;

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$";
const URL_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+[^\s]*$";

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN));
static URL_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(URL_PATTERN));

/// Schema patterns, compiled on first use
static PATTERNS: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(re) = PATTERNS.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    PATTERNS.insert(pattern.to_string(), re.clone());
    Ok(re)
}

/// Validation rule result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }

    fn check<T>(ok: bool, bound: &Bound<T>, default: impl FnOnce() -> String) -> Self {
        if ok {
            Self::valid()
        } else {
            Self::invalid(bound.message_or(default))
        }
    }

    /// Keep the first failure
    #[must_use]
    pub fn and_then(self, next: impl FnOnce() -> RuleResult) -> Self {
        if self.is_valid { next() } else { self }
    }
}

/// Validate that a value is present
#[must_use]
pub fn validate_required(value: &FormValue, constraints: &Constraints) -> RuleResult {
    if value.is_null() && !constraints.optional {
        return RuleResult::invalid(
            constraints
                .required_message
                .clone()
                .unwrap_or_else(|| "Required".to_string()),
        );
    }
    RuleResult::valid()
}

/// Validate string length, counted in characters
#[must_use]
pub fn validate_length(value: &str, constraints: &Constraints) -> RuleResult {
    let len = value.chars().count();

    if let Some(min) = &constraints.min_length {
        if len < min.value {
            return RuleResult::check(false, min, || {
                format!("String must contain at least {} character(s)", min.value)
            });
        }
    }

    if let Some(max) = &constraints.max_length {
        if len > max.value {
            return RuleResult::check(false, max, || {
                format!("String must contain at most {} character(s)", max.value)
            });
        }
    }

    RuleResult::valid()
}

/// Validate pattern matching using regex
#[must_use]
pub fn validate_pattern(value: &str, pattern: &Bound<String>) -> RuleResult {
    match compiled_pattern(&pattern.value) {
        Ok(re) => RuleResult::check(re.is_match(value), pattern, || "Invalid".to_string()),
        Err(e) => RuleResult::invalid(format!("Invalid regex pattern '{}': {e}", pattern.value)),
    }
}

/// Validate a well-known string format
#[must_use]
pub fn validate_format(value: &str, format: &Bound<StringFormat>) -> RuleResult {
    let (matcher, name) = match format.value {
        StringFormat::Email => (&EMAIL_RE, "email"),
        StringFormat::Url => (&URL_RE, "url"),
    };
    let ok = match &**matcher {
        Ok(re) => re.is_match(value) && !(name == "email" && has_bad_dots(value)),
        Err(_) => false,
    };
    RuleResult::check(ok, format, || format!("Invalid {name}"))
}

/// Local part may not start with a dot or contain consecutive dots
fn has_bad_dots(email: &str) -> bool {
    email.starts_with('.') || email.contains("..")
}

/// Validate numeric bounds
#[must_use]
pub fn validate_range(value: f64, constraints: &Constraints) -> RuleResult {
    if let Some(min) = &constraints.min {
        if value < min.value {
            return RuleResult::check(false, min, || {
                format!("Number must be greater than or equal to {}", min.value)
            });
        }
    }

    if let Some(max) = &constraints.max {
        if value > max.value {
            return RuleResult::check(false, max, || {
                format!("Number must be less than or equal to {}", max.value)
            });
        }
    }

    RuleResult::valid()
}

/// Validate the integer constraint
#[must_use]
pub fn validate_integer(value: f64, constraints: &Constraints) -> RuleResult {
    if constraints.integer && value.fract() != 0.0 {
        return RuleResult::invalid("Expected integer, received float");
    }
    RuleResult::valid()
}

/// Validate that a number is a multiple of the step
#[must_use]
pub fn validate_step(value: f64, constraints: &Constraints) -> RuleResult {
    let Some(step) = &constraints.step else {
        return RuleResult::valid();
    };
    RuleResult::check(is_multiple(value, step.value), step, || {
        format!("Number must be a multiple of {}", step.value)
    })
}

/// Tolerant multiple check so `0.3` is a multiple of `0.1`
fn is_multiple(value: f64, step: f64) -> bool {
    let ratio = value / step;
    let tolerance = 1e-9 * ratio.abs().max(1.0);
    (ratio - ratio.round()).abs() <= tolerance
}

/// Validate date bounds; `today` resolves `Today` bounds
#[must_use]
pub fn validate_date_range(value: NaiveDate, constraints: &Constraints, today: NaiveDate) -> RuleResult {
    if let Some(min) = &constraints.min_date {
        let lo = min.value.resolve(today);
        if value < lo {
            return RuleResult::check(false, min, || {
                format!("Date must be greater than or equal to {}", lo.format(DATE_FORMAT))
            });
        }
    }

    if let Some(max) = &constraints.max_date {
        let hi = max.value.resolve(today);
        if value > hi {
            return RuleResult::check(false, max, || {
                format!("Date must be smaller than or equal to {}", hi.format(DATE_FORMAT))
            });
        }
    }

    RuleResult::valid()
}

/// Validate array item counts
#[must_use]
pub fn validate_items(count: usize, constraints: &Constraints) -> RuleResult {
    if let Some(min) = &constraints.min_items {
        if count < min.value {
            return RuleResult::check(false, min, || {
                format!("Array must contain at least {} element(s)", min.value)
            });
        }
    }

    if let Some(max) = &constraints.max_items {
        if count > max.value {
            return RuleResult::check(false, max, || {
                format!("Array must contain at most {} element(s)", max.value)
            });
        }
    }

    RuleResult::valid()
}
