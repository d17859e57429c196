//! Single source of truth for field validation. Entity constructors call
//! [`validate_age`] and [`validate_email`]; form handlers in the terminal UI go
//! through [`validate`] and [`parse_age`] so raw text is checked by exactly the
//! same rules before an entity is ever built.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Fields a form can submit for checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Name,
    Age,
    Email,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Id => "ID",
            Field::Name => "Name",
            Field::Age => "Age",
            Field::Email => "Email",
        }
    }
}

pub fn validate_age(age: i64) -> Result<i64, ValidationError> {
    if age < 0 {
        return Err(ValidationError::NegativeAge(age));
    }
    Ok(age)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Parse free-form age input. Anything that is not a plain integer is rejected
/// with the raw text so the message can echo it back.
pub fn parse_age(raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(Field::Age.label()));
    }
    let age = trimmed
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidAge(trimmed.to_string()))?;
    validate_age(age)
}

/// Check one raw input value against the rules for `field`.
pub fn validate(field: Field, value: &str) -> Result<(), ValidationError> {
    match field {
        Field::Age => parse_age(value).map(|_| ()),
        Field::Email => {
            if value.trim().is_empty() {
                return Err(ValidationError::Required(field.label()));
            }
            validate_email(value.trim())
        }
        Field::Id | Field::Name => {
            if value.trim().is_empty() {
                Err(ValidationError::Required(field.label()))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero_and_positive_ages() {
        assert_eq!(validate_age(0), Ok(0));
        assert_eq!(validate_age(42), Ok(42));
    }

    #[test]
    fn rejects_negative_age() {
        assert_eq!(validate_age(-1), Err(ValidationError::NegativeAge(-1)));
    }

    #[test]
    fn email_shape() {
        for good in ["ann@x.com", "a.b+c@mail.example.org", "X_Y%z-1@sub.domain.io"] {
            assert!(validate_email(good).is_ok(), "{good} should pass");
        }
        for bad in ["", "ann", "ann@x", "ann@x.c", "@x.com", "ann@@x.com", "ann x@y.com", "ann@x.c0m"] {
            assert!(validate_email(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn parse_age_handles_text_input() {
        assert_eq!(parse_age(" 19 "), Ok(19));
        assert_eq!(
            parse_age("nineteen"),
            Err(ValidationError::InvalidAge("nineteen".into()))
        );
        assert_eq!(parse_age("-3"), Err(ValidationError::NegativeAge(-3)));
        assert_eq!(parse_age(""), Err(ValidationError::Required("Age")));
    }

    #[test]
    fn validate_required_fields() {
        assert_eq!(validate(Field::Id, "  "), Err(ValidationError::Required("ID")));
        assert_eq!(validate(Field::Name, ""), Err(ValidationError::Required("Name")));
        assert!(validate(Field::Name, "Ann").is_ok());
        assert!(validate(Field::Email, "ann@x.com").is_ok());
        assert!(validate(Field::Email, "nope").is_err());
    }
}
