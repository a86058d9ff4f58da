//! Validation error types

use std::fmt;

/// Maximum length for names and free-text fields
pub const MAX_TEXT_LEN: usize = 255;

/// Validation error for a single field
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required field was not supplied
    Missing { field: &'static str },

    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Measurement below zero
    Negative { field: &'static str },

    /// Measurement is NaN or infinite
    NotFinite { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{} is required", field),
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::Negative { field } => write!(f, "{} cannot be negative", field),
            Self::NotFinite { field } => write!(f, "{} must be a finite number", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Every field failure found while building a record.
///
/// Displays as the individual messages joined by `", "`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Vec<ValidationError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Check a required name field, returning the trimmed value.
    pub(crate) fn require_name(&mut self, field: &'static str, value: Option<&str>) -> String {
        let Some(value) = value else {
            self.push(ValidationError::Missing { field });
            return String::new();
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(ValidationError::Empty { field });
        } else if trimmed.chars().count() > MAX_TEXT_LEN {
            self.push(ValidationError::TooLong {
                field,
                max: MAX_TEXT_LEN,
            });
        }
        trimmed.to_owned()
    }

    pub(crate) fn check_text(&mut self, field: &'static str, value: &Option<String>) {
        if let Some(value) = value {
            if value.chars().count() > MAX_TEXT_LEN {
                self.push(ValidationError::TooLong {
                    field,
                    max: MAX_TEXT_LEN,
                });
            }
        }
    }

    pub(crate) fn check_measure(&mut self, field: &'static str, value: Option<f64>) {
        match value {
            Some(v) if !v.is_finite() => self.push(ValidationError::NotFinite { field }),
            Some(v) if v < 0.0 => self.push(ValidationError::Negative { field }),
            _ => {}
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl From<ValidationError> for FieldErrors {
    fn from(e: ValidationError) -> Self {
        Self(vec![e])
    }
}
