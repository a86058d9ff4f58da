//! Insect input validation

use super::FieldErrors;

/// Validated field set for creating or fully replacing an insect.
///
/// `fact` is only written on create; updates leave the stored value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct InsectFields {
    pub name: String,
    pub description: Option<String>,
    pub territory: Option<String>,
    pub millimeters: Option<f64>,
    pub fact: Option<String>,
}

impl InsectFields {
    pub fn new(
        name: Option<&str>,
        description: Option<String>,
        territory: Option<String>,
        millimeters: Option<f64>,
        fact: Option<String>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = errors.require_name("name", name);
        errors.check_text("description", &description);
        errors.check_text("territory", &territory);
        errors.check_measure("millimeters", millimeters);
        errors.check_text("fact", &fact);

        errors.into_result(Self {
            name,
            description,
            territory,
            millimeters,
            fact,
        })
    }
}
