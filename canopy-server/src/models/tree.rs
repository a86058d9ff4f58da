//! Tree input validation

use super::FieldErrors;

/// Validated field set for creating or fully replacing a tree.
///
/// Optional fields left as `None` are stored as NULL, so an update
/// clears anything the caller did not send.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeFields {
    pub name: String,
    pub location: Option<String>,
    pub height_ft: Option<f64>,
    pub ground_circumference_ft: Option<f64>,
}

impl TreeFields {
    /// Build from request values (`name`, `location`, `height`, `size`).
    ///
    /// # Example
    /// ```
    /// use canopy_server::models::TreeFields;
    ///
    /// assert!(TreeFields::new(Some("Stagg"), None, Some(243.0), Some(109.0)).is_ok());
    /// assert!(TreeFields::new(None, None, None, None).is_err());
    /// ```
    pub fn new(
        name: Option<&str>,
        location: Option<String>,
        height: Option<f64>,
        size: Option<f64>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = errors.require_name("name", name);
        errors.check_text("location", &location);
        errors.check_measure("height", height);
        errors.check_measure("size", size);

        errors.into_result(Self {
            name,
            location,
            height_ft: height,
            ground_circumference_ft: size,
        })
    }
}
