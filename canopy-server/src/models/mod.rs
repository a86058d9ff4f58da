//! Domain input models with validation at construction
//!
//! Request values are checked when building these types.
//! Invalid input returns `FieldErrors`, not panic.

pub mod insect;
pub mod tree;
pub mod validation;

pub use insect::InsectFields;
pub use tree::TreeFields;
pub use validation::{FieldErrors, ValidationError};
