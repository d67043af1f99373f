//! Order description value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::OrderError;

/// Maximum description length after trimming.
const MAX_LEN: usize = 500;

/// Free-text order description, 1-500 characters, stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderDescription(String);

impl OrderDescription {
    /// Create a description from raw input.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidValue`] if the trimmed text is empty
    /// or longer than 500 characters.
    pub fn new(value: &str) -> Result<Self, OrderError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(OrderError::InvalidValue {
                field: "description",
                message: "description cannot be empty".to_string(),
            });
        }
        if trimmed.chars().count() > MAX_LEN {
            return Err(OrderError::InvalidValue {
                field: "description",
                message: format!("description cannot exceed {MAX_LEN} characters"),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_trims_input() {
        let d = OrderDescription::new("  two books  ").unwrap();
        assert_eq!(d.as_str(), "two books");
    }

    #[test]
    fn description_rejects_empty() {
        assert!(OrderDescription::new("").is_err());
        assert!(OrderDescription::new("   ").is_err());
    }

    #[test]
    fn description_rejects_over_500_chars() {
        let long = "x".repeat(501);
        assert!(OrderDescription::new(&long).is_err());
        let max = "x".repeat(500);
        assert!(OrderDescription::new(&max).is_ok());
    }
}
