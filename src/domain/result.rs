//! Result type alias for Vigil

use super::errors::VigilError;

/// Result type alias for Vigil operations
///
/// # Examples
///
/// ```
/// use vigil::domain::result::Result;
/// use vigil::domain::errors::VigilError;
///
/// fn failing_function() -> Result<()> {
///     Err(VigilError::Validation("Invalid input".to_string()))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, VigilError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{PersistenceError, VigilError};

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_sub_error_converts_with_question_mark() {
        fn inner() -> Result<()> {
            Err(PersistenceError::Unavailable("offline".to_string()))?;
            Ok(())
        }

        assert!(matches!(inner(), Err(VigilError::Persistence(_))));
    }
}
