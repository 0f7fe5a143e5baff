//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths with
//! consistent error messages. All functions return structured errors from
//! [`crate::errors`].

use crate::errors::{GatacaError, Result};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input BAM", "Reference")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use gataca_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(GatacaError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a numeric parameter is strictly positive.
///
/// # Errors
/// Returns an error if `value <= 0`
pub fn validate_positive<T: PartialOrd + Default + Display>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(GatacaError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be > 0, got {value}"),
        });
    }
    Ok(())
}

/// Validate that a fraction lies in `[0, 1]`.
///
/// # Errors
/// Returns an error if the value is outside the unit interval or not a number
pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GatacaError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be between 0 and 1, got {value}"),
        });
    }
    Ok(())
}

/// Parse a `MIN,MAX` pair such as `--insert-size 200,400`.
///
/// # Errors
/// Returns an error if the value does not contain exactly two comma separated
/// integers, if either is negative, or if `MAX < MIN`.
///
/// # Example
/// ```
/// use gataca_lib::validation::parse_min_max;
///
/// assert_eq!(parse_min_max("200,400", "insert-size").unwrap(), (200, 400));
/// assert!(parse_min_max("400,200", "insert-size").is_err());
/// assert!(parse_min_max("200", "insert-size").is_err());
/// ```
pub fn parse_min_max(value: &str, name: &str) -> Result<(i64, i64)> {
    let invalid = |reason: String| GatacaError::InvalidParameter {
        parameter: name.to_string(),
        reason,
    };

    let Some((min, max)) = value.split_once(',') else {
        return Err(invalid(format!("expected MIN,MAX but got '{value}'")));
    };
    let min: i64 =
        min.trim().parse().map_err(|_| invalid(format!("'{min}' is not an integer")))?;
    let max: i64 =
        max.trim().parse().map_err(|_| invalid(format!("'{max}' is not an integer")))?;

    if min < 0 {
        return Err(invalid(format!("MIN must be >= 0, got {min}")));
    }
    validate_min_max(min, Some(max), &format!("{name} MIN"), &format!("{name} MAX"))?;
    Ok((min, max))
}

/// Validate that max >= min for optional max values
///
/// # Errors
/// Returns an error if max < min
pub fn validate_min_max<T: Ord + Display>(
    min_val: T,
    max_val: Option<T>,
    min_name: &str,
    max_name: &str,
) -> Result<()> {
    if let Some(max) = max_val {
        if max < min_val {
            return Err(GatacaError::InvalidParameter {
                parameter: max_name.to_string(),
                reason: format!("{max_name} ({max}) must be >= {min_name} ({min_val})"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_file_exists() -> anyhow::Result<()> {
        let file = NamedTempFile::new()?;
        validate_file_exists(file.path(), "Input BAM")?;
        let err = validate_file_exists("/no/such/file.bam", "Input BAM").unwrap_err();
        assert!(format!("{err}").contains("does not exist"));
        Ok(())
    }

    #[rstest]
    #[case(1, true)]
    #[case(100, true)]
    #[case(0, false)]
    #[case(-5, false)]
    fn test_validate_positive(#[case] value: i64, #[case] ok: bool) {
        assert_eq!(validate_positive(value, "window-size").is_ok(), ok);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.1, true)]
    #[case(1.0, true)]
    #[case(-0.01, false)]
    #[case(1.5, false)]
    #[case(f64::NAN, false)]
    fn test_validate_fraction(#[case] value: f64, #[case] ok: bool) {
        assert_eq!(validate_fraction(value, "insert-core").is_ok(), ok);
    }

    #[rstest]
    #[case("200,400", Some((200, 400)))]
    #[case(" 10 , 10 ", Some((10, 10)))]
    #[case("0,5", Some((0, 5)))]
    #[case("400,200", None)]
    #[case("-1,5", None)]
    #[case("a,5", None)]
    #[case("5", None)]
    #[case("1,2,3", None)]
    fn test_parse_min_max(#[case] input: &str, #[case] expected: Option<(i64, i64)>) {
        assert_eq!(parse_min_max(input, "insert-size").ok(), expected);
    }

    #[test]
    fn test_validate_min_max_message() {
        let err = validate_min_max(10, Some(5), "min", "max").unwrap_err();
        assert!(format!("{err}").contains("max (5) must be >= min (10)"));
        assert!(validate_min_max(1, None, "min", "max").is_ok());
    }
}
