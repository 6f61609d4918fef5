//! Primary-key normalization.
//!
//! The RM identifies records by a single normalized string key: the raw
//! primary-key field value, left-zero-padded to a fixed width. Normalization
//! makes keys comparable by plain string order, which is what `PageIndex`
//! implementations and the row lock table's "ascending key order" rule rely
//! on (see `resv_concurrency::lock`).

use thiserror::Error;

/// Default fixed width used when normalizing numeric-looking primary keys.
///
/// Chosen to comfortably hold the flight/hotel/car reservation keys used
/// throughout the test scenarios (`"1001"`..`"1099"` and similar) without
/// truncation.
pub const DEFAULT_KEY_WIDTH: usize = 12;

/// Errors raised while normalizing a raw primary-key value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The raw key was empty.
    #[error("primary key cannot be empty")]
    Empty,
    /// The raw key, after normalization, would not fit in `width` bytes.
    #[error("primary key {raw:?} is longer than the configured width {width}")]
    TooLong {
        /// The offending raw key.
        raw: String,
        /// The configured fixed width.
        width: usize,
    },
}

/// Normalize a raw primary-key value to a fixed-width, left-zero-padded
/// string of `width` bytes.
///
/// Non-numeric keys are left-padded with zeros the same way numeric ones
/// are; this only requires that `raw` be no longer than `width` once its
/// own bytes are counted, since the padding exists to make keys compare
/// correctly in ascending byte order regardless of their natural width.
pub fn normalize_key(raw: &str, width: usize) -> Result<String, KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty);
    }
    if raw.len() > width {
        return Err(KeyError::TooLong {
            raw: raw.to_string(),
            width,
        });
    }
    Ok(format!("{raw:0>width$}", width = width))
}

/// Normalize using [`DEFAULT_KEY_WIDTH`].
pub fn normalize_key_default(raw: &str) -> Result<String, KeyError> {
    normalize_key(raw, DEFAULT_KEY_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_numeric_keys() {
        assert_eq!(normalize_key("7", 4).unwrap(), "0007");
        assert_eq!(normalize_key("1005", 4).unwrap(), "1005");
    }

    #[test]
    fn pads_alpha_keys() {
        assert_eq!(normalize_key("CA1234", 10).unwrap(), "0000CA1234");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(normalize_key("", 4), Err(KeyError::Empty));
    }

    #[test]
    fn rejects_overlong() {
        assert!(matches!(
            normalize_key("toolong", 3),
            Err(KeyError::TooLong { .. })
        ));
    }

    #[test]
    fn ordering_is_preserved_for_equal_width_numerics() {
        let a = normalize_key("7", 4).unwrap();
        let b = normalize_key("42", 4).unwrap();
        let c = normalize_key("100", 4).unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
