//! RM configuration.

/// Per-RM configuration: which field is the primary key, and the page
/// layout used to bucket keys for bulk load/write-back.
#[derive(Debug, Clone)]
pub struct RmConfig {
    /// The field name in every record that holds its primary key value.
    pub primary_key_field: String,
    /// Fixed width, in characters, that primary keys are left-zero-padded
    /// to after normalization.
    pub key_width: usize,
    /// Number of consecutive normalized keys grouped into one page.
    pub page_size: u64,
}

impl RmConfig {
    /// Build a config for a table keyed on `primary_key_field`, with the
    /// given key width and page size.
    pub fn new(primary_key_field: impl Into<String>, key_width: usize, page_size: u64) -> Self {
        RmConfig {
            primary_key_field: primary_key_field.into(),
            key_width,
            page_size,
        }
    }
}

impl Default for RmConfig {
    /// 12-character keys, 100 keys per page — matches the default width
    /// used across the reservation test fixtures.
    fn default() -> Self {
        RmConfig::new("id", 12, 100)
    }
}

impl RmConfig {
    /// Build from `RESV_RM_*` environment variables, falling back to
    /// [`RmConfig::default`] field-by-field for anything unset or
    /// unparsable.
    pub fn from_env() -> Self {
        let default = RmConfig::default();
        RmConfig {
            primary_key_field: std::env::var("RESV_RM_PRIMARY_KEY_FIELD")
                .unwrap_or(default.primary_key_field),
            key_width: std::env::var("RESV_RM_KEY_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.key_width),
            page_size: std::env::var("RESV_RM_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.page_size),
        }
    }
}
