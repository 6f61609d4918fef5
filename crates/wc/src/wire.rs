//! HTTP request/response shapes and the error-kind-to-status-code mapping
//! from the external interface contract. No listener is wired up here —
//! these are the serde shapes a future `axum`/`hyper` front end would bind
//! to, plus the pure mapping function that front end would call.

use resv_core::RmErrorKind;
use serde::{Deserialize, Serialize};

/// `POST /flights/{num}/reservations`, `POST /hotels/{loc}/reservations`,
/// `POST /cars/{loc}/reservations` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    /// Customer name to attach the reservation record to.
    pub cust_name: String,
    /// Number of units to reserve. Defaults to 1 to match the single-unit
    /// reservation the business scenarios exercise.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Successful reservation response body.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveResponse {
    /// Always `true`; failures are reported as `ApiError` instead.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Remaining inventory after the reservation, if the RM reported one.
    pub num_avail: Option<i64>,
}

/// The JSON body returned for any WC-level failure.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Additional detail, if any.
    pub details: Option<String>,
    /// The xid in flight when the failure occurred, if any.
    pub xid: Option<u64>,
}

/// `POST /txn/commit` response body, per the TM external interface.
#[derive(Debug, Clone, Serialize)]
pub struct TmCommitResponse {
    /// The transaction this decision applies to.
    pub xid: u64,
    /// One of `"COMMITTED"`, `"ABORTED"`, `"IN_DOUBT"`.
    pub status: String,
}

/// HTTP status code an RM would report a given error kind under, per the
/// external interface contract: 404 for missing key, 409 for conflict
/// kinds, 400 for txn-state errors, 500 for a broken invariant, 503 for
/// I/O/timeout, 200 otherwise (logical failures reported in body).
pub fn status_code_for(kind: &RmErrorKind) -> u16 {
    match kind {
        RmErrorKind::KeyNotFound => 404,
        RmErrorKind::KeyExists | RmErrorKind::LockConflict | RmErrorKind::VersionConflict | RmErrorKind::ReadWriteConflict => 409,
        RmErrorKind::TxnNotFound | RmErrorKind::InvalidTxState | RmErrorKind::InvalidArgument => 400,
        RmErrorKind::InternalInvariant => 500,
        RmErrorKind::IoError | RmErrorKind::Timeout => 503,
        RmErrorKind::UnknownError => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kinds_map_to_409() {
        assert_eq!(status_code_for(&RmErrorKind::KeyExists), 409);
        assert_eq!(status_code_for(&RmErrorKind::VersionConflict), 409);
        assert_eq!(status_code_for(&RmErrorKind::LockConflict), 409);
    }

    #[test]
    fn missing_key_maps_to_404() {
        assert_eq!(status_code_for(&RmErrorKind::KeyNotFound), 404);
    }

    #[test]
    fn txn_state_errors_map_to_400() {
        assert_eq!(status_code_for(&RmErrorKind::TxnNotFound), 400);
        assert_eq!(status_code_for(&RmErrorKind::InvalidTxState), 400);
    }

    #[test]
    fn broken_invariant_maps_to_500() {
        assert_eq!(status_code_for(&RmErrorKind::InternalInvariant), 500);
    }
}
