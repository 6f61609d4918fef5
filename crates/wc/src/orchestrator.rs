//! Cross-RM reservation logic: deduct inventory at the resource RM, add a
//! reservation record at the customer RM, as one TM transaction.
//!
//! `reserve_flight`/`reserve_hotel`/`reserve_car` were three near-identical
//! methods differing only in which RM and which `resvType` tag they used;
//! collapsed here into one `reserve` parameterized over the resource kind,
//! since the duplication bought nothing once the resource RM is behind a
//! trait object.

use crate::config::WcConfig;
use crate::error::WcError;
use crate::rm_handle::RmHandle;
use resv_core::{FieldValue, Record, Xid};
use resv_tm::TransactionManager;
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

/// Which kind of inventory a reservation draws from. Threaded into the
/// customer RM's `resvType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationType {
    /// A flight seat.
    Flight,
    /// A hotel room.
    Hotel,
    /// A rental car.
    Car,
}

impl ReservationType {
    fn as_str(&self) -> &'static str {
        match self {
            ReservationType::Flight => "FLIGHT",
            ReservationType::Hotel => "HOTEL",
            ReservationType::Car => "CAR",
        }
    }
}

/// Successful reservation outcome.
#[derive(Debug, Clone)]
pub struct ReservationOutcome {
    /// Inventory remaining at the resource RM after the deduction.
    pub num_avail: Option<i64>,
}

/// Reserve one unit of a resource for a customer, as a single TM
/// transaction spanning `resource_rm` and `customer_rm`.
///
/// Contract (see the business-layer orchestration contract): obtains `xid`
/// from `tm`, threads it through both RM calls, and on any RM failure
/// auto-aborts (if `config.auto_abort_on_error`) before re-raising the
/// original error. Abort failures are logged, never raised. On success,
/// commits exactly once and maps `IN_DOUBT` to `WcError::InDoubt`.
#[instrument(skip(tm, resource_rm, customer_rm, config))]
pub fn reserve(
    tm: &TransactionManager,
    resource_rm: &dyn RmHandle,
    customer_rm: &dyn RmHandle,
    config: &WcConfig,
    resv_type: ReservationType,
    resource_key: &str,
    cust_name: &str,
    quantity: i64,
) -> Result<ReservationOutcome, WcError> {
    let xid = tm.start();
    info!(xid, resource_key, cust_name, "starting reservation");

    match reserve_inner(tm, resource_rm, customer_rm, xid, resv_type, resource_key, cust_name, quantity) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            error!(xid, resource_key, cust_name, error = %err, "reservation failed");
            if config.auto_abort_on_error {
                warn!(xid, "auto-aborting transaction");
                if let Err(abort_err) = tm.abort(xid) {
                    error!(xid, error = %abort_err, "auto-abort failed");
                }
            }
            Err(err)
        }
    }
}

fn reserve_inner(
    tm: &TransactionManager,
    resource_rm: &dyn RmHandle,
    customer_rm: &dyn RmHandle,
    xid: Xid,
    resv_type: ReservationType,
    resource_key: &str,
    cust_name: &str,
    quantity: i64,
) -> Result<ReservationOutcome, WcError> {
    info!(xid, resource_key, "step 1: deducting inventory");
    let current = resource_rm
        .read(xid, resource_key)
        .map_err(|e| WcError::from_rm_error(resource_rm.name(), resource_key, xid, e))?;
    let num_avail = current
        .fields
        .get("numAvail")
        .and_then(FieldValue::as_int)
        .ok_or_else(|| WcError::Validation(format!("{resource_key} has no numAvail field")))?;
    if num_avail < quantity {
        return Err(WcError::ResourceConflict {
            resource_type: resource_rm.name().to_string(),
            resource_key: resource_key.to_string(),
            message: format!("insufficient inventory: {num_avail} available, {quantity} requested"),
        });
    }
    // A networked RM enlists itself with the TM on its own first write; this
    // in-process store has no channel back to the TM to do that, so the WC
    // enlists on the RM's behalf immediately before its first write call.
    tm.enlist(xid, resource_rm.name())?;
    let mut patch = BTreeMap::new();
    patch.insert("numAvail".to_string(), FieldValue::Int(num_avail - quantity));
    resource_rm
        .update(xid, resource_key, patch)
        .map_err(|e| WcError::from_rm_error(resource_rm.name(), resource_key, xid, e))?;

    info!(xid, cust_name, "step 2: adding reservation record");
    tm.enlist(xid, customer_rm.name())?;
    let mut fields = BTreeMap::new();
    fields.insert("custName".to_string(), FieldValue::Str(cust_name.to_string()));
    fields.insert("resvType".to_string(), FieldValue::Str(resv_type.as_str().to_string()));
    fields.insert("resvKey".to_string(), FieldValue::Str(resource_key.to_string()));
    customer_rm
        .insert(xid, Record::new(fields))
        .map_err(|e| WcError::from_rm_error(customer_rm.name(), resource_key, xid, e))?;

    info!(xid, resource_key, cust_name, "reservation staged, committing");
    match tm.commit(xid)? {
        resv_tm::TmStatus::Committed => Ok(ReservationOutcome {
            num_avail: Some(num_avail - quantity),
        }),
        resv_tm::TmStatus::Aborted => Err(WcError::Reservation(format!(
            "transaction {xid} aborted during commit"
        ))),
        resv_tm::TmStatus::InDoubt => Err(WcError::InDoubt(xid)),
        resv_tm::TmStatus::Active => Err(WcError::Reservation(format!(
            "transaction {xid} still active after commit call"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rm_handle::NamedResourceManager;
    use resv_rm::{RmConfig, ResourceManager};
    use resv_storage::{InMemoryPageIo, LinearPageIndex};
    use resv_tm::TmConfig;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn flight_rm(dir: &std::path::Path) -> Arc<NamedResourceManager<LinearPageIndex, InMemoryPageIo>> {
        let rm = ResourceManager::open(
            RmConfig::new("id", 4, 100),
            LinearPageIndex::new(100, 4),
            InMemoryPageIo::new(),
            dir.join("flights.json"),
        )
        .unwrap();
        Arc::new(NamedResourceManager::new("rm-flight", rm))
    }

    fn customer_rm(dir: &std::path::Path) -> Arc<NamedResourceManager<LinearPageIndex, InMemoryPageIo>> {
        let rm = ResourceManager::open(
            RmConfig::new("id", 4, 100),
            LinearPageIndex::new(100, 4),
            InMemoryPageIo::new(),
            dir.join("customers.json"),
        )
        .unwrap();
        Arc::new(NamedResourceManager::new("rm-customer", rm))
    }

    fn seed_flight(rm: &NamedResourceManager<LinearPageIndex, InMemoryPageIo>, id: i64, num_avail: i64) {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), FieldValue::Int(id));
        fields.insert("numAvail".to_string(), FieldValue::Int(num_avail));
        rm.inner().insert(0, Record::new(fields)).unwrap();
        rm.inner().prepare(0).unwrap();
        rm.inner().commit(0).unwrap();
    }

    #[test]
    fn successful_reservation_commits_both_rms() {
        let dir = tempdir().unwrap();
        let flights = flight_rm(dir.path());
        let customers = customer_rm(dir.path());
        seed_flight(&flights, 42, 10);

        let tm = TransactionManager::open(TmConfig::default(), dir.path().join("decisions.json")).unwrap();
        tm.register_participant(flights.clone());
        tm.register_participant(customers.clone());

        let config = WcConfig::default();
        let outcome = reserve(
            &tm,
            flights.as_ref(),
            customers.as_ref(),
            &config,
            ReservationType::Flight,
            "0042",
            "Alice",
            1,
        )
        .unwrap();

        assert_eq!(outcome.num_avail, Some(9));
        let got = flights.inner().read(99, "0042").unwrap();
        assert_eq!(got.fields.get("numAvail").unwrap().as_int(), Some(9));
    }

    #[test]
    fn insufficient_inventory_auto_aborts_and_leaves_no_partial_write() {
        let dir = tempdir().unwrap();
        let flights = flight_rm(dir.path());
        let customers = customer_rm(dir.path());
        seed_flight(&flights, 42, 0);

        let tm = TransactionManager::open(TmConfig::default(), dir.path().join("decisions.json")).unwrap();
        tm.register_participant(flights.clone());
        tm.register_participant(customers.clone());

        let config = WcConfig::default();
        let err = reserve(
            &tm,
            flights.as_ref(),
            customers.as_ref(),
            &config,
            ReservationType::Flight,
            "0042",
            "Bob",
            1,
        )
        .unwrap_err();

        assert!(matches!(err, WcError::ResourceConflict { .. }));
        let got = flights.inner().read(99, "0042").unwrap();
        assert_eq!(got.fields.get("numAvail").unwrap().as_int(), Some(0));
    }

    #[test]
    fn missing_resource_is_reported_and_transaction_is_aborted() {
        let dir = tempdir().unwrap();
        let flights = flight_rm(dir.path());
        let customers = customer_rm(dir.path());

        let tm = TransactionManager::open(TmConfig::default(), dir.path().join("decisions.json")).unwrap();
        tm.register_participant(flights.clone());
        tm.register_participant(customers.clone());

        let config = WcConfig::default();
        let err = reserve(
            &tm,
            flights.as_ref(),
            customers.as_ref(),
            &config,
            ReservationType::Flight,
            "9999",
            "Carol",
            1,
        )
        .unwrap_err();

        assert!(matches!(err, WcError::ResourceNotFound { .. }));
    }
}
