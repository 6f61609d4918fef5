//! Small interactive demo binary wiring an RM pair, a TM, and the WC
//! orchestration contract together in one process. Not a production
//! launcher — the RM/TM HTTP surfaces in §6 are out of scope here; this
//! just exercises the same algorithms the tests do, with output a human
//! can read.

use resv_core::{normalize_key, FieldValue, Record};
use resv_rm::{RmConfig, ResourceManager};
use resv_storage::{InMemoryPageIo, LinearPageIndex};
use resv_tm::{TmConfig, TransactionManager};
use resv_wc::{NamedResourceManager, ReservationType, WcConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;
use tracing::info;

type Rm = NamedResourceManager<LinearPageIndex, InMemoryPageIo>;

fn open_rm(name: &str, dir: &std::path::Path) -> Arc<Rm> {
    let rm = ResourceManager::open(
        RmConfig::default(),
        LinearPageIndex::new(100, 12),
        InMemoryPageIo::new(),
        dir.join(format!("{name}.prepared.json")),
    )
    .expect("open RM");
    Arc::new(NamedResourceManager::new(name, rm))
}

fn seed(rm: &Rm, id: i64, num_avail: i64) {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), FieldValue::Int(id));
    fields.insert("numAvail".to_string(), FieldValue::Int(num_avail));
    rm.inner().insert(0, Record::new(fields)).expect("seed insert");
    rm.inner().prepare(0).expect("seed prepare");
    rm.inner().commit(0).expect("seed commit");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = tempdir().expect("tempdir");
    let flights = open_rm("rm-flight", dir.path());
    let customers = open_rm("rm-customer", dir.path());
    seed(&flights, 1234, 2);

    let tm = TransactionManager::open(TmConfig::default(), dir.path().join("decisions.json")).expect("open TM");
    tm.register_participant(flights.clone());
    tm.register_participant(customers.clone());

    let config = WcConfig::default();
    let flight_key = normalize_key("1234", 12).expect("normalize demo key");

    info!("reserving seat 1 of 2 for Alice");
    match resv_wc::reserve(&tm, flights.as_ref(), customers.as_ref(), &config, ReservationType::Flight, &flight_key, "Alice", 1) {
        Ok(outcome) => println!("Alice reserved flight {flight_key}: {} seats remain", outcome.num_avail.unwrap_or(-1)),
        Err(e) => println!("Alice's reservation failed: {e}"),
    }

    info!("reserving seat 2 of 2 for Bob");
    match resv_wc::reserve(&tm, flights.as_ref(), customers.as_ref(), &config, ReservationType::Flight, &flight_key, "Bob", 1) {
        Ok(outcome) => println!("Bob reserved flight {flight_key}: {} seats remain", outcome.num_avail.unwrap_or(-1)),
        Err(e) => println!("Bob's reservation failed: {e}"),
    }

    info!("reserving a third seat for Carol, expecting a conflict");
    match resv_wc::reserve(&tm, flights.as_ref(), customers.as_ref(), &config, ReservationType::Flight, &flight_key, "Carol", 1) {
        Ok(outcome) => println!("Carol reserved flight {flight_key}: {} seats remain", outcome.num_avail.unwrap_or(-1)),
        Err(e) => println!("Carol's reservation failed as expected: {e}"),
    }
}
