#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use vinyldns_webhook::{
    vinyldns::{RecordData, RecordDirectory, RecordSet, RecordSetChange, Zone},
    ClientError, VinylDnsProvider, ZoneIdFilter,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListZones,
    ListRecordSets(String),
    Create(String, RecordSet),
    Update(String, RecordSet),
    Delete(String, String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Create(..) | Call::Update(..) | Call::Delete(..))
    }
}

/// In-memory record directory that records every call made to it.
#[derive(Default)]
pub struct FakeDirectory {
    pub zones: Vec<Zone>,
    pub record_sets: HashMap<String, Vec<RecordSet>>,
    pub fail_list_zones: bool,
    /// Zone IDs whose record set listing fails
    pub fail_record_sets: HashSet<String>,
    /// Zone IDs whose record set listing never completes
    pub stall_record_sets: HashSet<String>,
    /// Record set names (create/update) or IDs (delete) whose mutation fails
    pub fail_mutations: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeDirectory {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones, ..Default::default() }
    }

    pub fn with_records(mut self, zone_id: &str, records: Vec<RecordSet>) -> Self {
        self.record_sets.insert(zone_id.to_string(), records);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn ack(kind: &str) -> RecordSetChange {
        RecordSetChange {
            id: Some("change-1".into()),
            status: Some("Pending".into()),
            change_type: Some(kind.into()),
        }
    }
}

#[async_trait]
impl RecordDirectory for FakeDirectory {
    async fn list_zones(&self) -> Result<Vec<Zone>, ClientError> {
        self.record(Call::ListZones);
        if self.fail_list_zones {
            return Err(ClientError::Other("zones unavailable".into()));
        }
        Ok(self.zones.clone())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>, ClientError> {
        self.record(Call::ListRecordSets(zone_id.to_string()));
        if self.stall_record_sets.contains(zone_id) {
            std::future::pending::<()>().await;
        }
        if self.fail_record_sets.contains(zone_id) {
            return Err(ClientError::Other(format!("record sets of {zone_id} unavailable")));
        }
        Ok(self.record_sets.get(zone_id).cloned().unwrap_or_default())
    }

    async fn create_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError> {
        self.record(Call::Create(zone_id.to_string(), record_set.clone()));
        if self.fail_mutations.contains(&record_set.name) {
            return Err(ClientError::Other("create rejected".into()));
        }
        Ok(Self::ack("Create"))
    }

    async fn update_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError> {
        self.record(Call::Update(zone_id.to_string(), record_set.clone()));
        if self.fail_mutations.contains(&record_set.name) {
            return Err(ClientError::Other("update rejected".into()));
        }
        Ok(Self::ack("Update"))
    }

    async fn delete_record_set(
        &self,
        zone_id: &str,
        record_set_id: &str,
    ) -> Result<RecordSetChange, ClientError> {
        self.record(Call::Delete(zone_id.to_string(), record_set_id.to_string()));
        if self.fail_mutations.contains(record_set_id) {
            return Err(ClientError::Other("delete rejected".into()));
        }
        Ok(Self::ack("Delete"))
    }
}

// ── fixtures ─────────────────────────────────────────────────────────────────

pub fn zone(id: &str, name: &str) -> Zone {
    Zone { id: id.into(), name: name.into() }
}

pub fn record_set(id: &str, zone_id: &str, name: &str, rtype: &str, ttl: u32, records: Vec<RecordData>) -> RecordSet {
    RecordSet {
        id: Some(id.into()),
        zone_id: zone_id.into(),
        name: name.into(),
        record_type: rtype.into(),
        ttl,
        records,
    }
}

pub fn address(ip: &str) -> RecordData {
    RecordData { address: Some(ip.into()), ..Default::default() }
}

pub fn cname(target: &str) -> RecordData {
    RecordData { cname: Some(target.into()), ..Default::default() }
}

/// The two-zone layout used throughout: "0" example.com, "1" example-beta.com.
pub fn example_directory() -> FakeDirectory {
    FakeDirectory::new(vec![zone("0", "example.com"), zone("1", "example-beta.com")])
        .with_records(
            "0",
            vec![
                record_set("r0", "0", "www", "A", 300, vec![address("10.0.0.1"), address("10.0.0.2")]),
                record_set("r1", "0", "", "A", 600, vec![address("10.0.0.3")]),
            ],
        )
        .with_records(
            "1",
            vec![record_set("r2", "1", "example", "CNAME", 3600, vec![cname("target.example-beta.com")])],
        )
}

pub fn provider(fake: &Arc<FakeDirectory>, filter: &[&str], dry_run: bool) -> VinylDnsProvider {
    VinylDnsProvider::with_client(fake.clone(), ZoneIdFilter::new(filter.iter().copied()), dry_run)
}
