use std::{
    collections::HashMap,
    future::Future,
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    dns::{Change, ChangeAction, Endpoint},
    error::{ApplyError, ChangeFailure, FailureReason, ProviderError},
    normalize::to_endpoint,
    vinyldns::{RecordDirectory, RecordSet, RecordType, VinylDnsClient, Zone},
    zone_filter::ZoneIdFilter,
};

const DEFAULT_TTL: u32 = 300;

/// Record sets fetched during one `apply_changes` call, keyed by zone ID.
type RecordSetCache = HashMap<String, Vec<RecordSet>>;

/// Bridges external-dns and a VinylDNS-style record directory.
///
/// Holds no state between calls other than its (immutable) configuration,
/// so clones can be used concurrently.
#[derive(Clone)]
pub struct VinylDnsProvider {
    client: Arc<dyn RecordDirectory>,
    zone_filter: ZoneIdFilter,
    dry_run: bool,
    default_ttl: u32,
}

impl VinylDnsProvider {
    /// Build a provider talking to the VinylDNS API described by `cfg`.
    /// Fails with [`ProviderError::Config`] when credentials are missing.
    pub fn new(cfg: &Config) -> Result<Self, ProviderError> {
        let client = VinylDnsClient::new(cfg)?;
        Ok(Self::with_client(Arc::new(client), cfg.zone_filter(), cfg.dry_run)
            .with_default_ttl(cfg.default_ttl))
    }

    pub fn with_client(
        client: Arc<dyn RecordDirectory>,
        zone_filter: ZoneIdFilter,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            zone_filter,
            dry_run,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// TTL used for created/updated record sets whose endpoint carries none.
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // ── read ─────────────────────────────────────────────────────────────────

    /// Zones that pass the zone filter, in provider order.
    pub async fn managed_zones(&self, cancel: &CancellationToken) -> Result<Vec<Zone>, ProviderError> {
        let zones = guard(cancel, self.client.list_zones())
            .await?
            .map_err(ProviderError::ListZones)?;

        Ok(zones
            .into_iter()
            .filter(|zone| {
                let keep = self.zone_filter.matches(&zone.id);
                if !keep {
                    debug!("zone {} ({}) is outside the zone filter", zone.name, zone.id);
                }
                keep
            })
            .collect())
    }

    /// Every supported record in every managed zone, in zone order then
    /// record order. Any listing failure fails the whole call.
    pub async fn records(&self, cancel: &CancellationToken) -> Result<Vec<Endpoint>, ProviderError> {
        let zones = self.managed_zones(cancel).await?;
        let mut endpoints = Vec::new();

        for zone in &zones {
            let record_sets = guard(cancel, self.client.list_record_sets(&zone.id))
                .await?
                .map_err(|source| ProviderError::ListRecordSets {
                    zone_id: zone.id.clone(),
                    zone_name: zone.name.clone(),
                    source,
                })?;

            let before = endpoints.len();
            endpoints.extend(record_sets.iter().filter_map(|rs| to_endpoint(rs, zone)));
            debug!(
                "zone {} ({}): {} record set(s), {} endpoint(s)",
                zone.name,
                zone.id,
                record_sets.len(),
                endpoints.len() - before
            );
        }

        Ok(endpoints)
    }

    // ── mutations ────────────────────────────────────────────────────────────

    /// Apply `changes` in order. Failed changes are collected and returned
    /// together; they do not stop later changes or undo earlier ones.
    pub async fn apply_changes(
        &self,
        changes: Vec<Change>,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        if changes.is_empty() {
            info!("All records are already up to date");
            return Ok(());
        }

        let zones = self.managed_zones(cancel).await?;
        let total = changes.len();
        let mut cache = RecordSetCache::new();
        let mut failures = Vec::new();

        for (index, change) in changes.into_iter().enumerate() {
            if let Err(reason) = self.apply_one(&change, &zones, &mut cache, cancel).await? {
                let ep = change.endpoint();
                error!(
                    "{action} {rtype} {name} failed: {reason}",
                    action = change.action(),
                    rtype = ep.record_type,
                    name = ep.dns_name
                );
                failures.push(ChangeFailure {
                    index,
                    action: change.action(),
                    dns_name: ep.dns_name.clone(),
                    record_type: ep.record_type.clone(),
                    reason,
                });
            }
        }

        if failures.is_empty() {
            info!("{total} change(s) applied{}", if self.dry_run { " (dry-run)" } else { "" });
            Ok(())
        } else {
            Err(ApplyError { total, failures }.into())
        }
    }

    /// The outer error aborts the whole batch (cancellation); the inner one
    /// is this change's own failure.
    async fn apply_one(
        &self,
        change: &Change,
        zones: &[Zone],
        cache: &mut RecordSetCache,
        cancel: &CancellationToken,
    ) -> Result<Result<(), FailureReason>, ProviderError> {
        let ep = change.endpoint();
        let Some(zone) = resolve_zone(&ep.dns_name, zones) else {
            return Ok(Err(FailureReason::UnknownZone));
        };
        let record_type = match validate(change) {
            Ok(t) => t,
            Err(msg) => return Ok(Err(FailureReason::Invalid(msg))),
        };
        let Some(name) = relative_name(&ep.dns_name, zone) else {
            return Ok(Err(FailureReason::UnknownZone));
        };

        let existing_id = match change {
            Change::Create(_) => None,
            Change::Update { old, .. } | Change::Delete(old) => {
                let old_type = RecordType::parse(&old.record_type).unwrap_or(record_type);
                let Some(old_name) = relative_name(&old.dns_name, zone) else {
                    return Ok(Err(FailureReason::RecordSetNotFound));
                };
                match self.find_record_set_id(zone, &old_name, old_type, cache, cancel).await? {
                    Ok(id) => Some(id),
                    Err(reason) => return Ok(Err(reason)),
                }
            }
        };

        let action = change.action();
        if self.dry_run {
            info!(
                "[dry-run] would {action} {} {} in zone {}",
                ep.record_type, ep.dns_name, zone.name
            );
            return Ok(Ok(()));
        }
        info!("{action} {} {} → zone {}", ep.record_type, ep.dns_name, zone.name);

        let submitted = match (change, existing_id) {
            (Change::Create(_), _) => {
                let record_set = self.build_record_set(None, zone, name, record_type, ep);
                guard(cancel, self.client.create_record_set(&zone.id, &record_set)).await?
            }
            (Change::Update { .. }, id) => {
                let record_set = self.build_record_set(id, zone, name, record_type, ep);
                guard(cancel, self.client.update_record_set(&zone.id, &record_set)).await?
            }
            (Change::Delete(_), Some(id)) => {
                guard(cancel, self.client.delete_record_set(&zone.id, &id)).await?
            }
            (Change::Delete(_), None) => return Ok(Err(FailureReason::RecordSetNotFound)),
        };

        Ok(submitted
            .map(|ack| {
                debug!(
                    change_id = ?ack.id,
                    status = ?ack.status,
                    change_type = ?ack.change_type,
                    "VinylDNS accepted {action} {} {}",
                    ep.record_type,
                    ep.dns_name
                );
            })
            .map_err(FailureReason::Submission))
    }

    async fn find_record_set_id(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        cache: &mut RecordSetCache,
        cancel: &CancellationToken,
    ) -> Result<Result<String, FailureReason>, ProviderError> {
        if !cache.contains_key(&zone.id) {
            match guard(cancel, self.client.list_record_sets(&zone.id)).await? {
                Ok(sets) => {
                    cache.insert(zone.id.clone(), sets);
                }
                Err(e) => return Ok(Err(FailureReason::Lookup(e))),
            }
        }

        let id = cache
            .get(&zone.id)
            .and_then(|sets| {
                sets.iter().find(|rs| {
                    rs.record_type == record_type.as_str() && canonical_name(&rs.name) == name
                })
            })
            .and_then(|rs| rs.id.clone());

        Ok(id.ok_or(FailureReason::RecordSetNotFound))
    }

    fn build_record_set(
        &self,
        id: Option<String>,
        zone: &Zone,
        name: String,
        record_type: RecordType,
        ep: &Endpoint,
    ) -> RecordSet {
        let ttl = if ep.record_ttl > 0 { ep.record_ttl } else { self.default_ttl };
        RecordSet {
            id,
            zone_id: zone.id.clone(),
            name,
            record_type: record_type.as_str().to_string(),
            ttl,
            records: ep.targets.iter().map(|t| record_type.record_data(t)).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Race `fut` against cancellation.
async fn guard<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, ProviderError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        out = fut => Ok(out),
    }
}

fn canonical_name(name: &str) -> String {
    match name.trim_end_matches('.') {
        "@" => String::new(),
        n => n.to_ascii_lowercase(),
    }
}

/// `dns_name` relative to `zone`: "" for the apex, `None` when the name is
/// not inside the zone.
pub fn relative_name(dns_name: &str, zone: &Zone) -> Option<String> {
    let name = dns_name.trim_end_matches('.').to_ascii_lowercase();
    let zone_name = zone.name.trim_end_matches('.').to_ascii_lowercase();
    if zone_name.is_empty() {
        return None;
    }
    if name == zone_name {
        return Some(String::new());
    }
    name.strip_suffix(&zone_name)?
        .strip_suffix('.')
        .filter(|label| !label.is_empty())
        .map(String::from)
}

/// The zone whose name is the longest suffix of `dns_name`.
pub fn resolve_zone<'a>(dns_name: &str, zones: &'a [Zone]) -> Option<&'a Zone> {
    zones
        .iter()
        .filter(|zone| relative_name(dns_name, zone).is_some())
        .max_by_key(|zone| zone.name.trim_end_matches('.').len())
}

fn validate(change: &Change) -> Result<RecordType, String> {
    let ep = change.endpoint();
    let record_type = RecordType::parse(&ep.record_type)
        .ok_or_else(|| format!("unsupported record type {}", ep.record_type))?;

    if change.action() == ChangeAction::Delete {
        return Ok(record_type);
    }
    if ep.targets.is_empty() {
        return Err("endpoint has no targets".into());
    }
    if record_type == RecordType::Cname && ep.targets.len() > 1 {
        return Err(format!("CNAME may have only one target, got {}", ep.targets.len()));
    }
    for target in &ep.targets {
        let ok = match record_type {
            RecordType::A => target.parse::<Ipv4Addr>().is_ok(),
            RecordType::Aaaa => target.parse::<Ipv6Addr>().is_ok(),
            RecordType::Cname => !target.trim().is_empty(),
            RecordType::Txt => true,
        };
        if !ok {
            return Err(format!("target {target:?} is not a valid {} value", record_type.as_str()));
        }
    }
    Ok(record_type)
}
