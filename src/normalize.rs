use tracing::debug;

use crate::{
    dns::Endpoint,
    vinyldns::{RecordSet, RecordType, Zone},
};

/// Fully-qualified name for a record set's relative `name` in `zone`.
/// An empty name (or "@") is the zone apex.
pub fn dns_name(name: &str, zone: &Zone) -> String {
    let zone_name = zone.name.trim_end_matches('.');
    match name.trim_end_matches('.') {
        "" | "@" => zone_name.to_string(),
        name => format!("{name}.{zone_name}"),
    }
}

/// Turn a VinylDNS record set into an external-dns endpoint.
///
/// Returns `None` for unsupported types and for record sets without a single
/// usable value. Values lacking the field their type requires are dropped
/// individually.
pub fn to_endpoint(record_set: &RecordSet, zone: &Zone) -> Option<Endpoint> {
    let Some(record_type) = RecordType::parse(&record_set.record_type) else {
        debug!(
            "skipping {} {}: unsupported type",
            record_set.record_type, record_set.name
        );
        return None;
    };

    let targets: Vec<String> = record_set
        .records
        .iter()
        .filter_map(|data| {
            let target = record_type.target(data);
            if target.is_none() {
                debug!(
                    "dropping {} value of {}: field for its type is missing",
                    record_type.as_str(),
                    record_set.name
                );
            }
            target.map(String::from)
        })
        .collect();

    if targets.is_empty() {
        debug!(
            "skipping {} {} in {}: no values",
            record_type.as_str(),
            record_set.name,
            zone.name
        );
        return None;
    }

    Some(Endpoint::new(
        dns_name(&record_set.name, zone),
        record_type.as_str(),
        record_set.ttl,
        targets,
    ))
}
