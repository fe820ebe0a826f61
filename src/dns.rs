use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// external-dns webhook contract types
// ─────────────────────────────────────────────────────────────────────────────

/// A provider-specific property attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpecific {
    pub name: String,
    pub value: String,
}

/// One DNS endpoint as external-dns understands it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    pub record_type: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default, rename = "recordTTL")]
    pub record_ttl: u32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecific>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,
}

impl Endpoint {
    pub fn new(
        dns_name: impl Into<String>,
        record_type: impl Into<String>,
        record_ttl: u32,
        targets: Vec<String>,
    ) -> Self {
        Self {
            dns_name: dns_name.into(),
            record_type: record_type.into(),
            targets,
            record_ttl,
            ..Default::default()
        }
    }
}

/// The payload sent by external-dns to POST /records.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    #[serde(default)]
    pub create: Vec<Endpoint>,
    #[serde(default)]
    pub update_old: Vec<Endpoint>,
    #[serde(default)]
    pub update_new: Vec<Endpoint>,
    #[serde(default)]
    pub delete: Vec<Endpoint>,
}

/// Domain-filter response for GET /
#[derive(Debug, Serialize)]
pub struct DomainFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Change list handed to the provider
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Update => "UPDATE",
            ChangeAction::Delete => "DELETE",
        })
    }
}

/// A single mutation computed by external-dns' planner.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create(Endpoint),
    Update { old: Endpoint, new: Endpoint },
    Delete(Endpoint),
}

impl Change {
    pub fn action(&self) -> ChangeAction {
        match self {
            Change::Create(_) => ChangeAction::Create,
            Change::Update { .. } => ChangeAction::Update,
            Change::Delete(_) => ChangeAction::Delete,
        }
    }

    /// The endpoint whose name decides the target zone. For updates this is
    /// the new state.
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Change::Create(ep) | Change::Delete(ep) => ep,
            Change::Update { new, .. } => new,
        }
    }
}

impl From<Changes> for Vec<Change> {
    /// Order: deletes → updates → creates, so a name freed by a delete can be
    /// reused by a create in the same batch.
    fn from(changes: Changes) -> Self {
        let Changes {
            create,
            mut update_old,
            update_new,
            delete,
        } = changes;

        let mut out = Vec::with_capacity(create.len() + update_new.len() + delete.len());
        out.extend(delete.into_iter().map(Change::Delete));

        for new in update_new {
            let old = match update_old
                .iter()
                .position(|o| o.dns_name == new.dns_name && o.record_type == new.record_type)
            {
                Some(pos) => update_old.remove(pos),
                None => {
                    warn!(
                        "UPDATE {} {} has no matching old endpoint; looking it up by its new name",
                        new.record_type, new.dns_name
                    );
                    new.clone()
                }
            };
            out.push(Change::Update { old, new });
        }
        for orphan in &update_old {
            warn!(
                "ignoring old endpoint {} {} without a matching new endpoint",
                orphan.record_type, orphan.dns_name
            );
        }

        out.extend(create.into_iter().map(Change::Create));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(name: &str, rtype: &str, target: &str) -> Endpoint {
        Endpoint::new(name, rtype, 300, vec![target.to_string()])
    }

    #[test]
    fn endpoint_uses_external_dns_field_names() {
        let json = serde_json::to_value(ep("www.example.com", "A", "1.2.3.4")).unwrap();
        assert_eq!(json["dnsName"], "www.example.com");
        assert_eq!(json["recordType"], "A");
        assert_eq!(json["recordTTL"], 300);
        assert_eq!(json["targets"][0], "1.2.3.4");
        assert!(json.get("labels").is_none());
    }

    #[test]
    fn changes_payload_deserialises_with_missing_sections() {
        let changes: Changes = serde_json::from_str(
            r#"{"create":[{"dnsName":"a.example.com","recordType":"CNAME","targets":["b.example.com"],"recordTTL":60}]}"#,
        )
        .unwrap();
        assert_eq!(changes.create.len(), 1);
        assert_eq!(changes.create[0].record_ttl, 60);
        assert!(changes.update_old.is_empty());
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn change_list_orders_deletes_updates_creates() {
        let changes = Changes {
            create: vec![ep("new.example.com", "A", "1.1.1.1")],
            update_old: vec![
                ep("b.example.com", "CNAME", "old-b"),
                ep("a.example.com", "A", "2.2.2.2"),
            ],
            update_new: vec![
                ep("a.example.com", "A", "3.3.3.3"),
                ep("b.example.com", "CNAME", "new-b"),
            ],
            delete: vec![ep("gone.example.com", "A", "4.4.4.4")],
        };

        let list: Vec<Change> = changes.into();
        let actions: Vec<_> = list.iter().map(Change::action).collect();
        assert_eq!(
            actions,
            vec![
                ChangeAction::Delete,
                ChangeAction::Update,
                ChangeAction::Update,
                ChangeAction::Create
            ]
        );

        match &list[1] {
            Change::Update { old, new } => {
                assert_eq!(old.targets, vec!["2.2.2.2"]);
                assert_eq!(new.targets, vec!["3.3.3.3"]);
            }
            other => panic!("expected update, got {other:?}"),
        }
        match &list[2] {
            Change::Update { old, new } => {
                assert_eq!(old.targets, vec!["old-b"]);
                assert_eq!(new.targets, vec!["new-b"]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_update_falls_back_to_new_endpoint() {
        let changes = Changes {
            update_new: vec![ep("a.example.com", "A", "3.3.3.3")],
            ..Default::default()
        };
        let list: Vec<Change> = changes.into();
        assert_eq!(
            list,
            vec![Change::Update {
                old: ep("a.example.com", "A", "3.3.3.3"),
                new: ep("a.example.com", "A", "3.3.3.3"),
            }]
        );
    }
}
