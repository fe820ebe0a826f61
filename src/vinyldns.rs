mod signer;

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

pub use signer::{Signature, Signer};

use crate::{
    config::Config,
    error::{ClientError, ProviderError},
};

const PAGE_SIZE: &str = "100";

// ─────────────────────────────────────────────────────────────────────────────
// VinylDNS API shapes (partial – only what we need)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    /// Assigned by VinylDNS; omit on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub zone_id: String,
    /// Relative to the zone; "" is the apex
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    #[serde(default)]
    pub records: Vec<RecordData>,
}

/// One value of a record set. Which field is set depends on the type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Acknowledgement VinylDNS returns for every record set mutation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordSetChange {
    pub id: Option<String>,
    pub status: Option<String>,
    pub change_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZonesPage {
    #[serde(default)]
    zones: Vec<Zone>,
    next_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSetsPage {
    #[serde(default)]
    record_sets: Vec<RecordSet>,
    next_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Record types this provider manages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
}

impl RecordType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::A),
            "AAAA" => Some(Self::Aaaa),
            "CNAME" => Some(Self::Cname),
            "TXT" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Txt => "TXT",
        }
    }

    /// The value carried by `data` for this type, if it has one.
    pub fn target<'a>(&self, data: &'a RecordData) -> Option<&'a str> {
        match self {
            Self::A | Self::Aaaa => data.address.as_deref(),
            Self::Cname => data.cname.as_deref(),
            Self::Txt => data.text.as_deref(),
        }
    }

    pub fn record_data(&self, target: &str) -> RecordData {
        let value = Some(target.to_string());
        match self {
            Self::A | Self::Aaaa => RecordData { address: value, ..Default::default() },
            Self::Cname => RecordData { cname: value, ..Default::default() },
            Self::Txt => RecordData { text: value, ..Default::default() },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory capability
// ─────────────────────────────────────────────────────────────────────────────

/// The operations the provider needs from a DNS authority.
#[async_trait]
pub trait RecordDirectory: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<Zone>, ClientError>;
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>, ClientError>;
    async fn create_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError>;
    async fn update_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError>;
    async fn delete_record_set(
        &self,
        zone_id: &str,
        record_set_id: &str,
    ) -> Result<RecordSetChange, ClientError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct VinylDnsClient {
    http: Client,
    base: Url,
    signer: Arc<Signer>,
}

impl VinylDnsClient {
    /// Build a client from configuration. Host, access key and secret key
    /// must all be present; nothing is contacted here.
    pub fn new(cfg: &Config) -> Result<Self, ProviderError> {
        let host = required(&cfg.vinyldns_host, "VINYLDNS_HOST")?;
        let access_key = required(&cfg.vinyldns_access_key, "VINYLDNS_ACCESS_KEY")?;
        let secret_key = required(&cfg.vinyldns_secret_key, "VINYLDNS_SECRET_KEY")?;

        let base = Url::parse(host.trim_end_matches('/'))
            .map_err(|e| ProviderError::Config(format!("invalid VINYLDNS_HOST {host:?}: {e}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Config(format!("building reqwest client: {e}")))?;

        Ok(Self {
            http,
            base,
            signer: Arc::new(Signer::new(access_key, secret_key)),
        })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
        let raw = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| ClientError::Other(format!("bad URL {raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<T, ClientError> {
        let url = self.url(path, query)?;
        let payload = body.unwrap_or_default();
        let sig = self
            .signer
            .sign(method.as_str(), &url, &payload, chrono::Utc::now());

        let mut req = self
            .http
            .request(method.clone(), url)
            .header("X-Amz-Date", sig.amz_date.as_str())
            .header("Authorization", sig.authorization.as_str());
        if !payload.is_empty() {
            req = req.header("Content-Type", "application/json").body(payload);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        debug!("VinylDNS {method} {path} → {status} ({} bytes)", bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn required(value: &Option<String>, var: &str) -> Result<String, ProviderError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ProviderError::Config(format!("no VinylDNS credential found: {var} is not set"))),
    }
}

#[async_trait]
impl RecordDirectory for VinylDnsClient {
    async fn list_zones(&self) -> Result<Vec<Zone>, ClientError> {
        collect_pages(
            move |start_from| async move {
                let mut query = vec![("maxItems", PAGE_SIZE)];
                if let Some(next) = start_from.as_deref() {
                    query.push(("startFrom", next));
                }
                let page: ZonesPage = self.send(Method::GET, "/zones", &query, None).await?;
                Ok((page.zones, page.next_id))
            },
            zone_key,
        )
        .await
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>, ClientError> {
        let path = format!("/zones/{zone_id}/recordsets");
        let path = path.as_str();
        collect_pages(
            move |start_from| async move {
                let mut query = vec![("maxItems", PAGE_SIZE)];
                if let Some(next) = start_from.as_deref() {
                    query.push(("startFrom", next));
                }
                let page: RecordSetsPage = self.send(Method::GET, path, &query, None).await?;
                Ok((page.record_sets, page.next_id))
            },
            record_set_key,
        )
        .await
    }

    async fn create_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError> {
        let path = format!("/zones/{zone_id}/recordsets");
        let body = serde_json::to_vec(record_set)?;
        self.send(Method::POST, &path, &[], Some(body)).await
    }

    async fn update_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSetChange, ClientError> {
        let id = record_set
            .id
            .as_deref()
            .ok_or_else(|| ClientError::Other("record set update without an id".into()))?;
        let path = format!("/zones/{zone_id}/recordsets/{id}");
        let body = serde_json::to_vec(record_set)?;
        self.send(Method::PUT, &path, &[], Some(body)).await
    }

    async fn delete_record_set(
        &self,
        zone_id: &str,
        record_set_id: &str,
    ) -> Result<RecordSetChange, ClientError> {
        let path = format!("/zones/{zone_id}/recordsets/{record_set_id}");
        self.send(Method::DELETE, &path, &[], None).await
    }
}

type Page<T> = (Vec<T>, Option<String>);

/// Follow `nextId` until it runs out. A token is requested at most once and
/// an item whose key was already collected is skipped, so a server that
/// echoes or cycles its cursor still yields each item once.
async fn collect_pages<T, F, Fut>(
    mut fetch: F,
    key: fn(&T) -> Option<&str>,
) -> Result<Vec<T>, ClientError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ClientError>>,
{
    let mut items = Vec::new();
    let mut collected = HashSet::new();
    let mut requested = HashSet::new();
    let mut start_from = None;
    loop {
        let (page, next_id) = fetch(start_from.take()).await?;
        for item in page {
            let fresh = match key(&item) {
                Some(id) => collected.insert(id.to_string()),
                None => true,
            };
            if fresh {
                items.push(item);
            }
        }
        match next_id {
            Some(next) if requested.insert(next.clone()) => start_from = Some(next),
            Some(next) => {
                debug!("VinylDNS repeated page token {next:?}; stopping");
                break;
            }
            None => break,
        }
    }
    Ok(items)
}

fn zone_key(zone: &Zone) -> Option<&str> {
    Some(zone.id.as_str())
}

fn record_set_key(record_set: &RecordSet) -> Option<&str> {
    record_set.id.as_deref()
}
