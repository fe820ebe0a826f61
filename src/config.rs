use serde::Deserialize;

use crate::zone_filter::ZoneIdFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the VinylDNS API, e.g. http://vinyldns-api:9000
    #[serde(default)]
    pub vinyldns_host: Option<String>,

    /// VinylDNS access key (SigV4 credential id)
    #[serde(default)]
    pub vinyldns_access_key: Option<String>,

    /// VinylDNS secret key (SigV4 signing secret)
    #[serde(default)]
    pub vinyldns_secret_key: Option<String>,

    /// Comma-separated list of zone IDs to manage; empty = manage all
    #[serde(default)]
    pub zone_id_filter: String,

    /// Resolve and validate changes but never submit them
    #[serde(default)]
    pub dry_run: bool,

    /// Default TTL when the endpoint doesn't specify one
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Timeout applied to every VinylDNS request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Parse from environment variables (VINYLDNS_HOST, VINYLDNS_ACCESS_KEY, …)
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::from_env::<Config>()?)
    }

    /// Return the zone filter as a Vec<String>, empty if unconfigured.
    pub fn zone_id_filter_list(&self) -> Vec<String> {
        self.zone_id_filter
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn zone_filter(&self) -> ZoneIdFilter {
        ZoneIdFilter::new(self.zone_id_filter_list())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vinyldns_host: None,
            vinyldns_access_key: None,
            vinyldns_secret_key: None,
            zone_id_filter: String::new(),
            dry_run: false,
            default_ttl: default_ttl(),
            request_timeout_secs: default_request_timeout(),
            port: default_port(),
        }
    }
}

fn default_ttl()             -> u32 { 300 }
fn default_request_timeout() -> u64 { 30 }
fn default_port()            -> u16 { 8888 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_id_filter_list_trims_and_skips_blanks() {
        let cfg = Config {
            zone_id_filter: " 1, ,abc-2,".into(),
            ..Default::default()
        };
        assert_eq!(cfg.zone_id_filter_list(), vec!["1", "abc-2"]);
    }

    #[test]
    fn empty_zone_id_filter_matches_everything() {
        let cfg = Config::default();
        assert!(cfg.zone_id_filter_list().is_empty());
        assert!(cfg.zone_filter().matches("any-zone"));
    }

    #[test]
    fn blank_zone_id_filter_counts_as_unset() {
        let cfg = Config {
            zone_id_filter: " , ".into(),
            ..Default::default()
        };
        assert!(cfg.zone_filter().is_empty());

        let cfg = Config {
            zone_id_filter: "z1".into(),
            ..Default::default()
        };
        assert!(!cfg.zone_filter().is_empty());
    }

    #[test]
    fn deserialises_from_env_style_pairs() {
        let vars = vec![
            ("VINYLDNS_HOST".to_string(), "http://vinyl:9000".to_string()),
            ("VINYLDNS_ACCESS_KEY".to_string(), "ak".to_string()),
            ("ZONE_ID_FILTER".to_string(), "z1,z2".to_string()),
            ("DRY_RUN".to_string(), "true".to_string()),
        ];
        let cfg: Config = envy::from_iter(vars).unwrap();
        assert_eq!(cfg.vinyldns_host.as_deref(), Some("http://vinyl:9000"));
        assert_eq!(cfg.vinyldns_access_key.as_deref(), Some("ak"));
        assert!(cfg.vinyldns_secret_key.is_none());
        assert!(cfg.dry_run);
        assert_eq!(cfg.default_ttl, 300);
        assert_eq!(cfg.port, 8888);
        assert_eq!(cfg.zone_id_filter_list(), vec!["z1", "z2"]);
    }
}
