use std::collections::HashSet;

/// Restricts which zones, by provider-assigned ID, the provider looks at.
///
/// IDs are compared as exact strings. A filter built from no IDs accepts
/// every zone.
#[derive(Debug, Clone, Default)]
pub struct ZoneIdFilter {
    ids: HashSet<String>,
}

impl ZoneIdFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, zone_id: &str) -> bool {
        self.ids.is_empty() || self.ids.contains(zone_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_all() {
        let filter = ZoneIdFilter::default();
        assert!(filter.matches("0"));
        assert!(filter.matches(""));
        assert!(filter.is_empty());
    }

    #[test]
    fn configured_filter_is_exact() {
        let filter = ZoneIdFilter::new(["1", "Zone-A"]);
        assert!(filter.matches("1"));
        assert!(filter.matches("Zone-A"));
        assert!(!filter.matches("0"));
        assert!(!filter.matches("zone-a"));
        assert!(!filter.matches("1 "));
    }
}
