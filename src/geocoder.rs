use crate::cache::LookupCache;
use crate::error::NodeIssue;
use crate::models::GeoResult;
use crate::upstream::GeocodeLookup;

pub type GeoCache = LookupCache<String, GeoResult>;

/// City name resolution, memoized by the exact input string
#[derive(Debug)]
pub struct Geocoder<G> {
    lookup: G,
    cache: GeoCache,
    /// Failed names for the current event only
    failures: LookupCache<String, NodeIssue>,
}

impl<G: GeocodeLookup> Geocoder<G> {
    /// Creates a geocoder over a session cache
    pub fn new(lookup: G, cache: GeoCache) -> Self {
        Self {
            lookup,
            cache,
            failures: LookupCache::new(),
        }
    }

    /// Forgets failures from the previous event so they are retried
    pub fn begin_event(&mut self) {
        self.failures.clear();
    }

    /// Resolves `name`, reporting upstream failures separately from "no match"
    ///
    /// Names are keyed verbatim: `"Paris"` and `"paris "` are distinct entries.
    /// A failure is remembered until the next event, then retried.
    pub async fn resolve(&mut self, name: &str) -> Result<GeoResult, NodeIssue> {
        if name.trim().is_empty() {
            return Ok(GeoResult::NotFound);
        }

        let key = name.to_string();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!("Geocode cache hit: {:?}", name);
            return Ok(hit);
        }
        if let Some(issue) = self.failures.get(&key) {
            tracing::debug!("Geocode already failed this event: {:?}", name);
            return Err(issue);
        }

        tracing::debug!("Geocode cache miss: {:?}", name);
        let candidates = match self.lookup.search(name).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Geocoding {:?} failed: {}", name, e);
                let issue = NodeIssue::UpstreamUnavailable(e.to_string());
                return Err(self.failures.insert(key, issue));
            }
        };

        let result = candidates
            .first()
            .copied()
            .map_or(GeoResult::NotFound, GeoResult::Found);

        Ok(self.cache.insert(key, result))
    }

    /// Number of names resolved this session
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached answer
    pub fn clear(&mut self) {
        self.cache.clear();
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::testing::FakeUpstream;

    fn geocoder(upstream: &FakeUpstream) -> Geocoder<FakeUpstream> {
        Geocoder::new(upstream.clone(), GeoCache::new())
    }

    #[tokio::test]
    async fn test_repeated_lookup_hits_cache() {
        let upstream = FakeUpstream::new().with_place("Paris", 48.85, 2.35);
        let mut geocoder = geocoder(&upstream);

        let first = geocoder.resolve("Paris").await.unwrap();
        let second = geocoder.resolve("Paris").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            GeoResult::Found(Coordinates {
                latitude: 48.85,
                longitude: 2.35
            })
        );
        assert_eq!(upstream.geocode_calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_skips_network() {
        let upstream = FakeUpstream::new();
        let mut geocoder = geocoder(&upstream);

        assert_eq!(geocoder.resolve("").await, Ok(GeoResult::NotFound));
        assert_eq!(geocoder.resolve("   \t").await, Ok(GeoResult::NotFound));
        assert_eq!(upstream.geocode_calls(), 0);
        assert_eq!(geocoder.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let upstream = FakeUpstream::new();
        let mut geocoder = geocoder(&upstream);

        assert_eq!(geocoder.resolve("Atlantis").await, Ok(GeoResult::NotFound));
        assert_eq!(geocoder.resolve("Atlantis").await, Ok(GeoResult::NotFound));
        assert_eq!(upstream.geocode_calls(), 1);
    }

    #[tokio::test]
    async fn test_first_candidate_wins() {
        let upstream = FakeUpstream::new()
            .with_place("Springfield", 39.80, -89.64)
            .with_place("Springfield", 37.21, -93.29);
        let mut geocoder = geocoder(&upstream);

        let Ok(GeoResult::Found(found)) = geocoder.resolve("Springfield").await else {
            panic!("Springfield should resolve");
        };
        assert_eq!(found.latitude, 39.80);
    }

    #[tokio::test]
    async fn test_names_are_not_normalized() {
        let upstream = FakeUpstream::new()
            .with_place("Paris", 48.85, 2.35)
            .with_place("paris ", 48.85, 2.35);
        let mut geocoder = geocoder(&upstream);

        geocoder.resolve("Paris").await.unwrap();
        geocoder.resolve("paris ").await.unwrap();

        assert_eq!(upstream.geocode_calls(), 2);
        assert_eq!(geocoder.cached_entries(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_remembered_within_an_event() {
        let upstream = FakeUpstream::new().with_place("Paris", 48.85, 2.35);
        upstream.set_geocode_unavailable(true);
        let mut geocoder = geocoder(&upstream);

        let err = geocoder.resolve("Paris").await.unwrap_err();
        assert!(matches!(err, NodeIssue::UpstreamUnavailable(_)));
        assert_eq!(geocoder.resolve("Paris").await, Err(err));
        assert_eq!(upstream.geocode_calls(), 1);
        assert_eq!(geocoder.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_retried_next_event() {
        let upstream = FakeUpstream::new().with_place("Paris", 48.85, 2.35);
        upstream.set_geocode_unavailable(true);
        let mut geocoder = geocoder(&upstream);
        assert!(geocoder.resolve("Paris").await.is_err());

        upstream.set_geocode_unavailable(false);
        geocoder.begin_event();

        assert!(matches!(
            geocoder.resolve("Paris").await,
            Ok(GeoResult::Found(_))
        ));
        assert_eq!(upstream.geocode_calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_forgets_entries() {
        let upstream = FakeUpstream::new().with_place("Oslo", 59.91, 10.75);
        let mut geocoder = geocoder(&upstream);

        geocoder.resolve("Oslo").await.unwrap();
        geocoder.clear();
        geocoder.resolve("Oslo").await.unwrap();

        assert_eq!(upstream.geocode_calls(), 2);
    }
}
