use std::sync::Arc;

use serde_json::json;

use crate::{
    catalog::{CommercialCatalog, CommunityDirectory},
    config::Config,
    error::UpstreamResult,
    iheart::IHeartClient,
    logging::logger,
    radio_browser::RadioBrowserClient,
    stations::Station,
};

/// Rows requested when an id is resolved through keyword search.
const ID_SEARCH_LIMIT: usize = 50;

/// Fans requests out to both catalogs and merges what comes back.
///
/// Every operation is infallible: upstream failures are logged and turn into
/// empty results or the [`Station::unknown`] placeholder.
#[derive(Clone)]
pub struct Aggregator {
    commercial: Arc<dyn CommercialCatalog>,
    community: Arc<dyn CommunityDirectory>,
    supplementary_limit: usize,
}

impl Aggregator {
    pub fn new(
        commercial: Arc<dyn CommercialCatalog>,
        community: Arc<dyn CommunityDirectory>,
        supplementary_limit: usize,
    ) -> Self {
        Self {
            commercial,
            community,
            supplementary_limit: supplementary_limit.max(1),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let commercial = IHeartClient::new(config.iheart.clone(), &config.upstream)?;
        let community = RadioBrowserClient::new(config.radio_browser.clone(), &config.upstream)?;
        Ok(Self::new(
            Arc::new(commercial),
            Arc::new(community),
            config.supplementary_limit,
        ))
    }

    /// Keyword search in both catalogs; commercial hits come first.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let (commercial, community) = tokio::join!(
            self.commercial.search(query, limit),
            self.community.search(query, limit),
        );
        playable([
            settle(commercial, "search", query),
            settle(community, "search", query),
        ])
    }

    pub async fn get_top(&self, limit: usize) -> Vec<Station> {
        let (commercial, community) = tokio::join!(
            self.commercial.top(limit),
            self.community.top_voted(limit),
        );
        playable([settle(commercial, "top", ""), settle(community, "top", "")])
    }

    /// Tiered resolution of a single station id. Each tier runs once.
    pub async fn get_by_id(&self, id: &str) -> Station {
        if is_community_uuid(id) {
            if let Some(station) = settle(self.community.lookup(id).await, "lookup", id) {
                log_resolved(id, "community_uuid", &station);
                return station;
            }
        }

        let matched = settle(
            self.commercial.search(id, ID_SEARCH_LIMIT).await,
            "search_by_id",
            id,
        )
        .into_iter()
        .find(|station| station.id == id);
        if let Some(station) = matched {
            let station = self.with_community_streams(station).await;
            log_resolved(id, "commercial_search", &station);
            return station;
        }

        if let Some(station) = settle(self.commercial.lookup(id).await, "lookup", id) {
            let station = self.with_community_streams(station).await;
            log_resolved(id, "commercial_lookup", &station);
            return station;
        }

        logger().info("station.unresolved", json!({ "id": id }));
        Station::unknown(id)
    }

    async fn with_community_streams(&self, mut station: Station) -> Station {
        if station.name.trim().is_empty() {
            return station;
        }
        let extra = settle(
            self.community
                .streams_for_name(&station.name, self.supplementary_limit)
                .await,
            "streams_for_name",
            &station.name,
        );
        station.merge_streams(extra);
        station
    }
}

/// Radio Browser ids are hyphenated UUIDs; iHeart ids are short numbers.
pub fn is_community_uuid(id: &str) -> bool {
    id.contains('-') && id.chars().count() > 20
}

fn playable<const N: usize>(sources: [Vec<Station>; N]) -> Vec<Station> {
    sources
        .into_iter()
        .flatten()
        .filter(Station::is_playable)
        .collect()
}

fn settle<T: Default>(result: UpstreamResult<T>, operation: &str, subject: &str) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            logger().warn(
                "upstream.failed",
                json!({
                    "upstream": error.upstream(),
                    "operation": operation,
                    "kind": error.kind(),
                    "subject": subject,
                    "error": error.to_string(),
                }),
            );
            T::default()
        }
    }
}

fn log_resolved(id: &str, tier: &str, station: &Station) {
    logger().debug(
        "station.resolved",
        json!({
            "id": id,
            "tier": tier,
            "streams": station.streams.len(),
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::stations::StreamCandidate;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    const JAZZ_UUID: &str = "960e57c5-0601-11e8-ae97-52543be04c81";

    fn station(id: &str, name: &str, urls: &[&str]) -> Station {
        Station::new(
            id,
            name,
            None,
            urls.iter()
                .map(|url| StreamCandidate::new("HLS", *url))
                .collect(),
        )
    }

    fn outage(upstream: &'static str) -> UpstreamError {
        UpstreamError::Status {
            upstream,
            status: StatusCode::BAD_GATEWAY,
        }
    }

    #[derive(Default)]
    struct FakeCommercial {
        search: Vec<Station>,
        top: Vec<Station>,
        lookup: Option<Station>,
        down: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCommercial {
        fn record(&self, call: String) -> UpstreamResult<()> {
            self.calls.lock().unwrap().push(call);
            if self.down {
                Err(outage("iheart"))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommercialCatalog for FakeCommercial {
        async fn search(&self, query: &str, _limit: usize) -> UpstreamResult<Vec<Station>> {
            self.record(format!("search:{query}"))?;
            Ok(self.search.clone())
        }

        async fn top(&self, _limit: usize) -> UpstreamResult<Vec<Station>> {
            self.record("top".into())?;
            Ok(self.top.clone())
        }

        async fn lookup(&self, id: &str) -> UpstreamResult<Option<Station>> {
            self.record(format!("lookup:{id}"))?;
            Ok(self.lookup.clone())
        }
    }

    #[derive(Default)]
    struct FakeCommunity {
        search: Vec<Station>,
        top: Vec<Station>,
        lookup: Option<Station>,
        by_name: Vec<StreamCandidate>,
        down: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCommunity {
        fn record(&self, call: String) -> UpstreamResult<()> {
            self.calls.lock().unwrap().push(call);
            if self.down {
                Err(outage("radio-browser"))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommunityDirectory for FakeCommunity {
        async fn search(&self, name: &str, _limit: usize) -> UpstreamResult<Vec<Station>> {
            self.record(format!("search:{name}"))?;
            Ok(self.search.clone())
        }

        async fn top_voted(&self, _limit: usize) -> UpstreamResult<Vec<Station>> {
            self.record("top".into())?;
            Ok(self.top.clone())
        }

        async fn lookup(&self, uuid: &str) -> UpstreamResult<Option<Station>> {
            self.record(format!("lookup:{uuid}"))?;
            Ok(self.lookup.clone())
        }

        async fn streams_for_name(
            &self,
            name: &str,
            _limit: usize,
        ) -> UpstreamResult<Vec<StreamCandidate>> {
            self.record(format!("streams_for_name:{name}"))?;
            Ok(self.by_name.clone())
        }
    }

    fn aggregator(
        commercial: FakeCommercial,
        community: FakeCommunity,
    ) -> (Aggregator, Arc<FakeCommercial>, Arc<FakeCommunity>) {
        let commercial = Arc::new(commercial);
        let community = Arc::new(community);
        (
            Aggregator::new(commercial.clone(), community.clone(), 5),
            commercial,
            community,
        )
    }

    fn ids(stations: &[Station]) -> Vec<&str> {
        stations.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn detects_community_uuids() {
        assert!(is_community_uuid(JAZZ_UUID));
        assert!(!is_community_uuid("1469"));
        assert!(!is_community_uuid("whtz-fm"));
        assert!(!is_community_uuid("abcdefghijklmnopqrstuvwxyz"));
    }

    #[tokio::test]
    async fn search_puts_commercial_first_and_drops_silent_stations() {
        let (aggregator, _, _) = aggregator(
            FakeCommercial {
                search: vec![
                    station("1", "Z100", &["https://a/1"]),
                    station("2", "Silent", &[]),
                ],
                ..Default::default()
            },
            FakeCommunity {
                search: vec![
                    station(JAZZ_UUID, "Jazz", &["https://b/jazz"]),
                    station("dead-uuid", "Dead", &[]),
                ],
                ..Default::default()
            },
        );

        let found = aggregator.search("z", 10).await;
        assert_eq!(ids(&found), vec!["1", JAZZ_UUID]);
        assert!(found.iter().all(Station::is_playable));
    }

    #[tokio::test]
    async fn search_survives_one_upstream_outage() {
        let (aggregator, _, _) = aggregator(
            FakeCommercial {
                down: true,
                ..Default::default()
            },
            FakeCommunity {
                search: vec![station(JAZZ_UUID, "Jazz", &["https://b/jazz"])],
                ..Default::default()
            },
        );
        assert_eq!(ids(&aggregator.search("jazz", 10).await), vec![JAZZ_UUID]);
    }

    #[tokio::test]
    async fn top_merges_both_lists() {
        let (aggregator, commercial, community) = aggregator(
            FakeCommercial {
                top: vec![station("1", "Z100", &["https://a/1"])],
                ..Default::default()
            },
            FakeCommunity {
                top: vec![
                    station("x", "No Stream", &[]),
                    station(JAZZ_UUID, "Jazz", &["https://b/jazz"]),
                ],
                ..Default::default()
            },
        );
        assert_eq!(ids(&aggregator.get_top(20).await), vec!["1", JAZZ_UUID]);
        assert_eq!(commercial.calls(), vec!["top"]);
        assert_eq!(community.calls(), vec!["top"]);
    }

    #[tokio::test]
    async fn uuid_lookup_returns_community_station_directly() {
        let jazz = Station::new(
            JAZZ_UUID,
            "Jazz",
            None,
            vec![
                StreamCandidate::new("Community Stream (MP3)", "https://b/jazz"),
                StreamCandidate::new(
                    "External Player (RadioBrowser)",
                    format!("https://www.radio-browser.info/history/{JAZZ_UUID}"),
                ),
            ],
        );
        let (aggregator, commercial, _) = aggregator(
            FakeCommercial::default(),
            FakeCommunity {
                lookup: Some(jazz.clone()),
                ..Default::default()
            },
        );

        let resolved = aggregator.get_by_id(JAZZ_UUID).await;
        assert_eq!(resolved, jazz);
        assert!(resolved.streams[0].title.starts_with("Community Stream"));
        assert_eq!(resolved.streams[1].title, "External Player (RadioBrowser)");
        assert!(commercial.calls().is_empty());
    }

    #[tokio::test]
    async fn search_tier_requires_exact_id_and_merges_community_streams() {
        let (aggregator, commercial, community) = aggregator(
            FakeCommercial {
                search: vec![
                    station("14690", "Z100 Classics", &["https://a/other"]),
                    station("1469", "Z100", &["https://a/z100"]),
                ],
                ..Default::default()
            },
            FakeCommunity {
                by_name: vec![
                    StreamCandidate::new("Community Stream", "https://a/z100"),
                    StreamCandidate::new("Community Stream (AAC)", "https://c/z100.aac"),
                ],
                ..Default::default()
            },
        );

        let resolved = aggregator.get_by_id("1469").await;
        assert_eq!(resolved.id, "1469");
        let urls: Vec<&str> = resolved.streams.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/z100", "https://c/z100.aac"]);
        assert_eq!(resolved.stream_url.as_deref(), Some("https://a/z100"));
        assert_eq!(commercial.calls(), vec!["search:1469"]);
        assert_eq!(community.calls(), vec!["streams_for_name:Z100"]);
    }

    #[tokio::test]
    async fn failed_uuid_lookup_falls_through_to_commercial_tiers() {
        let uuid_like = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";
        let (aggregator, commercial, _) = aggregator(
            FakeCommercial {
                lookup: Some(station(uuid_like, "Odd Id", &["https://a/odd"])),
                ..Default::default()
            },
            FakeCommunity::default(),
        );

        let resolved = aggregator.get_by_id(uuid_like).await;
        assert_eq!(resolved.name, "Odd Id");
        assert_eq!(
            commercial.calls(),
            vec![format!("search:{uuid_like}"), format!("lookup:{uuid_like}")]
        );
    }

    #[tokio::test]
    async fn lookup_tier_still_gets_community_streams() {
        let (aggregator, _, _) = aggregator(
            FakeCommercial {
                lookup: Some(station("77", "KIIS", &["https://a/kiis"])),
                ..Default::default()
            },
            FakeCommunity {
                by_name: vec![StreamCandidate::new("Community Stream", "https://c/kiis")],
                ..Default::default()
            },
        );
        let resolved = aggregator.get_by_id("77").await;
        assert_eq!(resolved.streams.len(), 2);
        assert_eq!(resolved.streams[1].url, "https://c/kiis");
    }

    #[tokio::test]
    async fn community_streams_land_before_web_players() {
        let extracted: crate::iheart::IHeartStation =
            serde_json::from_value(serde_json::json!({ "id": 1469, "name": "Z100" })).unwrap();
        let (aggregator, _, _) = aggregator(
            FakeCommercial {
                search: extracted.to_station().into_iter().collect(),
                ..Default::default()
            },
            FakeCommunity {
                by_name: vec![StreamCandidate::new(
                    "Community Stream (AAC)",
                    "https://c/z100.aac",
                )],
                ..Default::default()
            },
        );

        let resolved = aggregator.get_by_id("1469").await;
        let titles: Vec<&str> = resolved.streams.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Direct HLS (High Priority)",
                "Direct Stream (CDN)",
                "Community Stream (AAC)",
                "External Player (iHeart)",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_id_yields_placeholder() {
        let (aggregator, _, _) = aggregator(FakeCommercial::default(), FakeCommunity::default());
        assert_eq!(aggregator.get_by_id("404").await, Station::unknown("404"));
    }

    #[tokio::test]
    async fn outage_everywhere_yields_placeholder() {
        let (aggregator, commercial, community) = aggregator(
            FakeCommercial {
                down: true,
                ..Default::default()
            },
            FakeCommunity {
                down: true,
                ..Default::default()
            },
        );
        let resolved = aggregator.get_by_id(JAZZ_UUID).await;
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            json!({
                "id": JAZZ_UUID,
                "name": "Unknown",
                "logo": "",
                "streams": [],
                "streamUrl": "",
            })
        );
        assert_eq!(commercial.calls().len(), 2);
        assert_eq!(community.calls().len(), 1);
        assert!(aggregator.search("x", 5).await.is_empty());
        assert!(aggregator.get_top(5).await.is_empty());
    }
}
