use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DefaultOnError};

use crate::{
    catalog::CommercialCatalog,
    config::{IHeartConfig, UpstreamConfig},
    error::UpstreamResult,
    stations::{sanitize_logo_url, Station},
    stream_candidates::extract_streams,
    upstream::{
        build_client, decode_each, fetch_json, join_segment, not_found_as_none, parse_base,
        with_path,
    },
};

const UPSTREAM: &str = "iheart";

#[derive(Clone)]
pub struct IHeartClient {
    config: IHeartConfig,
    client: Client,
}

impl IHeartClient {
    pub fn new(config: IHeartConfig, upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = build_client(upstream)?;
        Ok(Self { config, client })
    }

    fn base(&self) -> UpstreamResult<Url> {
        parse_base(&self.config.base_url, UPSTREAM)
    }

    async fn fetch_stations(&self, url: Url) -> UpstreamResult<Vec<Station>> {
        let body: Envelope = fetch_json(&self.client, url, UPSTREAM).await?;
        Ok(body
            .into_records()
            .iter()
            .filter_map(IHeartStation::to_station)
            .collect())
    }
}

#[async_trait]
impl CommercialCatalog for IHeartClient {
    async fn search(&self, query: &str, limit: usize) -> UpstreamResult<Vec<Station>> {
        let mut url = with_path(&self.base()?, &self.config.search_path);
        url.query_pairs_mut()
            .append_pair("keywords", query)
            .append_pair("limit", &limit.to_string());
        self.fetch_stations(url).await
    }

    async fn top(&self, limit: usize) -> UpstreamResult<Vec<Station>> {
        let mut url = with_path(&self.base()?, &self.config.live_stations_path);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.fetch_stations(url).await
    }

    async fn lookup(&self, id: &str) -> UpstreamResult<Option<Station>> {
        let url = join_segment(&self.base()?, &self.config.live_stations_path, id);
        let Some(body) = not_found_as_none(fetch_json::<Envelope>(&self.client, url, UPSTREAM).await)?
        else {
            return Ok(None);
        };

        let records = body.into_records();
        let picked = records
            .iter()
            .find(|record| record.station_id().as_deref() == Some(id))
            .or_else(|| records.first());
        Ok(picked.and_then(IHeartStation::to_station))
    }
}

/// iHeart ids show up both as JSON numbers and as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StationId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationId::Number(number) => write!(f, "{number}"),
            StationId::Text(text) => f.write_str(text.trim()),
        }
    }
}

/// Raw live-station record as returned by the iHeart content and search APIs.
///
/// Every field tolerates a wrongly typed value by falling back to `None`,
/// so only the candidates that depend on it are lost.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IHeartStation {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub id: Option<StationId>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub name: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub logo: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default, rename = "callLetters")]
    pub call_letters: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub streams: Option<StreamBundle>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamBundle {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub secure_hls_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub hls_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub secure_pls_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub pls_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub secure_shoutcast_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub shoutcast_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub stw_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub secure_rtmp_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub rtmp_stream: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub primary: Option<String>,
}

impl StreamBundle {
    /// Declared formats in playback priority order.
    pub fn declared(&self) -> [(&'static str, Option<&str>); 10] {
        [
            ("HLS (Secure)", self.secure_hls_stream.as_deref()),
            ("HLS", self.hls_stream.as_deref()),
            ("PLS (Secure)", self.secure_pls_stream.as_deref()),
            ("PLS", self.pls_stream.as_deref()),
            ("Shoutcast (Secure)", self.secure_shoutcast_stream.as_deref()),
            ("Shoutcast", self.shoutcast_stream.as_deref()),
            ("ST Stream", self.stw_stream.as_deref()),
            ("RTMP (Secure)", self.secure_rtmp_stream.as_deref()),
            ("RTMP", self.rtmp_stream.as_deref()),
            ("Primary", self.primary.as_deref()),
        ]
    }
}

impl IHeartStation {
    pub fn station_id(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(ToString::to_string)
            .filter(|id| !id.is_empty())
    }

    /// Lower-cased call letters, if the record has any.
    pub fn call_letters(&self) -> Option<String> {
        self.call_letters
            .as_deref()
            .map(str::trim)
            .filter(|letters| !letters.is_empty())
            .map(str::to_ascii_lowercase)
    }

    pub fn to_station(&self) -> Option<Station> {
        let id = self.station_id()?;
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Some(Station::new(
            id,
            name,
            sanitize_logo_url(self.logo.as_deref()),
            extract_streams(self),
        ))
    }
}

/// The response shapes iHeart uses across its endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    List(Vec<Value>),
    Stations { stations: Vec<Value> },
    Hits { hits: Vec<Value> },
    Results { results: ResultsBody },
    Bare(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultsBody {
    List(Vec<Value>),
    Nested { stations: Vec<Value> },
    Other(Value),
}

impl Envelope {
    fn into_records(self) -> Vec<IHeartStation> {
        let raw = match self {
            Envelope::List(items) => items,
            Envelope::Stations { stations } => stations,
            Envelope::Hits { hits } => hits,
            Envelope::Results {
                results: ResultsBody::List(items),
            }
            | Envelope::Results {
                results: ResultsBody::Nested { stations: items },
            } => items,
            Envelope::Results {
                results: ResultsBody::Other(_),
            } => Vec::new(),
            Envelope::Bare(object @ Value::Object(_)) => vec![object],
            Envelope::Bare(_) => Vec::new(),
        };
        decode_records(raw)
    }
}

fn decode_records(raw: Vec<Value>) -> Vec<IHeartStation> {
    decode_each::<IHeartStation>(raw, UPSTREAM)
        .into_iter()
        .filter(|record| record.station_id().is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(body: Value) -> Vec<String> {
        serde_json::from_value::<Envelope>(body)
            .unwrap()
            .into_records()
            .iter()
            .filter_map(IHeartStation::station_id)
            .collect()
    }

    #[test]
    fn normalizes_every_envelope_shape() {
        assert_eq!(ids(json!({ "stations": [{ "id": 1 }] })), vec!["1"]);
        assert_eq!(ids(json!({ "hits": [{ "id": "2" }] })), vec!["2"]);
        assert_eq!(ids(json!({ "results": [{ "id": 3 }] })), vec!["3"]);
        assert_eq!(
            ids(json!({ "results": { "stations": [{ "id": 4 }] } })),
            vec!["4"]
        );
        assert_eq!(ids(json!({ "id": 5, "name": "Bare" })), vec!["5"]);
        assert_eq!(ids(json!([{ "id": 6 }, { "id": 7 }])), vec!["6", "7"]);
        assert_eq!(ids(json!([{ "id": 11 }])), vec!["11"]);
    }

    #[test]
    fn falls_through_null_envelopes() {
        assert_eq!(
            ids(json!({ "stations": null, "results": [{ "id": 8 }] })),
            vec!["8"]
        );
        assert_eq!(ids(json!({ "hits": null, "results": null })), Vec::<String>::new());
        assert_eq!(ids(json!({ "error": "nope" })), Vec::<String>::new());
        assert_eq!(ids(json!("unexpected")), Vec::<String>::new());
    }

    #[test]
    fn skips_anonymous_records() {
        assert_eq!(
            ids(json!({ "hits": [
                { "id": true },
                { "name": "no id" },
                "not a record",
                { "id": 10, "name": "Fine" }
            ] })),
            vec!["10"]
        );
    }

    #[test]
    fn wrongly_typed_fields_only_drop_themselves() {
        let records = decode_records(vec![
            json!({ "id": 9, "name": "Nine", "streams": "n/a" }),
            json!({ "id": 12, "name": 42, "logo": [], "callLetters": 7 }),
            json!({
                "id": 13,
                "name": "Thirteen",
                "streams": { "hls_stream": 5, "pls_stream": "https://h/13.pls" }
            }),
        ]);
        let stations: Vec<Station> = records.iter().filter_map(IHeartStation::to_station).collect();
        assert_eq!(stations.len(), 3);

        assert_eq!(stations[0].name, "Nine");
        assert_eq!(
            stations[0]
                .streams
                .iter()
                .map(|c| c.title.as_str())
                .collect::<Vec<_>>(),
            vec![
                "Direct HLS (High Priority)",
                "Direct Stream (CDN)",
                "External Player (iHeart)"
            ]
        );

        assert_eq!(stations[1].name, "");
        assert_eq!(stations[1].logo, None);
        assert_eq!(stations[1].streams.len(), 3);

        assert_eq!(stations[2].streams[0].title, "PLS");
        assert_eq!(stations[2].streams.len(), 4);
    }

    #[test]
    fn converts_record_to_station() {
        let raw: IHeartStation = serde_json::from_value(json!({
            "id": 1469,
            "name": " Z100 ",
            "logo": "https://i.iheart.com/v3/re/new_assets/z100.png",
            "callLetters": "WHTZ-FM",
            "streams": { "secure_hls_stream": "https://h/z100.m3u8" }
        }))
        .unwrap();

        let station = raw.to_station().unwrap();
        assert_eq!(station.id, "1469");
        assert_eq!(station.name, "Z100");
        assert_eq!(
            station.logo.as_deref(),
            Some("https://i.iheart.com/v3/re/new_assets/z100.png")
        );
        assert_eq!(station.streams.len(), 7);
        assert_eq!(station.stream_url.as_deref(), Some("https://h/z100.m3u8"));
    }
}
