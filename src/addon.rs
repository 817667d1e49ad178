//! Stremio add-on payloads built from aggregated stations.

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::stations::Station;

pub const ID_PREFIX: &str = "heartio";
pub const CONTENT_TYPE: &str = "radio";
pub const TOP_CATALOG_ID: &str = "heartio-top";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub types: Vec<&'static str>,
    pub catalogs: Vec<CatalogDescriptor>,
    pub resources: Vec<&'static str>,
    pub id_prefixes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub extra: Vec<ExtraDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraDescriptor {
    pub name: &'static str,
    pub is_required: bool,
}

pub fn manifest() -> Manifest {
    Manifest {
        id: "community.heartio",
        version: env!("CARGO_PKG_VERSION"),
        name: "Heartio",
        description: "A radio streaming service for Stremio.",
        icon: "https://play-lh.googleusercontent.com/mLw46QbBnQtDoEGjKjBOo0qwSCH9YKo-owj0s_boiskp3bFxfGhB62bMpTBXfJ6mgMw=s188",
        types: vec![CONTENT_TYPE],
        catalogs: vec![CatalogDescriptor {
            kind: CONTENT_TYPE,
            id: TOP_CATALOG_ID,
            name: "Top Stations",
            extra: vec![ExtraDescriptor {
                name: "search",
                is_required: false,
            }],
        }],
        resources: vec!["catalog", "meta", "stream"],
        id_prefixes: vec![ID_PREFIX],
    }
}

#[derive(Debug, Serialize)]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub poster: Option<String>,
}

impl MetaPreview {
    pub fn from_station(station: &Station) -> Self {
        Self {
            id: addon_id(&station.id),
            kind: CONTENT_TYPE,
            name: station.name.clone(),
            poster: station.logo.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<MetaPreview>,
}

impl CatalogResponse {
    pub fn from_stations(stations: &[Station]) -> Self {
        Self {
            metas: stations.iter().map(MetaPreview::from_station).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub meta: MetaPreview,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub not_hashable: bool,
    pub is_live: Option<bool>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    pub title: String,
    pub url: String,
    pub external_url: Option<String>,
    pub behavior_hints: BehaviorHints,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub streams: Vec<StreamEntry>,
}

impl StreamResponse {
    /// Web-player links are flagged with `externalUrl` so clients open them
    /// in a browser instead of the media pipeline.
    pub fn from_station(station: &Station) -> Self {
        let live_hints = || BehaviorHints {
            not_hashable: true,
            is_live: Some(true),
        };

        let streams = if station.streams.is_empty() {
            station
                .stream_url
                .iter()
                .filter(|url| !url.is_empty())
                .map(|url| StreamEntry {
                    title: "Live Stream".to_string(),
                    url: url.clone(),
                    external_url: None,
                    behavior_hints: live_hints(),
                })
                .collect()
        } else {
            station
                .streams
                .iter()
                .map(|candidate| {
                    if candidate.is_external_player() {
                        StreamEntry {
                            title: candidate.title.clone(),
                            url: candidate.url.clone(),
                            external_url: Some(candidate.url.clone()),
                            behavior_hints: BehaviorHints {
                                not_hashable: true,
                                is_live: None,
                            },
                        }
                    } else {
                        StreamEntry {
                            title: candidate.title.clone(),
                            url: candidate.url.clone(),
                            external_url: None,
                            behavior_hints: live_hints(),
                        }
                    }
                })
                .collect()
        };

        Self { streams }
    }
}

pub fn addon_id(station_id: &str) -> String {
    format!("{ID_PREFIX}:{station_id}")
}

/// Strips the `heartio:` prefix the client puts in front of station ids.
pub fn station_id(addon_id: &str) -> &str {
    addon_id
        .strip_prefix(ID_PREFIX)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(addon_id)
}

/// Stremio extra segment, e.g. `search=jazz&skip=0`.
pub fn search_from_extra(extra: &str) -> Option<String> {
    extra
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "search")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
