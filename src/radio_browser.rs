use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use serde_with::{serde_as, DefaultOnError};

use crate::{
    catalog::CommunityDirectory,
    config::{RadioBrowserConfig, UpstreamConfig},
    error::{UpstreamError, UpstreamResult},
    logging::logger,
    stations::{sanitize_logo_url, sanitize_stream_url, Station, StreamCandidate, StreamSet},
    upstream::{build_client, decode_each, fetch_json, join_segment, parse_base, with_path},
};

const UPSTREAM: &str = "radio-browser";
const RADIO_BROWSER_WEB: &str = "https://www.radio-browser.info";

const RADIO_BROWSER_FALLBACK_HOSTS: &[&str] = &[
    "https://de1.api.radio-browser.info",
    "https://de2.api.radio-browser.info",
    "https://fi1.api.radio-browser.info",
    "https://nl1.api.radio-browser.info",
];

#[derive(Clone)]
pub struct RadioBrowserClient {
    config: RadioBrowserConfig,
    client: Client,
    host_pool: Vec<String>,
    host_cursor: Arc<AtomicUsize>,
}

impl RadioBrowserClient {
    pub fn new(config: RadioBrowserConfig, upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        Self::with_hosts(config, upstream, RADIO_BROWSER_FALLBACK_HOSTS)
    }

    /// Client bound to the configured host only, without the public mirrors.
    pub fn single_host(config: RadioBrowserConfig, upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        Self::with_hosts(config, upstream, &[])
    }

    fn with_hosts(
        config: RadioBrowserConfig,
        upstream: &UpstreamConfig,
        fallbacks: &[&str],
    ) -> anyhow::Result<Self> {
        let client = build_client(upstream)?;
        let mut host_pool: Vec<String> = Vec::new();
        if !config.default_base_url.trim().is_empty() {
            host_pool.push(config.default_base_url.trim().to_string());
        }
        for candidate in fallbacks {
            let normalized = candidate.trim();
            if normalized.is_empty() {
                continue;
            }
            if !host_pool
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(normalized))
            {
                host_pool.push(normalized.to_string());
            }
        }
        if host_pool.is_empty() {
            return Err(anyhow::anyhow!(
                "RADIO_BROWSER_BASE_URL must be configured with a valid HTTPS endpoint"
            ));
        }
        Ok(Self {
            config,
            client,
            host_pool,
            host_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Round-robin over the pool. Each call gets exactly one host; a failed
    /// host is not retried against the next one.
    fn next_base(&self) -> UpstreamResult<Url> {
        let len = self.host_pool.len();
        let index = self.host_cursor.fetch_add(1, Ordering::Relaxed) % len;
        parse_base(&self.host_pool[index], UPSTREAM)
    }

    async fn fetch_stations(&self, url: Url) -> UpstreamResult<Vec<RadioBrowserStation>> {
        let raw: Vec<Value> = fetch_json(&self.client, url, UPSTREAM).await?;
        Ok(decode_each(raw, UPSTREAM))
    }

    async fn search_raw(&self, name: &str, limit: usize) -> UpstreamResult<Vec<RadioBrowserStation>> {
        let mut url = with_path(&self.next_base()?, &self.config.search_path);
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("limit", &limit.to_string())
            .append_pair("hidebroken", "true")
            .append_pair("order", "clickcount")
            .append_pair("reverse", "true");
        self.fetch_stations(url).await
    }

    async fn by_name_raw(&self, name: &str, limit: usize) -> UpstreamResult<Vec<RadioBrowserStation>> {
        let mut url = join_segment(&self.next_base()?, &self.config.by_name_path, name);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("hidebroken", "true");
        self.fetch_stations(url).await
    }
}

#[async_trait]
impl CommunityDirectory for RadioBrowserClient {
    async fn search(&self, name: &str, limit: usize) -> UpstreamResult<Vec<Station>> {
        let found = self.search_raw(name, limit).await?;
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let mirrors = match self.by_name_raw(name, limit).await {
            Ok(mirrors) => mirrors,
            Err(error) => {
                log_secondary_failure(&error, name);
                Vec::new()
            }
        };

        Ok(found
            .iter()
            .map(|raw| {
                let extra = mirrors
                    .iter()
                    .filter(|mirror| raw.is_mirrored_by(mirror))
                    .filter_map(|mirror| mirror.candidate("Community Mirror"))
                    .collect();
                raw.to_station(extra)
            })
            .collect())
    }

    async fn top_voted(&self, limit: usize) -> UpstreamResult<Vec<Station>> {
        let mut url = with_path(&self.next_base()?, &self.config.top_vote_path);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("hidebroken", "true");
        Ok(self
            .fetch_stations(url)
            .await?
            .iter()
            .map(|raw| raw.to_station(Vec::new()))
            .collect())
    }

    async fn lookup(&self, uuid: &str) -> UpstreamResult<Option<Station>> {
        let url = join_segment(&self.next_base()?, &self.config.by_uuid_path, uuid);
        let found = self.fetch_stations(url).await?;
        let picked = found
            .iter()
            .find(|raw| raw.stationuuid.eq_ignore_ascii_case(uuid))
            .or_else(|| found.first());
        Ok(picked.map(|raw| raw.to_station(vec![raw.external_player()])))
    }

    async fn streams_for_name(
        &self,
        name: &str,
        limit: usize,
    ) -> UpstreamResult<Vec<StreamCandidate>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.search_raw(name, limit).await?;
        let mut set = StreamSet::new();
        set.extend(
            found
                .iter()
                .filter(|raw| names_overlap(&raw.normalized_name(), &wanted))
                .filter_map(|raw| raw.candidate("Community Stream")),
        );
        Ok(set.into_vec())
    }
}

fn log_secondary_failure(error: &UpstreamError, name: &str) {
    logger().warn(
        "upstream.failed",
        json!({
            "upstream": error.upstream(),
            "operation": "mirrors_by_name",
            "kind": error.kind(),
            "query": name,
            "error": error.to_string(),
        }),
    );
}

fn names_overlap(candidate: &str, wanted: &str) -> bool {
    !candidate.is_empty() && (candidate.contains(wanted) || wanted.contains(candidate))
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct RadioBrowserStation {
    pub stationuuid: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub name: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub url: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub url_resolved: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub codec: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub bitrate: Option<i32>,
}

impl RadioBrowserStation {
    fn normalized_name(&self) -> String {
        self.name.as_deref().unwrap_or_default().trim().to_lowercase()
    }

    fn stream_url(&self) -> Option<String> {
        self.url_resolved
            .as_deref()
            .and_then(sanitize_stream_url)
            .or_else(|| self.url.as_deref().and_then(sanitize_stream_url))
    }

    /// Candidate label: `"{prefix} (CODEC, N kbps)"`, trimmed to what is known.
    fn label(&self, prefix: &str) -> String {
        let mut details = Vec::new();
        if let Some(codec) = self
            .codec
            .as_deref()
            .map(str::trim)
            .filter(|codec| !codec.is_empty() && !codec.eq_ignore_ascii_case("unknown"))
        {
            details.push(codec.to_ascii_uppercase());
        }
        if let Some(bitrate) = self.bitrate.filter(|bitrate| *bitrate > 0) {
            details.push(format!("{bitrate} kbps"));
        }
        if details.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix} ({})", details.join(", "))
        }
    }

    fn candidate(&self, prefix: &str) -> Option<StreamCandidate> {
        self.stream_url()
            .map(|url| StreamCandidate::new(self.label(prefix), url))
    }

    fn external_player(&self) -> StreamCandidate {
        StreamCandidate::new(
            "External Player (RadioBrowser)",
            format!(
                "{RADIO_BROWSER_WEB}/history/{}",
                urlencoding::encode(&self.stationuuid)
            ),
        )
    }

    fn is_mirrored_by(&self, other: &RadioBrowserStation) -> bool {
        !other.stationuuid.eq_ignore_ascii_case(&self.stationuuid)
            && !self.normalized_name().is_empty()
            && other.normalized_name() == self.normalized_name()
    }

    fn to_station(&self, extra: Vec<StreamCandidate>) -> Station {
        let mut set = StreamSet::new();
        set.extend(self.candidate("Community Stream"));
        set.extend(extra);
        Station::new(
            self.stationuuid.clone(),
            self.name.as_deref().unwrap_or_default().trim(),
            sanitize_logo_url(self.favicon.as_deref()),
            set.into_vec(),
        )
    }
}
