use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::UpstreamConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::logging::logger;

/// Builds the reqwest client used for one upstream catalog.
pub fn build_client(config: &UpstreamConfig) -> reqwest::Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Single GET attempt, decoded as JSON. Non-2xx statuses are errors.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    upstream: &'static str,
) -> UpstreamResult<T> {
    let response = client
        .get(url)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| UpstreamError::Request { upstream, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status { upstream, status });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| UpstreamError::Request { upstream, source })?;
    serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode { upstream, source })
}

/// Treats a 404 as "nothing there" rather than a failure.
pub fn not_found_as_none<T>(result: UpstreamResult<T>) -> UpstreamResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(UpstreamError::Status {
            status: StatusCode::NOT_FOUND,
            ..
        }) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Decodes list entries one by one so a single odd record does not sink
/// the whole response.
pub fn decode_each<T: DeserializeOwned>(raw: Vec<Value>, upstream: &'static str) -> Vec<T> {
    let total = raw.len();
    let records: Vec<T> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();

    let skipped = total - records.len();
    if skipped > 0 {
        logger().debug(
            "upstream.records_skipped",
            json!({
                "upstream": upstream,
                "total": total,
                "skipped": skipped,
            }),
        );
    }
    records
}

pub fn parse_base(base_url: &str, upstream: &'static str) -> UpstreamResult<Url> {
    Url::parse(base_url.trim()).map_err(|source| UpstreamError::Url { upstream, source })
}

/// `{base}{path}/{segment}` with the segment percent-encoded.
pub fn join_segment(base: &Url, path: &str, segment: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!(
        "{}/{}",
        path.trim_end_matches('/'),
        urlencoding::encode(segment)
    ));
    url
}

pub fn with_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url
}
