use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Title marker of web-player links, which always sort after playable URLs.
const EXTERNAL_PLAYER: &str = "External Player";

/// One playable URL plus a human-readable label of its protocol or source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    pub title: String,
    pub url: String,
}

impl StreamCandidate {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn is_external_player(&self) -> bool {
        self.title.contains(EXTERNAL_PLAYER)
    }
}

/// A live station in the shape handed to the HTTP layer.
///
/// `stream_url` mirrors the first entry of `streams`; only the
/// [`Station::unknown`] placeholder breaks that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub streams: Vec<StreamCandidate>,
    #[serde(rename = "streamUrl")]
    pub stream_url: Option<String>,
}

impl Station {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        logo: Option<String>,
        streams: Vec<StreamCandidate>,
    ) -> Self {
        let stream_url = streams.first().map(|candidate| candidate.url.clone());
        Self {
            id: id.into(),
            name: name.into(),
            logo,
            streams,
            stream_url,
        }
    }

    /// Terminal fallback returned when every lookup tier came up empty.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Unknown".to_string(),
            logo: Some(String::new()),
            streams: Vec::new(),
            stream_url: Some(String::new()),
        }
    }

    pub fn is_playable(&self) -> bool {
        !self.streams.is_empty() && self.stream_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Adds candidates whose URL is not already present, ahead of the
    /// external-player links, and refreshes `stream_url`.
    pub fn merge_streams(&mut self, extra: impl IntoIterator<Item = StreamCandidate>) {
        let mut playable = std::mem::take(&mut self.streams);
        let split = playable
            .iter()
            .position(StreamCandidate::is_external_player)
            .unwrap_or(playable.len());
        let web_players = playable.split_off(split);

        let mut set = StreamSet::from_candidates(playable);
        set.extend(extra);
        set.extend(web_players);
        self.streams = set.into_vec();
        self.stream_url = self.streams.first().map(|candidate| candidate.url.clone());
    }
}

/// Ordered candidate list that keeps the first occurrence of every URL.
#[derive(Debug, Default)]
pub struct StreamSet {
    seen: HashSet<String>,
    candidates: Vec<StreamCandidate>,
}

impl StreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: Vec<StreamCandidate>) -> Self {
        let mut set = Self::new();
        set.extend(candidates);
        set
    }

    /// Returns `false` when the URL is empty or already present.
    pub fn push(&mut self, title: impl Into<String>, url: impl Into<String>) -> bool {
        let url = url.into();
        if url.trim().is_empty() || self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.candidates.push(StreamCandidate::new(title, url));
        true
    }

    pub fn into_vec(self) -> Vec<StreamCandidate> {
        self.candidates
    }
}

impl Extend<StreamCandidate> for StreamSet {
    fn extend<I: IntoIterator<Item = StreamCandidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.push(candidate.title, candidate.url);
        }
    }
}
