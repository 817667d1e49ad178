//! Turns a single iHeart station record into an ordered list of playable
//! stream candidates.
//!
//! Priority: formats the catalog declares, then CDN URLs synthesized from
//! the station id and call letters, then web player links as a last resort.

use urlencoding::encode;

use crate::iheart::IHeartStation;
use crate::stations::{StreamCandidate, StreamSet};

const REVMA_CDN: &str = "https://stream.revma.ihrhls.com";
const IHEART_WEB: &str = "https://www.iheart.com";

pub fn extract_streams(raw: &IHeartStation) -> Vec<StreamCandidate> {
    let mut set = StreamSet::new();

    if let Some(bundle) = &raw.streams {
        for (title, url) in bundle.declared() {
            if let Some(url) = url {
                set.push(title, url.trim());
            }
        }
    }

    if let Some(id) = raw.station_id() {
        let id = encode(&id);
        let letters = raw.call_letters();

        set.push(
            "Direct HLS (High Priority)",
            format!("{REVMA_CDN}/zc{id}/hls.m3u8"),
        );
        set.push("Direct Stream (CDN)", format!("{REVMA_CDN}/zc{id}"));

        if let Some(letters) = &letters {
            let label = letters.to_ascii_uppercase();
            let path = encode(letters);
            set.push(
                format!("Direct HLS ({label})"),
                format!("{REVMA_CDN}/{path}/hls.m3u8"),
            );
            set.push(
                format!("Direct Stream ({label})"),
                format!("{REVMA_CDN}/{path}"),
            );
        }

        set.push(
            "External Player (iHeart)",
            format!("{IHEART_WEB}/live/{id}/"),
        );

        if let Some(letters) = &letters {
            set.push(
                format!("External Player (iHeart {})", letters.to_ascii_uppercase()),
                format!("{IHEART_WEB}/live/{}-{id}/", encode(letters)),
            );
        }
    }

    set.into_vec()
}
