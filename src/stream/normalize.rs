//! Upstream shape detection
//!
//! Upstreams disagree on where sources live and what their fields are
//! called. Each [`ShapeRule`] names one known location; the first rule that
//! yields at least one usable source wins. Source items accept `file` or
//! `url`, `label` or `name`. Media kind always comes from the URL.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Marker, StreamSource, SubtitleKind, SubtitleTrack};

/// A known location of an array inside an upstream document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeRule {
    pub name: &'static str,
    /// JSON pointer to the array
    pub pointer: &'static str,
}

impl ShapeRule {
    /// Non-empty array at this rule's location
    pub fn extract<'a>(&self, body: &'a Value) -> Option<&'a [Value]> {
        body.pointer(self.pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .filter(|items| !items.is_empty())
    }
}

pub const SOURCE_RULES: &[ShapeRule] = &[
    ShapeRule {
        name: "sources",
        pointer: "/sources",
    },
    ShapeRule {
        name: "data.sources",
        pointer: "/data/sources",
    },
    ShapeRule {
        name: "streams",
        pointer: "/streams",
    },
    ShapeRule {
        name: "data.streams",
        pointer: "/data/streams",
    },
];

pub const SUBTITLE_RULES: &[ShapeRule] = &[
    ShapeRule {
        name: "subtitles",
        pointer: "/subtitles",
    },
    ShapeRule {
        name: "tracks",
        pointer: "/tracks",
    },
    ShapeRule {
        name: "data.subtitles",
        pointer: "/data/subtitles",
    },
    ShapeRule {
        name: "data.tracks",
        pointer: "/data/tracks",
    },
];

/// Canonical pieces pulled out of one upstream document
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Name of the rule that matched
    pub rule: &'static str,
    pub sources: Vec<StreamSource>,
    pub subtitles: Vec<SubtitleTrack>,
    pub intro: Option<Marker>,
    pub outro: Option<Marker>,
}

/// Normalize an upstream document
///
/// `server`/`audio` feed the default label of sources that carry none.
/// Returns `None` when no rule finds a usable source, which callers treat
/// as "no data" for that candidate.
pub fn normalize(body: &Value, server: &str, audio: &str) -> Option<Normalized> {
    let (rule, sources) = SOURCE_RULES.iter().find_map(|rule| {
        let sources = rule
            .extract(body)?
            .iter()
            .filter_map(|item| source_from_value(item, server, audio))
            .collect::<Vec<_>>();
        (!sources.is_empty()).then_some((rule.name, sources))
    })?;

    let subtitles = SUBTITLE_RULES
        .iter()
        .find_map(|rule| rule.extract(body))
        .map(|items| items.iter().filter_map(subtitle_from_value).collect())
        .unwrap_or_default();

    Some(Normalized {
        rule,
        sources,
        subtitles,
        intro: marker_at(body, "intro"),
        outro: marker_at(body, "outro"),
    })
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quality: Option<Value>,
    #[serde(default)]
    lang: Option<String>,
}

/// Convert one source item; items without a URL are dropped
pub fn source_from_value(item: &Value, server: &str, audio: &str) -> Option<StreamSource> {
    let raw = match item {
        Value::String(url) => RawSource {
            file: Some(url.clone()),
            url: None,
            label: None,
            name: None,
            quality: None,
            lang: None,
        },
        other => RawSource::deserialize(other).ok()?,
    };

    let url = raw
        .file
        .or(raw.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())?;
    let label = raw
        .label
        .or(raw.name)
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| StreamSource::default_label(server, audio));

    let mut source = StreamSource::new(url, label);
    source.quality = raw.quality.as_ref().and_then(quality_label);
    source.lang = raw.lang.filter(|l| !l.is_empty());
    Some(source)
}

fn quality_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct RawSubtitle {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

fn subtitle_from_value(item: &Value) -> Option<SubtitleTrack> {
    let raw = RawSubtitle::deserialize(item).ok()?;
    let url = raw.file.or(raw.url).filter(|u| !u.is_empty())?;

    Some(SubtitleTrack {
        url,
        label: raw
            .label
            .or(raw.lang)
            .unwrap_or_else(|| "Unknown".to_string()),
        kind: raw
            .kind
            .as_deref()
            .map(SubtitleKind::from_str_loose)
            .unwrap_or_default(),
    })
}

fn marker_at(body: &Value, key: &str) -> Option<Marker> {
    [format!("/{}", key), format!("/data/{}", key)]
        .iter()
        .find_map(|pointer| body.pointer(pointer))
        .and_then(|value| Marker::deserialize(value).ok())
}
