//! Last.fm encodes most numbers as strings and collapses one-element lists
//! into bare objects; the wire types below accept both shapes.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("hipster_dash/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum LastfmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("Last.fm error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Last.fm responded with HTTP {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Period {
    #[default]
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
    Overall,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::Week,
        Period::Month,
        Period::Quarter,
        Period::HalfYear,
        Period::Year,
        Period::Overall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Week => "7day",
            Period::Month => "1month",
            Period::Quarter => "3month",
            Period::HalfYear => "6month",
            Period::Year => "12month",
            Period::Overall => "overall",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|period| period.as_str() == value.trim())
    }

    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentTrack {
    pub artist: String,
    pub name: String,
    pub album: String,
    pub image: String,
    pub now_playing: bool,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArtistInfo {
    /// `None` when Last.fm sent no `stats` block.
    pub listeners: Option<u64>,
    pub top_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopArtist {
    pub name: String,
    pub playcount: u64,
    pub url: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
    pub name: String,
    pub playcount: u64,
}

// Wire types

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }

    Ok(match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n,
        NumOrStr::Str(s) => s.trim().parse().unwrap_or(0),
    })
}

#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RecentTracksEnvelope {
    recenttracks: RecentTracksBody,
}

#[derive(Debug, Deserialize)]
struct RecentTracksBody {
    #[serde(default)]
    track: OneOrMany<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    name: String,
    #[serde(default)]
    artist: Text,
    #[serde(default)]
    album: Text,
    #[serde(default)]
    image: Vec<Text>,
    date: Option<RawDate>,
    #[serde(rename = "@attr")]
    attr: Option<RawTrackAttr>,
}

#[derive(Debug, Deserialize)]
struct RawDate {
    uts: String,
}

#[derive(Debug, Deserialize)]
struct RawTrackAttr {
    nowplaying: Option<String>,
}

impl From<RawTrack> for RecentTrack {
    fn from(raw: RawTrack) -> Self {
        let now_playing = raw
            .attr
            .and_then(|attr| attr.nowplaying)
            .is_some_and(|flag| flag == "true");
        Self {
            artist: raw.artist.text,
            name: raw.name,
            album: raw.album.text,
            image: last_image(raw.image),
            now_playing,
            timestamp: raw.date.map(|date| date.uts),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Tags {
    #[serde(default)]
    tag: OneOrMany<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

impl Tags {
    fn top(self) -> Option<String> {
        self.tag
            .into_vec()
            .into_iter()
            .next()
            .map(|tag| tag.name.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct TrackInfoEnvelope {
    track: Option<TrackInfoBody>,
}

#[derive(Debug, Deserialize)]
struct TrackInfoBody {
    #[serde(default, deserialize_with = "lenient")]
    toptags: Option<Tags>,
}

#[derive(Debug, Deserialize)]
struct ArtistInfoEnvelope {
    artist: Option<ArtistInfoBody>,
}

#[derive(Debug, Deserialize)]
struct ArtistInfoBody {
    stats: Option<ArtistStats>,
    #[serde(default, deserialize_with = "lenient")]
    tags: Option<Tags>,
}

impl From<ArtistInfoBody> for ArtistInfo {
    fn from(body: ArtistInfoBody) -> Self {
        Self {
            listeners: body.stats.map(|stats| stats.listeners),
            top_tag: body.tags.and_then(Tags::top),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtistStats {
    #[serde(deserialize_with = "de_count")]
    listeners: u64,
}

#[derive(Debug, Deserialize)]
struct TopArtistsEnvelope {
    topartists: TopArtistsBody,
}

#[derive(Debug, Deserialize)]
struct TopArtistsBody {
    #[serde(default)]
    artist: OneOrMany<RawTopArtist>,
}

#[derive(Debug, Deserialize)]
struct RawTopArtist {
    name: String,
    #[serde(default, deserialize_with = "de_count")]
    playcount: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct ChartListEnvelope {
    weeklychartlist: Option<ChartListBody>,
}

#[derive(Debug, Deserialize)]
struct ChartListBody {
    #[serde(default)]
    chart: OneOrMany<ChartRange>,
}

#[derive(Debug, Deserialize)]
struct ArtistChartEnvelope {
    weeklyartistchart: Option<ArtistChartBody>,
}

#[derive(Debug, Deserialize)]
struct ArtistChartBody {
    #[serde(default)]
    artist: OneOrMany<RawChartArtist>,
}

#[derive(Debug, Deserialize)]
struct RawChartArtist {
    name: String,
    #[serde(default, deserialize_with = "de_count")]
    playcount: u64,
}

/// Empty tag blocks arrive as `""` rather than an object.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn last_image(images: Vec<Text>) -> String {
    images.into_iter().last().map(|image| image.text).unwrap_or_default()
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, LastfmError> {
    if let Some(code) = body.get("error").and_then(Value::as_i64) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(LastfmError::Api { code, message });
    }
    serde_json::from_value(body).map_err(|e| LastfmError::Parse(e.to_string()))
}

#[derive(Clone)]
pub struct LastfmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    username: String,
}

impl LastfmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, LastfmError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LastfmError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            username: username.into(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, LastfmError> {
        tracing::debug!(method, "calling Last.fm");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", method),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| LastfmError::Network(e.to_string()))?;

        let status = response.status();
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(LastfmError::Status(status.as_u16())),
            Err(e) => return Err(LastfmError::Parse(e.to_string())),
        };

        // Last.fm reports most failures as JSON alongside a 4xx status.
        match decode(body) {
            Err(LastfmError::Parse(_)) if !status.is_success() => {
                Err(LastfmError::Status(status.as_u16()))
            }
            other => other,
        }
    }

    pub async fn recent_tracks(&self, limit: u32) -> Result<Vec<RecentTrack>, LastfmError> {
        let limit = limit.to_string();
        let envelope: RecentTracksEnvelope = self
            .call(
                "user.getrecenttracks",
                &[("user", self.username.as_str()), ("limit", limit.as_str())],
            )
            .await?;
        Ok(envelope
            .recenttracks
            .track
            .into_vec()
            .into_iter()
            .map(RecentTrack::from)
            .collect())
    }

    pub async fn track_top_tag(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Option<String>, LastfmError> {
        let envelope: TrackInfoEnvelope = self
            .call("track.getinfo", &[("artist", artist), ("track", track)])
            .await?;
        Ok(envelope
            .track
            .and_then(|track| track.toptags)
            .and_then(Tags::top))
    }

    pub async fn artist_info(&self, artist: &str) -> Result<ArtistInfo, LastfmError> {
        let envelope: ArtistInfoEnvelope =
            self.call("artist.getinfo", &[("artist", artist)]).await?;
        let body = envelope
            .artist
            .ok_or_else(|| LastfmError::Parse(format!("no artist block for {artist}")))?;
        Ok(ArtistInfo::from(body))
    }

    pub async fn top_artists(
        &self,
        period: Period,
        limit: u32,
    ) -> Result<Vec<TopArtist>, LastfmError> {
        let limit = limit.to_string();
        let envelope: TopArtistsEnvelope = self
            .call(
                "user.gettopartists",
                &[
                    ("user", self.username.as_str()),
                    ("period", period.as_str()),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;
        Ok(envelope
            .topartists
            .artist
            .into_vec()
            .into_iter()
            .map(|raw| TopArtist {
                name: raw.name,
                playcount: raw.playcount,
                url: raw.url,
                image: last_image(raw.image),
            })
            .collect())
    }

    pub async fn weekly_chart_list(&self) -> Result<Vec<ChartRange>, LastfmError> {
        let envelope: ChartListEnvelope = self
            .call("user.getweeklychartlist", &[("user", self.username.as_str())])
            .await?;
        Ok(envelope
            .weeklychartlist
            .map(|body| body.chart.into_vec())
            .unwrap_or_default())
    }

    pub async fn weekly_artist_chart(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<ChartEntry>, LastfmError> {
        let envelope: ArtistChartEnvelope = self
            .call(
                "user.getweeklyartistchart",
                &[("user", self.username.as_str()), ("from", from), ("to", to)],
            )
            .await?;
        Ok(envelope
            .weeklyartistchart
            .map(|body| body.artist.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|raw| ChartEntry {
                name: raw.name,
                playcount: raw.playcount,
            })
            .collect())
    }
}
