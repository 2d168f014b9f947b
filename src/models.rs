use crate::hipster::{Category, CategoryBand, ScoringProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub artist: String,
    pub name: String,
    pub album: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<bool>,
    pub timestamp: Option<String>,
    pub genre: String,
    pub artist_url: String,
    pub track_url: String,
    pub listeners: u64,
    pub hipster_score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistResponse {
    pub name: String,
    pub playcount: u64,
    pub url: String,
    pub image: String,
    pub listeners: u64,
    pub hipster_score: u8,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub week_start: String,
    pub week_end: String,
    pub playcount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDiversity {
    pub top_artist_percentage: f64,
    pub top_artist_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicStatsResponse {
    pub avg_hipster_score: u8,
    pub hipster_distribution: BTreeMap<Category, u32>,
    pub artist_diversity: ArtistDiversity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub profile: ScoringProfile,
    pub bands: Vec<CategoryBand>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub listeners: f64,
    pub hipster_score: f64,
    pub category: Category,
    pub label: &'static str,
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub listeners: f64,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodsQuery {
    pub periods: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_weeks")]
    pub weeks: usize,
    #[serde(default)]
    pub aggregate: Aggregate,
}

fn default_weeks() -> usize {
    12
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Week,
    Month,
}
