use crate::hipster::{Category, ScoringProfile};
use crate::lastfm::{ChartEntry, ChartRange};
use crate::models::{ArtistDiversity, GenreCount, HistoryPoint, MusicStatsResponse};
use chrono::{DateTime, Datelike};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

pub const TOP_GENRES: usize = 10;
pub const PROFILE_GENRES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArtist {
    pub name: String,
    pub playcount: u64,
    pub listeners: Option<u64>,
    pub genre: Option<String>,
}

/// Last `weeks` charts; zero keeps them all.
pub fn recent_charts(charts: &[ChartRange], weeks: usize) -> &[ChartRange] {
    if weeks == 0 {
        return charts;
    }
    &charts[charts.len().saturating_sub(weeks)..]
}

pub fn artist_playcount(entries: &[ChartEntry], artist: &str) -> u64 {
    let wanted = artist.to_lowercase();
    entries
        .iter()
        .find(|entry| entry.name.to_lowercase() == wanted)
        .map_or(0, |entry| entry.playcount)
}

// Each month keeps the earliest week start as both of its bounds.
pub fn aggregate_monthly(history: &[HistoryPoint]) -> Vec<HistoryPoint> {
    let mut months: BTreeMap<(i32, u32), (String, u64)> = BTreeMap::new();

    for week in history {
        let Some(start) = week
            .week_start
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            warn!("skipping week with unparseable start {:?}", week.week_start);
            continue;
        };

        let entry = months
            .entry((start.year(), start.month()))
            .or_insert_with(|| (week.week_start.clone(), 0));
        entry.1 = entry.1.saturating_add(week.playcount);
    }

    months
        .into_values()
        .map(|(first_start, playcount)| HistoryPoint {
            week_start: first_start.clone(),
            week_end: first_start,
            playcount,
        })
        .collect()
}

pub fn genre_tally(artists: &[ScoredArtist]) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for artist in artists {
        if let Some(genre) = artist.genre.as_deref().filter(|g| !g.is_empty()) {
            let count = counts.entry(genre).or_default();
            *count = count.saturating_add(artist.playcount);
        }
    }

    let mut tally: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    tally
}

pub fn genre_shares(artists: &[ScoredArtist], limit: usize) -> BTreeMap<String, f64> {
    let tally = genre_tally(artists);
    let total: u64 = tally.iter().map(|g| g.count).sum();
    if total == 0 {
        return BTreeMap::new();
    }

    tally
        .into_iter()
        .take(limit)
        .map(|g| (g.genre, round_to_tenth(g.count as f64 * 100.0 / total as f64)))
        .collect()
}

pub fn music_stats(profile: &ScoringProfile, artists: &[ScoredArtist]) -> MusicStatsResponse {
    let mut hipster_distribution: BTreeMap<Category, u32> =
        Category::ALL.iter().map(|&category| (category, 0)).collect();
    let mut score_sum = 0u64;
    let mut scored = 0u64;

    // Artists without a listener count have no score to contribute.
    for listeners in artists.iter().filter_map(|a| a.listeners) {
        let score = profile.display_score(listeners);
        score_sum += u64::from(score);
        scored += 1;
        *hipster_distribution
            .entry(profile.classify(f64::from(score)))
            .or_default() += 1;
    }

    let avg_hipster_score = if scored == 0 {
        0
    } else {
        (score_sum as f64 / scored as f64).round() as u8
    };

    let total_plays: u64 = artists.iter().map(|a| a.playcount).sum();
    let artist_diversity = match artists.iter().max_by_key(|a| a.playcount) {
        Some(top) if total_plays > 0 => ArtistDiversity {
            top_artist_percentage: round_to_tenth(top.playcount as f64 * 100.0 / total_plays as f64),
            top_artist_name: top.name.clone(),
        },
        _ => ArtistDiversity {
            top_artist_percentage: 0.0,
            top_artist_name: String::new(),
        },
    };

    MusicStatsResponse {
        avg_hipster_score,
        hipster_distribution,
        artist_diversity,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
