use crate::errors::AppError;
use crate::hipster::format_listener_count;
use crate::lastfm::{ArtistInfo, ChartRange, Period, RecentTrack, TopArtist};
use crate::models::{
    Aggregate, ArtistResponse, GenreCount, HistoryPoint, HistoryQuery, MusicStatsResponse,
    PeriodQuery, PeriodsQuery, ProfileResponse, ScoreQuery, ScoreResponse, TrackResponse,
};
use crate::state::AppState;
use crate::stats::{self, PROFILE_GENRES, ScoredArtist, TOP_GENRES};
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Html,
};
use reqwest::Url;
use std::collections::BTreeMap;
use tracing::warn;

const LASTFM_MUSIC_URL: &str = "https://www.last.fm/music";
const DEFAULT_PROFILE_PERIODS: [Period; 3] = [Period::Month, Period::Quarter, Period::Year];

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.profile()))
}

pub async fn hipster_profile(State(state): State<AppState>) -> Json<ProfileResponse> {
    let profile = *state.profile();
    Json(ProfileResponse {
        bands: profile.bands(),
        profile,
    })
}

pub async fn hipster_score(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<ScoreResponse>, AppError> {
    let profile = state.profile();
    let score = profile.score(query.listeners)?;
    let category = profile.classify(score);

    Ok(Json(ScoreResponse {
        listeners: query.listeners,
        hipster_score: score,
        category,
        label: profile.label(category),
        formatted: format_listener_count(query.listeners),
    }))
}

pub async fn last_played(State(state): State<AppState>) -> Result<Json<TrackResponse>, AppError> {
    let track = state
        .lastfm
        .recent_tracks(1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found("no recent tracks"))?;

    let genre = track_genre(&state, &track).await;
    let now_playing = track.now_playing;
    let mut response = track_response(&state, track, genre).await;
    response.now_playing = Some(now_playing);
    if now_playing {
        response.timestamp = None;
    }

    Ok(Json(response))
}

pub async fn recent_tracks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackResponse>>, AppError> {
    let limit = state.config.recent_tracks_limit.saturating_add(1);
    let tracks = state.lastfm.recent_tracks(limit).await?;

    // The newest track is already shown as last played.
    let mut responses = Vec::with_capacity(tracks.len());
    for track in tracks.into_iter().skip(1).filter(|track| !track.now_playing) {
        let genre = if state.config.show_recent_tracks_genres {
            track_genre(&state, &track).await
        } else {
            String::new()
        };
        responses.push(track_response(&state, track, genre).await);
    }

    Ok(Json(responses))
}

pub async fn top_artists(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<ArtistResponse>>, AppError> {
    let period = Period::parse_or_default(query.period.as_deref());
    let limit = state.config.top_artists_week_limit;
    Ok(Json(artist_responses(&state, period, limit).await?))
}

pub async fn top_artists_year(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArtistResponse>>, AppError> {
    let limit = state.config.top_artists_year_limit;
    Ok(Json(artist_responses(&state, Period::Year, limit).await?))
}

pub async fn weekly_chart_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChartRange>>, AppError> {
    Ok(Json(state.lastfm.weekly_chart_list().await?))
}

pub async fn artist_history(
    State(state): State<AppState>,
    Path(artist): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    let charts = state.lastfm.weekly_chart_list().await?;

    let mut history = Vec::new();
    for chart in stats::recent_charts(&charts, query.weeks) {
        let entries = state
            .lastfm
            .weekly_artist_chart(&chart.from, &chart.to)
            .await?;
        history.push(HistoryPoint {
            week_start: chart.from.clone(),
            week_end: chart.to.clone(),
            playcount: stats::artist_playcount(&entries, &artist),
        });
    }

    if query.aggregate == Aggregate::Month {
        history = stats::aggregate_monthly(&history);
    }

    Ok(Json(history))
}

pub async fn genre_profile(
    State(state): State<AppState>,
    Query(query): Query<PeriodsQuery>,
) -> Result<Json<BTreeMap<String, BTreeMap<String, f64>>>, AppError> {
    let periods: Vec<Period> = match query.periods.as_deref() {
        Some(list) => list.split(',').filter_map(Period::parse).collect(),
        None => DEFAULT_PROFILE_PERIODS.to_vec(),
    };

    let mut profile = BTreeMap::new();
    for period in periods {
        let artists = scored_artists(&state, period, state.config.genre_artist_limit).await?;
        profile.insert(
            period.as_str().to_string(),
            stats::genre_shares(&artists, PROFILE_GENRES),
        );
    }

    Ok(Json(profile))
}

pub async fn top_genres(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<GenreCount>>, AppError> {
    let period = Period::parse_or_default(query.period.as_deref());
    let artists = scored_artists(&state, period, state.config.genre_artist_limit).await?;

    let mut tally = stats::genre_tally(&artists);
    tally.truncate(TOP_GENRES);
    Ok(Json(tally))
}

pub async fn music_stats(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<MusicStatsResponse>, AppError> {
    let period = Period::parse_or_default(query.period.as_deref());
    let artists = scored_artists(&state, period, state.config.genre_artist_limit).await?;
    Ok(Json(stats::music_stats(state.profile(), &artists)))
}

async fn track_genre(state: &AppState, track: &RecentTrack) -> String {
    match state.lastfm.track_top_tag(&track.artist, &track.name).await {
        Ok(tag) => tag.unwrap_or_default(),
        Err(err) => {
            warn!("genre lookup failed for {} - {}: {err}", track.artist, track.name);
            String::new()
        }
    }
}

async fn track_response(state: &AppState, track: RecentTrack, genre: String) -> TrackResponse {
    let listeners = match state.lastfm.artist_info(&track.artist).await {
        Ok(info) => info.listeners,
        Err(err) => {
            warn!("artist lookup failed for {}: {err}", track.artist);
            None
        }
    };
    let (listeners, hipster_score) = listener_score(state, listeners);

    TrackResponse {
        artist_url: lastfm_url(&[&track.artist]),
        track_url: lastfm_url(&[&track.artist, "_", &track.name]),
        artist: track.artist,
        name: track.name,
        album: track.album,
        image: track.image,
        now_playing: None,
        timestamp: track.timestamp,
        genre,
        listeners,
        hipster_score,
    }
}

// An unknown listener count shows as 0/0; a known one, zero included, is scored.
fn listener_score(state: &AppState, listeners: Option<u64>) -> (u64, u8) {
    match listeners {
        Some(count) => (count, state.profile().display_score(count)),
        None => (0, 0),
    }
}

async fn enriched_artists(
    state: &AppState,
    period: Period,
    limit: u32,
) -> Result<Vec<(TopArtist, ArtistInfo)>, AppError> {
    let artists = state.lastfm.top_artists(period, limit).await?;

    let mut enriched = Vec::with_capacity(artists.len());
    for artist in artists {
        let info = state.lastfm.artist_info(&artist.name).await?;
        enriched.push((artist, info));
    }
    Ok(enriched)
}

async fn artist_responses(
    state: &AppState,
    period: Period,
    limit: u32,
) -> Result<Vec<ArtistResponse>, AppError> {
    Ok(enriched_artists(state, period, limit)
        .await?
        .into_iter()
        .map(|(artist, info)| {
            let (listeners, hipster_score) = listener_score(state, info.listeners);
            ArtistResponse {
                hipster_score,
                listeners,
                genre: info.top_tag.unwrap_or_default(),
                name: artist.name,
                playcount: artist.playcount,
                url: artist.url,
                image: artist.image,
            }
        })
        .collect())
}

async fn scored_artists(
    state: &AppState,
    period: Period,
    limit: u32,
) -> Result<Vec<ScoredArtist>, AppError> {
    Ok(enriched_artists(state, period, limit)
        .await?
        .into_iter()
        .map(|(artist, info)| ScoredArtist {
            name: artist.name,
            playcount: artist.playcount,
            listeners: info.listeners,
            genre: info.top_tag,
        })
        .collect())
}

fn lastfm_url(segments: &[&str]) -> String {
    let Ok(mut url) = Url::parse(LASTFM_MUSIC_URL) else {
        return String::new();
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.extend(segments);
    }
    url.to_string()
}
