use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/hipster/profile", get(handlers::hipster_profile))
        .route("/api/hipster/score", get(handlers::hipster_score))
        .route("/api/lastfm/last-played", get(handlers::last_played))
        .route("/api/lastfm/recent-tracks", get(handlers::recent_tracks))
        .route("/api/lastfm/top-artists", get(handlers::top_artists))
        .route("/api/lastfm/top-artists-year", get(handlers::top_artists_year))
        .route("/api/lastfm/weekly-chart-list", get(handlers::weekly_chart_list))
        .route(
            "/api/lastfm/artist-history/:artist_name",
            get(handlers::artist_history),
        )
        .route("/api/lastfm/genre-profile", get(handlers::genre_profile))
        .route("/api/lastfm/top-genres", get(handlers::top_genres))
        .route("/api/lastfm/music-stats", get(handlers::music_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
