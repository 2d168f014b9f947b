use crate::hipster::ScoringProfile;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub username: String,
    pub api_url: String,
    pub recent_tracks_limit: u32,
    pub top_artists_week_limit: u32,
    pub top_artists_year_limit: u32,
    pub show_recent_tracks_genres: bool,
    pub genre_artist_limit: u32,
    pub profile: ScoringProfile,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let profile = match lookup("HIPSTER_PROFILE") {
            Some(name) => ScoringProfile::by_name(&name).ok_or(ConfigError::Invalid {
                key: "HIPSTER_PROFILE",
                value: name,
            })?,
            None => ScoringProfile::current(),
        };

        Ok(Self {
            api_key: required("LASTFM_API_KEY")?,
            username: required("LASTFM_USERNAME")?,
            api_url: lookup("LASTFM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            recent_tracks_limit: parsed(&lookup, "RECENT_TRACKS_LIMIT", 10)?,
            top_artists_week_limit: parsed(&lookup, "TOP_ARTISTS_WEEK_LIMIT", 10)?,
            top_artists_year_limit: parsed(&lookup, "TOP_ARTISTS_YEAR_LIMIT", 10)?,
            show_recent_tracks_genres: flag(&lookup, "SHOW_RECENT_TRACKS_GENRES", true)?,
            genre_artist_limit: parsed(&lookup, "GENRE_ARTIST_LIMIT", 20)?,
            profile,
            port: parsed(&lookup, "PORT", 8080)?,
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(default),
    }
}
