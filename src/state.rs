use crate::config::Config;
use crate::hipster::ScoringProfile;
use crate::lastfm::{LastfmClient, LastfmError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lastfm: LastfmClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, LastfmError> {
        let lastfm = LastfmClient::new(&config.api_url, &config.api_key, &config.username)?;
        Ok(Self {
            config: Arc::new(config),
            lastfm,
        })
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.config.profile
    }
}
