use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HipsterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Mainstream,
    Popular,
    Indie,
    Underground,
    #[serde(rename = "Ultra Hipster")]
    UltraHipster,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Mainstream,
        Category::Popular,
        Category::Indie,
        Category::Underground,
        Category::UltraHipster,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringProfile {
    pub name: &'static str,
    pub base_score: f64,
    pub scale_factor: f64,
    /// Lower bounds of Popular, Indie, Underground and Ultra Hipster.
    pub cutoffs: [f64; 4],
    pub labels: [&'static str; 5],
    pub clamp: bool,
    /// Drop the fractional part of the raw score before clamping.
    pub truncate: bool,
}

const DEFAULT_CUTOFFS: [f64; 4] = [10.0, 35.0, 60.0, 85.0];
const DEFAULT_LABELS: [&str; 5] = [
    "🔥 Mainstream",
    "📻 Popular",
    "🎪 Indie",
    "🎭 Underground",
    "🎸 Ultra Hipster",
];

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::current()
    }
}

impl ScoringProfile {
    pub fn new(
        name: &'static str,
        base_score: f64,
        scale_factor: f64,
        cutoffs: [f64; 4],
        labels: [&'static str; 5],
        clamp: bool,
        truncate: bool,
    ) -> Result<Self, HipsterError> {
        if !base_score.is_finite() || !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(HipsterError::InvalidArgument(format!(
                "profile {name}: base score and a positive scale factor are required"
            )));
        }
        if cutoffs.iter().any(|cutoff| !cutoff.is_finite())
            || cutoffs.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(HipsterError::InvalidArgument(format!(
                "profile {name}: cutoffs must be finite and strictly ascending"
            )));
        }

        Ok(Self {
            name,
            base_score,
            scale_factor,
            cutoffs,
            labels,
            clamp,
            truncate,
        })
    }

    pub fn current() -> Self {
        Self {
            name: "current",
            base_score: 140.0,
            scale_factor: 20.0,
            cutoffs: DEFAULT_CUTOFFS,
            labels: DEFAULT_LABELS,
            clamp: true,
            truncate: false,
        }
    }

    pub fn legacy() -> Self {
        Self {
            name: "legacy",
            base_score: 100.0,
            scale_factor: 12.5,
            cutoffs: DEFAULT_CUTOFFS,
            labels: DEFAULT_LABELS,
            clamp: true,
            truncate: true,
        }
    }

    pub fn unclamped() -> Self {
        Self {
            name: "unclamped",
            clamp: false,
            truncate: false,
            ..Self::legacy()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "current" => Some(Self::current()),
            "legacy" => Some(Self::legacy()),
            "unclamped" => Some(Self::unclamped()),
            _ => None,
        }
    }

    pub fn score(&self, listeners: f64) -> Result<f64, HipsterError> {
        if listeners.is_nan() || listeners < 0.0 {
            return Err(HipsterError::InvalidArgument(format!(
                "listener count must be non-negative, got {listeners}"
            )));
        }

        // log10 is undefined at zero; anything below one listener scores as one.
        let floored = listeners.max(1.0);
        let mut raw = self.base_score - floored.log10() * self.scale_factor;
        if self.truncate {
            raw = raw.trunc();
        }
        if self.clamp {
            raw = raw.clamp(SCORE_MIN, SCORE_MAX);
        }
        Ok(raw)
    }

    pub fn display_score(&self, listeners: u64) -> u8 {
        self.score(listeners as f64)
            .map(|score| score.round().clamp(SCORE_MIN, SCORE_MAX) as u8)
            .unwrap_or(0)
    }

    pub fn listeners(&self, score: f64) -> f64 {
        10f64.powf((self.base_score - score) / self.scale_factor)
    }

    pub fn classify(&self, score: f64) -> Category {
        let band = self
            .cutoffs
            .iter()
            .rposition(|cutoff| score >= *cutoff)
            .map_or(0, |index| index + 1);
        Category::ALL[band]
    }

    pub fn label(&self, category: Category) -> &'static str {
        self.labels[category.index()]
    }

    pub fn bands(&self) -> Vec<CategoryBand> {
        Category::ALL
            .iter()
            .map(|&category| {
                let lower = category.index().checked_sub(1).map(|i| self.cutoffs[i]);
                let upper = self.cutoffs.get(category.index()).copied();
                let (score_range, listener_range) = match (lower, upper) {
                    (None, Some(max)) => (
                        format!("<{}", format_score(max)),
                        format!(">{}", format_listener_count(self.listeners(max))),
                    ),
                    (Some(min), None) => (
                        format!("{}+", format_score(min)),
                        format!("<{}", format_listener_count(self.listeners(min))),
                    ),
                    (Some(min), Some(max)) => (
                        format!("{}-{}", format_score(min), format_score(max)),
                        format!(
                            "{} - {}",
                            format_listener_count(self.listeners(max)),
                            format_listener_count(self.listeners(min))
                        ),
                    ),
                    (None, None) => ("N/A".to_string(), "N/A".to_string()),
                };
                CategoryBand {
                    category,
                    label: self.label(category),
                    score_range,
                    listener_range,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBand {
    pub category: Category,
    pub label: &'static str,
    pub score_range: String,
    pub listener_range: String,
}

pub fn format_listener_count(count: f64) -> String {
    if count >= 1e9 {
        format!("{}B", (count / 1e9).round())
    } else if count >= 1e6 {
        format!("{}M", (count / 1e6).round())
    } else if count >= 1e3 {
        format!("{}K", (count / 1e3).round())
    } else {
        format!("{}", count.round())
    }
}

pub(crate) fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score}")
    }
}
