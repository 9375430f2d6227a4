//! Command line and panel configuration.
//!
//! The panel state mirrors the settings tree a dashboard shows: one entry per
//! feed, with thermal fires nested under the disasters group. It reduces to
//! the flat visibility, filter and encoding values the composer takes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Parser;
use formats::{AlertLevel, ConflictCategory, HazardType, NewsTimespan};
use layers::symbology::{clamp_intensity, DEFAULT_INTENSITY};
use layers::{
    ConflictFilter, EncodingParams, FilterSet, HazardFilter, SeismicFilter, ThermalTier,
    Visibility, DEFAULT_MIN_MAGNITUDE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Headless geo-event dashboard session")]
pub struct ViewerArgs {
    /// Base URL of the feeds proxy.
    #[arg(long, env = "VIEWER_PROXY_URL", default_value = "http://127.0.0.1:8787")]
    pub proxy_url: String,

    /// JSON panel configuration. Defaults apply when omitted.
    #[arg(long, env = "VIEWER_VIEW_CONFIG")]
    pub view_config: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub run_for_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid view config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeismicPanel {
    pub visible: bool,
    pub min_magnitude: f64,
}

impl Default for SeismicPanel {
    fn default() -> Self {
        Self {
            visible: true,
            min_magnitude: DEFAULT_MIN_MAGNITUDE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertsPanel {
    pub visible: bool,
    pub alert_levels: BTreeSet<AlertLevel>,
    pub hazard_types: BTreeSet<HazardType>,
}

impl Default for AlertsPanel {
    fn default() -> Self {
        let all = HazardFilter::default();
        Self {
            visible: true,
            alert_levels: all.alert_levels,
            hazard_types: all.hazard_types,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FiresPanel {
    pub visible: bool,
    pub tier: ThermalTier,
    pub intensity: f64,
}

impl Default for FiresPanel {
    fn default() -> Self {
        Self {
            visible: true,
            tier: ThermalTier::All,
            intensity: DEFAULT_INTENSITY,
        }
    }
}

/// Hazard alerts and thermal fires share one group toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisastersGroup {
    pub visible: bool,
    pub alerts: AlertsPanel,
    pub fires: FiresPanel,
}

impl Default for DisastersGroup {
    fn default() -> Self {
        Self {
            visible: true,
            alerts: AlertsPanel::default(),
            fires: FiresPanel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConflictPanel {
    pub visible: bool,
    pub categories: BTreeSet<ConflictCategory>,
}

impl Default for ConflictPanel {
    fn default() -> Self {
        Self {
            visible: true,
            categories: ConflictFilter::default().categories,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsPanel {
    pub visible: bool,
    /// `1h`, `6h`, `24h` or `48h`; anything else reads as `24h`.
    pub timespan: String,
}

impl Default for NewsPanel {
    fn default() -> Self {
        Self {
            visible: true,
            timespan: NewsTimespan::default().as_query().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
    pub earthquakes: SeismicPanel,
    pub disasters: DisastersGroup,
    pub conflict: ConflictPanel,
    pub news: NewsPanel,
}

impl ViewConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn visibility(&self) -> Visibility {
        let group = self.disasters.visible;
        Visibility {
            seismic: self.earthquakes.visible,
            hazard: group && self.disasters.alerts.visible,
            thermal: group && self.disasters.fires.visible,
            conflict: self.conflict.visible,
            news: self.news.visible,
        }
    }

    pub fn filters(&self) -> FilterSet {
        FilterSet {
            seismic: SeismicFilter::at_step(self.earthquakes.min_magnitude),
            hazard: HazardFilter {
                alert_levels: self.disasters.alerts.alert_levels.clone(),
                hazard_types: self.disasters.alerts.hazard_types.clone(),
            },
            thermal: self.disasters.fires.tier,
            conflict: ConflictFilter {
                categories: self.conflict.categories.clone(),
            },
        }
    }

    pub fn encoding(&self) -> EncodingParams {
        EncodingParams {
            thermal_intensity: clamp_intensity(self.disasters.fires.intensity),
        }
    }

    pub fn news_timespan(&self) -> NewsTimespan {
        NewsTimespan::parse(&self.news.timespan)
    }
}
