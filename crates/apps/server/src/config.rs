use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

/// Proxy for the five event feeds the globe polls.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Caching proxy for geo-event feeds")]
pub struct ServerConfig {
    #[arg(long, env = "FEEDS_ADDR", default_value = "127.0.0.1:8787")]
    pub addr: SocketAddr,

    #[arg(
        long,
        env = "SEISMIC_URL",
        default_value = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/4.5_month.geojson"
    )]
    pub seismic_url: String,

    #[arg(long, env = "HAZARD_URL", default_value = "https://www.gdacs.org/xml/rss.xml")]
    pub hazard_url: String,

    #[arg(
        long,
        env = "THERMAL_URL",
        default_value = "https://firms.modaps.eosdis.nasa.gov/data/active_fire/suomi-npp-viirs-c2/csv/SUOMI_VIIRS_C2_Global_24h.csv"
    )]
    pub thermal_url: String,

    #[arg(long, env = "CONFLICT_URL", default_value = "https://api.acleddata.com/acled/read")]
    pub conflict_url: String,

    #[arg(long, env = "NEWS_URL", default_value = "https://api.gdeltproject.org/api/v2/geo/geo")]
    pub news_url: String,

    /// Conflict API key. Without both key and email the bundled sample is served.
    #[arg(long, env = "ACLED_KEY", hide_env_values = true)]
    pub acled_key: Option<String>,

    #[arg(long, env = "ACLED_EMAIL")]
    pub acled_email: Option<String>,

    /// Hard limit on a single news upstream request.
    #[arg(long, env = "NEWS_TIMEOUT_SECS", default_value_t = 15)]
    pub news_timeout_secs: u64,
}

impl ServerConfig {
    pub fn news_timeout(&self) -> Duration {
        Duration::from_secs(self.news_timeout_secs)
    }

    /// Key and email, when both are set and non-blank.
    pub fn acled_credentials(&self) -> Option<(&str, &str)> {
        let key = self.acled_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let email = self.acled_email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((key, email))
    }
}
