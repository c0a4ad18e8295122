use serde::Deserialize;
use std::time::Duration;

/// Tuning knobs for one streaming session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial capacity of the producer's text buffer.
    pub buffer_size: usize,
    /// The producer gives up once unconsumed text grows past this many bytes.
    pub max_buffer_size: usize,
    /// Capacity of the hand-off channel; a full channel suspends the producer.
    pub channel_capacity: usize,
    /// Upper bound on the wait for any single record. `None` waits forever.
    #[serde(with = "opt_secs")]
    pub item_timeout: Option<Duration>,
    /// Skip spans that look like objects but fail to decode instead of ending the session.
    pub skip_invalid: bool,
    /// Drop complete lines that cannot start an object (prose, code fences).
    pub skip_noise: bool,
    /// Probability that a processed record is marked as in stock.
    pub in_stock_ratio: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            max_buffer_size: 1024 * 1024,
            channel_capacity: 16,
            item_timeout: Some(Duration::from_secs(120)),
            skip_invalid: false,
            skip_noise: true,
            in_stock_ratio: 0.75,
        }
    }
}

mod opt_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(feature = "configs")]
pub mod configuration {
    use config::Config;

    use super::SessionConfig;

    /// Loads a [`SessionConfig`] from a file (any format `config` understands),
    /// overridden by `BOOKFLOW_*` environment variables.
    pub fn load_config(path: &str) -> Result<SessionConfig, config::ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("BOOKFLOW"))
            .build()?;

        settings.try_deserialize()
    }
}
