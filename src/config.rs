use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::collectors::jsearch::{DEFAULT_API_HOST, DEFAULT_BASE_URL};
use crate::collectors::runner::{EngineSettings, RATE_LIMIT_COOLDOWN};

#[derive(Parser, Debug, Clone)]
#[command(name = "jobscrape", about = "Resumable job listing collector")]
pub struct Config {
    /// Stop once this many rows have been collected
    #[arg(long, env = "TARGET_COUNT", default_value_t = 1200)]
    pub target_count: usize,

    /// Maximum pages fetched per role/location combination
    #[arg(long, env = "PAGES_PER_COMBO", default_value_t = 8)]
    pub pages_per_combo: u32,

    /// Pause between pages, in seconds
    #[arg(long, env = "PAUSE_SECS", default_value_t = 1.0)]
    pub pause_secs: f64,

    /// Checkpoint CSV path
    #[arg(long, env = "SAVE_PATH", default_value = "data/raw/jobs_big_dataset.csv")]
    pub save_path: PathBuf,

    /// Resume from an existing checkpoint file
    #[arg(long, env = "RESUME", default_value_t = true, action = clap::ArgAction::Set)]
    pub resume: bool,

    /// RapidAPI key for the JSearch endpoint
    #[arg(long, env = "RAPIDAPI_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "RAPIDAPI_HOST", default_value = DEFAULT_API_HOST)]
    pub api_host: String,

    #[arg(long, env = "JSEARCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

impl Config {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            target_count: self.target_count,
            pages_per_combo: self.pages_per_combo,
            pause: Duration::try_from_secs_f64(self.pause_secs).unwrap_or_default(),
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            resume: self.resume,
        }
    }
}
