//! Read/write campaign JSON files.
//!
//! A campaign file carries the sampling setup for one mailing:
//! - bin edges for both axes (as edge strings, e.g. `"1,2,3,inf"`)
//! - the max-recency pre-filter (a threshold, or switched off)
//! - ordered group targets
//! - seed and output prefix
//!
//! Every field is optional when reading; present fields override the command
//! line. `sample` writes the fully resolved configuration back out so a run
//! can be reproduced with `--config`.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{RunConfig, SampleGroup};
use crate::error::AppError;

/// File name of the resolved configuration written next to the sample files.
pub const RUN_CONFIG_FILE: &str = "run_config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_bins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_bins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recency: Option<i64>,
    /// Turns the max-recency pre-filter off; an explicit `max_recency` wins.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_max_recency: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<SampleGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl CampaignFile {
    /// Snapshot of a resolved configuration.
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            recency_bins: Some(config.recency_bins.to_string()),
            frequency_bins: Some(config.frequency_bins.to_string()),
            max_recency: config.max_recency,
            no_max_recency: config.max_recency.is_none(),
            groups: Some(config.groups.groups().to_vec()),
            seed: Some(config.seed),
            prefix: Some(config.prefix.clone()),
        }
    }
}

/// Read a campaign JSON file.
pub fn read_campaign_json(path: &Path) -> Result<CampaignFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open campaign JSON '{}': {e}", path.display())))?;
    let campaign: CampaignFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid campaign JSON '{}': {e}", path.display())))?;
    Ok(campaign)
}

/// Write the resolved configuration as a campaign JSON file.
pub fn write_campaign_json(path: &Path, config: &RunConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create campaign JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &CampaignFile::from_run_config(config))
        .map_err(|e| AppError::new(2, format!("Failed to write campaign JSON: {e}")))?;

    Ok(())
}
