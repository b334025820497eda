//! Scheduler configuration file support.
//!
//! Reads an optional TOML file. Every key has a default, so an empty (or
//! absent) file gives a runnable configuration.
//!
//! ```toml
//! [search]
//! population_size = 70
//! max_generations = 1000
//! mutation_type = "swap_or_insert"
//! seed = 42
//!
//! [placement]
//! grid_seconds = 60
//!
//! [horizon]
//! file = "horizon.txt"          # or: points = [[-180, 20], [0, 15], [180, 20]]
//!
//! [site]
//! latitude_deg = 31.68
//! longitude_deg = -110.88
//!
//! [targets.RZ-Cas]
//! ra_deg = 39.65
//! dec_deg = 69.63
//! exposures = 40
//! exposure_seconds = 30
//!
//! [history.RZ-Cas]
//! last_observed_jd = 2459990.61
//! last_execution_seconds = 1520
//!
//! [output]
//! format = "text"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::duration::{
    DurationModel, HistoryTable, ObservationRecord, PlanningPredictor, TargetPlan,
    DEFAULT_SCRIPT_SECONDS,
};
use crate::emit::OutputFormat;
use crate::error::{Result, SchedulerError};
use crate::ga::{GaConfig, GeneticOperators, DEFAULT_MAX_QUICK_INSTANCES};
use crate::models::{DARK_DURATION_SECONDS, FLAT_DURATION_SECONDS, QUICK_DURATION_SECONDS};
use crate::scheduler::{NightScheduler, DEFAULT_GRID_SECONDS};
use crate::sky::{CatalogLocator, Equatorial, HorizonTable, Site};

/// Scheduler configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub placement: PlacementSettings,
    #[serde(default)]
    pub horizon: HorizonSettings,
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetSettings>,
    #[serde(default)]
    pub history: BTreeMap<String, ObservationRecord>,
    #[serde(default)]
    pub output: OutputSettings,
    /// Directory of the file this was read from; relative paths resolve
    /// against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// GA hyperparameters and operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(flatten)]
    pub ga: GaConfig,
    #[serde(flatten)]
    pub operators: GeneticOperators,
}

/// Placement grid and duration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSettings {
    #[serde(default = "default_grid_seconds")]
    pub grid_seconds: i64,
    #[serde(default = "default_quick_seconds")]
    pub quick_seconds: f64,
    #[serde(default = "default_dark_seconds")]
    pub dark_seconds: f64,
    #[serde(default = "default_flat_seconds")]
    pub flat_seconds: f64,
    /// Fixed Time_Seq duration. Absent = the whole window.
    #[serde(default)]
    pub time_seq_duration_seconds: Option<f64>,
    #[serde(default = "default_script_seconds")]
    pub default_script_seconds: f64,
    #[serde(default = "default_max_quick_instances")]
    pub max_quick_instances: usize,
}

fn default_grid_seconds() -> i64 {
    DEFAULT_GRID_SECONDS
}

fn default_quick_seconds() -> f64 {
    QUICK_DURATION_SECONDS
}

fn default_dark_seconds() -> f64 {
    DARK_DURATION_SECONDS
}

fn default_flat_seconds() -> f64 {
    FLAT_DURATION_SECONDS
}

fn default_script_seconds() -> f64 {
    DEFAULT_SCRIPT_SECONDS
}

fn default_max_quick_instances() -> usize {
    DEFAULT_MAX_QUICK_INSTANCES
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            grid_seconds: default_grid_seconds(),
            quick_seconds: default_quick_seconds(),
            dark_seconds: default_dark_seconds(),
            flat_seconds: default_flat_seconds(),
            time_seq_duration_seconds: None,
            default_script_seconds: default_script_seconds(),
            max_quick_instances: default_max_quick_instances(),
        }
    }
}

/// Horizon source: inline points or a text file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonSettings {
    /// `[azimuth, elevation]` pairs in degrees.
    #[serde(default)]
    pub points: Option<Vec<[f64; 2]>>,
    /// Text file of `azimuth elevation` lines.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Catalog position and observing plan of one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSettings {
    #[serde(default)]
    pub ra_deg: Option<f64>,
    #[serde(default)]
    pub dec_deg: Option<f64>,
    #[serde(default)]
    pub planning_minutes: Option<f64>,
    #[serde(default)]
    pub finder_exposure_seconds: f64,
    #[serde(default)]
    pub exposures: u32,
    #[serde(default)]
    pub exposure_seconds: f64,
}

impl TargetSettings {
    fn position(&self) -> Option<Equatorial> {
        Some(Equatorial {
            ra_deg: self.ra_deg?,
            dec_deg: self.dec_deg?,
        })
    }

    /// `None` when the target carries only a catalog position.
    fn plan(&self) -> Option<TargetPlan> {
        if self.planning_minutes.is_none() && self.exposures == 0 {
            return None;
        }
        Some(TargetPlan {
            planning_minutes: self.planning_minutes,
            finder_exposure_seconds: self.finder_exposure_seconds,
            exposures: self.exposures,
            exposure_seconds: self.exposure_seconds,
        })
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
}

impl SchedulerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(SchedulerConfig)` if successful
    /// * `Err(SchedulerError::Config)` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SchedulerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)
            .map_err(|e| SchedulerError::Config(format!("{}: {}", path.display(), e)))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)
            .map_err(|e| SchedulerError::Config(format!("failed to parse config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.placement.grid_seconds <= 0 {
            return Err(SchedulerError::Config(format!(
                "placement.grid_seconds must be positive, got {}",
                self.placement.grid_seconds
            )));
        }
        let rates = [
            ("search.crossover_rate", self.search.ga.crossover_rate),
            ("search.mutation_rate", self.search.ga.mutation_rate),
            ("search.delay_rate", self.search.operators.delay_rate),
        ];
        for (key, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SchedulerError::Config(format!(
                    "{key} must be within 0..1, got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the site horizon.
    ///
    /// Inline points win over a file. With neither, the horizon is flat
    /// at 0° and a warning is logged.
    pub fn horizon_table(&self) -> Result<HorizonTable> {
        if let Some(points) = &self.horizon.points {
            return HorizonTable::new(points.iter().map(|&[az, el]| (az, el)));
        }
        if let Some(file) = &self.horizon.file {
            let path = match &self.base_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            };
            return HorizonTable::load(path);
        }
        warn!("no horizon configured, assuming a flat 0 deg horizon");
        Ok(HorizonTable::flat(0.0))
    }

    /// Locator for every configured target with a catalog position.
    pub fn locator(&self) -> CatalogLocator {
        self.targets
            .iter()
            .filter_map(|(name, t)| t.position().map(|pos| (name, pos)))
            .fold(CatalogLocator::new(self.site), |loc, (name, pos)| {
                loc.with_target(name.clone(), pos)
            })
    }

    /// Observation history table.
    pub fn history_table(&self) -> HistoryTable {
        self.history
            .iter()
            .fold(HistoryTable::new(), |table, (name, record)| {
                table.with_record(name.clone(), *record)
            })
    }

    /// Script duration predictor from the configured target plans.
    pub fn predictor(&self) -> PlanningPredictor {
        self.targets
            .iter()
            .filter_map(|(name, t)| t.plan().map(|plan| (name, plan)))
            .fold(PlanningPredictor::new(), |p, (name, plan)| {
                p.with_plan(name.clone(), plan)
            })
    }

    /// Duration model from placement settings, history and plans.
    pub fn duration_model(&self) -> DurationModel {
        let mut model = DurationModel::default();
        model.quick_seconds = self.placement.quick_seconds;
        model.dark_seconds = self.placement.dark_seconds;
        model.flat_seconds = self.placement.flat_seconds;
        model.time_seq_seconds = self.placement.time_seq_duration_seconds;
        model.default_script_seconds = self.placement.default_script_seconds;
        model
            .with_history(self.history_table())
            .with_predictor(self.predictor())
    }

    /// Night scheduler with the configured search and placement settings.
    pub fn night_scheduler(&self) -> NightScheduler {
        NightScheduler::new()
            .with_ga_config(self.search.ga.clone())
            .with_operators(self.search.operators.clone())
            .with_grid_seconds(self.placement.grid_seconds)
            .with_max_quick_instances(self.placement.max_quick_instances)
    }
}
