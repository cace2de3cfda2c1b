//! Run configuration. Every field has a default, so a configuration file
//! only needs to name what it changes:
//!
//! ```text
//! (
//!     acceleration: 3600.0,
//!     crash_rate: 0.05,
//!     repair: (home_vertex: 3),
//! )
//! ```

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulated time per wall-clock time. 3600 makes one hour pass per second.
    pub acceleration: f64,
    /// Simulated date and time at the start of the run, `YYYY-MM-DD HH:MM`.
    pub start_time: String,
    /// Probability of a failure at each poll of the failure injector.
    pub crash_rate: f64,
    pub poll_interval_minutes: f64,
    pub seed: Option<u64>,
    pub repair: RepairConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub name: String,
    pub speed: f64,
    pub home_vertex: usize,
    pub switch_repair_hours: f64,
    pub segment_repair_hours: f64,
    pub train_repair_hours: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            acceleration: 1000.0,
            start_time: "2017-01-01 12:00".to_string(),
            crash_rate: 0.2,
            poll_interval_minutes: 6.0,
            seed: None,
            repair: RepairConfig::default(),
        }
    }
}

impl Default for RepairConfig {
    fn default() -> RepairConfig {
        RepairConfig {
            name: "Repair Vehicle".to_string(),
            speed: 150.0,
            home_vertex: 12,
            switch_repair_hours: 2.0,
            segment_repair_hours: 2.0,
            train_repair_hours: 2.0,
        }
    }
}

#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "acceleration must be positive, got {}", _0)]
    Acceleration(f64),
    #[fail(display = "crash rate must be within [0, 1], got {}", _0)]
    CrashRate(f64),
    #[fail(display = "{} must be positive, got {}", _0, _1)]
    NotPositive(&'static str, f64),
    #[fail(display = "{} must not be negative, got {}", _0, _1)]
    Negative(&'static str, f64),
    #[fail(display = "start time {:?} is not in the format YYYY-MM-DD HH:MM", _0)]
    StartTime(String),
}

impl Config {
    pub fn from_ron(s: &str) -> crate::AppResult<Config> {
        let config: Config = ron::de::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> crate::AppResult<Config> {
        Config::from_ron(&crate::read_file(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.acceleration > 0.0) {
            return Err(ConfigError::Acceleration(self.acceleration));
        }
        if !(self.crash_rate >= 0.0 && self.crash_rate <= 1.0) {
            return Err(ConfigError::CrashRate(self.crash_rate));
        }
        let positive = [
            ("poll_interval_minutes", self.poll_interval_minutes),
            ("repair.speed", self.repair.speed),
        ];
        for &(name, value) in positive.iter() {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive(name, value));
            }
        }
        let hours = [
            ("repair.switch_repair_hours", self.repair.switch_repair_hours),
            ("repair.segment_repair_hours", self.repair.segment_repair_hours),
            ("repair.train_repair_hours", self.repair.train_repair_hours),
        ];
        for &(name, value) in hours.iter() {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative(name, value));
            }
        }
        self.start()?;
        Ok(())
    }

    pub fn start(&self) -> Result<NaiveDateTime, ConfigError> {
        NaiveDateTime::parse_from_str(&self.start_time, START_TIME_FORMAT)
            .map_err(|_e| ConfigError::StartTime(self.start_time.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = Config::default();
        c.validate().unwrap();
        assert_eq!(c.repair.home_vertex, 12);
        assert_eq!(c.start().unwrap().format(START_TIME_FORMAT).to_string(), "2017-01-01 12:00");
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let c = Config::from_ron("(acceleration: 60.0, repair: (home_vertex: 3))").unwrap();
        assert_eq!(c.acceleration, 60.0);
        assert_eq!(c.repair.home_vertex, 3);
        assert_eq!(c.repair.speed, 150.0);
        assert_eq!(c.crash_rate, 0.2);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_ron("(crash_rate: 1.5)").is_err());
        assert!(Config::from_ron("(acceleration: 0.0)").is_err());
        assert!(Config::from_ron("(start_time: \"noon\")").is_err());
        assert!(Config::from_ron("(acceleration: \"fast\")").is_err());
    }

    #[test]
    fn rejects_negative_repair_hours() {
        let mut c = Config::default();
        c.repair.train_repair_hours = -1.0;
        match c.validate() {
            Err(ConfigError::Negative(name, _)) => assert_eq!(name, "repair.train_repair_hours"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Config::from_ron("(repair: (segment_repair_hours: -0.5))").is_err());
        assert!(Config::from_ron("(repair: (switch_repair_hours: 0.0))").is_ok());
    }
}
