use chrono::{Duration, NaiveDateTime};
use crate::config::{Config, ConfigError, START_TIME_FORMAT};

pub const MS_PER_MINUTE: f64 = 60_000.0;
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Maps elapsed wall-clock time to simulated time. The scheduler measures
/// time in wall-clock milliseconds since the run started; simulated
/// durations are "real-world" milliseconds, which pass `acceleration` times
/// faster.
#[derive(Debug, Copy, Clone)]
pub struct SimClock {
    start: NaiveDateTime,
    acceleration: f64,
}

impl SimClock {
    pub fn new(start: NaiveDateTime, acceleration: f64) -> SimClock {
        SimClock { start, acceleration }
    }

    pub fn from_config(config: &Config) -> Result<SimClock, ConfigError> {
        config.validate()?;
        Ok(SimClock::new(config.start()?, config.acceleration))
    }

    /// Simulated date and time after `elapsed` wall-clock milliseconds.
    pub fn now(&self, elapsed: f64) -> NaiveDateTime {
        self.start + Duration::milliseconds((elapsed * self.acceleration).round() as i64)
    }

    pub fn stamp(&self, elapsed: f64) -> String {
        self.now(elapsed).format(START_TIME_FORMAT).to_string()
    }

    /// Wall-clock milliseconds an actor suspends for a simulated duration.
    pub fn scale(&self, real_ms: f64) -> f64 {
        real_ms / self.acceleration
    }

    /// Real-world milliseconds to cover `km` at the lower of the two speeds.
    pub fn travel_duration(km: f64, max_speed: f64, speed_limit: f64) -> f64 {
        let speed = max_speed.min(speed_limit);
        km / speed * MS_PER_HOUR
    }

    pub fn minutes(m: f64) -> f64 {
        m * MS_PER_MINUTE
    }

    pub fn hours(h: f64) -> f64 {
        h * MS_PER_HOUR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(acceleration: f64) -> SimClock {
        let start = NaiveDateTime::parse_from_str("2017-01-01 12:00", START_TIME_FORMAT).unwrap();
        SimClock::new(start, acceleration)
    }

    #[test]
    fn travel_uses_lower_speed() {
        // 30 km at min(160, 120) km/h is 15 minutes.
        assert_eq!(SimClock::travel_duration(30.0, 160.0, 120.0), 15.0 * MS_PER_MINUTE);
        assert_eq!(SimClock::travel_duration(30.0, 60.0, 120.0), 30.0 * MS_PER_MINUTE);
    }

    #[test]
    fn acceleration_compresses_waits() {
        let c = clock(1000.0);
        assert_eq!(c.scale(SimClock::hours(2.0)), 7200.0);
        assert_eq!(c.stamp(0.0), "2017-01-01 12:00");
        // 3.6 s of wall time at 1000x is one simulated hour.
        assert_eq!(c.stamp(3600.0), "2017-01-01 13:00");
        assert_eq!(clock(60.0).stamp(SimClock::hours(24.0)), "2017-03-02 12:00");
    }
}
