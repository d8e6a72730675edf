//! Effect configuration

use crate::{
    Bounds, Lorenz, FRAME_RATE_HZ, MAX_BOUNDS, MIN_BOUNDS, PARTICLE_COUNT, RING_CAPACITY,
};
use anyhow::{ensure, Result};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaverConfig {
    pub particle_count: u32,
    pub ring_capacity: u32,
    pub spawn_bounds: Bounds,
    pub frame_rate_hz: u32,
    pub attractor: Lorenz,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            particle_count: PARTICLE_COUNT,
            ring_capacity: RING_CAPACITY,
            spawn_bounds: Bounds::new(MIN_BOUNDS, MAX_BOUNDS),
            frame_rate_hz: FRAME_RATE_HZ,
            attractor: Lorenz::default(),
        }
    }
}

impl SaverConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.particle_count > 0, "particle count must be non-zero");
        ensure!(self.ring_capacity > 0, "ring buffer capacity must be non-zero");
        ensure!(
            (self.particle_count as u64) * (self.ring_capacity as u64) <= u32::MAX as u64,
            "{} particles x {} slots overflows 32-bit slot indices",
            self.particle_count,
            self.ring_capacity
        );
        ensure!(
            self.spawn_bounds.is_valid(),
            "invalid spawn bounds {:?}",
            self.spawn_bounds
        );
        ensure!(self.frame_rate_hz > 0, "frame rate must be non-zero");
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }

    /// Total slots in point storage
    pub fn slot_count(&self) -> u64 {
        self.particle_count as u64 * self.ring_capacity as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SaverConfig::default();
        config.validate().unwrap();
        assert_eq!(config.slot_count(), 5_000_000);
    }

    #[test]
    fn test_frame_interval_at_30hz() {
        let interval = SaverConfig::default().frame_interval();
        assert!((interval.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = SaverConfig {
            ring_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overflowing_storage_is_rejected() {
        let config = SaverConfig {
            particle_count: 100_000,
            ring_capacity: 100_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
