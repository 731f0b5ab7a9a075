use crate::geometry::Point3;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use std::time::Duration;

/// Arrival threshold for motion phases, in world units.
pub const PHASE_THRESHOLD: f64 = 0.1;
/// Arrival threshold for the hover overlay returning to zero.
pub const SETTLE_THRESHOLD: f64 = 0.01;

pub const PHASE_SPEED: f64 = 0.1;
pub const OVERLAY_SPEED: f64 = 0.2;
pub const HOVER_OFFSET: f64 = 4.0;
pub const PRESS_OFFSET: f64 = 20.0;
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Values that can be linearly interpolated and measured.
pub trait Lerp: Copy {
    fn lerp(self, target: Self, t: f64) -> Self;
    fn distance_to(self, other: Self) -> f64;
}

impl Lerp for f64 {
    fn lerp(self, target: Self, t: f64) -> Self {
        self + (target - self) * t
    }

    fn distance_to(self, other: Self) -> f64 {
        (other - self).abs()
    }
}

impl Lerp for Point3 {
    fn lerp(self, target: Self, t: f64) -> Self {
        self + (target - self) * t
    }

    fn distance_to(self, other: Self) -> f64 {
        self.distance(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenStep<T> {
    pub value: T,
    pub arrived: bool,
}

/// Frame-driven approach toward a target. Each step covers `speed` of the
/// remaining distance; there is no notion of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    speed: f64,
    threshold: f64,
}

impl Tween {
    pub fn new(speed: f64, threshold: f64) -> Self {
        assert!(
            speed > 0.0 && speed <= 1.0,
            "tween speed must be in (0, 1], got {speed}"
        );
        Self { speed, threshold }
    }

    pub fn phase(speed: f64) -> Self {
        Self::new(speed, PHASE_THRESHOLD)
    }

    pub fn settle(speed: f64) -> Self {
        Self::new(speed, SETTLE_THRESHOLD)
    }

    pub fn step<T: Lerp>(&self, current: T, target: T) -> TweenStep<T> {
        let value = current.lerp(target, self.speed);
        TweenStep {
            value,
            arrived: value.distance_to(target) < self.threshold,
        }
    }
}

/// Tunable motion parameters.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub phase_speed: f64,
    pub overlay_speed: f64,
    pub hover_offset: f64,
    pub press_offset: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "settle_delay_ms")]
    pub settle_delay: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            phase_speed: PHASE_SPEED,
            overlay_speed: OVERLAY_SPEED,
            hover_offset: HOVER_OFFSET,
            press_offset: PRESS_OFFSET,
            settle_delay: SETTLE_DELAY,
        }
    }
}
