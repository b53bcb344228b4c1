//! Default thresholds shared by the recognizers.
//!
//! Distances are in logical pixels, velocities in pixels per second. Scale the
//! distance values by the display density when the surface reports physical
//! pixels.

use web_time::Duration;

/// Movement allowed before a press counts as a drag.
pub const TOUCH_SLOP: f32 = 8.0;

/// Movement allowed between consecutive taps of a multi-tap.
pub const DOUBLE_TAP_SLOP: f32 = 100.0;

/// Time allowed between releasing a tap and starting the next one.
pub const TAP_TIMEOUT: Duration = Duration::from_millis(300);

/// A press held longer than this is no longer a tap.
pub const LONG_PRESS_TIMEOUT: Duration = Duration::from_millis(500);

/// Minimum hold before a long press begins.
pub const MIN_PRESS_DURATION: Duration = Duration::from_millis(500);

pub const MAX_FLING_VELOCITY: f32 = 8_000.0;

pub const SWIPE_MIN_DISTANCE: f32 = 100.0;

pub const SWIPE_MIN_VELOCITY: f32 = 200.0;

/// A swipe must qualify within this time from the initial down.
pub const SWIPE_MAX_DURATION: Duration = Duration::from_millis(300);

/// Distance from the surface boundary an edge pan may start within.
pub const EDGE_MARGIN: f32 = 20.0;

/// Accumulated rotation (radians, ~3 degrees) before a rotation begins.
pub const ROTATION_THRESHOLD: f32 = 0.05;

/// Samples older than this (relative to the newest) are ignored by the
/// velocity estimate, except that the two newest samples are always used.
pub const VELOCITY_HORIZON: Duration = Duration::from_millis(100);

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
