//! The full turn a blade makes about its own axis after being moved to a new
//! target, advanced by the caller's clock.

use std::{f32::consts::TAU, time::Duration};

use nalgebra::{Unit, UnitQuaternion, Vector3};

/// One full turn about a local axis, played over `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spin {
    start: UnitQuaternion<f32>,
    axis: Unit<Vector3<f32>>,
    duration: Duration,
    elapsed: Duration,
}

/// Orientation of the blade and the spin it is currently playing, if any.
#[derive(Debug, Clone)]
pub struct Blade {
    rotation: UnitQuaternion<f32>,
    spin: Option<Spin>,
}

impl Spin {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(1);

    pub fn new(start: UnitQuaternion<f32>, axis: Unit<Vector3<f32>>, duration: Duration) -> Self {
        Self {
            start,
            axis,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction of the turn done, in `0..=1`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// The axis is in the blade's local frame, so the turn is applied after
    /// the start rotation. Once finished this is exactly the start rotation.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        if self.is_finished() {
            return self.start;
        }
        self.start * UnitQuaternion::from_axis_angle(&self.axis, TAU * self.progress())
    }

    pub fn tick(&mut self, dt: Duration) -> UnitQuaternion<f32> {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.rotation()
    }
}

impl Default for Blade {
    fn default() -> Self {
        Self::new(UnitQuaternion::identity())
    }
}

impl Blade {
    pub fn new(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            spin: None,
        }
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    pub fn is_spinning(&self) -> bool {
        self.spin.is_some()
    }

    /// Snaps the blade to `rotation` and starts a fresh spin about its local
    /// z axis, dropping any spin still running.
    pub fn align(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation = rotation;
        self.spin = Some(Spin::new(rotation, Vector3::z_axis(), Spin::DEFAULT_DURATION));
    }

    pub fn tick(&mut self, dt: Duration) -> UnitQuaternion<f32> {
        if let Some(spin) = &mut self.spin {
            self.rotation = spin.tick(dt);
            if spin.is_finished() {
                self.spin = None;
            }
        }
        self.rotation
    }
}
