// Live-tunable engine parameters.
// The render loop reads these every tick while the control thread writes them.
// Each field is its own atomic: a read sees an old or a new value, never a torn one.

use serde::Serialize;
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicU32, Ordering};

use crate::surface::{DecayParams, SCALE, SCALE_BITS};

pub const BLEED_MAX: f32 = 1.0;
pub const DECAY_EXP_MAX: f32 = 15.0;
pub const RADIUS_MAX: u32 = 512;
pub const FPS_MIN: u8 = 1;

pub const DEFAULT_BLEED: f32 = 0.95;
pub const DEFAULT_DECAY_EXP: f32 = 10.0;
pub const DEFAULT_DECAY_LIN: u8 = 1;
pub const DEFAULT_RADIUS: u32 = 3;
pub const DEFAULT_FPS: u8 = 20;

/// Plain copy of all settings at one instant (fields may come from adjacent writes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub bleed: f32,
    pub decay_exp: f32,
    pub decay_lin: u8,
    pub radius: u32,
    pub fps: u8,
}

pub struct Settings {
    bleed: AtomicU32,     // f32 bits
    decay_exp: AtomicU32, // f32 bits
    decay_factor: AtomicI32, // retained fraction per tick, fixed point (SCALE = 1.0)
    decay_lin: AtomicU8,
    radius: AtomicU32,
    fps: AtomicU8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bleed: AtomicU32::new(DEFAULT_BLEED.to_bits()),
            decay_exp: AtomicU32::new(DEFAULT_DECAY_EXP.to_bits()),
            decay_factor: AtomicI32::new(decay_factor(DEFAULT_DECAY_EXP)),
            decay_lin: AtomicU8::new(DEFAULT_DECAY_LIN),
            radius: AtomicU32::new(DEFAULT_RADIUS),
            fps: AtomicU8::new(DEFAULT_FPS),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bleed(&self) -> f32 {
        f32::from_bits(self.bleed.load(Ordering::Relaxed))
    }

    /// Store the bleed fraction clamped to [0,1]; returns what was stored.
    pub fn set_bleed(&self, bleed: f32) -> f32 {
        let bleed = clamp_f32(bleed, 0.0, BLEED_MAX);
        self.bleed.store(bleed.to_bits(), Ordering::Relaxed);
        bleed
    }

    pub fn decay_exp(&self) -> f32 {
        f32::from_bits(self.decay_exp.load(Ordering::Relaxed))
    }

    /// Store the exponential decay control clamped to [0,15] and refresh the
    /// cached factor. A reader may see the new exponent with the old factor for a tick.
    pub fn set_decay_exp(&self, decay_exp: f32) -> f32 {
        let decay_exp = clamp_f32(decay_exp, 0.0, DECAY_EXP_MAX);
        self.decay_exp.store(decay_exp.to_bits(), Ordering::Relaxed);
        self.decay_factor
            .store(decay_factor(decay_exp), Ordering::Relaxed);
        decay_exp
    }

    /// Cached retained fraction, fixed point with `SCALE` meaning 1.0.
    pub fn decay_factor(&self) -> i32 {
        self.decay_factor.load(Ordering::Relaxed)
    }

    pub fn decay_lin(&self) -> u8 {
        self.decay_lin.load(Ordering::Relaxed)
    }

    pub fn set_decay_lin(&self, decay_lin: i64) -> u8 {
        let decay_lin = decay_lin.clamp(0, u8::MAX as i64) as u8;
        self.decay_lin.store(decay_lin, Ordering::Relaxed);
        decay_lin
    }

    pub fn radius(&self) -> u32 {
        self.radius.load(Ordering::Relaxed)
    }

    pub fn set_radius(&self, radius: i64) -> u32 {
        let radius = radius.clamp(0, RADIUS_MAX as i64) as u32;
        self.radius.store(radius, Ordering::Relaxed);
        radius
    }

    pub fn fps(&self) -> u8 {
        self.fps.load(Ordering::Relaxed)
    }

    /// Never stores 0: the tick interval divides by this.
    pub fn set_fps(&self, fps: i64) -> u8 {
        let fps = fps.clamp(FPS_MIN as i64, u8::MAX as i64) as u8;
        self.fps.store(fps, Ordering::Relaxed);
        fps
    }

    /// Parameters for one `Surface::decay` call, read field by field.
    pub fn decay_params(&self) -> DecayParams {
        DecayParams::from_fixed(
            to_fixed(self.bleed()),
            self.decay_factor(),
            self.decay_lin(),
        )
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            bleed: self.bleed(),
            decay_exp: self.decay_exp(),
            decay_lin: self.decay_lin(),
            radius: self.radius(),
            fps: self.fps(),
        }
    }
}

/// Retained fraction after one tick: 1 - 2^-(15 - decay_exp), in fixed point.
/// decay_exp = 15 keeps nothing; decay_exp = 0 drops 1/32768 per tick.
pub fn decay_factor(decay_exp: f32) -> i32 {
    let decay_exp = clamp_f32(decay_exp, 0.0, DECAY_EXP_MAX);
    let removed = (-(DECAY_EXP_MAX - decay_exp)).exp2();
    to_fixed(1.0 - removed)
}

/// [0,1] float to fixed point in [0, SCALE].
pub fn to_fixed(x: f32) -> i32 {
    let x = clamp_f32(x, 0.0, 1.0) as f64;
    ((x * (1u32 << SCALE_BITS) as f64).round() as i32).clamp(0, SCALE)
}

#[inline]
fn clamp_f32(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bleed_is_clamped_to_unit_range() {
        let s = Settings::new();
        assert_eq!(s.set_bleed(-1.0), 0.0);
        assert_eq!(s.bleed(), 0.0);
        assert_eq!(s.set_bleed(2.0), 1.0);
        assert_eq!(s.bleed(), 1.0);
        assert_eq!(s.set_bleed(0.25), 0.25);
        assert_eq!(s.set_bleed(f32::NAN), 0.0);
    }

    #[test]
    fn fps_never_stored_as_zero() {
        let s = Settings::new();
        assert_eq!(s.set_fps(0), 1);
        assert_eq!(s.fps(), 1);
        assert_eq!(s.set_fps(-40), 1);
        assert_eq!(s.set_fps(1000), 255);
        assert_eq!(s.set_fps(60), 60);
    }

    #[test]
    fn integer_fields_clamp() {
        let s = Settings::new();
        assert_eq!(s.set_decay_lin(-3), 0);
        assert_eq!(s.set_decay_lin(300), 255);
        assert_eq!(s.set_radius(-1), 0);
        assert_eq!(s.set_radius(1 << 40), RADIUS_MAX);
        assert_eq!(s.set_radius(7), 7);
    }

    #[test]
    fn decay_exp_refreshes_cached_factor() {
        let s = Settings::new();
        assert_eq!(s.set_decay_exp(15.0), 15.0);
        assert_eq!(s.decay_factor(), 0);

        assert_eq!(s.set_decay_exp(99.0), 15.0);
        assert_eq!(s.set_decay_exp(-2.0), 0.0);
        // 1 - 2^-15 in 2^20 fixed point
        assert_eq!(s.decay_factor(), SCALE - 32);

        s.set_decay_exp(14.0);
        assert_eq!(s.decay_factor(), SCALE / 2);
    }

    #[test]
    fn factor_is_monotonic_in_decay_exp() {
        let mut last = SCALE;
        for step in 0..=30 {
            let f = decay_factor(step as f32 * 0.5);
            assert!((0..=SCALE).contains(&f));
            assert!(f <= last);
            last = f;
        }
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let s = Settings::new();
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["decayLin"], 1);
        assert_eq!(json["fps"], 20);
        assert_eq!(json["radius"], 3);
        assert!(json.get("decayExp").is_some());
    }
}
