//! Easing curves applied to the local interval parameter of a keyframe pair.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Interpolation curve stored on a keyframe. Serialized as its integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EasingType {
    InOutSine,
    OutSine,
    OutCubic,
    OutExpo,
    OutElastic,
    OutBounce,
    #[default]
    Linear,
}

impl EasingType {
    pub const ALL: [EasingType; 7] = [
        EasingType::InOutSine,
        EasingType::OutSine,
        EasingType::OutCubic,
        EasingType::OutExpo,
        EasingType::OutElastic,
        EasingType::OutBounce,
        EasingType::Linear,
    ];

    pub fn apply(self, t: f32) -> f32 {
        ease(t, self)
    }
}

impl TryFrom<u8> for EasingType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        EasingType::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| format!("invalid easing type {}", value))
    }
}

impl From<EasingType> for u8 {
    fn from(value: EasingType) -> u8 {
        value as u8
    }
}

/// Eased multiplier for `t` in `[0, 1]`. Elastic and bounce may overshoot.
pub fn ease(t: f32, kind: EasingType) -> f32 {
    match kind {
        EasingType::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
        EasingType::OutSine => (t * PI / 2.0).sin(),
        EasingType::OutCubic => 1.0 - (1.0 - t).powi(3),
        EasingType::OutExpo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - 2f32.powf(-10.0 * t)
            }
        }
        EasingType::OutElastic => {
            let c4 = (2.0 * PI) / 3.0;
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else {
                2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
        }
        EasingType::OutBounce => out_bounce(t),
        EasingType::Linear => t,
    }
}

fn out_bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_curves_hit_endpoints() {
        for kind in EasingType::ALL {
            assert!(ease(0.0, kind).abs() < 1e-3, "{:?} at 0", kind);
            assert!((ease(1.0, kind) - 1.0).abs() < 1e-3, "{:?} at 1", kind);
        }
    }

    #[test]
    fn test_linear_is_identity() {
        assert_eq!(ease(0.25, EasingType::Linear), 0.25);
    }

    #[test]
    fn test_in_out_sine_midpoint() {
        assert!((ease(0.5, EasingType::InOutSine) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_elastic_overshoots() {
        let peak = (1..100)
            .map(|i| ease(i as f32 / 100.0, EasingType::OutElastic))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_serialized_as_index() {
        assert_eq!(serde_json::to_string(&EasingType::Linear).unwrap(), "6");
        let kind: EasingType = serde_json::from_str("2").unwrap();
        assert_eq!(kind, EasingType::OutCubic);
        assert!(serde_json::from_str::<EasingType>("7").is_err());
    }
}
