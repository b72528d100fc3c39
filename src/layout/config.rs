//! Simulation parameters.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration for the force-directed layout.
///
/// Deserializable from a partial JS/JSON object; missing fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Canvas width (default: 800.0). The center force pulls toward
    /// `width / 2`.
    pub width: f64,
    /// Canvas height (default: 600.0).
    pub height: f64,
    /// Natural spring length of every edge (default: 100.0).
    pub link_distance: f64,
    /// Many-body strength; negative repels (default: -100.0).
    pub charge_strength: f64,
    /// Barnes–Hut opening criterion in [0, 1] (default: 0.9).
    pub theta: f64,
    /// Distances below this are clamped in the repulsion term (default: 1.0).
    pub distance_min: f64,
    /// Fraction of the centroid offset corrected per step (default: 0.1).
    pub center_strength: f64,
    /// Alpha on first load (default: 1.0).
    pub alpha: f64,
    /// Simulation settles once alpha drops to this (default: 0.001).
    pub alpha_min: f64,
    /// Per-step decay toward the target (default: 1 - 0.001^(1/300) ≈ 0.0228).
    pub alpha_decay: f64,
    /// Resting alpha target (default: 0.0).
    pub alpha_target: f64,
    /// Velocity multiplier applied every step (default: 0.6).
    pub velocity_decay: f64,
    /// Alpha floor applied on reheat (default: 0.3).
    pub reheat_alpha: f64,
    /// Alpha target held while a pin is active (default: 0.3).
    pub interaction_alpha_target: f64,
    /// Radius around the center for new node placement (default: 100.0).
    pub initial_radius: f64,
    /// Speed limit per step (default: 100.0).
    pub max_velocity: f64,
    /// Seed for placement randomness (default: 0x5eed).
    pub seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            link_distance: 100.0,
            charge_strength: -100.0,
            theta: 0.9,
            distance_min: 1.0,
            center_strength: 0.1,
            alpha: 1.0,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.6,
            reheat_alpha: 0.3,
            interaction_alpha_target: 0.3,
            initial_radius: 100.0,
            max_velocity: 100.0,
            seed: 0x5eed,
        }
    }
}

impl LayoutConfig {
    /// Default configuration for a canvas of the given size.
    pub fn with_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Center of the canvas.
    pub fn center(&self) -> (f64, f64) {
        (self.width * 0.5, self.height * 0.5)
    }

    /// Reject parameters that would stall or destabilize the simulation.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("width", self.width),
            ("height", self.height),
            ("linkDistance", self.link_distance),
            ("chargeStrength", self.charge_strength),
            ("theta", self.theta),
            ("distanceMin", self.distance_min),
            ("centerStrength", self.center_strength),
            ("alpha", self.alpha),
            ("alphaMin", self.alpha_min),
            ("alphaDecay", self.alpha_decay),
            ("alphaTarget", self.alpha_target),
            ("velocityDecay", self.velocity_decay),
            ("reheatAlpha", self.reheat_alpha),
            ("interactionAlphaTarget", self.interaction_alpha_target),
            ("initialRadius", self.initial_radius),
            ("maxVelocity", self.max_velocity),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} must be finite")));
        }

        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(invalid("canvas size must be positive"));
        }
        if self.link_distance <= 0.0 {
            return Err(invalid("linkDistance must be positive"));
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(invalid("theta must lie in [0, 1]"));
        }
        if self.distance_min <= 0.0 {
            return Err(invalid("distanceMin must be positive"));
        }
        if !(0.0..=1.0).contains(&self.center_strength) {
            return Err(invalid("centerStrength must lie in [0, 1]"));
        }
        if self.alpha_min <= 0.0 {
            return Err(invalid("alphaMin must be positive"));
        }
        if !(self.alpha_decay > 0.0 && self.alpha_decay <= 1.0) {
            return Err(invalid("alphaDecay must lie in (0, 1]"));
        }
        if self.alpha_target < 0.0 || self.alpha_target >= self.alpha_min {
            return Err(invalid("alphaTarget must lie in [0, alphaMin)"));
        }
        if !(self.velocity_decay > 0.0 && self.velocity_decay < 1.0) {
            return Err(invalid("velocityDecay must lie in (0, 1)"));
        }
        if self.alpha < 0.0 || self.reheat_alpha < 0.0 || self.interaction_alpha_target < 0.0 {
            return Err(invalid("alpha values must not be negative"));
        }
        if self.initial_radius < 0.0 || self.max_velocity <= 0.0 {
            return Err(invalid("initialRadius and maxVelocity must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.center(), (400.0, 300.0));
    }

    #[test]
    fn test_default_decay_reaches_min_in_300_steps() {
        let config = LayoutConfig::default();
        let alpha = (1.0 - config.alpha_decay).powi(300);
        assert!((alpha - config.alpha_min).abs() < 1e-9);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: LayoutConfig = serde_json::from_value(serde_json::json!({
            "width": 1200.0,
            "linkDistance": 80.0,
            "seed": 7
        }))
        .unwrap();

        assert_eq!(config.width, 1200.0);
        assert_eq!(config.height, 600.0);
        assert_eq!(config.link_distance, 80.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.charge_strength, -100.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            LayoutConfig {
                theta: 1.5,
                ..LayoutConfig::default()
            },
            LayoutConfig {
                width: f64::NAN,
                ..LayoutConfig::default()
            },
            LayoutConfig {
                alpha_target: 0.01,
                ..LayoutConfig::default()
            },
            LayoutConfig {
                velocity_decay: 1.0,
                ..LayoutConfig::default()
            },
            LayoutConfig {
                alpha_decay: 0.0,
                ..LayoutConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "accepted {config:?}"
            );
        }
    }
}
