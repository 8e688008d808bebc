//! Light payloads carried by scene nodes.

use cgmath::Vector3;

use crate::gfx::math::Color;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { direction: Vector3<f32> },
    /// `radius` drives distance attenuation.
    Point { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Color,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub const DEFAULT_INTENSITY: f32 = 1.0;
    pub const DEFAULT_POINT_RADIUS: f32 = 1.0;

    pub fn ambient(color: Color) -> Self {
        Self {
            color,
            intensity: Self::DEFAULT_INTENSITY,
            kind: LightKind::Ambient,
        }
    }

    pub fn directional(color: Color, direction: Vector3<f32>) -> Self {
        Self {
            color,
            intensity: Self::DEFAULT_INTENSITY,
            kind: LightKind::Directional { direction },
        }
    }

    pub fn point(color: Color, radius: f32) -> Self {
        Self {
            color,
            intensity: Self::DEFAULT_INTENSITY,
            kind: LightKind::Point { radius },
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn direction(&self) -> Option<Vector3<f32>> {
        match self.kind {
            LightKind::Directional { direction } => Some(direction),
            _ => None,
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match self.kind {
            LightKind::Point { radius } => Some(radius),
            _ => None,
        }
    }

    /// Serialized `nodeType` tag.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            LightKind::Ambient => "AmbientLight",
            LightKind::Directional { .. } => "DirectionalLight",
            LightKind::Point { .. } => "PointLight",
        }
    }
}
