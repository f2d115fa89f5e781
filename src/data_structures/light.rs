use crate::data_structures::material::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    /// Uniform light from every direction; position is ignored.
    Ambient,
    /// Parallel rays travelling from the light's world position towards the
    /// origin.
    Directional,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn directional(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
        }
    }

    /// Colour premultiplied by intensity, as the shader consumes it.
    pub fn radiance(&self) -> Color {
        self.color.scaled(self.intensity)
    }
}
