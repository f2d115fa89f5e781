//! Surface appearance of a mesh node.

use std::sync::Arc;

use image::RgbaImage;

/// Linear RGB colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses a `0xRRGGBB` sRGB value into linear space. The surface format
    /// is sRGB, so the hardware applies the inverse on write.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

/// Which faces of a mesh get rasterized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

impl Side {
    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
    pub side: Side,
    /// When false the mesh only writes depth, hiding whatever is drawn
    /// behind it later without showing up itself.
    pub color_write: bool,
    pub base_color_texture: Option<Arc<RgbaImage>>,
}

impl Material {
    /// White, double-sided Phong material; the base every primitive clones.
    pub fn phong() -> Self {
        Self {
            color: Color::WHITE,
            specular: Color::from_hex(0x111111),
            shininess: 30.0,
            side: Side::Double,
            color_write: true,
            base_color_texture: None,
        }
    }

    pub fn with_color_hex(mut self, hex: u32) -> Self {
        self.set_color_hex(hex);
        self
    }

    pub fn set_color_hex(&mut self, hex: u32) {
        self.color = Color::from_hex(hex);
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::phong()
    }
}

/// Fragment-stage view of a [`Material`]; `specular.w` carries shininess.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        let c = material.color;
        let s = material.specular;
        Self {
            color: [c.r, c.g, c.b, 1.0],
            specular: [s.r, s.g, s.b, material.shininess],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_channels_are_linearised() {
        let red = Color::from_hex(0xff0000);
        assert!((red.r - 1.0).abs() < 1e-6);
        assert_eq!((red.g, red.b), (0.0, 0.0));
        let blue = Color::from_hex(0x0000ff);
        assert!((blue.b - 1.0).abs() < 1e-6);
        assert_eq!((blue.r, blue.g), (0.0, 0.0));
        let grey = Color::from_hex(0x606060);
        assert!((grey.r - 0.117).abs() < 1e-3);
        assert_eq!(grey.r, grey.g);
    }

    #[test]
    fn clones_are_independent() {
        let base = Material::phong();
        let mut red = base.clone();
        red.set_color_hex(0xff0000);
        red.color_write = false;
        assert_eq!(base.color, Color::WHITE);
        assert!(base.color_write);
    }

    #[test]
    fn uniform_packs_shininess() {
        let uniform = MaterialUniform::from(&Material::phong());
        assert_eq!(uniform.specular[3], 30.0);
        assert_eq!(uniform.color, [1.0, 1.0, 1.0, 1.0]);
    }
}
