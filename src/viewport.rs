//! Logical size and pixel ratio of the render surface.

/// Tracks the window size in logical pixels together with the pixel ratio
/// used to size the backing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    scale_factor: f64,
    pixel_ratio: f64,
    max_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64, max_pixel_ratio: f64) -> Self {
        let mut viewport = Self {
            width: width.max(1),
            height: height.max(1),
            scale_factor: 1.0,
            pixel_ratio: 1.0,
            max_pixel_ratio,
        };
        viewport.set_pixel_ratio(device_pixel_ratio);
        viewport
    }

    /// Builds a viewport from a physical size as reported by winit.
    pub fn from_physical(
        size: winit::dpi::PhysicalSize<u32>,
        scale_factor: f64,
        max_pixel_ratio: f64,
    ) -> Self {
        let mut viewport = Self::new(1, 1, scale_factor, max_pixel_ratio);
        viewport.resize_physical(size, scale_factor);
        viewport
    }

    /// Returns `false` and keeps the previous size for zero-sized requests
    /// (minimised windows).
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        self.set_pixel_ratio(device_pixel_ratio);
        true
    }

    /// winit reports physical pixels; the logical size is what the camera
    /// aspect is derived from.
    pub fn resize_physical(&mut self, size: winit::dpi::PhysicalSize<u32>, scale_factor: f64) -> bool {
        let logical: winit::dpi::LogicalSize<u32> = size.to_logical(scale_factor);
        self.resize(logical.width, logical.height, scale_factor)
    }

    fn set_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        self.scale_factor = ratio;
        self.pixel_ratio = ratio.min(self.max_pixel_ratio);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// The device pixel ratio as reported, before capping. Pointer and touch
    /// positions arrive in these units.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Size of the drawing buffer in physical pixels, never zero.
    pub fn surface_size(&self) -> [u32; 2] {
        let scale = |v: u32| ((v as f64 * self.pixel_ratio).round() as u32).max(1);
        [scale(self.width), scale(self.height)]
    }
}
