//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for the render attachments (depth, multisampled colour) and
//! for uploading decoded base colour images.

use std::borrow::Cow;

/// A GPU texture with a view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth attachment matching the colour target.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `sample_count` must match the colour attachment's sample count
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        Self::create_attachment(device, size, sample_count, Self::DEPTH_FORMAT, label)
    }

    /// Create the multisampled colour target that resolves into the surface.
    pub fn create_msaa_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        Self::create_attachment(device, size, sample_count, format, label)
    }

    fn create_attachment(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 white texture, bound when a material has no base colour map so
    /// the shader does not need a separate code path.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        Self::from_image(device, queue, &white, Some("default white texture"))
    }

    /// Upload an already decoded sRGB image.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &image::RgbaImage,
        label: Option<&str>,
    ) -> Self {
        let dimensions = rgba.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Shrinks `image` so neither side exceeds `max_dimension`, keeping the
/// aspect ratio. Images already within the limit are borrowed unchanged.
pub fn fit_within(image: &image::RgbaImage, max_dimension: u32) -> Cow<'_, image::RgbaImage> {
    let (width, height) = image.dimensions();
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return Cow::Borrowed(image);
    }
    let scale = max_dimension as f64 / width.max(height) as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max_dimension);
    Cow::Owned(image::imageops::resize(
        image,
        fit(width),
        fit(height),
        image::imageops::FilterType::Triangle,
    ))
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
