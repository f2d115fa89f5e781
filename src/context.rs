use std::{iter, sync::Arc};

use anyhow::Context as _;
use log::{info, warn};
use winit::window::Window;

use crate::{
    camera::CameraRig,
    config::SceneConfig,
    pipelines::light::LightsUniform,
    render::{Renderer, supported_sample_count},
    stage::Stage,
    viewport::Viewport,
};

/// The window, its surface and the device rendering into it.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub renderer: Renderer,
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        viewport: Viewport,
        rig: CameraRig,
        lights: LightsUniform,
        scene_config: SceneConfig,
    ) -> anyhow::Result<Self> {
        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("requesting the device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are linearised on the CPU, so an sRGB surface is expected.
        // Other formats render darker but still work.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        // The clear colour is transparent, so prefer a mode that composites
        // the alpha channel.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| surface_caps.alpha_modes.contains(mode))
        .or_else(|| surface_caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);

        let [width, height] = viewport.surface_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count =
            supported_sample_count(&adapter, surface_format, scene_config.sample_count);
        if sample_count != scene_config.sample_count {
            warn!(
                "{}x MSAA is not supported for {:?}, using {}x",
                scene_config.sample_count, surface_format, sample_count
            );
        }

        let renderer = Renderer::new(
            &device,
            &queue,
            surface_format,
            [width, height],
            sample_count,
            scene_config.clear_colour,
            &rig,
            lights,
        );
        info!(
            "Surface configured: {}x{} {:?}, {}x MSAA",
            width, height, surface_format, sample_count
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
        })
    }

    /// Reconfigures the surface and the attachments for the viewport's
    /// drawing-buffer size.
    pub fn resize(&mut self, viewport: &Viewport) {
        let [width, height] = viewport.surface_size();
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.renderer.resize(&self.device, [width, height]);
    }

    pub fn prepare(&mut self, stage: &mut Stage) {
        self.renderer.prepare(&self.device, &self.queue, stage);
    }

    pub fn render(&mut self, stage: &Stage) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.renderer.encode(&mut encoder, &view, &stage.scene);
        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
