//! Draw ordering and render pass encoding.
//!
//! Every frame the scene's mesh nodes are flattened into a draw list sorted
//! by [`MeshNode::render_order`]. The sort is stable, so nodes sharing an
//! order keep the order they were added in. Each draw binds the pipeline
//! matching its material's [`PipelineKey`]: a depth-only occluder drawn
//! before other meshes hides the parts of them behind it.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use image::RgbaImage;
use log::{debug, warn};

use crate::{
    camera::{CameraResources, CameraRig},
    data_structures::{
        model::{self, DrawModel, GpuMesh},
        scene_graph::{MeshNode, Scene, SceneNode},
        texture::{self, Texture},
    },
    pipelines::{
        basic::{PipelineKey, Pipelines},
        light::{LightResources, LightsUniform},
    },
    stage::Stage,
};

/// Mesh nodes in draw order.
pub fn collect_draw_list(scene: &Scene) -> Vec<&MeshNode> {
    let mut draw_list = scene.meshes();
    draw_list.sort_by_key(|mesh| mesh.render_order);
    draw_list
}

/// Colour attachment for the main pass. With multisampling the pass renders
/// into `msaa_view` and resolves into the surface view.
pub fn color_attachment<'a>(
    surface_view: &'a wgpu::TextureView,
    msaa_view: Option<&'a wgpu::TextureView>,
    clear: wgpu::Color,
) -> wgpu::RenderPassColorAttachment<'a> {
    let (view, resolve_target) = match msaa_view {
        Some(msaa) => (msaa, Some(surface_view)),
        None => (surface_view, None),
    };
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target,
        depth_slice: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
    }
}

/// Issues one draw per uploaded mesh in `draw_list`. Meshes that have not
/// been uploaded yet, or whose pipeline is missing, are skipped.
pub fn draw_meshes<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    draw_list: &[&'a MeshNode],
    pipelines: &'a Pipelines,
    camera_bind_group: &'a wgpu::BindGroup,
    light_bind_group: &'a wgpu::BindGroup,
) -> usize {
    let mut current: Option<PipelineKey> = None;
    let mut draws = 0;
    for &node in draw_list {
        let Some(gpu) = node.gpu.as_ref() else {
            continue;
        };
        let key = PipelineKey::from(&node.material);
        if current != Some(key) {
            let Some(pipeline) = pipelines.get(&key) else {
                warn!("No pipeline for {:?}, skipping {}", key, node.name());
                continue;
            };
            render_pass.set_pipeline(pipeline);
            current = Some(key);
        }
        render_pass.draw_mesh(gpu, camera_bind_group, light_bind_group);
        draws += 1;
    }
    draws
}

/// Device-side render state that does not depend on a window: pipelines,
/// uniforms, attachments and the uploaded textures. The windowed
/// [`Context`](crate::context::Context) renders into the surface with it,
/// tests render into an offscreen texture.
#[derive(Debug)]
pub struct Renderer {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub clear_colour: wgpu::Color,
    size: [u32; 2],
    material_layout: wgpu::BindGroupLayout,
    pipelines: Pipelines,
    pub camera: CameraResources,
    pub lights: LightResources,
    depth_texture: Texture,
    msaa_texture: Option<Texture>,
    white: Texture,
    // keyed by image address; the Arc keeps the address from being reused
    textures: HashMap<usize, (Arc<RgbaImage>, Texture)>,
}

impl Renderer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        size: [u32; 2],
        sample_count: u32,
        clear_colour: wgpu::Color,
        rig: &CameraRig,
        lights: LightsUniform,
    ) -> Self {
        let material_layout = model::material_layout(device);
        let camera = CameraResources::new(device, rig);
        let lights = LightResources::new(device, lights);
        let pipelines = Pipelines::new(
            device,
            format,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &lights.bind_group_layout,
        );
        let depth_texture =
            Texture::create_depth_texture(device, size, sample_count, "depth_texture");
        let msaa_texture = (sample_count > 1).then(|| {
            Texture::create_msaa_texture(device, size, sample_count, format, "msaa_texture")
        });
        let white = Texture::create_white(device, queue);

        Self {
            format,
            sample_count,
            clear_colour,
            size,
            material_layout,
            pipelines,
            camera,
            lights,
            depth_texture,
            msaa_texture,
            white,
            textures: HashMap::new(),
        }
    }

    /// Recreates the depth and multisample attachments for a new target size.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        if size == self.size || size[0] == 0 || size[1] == 0 {
            return;
        }
        self.size = size;
        self.depth_texture =
            Texture::create_depth_texture(device, size, self.sample_count, "depth_texture");
        if self.sample_count > 1 {
            self.msaa_texture = Some(Texture::create_msaa_texture(
                device,
                size,
                self.sample_count,
                self.format,
                "msaa_texture",
            ));
        }
    }

    /// Writes the camera and lights uniforms, uploads meshes seen for the
    /// first time and refreshes the transform and material of the others.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, stage: &mut Stage) {
        self.camera.write_to_buffer(queue, &stage.rig);
        self.lights.write_to_buffer(queue, stage.lights_uniform());

        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        let Self {
            material_layout,
            pipelines,
            white,
            textures,
            ..
        } = self;
        stage.scene.for_each_mesh_mut(&mut |node| {
            pipelines.ensure(device, PipelineKey::from(&node.material));
            let world = node.get_world_transform();
            if let Some(gpu) = &node.gpu {
                gpu.write_to_buffers(queue, &node.material, &world);
                return;
            }
            debug!("Uploading {}", node.name());
            let diffuse = match &node.material.base_color_texture {
                Some(image) => {
                    let key = Arc::as_ptr(image) as usize;
                    let (_, texture) = textures.entry(key).or_insert_with(|| {
                        let fitted = texture::fit_within(image, max_texture_dimension);
                        if let Cow::Owned(smaller) = &fitted {
                            warn!(
                                "Downscaling {} base colour from {:?} to {:?}",
                                node.name(),
                                image.dimensions(),
                                smaller.dimensions()
                            );
                        }
                        let texture = Texture::from_image(
                            device,
                            queue,
                            &fitted,
                            Some(&format!("{} base colour", node.name())),
                        );
                        (image.clone(), texture)
                    });
                    &*texture
                }
                None => &*white,
            };
            node.gpu = Some(GpuMesh::new(
                device,
                node.name(),
                &node.mesh,
                &node.material,
                &world,
                diffuse,
                material_layout,
            ));
        });
    }

    /// Records the main pass into `target`. Returns the number of draws.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
    ) -> usize {
        let draw_list = collect_draw_list(scene);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(color_attachment(
                target,
                self.msaa_texture.as_ref().map(|t| &t.view),
                self.clear_colour,
            ))],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        draw_meshes(
            &mut render_pass,
            &draw_list,
            &self.pipelines,
            &self.camera.bind_group,
            &self.lights.bind_group,
        )
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}

/// Highest of `requested`, 4, 2 and 1 that `format` supports on `adapter`.
pub fn supported_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    requested: u32,
) -> u32 {
    let flags = adapter.get_texture_format_features(format).flags;
    [requested, 4, 2]
        .into_iter()
        .filter(|&count| count > 1 && count <= requested)
        .find(|&count| flags.sample_count_supported(count))
        .unwrap_or(1)
}
