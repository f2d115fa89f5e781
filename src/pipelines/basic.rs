use std::collections::HashMap;

use log::debug;

use crate::data_structures::{
    instance::InstanceRaw,
    material::{Material, Side},
    model::{self, Vertex},
    texture::Texture,
};

/// The material properties that need a distinct pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub side: Side,
    pub color_write: bool,
}

impl From<&Material> for PipelineKey {
    fn from(material: &Material) -> Self {
        Self {
            side: material.side,
            color_write: material.color_write,
        }
    }
}

impl PipelineKey {
    pub fn write_mask(&self) -> wgpu::ColorWrites {
        if self.color_write {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        }
    }
}

/// Lazily built Phong pipelines sharing one layout and shader module.
#[derive(Debug)]
pub struct Pipelines {
    layout: wgpu::PipelineLayout,
    shader: wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    cache: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        material_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[
                material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Phong Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("phong.wgsl").into()),
        });

        Self {
            layout,
            shader,
            color_format,
            sample_count,
            cache: HashMap::new(),
        }
    }

    /// Builds the pipeline for `key` unless it already exists.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.cache.contains_key(&key) {
            return;
        }
        debug!("Creating pipeline for {:?}", key);
        let pipeline = mk_render_pipeline(
            device,
            &self.layout,
            &self.shader,
            self.color_format,
            Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            Some(Texture::DEPTH_FORMAT),
            &[model::ModelVertex::desc(), InstanceRaw::desc()],
            key,
            self.sample_count,
        );
        self.cache.insert(key, pipeline);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    key: PipelineKey,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&format!("Render Pipeline {:?}", key)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: key.write_mask(),
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: key.side.cull_mode(),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // colour-masked meshes still occlude through the depth buffer
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occluder_key_masks_all_colour_channels() {
        let mut material = Material::phong();
        material.color_write = false;
        let key = PipelineKey::from(&material);
        assert_eq!(key.write_mask(), wgpu::ColorWrites::empty());
        assert_eq!(key.side, Side::Double);
        assert_eq!(key.side.cull_mode(), None);
    }

    #[test]
    fn default_key_writes_colour() {
        let key = PipelineKey::from(&Material::phong());
        assert_eq!(key.write_mask(), wgpu::ColorWrites::ALL);
    }
}
