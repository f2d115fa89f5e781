use cgmath::{InnerSpace, Vector3};
use log::warn;
use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::Instance,
    light::{Light, LightKind},
};

/// Directional lights beyond this count are dropped.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Packed lights as the fragment shader reads them. Ambient lights are
/// summed into one colour, directional lights fill the arrays in scene
/// order. Vectors are padded to 16 bytes as uniforms require.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub ambient: [f32; 4],
    pub directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    pub colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    pub count: [u32; 4],
}

impl LightsUniform {
    pub fn from_lights(lights: &[(Light, Instance)]) -> Self {
        let mut uniform = Self::zeroed_uniform();
        let mut directional = 0;
        for (light, world) in lights {
            let radiance = light.radiance();
            match light.kind {
                LightKind::Ambient => {
                    uniform.ambient[0] += radiance.r;
                    uniform.ambient[1] += radiance.g;
                    uniform.ambient[2] += radiance.b;
                }
                LightKind::Directional => {
                    if directional == MAX_DIRECTIONAL_LIGHTS {
                        warn!("More than {} directional lights, ignoring the rest", MAX_DIRECTIONAL_LIGHTS);
                        continue;
                    }
                    // Shines from its position towards the origin.
                    let towards_origin = if world.position.magnitude2() > 0.0 {
                        -world.position.normalize()
                    } else {
                        Vector3::new(0.0, -1.0, 0.0)
                    };
                    uniform.directions[directional] = towards_origin.extend(0.0).into();
                    uniform.colors[directional] = [radiance.r, radiance.g, radiance.b, 1.0];
                    directional += 1;
                }
            }
        }
        uniform.ambient[3] = 1.0;
        uniform.count[0] = directional as u32;
        uniform
    }

    pub fn directional_count(&self) -> usize {
        self.count[0] as usize
    }

    fn zeroed_uniform() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

/// GPU side of the scene lights.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightsUniform) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, uniform: LightsUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, lights_uniform: LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Buffer"),
        contents: bytemuck::cast_slice(&[lights_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("lights_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("lights_bind_group"),
    })
}
