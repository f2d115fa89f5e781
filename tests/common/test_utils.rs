#![allow(dead_code)]

use occlusion_scene::{SceneConfig, Stage, viewport::Viewport};

/// A stage at `width` x `height` logical pixels with the stock config.
pub(crate) fn test_stage(width: u32, height: u32) -> Stage {
    test_stage_with(SceneConfig::default(), width, height)
}

pub(crate) fn test_stage_with(config: SceneConfig, width: u32, height: u32) -> Stage {
    let viewport = Viewport::new(width, height, 1.0, config.max_pixel_ratio);
    Stage::new(config, viewport)
}

/// Positions (0,0,0), (1,0,0), (0,1,0) as f32 followed by u16 indices 0, 1, 2.
pub(crate) fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin = Vec::with_capacity(42);
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    bin
}

const TRIANGLE_ACCESSORS: &str = r#""accessors":[
    {"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]},
    {"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}
  ],
  "bufferViews":[
    {"buffer":0,"byteOffset":0,"byteLength":36,"target":34962},
    {"buffer":0,"byteOffset":36,"byteLength":6,"target":34963}
  ]"#;

fn triangle_json(buffer: &str) -> String {
    format!(
        r#"{{
  "asset":{{"version":"2.0"}},
  "scene":0,
  "scenes":[{{"nodes":[0]}}],
  "nodes":[
    {{"name":"root","translation":[1,0,0],"children":[1]}},
    {{"name":"triangle","mesh":0,"rotation":[0,0.7071068,0,0.7071068]}}
  ],
  "meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1,"material":0}}]}}],
  "materials":[{{"pbrMetallicRoughness":{{"baseColorFactor":[0.5,0.25,1,1]}},"doubleSided":true}}],
  {TRIANGLE_ACCESSORS},
  "buffers":[{buffer}]
}}"#
    )
}

/// Packs a JSON document and an optional BIN payload into a GLB container.
pub(crate) fn glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = bin.map(|b| {
        let mut b = b.to_vec();
        while b.len() % 4 != 0 {
            b.push(0);
        }
        b
    });

    let total = 12 + 8 + json.len() + bin.as_ref().map_or(0, |b| 8 + b.len());
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    if let Some(bin) = bin {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    out
}

/// A GLB with one node "root" translated by (1,0,0) whose child "triangle"
/// is a single double-sided triangle rotated 90 degrees about y.
pub(crate) fn triangle_glb() -> Vec<u8> {
    glb(&triangle_json(r#"{"byteLength":42}"#), Some(&triangle_bin()))
}

/// Same document with its buffer in an external `triangle.bin`.
pub(crate) fn triangle_gltf_external() -> String {
    triangle_json(r#"{"byteLength":42,"uri":"triangle.bin"}"#)
}

/// A valid GLB whose only node carries no mesh.
pub(crate) fn empty_glb() -> Vec<u8> {
    glb(
        r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"name":"empty"}]}"#,
        None,
    )
}

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[cfg(feature = "integration-tests")]
pub(crate) mod gpu {
    use std::time::Duration;

    /// A device without a surface, or `None` when the machine has no adapter.
    pub(crate) fn headless() -> Option<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok()?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()?;
            Some((adapter, device, queue))
        })
    }

    pub(crate) fn render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Copies an RGBA8 texture back to the CPU. Width must make rows a
    /// multiple of 256 bytes.
    pub(crate) fn read_back(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
    ) -> image::RgbaImage {
        let size = texture.size();
        let bytes_per_row = 4 * size.width;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("read back"),
            size: (bytes_per_row * size.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("read back encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size.height),
                },
            },
            size,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .unwrap();
        pollster::block_on(rx.receive()).unwrap().unwrap();

        let data = slice.get_mapped_range().to_vec();
        buffer.unmap();
        image::RgbaImage::from_raw(size.width, size.height, data).unwrap()
    }
}
