//! glTF import into GPU-free scene nodes.
//!
//! The node tree is built on whatever thread runs the load future; buffers
//! are only created once the renderer first sees the meshes.

use std::{collections::BTreeSet, sync::Arc};

use cgmath::{Quaternion, Vector3};
use image::RgbaImage;
use log::{debug, warn};

use crate::{
    data_structures::{
        geometry::MeshData,
        instance::Instance,
        material::{Color, Material, Side},
        model::ModelVertex,
        scene_graph::{ContainerNode, MeshNode, SceneNode},
    },
    error::LoadError,
    resources::{load_binary, resolve_relative},
};

/// Fetches `file_name` (and any external buffers or images it references)
/// and converts its default scene into a node tree rooted at a container
/// named after the file.
pub async fn load_model_gltf(file_name: &str) -> Result<Box<dyn SceneNode>, LoadError> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    // external buffers are fetched concurrently
    let blob = &gltf.blob;
    let buffers = futures::future::try_join_all(gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            gltf::buffer::Source::Bin => Ok(blob.clone().unwrap_or_default()),
            gltf::buffer::Source::Uri(uri) => load_binary(&resolve_relative(file_name, uri)).await,
        }
    }))
    .await?;

    let wanted = base_color_images(&gltf);
    let mut images = vec![None; gltf.images().len()];
    for image in gltf.images().filter(|i| wanted.contains(&i.index())) {
        let decoded = match image.source() {
            gltf::image::Source::View { view, .. } => {
                decode_image(image_name(&image), view_bytes(&view, &buffers))?
            }
            gltf::image::Source::Uri { uri, .. } => {
                let data = load_binary(&resolve_relative(file_name, uri)).await?;
                decode_image(uri.to_owned(), &data)?
            }
        };
        images[image.index()] = Some(decoded);
    }

    build_model(&gltf, &buffers, &images, file_name)
}

/// Parses a self-contained `.glb` from memory. Any external URI is an error.
pub fn model_from_slice(bytes: &[u8], name: &str) -> Result<Box<dyn SceneNode>, LoadError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let buffers = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => Ok(gltf.blob.clone().unwrap_or_default()),
            gltf::buffer::Source::Uri(uri) => Err(LoadError::ExternalResource(uri.to_owned())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let wanted = base_color_images(&gltf);
    let mut images = vec![None; gltf.images().len()];
    for image in gltf.images().filter(|i| wanted.contains(&i.index())) {
        let decoded = match image.source() {
            gltf::image::Source::View { view, .. } => {
                decode_image(image_name(&image), view_bytes(&view, &buffers))?
            }
            gltf::image::Source::Uri { uri, .. } => {
                return Err(LoadError::ExternalResource(uri.to_owned()));
            }
        };
        images[image.index()] = Some(decoded);
    }

    build_model(&gltf, &buffers, &images, name)
}

/// Indices of the images used as base colour textures; nothing else is decoded.
fn base_color_images(document: &gltf::Document) -> BTreeSet<usize> {
    document
        .materials()
        .filter_map(|m| m.pbr_metallic_roughness().base_color_texture())
        .map(|info| info.texture().source().index())
        .collect()
}

fn image_name(image: &gltf::Image) -> String {
    image
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("image {}", image.index()))
}

fn view_bytes<'a>(view: &gltf::buffer::View, buffers: &'a [Vec<u8>]) -> &'a [u8] {
    let Some(buffer) = buffers.get(view.buffer().index()) else {
        return &[];
    };
    let start = view.offset().min(buffer.len());
    let end = (view.offset() + view.length()).min(buffer.len());
    &buffer[start..end]
}

fn decode_image(name: String, bytes: &[u8]) -> Result<Arc<RgbaImage>, LoadError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|source| LoadError::Image { name, source })?;
    Ok(Arc::new(decoded.to_rgba8()))
}

/// Converts the default scene (or the first one) into a container holding
/// one child per root node. Fails with [`LoadError::EmptyScene`] when no
/// triangle mesh survives the import.
pub fn build_model(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    images: &[Option<Arc<RgbaImage>>],
    name: &str,
) -> Result<Box<dyn SceneNode>, LoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::EmptyScene)?;

    let mut mesh_count = 0;
    let mut root = ContainerNode::new(name);
    for node in scene.nodes() {
        root.add_child(to_scene_node(&node, buffers, images, &mut mesh_count));
    }
    if mesh_count == 0 {
        return Err(LoadError::EmptyScene);
    }
    debug!("Imported {} meshes from {}", mesh_count, name);

    Ok(Box::new(root))
}

fn to_scene_node(
    node: &gltf::Node,
    buffers: &[Vec<u8>],
    images: &[Option<Arc<RgbaImage>>],
    mesh_count: &mut usize,
) -> Box<dyn SceneNode> {
    let name = node
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("node {}", node.index()));

    let mut primitives: Vec<MeshNode> = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .enumerate()
                .filter_map(|(i, primitive)| {
                    to_mesh_node(&format!("{} #{}", name, i), &primitive, buffers, images)
                })
                .collect()
        })
        .unwrap_or_default();
    *mesh_count += primitives.len();

    // A single primitive takes the node's place, several get grouped.
    let mut scene_node: Box<dyn SceneNode> = if primitives.len() == 1 {
        let mut mesh = primitives.remove(0);
        mesh.base_mut().name = name;
        Box::new(mesh)
    } else {
        let mut container = ContainerNode::new(name);
        for mesh in primitives {
            container.add_child(Box::new(mesh));
        }
        Box::new(container)
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.set_local_transform(Instance {
        position: Vector3::from(translation),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: Vector3::from(scale),
    });

    for child in node.children() {
        scene_node.add_child(to_scene_node(&child, buffers, images, mesh_count));
    }
    scene_node
}

fn to_mesh_node(
    name: &str,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    images: &[Option<Arc<RgbaImage>>],
) -> Option<MeshNode> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        warn!("Skipping {}: primitive mode {:?} is not supported", name, primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        warn!("Skipping {}: primitive has no positions", name);
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    let has_normals = match reader.read_normals() {
        Some(normals) => {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
            true
        }
        None => false,
    };
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|t| t.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if indices.iter().any(|&i| i as usize >= vertices.len()) {
        warn!("Skipping {}: index out of range", name);
        return None;
    }

    let mut mesh = MeshData { vertices, indices };
    if !has_normals {
        mesh.compute_normals();
    }

    Some(MeshNode::new(name, mesh, to_material(&primitive.material(), images)))
}

fn to_material(material: &gltf::Material, images: &[Option<Arc<RgbaImage>>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    Material {
        color: Color::new(r, g, b),
        side: if material.double_sided() {
            Side::Double
        } else {
            Side::Front
        },
        base_color_texture: pbr
            .base_color_texture()
            .and_then(|info| images.get(info.texture().source().index()).cloned().flatten()),
        ..Material::phong()
    }
}
