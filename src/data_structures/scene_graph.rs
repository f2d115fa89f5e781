//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] is an ordered list of root [`SceneNode`]s. Each node owns its
//! children, a local transform relative to its parent and the cached world
//! transform computed by [`Scene::update_world_transforms`]. Nodes are
//! mutated in place: there is no change tracking, the renderer re-uploads
//! transforms and materials every frame.
//!
//! Three node kinds exist:
//! - [`MeshNode`]: geometry, material and draw order, optionally uploaded.
//! - [`LightNode`]: an ambient or directional light.
//! - [`ContainerNode`]: a plain group, e.g. the root of a loaded model.

use log::warn;

use crate::data_structures::{
    geometry::MeshData,
    instance::Instance,
    light::Light,
    material::Material,
    model::GpuMesh,
};

/// Name, transforms and children shared by every node kind.
#[derive(Debug, Default)]
pub struct NodeBase {
    pub name: String,
    pub local: Instance,
    pub world: Instance,
    pub children: Vec<Box<dyn SceneNode>>,
}

impl NodeBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

pub trait SceneNode: Send + std::fmt::Debug {
    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.base().local
    }

    fn get_local_transform_mut(&mut self) -> &mut Instance {
        &mut self.base_mut().local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.base_mut().local = instance;
    }

    fn get_world_transform(&self) -> Instance {
        self.base().world
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.base().children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.base_mut().children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.base_mut().children.push(child);
    }

    /**
     * Recomputes this node's world transform from the parent's and passes
     * the result down to every child.
     */
    fn update_world_transforms(&mut self, parent: &Instance) {
        let base = self.base_mut();
        base.world = parent * &base.local;
        let world = base.world;
        for child in base.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        None
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        None
    }

    fn as_light(&self) -> Option<&LightNode> {
        None
    }
}

/// A drawable node. `render_order` sorts draws, lower first; equal orders
/// keep the order in which the nodes were added.
#[derive(Debug)]
pub struct MeshNode {
    base: NodeBase,
    pub mesh: MeshData,
    pub material: Material,
    pub render_order: i32,
    /// Buffers created on first upload; `None` until the renderer sees the node.
    pub gpu: Option<GpuMesh>,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, mesh: MeshData, material: Material) -> Self {
        Self {
            base: NodeBase::new(name),
            mesh,
            material,
            render_order: 0,
            gpu: None,
        }
    }

    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }

    pub fn with_transform(mut self, local: Instance) -> Self {
        self.base.local = local;
        self
    }
}

impl SceneNode for MeshNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_mesh(&self) -> Option<&MeshNode> {
        Some(self)
    }

    fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        Some(self)
    }
}

#[derive(Debug)]
pub struct LightNode {
    base: NodeBase,
    pub light: Light,
}

impl LightNode {
    pub fn new(name: impl Into<String>, light: Light) -> Self {
        Self {
            base: NodeBase::new(name),
            light,
        }
    }

    pub fn with_transform(mut self, local: Instance) -> Self {
        self.base.local = local;
        self
    }
}

impl SceneNode for LightNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_light(&self) -> Option<&LightNode> {
        Some(self)
    }
}

#[derive(Debug)]
pub struct ContainerNode {
    base: NodeBase,
}

impl ContainerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: NodeBase::new(name),
        }
    }
}

impl SceneNode for ContainerNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }
}

/// Depth-first search by name; the first match in insertion order wins.
pub fn find_in<'a>(nodes: &'a [Box<dyn SceneNode>], name: &str) -> Option<&'a dyn SceneNode> {
    for node in nodes {
        if node.name() == name {
            return Some(node.as_ref());
        }
        if let Some(found) = find_in(node.get_children(), name) {
            return Some(found);
        }
    }
    None
}

pub fn find_in_mut<'a>(
    nodes: &'a mut [Box<dyn SceneNode>],
    name: &str,
) -> Option<&'a mut dyn SceneNode> {
    for node in nodes.iter_mut() {
        if node.name() == name {
            return Some(node.as_mut());
        }
        if let Some(found) = find_in_mut(node.get_children_mut(), name) {
            return Some(found);
        }
    }
    None
}

fn visit<'a>(nodes: &'a [Box<dyn SceneNode>], f: &mut dyn FnMut(&'a dyn SceneNode)) {
    for node in nodes {
        f(node.as_ref());
        visit(node.get_children(), f);
    }
}

fn visit_mut(nodes: &mut [Box<dyn SceneNode>], f: &mut dyn FnMut(&mut dyn SceneNode)) {
    for node in nodes.iter_mut() {
        f(node.as_mut());
        visit_mut(node.get_children_mut(), f);
    }
}

/// The root of the graph.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: impl SceneNode + 'static) {
        self.add_boxed(Box::new(node));
    }

    pub fn add_boxed(&mut self, node: Box<dyn SceneNode>) {
        if self.contains(node.name()) {
            warn!("Scene already contains a node named {:?}", node.name());
        }
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[Box<dyn SceneNode>] {
        &self.nodes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn find(&self, name: &str) -> Option<&dyn SceneNode> {
        find_in(&self.nodes, name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut dyn SceneNode> {
        find_in_mut(&mut self.nodes, name)
    }

    pub fn update_world_transforms(&mut self) {
        let identity = Instance::new();
        for node in self.nodes.iter_mut() {
            node.update_world_transforms(&identity);
        }
    }

    /// Every mesh node, depth first in insertion order.
    pub fn meshes(&self) -> Vec<&MeshNode> {
        let mut meshes = Vec::new();
        visit(&self.nodes, &mut |node| {
            if let Some(mesh) = node.as_mesh() {
                meshes.push(mesh);
            }
        });
        meshes
    }

    pub fn for_each_mesh_mut(&mut self, f: &mut dyn FnMut(&mut MeshNode)) {
        visit_mut(&mut self.nodes, &mut |node| {
            if let Some(mesh) = node.as_mesh_mut() {
                f(mesh);
            }
        });
    }

    /// Every light together with its world transform.
    pub fn lights(&self) -> Vec<(Light, Instance)> {
        let mut lights = Vec::new();
        visit(&self.nodes, &mut |node| {
            if let Some(light) = node.as_light() {
                lights.push((light.light, light.get_world_transform()));
            }
        });
        lights
    }
}
