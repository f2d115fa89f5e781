//! Scene data structures: geometry, materials, lights, transforms and the
//! scene graph, plus the GPU resources they are uploaded into.
//!
//! - `geometry` holds CPU-side mesh data and the primitive shapes
//! - `material` holds colours, face culling and the material uniform
//! - `light` holds ambient and directional lights
//! - `instance` holds node transforms and their GPU layout
//! - `scene_graph` enables hierarchical scene organization
//! - `model` contains the vertex layout and uploaded mesh buffers
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod geometry;
pub mod instance;
pub mod light;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
