//! occlusion-scene
//!
//! A small wgpu scene for native windows and WASM canvases: a red background
//! plane, an icosphere, a lazily loaded glTF model and an invisible
//! occlusion plane that only writes depth, cutting a hole into whatever is
//! drawn after it. An orbit camera follows pointer and wheel input.
//!
//! High-level modules
//! - `viewport`: logical size and capped pixel ratio of the surface
//! - `camera`: projection, look-at camera, orbit controller and uniforms
//! - `data_structures`: geometry, materials, lights, transforms, scene graph
//! - `resources`: asset fetching and glTF import
//! - `stage`: the GPU-free scene state the event handlers mutate
//! - `clock`: per-frame elapsed time and delta
//! - `flow`: the event loop, frame loop and its cancellation handle
//! - `context`: window surface, device and queue
//! - `render`: draw ordering and render pass encoding
//! - `pipelines`: Phong pipelines and the lights uniform
//!

pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod stage;
pub mod viewport;

pub use config::SceneConfig;
pub use error::LoadError;
pub use flow::{LoopHandle, run, run_with_handle};
pub use stage::Stage;
