//! The GPU-free application state.
//!
//! [`Stage`] owns everything the event handlers mutate: viewport, camera
//! rig, scene graph, frame loop and the pending model group. It is built
//! once at startup and handed explicitly to the resize, load-completion and
//! frame handlers, so the whole scene lifecycle can be driven without a
//! window or a GPU.

use std::f32::consts::PI;

use cgmath::{Rad, Vector3};
use log::{info, warn};

use crate::{
    camera::CameraRig,
    clock::FrameTime,
    config::SceneConfig,
    data_structures::{
        geometry,
        instance::Instance,
        light::Light,
        material::{Color, Material},
        scene_graph::{ContainerNode, LightNode, MeshNode, Scene, SceneNode},
    },
    error::LoadError,
    flow::{FrameLoop, LoopHandle},
    pipelines::light::LightsUniform,
    render::collect_draw_list,
    viewport::Viewport,
};

pub const BACKGROUND: &str = "background";
pub const OCCLUSION: &str = "occlusion";
pub const ICOSPHERE: &str = "icosphere";
pub const MODEL_GROUP: &str = "model-group";
pub const AMBIENT_LIGHT: &str = "ambient-light";
pub const DIRECTIONAL_LIGHT: &str = "directional-light";

/// Progress of the single asynchronous model load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelState {
    Pending,
    Loaded,
    Failed,
}

/// Builds the static part of the scene: the three primitives and the lights.
pub fn compose_scene(config: &SceneConfig) -> Scene {
    let base = Material::phong();
    let mut scene = Scene::new();

    scene.add(
        MeshNode::new(
            BACKGROUND,
            geometry::plane(10.0, 10.0, 4, 4),
            base.clone().with_color_hex(0xff0000),
        )
        .with_render_order(0)
        .with_transform(Instance::from(Vector3::new(0.0, 0.0, -20.0))),
    );

    let mut occluder = base.clone().with_color_hex(0x0000ff);
    occluder.color_write = false;
    let mut occlusion_transform = Instance::from(Vector3::new(0.0, 20.0, 25.0));
    occlusion_transform.set_rotation_y(Rad(-PI / 10.0));
    scene.add(
        MeshNode::new(OCCLUSION, geometry::plane(15.0, 52.0, 4, 4), occluder)
            .with_render_order(1)
            .with_transform(occlusion_transform),
    );

    scene.add(
        MeshNode::new(
            ICOSPHERE,
            geometry::icosahedron(15.0, 1),
            base.with_color_hex(0x606060),
        )
        .with_render_order(2),
    );

    scene.add(LightNode::new(AMBIENT_LIGHT, Light::ambient(Color::WHITE, 0.5)));
    // Named directional but built as an ambient light: it brightens
    // everything uniformly and its position has no effect.
    scene.add(
        LightNode::new(DIRECTIONAL_LIGHT, Light::ambient(Color::WHITE, 1.5))
            .with_transform(Instance::from(Vector3::new(
                config.camera_offset,
                config.camera_offset,
                config.camera_offset,
            ))),
    );

    scene
}

#[derive(Debug)]
pub struct Stage {
    pub config: SceneConfig,
    pub viewport: Viewport,
    pub rig: CameraRig,
    pub scene: Scene,
    frame_loop: FrameLoop,
    model_group: Option<ContainerNode>,
    model_state: ModelState,
}

impl Stage {
    pub fn new(config: SceneConfig, viewport: Viewport) -> Self {
        Self::with_handle(config, viewport, LoopHandle::new())
    }

    /// Like [`Stage::new`], with a caller-provided cancellation handle.
    pub fn with_handle(config: SceneConfig, viewport: Viewport, handle: LoopHandle) -> Self {
        let rig = CameraRig::new(&config, &viewport);
        let mut scene = compose_scene(&config);
        scene.update_world_transforms();
        info!(
            "Stage composed at {}x{} (pixel ratio {})",
            viewport.width(),
            viewport.height(),
            viewport.pixel_ratio()
        );
        Self {
            config,
            viewport,
            rig,
            scene,
            frame_loop: FrameLoop::new(handle),
            model_group: Some(ContainerNode::new(MODEL_GROUP)),
            model_state: ModelState::Pending,
        }
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.frame_loop.handle()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    /// Applies a logical resize. Returns `false` for ignored zero-sized
    /// requests, in which case nothing changes.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> bool {
        if !self.viewport.resize(width, height, device_pixel_ratio) {
            return false;
        }
        self.rig.resize(&self.viewport);
        true
    }

    /// Applies a resize reported by winit in physical pixels.
    pub fn resize_physical(
        &mut self,
        size: winit::dpi::PhysicalSize<u32>,
        scale_factor: f64,
    ) -> bool {
        if !self.viewport.resize_physical(size, scale_factor) {
            return false;
        }
        self.rig.resize(&self.viewport);
        true
    }

    /// Feeds pointer and wheel input to the orbit controller.
    pub fn handle_window_events(&mut self, event: &winit::event::WindowEvent) -> bool {
        self.rig.handle_window_events(&self.viewport, event)
    }

    /// Consumes the result of the model load. The first completion wins;
    /// anything after it is ignored.
    pub fn on_model_loaded(&mut self, result: Result<Box<dyn SceneNode>, LoadError>) {
        let Some(mut group) = self.model_group.take() else {
            warn!("Ignoring a second model load completion");
            return;
        };
        match result {
            Ok(mut root) => {
                let transform = root.get_local_transform_mut();
                transform.set_rotation_y(Rad(PI));
                transform.position.z = 50.0;
                transform.position.y = -10.0;
                group.add_child(root);
                self.scene.add(group);
                self.scene.update_world_transforms();
                self.model_state = ModelState::Loaded;
                info!("Model {} added to the scene", self.config.model_path);
            }
            Err(e) => {
                self.model_state = ModelState::Failed;
                warn!("Model {} could not be loaded: {}", self.config.model_path, e);
            }
        }
    }

    pub fn model_state(&self) -> ModelState {
        self.model_state
    }

    pub fn model_loaded(&self) -> bool {
        self.scene.contains(MODEL_GROUP)
    }

    /// Advances one loop iteration. Returns `None` once the loop handle has
    /// been cancelled; the caller must stop rendering then.
    pub fn frame(&mut self, elapsed: instant::Duration) -> Option<FrameTime> {
        let time = self.frame_loop.next_frame(elapsed)?;
        if self.config.update_controls {
            self.rig.update();
        }
        self.scene.update_world_transforms();
        Some(time)
    }

    pub fn draw_list(&self) -> Vec<&MeshNode> {
        collect_draw_list(&self.scene)
    }

    pub fn lights_uniform(&self) -> LightsUniform {
        LightsUniform::from_lights(&self.scene.lights())
    }
}
