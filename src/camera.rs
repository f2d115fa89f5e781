//! Camera rig: a look-at camera, its perspective projection and an orbit
//! controller that maps pointer and touch input to orbit, dolly and pan
//! deltas.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
};

use crate::{config::SceneConfig, viewport::Viewport};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the polar angle off the poles so `look_at` never degenerates.
const POLAR_EPSILON: f32 = 1e-4;
// Pixels per wheel "line" when the platform reports pixel deltas.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    fn forward(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }

    fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y()).normalize()
    }

    fn up(&self) -> Vector3<f32> {
        self.right().cross(self.forward()).normalize()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    None,
    Rotate,
    Dolly,
    Pan,
}

/// Converts a physical pointer position to logical pixels.
fn logical_position(viewport: &Viewport, position: PhysicalPosition<f64>) -> (f64, f64) {
    let scale = viewport.scale_factor().max(f64::EPSILON);
    (position.x / scale, position.y / scale)
}

/// Orbit controller with optional damping.
///
/// Pointer input integrates into the camera immediately. With damping on,
/// each integration only consumes `damping_factor` of the accumulated
/// momentum; the remainder decays in later [`OrbitController::update`]
/// calls, which is what produces inertia after a drag is released.
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: SphericalDelta,
    pan_offset: Vector3<f32>,
    scale: f32,
    drag: Drag,
    cursor: Option<(f64, f64)>,
    // active touches in the order they started, logical positions
    touches: Vec<(u64, (f64, f64))>,
}

impl OrbitController {
    pub fn new(enable_damping: bool, damping_factor: f32) -> Self {
        Self {
            enable_damping,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: SphericalDelta::default(),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
            drag: Drag::None,
            cursor: None,
            touches: Vec::new(),
        }
    }

    /// Whether any orbit, pan or dolly momentum is left to integrate.
    pub fn has_momentum(&self) -> bool {
        const EPS: f32 = 1e-6;
        self.spherical_delta.theta.abs() > EPS
            || self.spherical_delta.phi.abs() > EPS
            || self.pan_offset.magnitude2() > EPS
            || (self.scale - 1.0).abs() > EPS
    }

    /// Orbit by a drag of `(dx, dy)` pixels on a surface `height` pixels tall.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        let height = height.max(1.0);
        self.spherical_delta.theta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.spherical_delta.phi -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Positive `lines` moves towards the target.
    pub fn dolly(&mut self, lines: f32) {
        let step = 0.95_f32.powf(self.zoom_speed);
        if lines > 0.0 {
            self.scale *= step;
        } else if lines < 0.0 {
            self.scale /= step;
        }
    }

    /// Dolly by the ratio between the current and the previous distance of
    /// two touch points. Spreading the fingers (`ratio > 1`) moves closer.
    pub fn pinch(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            self.scale /= ratio.powf(self.zoom_speed);
        }
    }

    /// Pan by a drag of `(dx, dy)` pixels in screen space.
    pub fn pan(&mut self, camera: &Camera, projection: &Projection, dx: f32, dy: f32, height: f32) {
        let height = height.max(1.0);
        let target_distance = camera.distance() * (projection.fovy().0 / 2.0).tan();
        let left = 2.0 * dx * target_distance / height * self.pan_speed;
        let up = 2.0 * dy * target_distance / height * self.pan_speed;
        self.pan_offset += camera.right() * -left + camera.up() * up;
    }

    /// Maps winit pointer events to controller input and integrates it.
    /// Returns `true` if the camera moved.
    pub fn handle_window_events(
        &mut self,
        camera: &mut Camera,
        projection: &Projection,
        viewport: &Viewport,
        event: &WindowEvent,
    ) -> bool {
        let height = viewport.height() as f32;
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Drag::Rotate,
                    (ElementState::Pressed, MouseButton::Middle) => Drag::Dolly,
                    (ElementState::Pressed, MouseButton::Right) => Drag::Pan,
                    (ElementState::Released, _) => Drag::None,
                    _ => self.drag,
                };
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                // Cursor positions are physical; deltas are compared against
                // the logical height.
                let current = logical_position(viewport, *position);
                let previous = self.cursor.replace(current);
                let Some((px, py)) = previous else {
                    return false;
                };
                let (dx, dy) = ((current.0 - px) as f32, (current.1 - py) as f32);
                match self.drag {
                    Drag::Rotate => self.rotate(dx, dy, height),
                    // dragging up moves towards the target
                    Drag::Dolly => self.dolly(-dy),
                    Drag::Pan => self.pan(camera, projection, dx, dy, height),
                    Drag::None => return false,
                }
                self.update(camera)
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.dolly(lines);
                self.update(camera)
            }
            WindowEvent::Touch(touch) => self.handle_touch(camera, projection, viewport, touch),
            _ => false,
        }
    }

    /// One finger orbits; two fingers dolly by their spread and pan by their
    /// midpoint. Further fingers are tracked but ignored.
    fn handle_touch(
        &mut self,
        camera: &mut Camera,
        projection: &Projection,
        viewport: &Viewport,
        touch: &Touch,
    ) -> bool {
        let position = logical_position(viewport, touch.location);
        match touch.phase {
            TouchPhase::Started => {
                self.touches.retain(|(id, _)| *id != touch.id);
                self.touches.push((touch.id, position));
                false
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.retain(|(id, _)| *id != touch.id);
                false
            }
            TouchPhase::Moved => {
                let previous = self.active_touches();
                let Some(slot) = self.touches.iter_mut().find(|(id, _)| *id == touch.id) else {
                    return false;
                };
                slot.1 = position;
                let current = self.active_touches();

                let height = viewport.height() as f32;
                match (previous.as_slice(), current.as_slice()) {
                    ([p], [c]) => {
                        self.rotate((c.0 - p.0) as f32, (c.1 - p.1) as f32, height);
                    }
                    ([p0, p1], [c0, c1]) => {
                        let spread = |a: &(f64, f64), b: &(f64, f64)| (a.0 - b.0).hypot(a.1 - b.1);
                        let before = spread(p0, p1);
                        if before > 0.0 {
                            self.pinch((spread(c0, c1) / before) as f32);
                        }
                        let dx = (c0.0 + c1.0 - p0.0 - p1.0) / 2.0;
                        let dy = (c0.1 + c1.1 - p0.1 - p1.1) / 2.0;
                        self.pan(camera, projection, dx as f32, dy as f32, height);
                    }
                    _ => return false,
                }
                self.update(camera)
            }
        }
    }

    fn active_touches(&self) -> Vec<(f64, f64)> {
        self.touches.iter().take(2).map(|(_, p)| *p).collect()
    }

    /// Integrates accumulated input into `camera`. Returns `true` if the
    /// camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.spherical_delta.theta * factor;
        phi = (phi + self.spherical_delta.phi * factor).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let before = *camera;
        camera.target += self.pan_offset * factor;
        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = camera.target + offset;

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= keep;
            self.spherical_delta.phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        const EPS: f32 = 1e-6;
        (camera.position - before.position).magnitude2() > EPS
            || (camera.target - before.target).magnitude2() > EPS
    }
}

/// Camera, projection and controller kept in sync with the viewport.
#[derive(Clone, Debug)]
pub struct CameraRig {
    pub camera: Camera,
    pub projection: Projection,
    pub controller: OrbitController,
}

impl CameraRig {
    pub fn new(config: &SceneConfig, viewport: &Viewport) -> Self {
        let camera = Camera::new(config.camera_position(), (0.0, 0.0, 0.0));
        let projection = Projection::new(
            viewport.width(),
            viewport.height(),
            config.fovy,
            config.znear,
            config.zfar,
        );
        let controller = OrbitController::new(config.enable_damping, config.damping_factor);
        Self {
            camera,
            projection,
            controller,
        }
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        self.projection.resize(viewport.width(), viewport.height());
    }

    pub fn handle_window_events(&mut self, viewport: &Viewport, event: &WindowEvent) -> bool {
        self.controller
            .handle_window_events(&mut self.camera, &self.projection, viewport, event)
    }

    pub fn update(&mut self) -> bool {
        self.controller.update(&mut self.camera)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, rig: &CameraRig) {
        self.view_position = rig.camera.position.to_homogeneous().into();
        self.view_proj = rig.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: the uniform, its buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, rig: &CameraRig) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(rig);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, rig: &CameraRig) {
        self.uniform.update_view_proj(rig);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> CameraRig {
        let config = SceneConfig::default();
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        CameraRig::new(&config, &viewport)
    }

    #[test]
    fn starts_on_the_cube_diagonal() {
        let rig = rig();
        assert_eq!(rig.camera.position, Point3::new(35.0, 35.0, 35.0));
        assert_eq!(rig.camera.target, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn orbit_keeps_distance_without_damping() {
        let mut rig = rig();
        rig.controller.enable_damping = false;
        let distance = rig.camera.distance();
        rig.controller.rotate(120.0, 0.0, 600.0);
        assert!(rig.update());
        assert!((rig.camera.distance() - distance).abs() < 1e-3);
        assert!(!rig.controller.has_momentum());
    }

    #[test]
    fn damping_leaves_momentum_that_decays() {
        let mut rig = rig();
        let start = rig.camera.position;
        rig.controller.rotate(120.0, 0.0, 600.0);
        assert!(rig.update());
        assert!(rig.controller.has_momentum());
        let after_first = rig.camera.position;
        assert_ne!(after_first, start);
        // Without further input the camera keeps drifting.
        assert!(rig.update());
        assert_ne!(rig.camera.position, after_first);
    }

    #[test]
    fn dolly_in_shortens_the_distance() {
        let mut rig = rig();
        let distance = rig.camera.distance();
        rig.controller.dolly(1.0);
        rig.update();
        assert!(rig.camera.distance() < distance);
    }

    #[test]
    fn pan_moves_target_and_position_together() {
        let mut rig = rig();
        rig.controller.enable_damping = false;
        let before = rig.camera;
        let (camera, projection) = (rig.camera, rig.projection);
        rig.controller.pan(&camera, &projection, 50.0, 0.0, 600.0);
        rig.update();
        let moved_target = rig.camera.target - before.target;
        let moved_position = rig.camera.position - before.position;
        assert!(moved_target.magnitude() > 0.0);
        assert!((moved_target - moved_position).magnitude() < 1e-3);
    }

    fn touch(id: u64, phase: TouchPhase, x: f64, y: f64) -> WindowEvent {
        WindowEvent::Touch(Touch {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            phase,
            location: PhysicalPosition::new(x, y),
            force: None,
            id,
        })
    }

    fn cursor(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(x, y),
        }
    }

    fn button(state: ElementState, button: MouseButton) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state,
            button,
        }
    }

    #[test]
    fn one_finger_touch_orbits() {
        let mut rig = rig();
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        let before = rig.camera;
        let distance = before.distance();

        assert!(!rig.handle_window_events(&viewport, &touch(7, TouchPhase::Started, 100.0, 100.0)));
        assert!(rig.handle_window_events(&viewport, &touch(7, TouchPhase::Moved, 200.0, 100.0)));

        assert_ne!(rig.camera.position, before.position);
        assert_eq!(rig.camera.target, before.target);
        assert!((rig.camera.distance() - distance).abs() < 1e-3);
    }

    #[test]
    fn lifted_finger_no_longer_moves_the_camera() {
        let mut rig = rig();
        rig.controller.enable_damping = false;
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        rig.handle_window_events(&viewport, &touch(1, TouchPhase::Started, 100.0, 100.0));
        rig.handle_window_events(&viewport, &touch(1, TouchPhase::Ended, 100.0, 100.0));
        let before = rig.camera;
        assert!(!rig.handle_window_events(&viewport, &touch(1, TouchPhase::Moved, 300.0, 100.0)));
        assert_eq!(rig.camera, before);
    }

    #[test]
    fn two_finger_spread_dollies_in() {
        let mut rig = rig();
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        let distance = rig.camera.distance();

        rig.handle_window_events(&viewport, &touch(0, TouchPhase::Started, 300.0, 300.0));
        rig.handle_window_events(&viewport, &touch(1, TouchPhase::Started, 400.0, 300.0));
        assert!(rig.handle_window_events(&viewport, &touch(1, TouchPhase::Moved, 500.0, 300.0)));

        // spread doubled, so the radius halves; panning keeps the distance
        assert!((rig.camera.distance() - distance / 2.0).abs() < 1e-2);
    }

    #[test]
    fn two_finger_drag_pans() {
        let mut rig = rig();
        rig.controller.enable_damping = false;
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        let before = rig.camera;

        rig.handle_window_events(&viewport, &touch(0, TouchPhase::Started, 300.0, 300.0));
        rig.handle_window_events(&viewport, &touch(1, TouchPhase::Started, 400.0, 300.0));
        rig.handle_window_events(&viewport, &touch(0, TouchPhase::Moved, 350.0, 300.0));
        rig.handle_window_events(&viewport, &touch(1, TouchPhase::Moved, 450.0, 300.0));

        let moved_target = rig.camera.target - before.target;
        let moved_position = rig.camera.position - before.position;
        assert!(moved_target.magnitude() > 0.0);
        assert!((moved_target - moved_position).magnitude() < 1e-3);
        assert!((rig.camera.distance() - before.distance()).abs() < 1e-3);
    }

    #[test]
    fn middle_drag_dollies() {
        let mut rig = rig();
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        let distance = rig.camera.distance();

        rig.handle_window_events(&viewport, &button(ElementState::Pressed, MouseButton::Middle));
        rig.handle_window_events(&viewport, &cursor(100.0, 100.0));
        assert!(rig.handle_window_events(&viewport, &cursor(100.0, 80.0)));
        assert!(rig.camera.distance() < distance);

        let closer = rig.camera.distance();
        assert!(rig.handle_window_events(&viewport, &cursor(100.0, 120.0)));
        assert!(rig.camera.distance() > closer);
    }

    #[test]
    fn drag_uses_the_uncapped_scale_factor() {
        // 300 physical pixels at a device ratio of 3 are 100 logical pixels
        let mut hidpi = rig();
        let viewport = Viewport::new(800, 600, 3.0, 2.0);
        hidpi.handle_window_events(&viewport, &button(ElementState::Pressed, MouseButton::Left));
        hidpi.handle_window_events(&viewport, &cursor(0.0, 0.0));
        hidpi.handle_window_events(&viewport, &cursor(300.0, 0.0));

        let mut plain = rig();
        let viewport = Viewport::new(800, 600, 1.0, 2.0);
        plain.handle_window_events(&viewport, &button(ElementState::Pressed, MouseButton::Left));
        plain.handle_window_events(&viewport, &cursor(0.0, 0.0));
        plain.handle_window_events(&viewport, &cursor(100.0, 0.0));

        assert!((hidpi.camera.position - plain.camera.position).magnitude() < 1e-4);
    }

    #[test]
    fn resize_tracks_aspect() {
        let mut rig = rig();
        let viewport = Viewport::new(1000, 500, 1.0, 2.0);
        rig.resize(&viewport);
        assert_eq!(rig.projection.aspect(), 2.0);
    }
}
