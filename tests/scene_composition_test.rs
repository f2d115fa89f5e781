mod common;

use std::f32::consts::PI;

use cgmath::{Rotation3, Vector3};
use occlusion_scene::{
    Stage,
    data_structures::{light::LightKind, material::Color, scene_graph::SceneNode},
    resources::model_from_slice,
    stage::{self, ModelState},
};

use crate::common::test_utils::{approx, test_stage, triangle_glb};

#[test]
fn should_compose_stock_scene() {
    let stage = test_stage(800, 600);
    let names: Vec<&str> = stage.scene.nodes().iter().map(|n| n.name()).collect();
    assert_eq!(
        names,
        vec![
            stage::BACKGROUND,
            stage::OCCLUSION,
            stage::ICOSPHERE,
            stage::AMBIENT_LIGHT,
            stage::DIRECTIONAL_LIGHT,
        ]
    );
    assert!(!stage.model_loaded());
    assert_eq!(stage.model_state(), ModelState::Pending);
}

#[test]
fn should_draw_in_render_order() {
    let stage = test_stage(800, 600);
    let draws: Vec<(&str, i32)> = stage
        .draw_list()
        .iter()
        .map(|m| (m.name(), m.render_order))
        .collect();
    assert_eq!(
        draws,
        vec![
            (stage::BACKGROUND, 0),
            (stage::OCCLUSION, 1),
            (stage::ICOSPHERE, 2),
        ]
    );
}

#[test]
fn occluder_writes_depth_only() {
    let stage = test_stage(800, 600);
    let occlusion = stage
        .scene
        .find(stage::OCCLUSION)
        .and_then(|n| n.as_mesh())
        .unwrap();
    assert!(!occlusion.material.color_write);
    assert_eq!(occlusion.material.color, Color::from_hex(0x0000ff));
    assert_eq!(occlusion.mesh.triangle_count(), 32);

    let others = [stage::BACKGROUND, stage::ICOSPHERE];
    for name in others {
        let mesh = stage.scene.find(name).and_then(|n| n.as_mesh()).unwrap();
        assert!(mesh.material.color_write, "{name} must write colour");
    }
}

fn occluder_color_write(stage: &Stage) -> bool {
    stage
        .scene
        .find(stage::OCCLUSION)
        .and_then(|n| n.as_mesh())
        .unwrap()
        .material
        .color_write
}

#[test]
fn occluder_stays_depth_only() {
    let mut stage = test_stage(800, 600);
    assert!(!occluder_color_write(&stage));

    stage.resize(1024, 768, 2.0);
    assert!(!occluder_color_write(&stage));

    stage.on_model_loaded(model_from_slice(&triangle_glb(), "test.glb"));
    assert!(!occluder_color_write(&stage));

    for i in 1..=10 {
        stage.frame(std::time::Duration::from_millis(16 * i)).unwrap();
    }
    assert!(!occluder_color_write(&stage));

    let occluders = stage
        .draw_list()
        .iter()
        .filter(|m| !m.material.color_write)
        .map(|m| m.name())
        .collect::<Vec<_>>();
    assert_eq!(occluders, vec![stage::OCCLUSION]);
}

#[test]
fn should_place_primitives() {
    let stage = test_stage(800, 600);

    let background = stage.scene.find(stage::BACKGROUND).unwrap();
    assert_eq!(
        background.get_world_transform().position,
        Vector3::new(0.0, 0.0, -20.0)
    );

    let occlusion = stage.scene.find(stage::OCCLUSION).unwrap();
    let world = occlusion.get_world_transform();
    assert_eq!(world.position, Vector3::new(0.0, 20.0, 25.0));
    let expected = cgmath::Quaternion::from_angle_y(cgmath::Rad(-PI / 10.0));
    assert!(approx(world.rotation.s, expected.s));
    assert!(approx(world.rotation.v.y, expected.v.y));

    let icosphere = stage
        .scene
        .find(stage::ICOSPHERE)
        .and_then(|n| n.as_mesh())
        .unwrap();
    assert_eq!(icosphere.get_world_transform().position, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(icosphere.mesh.triangle_count(), 80);
    assert_eq!(icosphere.material.color, Color::from_hex(0x606060));
}

#[test]
fn both_lights_are_ambient() {
    let stage = test_stage(800, 600);
    let lights = stage.scene.lights();
    assert_eq!(lights.len(), 2);
    assert!(lights.iter().all(|(l, _)| l.kind == LightKind::Ambient));

    let uniform = stage.lights_uniform();
    assert_eq!(uniform.directional_count(), 0);
    for channel in &uniform.ambient[..3] {
        assert!(approx(*channel, 2.0));
    }
}

#[test]
fn directional_light_sits_at_camera_offset() {
    let stage = test_stage(800, 600);
    let light = stage.scene.find(stage::DIRECTIONAL_LIGHT).unwrap();
    let offset = stage.config.camera_offset;
    assert_eq!(
        light.get_world_transform().position,
        Vector3::new(offset, offset, offset)
    );
}
