#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_icosphere_over_transparent_clear() {
    use occlusion_scene::render::{Renderer, supported_sample_count};

    use crate::common::test_utils::{gpu, test_stage};

    let Some((adapter, device, queue)) = gpu::headless() else {
        eprintln!("no graphics adapter, skipping");
        return;
    };

    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let size = [64, 64];
    let mut stage = test_stage(size[0], size[1]);
    let sample_count = supported_sample_count(&adapter, format, stage.config.sample_count);
    let mut renderer = Renderer::new(
        &device,
        &queue,
        format,
        size,
        sample_count,
        stage.config.clear_colour,
        &stage.rig,
        stage.lights_uniform(),
    );

    stage.frame(std::time::Duration::from_millis(16)).unwrap();
    renderer.prepare(&device, &queue, &mut stage);
    // one pipeline for the visible meshes, one for the depth-only occluder
    assert_eq!(renderer.pipeline_count(), 2);

    let target = gpu::render_target(&device, size, format);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test encoder"),
    });
    let draws = renderer.encode(&mut encoder, &view, &stage.scene);
    assert_eq!(draws, 3);
    queue.submit(std::iter::once(encoder.finish()));

    let image = gpu::read_back(&device, &queue, &target);

    // 0x606060 under a combined ambient of 2.0
    let centre = image.get_pixel(32, 32);
    for channel in &centre.0[..3] {
        assert!((*channel as i32 - 133).abs() <= 4, "centre {centre:?}");
    }
    assert_eq!(centre.0[3], 255);

    let corner = image.get_pixel(0, 0);
    assert_eq!(corner.0, [0, 0, 0, 0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn model_meshes_are_uploaded_once_loaded() {
    use occlusion_scene::{render::Renderer, resources::model_from_slice};

    use crate::common::test_utils::{gpu, test_stage, triangle_glb};

    let Some((_, device, queue)) = gpu::headless() else {
        eprintln!("no graphics adapter, skipping");
        return;
    };

    let mut stage = test_stage(64, 64);
    let mut renderer = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        [64, 64],
        1,
        stage.config.clear_colour,
        &stage.rig,
        stage.lights_uniform(),
    );
    renderer.prepare(&device, &queue, &mut stage);
    assert!(stage.draw_list().iter().all(|m| m.gpu.is_some()));

    stage.on_model_loaded(model_from_slice(&triangle_glb(), "test.glb"));
    assert!(stage.draw_list().iter().any(|m| m.gpu.is_none()));
    renderer.prepare(&device, &queue, &mut stage);
    assert!(stage.draw_list().iter().all(|m| m.gpu.is_some()));
}
