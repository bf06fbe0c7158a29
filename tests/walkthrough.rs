use glam::Vec3;
use lamplit::render::{check_completeness, FrameUniform, TargetDesc};
use lamplit::{KeyCode, ModelId, PipelineStages, PostEffect, Viewer};

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

#[test]
fn holding_w_walks_toward_the_table() {
    let mut viewer = Viewer::new(PipelineStages::all());
    let w = KeyCode::W;

    viewer.key_event(w, true);
    for _ in 0..10 {
        viewer.update(0.1);
    }
    viewer.key_event(w, false);
    viewer.update(0.1);

    assert!(close(viewer.camera.position, Vec3::new(0.0, 1.0, 9.5)));
}

#[test]
fn strafing_and_looking_compose() {
    let mut viewer = Viewer::new(PipelineStages::all());
    viewer.mouse_moved(glam::Vec2::ZERO);
    viewer.mouse_moved(glam::Vec2::new(900.0, 0.0));
    // 900 units * 0.1 turns the camera from -Z to +X.
    assert!(close(viewer.camera.front(), Vec3::X));

    viewer.key_event(KeyCode::D, true);
    viewer.update(1.0);
    assert!(close(viewer.camera.position, Vec3::new(0.0, 1.0, 14.5)));
}

#[test]
fn dragging_past_the_window_edge_keeps_turning() {
    let mut viewer = Viewer::new(PipelineStages::all());
    viewer.mouse_moved(glam::Vec2::ZERO);
    for _ in 0..200 {
        viewer.mouse_moved(glam::Vec2::new(10.0, 0.0));
    }
    // 2000 units of rightward motion on an 800 px wide window.
    assert!(viewer.camera.yaw() > 90.0);
}

#[test]
fn frame_plan_drives_every_pipeline_input() {
    let mut viewer = Viewer::new(PipelineStages::all());
    viewer.key_event(KeyCode::E, true);
    let plan = viewer.plan_frame(1.25, 800.0 / 600.0);

    assert_eq!(plan.effect, Some(PostEffect::Grayscale));
    let fixtures = plan
        .draws
        .iter()
        .filter(|item| item.model == ModelId::LightBulb)
        .count();
    assert_eq!(fixtures, 3);
    assert_eq!(plan.draws.len(), 3 + 1 + 6 + 1);

    let uniform = FrameUniform::new(&plan);
    assert_eq!(bytemuck::bytes_of(&uniform).len() % 16, 0);
}

#[test]
fn direct_stages_skip_the_composite() {
    let mut viewer = Viewer::new(PipelineStages::direct());
    viewer.key_event(KeyCode::E, true);
    assert_eq!(viewer.plan_frame(0.0, 1.0).effect, None);
    assert_eq!(PipelineStages::direct().scene_samples(), 1);
}

#[test]
fn window_sized_offscreen_target_is_complete() {
    let samples = PipelineStages::all().scene_samples();
    let desc = TargetDesc::multisampled(800, 600, wgpu::TextureFormat::Bgra8UnormSrgb, samples);
    assert!(check_completeness(&desc).is_ok());
}
