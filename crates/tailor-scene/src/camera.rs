//! Camera, lights, and orbit input

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::convert;
use crate::session::CustomizerSession;

/// Marker component for the main camera
#[derive(Component)]
pub struct CustomizerCamera;

/// Marker component for the key light
#[derive(Component)]
pub struct KeyLight;

/// Brightness of the ambient term for an intensity of 1.0
const AMBIENT_BRIGHTNESS: f32 = 500.0;
/// Illuminance of the key light for an intensity of 1.0
const KEY_LIGHT_LUX: f32 = 10_000.0;
/// Pixels of trackpad scroll per dolly step
const PIXELS_PER_STEP: f32 = 100.0;

/// Spawn the camera and lights described by the host
pub fn spawn_camera_and_lights(mut commands: Commands, session: Res<CustomizerSession>) {
    let Some(host) = session.host() else {
        return;
    };
    let camera = host.camera();
    let lighting = host.lighting();

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_y_degrees.to_radians(),
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        camera_transform(camera),
        CustomizerCamera,
    ));

    commands.insert_resource(ClearColor(convert::color(lighting.background)));
    commands.insert_resource(AmbientLight {
        color: convert::color(lighting.ambient.color),
        brightness: lighting.ambient.intensity * AMBIENT_BRIGHTNESS,
        ..default()
    });

    let position = Vec3::from_array(lighting.directional.position.to_array());
    commands.spawn((
        DirectionalLight {
            color: convert::color(lighting.directional.color),
            illuminance: lighting.directional.intensity * KEY_LIGHT_LUX,
            ..default()
        },
        Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));
}

fn camera_transform(camera: &tailor_core::camera::PerspectiveCamera) -> Transform {
    let position = Vec3::from_array(camera.position.to_array());
    let target = Vec3::from_array(camera.target.to_array());
    let transform = Transform::from_translation(position);
    if position.distance_squared(target) > f32::EPSILON {
        transform.looking_at(target, Vec3::Y)
    } else {
        transform
    }
}

/// Copy the host camera onto the Bevy camera
pub fn sync_camera(
    session: Res<CustomizerSession>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<CustomizerCamera>>,
) {
    let Some(host) = session.host().filter(|h| h.is_active()) else {
        return;
    };
    let camera = host.camera();
    let Ok((mut transform, mut projection)) = cameras.single_mut() else {
        return;
    };

    let next = camera_transform(camera);
    if *transform != next {
        *transform = next;
    }
    if let Projection::Perspective(perspective) = projection.as_mut() {
        let fov = camera.fov_y_degrees.to_radians();
        if perspective.fov != fov || perspective.near != camera.near || perspective.far != camera.far {
            perspective.fov = fov;
            perspective.near = camera.near;
            perspective.far = camera.far;
        }
    }
}

/// Drive the orbit controller from mouse and touch, unless the pointer is
/// over the UI
pub fn forward_orbit_input(
    mut session: ResMut<CustomizerSession>,
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    scroll: Res<AccumulatedMouseScroll>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
) {
    let ui_wants_pointer = contexts.ctx_mut().map(|ctx| ctx.wants_pointer_input()).unwrap_or(false);
    if ui_wants_pointer {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let viewport_height = window.height();

    let Some(host) = session.host_mut() else {
        return;
    };
    let Some((orbit, camera)) = host.orbit_mut() else {
        return;
    };

    let delta = motion.delta;
    if buttons.pressed(MouseButton::Left) {
        orbit.rotate(delta, viewport_height);
    } else if buttons.pressed(MouseButton::Right) || buttons.pressed(MouseButton::Middle) {
        orbit.pan(delta, camera, viewport_height);
    }

    if scroll.delta.y != 0.0 {
        let steps = match scroll.unit {
            MouseScrollUnit::Line => scroll.delta.y,
            MouseScrollUnit::Pixel => scroll.delta.y / PIXELS_PER_STEP,
        };
        orbit.dolly(steps);
    }

    let active: Vec<_> = touches.iter().collect();
    match active.as_slice() {
        [touch] => orbit.rotate(touch.delta(), viewport_height),
        [a, b] => {
            let current = a.position().distance(b.position());
            let previous = (a.position() - a.delta()).distance(b.position() - b.delta());
            if current > 1.0 && previous > 1.0 {
                // Spreading the fingers moves toward the target
                orbit.dolly((current / previous).ln() / (1.0f32 / 0.95).ln());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use tailor_core::config::CameraDirective;
    use tailor_core::host::HeadlessSurface;
    use tailor_core::{Customizer, CustomizerSettings};

    fn world() -> World {
        let mut world = World::new();
        let session = Customizer::mount(
            CustomizerSettings::default(),
            &HeadlessSurface { width: 640, height: 480 },
        );
        world.insert_resource(CustomizerSession(session));
        world.spawn((
            Transform::default(),
            Projection::Perspective(PerspectiveProjection::default()),
            CustomizerCamera,
        ));
        world
    }

    fn camera(world: &mut World) -> (Transform, Projection) {
        let mut query = world.query_filtered::<(&Transform, &Projection), With<CustomizerCamera>>();
        let (transform, projection) = query.single(world).unwrap();
        (*transform, projection.clone())
    }

    #[test]
    fn test_sync_copies_host_camera() {
        let mut world = world();
        world.run_system_once(sync_camera).unwrap();

        let (transform, projection) = camera(&mut world);
        assert!(transform.translation.abs_diff_eq(Vec3::splat(5.0), 1e-5));
        assert!(transform.forward().abs_diff_eq(Vec3::splat(-1.0).normalize(), 1e-5));
        let Projection::Perspective(perspective) = projection else {
            panic!("expected a perspective projection");
        };
        assert!((perspective.fov - 45f32.to_radians()).abs() < 1e-6);
        assert_eq!(perspective.near, 0.1);
        assert_eq!(perspective.far, 1000.0);
    }

    #[test]
    fn test_sync_follows_preset_transition() {
        let mut world = world();
        {
            let mut session = world.resource_mut::<CustomizerSession>();
            session.store_mut().set_camera_directive(CameraDirective::Front);
            for _ in 0..40 {
                session.tick(1.0 / 60.0);
            }
        }
        world.run_system_once(sync_camera).unwrap();

        let (transform, _) = camera(&mut world);
        assert!(transform.translation.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), 1e-4));
        assert!(transform.forward().abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }
}
