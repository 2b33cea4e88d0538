use approx::assert_relative_eq;
use glam::{dvec3, DVec3};
use rand::prelude::*;
use raygeom::{DefaultRng, Intersect, Ray, Scene};

static CSG_SCENE: &str = include_str!("../scenes/csg.toml");
static IMPLICIT_SCENE: &str = include_str!("../scenes/implicit.toml");

fn camera_rays(scene: &Scene, count: usize) -> Vec<Ray> {
    let settings = scene.settings();
    let mut rng = DefaultRng::seed_from_u64(settings.seed);
    let origin = settings.camera.position;

    (0..count)
        .map(|_| {
            let target = settings.camera.target
                + dvec3(
                    rng.gen_range(-4.0, 4.0),
                    rng.gen_range(-2.0, 2.0),
                    rng.gen_range(-2.0, 2.0),
                );
            Ray::new(origin, target - origin)
        })
        .collect()
}

#[test]
fn shipped_scenes_load() {
    let csg = Scene::from_toml_str(CSG_SCENE).unwrap();
    assert_eq!(csg.nodes().len(), 3);
    assert_eq!(csg.settings().width, 96);

    let implicit = Scene::from_toml_str(IMPLICIT_SCENE).unwrap();
    assert_eq!(implicit.nodes().len(), 4);
}

#[test]
fn batch_matches_one_by_one() {
    for source in [CSG_SCENE, IMPLICIT_SCENE] {
        let scene = Scene::from_toml_str(source).unwrap();
        let rays = camera_rays(&scene, 400);

        let batch = scene.intersect_batch(&rays);
        assert_eq!(batch.len(), rays.len());
        for (ray, hit) in rays.iter().zip(&batch) {
            assert_eq!(*hit, scene.intersection(ray));
            if let Some(hit) = hit {
                assert!(hit.distance > 0.0);
                assert!(hit.shader.is_some());
            }
        }
        // Most of the view is floor
        assert!(batch.iter().filter(|hit| hit.is_some()).count() > rays.len() / 2);
    }
}

#[test]
fn nearest_hit_is_the_smallest_over_nodes() {
    let scene = Scene::from_toml_str(CSG_SCENE).unwrap();
    for ray in camera_rays(&scene, 400) {
        let nearest = scene
            .nodes()
            .iter()
            .filter_map(|node| node.intersection(&ray))
            .map(|hit| hit.distance)
            .reduce(f64::min);
        assert_eq!(scene.intersection(&ray).map(|hit| hit.distance), nearest);
    }
}

#[test]
fn lens_spins_and_comes_back() {
    let mut scene = Scene::from_toml_str(CSG_SCENE).unwrap();
    let start = scene.node("lens").unwrap().transform;

    for frame in 1..=12 {
        scene.begin_frame(frame);
    }
    // Half a turn about Y mirrors x and z around the node's position
    let half = scene.node("lens").unwrap().transform;
    let local = dvec3(1.0, 0.5, 0.25);
    assert!(half
        .point(local)
        .abs_diff_eq(start.point(dvec3(-1.0, 0.5, -0.25)), 1e-9));

    for frame in 13..=25 {
        scene.begin_frame(frame);
    }
    let end = scene.node("lens").unwrap().transform;
    assert!(end.point(local).abs_diff_eq(start.point(local), 1e-9));
}

#[test]
fn floor_is_hit_straight_down() {
    let scene = Scene::from_toml_str(IMPLICIT_SCENE).unwrap();
    let hit = scene
        .intersection(&Ray::new(dvec3(0.0, 10.0, -4.0), -DVec3::Y))
        .unwrap();
    assert_relative_eq!(hit.distance, 11.5, epsilon = 1e-12);
    assert_eq!(scene.shader_name(hit.shader.unwrap()), Some("grey"));
}

#[test]
fn implicit_node_is_placed_by_its_transform() {
    let scene = Scene::from_toml_str(IMPLICIT_SCENE).unwrap();
    let blob = scene.node("blob").unwrap();
    // Down the blob's own vertical axis x*y*z vanishes, leaving the unit sphere
    let hit = blob
        .intersection(&Ray::new(dvec3(-3.2, 5.0, 0.0), -DVec3::Y))
        .unwrap();
    assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-4);
    assert_eq!(scene.shader_name(hit.shader.unwrap()), Some("red"));
}
