use approx::assert_relative_eq;
use glam::{dvec3, DVec3};
use rand::prelude::*;
use rand_distr::UnitSphere;
use raygeom::{
    expr::{to_rpn, Expression},
    primitives::{Cube, ImplicitSurface, Sphere},
    DefaultRng, ExprError, Intersect, Ray,
};
use rayon::prelude::*;
use std::sync::Arc;

// Rays from a shell around the origin aimed well inside the unit sphere
fn rays_at_unit_sphere(seed: u64, count: usize) -> Vec<Ray> {
    let mut rng = DefaultRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let from: [f64; 3] = UnitSphere.sample(&mut rng);
            let to: [f64; 3] = UnitSphere.sample(&mut rng);
            let origin = DVec3::from(from) * rng.gen_range(1.5, 5.0);
            let target = DVec3::from(to) * rng.gen_range(0.0, 0.7);
            Ray::new(origin, target - origin)
        })
        .collect()
}

// Axis aligned rays through the unit sphere at random offsets. Steps are sized per axis, so along
// an axis each one is a Newton step and cannot jump over the sphere.
fn axis_rays_at_unit_sphere(seed: u64, count: usize) -> Vec<Ray> {
    let mut rng = DefaultRng::seed_from_u64(seed);
    let axes = [DVec3::X, DVec3::Y, DVec3::Z, -DVec3::X, -DVec3::Y, -DVec3::Z];
    (0..count)
        .map(|i| {
            let axis = axes[i % axes.len()];
            let offset = dvec3(
                rng.gen_range(-0.6, 0.6),
                rng.gen_range(-0.6, 0.6),
                rng.gen_range(-0.6, 0.6),
            );
            // Drop the component along the axis and back off to a random distance
            let offset = offset - axis * offset.dot(axis);
            Ray::new(offset - axis * rng.gen_range(1.5, 5.0), axis)
        })
        .collect()
}

#[test]
fn marching_agrees_with_the_analytic_sphere() {
    let surface = ImplicitSurface::from_expression("x*x + y*y + z*z - 1").unwrap();
    let sphere = Sphere::default();

    for ray in axis_rays_at_unit_sphere(20, 600) {
        let exact = sphere.intersection(&ray).unwrap();
        let marched = surface.intersection(&ray).unwrap();

        assert_relative_eq!(marched.distance, exact.distance, epsilon = 1e-4);
        assert!(marched.normal.abs_diff_eq(exact.normal, 1e-3));
        assert!(marched.distance > 0.0);
    }
}

#[test]
fn shifted_formula_moves_the_surface() {
    let surface = ImplicitSurface::from_expression("(x-2)^2 + (y+1)^2 + z^2 - 0.25").unwrap();
    let hit = surface
        .intersection(&Ray::new(dvec3(2.0, -1.0, -5.0), DVec3::Z))
        .unwrap();
    assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-4);
    assert!(hit.normal.abs_diff_eq(-DVec3::Z, 1e-3));
}

#[test]
fn boundary_does_not_change_hits() {
    let torus = "(x^2 + y^2 + z^2 + 0.75 - 0.09)^2 - 3*(x^2 + z^2)";
    let free = ImplicitSurface::from_expression(torus).unwrap();
    let bounded = ImplicitSurface::from_expression(torus)
        .unwrap()
        .with_boundary(Arc::new(Cube::new(DVec3::ZERO, 1.5)));

    let mut rng = DefaultRng::seed_from_u64(21);
    for _ in 0..300 {
        let origin = dvec3(rng.gen_range(-3.0, 3.0), 4.0, rng.gen_range(-3.0, 3.0));
        let ray = Ray::new(origin, -DVec3::Y);

        let a = free.intersection(&ray).map(|hit| hit.distance);
        let b = bounded.intersection(&ray).map(|hit| hit.distance);
        assert_eq!(a, b);
    }
}

#[test]
fn concurrent_marching() {
    let surface = ImplicitSurface::new(|x: f64, y: f64, z: f64| {
        x * x + y * y + z * z - 1.0 + 0.3 * x * y * z
    });
    let rays = rays_at_unit_sphere(22, 1000);

    let sequential: Vec<_> = rays.iter().map(|ray| surface.intersection(ray)).collect();
    let parallel: Vec<_> = rays.par_iter().map(|ray| surface.intersection(ray)).collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn expression_semantics() {
    let eval = |text: &str| Expression::compile(text).unwrap().eval(0.0, 0.0, 0.0);

    assert_relative_eq!(eval("2+3*4"), 14.0);
    assert_relative_eq!(eval("(2+3)*4"), 20.0);
    // Powers group from the left
    assert_relative_eq!(eval("2^3^2"), 64.0);
    assert_relative_eq!(eval("10-4-3"), 3.0);
    assert_relative_eq!(eval("1.5*2"), 3.0);
    assert!(eval("1/0").is_infinite());

    let field = Expression::compile("x*y - z").unwrap();
    assert_relative_eq!(field.eval(2.0, 3.0, 1.0), 5.0);
    assert_eq!(field.to_string(), "x y * z -");
    assert_eq!(to_rpn("x*y - z").unwrap().len(), 5);
}

#[test]
fn malformed_expressions_are_rejected() {
    for text in ["", "2+", "(x", "x)", "2x", "-1", "x % 2", "1.2.3", "()"] {
        assert!(Expression::compile(text).is_err(), "{:?} should not compile", text);
    }
    assert!(matches!(
        Expression::compile("x $ y"),
        Err(ExprError::UnexpectedCharacter { ch: '$', offset: 2 })
    ));
    assert!(ImplicitSurface::from_expression("x^").is_err());
}
