use crate::{config::CsgSettings, ray::GeometryId, Hit, Intersect, Ray};
use glam::{dvec3, DVec3};

/// Directions closer than this to horizontal count as parallel to the plane
const PARALLEL_EPSILON: f64 = 1e-12;

/// A horizontal plane at height `y`, cut off at `limit` units from the Y axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub y: f64,
    pub limit: f64,
}

impl Default for Plane {
    fn default() -> Self {
        Self { y: 0.0, limit: 1e99 }
    }
}

impl Plane {
    pub fn new(y: f64, limit: f64) -> Self {
        Self { y, limit }
    }

    // Intersection with the up facing normal, the outward normal of the half space below
    fn crossing(&self, ray: &Ray) -> Option<Hit> {
        if ray.direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.y - ray.origin.y) / ray.direction.y;
        if !(t > 0.0) {
            return None;
        }

        let point = ray.point_at_parameter(t);
        if point.x.hypot(point.z) > self.limit {
            return None;
        }

        Some(
            Hit::new(ray, t, DVec3::Y)
                .with_uv(point.x, point.z)
                .with_geometry(GeometryId::of(self)),
        )
    }
}

impl Intersect for Plane {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        self.crossing(ray).map(|mut hit| {
            if ray.direction.y > 0.0 {
                hit.normal = dvec3(0.0, -1.0, 0.0);
            }
            hit
        })
    }

    /// Everything below the plane and within `limit` of the Y axis
    fn contains(&self, p: DVec3) -> Option<bool> {
        Some(p.y < self.y && p.x.hypot(p.z) <= self.limit)
    }

    fn intersections(&self, ray: &Ray, _settings: &CsgSettings, hits: &mut Vec<Hit>) {
        hits.extend(self.crossing(ray));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_from_above_and_below() {
        let plane = Plane::new(1.0, 10.0);

        let down = plane
            .intersection(&Ray::new(dvec3(0.0, 5.0, 0.0), -DVec3::Y))
            .unwrap();
        assert!((down.distance - 4.0).abs() < 1e-12);
        assert_eq!(down.normal, DVec3::Y);

        let up = plane
            .intersection(&Ray::new(dvec3(0.0, -1.0, 0.0), DVec3::Y))
            .unwrap();
        assert!((up.distance - 2.0).abs() < 1e-12);
        assert_eq!(up.normal, -DVec3::Y);
    }

    #[test]
    fn parallel_rays_never_hit() {
        let plane = Plane::default();
        for height in [-1.0, 0.0, 1.0] {
            let ray = Ray::new(dvec3(0.0, height, 0.0), dvec3(1.0, 0.0, 1.0));
            assert!(plane.intersection(&ray).is_none());
        }
    }

    #[test]
    fn limit_is_radial() {
        let plane = Plane::new(0.0, 2.0);
        // Inside the square |x|, |z| <= 2 but outside the circle of radius 2
        let corner = Ray::new(dvec3(1.9, 1.0, 1.9), -DVec3::Y);
        assert!(plane.intersection(&corner).is_none());

        let inside = Ray::new(dvec3(1.0, 1.0, 1.0), -DVec3::Y);
        let hit = plane.intersection(&inside).unwrap();
        assert_eq!((hit.u, hit.v), (1.0, 1.0));
    }

    #[test]
    fn bounds_the_space_below() {
        let plane = Plane::new(1.0, 2.0);
        assert_eq!(plane.contains(dvec3(0.0, 0.5, 0.0)), Some(true));
        assert_eq!(plane.contains(dvec3(0.0, 1.5, 0.0)), Some(false));
        assert_eq!(plane.contains(dvec3(3.0, -5.0, 0.0)), Some(false));
    }

    #[test]
    fn behind_the_origin_misses() {
        let plane = Plane::default();
        assert!(plane
            .intersection(&Ray::new(dvec3(0.0, 1.0, 0.0), DVec3::Y))
            .is_none());
    }
}
