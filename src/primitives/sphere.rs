use crate::{config::CsgSettings, ray::GeometryId, Hit, Intersect, Ray};
use glam::DVec3;
use std::f64::consts::PI;

#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Default for Sphere {
    fn default() -> Self {
        Self::new(DVec3::ZERO, 1.0)
    }
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Both roots of the ray/sphere quadratic, nearest first. None when the ray misses.
    fn roots(&self, ray: &Ray) -> Option<(f64, f64)> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;
        let discriminant = b * b - c;

        // Also rejects NaN
        if !(discriminant >= 0.0) {
            return None;
        }

        let root = discriminant.sqrt();
        Some((-b - root, -b + root))
    }

    fn hit(&self, ray: &Ray, t: f64) -> Hit {
        let point = ray.point_at_parameter(t);
        let normal = (point - self.center) / self.radius;
        let u = (PI + normal.z.atan2(normal.x)) / (2.0 * PI);
        let v = 1.0 - (PI / 2.0 + normal.y.clamp(-1.0, 1.0).asin()) / PI;

        Hit::new(ray, t, normal)
            .with_uv(u, v)
            .with_geometry(GeometryId::of(self))
    }
}

impl Intersect for Sphere {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        let (t_1, t_2) = self.roots(ray)?;

        // Starting inside the sphere only the far root is in front of us
        [t_1, t_2]
            .into_iter()
            .find(|&t| t > 0.0)
            .map(|t| self.hit(ray, t))
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        matches!(self.roots(ray), Some((_, t_2)) if t_2 > 0.0)
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        Some((p - self.center).length_squared() < self.radius * self.radius)
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        if let Some((t_1, t_2)) = self.roots(ray) {
            // A grazing ray touches the surface without ever being inside
            if t_2 - t_1 <= settings.epsilon {
                return;
            }
            hits.extend(
                [t_1, t_2]
                    .into_iter()
                    .filter(|&t| t > 0.0)
                    .map(|t| self.hit(ray, t)),
            );
        }
    }
}
