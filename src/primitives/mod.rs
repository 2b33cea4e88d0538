//! This module is full of primitives that all impl Intersect

mod csg;
mod cube;
mod implicit;
mod node;
mod plane;
mod sphere;

pub use csg::*;
pub use cube::*;
pub use implicit::*;
pub use node::*;
pub use plane::*;
pub use sphere::*;

use crate::{
    config::CsgSettings,
    ray::{Hit, Ray},
};
use glam::DVec3;

/// Computes whether a ray intersects a primitive
pub trait Intersect: Send + Sync {
    /// Computes the nearest intersection in front of the ray origin
    fn intersection(&self, ray: &Ray) -> Option<Hit>;

    /// Computes whether there is an intersection between the ray and the primitive.
    /// Could be cheaper than "intersection".
    fn has_intersection(&self, ray: &Ray) -> bool {
        self.intersection(ray).is_some()
    }

    /// Whether `p` lies inside the solid bounded by this geometry, when that can be told directly.
    /// `None` leaves CSG to infer it from the first crossing along the ray.
    fn contains(&self, _p: DVec3) -> Option<bool> {
        None
    }

    /// Appends every boundary crossing along the ray, nearest first, with outward normals.
    ///
    /// The default walks the surface by intersecting again just past each hit.
    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        let mut travelled = 0.0;

        for _ in 0..settings.max_events {
            let ahead = ray.advanced(travelled);
            match self.intersection(&ahead) {
                Some(mut hit) => {
                    hit.distance += travelled;
                    travelled = hit.distance + settings.epsilon;
                    hits.push(hit);
                }
                None => break,
            }
        }
    }
}

impl<T: Intersect + ?Sized> Intersect for Box<T> {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        (**self).intersection(ray)
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        (**self).has_intersection(ray)
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        (**self).contains(p)
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        (**self).intersections(ray, settings, hits)
    }
}

impl<T: Intersect + ?Sized> Intersect for std::sync::Arc<T> {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        (**self).intersection(ray)
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        (**self).has_intersection(ray)
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        (**self).contains(p)
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        (**self).intersections(ray, settings, hits)
    }
}
