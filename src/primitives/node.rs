use crate::{
    config::CsgSettings,
    ray::ShaderId,
    transform::Transform,
    Hit, Intersect, Ray,
};
use glam::DVec3;
use std::{fmt, sync::Arc};

/// A renderable object: shared geometry placed in the world by a transform, with a shader.
#[derive(Clone)]
pub struct Node {
    pub name: Option<String>,
    pub geometry: Arc<dyn Intersect>,
    pub shader: Option<ShaderId>,
    pub transform: Transform,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("shader", &self.shader)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl Node {
    pub fn new(geometry: Arc<dyn Intersect>, shader: Option<ShaderId>, transform: Transform) -> Self {
        Self {
            name: None,
            geometry,
            shader,
            transform,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn local_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform.undo_point(ray.origin),
            self.transform.undo_direction(ray.direction),
        )
    }

    fn to_world(&self, ray: &Ray, mut hit: Hit) -> Hit {
        hit.point = self.transform.point(hit.point);
        hit.normal = self.transform.normal(hit.normal).normalize_or_zero();
        hit.distance = (hit.point - ray.origin).length();
        hit.ray_dir = ray.direction;
        hit.shader = self.shader;
        hit
    }
}

impl Intersect for Node {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        let local = self.local_ray(ray);
        self.geometry
            .intersection(&local)
            .map(|hit| self.to_world(ray, hit))
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        self.geometry.has_intersection(&self.local_ray(ray))
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        self.geometry.contains(self.transform.undo_point(p))
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        let start = hits.len();
        self.geometry
            .intersections(&self.local_ray(ray), settings, hits);
        for hit in &mut hits[start..] {
            *hit = self.to_world(ray, *hit);
        }
    }
}
