use crate::{config::CsgSettings, ray::GeometryId, Hit, Intersect, Ray};
use glam::DVec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    // The two axes spanning a face perpendicular to self
    fn face_axes(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (0, 2),
            Axis::Z => (0, 1),
        }
    }
}

/// Where a ray enters and leaves the slabs, and through which faces
#[derive(Clone, Copy, Debug)]
struct Span {
    t_min: f64,
    enter: Axis,
    t_max: f64,
    exit: Axis,
}

/// An axis aligned cube
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    center: DVec3,
    half_side: f64,
}

impl Default for Cube {
    fn default() -> Self {
        Self::new(DVec3::ZERO, 0.5)
    }
}

impl Cube {
    pub fn new(center: DVec3, half_side: f64) -> Self {
        Self { center, half_side }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn half_side(&self) -> f64 {
        self.half_side
    }

    // Slab test after tavianator.com, keeping track of which axis bounds the interval
    fn span(&self, ray: &Ray) -> Option<Span> {
        let min = self.center - DVec3::splat(self.half_side);
        let max = self.center + DVec3::splat(self.half_side);
        let t1 = (min - ray.origin) * ray.inv_direction;
        let t2 = (max - ray.origin) * ray.inv_direction;

        let mut span = Span {
            t_min: f64::NEG_INFINITY,
            enter: Axis::X,
            t_max: f64::INFINITY,
            exit: Axis::X,
        };

        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let i = axis.index();
            // A flat slab seen edge on gives NaN
            let (near, far) = (t1[i].min(t2[i]), t1[i].max(t2[i]));
            if near.is_nan() || far.is_nan() {
                return None;
            }
            if near > span.t_min {
                span.t_min = near;
                span.enter = axis;
            }
            if far < span.t_max {
                span.t_max = far;
                span.exit = axis;
            }
        }

        if span.t_max >= span.t_min.max(0.0) {
            Some(span)
        } else {
            None
        }
    }

    fn hit(&self, ray: &Ray, t: f64, axis: Axis, entering: bool) -> Hit {
        let i = axis.index();
        // Outward normal of the face: against the ray on entry, along it on exit
        let sign = if entering {
            -ray.direction[i].signum()
        } else {
            ray.direction[i].signum()
        };
        let point = ray.point_at_parameter(t);
        let local = point - self.center;
        let (a, b) = axis.face_axes();

        Hit::new(ray, t, axis.unit() * sign)
            .with_uv(local[a], local[b])
            .with_geometry(GeometryId::of(self))
    }
}

impl Intersect for Cube {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        let span = self.span(ray)?;

        if span.t_min > 0.0 {
            Some(self.hit(ray, span.t_min, span.enter, true))
        } else if span.t_max > 0.0 {
            Some(self.hit(ray, span.t_max, span.exit, false))
        } else {
            None
        }
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        matches!(self.span(ray), Some(span) if span.t_max > 0.0)
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        Some((p - self.center).abs().max_element() < self.half_side)
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        if let Some(span) = self.span(ray) {
            // Running along an edge or face
            if span.t_max - span.t_min <= settings.epsilon {
                return;
            }
            if span.t_min > 0.0 {
                hits.push(self.hit(ray, span.t_min, span.enter, true));
            }
            if span.t_max > 0.0 {
                hits.push(self.hit(ray, span.t_max, span.exit, false));
            }
        }
    }
}
