//! Boolean combinations of two geometries, resolved along each ray.
//!
//! Both children report every boundary crossing along the ray. The two lists are merged by
//! distance and swept while tracking whether the ray is inside either child. Wherever the boolean
//! predicate changes value the ray crosses the boundary of the combined solid.

use crate::{config::CsgSettings, Hit, Intersect, Ray};
use glam::DVec3;
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt;

/// The predicate deciding whether a point is inside the combined solid
#[derive(Clone, Copy)]
pub enum CsgOp {
    /// Intersection, A and B
    And,
    /// Union, A or B
    Plus,
    /// Difference, A and not B
    Minus,
    Custom(fn(bool, bool) -> bool),
}

impl CsgOp {
    pub fn apply(self, in_a: bool, in_b: bool) -> bool {
        match self {
            CsgOp::And => in_a && in_b,
            CsgOp::Plus => in_a || in_b,
            CsgOp::Minus => in_a && !in_b,
            CsgOp::Custom(op) => op(in_a, in_b),
        }
    }
}

impl fmt::Debug for CsgOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsgOp::And => f.write_str("And"),
            CsgOp::Plus => f.write_str("Plus"),
            CsgOp::Minus => f.write_str("Minus"),
            CsgOp::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    A,
    B,
}

#[derive(Clone, Copy, Debug)]
struct Event {
    hit: Hit,
    side: Side,
}

/// Inside state of both children
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Inside {
    a: bool,
    b: bool,
}

impl Inside {
    fn toggle(&mut self, side: Side) {
        match side {
            Side::A => self.a = !self.a,
            Side::B => self.b = !self.b,
        }
    }

    fn get(self, side: Side) -> bool {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }
}

/// A CSG node. Owns both children exclusively.
pub struct Csg {
    op: CsgOp,
    left: Box<dyn Intersect>,
    right: Box<dyn Intersect>,
    settings: CsgSettings,
}

impl fmt::Debug for Csg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csg")
            .field("op", &self.op)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Csg {
    pub fn new(op: CsgOp, left: Box<dyn Intersect>, right: Box<dyn Intersect>) -> Self {
        Self {
            op,
            left,
            right,
            settings: CsgSettings::default(),
        }
    }

    pub fn and(left: impl Intersect + 'static, right: impl Intersect + 'static) -> Self {
        Self::new(CsgOp::And, Box::new(left), Box::new(right))
    }

    pub fn plus(left: impl Intersect + 'static, right: impl Intersect + 'static) -> Self {
        Self::new(CsgOp::Plus, Box::new(left), Box::new(right))
    }

    pub fn minus(left: impl Intersect + 'static, right: impl Intersect + 'static) -> Self {
        Self::new(CsgOp::Minus, Box::new(left), Box::new(right))
    }

    pub fn with_settings(mut self, settings: CsgSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Every crossing of the combined boundary along the ray, nearest first, with outward normals
    /// and whether the crossing enters the solid.
    ///
    /// `settings` only governs how the children are walked; merging uses this node's own epsilon.
    fn transitions(&self, ray: &Ray, settings: &CsgSettings) -> Vec<(Hit, bool)> {
        let mut out = Vec::new();
        let mut a = Vec::new();
        let mut b = Vec::new();
        self.left.intersections(ray, settings, &mut a);
        self.right.intersections(ray, settings, &mut b);

        // Failing a direct answer, a child whose first crossing leaves it had the ray origin inside
        let starts_inside = |child: &dyn Intersect, hits: &[Hit]| {
            child
                .contains(ray.origin)
                .unwrap_or_else(|| hits.first().map_or(false, |hit| !hit.is_entering()))
        };
        let mut inside = Inside {
            a: starts_inside(&*self.left, &a[..]),
            b: starts_inside(&*self.right, &b[..]),
        };

        let events = a
            .into_iter()
            .map(|hit| Event { hit, side: Side::A })
            .merge_by(b.into_iter().map(|hit| Event { hit, side: Side::B }), |x, y| {
                x.hit.distance <= y.hit.distance
            });

        let epsilon = self.settings.epsilon;
        let mut events = events.peekable();

        while let Some(first) = events.next() {
            // Events this close together are crossed as one
            let mut cluster: SmallVec<[Event; 4]> = SmallVec::new();
            cluster.push(first);
            while let Some(next) = events.next_if(|e| e.hit.distance - first.hit.distance <= epsilon) {
                cluster.push(next);
            }

            let before = self.op.apply(inside.a, inside.b);
            let mut representative = None;
            for event in &cluster {
                let was = self.op.apply(inside.a, inside.b);
                inside.toggle(event.side);
                if representative.is_none() && self.op.apply(inside.a, inside.b) != was {
                    representative = Some((*event, inside.get(event.side)));
                }
            }
            let after = self.op.apply(inside.a, inside.b);

            if before == after {
                continue;
            }
            let Some((event, entering_child)) = representative else {
                continue;
            };

            let mut hit = event.hit;
            if entering_child != after {
                hit.normal = -hit.normal;
            }
            out.push((hit, after));
        }

        out
    }
}

impl Intersect for Csg {
    /// The first crossing of the combined boundary. From inside the solid this is where the ray
    /// leaves it, with the normal pointing out along the ray as for a sphere's far side.
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        self.transitions(ray, &self.settings)
            .into_iter()
            .map(|(hit, _)| hit)
            .find(|hit| hit.distance > 0.0)
    }

    fn contains(&self, p: DVec3) -> Option<bool> {
        Some(self.op.apply(self.left.contains(p)?, self.right.contains(p)?))
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        hits.extend(
            self.transitions(ray, settings)
                .into_iter()
                .map(|(hit, _)| hit),
        );
    }
}
