use crate::{primitives::Node, transform::Transform};
use glam::DVec3;

/// Moves a node a little every frame, then snaps it back and starts over.
///
/// A cycle is `duration` frames of increments followed by one reset frame. After the last of
/// `repetitions` cycles the node stays where it is; zero repetitions loops forever.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    node: usize,
    start: i64,
    duration: u32,
    repetitions: u32,
    increment: Transform,
    reset: Transform,
}

impl Animation {
    /// `translate`, `rotate` (degrees) and `scale` are the change over one whole cycle.
    /// A scale with any zero component leaves the size alone.
    pub fn new(
        node: usize,
        start: i64,
        duration: u32,
        repetitions: u32,
        translate: DVec3,
        rotate: DVec3,
        scale: DVec3,
    ) -> Self {
        let duration = duration.max(1);
        let frames = f64::from(duration);

        let mut increment = Transform::new();
        if scale.cmpne(DVec3::ZERO).all() {
            let e = frames.recip();
            increment.scale(scale.x.powf(e), scale.y.powf(e), scale.z.powf(e));
        }
        let r = rotate / frames;
        increment.rotate(r.x, r.y, r.z);
        increment.translate(translate / frames);

        let mut cycle = Transform::new();
        for _ in 0..duration {
            cycle.then(&increment);
        }

        Self {
            node,
            start,
            duration,
            repetitions,
            increment,
            reset: cycle.inverted(),
        }
    }

    /// Index of the animated node in its scene
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn apply(&self, frame: i64, node: &mut Node) {
        let elapsed = frame - self.start;
        let period = i64::from(self.duration) + 1;

        if elapsed <= 0 || (self.repetitions > 0 && elapsed > period * i64::from(self.repetitions)) {
            return;
        }

        if elapsed % period == 0 {
            node.transform.then(&self.reset);
            log::info!(
                "animation of {} reset at frame {}",
                node.name.as_deref().unwrap_or("unnamed node"),
                frame
            );
        } else {
            node.transform.then(&self.increment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{primitives::Sphere, ray::Ray, Intersect};
    use glam::dvec3;
    use std::sync::Arc;

    fn node() -> Node {
        Node::new(Arc::new(Sphere::default()), None, Transform::new())
    }

    #[test]
    fn moves_then_resets() {
        let anim = Animation::new(0, 0, 4, 0, dvec3(4.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO);
        let mut node = node();

        for frame in 1..=4 {
            anim.apply(frame, &mut node);
            assert!(node
                .transform
                .point(DVec3::ZERO)
                .abs_diff_eq(dvec3(frame as f64, 0.0, 0.0), 1e-12));
        }

        anim.apply(5, &mut node);
        assert!(node.transform.point(DVec3::ZERO).abs_diff_eq(DVec3::ZERO, 1e-12));

        // The next cycle starts over
        anim.apply(6, &mut node);
        assert!(node
            .transform
            .point(DVec3::ZERO)
            .abs_diff_eq(dvec3(1.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn waits_for_the_start_frame() {
        let anim = Animation::new(0, 10, 2, 0, DVec3::X, DVec3::ZERO, DVec3::ZERO);
        let mut node = node();
        for frame in 0..=10 {
            anim.apply(frame, &mut node);
        }
        assert_eq!(node.transform, Transform::new());
    }

    #[test]
    fn stops_after_the_last_repetition() {
        let anim = Animation::new(0, 0, 2, 1, dvec3(2.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO);
        let mut node = node();
        for frame in 1..=10 {
            anim.apply(frame, &mut node);
        }
        // Two increments and the reset, then nothing
        assert!(node.transform.point(DVec3::ZERO).abs_diff_eq(DVec3::ZERO, 1e-12));
    }

    #[test]
    fn full_cycle_of_scale_and_rotation_returns_home() {
        let anim = Animation::new(
            0,
            0,
            3,
            0,
            dvec3(0.0, 3.0, 0.0),
            dvec3(90.0, 30.0, 0.0),
            dvec3(8.0, 8.0, 8.0),
        );
        let mut node = node();

        for frame in 1..=3 {
            anim.apply(frame, &mut node);
        }
        // Scaled by 8 and lifted by 3, the unit sphere's top is now at y = 11
        let hit = node
            .intersection(&Ray::new(dvec3(0.0, 20.0, 0.0), -DVec3::Y))
            .unwrap();
        assert!((hit.point.y - 11.0).abs() < 1e-9);

        anim.apply(4, &mut node);
        let p = dvec3(0.3, -0.2, 0.7);
        assert!(node.transform.point(p).abs_diff_eq(p, 1e-9));
    }
}
