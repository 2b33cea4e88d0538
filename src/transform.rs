use glam::{DMat3, DVec3, EulerRot};

/// An affine transform kept as a linear part plus an offset, with the inverse cached.
///
/// Points map as `linear * p + offset`. Further operations are applied after the existing ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    linear: DMat3,
    inverse: DMat3,
    pub offset: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            linear: DMat3::IDENTITY,
            inverse: DMat3::IDENTITY,
            offset: DVec3::ZERO,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, v: DVec3) {
        self.offset += v;
    }

    /// Scales along the world axes. A zero factor would make the transform singular and is ignored.
    pub fn scale(&mut self, x: f64, y: f64, z: f64) {
        let s = DVec3::new(x, y, z);
        if s.cmpeq(DVec3::ZERO).any() {
            return;
        }
        self.then_linear(DMat3::from_diagonal(s), DMat3::from_diagonal(s.recip()));
    }

    /// Rotates by yaw (around Y), pitch (around X) and roll (around Z), all in degrees.
    pub fn rotate(&mut self, yaw: f64, pitch: f64, roll: f64) {
        let rotation = DMat3::from_euler(
            EulerRot::YXZ,
            yaw.to_radians(),
            pitch.to_radians(),
            roll.to_radians(),
        );
        self.then_linear(rotation, rotation.transpose());
    }

    /// Applies `other` after `self`: linear parts multiply, offsets add.
    pub fn then(&mut self, other: &Transform) {
        self.then_linear(other.linear, other.inverse);
        self.offset += other.offset;
    }

    /// The transform that undoes this one when applied after it with `then`.
    pub fn inverted(&self) -> Self {
        Self {
            linear: self.inverse,
            inverse: self.linear,
            offset: -self.offset,
        }
    }

    fn then_linear(&mut self, m: DMat3, m_inverse: DMat3) {
        self.linear = m * self.linear;
        self.inverse = self.inverse * m_inverse;
    }

    pub fn point(&self, p: DVec3) -> DVec3 {
        self.linear * p + self.offset
    }

    pub fn undo_point(&self, p: DVec3) -> DVec3 {
        self.inverse * (p - self.offset)
    }

    pub fn direction(&self, d: DVec3) -> DVec3 {
        self.linear * d
    }

    pub fn undo_direction(&self, d: DVec3) -> DVec3 {
        self.inverse * d
    }

    /// Maps a local space normal to world space. The result is not normalized.
    pub fn normal(&self, n: DVec3) -> DVec3 {
        self.inverse.transpose() * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn undo_reverses_point() {
        let mut t = Transform::new();
        t.scale(2.0, 3.0, 4.0);
        t.rotate(30.0, 45.0, 60.0);
        t.translate(dvec3(1.0, -2.0, 5.0));

        let p = dvec3(0.3, -0.7, 1.1);
        assert!(t.undo_point(t.point(p)).abs_diff_eq(p, 1e-12));
        assert!(t.undo_direction(t.direction(p)).abs_diff_eq(p, 1e-12));
    }

    #[test]
    fn yaw_turns_x_towards_minus_z() {
        let mut t = Transform::new();
        t.rotate(90.0, 0.0, 0.0);
        assert!(t.direction(DVec3::X).abs_diff_eq(dvec3(0.0, 0.0, -1.0), 1e-12));
    }

    #[test]
    fn normals_stay_perpendicular_under_scale() {
        let mut t = Transform::new();
        t.scale(1.0, 4.0, 1.0);

        let tangent = dvec3(1.0, 1.0, 0.0);
        let normal = dvec3(1.0, -1.0, 0.0);
        assert!(t.direction(tangent).dot(t.normal(normal)).abs() < 1e-12);
    }

    #[test]
    fn zero_scale_is_ignored() {
        let mut t = Transform::new();
        t.scale(0.0, 2.0, 2.0);
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn composition_adds_offsets() {
        let mut step = Transform::new();
        step.translate(dvec3(1.0, 0.0, 0.0));
        let mut t = Transform::new();
        t.then(&step);
        t.then(&step);
        assert_eq!(t.point(DVec3::ZERO), dvec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn inverted_undoes_a_step() {
        let mut step = Transform::new();
        step.scale(2.0, 1.0, 0.5);
        step.rotate(10.0, 20.0, 30.0);
        step.translate(dvec3(0.0, 1.0, 0.0));

        let mut t = Transform::new();
        t.translate(dvec3(3.0, 0.0, 0.0));
        let before = t;
        t.then(&step);
        t.then(&step.inverted());

        let p = dvec3(1.0, 2.0, 3.0);
        assert!(t.point(p).abs_diff_eq(before.point(p), 1e-12));
        assert!(t.undo_point(p).abs_diff_eq(before.undo_point(p), 1e-12));
    }
}
