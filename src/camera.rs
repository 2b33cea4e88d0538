use glam::DVec3;
use rand_distr::{Distribution, UnitDisc};
use raygeom::{config::CameraSettings, DefaultRng, Ray};

#[derive(Debug)]
pub struct Camera {
    origin: DVec3,
    lower_left_corner: DVec3,
    horizontal: DVec3,
    vertical: DVec3,
    u: DVec3,
    v: DVec3,
    lens_radius: f64,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect: f64) -> Self {
        let origin = settings.position;
        let lens_radius = settings.aperture / 2.0;
        let focus_dist = (origin - settings.target).length();
        let half_height = (settings.fov.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;
        let w = (origin - settings.target).normalize_or_zero();
        let u = settings.up.cross(w).normalize_or_zero();
        let v = w.cross(u);
        let lower_left_corner =
            origin - half_width * focus_dist * u - half_height * focus_dist * v - focus_dist * w;
        let horizontal = 2.0 * half_width * focus_dist * u;
        let vertical = 2.0 * half_height * focus_dist * v;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius,
        }
    }

    /// Ray through the film at (s, t), both in [0, 1] from the lower left corner
    pub fn ray(&self, s: f64, t: f64, rng: &mut DefaultRng) -> Ray {
        let [dx, dy]: [f64; 2] = UnitDisc.sample(rng);
        let offset = self.lens_radius * (self.u * dx + self.v * dy);

        Ray::new(
            self.origin + offset,
            self.lower_left_corner + s * self.horizontal + t * self.vertical - self.origin - offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn center_of_the_film_looks_at_the_target() {
        let settings = CameraSettings::default();
        let camera = Camera::new(&settings, 2.0);
        let mut rng = DefaultRng::seed_from_u64(1);
        let ray = camera.ray(0.5, 0.5, &mut rng);

        let expected = (settings.target - settings.position).normalize();
        assert!(ray.direction.abs_diff_eq(expected, 1e-9));
        assert_eq!(ray.origin, settings.position);
    }
}
