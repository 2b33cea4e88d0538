//! Surfaces given as the zero set of a scalar field, found by marching along the ray with
//! gradient sized steps and refining the first sign change by bisection.

use crate::{
    config::MarchSettings,
    expr::{ExprError, Expression},
    ray::GeometryId,
    Hit, Intersect, Ray,
};
use glam::DVec3;
use std::{fmt, sync::Arc};

/// A scalar field f(x, y, z). Negative values are inside the surface.
pub trait ScalarField: Send + Sync {
    fn value(&self, p: DVec3) -> f64;
}

impl ScalarField for Expression {
    fn value(&self, p: DVec3) -> f64 {
        self.eval_at(p)
    }
}

impl<F> ScalarField for F
where
    F: Fn(f64, f64, f64) -> f64 + Send + Sync,
{
    fn value(&self, p: DVec3) -> f64 {
        self(p.x, p.y, p.z)
    }
}

/// Smallest `|value / (gradient_i * direction_i)|` over the three axes. NaN terms are skipped.
fn axis_step(value: f64, gradient: DVec3, direction: DVec3) -> f64 {
    (gradient * direction)
        .to_array()
        .iter()
        .map(|&rate| (value / rate).abs())
        .fold(f64::INFINITY, f64::min)
}

/// The zero set of a [`ScalarField`], found by marching.
///
/// Each step is the smallest `|f / (g_i * d_i)|` over the axes, a Newton step along a single axis.
/// On rays running diagonally to the axes that step can be several times longer than the distance
/// to the surface, so a thin shell or a small closed surface may be stepped over and missed. A
/// `max_gradient` hint or a tighter `MarchSettings::min_step` does not prevent this; rays along an
/// axis are exact.
pub struct ImplicitSurface {
    field: Box<dyn ScalarField>,
    max_gradient: DVec3,
    boundary: Option<Arc<dyn Intersect>>,
    settings: MarchSettings,
}

impl fmt::Debug for ImplicitSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitSurface")
            .field("max_gradient", &self.max_gradient)
            .field("bounded", &self.boundary.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ImplicitSurface {
    pub fn new(field: impl ScalarField + 'static) -> Self {
        Self {
            field: Box::new(field),
            max_gradient: DVec3::ZERO,
            boundary: None,
            settings: MarchSettings::default(),
        }
    }

    pub fn from_expression(expr: &str) -> Result<Self, ExprError> {
        Ok(Self::new(Expression::compile(expr)?))
    }

    /// Upper bound on the field gradient, used to size the smallest march step
    pub fn with_max_gradient(mut self, max_gradient: DVec3) -> Self {
        self.max_gradient = max_gradient;
        self
    }

    /// Rays missing `boundary` are rejected without sampling the field
    pub fn with_boundary(mut self, boundary: Arc<dyn Intersect>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_settings(mut self, settings: MarchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn value(&self, p: DVec3) -> f64 {
        self.field.value(p)
    }

    fn central_difference(&self, p: DVec3, eps: f64) -> DVec3 {
        let f = |offset: DVec3| {
            (self.field.value(p + offset) - self.field.value(p - offset)) / (2.0 * eps)
        };
        DVec3::new(
            f(DVec3::new(eps, 0.0, 0.0)),
            f(DVec3::new(0.0, eps, 0.0)),
            f(DVec3::new(0.0, 0.0, eps)),
        )
    }

    /// Numerical gradient. The offset grows while the estimate is too flat to divide by.
    pub fn gradient(&self, p: DVec3) -> DVec3 {
        let settings = &self.settings;
        let mut eps = settings.gradient_epsilon;
        let mut gradient = self.central_difference(p, eps);

        while gradient.length_squared() < settings.degenerate_gradient
            && eps < settings.max_gradient_epsilon
        {
            eps *= 2.0;
            gradient = self.central_difference(p, eps);
        }

        gradient
    }

    /// Returns the distance of the first zero crossing along the ray.
    fn march(&self, ray: &Ray) -> Option<f64> {
        let settings = &self.settings;
        let field = |t: f64| self.field.value(ray.point_at_parameter(t));

        let mut last_value = field(0.0);
        let mut current_value = last_value;

        let mut min_step = settings.min_step;
        if self.max_gradient.length() > 1e-6 {
            let hinted = axis_step(current_value, self.max_gradient, ray.direction);
            if hinted.is_finite() && hinted > 0.0 {
                min_step = hinted;
            }
        }

        let mut last_distance = 0.0;
        let mut current_distance = 0.0;
        let mut steps = 0;

        while current_distance < settings.escape_distance
            && current_value.abs() > settings.tolerance
            && current_value.is_sign_negative() == last_value.is_sign_negative()
        {
            if steps == settings.max_steps {
                return None;
            }
            steps += 1;

            let gradient = self.gradient(ray.point_at_parameter(current_distance));
            let mut step = axis_step(current_value, gradient, ray.direction);
            // No usable gradient at all, as opposed to a field that never changes along the ray.
            // Keep moving, doubling the distance so far-away flat regions are still left behind.
            if step.is_infinite() && gradient.length_squared() < settings.degenerate_gradient {
                step = current_distance;
            }
            let step = step.max(min_step);

            last_distance = current_distance;
            last_value = current_value;
            current_distance += step;
            current_value = field(current_distance);
        }

        if current_distance >= settings.escape_distance || current_value.is_nan() {
            return None;
        }

        // Marching landed on the surface without stepping over it
        if current_value.is_sign_negative() == last_value.is_sign_negative() {
            return Some(current_distance);
        }

        let mut bisections = 0;
        while current_value.abs() > settings.tolerance || current_value.is_sign_negative() {
            if bisections == settings.max_bisections {
                log::debug!(
                    "bisection stopped after {} halvings at f = {}",
                    bisections,
                    current_value
                );
                break;
            }
            bisections += 1;

            let middle_distance = (last_distance + current_distance) / 2.0;
            let middle_value = field(middle_distance);

            if middle_value.is_sign_negative() != last_value.is_sign_negative() {
                current_value = middle_value;
                current_distance = middle_distance;
            } else {
                last_distance = current_distance;
                last_value = current_value;
                current_value = middle_value;
                current_distance = middle_distance;
            }
        }

        Some(current_distance)
    }
}

impl Intersect for ImplicitSurface {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        if ray.is_degenerate() {
            return None;
        }
        if let Some(boundary) = &self.boundary {
            if !boundary.has_intersection(ray) {
                return None;
            }
        }

        let distance = self.march(ray)?;
        if !(distance > 0.0) {
            return None;
        }

        let normal = self
            .gradient(ray.point_at_parameter(distance))
            .normalize_or_zero();

        Some(Hit::new(ray, distance, normal).with_geometry(GeometryId::of(self)))
    }
}
