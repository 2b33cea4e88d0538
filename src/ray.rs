use glam::DVec3;

/// The ray data type
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Always unit length, or zero for a degenerate ray
    pub direction: DVec3,
    pub inv_direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        let direction = direction.normalize_or_zero();
        let inv_direction = direction.recip();

        Self {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at_parameter(&self, t: f64) -> DVec3 {
        self.origin + t * self.direction
    }

    /// The same ray with its origin moved `t` units forward.
    pub fn advanced(&self, t: f64) -> Self {
        Self {
            origin: self.point_at_parameter(t),
            ..*self
        }
    }

    /// Whether the direction is usable at all.
    pub fn is_degenerate(&self) -> bool {
        self.direction == DVec3::ZERO || !self.direction.is_finite()
    }
}

/// Identity of the geometry that produced a hit. Compared, never dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(usize);

impl GeometryId {
    pub fn of<T: ?Sized>(geometry: &T) -> Self {
        GeometryId(geometry as *const T as *const () as usize)
    }
}

/// Handle into the shader table owned by whoever renders the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub usize);

/// Everything known about a successful ray/geometry test.
///
/// `distance` is strictly positive and measured along the unit direction of the ray that was
/// passed in, so it is also the world space distance from the ray origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub point: DVec3,
    pub normal: DVec3,
    pub distance: f64,
    pub u: f64,
    pub v: f64,
    pub geometry: Option<GeometryId>,
    pub ray_dir: DVec3,
    pub dn_dx: DVec3,
    pub dn_dy: DVec3,
    pub shader: Option<ShaderId>,
}

impl Hit {
    pub fn new(ray: &Ray, distance: f64, normal: DVec3) -> Self {
        Self {
            point: ray.point_at_parameter(distance),
            normal,
            distance,
            u: 0.0,
            v: 0.0,
            geometry: None,
            ray_dir: ray.direction,
            dn_dx: DVec3::ZERO,
            dn_dy: DVec3::ZERO,
            shader: None,
        }
    }

    pub fn with_uv(mut self, u: f64, v: f64) -> Self {
        self.u = u;
        self.v = v;
        self
    }

    pub fn with_geometry(mut self, id: GeometryId) -> Self {
        self.geometry = Some(id);
        self
    }

    /// True when the ray crosses the surface against its normal.
    pub fn is_entering(&self) -> bool {
        self.normal.dot(self.ray_dir) < 0.0
    }
}
