//! Ray/geometry intersection: analytic primitives, boolean (CSG) combinations of them, and
//! implicit surfaces given by a formula, placed in a scene by transformed nodes.

pub mod animation;
pub mod config;
pub mod expr;
pub mod primitives;
pub mod ray;
pub mod scene;
pub mod transform;

pub use crate::{
    config::{CsgSettings, MarchSettings, RenderSettings},
    expr::{ExprError, Expression},
    primitives::Intersect,
    ray::{GeometryId, Hit, Ray, ShaderId},
    scene::{Scene, SceneError},
    transform::Transform,
};

pub type DefaultRng = rand_xoshiro::Xoshiro256Plus;
