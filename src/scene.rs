//! Scene descriptions: named geometries, the nodes placing them, and animations moving the nodes.
//!
//! ```toml
//! [[geometry]]
//! name = "ball"
//! type = "sphere"
//! O = [0.0, 1.0, 0.0]
//! R = 1.0
//!
//! [[node]]
//! geometry = "ball"
//! shader = "red"
//! ```

use crate::{
    animation::Animation,
    config::{CsgSettings, MarchSettings, RenderSettings},
    expr::ExprError,
    primitives::{Csg, CsgOp, Cube, ImplicitSurface, Node, Plane, Sphere},
    ray::ShaderId,
    transform::Transform,
    Hit, Intersect, Ray,
};
use glam::DVec3;
use rayon::prelude::*;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("could not read scene file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scene: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{kind} `{name}` is defined more than once")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unknown geometry `{0}`")]
    UnknownGeometry(String),

    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("geometry `{0}` contains itself")]
    Cycle(String),

    #[error("bad expression in geometry `{name}`")]
    Expression {
        name: String,
        #[source]
        source: ExprError,
    },

    #[error("{0}")]
    Invalid(String),
}

fn default_limit() -> f64 {
    Plane::default().limit
}

fn default_radius() -> f64 {
    Sphere::default().radius()
}

fn default_half_side() -> f64 {
    Cube::default().half_side()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum GeometryDesc {
    Plane {
        name: String,
        #[serde(default)]
        y: f64,
        #[serde(default = "default_limit")]
        limit: f64,
    },
    Sphere {
        name: String,
        #[serde(rename = "O", default)]
        center: DVec3,
        #[serde(rename = "R", default = "default_radius")]
        radius: f64,
    },
    Cube {
        name: String,
        #[serde(rename = "O", default)]
        center: DVec3,
        #[serde(rename = "halfSide", default = "default_half_side")]
        half_side: f64,
    },
    CsgAnd {
        name: String,
        left: String,
        right: String,
    },
    CsgPlus {
        name: String,
        left: String,
        right: String,
    },
    CsgMinus {
        name: String,
        left: String,
        right: String,
    },
    Implicit {
        name: String,
        expr: String,
        #[serde(rename = "MaxGrad", default)]
        max_gradient: DVec3,
        #[serde(default)]
        boundary: Option<String>,
    },
}

impl GeometryDesc {
    fn name(&self) -> &str {
        match self {
            GeometryDesc::Plane { name, .. }
            | GeometryDesc::Sphere { name, .. }
            | GeometryDesc::Cube { name, .. }
            | GeometryDesc::CsgAnd { name, .. }
            | GeometryDesc::CsgPlus { name, .. }
            | GeometryDesc::CsgMinus { name, .. }
            | GeometryDesc::Implicit { name, .. } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDesc {
    #[serde(default)]
    name: Option<String>,
    geometry: String,
    #[serde(default)]
    shader: Option<String>,
    #[serde(default)]
    translate: DVec3,
    /// Yaw, pitch and roll in degrees
    #[serde(default)]
    rotate: DVec3,
    #[serde(default)]
    scale: Option<DVec3>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnimationDesc {
    node: String,
    #[serde(default)]
    start: i64,
    duration: u32,
    #[serde(default)]
    repetitions: u32,
    #[serde(default)]
    translate: DVec3,
    #[serde(default)]
    rotate: DVec3,
    #[serde(default)]
    scale: DVec3,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Document {
    settings: RenderSettings,
    march: MarchSettings,
    csg: CsgSettings,
    geometry: Vec<GeometryDesc>,
    node: Vec<NodeDesc>,
    animation: Vec<AnimationDesc>,
}

/// Turns geometry descriptions into trees, resolving references by name.
struct Builder<'a> {
    descs: HashMap<&'a str, &'a GeometryDesc>,
    march: MarchSettings,
    csg: CsgSettings,
    // Names currently being built, to catch a geometry that contains itself
    stack: Vec<&'a str>,
}

impl<'a> Builder<'a> {
    fn new(doc: &'a Document) -> Result<Self, SceneError> {
        let mut descs = HashMap::new();
        for desc in &doc.geometry {
            if descs.insert(desc.name(), desc).is_some() {
                return Err(SceneError::DuplicateName {
                    kind: "geometry",
                    name: desc.name().to_owned(),
                });
            }
        }

        Ok(Self {
            descs,
            march: doc.march,
            csg: doc.csg,
            stack: Vec::new(),
        })
    }

    /// Builds a fresh tree for `name`. Every reference gets its own copy.
    fn build(&mut self, name: &'a str) -> Result<Box<dyn Intersect>, SceneError> {
        let desc = *self
            .descs
            .get(name)
            .ok_or_else(|| SceneError::UnknownGeometry(name.to_owned()))?;
        if self.stack.contains(&name) {
            return Err(SceneError::Cycle(name.to_owned()));
        }

        self.stack.push(name);
        let geometry = self.build_desc(desc);
        self.stack.pop();
        geometry
    }

    fn build_desc(&mut self, desc: &'a GeometryDesc) -> Result<Box<dyn Intersect>, SceneError> {
        let geometry: Box<dyn Intersect> = match desc {
            GeometryDesc::Plane { y, limit, .. } => Box::new(Plane::new(*y, *limit)),
            GeometryDesc::Sphere { center, radius, .. } => {
                if !(*radius > 0.0) {
                    return Err(SceneError::Invalid(format!(
                        "sphere `{}` needs a positive radius",
                        desc.name()
                    )));
                }
                Box::new(Sphere::new(*center, *radius))
            }
            GeometryDesc::Cube {
                center, half_side, ..
            } => {
                if !(*half_side > 0.0) {
                    return Err(SceneError::Invalid(format!(
                        "cube `{}` needs a positive halfSide",
                        desc.name()
                    )));
                }
                Box::new(Cube::new(*center, *half_side))
            }
            GeometryDesc::CsgAnd { left, right, .. } => self.csg(CsgOp::And, left, right)?,
            GeometryDesc::CsgPlus { left, right, .. } => self.csg(CsgOp::Plus, left, right)?,
            GeometryDesc::CsgMinus { left, right, .. } => self.csg(CsgOp::Minus, left, right)?,
            GeometryDesc::Implicit {
                name,
                expr,
                max_gradient,
                boundary,
            } => {
                let mut surface = ImplicitSurface::from_expression(expr)
                    .map_err(|source| SceneError::Expression {
                        name: name.clone(),
                        source,
                    })?
                    .with_max_gradient(*max_gradient)
                    .with_settings(self.march);
                if let Some(boundary) = boundary {
                    surface = surface.with_boundary(Arc::from(self.build(boundary)?));
                }
                Box::new(surface)
            }
        };

        Ok(geometry)
    }

    fn csg(
        &mut self,
        op: CsgOp,
        left: &'a str,
        right: &'a str,
    ) -> Result<Box<dyn Intersect>, SceneError> {
        let left = self.build(left)?;
        let right = self.build(right)?;
        Ok(Box::new(Csg::new(op, left, right).with_settings(self.csg)))
    }
}

/// A loaded scene. Geometry is immutable; only node transforms change, between frames.
pub struct Scene {
    settings: RenderSettings,
    csg: CsgSettings,
    nodes: Vec<Node>,
    animations: Vec<Animation>,
    shaders: Vec<String>,
}

impl Scene {
    pub fn from_toml_str(source: &str) -> Result<Self, SceneError> {
        let doc: Document = toml::from_str(source)?;
        Self::from_document(&doc)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn from_document(doc: &Document) -> Result<Self, SceneError> {
        let mut builder = Builder::new(doc)?;

        // Nodes referring to the same geometry share one tree
        let mut built: HashMap<&str, Arc<dyn Intersect>> = HashMap::new();
        for desc in &doc.geometry {
            let geometry = builder.build(desc.name())?;
            built.insert(desc.name(), Arc::from(geometry));
        }

        let mut shaders: Vec<String> = Vec::new();
        let mut nodes = Vec::with_capacity(doc.node.len());
        for desc in &doc.node {
            let geometry = built
                .get(desc.geometry.as_str())
                .cloned()
                .ok_or_else(|| SceneError::UnknownGeometry(desc.geometry.clone()))?;

            let shader = desc.shader.as_ref().map(|shader| {
                let index = match shaders.iter().position(|s| s == shader) {
                    Some(index) => index,
                    None => {
                        shaders.push(shader.clone());
                        shaders.len() - 1
                    }
                };
                ShaderId(index)
            });

            let mut transform = Transform::new();
            if let Some(s) = desc.scale {
                transform.scale(s.x, s.y, s.z);
            }
            transform.rotate(desc.rotate.x, desc.rotate.y, desc.rotate.z);
            transform.translate(desc.translate);

            let mut node = Node::new(geometry, shader, transform);
            if let Some(name) = &desc.name {
                if nodes.iter().any(|n: &Node| n.name.as_ref() == Some(name)) {
                    return Err(SceneError::DuplicateName {
                        kind: "node",
                        name: name.clone(),
                    });
                }
                node = node.named(name.clone());
            }
            nodes.push(node);
        }

        let mut animations = Vec::with_capacity(doc.animation.len());
        for desc in &doc.animation {
            let index = nodes
                .iter()
                .position(|n| n.name.as_ref() == Some(&desc.node))
                .ok_or_else(|| SceneError::UnknownNode(desc.node.clone()))?;
            if desc.duration == 0 {
                return Err(SceneError::Invalid(format!(
                    "animation of `{}` needs a duration of at least one frame",
                    desc.node
                )));
            }
            animations.push(Animation::new(
                index,
                desc.start,
                desc.duration,
                desc.repetitions,
                desc.translate,
                desc.rotate,
                desc.scale,
            ));
        }

        log::debug!(
            "built scene: {} geometries, {} nodes, {} animations, {} shaders",
            built.len(),
            nodes.len(),
            animations.len(),
            shaders.len()
        );

        Ok(Self {
            settings: doc.settings.clone(),
            csg: doc.csg,
            nodes,
            animations,
            shaders,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
    }

    pub fn shader_name(&self, id: ShaderId) -> Option<&str> {
        self.shaders.get(id.0).map(String::as_str)
    }

    /// Moves animated nodes into their pose for `frame`. Frames are expected in order.
    pub fn begin_frame(&mut self, frame: i64) {
        for animation in &self.animations {
            if let Some(node) = self.nodes.get_mut(animation.node()) {
                animation.apply(frame, node);
            }
        }
    }

    /// Nearest hit for every ray, computed in parallel.
    pub fn intersect_batch(&self, rays: &[Ray]) -> Vec<Option<Hit>> {
        rays.par_iter().map(|ray| self.intersection(ray)).collect()
    }

    /// Every boundary crossing of every node along the ray, nearest first.
    pub fn all_intersections(&self, ray: &Ray) -> Vec<Hit> {
        let mut hits = Vec::new();
        self.intersections(ray, &self.csg, &mut hits);
        hits
    }
}

impl Intersect for Scene {
    fn intersection(&self, ray: &Ray) -> Option<Hit> {
        self.nodes
            .iter()
            .filter_map(|node| node.intersection(ray))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        self.nodes.iter().any(|node| node.has_intersection(ray))
    }

    fn intersections(&self, ray: &Ray, settings: &CsgSettings, hits: &mut Vec<Hit>) {
        let start = hits.len();
        for node in &self.nodes {
            node.intersections(ray, settings, hits);
        }
        hits[start..].sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }
}
