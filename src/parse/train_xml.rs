//! Reader and writer for train scene documents.
//!
//! A document lists curve objects and a node hierarchy:
//!
//! ```xml
//! <scene>
//!   <curves>
//!     <curve id="0" name="Track" kind="polyline" closed="true">
//!       <point x="0" y="0" z="0"/>
//!       <point x="100" y="0" z="0"/>
//!       <point x="100" y="0" z="50"/>
//!     </curve>
//!     <curve id="1" name="Track instance" kind="generator" target="0"/>
//!   </curves>
//!   <nodes>
//!     <node name="Train">
//!       <train path="1" offset="0.25" circular="true" length="30" wheel_distance="25"/>
//!       <node name="Car 1">
//!         <car length="30" wheel_distance="25"/>
//!         <node name="Main"/>
//!         <node name="Wheel 1"/>
//!         <node name="Wheel 2"/>
//!       </node>
//!     </node>
//!   </nodes>
//! </scene>
//! ```
//!
//! Vectors in attributes are written as `x,y,z`. Child `<node>` elements must
//! follow the `transform`, `train` and `car` elements of their parent.

use std::collections::BTreeMap;
use std::num::ParseFloatError;

use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{
    Arc3, Circle3, CubicBezier3, Curve3, CurveShape, Line3, Point3, Polyline3, SplineCurve, Transform,
    Vec3,
};
use crate::scene::{CurveEntry, CurveId, NodeId, Scene, SceneError};
use crate::train::{CarOverride, PlacementReport, TrainConfig};

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed or does not match the schema.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid number: {0}")]
    Number(#[from] ParseFloatError),
    #[error("invalid vector '{0}', expected x,y,z")]
    Vector(String),
    #[error("curve {id}: {reason}")]
    Shape { id: usize, reason: String },
    #[error("duplicate curve id {0}")]
    DuplicateCurve(usize),
    #[error("reference to unknown curve id {0}")]
    UnknownCurve(usize),
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Reads a document into a new [`Scene`].
pub fn parse_str(input: &str) -> ParseResult<Scene> {
    let document: SceneDocument = from_str(input)?;
    log::debug!(
        "read document with {} curves and {} root nodes",
        document.curves.curves.len(),
        document.nodes.nodes.len()
    );

    let mut scene = Scene::new();
    let curve_ids = load_curves(&mut scene, document.curves.curves)?;
    for node in document.nodes.nodes {
        load_node(&mut scene, &curve_ids, node, None)?;
    }
    Ok(scene)
}

/// Writes `scene` as a document that [`parse_str`] reads back.
pub fn to_string(scene: &Scene) -> ParseResult<String> {
    let document = SceneDocument {
        curves: CurveList {
            curves: scene.curves().map(|(id, entry)| CurveDto::from_entry(id, entry)).collect(),
        },
        nodes: NodeList {
            nodes: scene.roots().iter().map(|&root| NodeDto::from_scene(scene, root)).collect(),
        },
    };
    Ok(quick_xml::se::to_string(&document)?)
}

fn load_curves(scene: &mut Scene, curves: Vec<CurveDto>) -> ParseResult<BTreeMap<usize, CurveId>> {
    let mut ids = BTreeMap::new();
    let mut generators = Vec::new();

    for dto in curves {
        if ids.contains_key(&dto.id) {
            return Err(ParseError::DuplicateCurve(dto.id));
        }
        let id = if dto.kind == "generator" {
            let target = dto.target.ok_or_else(|| ParseError::Shape {
                id: dto.id,
                reason: "generator without target".to_owned(),
            })?;
            let id = scene.add_generator(dto.name.clone(), CurveId::default());
            generators.push((id, target));
            id
        } else {
            let curve = dto.to_spline()?;
            scene.add_spline(dto.name.clone(), curve)
        };
        ids.insert(dto.id, id);
    }

    // Targets may point forward in the document.
    for (id, target) in generators {
        let resolved = *ids.get(&target).ok_or(ParseError::UnknownCurve(target))?;
        if let Some(CurveEntry::Generator { target, .. }) = scene.curve_mut(id) {
            *target = resolved;
        }
    }

    Ok(ids)
}

fn load_node(
    scene: &mut Scene,
    curve_ids: &BTreeMap<usize, CurveId>,
    dto: NodeDto,
    parent: Option<NodeId>,
) -> ParseResult<NodeId> {
    let id = scene.add_node(dto.name)?;
    if let Some(parent) = parent {
        scene.append_child(parent, id)?;
    }
    if let Some(transform) = dto.transform {
        scene.set_world_transform(id, transform.to_transform()?)?;
    }
    if let Some(train) = dto.train {
        let config = train.to_config(curve_ids)?;
        scene.set_train_config(id, config)?;
    }
    if let Some(car) = dto.car {
        scene.attach_car_override(
            id,
            CarOverride {
                length: car.length,
                wheel_distance: car.wheel_distance,
                label: car.label.unwrap_or_default(),
            },
        )?;
    }
    for child in dto.children {
        load_node(scene, curve_ids, child, Some(id))?;
    }
    Ok(id)
}

fn lookup_curve(curve_ids: &BTreeMap<usize, CurveId>, id: Option<usize>) -> ParseResult<Option<CurveId>> {
    id.map(|id| curve_ids.get(&id).copied().ok_or(ParseError::UnknownCurve(id)))
        .transpose()
}

fn parse_vector(text: &str) -> ParseResult<Vec3> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [x, y, z] = parts[..] else {
        return Err(ParseError::Vector(text.to_owned()));
    };
    Ok(Vec3::new(x.parse()?, y.parse()?, z.parse()?))
}

fn vector_or(text: Option<&str>, fallback: Vec3) -> ParseResult<Vec3> {
    text.map_or(Ok(fallback), parse_vector)
}

fn format_vector(v: Vec3) -> String {
    format!("{},{},{}", v.x, v.y, v.z)
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename = "scene")]
struct SceneDocument {
    #[serde(default)]
    curves: CurveList,
    #[serde(default)]
    nodes: NodeList,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CurveList {
    #[serde(default, rename = "curve")]
    curves: Vec<CurveDto>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct NodeList {
    #[serde(default, rename = "node")]
    nodes: Vec<NodeDto>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CurveDto {
    #[serde(rename = "@id")]
    id: usize,
    #[serde(default, rename = "@name")]
    name: String,
    #[serde(rename = "@kind")]
    kind: String,
    #[serde(default, rename = "@target", skip_serializing_if = "Option::is_none")]
    target: Option<usize>,
    #[serde(default, rename = "@closed", skip_serializing_if = "Option::is_none")]
    closed: Option<bool>,
    #[serde(default, rename = "@radius", skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
    #[serde(default, rename = "@normal", skip_serializing_if = "Option::is_none")]
    normal: Option<String>,
    #[serde(default, rename = "@x_axis", skip_serializing_if = "Option::is_none")]
    x_axis: Option<String>,
    #[serde(default, rename = "@start_angle", skip_serializing_if = "Option::is_none")]
    start_angle: Option<f64>,
    #[serde(default, rename = "@sweep_angle", skip_serializing_if = "Option::is_none")]
    sweep_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<TransformDto>,
    #[serde(default, rename = "point")]
    points: Vec<PointDto>,
}

impl CurveDto {
    fn shape_error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::Shape {
            id: self.id,
            reason: reason.into(),
        }
    }

    fn points(&self) -> Vec<Point3> {
        self.points.iter().map(|p| Point3::new(p.x, p.y, p.z)).collect()
    }

    fn exact_points<const N: usize>(&self) -> ParseResult<[Point3; N]> {
        <[Point3; N]>::try_from(self.points())
            .map_err(|points| self.shape_error(format!("{} needs {N} points, got {}", self.kind, points.len())))
    }

    fn to_spline(&self) -> ParseResult<SplineCurve> {
        let shape = match self.kind.as_str() {
            "line" => {
                let [start, end] = self.exact_points::<2>()?;
                CurveShape::Line(Line3::new(start, end))
            }
            "polyline" => {
                let polyline = Polyline3::new(self.points(), self.closed.unwrap_or(false))
                    .map_err(|reason| self.shape_error(reason))?;
                CurveShape::Polyline(polyline)
            }
            "bezier" => {
                let [p0, p1, p2, p3] = self.exact_points::<4>()?;
                CurveShape::CubicBezier(CubicBezier3::new(p0, p1, p2, p3))
            }
            "circle" | "arc" => {
                let [center] = self.exact_points::<1>()?;
                let radius = self.radius.ok_or_else(|| self.shape_error("missing radius"))?;
                let normal = vector_or(self.normal.as_deref(), Vec3::Z)?;
                let x_axis = vector_or(self.x_axis.as_deref(), Vec3::X)?;
                if self.kind == "circle" {
                    CurveShape::Circle(Circle3::from_center_xaxis_normal(center, x_axis, normal, radius))
                } else {
                    let sweep = self
                        .sweep_angle
                        .ok_or_else(|| self.shape_error("missing sweep_angle"))?;
                    CurveShape::Arc(Arc3::from_center_xaxis_normal(
                        center,
                        x_axis,
                        normal,
                        radius,
                        self.start_angle.unwrap_or(0.0),
                        sweep,
                    ))
                }
            }
            other => return Err(self.shape_error(format!("unknown curve kind '{other}'"))),
        };

        let world = match &self.transform {
            Some(transform) => transform.to_transform()?,
            None => Transform::identity(),
        };
        Ok(SplineCurve::with_world(shape, world))
    }

    fn from_entry(id: CurveId, entry: &CurveEntry) -> Self {
        let mut dto = Self {
            id: id.0,
            name: entry.name().to_owned(),
            kind: String::new(),
            target: None,
            closed: None,
            radius: None,
            normal: None,
            x_axis: None,
            start_angle: None,
            sweep_angle: None,
            transform: None,
            points: Vec::new(),
        };

        let curve = match entry {
            CurveEntry::Generator { target, .. } => {
                dto.kind = "generator".to_owned();
                dto.target = Some(target.0);
                return dto;
            }
            CurveEntry::Spline { curve, .. } => curve,
        };

        dto.kind = curve.shape.kind_name().to_owned();
        if curve.world != Transform::identity() {
            dto.transform = Some(TransformDto::from_transform(curve.world));
        }
        match &curve.shape {
            CurveShape::Line(line) => dto.points = vec![line.start.into(), line.end.into()],
            CurveShape::Polyline(polyline) => {
                dto.closed = Some(polyline.is_closed());
                dto.points = polyline.points().iter().map(|&p| p.into()).collect();
            }
            CurveShape::CubicBezier(bezier) => {
                dto.points = [bezier.p0, bezier.p1, bezier.p2, bezier.p3].into_iter().map(PointDto::from).collect();
            }
            CurveShape::Circle(circle) => {
                dto.points = vec![circle.center.into()];
                dto.radius = Some(circle.radius);
                dto.x_axis = Some(format_vector(circle.x_axis));
                dto.normal = Some(format_vector(circle.x_axis.cross(circle.y_axis)));
            }
            CurveShape::Arc(arc) => {
                dto.points = vec![arc.center.into()];
                dto.radius = Some(arc.radius);
                dto.x_axis = Some(format_vector(arc.x_axis));
                dto.normal = Some(format_vector(arc.x_axis.cross(arc.y_axis)));
                dto.start_angle = Some(arc.start_angle);
                dto.sweep_angle = Some(arc.sweep_angle);
            }
        }
        dto
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
struct PointDto {
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
    #[serde(rename = "@z")]
    z: f64,
}

impl From<Point3> for PointDto {
    fn from(p: Point3) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

/// World matrix given by its origin and its three (possibly scaled) axes.
#[derive(Debug, Deserialize, Serialize)]
struct TransformDto {
    #[serde(default, rename = "@origin", skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(default, rename = "@x_axis", skip_serializing_if = "Option::is_none")]
    x_axis: Option<String>,
    #[serde(default, rename = "@y_axis", skip_serializing_if = "Option::is_none")]
    y_axis: Option<String>,
    #[serde(default, rename = "@z_axis", skip_serializing_if = "Option::is_none")]
    z_axis: Option<String>,
}

impl TransformDto {
    fn to_transform(&self) -> ParseResult<Transform> {
        let origin = vector_or(self.origin.as_deref(), Vec3::ZERO)?;
        Ok(Transform::from_axes(
            Point3::new(origin.x, origin.y, origin.z),
            vector_or(self.x_axis.as_deref(), Vec3::X)?,
            vector_or(self.y_axis.as_deref(), Vec3::Y)?,
            vector_or(self.z_axis.as_deref(), Vec3::Z)?,
        ))
    }

    fn from_transform(transform: Transform) -> Self {
        Self {
            origin: Some(format_vector(transform.translation())),
            x_axis: Some(format_vector(transform.x_axis())),
            y_axis: Some(format_vector(transform.y_axis())),
            z_axis: Some(format_vector(transform.z_axis())),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct NodeDto {
    #[serde(default, rename = "@name")]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<TransformDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    train: Option<TrainDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    car: Option<CarDto>,
    #[serde(default, rename = "node")]
    children: Vec<NodeDto>,
}

impl NodeDto {
    fn from_scene(scene: &Scene, id: NodeId) -> Self {
        let transform = scene
            .world_transform(id)
            .filter(|transform| *transform != Transform::identity())
            .map(TransformDto::from_transform);

        Self {
            name: scene.name(id).unwrap_or_default().to_owned(),
            transform,
            train: scene.train_config(id).map(TrainDto::from_config),
            car: scene.car_override(id).map(|car| CarDto {
                length: car.length,
                wheel_distance: car.wheel_distance,
                label: Some(car.label.clone()).filter(|label| !label.is_empty()),
            }),
            children: scene
                .children(id)
                .iter()
                .map(|&child| Self::from_scene(scene, child))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TrainDto {
    #[serde(default, rename = "@path", skip_serializing_if = "Option::is_none")]
    path: Option<usize>,
    #[serde(default, rename = "@rail", skip_serializing_if = "Option::is_none")]
    rail: Option<usize>,
    #[serde(default, rename = "@offset")]
    offset: f64,
    #[serde(default, rename = "@circular")]
    circular: bool,
    #[serde(default, rename = "@length", skip_serializing_if = "Option::is_none")]
    length: Option<f64>,
    #[serde(default, rename = "@wheel_distance", skip_serializing_if = "Option::is_none")]
    wheel_distance: Option<f64>,
    #[serde(default, rename = "@subdivision", skip_serializing_if = "Option::is_none")]
    subdivision: Option<usize>,
}

impl TrainDto {
    fn to_config(&self, curve_ids: &BTreeMap<usize, CurveId>) -> ParseResult<TrainConfig> {
        let defaults = TrainConfig::default();
        Ok(TrainConfig {
            path: lookup_curve(curve_ids, self.path)?,
            rail: lookup_curve(curve_ids, self.rail)?,
            offset: self.offset,
            circular: self.circular,
            default_length: self.length.unwrap_or(defaults.default_length),
            default_wheel_distance: self.wheel_distance.unwrap_or(defaults.default_wheel_distance),
            subdivision: self.subdivision,
            info: PlacementReport::default(),
        })
    }

    fn from_config(config: &TrainConfig) -> Self {
        Self {
            path: config.path.map(|id| id.0),
            rail: config.rail.map(|id| id.0),
            offset: config.offset,
            circular: config.circular,
            length: Some(config.default_length),
            wheel_distance: Some(config.default_wheel_distance),
            subdivision: config.subdivision,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct CarDto {
    #[serde(rename = "@length")]
    length: f64,
    #[serde(rename = "@wheel_distance")]
    wheel_distance: f64,
    #[serde(default, rename = "@label", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}
