#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Places chains of rail cars along guide curves.
//!
//! A train is a scene node carrying [`train::TrainConfig`]; its children are
//! cars, each with a Main body and two wheel nodes. [`train::place`] poses all
//! cars along the train's path curve, [`train::add_car`] appends a new car.
//! [`Engine`] wraps both for JavaScript hosts and works natively as well.

pub mod geom;
pub mod parse;
pub mod scene;
pub mod train;

use std::fmt;

use scene::{NodeId, Scene};
use serde::Serialize;
use train::{AddCarError, PlacementError, PlacementReport};
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

use parse::train_xml::{self, ParseError};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("unknown train '{0}'")]
    UnknownTrain(String),
    #[error("offset must be a finite number")]
    NonFiniteOffset,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    AddCar(#[from] AddCarError),
}

/// World transform of one node of a car, as handed to hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTransform {
    pub car: String,
    pub name: String,
    /// Row-major 4x4 matrix; columns hold the axes and the origin.
    pub matrix: [[f64; 4]; 4],
    pub scale: [f64; 3],
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    scene: Option<Scene>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            scene: None,
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Loads a scene document, replacing any previous one.
    #[wasm_bindgen]
    pub fn load_document(&mut self, xml: &str) -> Result<(), JsValue> {
        self.load(xml).map_err(to_js_error)
    }

    /// Places the cars of the named train and returns the placement report.
    #[wasm_bindgen]
    pub fn place(&mut self, train_name: &str) -> Result<JsValue, JsValue> {
        let report = self.place_train(train_name).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&report).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Appends a car to the named train and returns the new car's name.
    #[wasm_bindgen]
    pub fn add_car(&mut self, train_name: &str) -> Result<String, JsValue> {
        self.append_car(train_name).map_err(to_js_error)
    }

    /// Re-places every train marked stale since its last placement and returns
    /// how many were placed.
    #[wasm_bindgen]
    pub fn evaluate(&mut self) -> Result<usize, JsValue> {
        self.place_dirty().map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_offset(&mut self, train_name: &str, value: f64) -> Result<(), JsValue> {
        self.set_train_offset(train_name, value).map_err(to_js_error)
    }

    /// Status text written by the last placement of the named train.
    #[wasm_bindgen]
    pub fn status(&self, train_name: &str) -> Result<String, JsValue> {
        self.train_status(train_name)
            .map(|report| report.to_string())
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn export_document(&self) -> Result<String, JsValue> {
        self.export().map_err(to_js_error)
    }

    /// Current transforms of every car node of the named train.
    #[wasm_bindgen]
    pub fn get_transforms(&self, train_name: &str) -> Result<JsValue, JsValue> {
        let transforms = self.transforms(train_name).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&transforms).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl Engine {
    pub fn load(&mut self, xml: &str) -> Result<(), EngineError> {
        let scene = train_xml::parse_str(xml)?;
        log::debug!("loaded document with {} nodes", scene.node_count());
        self.scene = Some(scene);
        Ok(())
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn place_train(&mut self, train_name: &str) -> Result<PlacementReport, EngineError> {
        let (scene, id) = self.train_mut(train_name)?;
        Ok(train::place(scene, id)?)
    }

    /// Places every train of the document, in id order.
    ///
    /// Failures are recorded in each train's status; the returned reports
    /// include failed passes.
    pub fn place_all(&mut self) -> Result<Vec<(String, PlacementReport)>, EngineError> {
        let scene = self.scene.as_mut().ok_or(EngineError::NoDocument)?;
        let ids: Vec<NodeId> = scene.trains().collect();
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            if let Err(err) = train::place(scene, id) {
                log::debug!("{id} not placed: {err}");
            }
            let name = scene.name(id).unwrap_or_default().to_owned();
            let report = scene
                .train_config(id)
                .map(|config| config.info.clone())
                .unwrap_or_default();
            reports.push((name, report));
        }
        Ok(reports)
    }

    pub fn place_dirty(&mut self) -> Result<usize, EngineError> {
        let scene = self.scene.as_mut().ok_or(EngineError::NoDocument)?;
        let stale: Vec<NodeId> = scene.trains().filter(|&id| scene.is_dirty(id)).collect();
        for &id in &stale {
            if let Err(err) = train::place(scene, id) {
                log::debug!("{id} not placed: {err}");
            }
        }
        Ok(stale.len())
    }

    pub fn append_car(&mut self, train_name: &str) -> Result<String, EngineError> {
        let (scene, id) = self.train_mut(train_name)?;
        let car = train::add_car(scene, id)?;
        Ok(scene.name(car).unwrap_or_default().to_owned())
    }

    pub fn set_train_offset(&mut self, train_name: &str, value: f64) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(EngineError::NonFiniteOffset);
        }
        let (scene, id) = self.train_mut(train_name)?;
        if let Some(config) = scene.train_config_mut(id) {
            config.offset = value;
        }
        scene.mark_dirty(id);
        Ok(())
    }

    pub fn train_status(&self, train_name: &str) -> Result<PlacementReport, EngineError> {
        let (scene, id) = self.train(train_name)?;
        scene
            .train_config(id)
            .map(|config| config.info.clone())
            .ok_or_else(|| EngineError::UnknownTrain(train_name.to_owned()))
    }

    pub fn export(&self) -> Result<String, EngineError> {
        let scene = self.scene.as_ref().ok_or(EngineError::NoDocument)?;
        Ok(train_xml::to_string(scene)?)
    }

    /// Transforms of each car root followed by its parts, front to back.
    pub fn transforms(&self, train_name: &str) -> Result<Vec<NodeTransform>, EngineError> {
        let (scene, id) = self.train(train_name)?;
        let mut transforms = Vec::new();
        for &car in scene.children(id) {
            let car_name = scene.name(car).unwrap_or_default();
            let nodes = std::iter::once(car).chain(scene.children(car).iter().copied().take(3));
            for node in nodes {
                let (Some(world), Some(scale)) = (scene.world_transform(node), scene.local_scale(node)) else {
                    continue;
                };
                transforms.push(NodeTransform {
                    car: car_name.to_owned(),
                    name: scene.name(node).unwrap_or_default().to_owned(),
                    matrix: *world.as_matrix(),
                    scale: scale.to_array(),
                });
            }
        }
        Ok(transforms)
    }

    fn train(&self, train_name: &str) -> Result<(&Scene, NodeId), EngineError> {
        let scene = self.scene.as_ref().ok_or(EngineError::NoDocument)?;
        let id = find_train(scene, train_name)?;
        Ok((scene, id))
    }

    fn train_mut(&mut self, train_name: &str) -> Result<(&mut Scene, NodeId), EngineError> {
        let scene = self.scene.as_mut().ok_or(EngineError::NoDocument)?;
        let id = find_train(scene, train_name)?;
        Ok((scene, id))
    }
}

fn find_train(scene: &Scene, train_name: &str) -> Result<NodeId, EngineError> {
    let wanted = train_name.trim();
    scene
        .trains()
        .find(|&id| scene.name(id) == Some(wanted))
        .ok_or_else(|| EngineError::UnknownTrain(wanted.to_owned()))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
