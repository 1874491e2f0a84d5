//! Shapes Demo
//!
//! Loads `codable.toml` next to this crate through the layered runtime and
//! decodes a scene of polymorphic shapes from it.
//!
//! # Config Features Shown
//!
//! ```text
//! plugins.shape
//! ├── circle / rect / group      labels for the three shape types
//! ├── square, banner             aliases of rect with default sizes
//! ├── _array = "group"           a bare list becomes a group
//! └── _default = "circle"        a node without `type` is a circle
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package codable-demo-shapes
//! CODABLE_SCENE__TITLE="Other title" cargo run --package codable-demo-shapes
//! ```

use std::collections::BTreeMap;
use std::f64::consts::PI;

use anyhow::{Context, Result};
use codable::prelude::*;
use tracing::info;

const CONFIG_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/codable.toml");

// ============================================================================
// Shapes
// ============================================================================

pub trait Shape {
    fn area(&self) -> f64;
    fn describe(&self) -> String;
}

plugin_base!(dyn Shape, category = "shape");

#[derive(Default, Codable)]
#[codable(base = dyn Shape)]
struct Circle {
    radius: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    fn describe(&self) -> String {
        format!("circle r={}", self.radius)
    }
}

#[derive(Default, Codable)]
#[codable(base = dyn Shape, post_decode)]
struct Rect {
    width: f64,
    height: f64,
}

impl PostDecode for Rect {
    fn post_decode(&mut self) -> Result<(), HookError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(HookError::new("rectangle sides must be positive"));
        }
        Ok(())
    }
}

impl Shape for Rect {
    fn area(&self) -> f64 {
        self.width * self.height
    }

    fn describe(&self) -> String {
        format!("rect {}x{}", self.width, self.height)
    }
}

#[derive(Default, Codable)]
#[codable(base = dyn Shape)]
struct Group {
    shapes: Vec<Box<dyn Shape>>,
    scale: Option<f64>,
}

impl Shape for Group {
    fn area(&self) -> f64 {
        let total: f64 = self.shapes.iter().map(|shape| shape.area()).sum();
        total * self.scale.unwrap_or(1.0)
    }

    fn describe(&self) -> String {
        let inner: Vec<String> = self.shapes.iter().map(|shape| shape.describe()).collect();
        match self.scale {
            Some(scale) => format!("group x{scale} [{}]", inner.join(", ")),
            None => format!("group [{}]", inner.join(", ")),
        }
    }
}

// ============================================================================
// Scene
// ============================================================================

#[derive(Default, Codable)]
struct Scene {
    title: String,
    layout: Option<Box<dyn Shape>>,
    named: BTreeMap<String, Box<dyn Shape>>,
}

fn load_scene(runtime: &CodecRuntime) -> Result<Scene> {
    runtime
        .decode_path::<Scene>("scene")?
        .context("the config has no `scene` section")
}

fn main() -> Result<()> {
    let runtime = CodecRuntime::builder()
        .config_file(CONFIG_FILE)
        .build()
        .context("failed to start the codable runtime")?;
    info!(stats = %runtime.stats(), "Runtime ready");

    let scene = load_scene(&runtime)?;
    info!(title = %scene.title, "Loaded scene");

    if let Some(layout) = &scene.layout {
        info!(area = layout.area(), "layout: {}", layout.describe());
    }
    for (name, shape) in &scene.named {
        info!(area = shape.area(), "{name}: {}", shape.describe());
    }

    Ok(())
}
