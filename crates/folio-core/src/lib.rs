pub mod color;
pub mod config;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod gradient;
pub mod id;
pub mod links;
pub mod portfolio;
pub mod property;
pub mod relink;
pub mod shape;
pub mod sketch;
pub mod style;

pub use color::{Color, Component, Rgba, presets};
pub use config::PortfolioConfig;
pub use error::{EntityKind, FolioError, Result};
pub use geometry::{Bounds, Point};
pub use gradient::{Gradient, GradientKind, GradientStop, Shader, ShaderStop};
pub use id::EntityId;
pub use links::{Link, Subscriptions};
pub use portfolio::{Portfolio, PortfolioEvent, increment_name};
pub use property::{
    ConnectionPoint, Evaluation, NoScripts, Property, PropertyKind, PropertyValue, ScriptEvaluator,
};
pub use relink::Reference;
pub use shape::{Handle, Shape, ShapeKind, ShapeState, ShapeStyle, SNAP_TOLERANCE};
pub use sketch::{Reorder, Sketch};
pub use style::{Paint, Side, Style, StyleKind, TextAttributes};
