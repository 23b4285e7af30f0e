//! Bindable properties and the connections that attach them to colors,
//! styles and shapes.
//!
//! A [`Property`] is a named, typed value source. Its value is either a
//! stored literal or the output of an external expression evaluated through
//! a [`ScriptEvaluator`]. A [`PropertyConnection`] names which attribute of
//! its owner (the [`ConnectionPoint`]) the property drives; owners apply the
//! evaluated value through a fixed dispatch table.

use crate::color::Rgba;
use crate::geometry::Bounds;
use crate::gradient::Shader;
use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Values ──────────────────────────────────────────────────────────────

/// The type tag of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Boolean,
    Number,
    Color,
    Gradient,
    Rect,
    Text,
    Style,
}

impl PropertyKind {
    /// Display name used for freshly created properties.
    pub fn default_name(self) -> &'static str {
        match self {
            PropertyKind::Boolean => "Boolean Property",
            PropertyKind::Number => "Number Property",
            PropertyKind::Color => "Color Property",
            PropertyKind::Gradient => "Gradient Property",
            PropertyKind::Rect => "Rect Property",
            PropertyKind::Text => "Text Property",
            PropertyKind::Style => "Style Property",
        }
    }
}

/// A typed property value.
///
/// Values never point at other portfolio collections except
/// [`PropertyValue::Style`], which names a shared style by identity and is
/// resolved at the moment it is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f32),
    Color(Rgba),
    Gradient(Shader),
    Rect(Bounds),
    Text(String),
    Style(Option<EntityId>),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Boolean(_) => PropertyKind::Boolean,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Gradient(_) => PropertyKind::Gradient,
            PropertyValue::Rect(_) => PropertyKind::Rect,
            PropertyValue::Text(_) => PropertyKind::Text,
            PropertyValue::Style(_) => PropertyKind::Style,
        }
    }

    /// The literal a new property of `kind` starts with.
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Boolean => PropertyValue::Boolean(false),
            PropertyKind::Number => PropertyValue::Number(0.0),
            PropertyKind::Color => PropertyValue::Color(crate::color::presets::BLACK),
            PropertyKind::Gradient => PropertyValue::Gradient(Shader::default()),
            PropertyKind::Rect => PropertyValue::Rect(Bounds::default()),
            PropertyKind::Text => PropertyValue::Text(String::new()),
            PropertyKind::Style => PropertyValue::Style(None),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&Shader> {
        match self {
            PropertyValue::Gradient(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<Bounds> {
        match self {
            PropertyValue::Rect(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_style(&self) -> Option<EntityId> {
        match self {
            PropertyValue::Style(s) => *s,
            _ => None,
        }
    }
}

// ─── Evaluation ──────────────────────────────────────────────────────────

/// Outcome of evaluating a property or an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub successful: bool,
    pub value: Option<PropertyValue>,
}

impl Evaluation {
    pub fn success(value: PropertyValue) -> Self {
        Self {
            successful: true,
            value: Some(value),
        }
    }

    pub fn failure() -> Self {
        Self {
            successful: false,
            value: None,
        }
    }
}

/// External expression engine. The core never inspects expression syntax.
///
/// Implementations must not panic; report problems through
/// [`Evaluation::failure`].
pub trait ScriptEvaluator {
    fn evaluate(&self, expression: &str, kind: PropertyKind) -> Evaluation;
}

/// Evaluator used when no script engine is attached: every expression fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScripts;

impl ScriptEvaluator for NoScripts {
    fn evaluate(&self, _expression: &str, _kind: PropertyKind) -> Evaluation {
        Evaluation::failure()
    }
}

/// A named, typed binding source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: EntityId,
    pub name: String,
    kind: PropertyKind,
    /// When set, the value comes from `expression` instead of the literal.
    pub is_expression: bool,
    pub expression: String,
    value: PropertyValue,
}

impl Property {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            id: EntityId::generate(),
            name: kind.default_name().to_string(),
            kind,
            is_expression: false,
            expression: String::new(),
            value: PropertyValue::default_for(kind),
        }
    }

    /// A literal-valued property; the kind follows the value.
    pub fn with_value(name: &str, value: PropertyValue) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.to_string(),
            kind: value.kind(),
            is_expression: false,
            expression: String::new(),
            value,
        }
    }

    /// An expression-driven property; `fallback` is used until the first
    /// successful evaluation.
    pub fn with_expression(name: &str, expression: &str, fallback: PropertyValue) -> Self {
        Self {
            is_expression: true,
            expression: expression.to_string(),
            ..Self::with_value(name, fallback)
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// The stored literal (or the last successfully evaluated value).
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Replace the stored literal. Values of a different kind are rejected.
    pub fn set_value(&mut self, value: PropertyValue) -> bool {
        if value.kind() != self.kind {
            return false;
        }
        self.value = value;
        true
    }

    /// Produce the property's current value.
    ///
    /// Literal properties succeed with the stored value. Expression
    /// properties ask `evaluator`; a failure or a value of the wrong kind
    /// reports `successful = false` and keeps the stored value.
    pub fn evaluate(&mut self, evaluator: &dyn ScriptEvaluator) -> Evaluation {
        if !self.is_expression {
            return Evaluation::success(self.value.clone());
        }
        match evaluator.evaluate(&self.expression, self.kind) {
            Evaluation {
                successful: true,
                value: Some(value),
            } if value.kind() == self.kind => {
                self.value = value.clone();
                Evaluation::success(value)
            }
            _ => {
                log::warn!("property {:?} ({}) failed to evaluate", self.name, self.id);
                Evaluation::failure()
            }
        }
    }

    /// Copy under a fresh identity.
    pub fn duplicate(&self) -> Property {
        Property {
            id: EntityId::generate(),
            ..self.clone()
        }
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// A named attribute slot that a property can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionPoint {
    // Colors
    Color,
    AdjustsHue,
    HueAdjustment,
    AdjustsSaturation,
    SaturationAdjustment,
    AdjustsBrightness,
    BrightnessAdjustment,
    AdjustsAlpha,
    AlphaAdjustment,

    // Styles, frame side
    HasFrame,
    FrameColor,
    FrameGradient,
    FrameWidth,
    HasFrameBlur,
    FrameHorizontalBlurAmount,
    FrameVerticalBlurAmount,
    HasFrameShadow,
    FrameShadowHorizontalOffset,
    FrameShadowVerticalOffset,
    FrameShadowHorizontalBlurAmount,
    FrameShadowVerticalBlurAmount,
    FrameShadowColor,
    HasFrameJitter,
    FrameJitterLength,
    FrameJitterDeviation,
    HasFrameDash,

    // Styles, fill side
    HasFill,
    FillColor,
    FillGradient,
    HasFillBlur,
    FillHorizontalBlurAmount,
    FillVerticalBlurAmount,
    HasFillShadow,
    FillShadowHorizontalOffset,
    FillShadowVerticalOffset,
    FillShadowHorizontalBlurAmount,
    FillShadowVerticalBlurAmount,
    FillShadowColor,
    HasFillJitter,
    FillJitterLength,
    FillJitterDeviation,

    // Styles, text
    IsVerticalText,
    StrikeThruText,
    UnderlineText,
    TextScaleX,
    TextSize,
    TextSkewX,
    FontFamilyName,

    // Shapes
    Left,
    Top,
    Right,
    Bottom,
    Width,
    Height,
    Rect,
    RotationDegrees,
    Visible,
    ShapeStyle,
}

/// Ties one attribute of the owning entity to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyConnection {
    pub point: ConnectionPoint,
    pub property: EntityId,
}

/// The ordered connection list of one color, style or shape.
///
/// At most one connection exists per connection point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections(SmallVec<[PropertyConnection; 2]>);

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `point` from `property`, replacing any existing connection on
    /// the same point.
    pub fn connect(&mut self, point: ConnectionPoint, property: EntityId) {
        if let Some(existing) = self.0.iter_mut().find(|c| c.point == point) {
            existing.property = property;
            return;
        }
        self.0.push(PropertyConnection { point, property });
    }

    pub fn disconnect(&mut self, point: ConnectionPoint) -> Option<PropertyConnection> {
        let pos = self.0.iter().position(|c| c.point == point)?;
        Some(self.0.remove(pos))
    }

    /// Drop every connection driven by `property`. Returns how many went.
    pub fn remove_property(&mut self, property: EntityId) -> usize {
        let before = self.0.len();
        self.0.retain(|c| c.property != property);
        before - self.0.len()
    }

    pub fn get(&self, point: ConnectionPoint) -> Option<EntityId> {
        self.0.iter().find(|c| c.point == point).map(|c| c.property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyConnection> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PropertyConnection> {
        self.0.iter_mut()
    }

    pub fn to_vec(&self) -> Vec<PropertyConnection> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
