//! Colors: the raw [`Rgba`] value type and the derived [`Color`] value node.
//!
//! A [`Color`] keeps an HSV baseline plus per-component adjustments. The
//! output is recomputed from `{adjustment if flagged, else baseline}` every
//! time an input changes. A color may be based on another color; the
//! portfolio re-feeds the base's value whenever the base changes.

use crate::id::EntityId;
use crate::property::{ConnectionPoint, Connections, PropertyValue};
use serde::{Deserialize, Serialize};

// ─── Raw color ───────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`; the leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.strip_prefix('#').unwrap_or(hex).as_bytes();
        if bytes.len() != 6 && bytes.len() != 8 {
            return None;
        }
        let mut channels = [255u8; 4];
        for (i, pair) in bytes.chunks(2).enumerate() {
            channels[i] = (hex_val(pair[0])? << 4) | hex_val(pair[1])?;
        }
        let [r, g, b, a] = channels;
        Some(Self::from_rgb8(r, g, b).with_alpha(a as f32 / 255.0))
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (byte(self.r), byte(self.g), byte(self.b), byte(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Decompose into `(hue°, saturation, value)` with hue in `[0, 360)` and
    /// saturation/value in `[0, 1]`.
    pub fn to_hsv(&self) -> (f32, f32, f32) {
        let (r, g, b) = (
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        );
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta <= f32::EPSILON {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max > 0.0 { delta / max } else { 0.0 };
        (hue, saturation, max)
    }

    /// Build from HSV. Hue wraps; saturation, value and alpha are clamped.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self::new(r + m, g + m, b + m, alpha.clamp(0.0, 1.0))
    }
}

impl Default for Rgba {
    fn default() -> Self {
        presets::BLACK
    }
}

/// Named swatches, including the "crayon box" palette.
pub mod presets {
    use super::Rgba;

    pub const WHITE: Rgba = Rgba::from_rgb8(255, 255, 255);
    pub const LIGHT_GRAY: Rgba = Rgba::from_rgb8(230, 230, 230);
    pub const GRAY: Rgba = Rgba::from_rgb8(128, 128, 128);
    pub const DARK_GRAY: Rgba = Rgba::from_rgb8(25, 25, 25);
    pub const BLACK: Rgba = Rgba::from_rgb8(0, 0, 0);
    pub const RED: Rgba = Rgba::from_rgb8(255, 0, 0);
    pub const GREEN: Rgba = Rgba::from_rgb8(0, 255, 0);
    pub const BLUE: Rgba = Rgba::from_rgb8(0, 0, 255);
    pub const PURPLE: Rgba = Rgba::from_rgb8(128, 0, 255);
    pub const ORANGE: Rgba = Rgba::from_rgb8(255, 128, 0);
    pub const YELLOW: Rgba = Rgba::from_rgb8(255, 255, 102);
    pub const PINK: Rgba = Rgba::from_rgb8(255, 111, 207);

    pub const MERCURY: Rgba = Rgba::from_rgb8(230, 230, 230);
    pub const SILVER: Rgba = Rgba::from_rgb8(204, 204, 204);
    pub const ALUMINUM: Rgba = Rgba::from_rgb8(153, 153, 153);
    pub const STEEL: Rgba = Rgba::from_rgb8(102, 102, 102);
    pub const TUNGSTEN: Rgba = Rgba::from_rgb8(51, 51, 51);
    pub const MAROON: Rgba = Rgba::from_rgb8(128, 0, 64);
    pub const PLUM: Rgba = Rgba::from_rgb8(128, 0, 128);
    pub const MIDNIGHT: Rgba = Rgba::from_rgb8(0, 0, 128);
    pub const OCEAN: Rgba = Rgba::from_rgb8(0, 64, 128);
    pub const TEAL: Rgba = Rgba::from_rgb8(0, 128, 128);
    pub const MOSS: Rgba = Rgba::from_rgb8(0, 128, 64);
    pub const FERN: Rgba = Rgba::from_rgb8(64, 128, 0);
    pub const MOCHA: Rgba = Rgba::from_rgb8(128, 64, 0);
    pub const CAYENNE: Rgba = Rgba::from_rgb8(128, 0, 0);
    pub const STRAWBERRY: Rgba = Rgba::from_rgb8(255, 0, 128);
    pub const MAGENTA: Rgba = Rgba::from_rgb8(255, 0, 255);
    pub const AQUA: Rgba = Rgba::from_rgb8(0, 128, 255);
    pub const TURQUOISE: Rgba = Rgba::from_rgb8(0, 255, 255);
    pub const LIME: Rgba = Rgba::from_rgb8(128, 255, 0);
    pub const LEMON: Rgba = Rgba::from_rgb8(255, 255, 0);
    pub const LAVENDER: Rgba = Rgba::from_rgb8(204, 102, 255);
    pub const SKY: Rgba = Rgba::from_rgb8(102, 204, 255);
    pub const SALMON: Rgba = Rgba::from_rgb8(255, 102, 102);
    pub const BANANA: Rgba = Rgba::from_rgb8(255, 255, 102);
}

// ─── Color value node ────────────────────────────────────────────────────

/// One HSV-plus-alpha component of a [`Color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Hue,
    Saturation,
    Brightness,
    Alpha,
}

/// Baseline value, adjust flag and adjustment magnitude of one component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub baseline: f32,
    pub adjusts: bool,
    pub adjustment: f32,
}

impl Channel {
    fn output(&self) -> f32 {
        if self.adjusts {
            self.adjustment
        } else {
            self.baseline
        }
    }

    /// Capture a new baseline. Unadjusted channels also track it as their
    /// magnitude so that switching `adjusts` on starts from the current value.
    fn capture(&mut self, value: f32) {
        self.baseline = value;
        if !self.adjusts {
            self.adjustment = value;
        }
    }
}

/// A named color that is either a literal or derived from a base color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub id: EntityId,
    pub name: String,
    pub(crate) base: Option<EntityId>,
    hue: Channel,
    saturation: Channel,
    brightness: Channel,
    alpha: Channel,
    value: Rgba,
    #[serde(skip)]
    revision: u64,
    pub connections: Connections,
}

const COLOR_POINTS: &[ConnectionPoint] = &[
    ConnectionPoint::Color,
    ConnectionPoint::AdjustsHue,
    ConnectionPoint::HueAdjustment,
    ConnectionPoint::AdjustsSaturation,
    ConnectionPoint::SaturationAdjustment,
    ConnectionPoint::AdjustsBrightness,
    ConnectionPoint::BrightnessAdjustment,
    ConnectionPoint::AdjustsAlpha,
    ConnectionPoint::AlphaAdjustment,
];

impl Color {
    /// A black color named `name`.
    pub fn new(name: &str) -> Self {
        Self::from_rgba(name, presets::BLACK)
    }

    pub fn from_rgba(name: &str, value: Rgba) -> Self {
        let mut color = Self {
            id: EntityId::generate(),
            name: name.to_string(),
            base: None,
            hue: Channel::default(),
            saturation: Channel::default(),
            brightness: Channel::default(),
            alpha: Channel {
                baseline: 1.0,
                adjusts: false,
                adjustment: 1.0,
            },
            value: presets::BLACK,
            revision: 0,
            connections: Connections::new(),
        };
        color.set_color(value);
        color
    }

    /// The computed output value.
    pub fn value(&self) -> Rgba {
        self.value
    }

    /// The color this one derives from, if any.
    pub fn base(&self) -> Option<EntityId> {
        self.base
    }

    /// Bumped on every recompute; listeners must treat repeats as idempotent.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn channel(&self, component: Component) -> &Channel {
        match component {
            Component::Hue => &self.hue,
            Component::Saturation => &self.saturation,
            Component::Brightness => &self.brightness,
            Component::Alpha => &self.alpha,
        }
    }

    fn channel_mut(&mut self, component: Component) -> &mut Channel {
        match component {
            Component::Hue => &mut self.hue,
            Component::Saturation => &mut self.saturation,
            Component::Brightness => &mut self.brightness,
            Component::Alpha => &mut self.alpha,
        }
    }

    /// Compose a new raw value: decompose it and capture every component as
    /// the new baseline, then recompute.
    pub fn set_color(&mut self, value: Rgba) {
        let (h, s, v) = value.to_hsv();
        self.hue.capture(h);
        self.saturation.capture(s);
        self.brightness.capture(v);
        self.alpha.capture(value.a.clamp(0.0, 1.0));
        self.recompute();
    }

    pub fn adjusts(&self, component: Component) -> bool {
        self.channel(component).adjusts
    }

    pub fn set_adjusts(&mut self, component: Component, adjusts: bool) {
        self.channel_mut(component).adjusts = adjusts;
        self.recompute();
    }

    pub fn adjustment(&self, component: Component) -> f32 {
        self.channel(component).adjustment
    }

    pub fn set_adjustment(&mut self, component: Component, amount: f32) {
        self.channel_mut(component).adjustment = amount;
        self.recompute();
    }

    /// Rebuild the output from the channels. Always counts as a change, even
    /// when the value is numerically identical.
    pub fn recompute(&mut self) {
        self.value = Rgba::from_hsv(
            self.hue.output(),
            self.saturation.output(),
            self.brightness.output(),
            self.alpha.output(),
        );
        self.revision += 1;
        log::trace!("color {} -> {}", self.id, self.value.to_hex());
    }

    /// Store the base link and re-derive. The caller owns subscriptions.
    pub(crate) fn rebase(&mut self, base: Option<(EntityId, Rgba)>) {
        match base {
            Some((id, value)) => {
                self.base = Some(id);
                self.set_color(value);
            }
            None => {
                self.base = None;
                self.recompute();
            }
        }
    }

    pub fn connection_points(&self) -> &'static [ConnectionPoint] {
        COLOR_POINTS
    }

    /// Dispatch an evaluated property value onto the attribute named by
    /// `point`. Returns `false` when the point does not belong to colors or
    /// the value has the wrong type.
    pub fn apply_connection(&mut self, point: ConnectionPoint, value: &PropertyValue) -> bool {
        use ConnectionPoint as P;
        let flag = |c| value.as_bool().map(|b| (c, b));
        let amount = |c| value.as_number().map(|n| (c, n));
        match point {
            P::Color => match value.as_color() {
                Some(c) => {
                    self.set_color(c);
                    true
                }
                None => false,
            },
            P::AdjustsHue | P::AdjustsSaturation | P::AdjustsBrightness | P::AdjustsAlpha => {
                let component = match point {
                    P::AdjustsHue => Component::Hue,
                    P::AdjustsSaturation => Component::Saturation,
                    P::AdjustsBrightness => Component::Brightness,
                    _ => Component::Alpha,
                };
                match flag(component) {
                    Some((c, b)) => {
                        self.set_adjusts(c, b);
                        true
                    }
                    None => false,
                }
            }
            P::HueAdjustment
            | P::SaturationAdjustment
            | P::BrightnessAdjustment
            | P::AlphaAdjustment => {
                let component = match point {
                    P::HueAdjustment => Component::Hue,
                    P::SaturationAdjustment => Component::Saturation,
                    P::BrightnessAdjustment => Component::Brightness,
                    _ => Component::Alpha,
                };
                match amount(component) {
                    Some((c, n)) => {
                        self.set_adjustment(c, n);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Copy under a fresh identity, keeping the base link.
    pub fn duplicate(&self) -> Color {
        Color {
            id: EntityId::generate(),
            ..self.clone()
        }
    }
}
