//! Gradients: stop lists whose colors may track portfolio colors, and the
//! shader description they derive.

use crate::color::{Rgba, presets};
use crate::geometry::{Bounds, Point};
use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Sweep,
}

/// A resolved color stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShaderStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Shader description handed to the rendering backend.
///
/// Coordinates are in unit space (`0..1` across the shape) until
/// [`Shader::conform_to`] maps them onto concrete bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shader {
    pub kind: GradientKind,
    pub start: Point,
    pub end: Point,
    pub radius: f32,
    pub stops: SmallVec<[ShaderStop; 4]>,
}

impl Default for Shader {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            start: Point::new(0.0, 0.0),
            end: Point::new(1.0, 0.0),
            radius: 0.5,
            stops: SmallVec::from_slice(&[
                ShaderStop {
                    offset: 0.0,
                    color: presets::BLACK,
                },
                ShaderStop {
                    offset: 1.0,
                    color: presets::WHITE,
                },
            ]),
        }
    }
}

impl Shader {
    /// Map the unit-space geometry onto `bounds`.
    pub fn conform_to(&self, bounds: &Bounds) -> Shader {
        let map = |p: Point| {
            Point::new(
                bounds.left + p.x * bounds.width(),
                bounds.top + p.y * bounds.height(),
            )
        };
        Shader {
            start: map(self.start),
            end: map(self.end),
            radius: self.radius * bounds.width().max(bounds.height()),
            ..self.clone()
        }
    }
}

/// One stop of a [`Gradient`]; its color follows `linked_color` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    color: Rgba,
    pub(crate) linked_color: Option<EntityId>,
}

impl GradientStop {
    pub fn new(offset: f32, color: Rgba) -> Self {
        Self {
            offset: offset.clamp(0.0, 1.0),
            color,
            linked_color: None,
        }
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn linked_color(&self) -> Option<EntityId> {
        self.linked_color
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub id: EntityId,
    pub name: String,
    kind: GradientKind,
    start: Point,
    end: Point,
    radius: f32,
    stops: Vec<GradientStop>,
    shader: Shader,
    #[serde(skip)]
    revision: u64,
}

impl Gradient {
    /// A black-to-white linear gradient.
    pub fn new(name: &str) -> Self {
        let mut gradient = Self {
            id: EntityId::generate(),
            name: name.to_string(),
            kind: GradientKind::Linear,
            start: Point::new(0.0, 0.0),
            end: Point::new(1.0, 0.0),
            radius: 0.5,
            stops: vec![
                GradientStop::new(0.0, presets::BLACK),
                GradientStop::new(1.0, presets::WHITE),
            ],
            shader: Shader::default(),
            revision: 0,
        };
        gradient.refresh();
        gradient
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: GradientKind) {
        self.kind = kind;
        self.refresh();
    }

    /// Set the unit-space axis (linear), center (radial, sweep) and radius.
    pub fn set_geometry(&mut self, start: Point, end: Point, radius: f32) {
        self.start = start;
        self.end = end;
        self.radius = radius.max(0.0);
        self.refresh();
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Insert a stop keeping the list ordered by offset. Returns its index.
    pub fn add_stop(&mut self, offset: f32, color: Rgba) -> usize {
        let stop = GradientStop::new(offset, color);
        let index = self
            .stops
            .iter()
            .position(|s| s.offset > stop.offset)
            .unwrap_or(self.stops.len());
        self.stops.insert(index, stop);
        self.refresh();
        index
    }

    /// Remove a stop; returns it together with its color link.
    pub fn remove_stop(&mut self, index: usize) -> Option<GradientStop> {
        if index >= self.stops.len() {
            return None;
        }
        let stop = self.stops.remove(index);
        self.refresh();
        Some(stop)
    }

    /// Set a stop's literal color. Ignored while the stop tracks a color.
    pub fn set_stop_color(&mut self, index: usize, color: Rgba) -> bool {
        match self.stops.get_mut(index) {
            Some(stop) if stop.linked_color.is_none() => {
                stop.color = color;
                self.refresh();
                true
            }
            _ => false,
        }
    }

    /// Store a stop's color link and take over its current value.
    pub(crate) fn link_stop(&mut self, index: usize, link: Option<(EntityId, Rgba)>) -> bool {
        let Some(stop) = self.stops.get_mut(index) else {
            return false;
        };
        match link {
            Some((id, value)) => {
                stop.linked_color = Some(id);
                stop.color = value;
            }
            None => stop.linked_color = None,
        }
        self.refresh();
        true
    }

    /// Distinct colors the stops track.
    pub fn linked_colors(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = Vec::new();
        for id in self.stops.iter().filter_map(|s| s.linked_color) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// A linked color recomputed. Every stop tracking it takes the new value.
    pub fn on_linked_color_changed(&mut self, color: EntityId, value: Rgba) -> bool {
        let mut touched = false;
        for stop in self.stops.iter_mut().filter(|s| s.linked_color == Some(color)) {
            stop.color = value;
            touched = true;
        }
        if touched {
            self.refresh();
        }
        touched
    }

    /// Drop every link to `color`, baking `last` into the stops.
    pub fn unlink_color(&mut self, color: EntityId, last: Rgba) -> bool {
        let mut touched = false;
        for stop in self.stops.iter_mut().filter(|s| s.linked_color == Some(color)) {
            stop.color = last;
            stop.linked_color = None;
            touched = true;
        }
        if touched {
            self.refresh();
        }
        touched
    }

    /// Rewrite stop links through `resolve`, used when relinking a clone.
    pub(crate) fn relink_stops<E>(
        &mut self,
        mut resolve: impl FnMut(EntityId) -> Result<EntityId, E>,
    ) -> Result<(), E> {
        for stop in &mut self.stops {
            if let Some(id) = stop.linked_color {
                stop.linked_color = Some(resolve(id)?);
            }
        }
        Ok(())
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn refresh(&mut self) {
        self.shader = Shader {
            kind: self.kind,
            start: self.start,
            end: self.end,
            radius: self.radius,
            stops: self
                .stops
                .iter()
                .map(|s| ShaderStop {
                    offset: s.offset,
                    color: s.color,
                })
                .collect(),
        };
        self.revision += 1;
    }

    /// Copy under a fresh identity, keeping stop links.
    pub fn duplicate(&self) -> Gradient {
        Gradient {
            id: EntityId::generate(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stops_stay_ordered() {
        let mut g = Gradient::new("Sunset");
        let index = g.add_stop(0.5, presets::ORANGE);
        assert_eq!(index, 1);
        let offsets: Vec<f32> = g.stops().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
        assert_eq!(g.shader().stops.len(), 3);
    }

    #[test]
    fn linked_stop_follows_then_bakes() {
        let red = EntityId::intern("grad-test-red");
        let mut g = Gradient::new("Linked");
        assert!(g.link_stop(0, Some((red, presets::RED))));
        assert!(!g.set_stop_color(0, presets::BLUE));

        assert!(g.on_linked_color_changed(red, presets::MAROON));
        assert_eq!(g.shader().stops[0].color, presets::MAROON);

        assert!(g.unlink_color(red, presets::MAROON));
        assert_eq!(g.stops()[0].linked_color(), None);
        assert_eq!(g.stops()[0].color(), presets::MAROON);
        assert!(g.linked_colors().is_empty());
    }

    #[test]
    fn shader_conforms_to_bounds() {
        let g = Gradient::new("Axis");
        let shader = g.shader().conform_to(&Bounds::new(10.0, 20.0, 110.0, 70.0));
        assert_eq!(shader.start, Point::new(10.0, 20.0));
        assert_eq!(shader.end, Point::new(110.0, 20.0));
        assert_eq!(shader.radius, 50.0);
    }
}
