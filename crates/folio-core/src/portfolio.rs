//! The portfolio: root aggregate of sketches, styles, colors, gradients
//! and properties.
//!
//! All cross references between entities are ids into the portfolio's own
//! collections. Value changes travel along the [`Subscriptions`] graph:
//! every mutator updates the entity, then pushes the new value to each
//! subscriber before returning.
//!
//! Structural mutators follow one protocol: request an undo point, mutate,
//! then announce the affected entity.

use crate::color::{Color, Rgba};
use crate::config::PortfolioConfig;
use crate::error::{EntityKind, FolioError, Result};
use crate::gradient::Gradient;
use crate::id::EntityId;
use crate::links::{Link, Subscriptions};
use crate::property::{
    ConnectionPoint, Evaluation, Property, PropertyConnection, PropertyKind, PropertyValue,
    ScriptEvaluator,
};
use crate::shape::{Shape, ShapeStyle};
use crate::sketch::{Reorder, Sketch};
use crate::style::{Side, Style, StyleKind};
use std::collections::VecDeque;
use std::fmt;

/// Upper bound on deliveries per change; only exceeded by cyclic links.
const PROPAGATION_LIMIT: usize = 100_000;

/// Document-level notifications, the only channel UI code observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioEvent {
    /// Raised immediately before a user-initiated mutation.
    UndoPointRequested,
    SketchesModified,
    SelectedSketchWillChange(Option<EntityId>),
    SelectedSketchDidChange(Option<EntityId>),
    SelectedShapeChanged(Option<EntityId>),
    /// Shapes of the given sketch were added, removed or edited.
    ShapesModified(EntityId),
    /// `None` after a deletion.
    ColorsModified(Option<EntityId>),
    GradientsModified(Option<EntityId>),
    StylesModified(Option<EntityId>),
    PropertiesModified(Option<EntityId>),
    /// The whole document was replaced from a snapshot.
    Restored,
}

pub type Listener = Box<dyn FnMut(&PortfolioEvent)>;

/// "Red" → "Red 1" → "Red 2".
pub fn increment_name(name: &str) -> String {
    if let Some((stem, suffix)) = name.rsplit_once(' ')
        && let Ok(n) = suffix.parse::<u32>()
    {
        return format!("{stem} {}", n + 1);
    }
    format!("{name} 1")
}

pub struct Portfolio {
    pub id: EntityId,
    pub name: String,
    pub(crate) config: PortfolioConfig,
    pub(crate) sketches: Vec<Sketch>,
    pub(crate) styles: Vec<Style>,
    pub(crate) colors: Vec<Color>,
    pub(crate) gradients: Vec<Gradient>,
    pub(crate) properties: Vec<Property>,
    pub(crate) selected_sketch: Option<EntityId>,
    pub(crate) sketch_counter: u32,
    pub(crate) subscriptions: Subscriptions,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portfolio")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sketches", &self.sketches.len())
            .field("styles", &self.styles.len())
            .field("colors", &self.colors.len())
            .field("gradients", &self.gradients.len())
            .field("properties", &self.properties.len())
            .field("selected_sketch", &self.selected_sketch)
            .finish_non_exhaustive()
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new()
    }
}

impl Portfolio {
    /// A portfolio holding one empty sketch and the Default style.
    pub fn new() -> Self {
        Self::with_config(PortfolioConfig::default())
    }

    pub fn with_config(config: PortfolioConfig) -> Self {
        let mut portfolio = Self::empty(config);
        let style = Style::new(&portfolio.config.default_style_name, StyleKind::Default);
        portfolio.styles.push(style);
        portfolio.add_sketch();
        portfolio
    }

    /// No sketches, no styles. Used as the target of a deep clone.
    pub(crate) fn empty(config: PortfolioConfig) -> Self {
        Self {
            id: EntityId::generate(),
            name: "Portfolio".to_string(),
            config,
            sketches: Vec::new(),
            styles: Vec::new(),
            colors: Vec::new(),
            gradients: Vec::new(),
            properties: Vec::new(),
            selected_sketch: None,
            sketch_counter: 0,
            subscriptions: Subscriptions::new(),
            listeners: Vec::new(),
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn on_event(&mut self, listener: impl FnMut(&PortfolioEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: PortfolioEvent) {
        log::trace!("portfolio event {event:?}");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Replace the document with `snapshot`, keeping this portfolio's
    /// listeners.
    pub fn restore(&mut self, snapshot: Portfolio) {
        let listeners = std::mem::take(&mut self.listeners);
        *self = snapshot;
        self.listeners = listeners;
        log::debug!("portfolio {} restored", self.id);
        self.emit(PortfolioEvent::Restored);
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn sketches(&self) -> &[Sketch] {
        &self.sketches
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn gradients(&self) -> &[Gradient] {
        &self.gradients
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub fn find_sketch(&self, id: EntityId) -> Option<&Sketch> {
        self.sketches.iter().find(|s| s.id == id)
    }

    pub fn find_color(&self, id: EntityId) -> Option<&Color> {
        self.colors.iter().find(|c| c.id == id)
    }

    pub fn find_gradient(&self, id: EntityId) -> Option<&Gradient> {
        self.gradients.iter().find(|g| g.id == id)
    }

    /// A shared style from the collection.
    pub fn find_style(&self, id: EntityId) -> Option<&Style> {
        self.styles.iter().find(|s| s.id == id)
    }

    pub fn find_property(&self, id: EntityId) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn find_shape(&self, id: EntityId) -> Option<&Shape> {
        self.sketches.iter().find_map(|s| s.find_shape(id))
    }

    /// The sketch holding shape `id`.
    pub fn sketch_of_shape(&self, id: EntityId) -> Option<&Sketch> {
        self.sketches.iter().find(|s| s.find_shape(id).is_some())
    }

    /// The style a shape paints with, shared or owned.
    pub fn shape_style(&self, shape: EntityId) -> Option<&Style> {
        match self.find_shape(shape)?.style() {
            ShapeStyle::Shared(id) => self.find_style(*id),
            ShapeStyle::Owned(style) => Some(style),
        }
    }

    /// A shared style or a shape-owned one.
    pub fn find_any_style(&self, id: EntityId) -> Option<&Style> {
        if let Some(style) = self.find_style(id) {
            return Some(style);
        }
        let mut found = None;
        for sketch in &self.sketches {
            sketch.walk(&mut |shape| {
                if let ShapeStyle::Owned(style) = shape.style()
                    && style.id == id
                {
                    found = Some(&**style);
                }
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    pub fn contains_entity(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Color => self.find_color(id).is_some(),
            EntityKind::Gradient => self.find_gradient(id).is_some(),
            EntityKind::Style => self.find_style(id).is_some(),
            EntityKind::Property => self.find_property(id).is_some(),
            EntityKind::Shape => self.find_shape(id).is_some(),
            EntityKind::Sketch => self.find_sketch(id).is_some(),
        }
    }

    fn color_index(&self, id: EntityId) -> Result<usize> {
        self.colors
            .iter()
            .position(|c| c.id == id)
            .ok_or(FolioError::not_found(EntityKind::Color, id))
    }

    fn gradient_index(&self, id: EntityId) -> Result<usize> {
        self.gradients
            .iter()
            .position(|g| g.id == id)
            .ok_or(FolioError::not_found(EntityKind::Gradient, id))
    }

    fn style_index(&self, id: EntityId) -> Result<usize> {
        self.styles
            .iter()
            .position(|s| s.id == id)
            .ok_or(FolioError::not_found(EntityKind::Style, id))
    }

    fn property_index(&self, id: EntityId) -> Result<usize> {
        self.properties
            .iter()
            .position(|p| p.id == id)
            .ok_or(FolioError::not_found(EntityKind::Property, id))
    }

    fn sketch_index(&self, id: EntityId) -> Result<usize> {
        self.sketches
            .iter()
            .position(|s| s.id == id)
            .ok_or(FolioError::not_found(EntityKind::Sketch, id))
    }

    fn color_value(&self, id: EntityId) -> Result<Rgba> {
        self.find_color(id)
            .map(Color::value)
            .ok_or(FolioError::not_found(EntityKind::Color, id))
    }

    /// Shared or shape-owned style, mutably.
    fn style_mut(&mut self, id: EntityId) -> Option<&mut Style> {
        if let Some(pos) = self.styles.iter().position(|s| s.id == id) {
            return self.styles.get_mut(pos);
        }
        self.sketches
            .iter_mut()
            .find_map(|s| s.find_owned_style_mut(id))
    }

    fn shape_mut(&mut self, id: EntityId) -> Option<&mut Shape> {
        self.sketches.iter_mut().find_map(|s| s.find_shape_mut(id))
    }

    fn require_style(&self, id: EntityId) -> Result<()> {
        match self.find_any_style(id) {
            Some(_) => Ok(()),
            None => Err(FolioError::not_found(EntityKind::Style, id)),
        }
    }

    // ─── Propagation ─────────────────────────────────────────────────────

    /// Push the current value of `source` to every subscriber, transitively,
    /// before returning.
    pub(crate) fn propagate(&mut self, source: EntityId) {
        let mut queue = VecDeque::from([source]);
        let mut steps = 0usize;
        while let Some(id) = queue.pop_front() {
            for (subscriber, link) in self.subscriptions.subscribers(id) {
                steps += 1;
                debug_assert!(
                    steps < PROPAGATION_LIMIT,
                    "change propagation from {source} does not settle; cyclic links?"
                );
                if self.deliver(id, subscriber, link) {
                    queue.push_back(subscriber);
                }
            }
        }
    }

    /// Apply one source change to one subscriber. Returns whether the
    /// subscriber changed in a way its own subscribers must see.
    fn deliver(&mut self, source: EntityId, subscriber: EntityId, link: Link) -> bool {
        log::trace!("deliver {source} -> {subscriber} ({link:?})");
        match link {
            Link::Base => {
                let Ok(value) = self.color_value(source) else {
                    return false;
                };
                match self.colors.iter_mut().find(|c| c.id == subscriber) {
                    Some(color) => {
                        color.set_color(value);
                        true
                    }
                    None => false,
                }
            }
            Link::GradientStop => {
                let Ok(value) = self.color_value(source) else {
                    return false;
                };
                self.gradients
                    .iter_mut()
                    .find(|g| g.id == subscriber)
                    .is_some_and(|g| g.on_linked_color_changed(source, value))
            }
            Link::Color(_) | Link::ShadowColor(_) => {
                if let Ok(value) = self.color_value(source)
                    && let Some(style) = self.style_mut(subscriber)
                {
                    style.on_color_changed(link, value);
                }
                false
            }
            Link::Gradient(side) => {
                let Some(shader) = self.find_gradient(source).map(|g| g.shader().clone()) else {
                    return false;
                };
                if let Some(style) = self.style_mut(subscriber) {
                    style.on_gradient_changed(side, &shader);
                }
                false
            }
        }
    }

    fn subscribe_style(&mut self, style: &Style) {
        for (source, link) in style.links() {
            self.subscriptions.subscribe(source, style.id, link);
        }
    }

    /// Subscribe every owned style in a shape subtree.
    fn register_shape(&mut self, shape: &Shape) {
        let mut owned = Vec::new();
        shape.walk(&mut |s| {
            if let ShapeStyle::Owned(style) = s.style() {
                owned.push((style.id, style.links()));
            }
        });
        for (id, links) in owned {
            for (source, link) in links {
                self.subscriptions.subscribe(source, id, link);
            }
        }
    }

    /// Drop the subscriptions of every owned style in a shape subtree.
    fn unregister_shape(&mut self, shape: &Shape) {
        shape.walk(&mut |s| {
            if let ShapeStyle::Owned(style) = s.style() {
                self.subscriptions.remove(style.id);
            }
        });
    }

    /// Rebuild the subscription graph from the links stored on entities.
    pub(crate) fn rebuild_subscriptions(&mut self) {
        let mut subscriptions = Subscriptions::new();
        for color in &self.colors {
            if let Some(base) = color.base() {
                subscriptions.subscribe(base, color.id, Link::Base);
            }
        }
        for gradient in &self.gradients {
            for color in gradient.linked_colors() {
                subscriptions.subscribe(color, gradient.id, Link::GradientStop);
            }
        }
        for style in &self.styles {
            for (source, link) in style.links() {
                subscriptions.subscribe(source, style.id, link);
            }
        }
        for sketch in &self.sketches {
            sketch.walk(&mut |shape| {
                if let ShapeStyle::Owned(style) = shape.style() {
                    for (source, link) in style.links() {
                        subscriptions.subscribe(source, style.id, link);
                    }
                }
            });
        }
        self.subscriptions = subscriptions;
    }

    // ─── Sketches ────────────────────────────────────────────────────────

    pub fn selected_sketch(&self) -> Option<&Sketch> {
        self.selected_sketch.and_then(|id| self.find_sketch(id))
    }

    pub fn select_sketch(&mut self, id: Option<EntityId>) -> Result<()> {
        if let Some(id) = id {
            self.sketch_index(id)?;
        }
        self.emit(PortfolioEvent::SelectedSketchWillChange(self.selected_sketch));
        self.selected_sketch = id;
        self.emit(PortfolioEvent::SelectedSketchDidChange(id));
        Ok(())
    }

    /// Add "Untitled N" and select it.
    pub fn add_sketch(&mut self) -> EntityId {
        self.emit(PortfolioEvent::UndoPointRequested);
        let name = loop {
            self.sketch_counter += 1;
            let name = format!("{} {}", self.config.sketch_name_prefix, self.sketch_counter);
            if !self.sketches.iter().any(|s| s.name == name) {
                break name;
            }
        };
        let sketch = Sketch::new(&name);
        let id = sketch.id;
        self.sketches.push(sketch);
        log::debug!("added sketch {name:?} ({id})");
        self.change_selected_sketch(Some(id));
        self.emit(PortfolioEvent::SketchesModified);
        id
    }

    fn change_selected_sketch(&mut self, id: Option<EntityId>) {
        self.emit(PortfolioEvent::SelectedSketchWillChange(self.selected_sketch));
        self.selected_sketch = id;
        self.emit(PortfolioEvent::SelectedSketchDidChange(id));
    }

    /// Copy the selected sketch under an incremented name and select it.
    pub fn duplicate_selected_sketch(&mut self) -> Option<EntityId> {
        let source = self.selected_sketch()?;
        let mut copy = source.duplicate();
        let mut name = increment_name(&source.name);
        while self.sketches.iter().any(|s| s.name == name) {
            name = increment_name(&name);
        }
        copy.name = name;
        let id = copy.id;

        self.emit(PortfolioEvent::UndoPointRequested);
        for shape in copy.shapes() {
            self.register_shape(shape);
        }
        self.sketches.push(copy);
        log::debug!("duplicated sketch into {id}");
        self.change_selected_sketch(Some(id));
        self.emit(PortfolioEvent::SketchesModified);
        Some(id)
    }

    /// Remove the selected sketch and select the first remaining one.
    pub fn delete_selected_sketch(&mut self) -> Option<Sketch> {
        let index = self.sketch_index(self.selected_sketch?).ok()?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let removed = self.sketches.remove(index);
        for shape in removed.shapes() {
            self.unregister_shape(shape);
        }
        log::debug!("deleted sketch {}", removed.id);
        let next = self.sketches.first().map(|s| s.id);
        self.change_selected_sketch(next);
        self.emit(PortfolioEvent::SketchesModified);
        Some(removed)
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    /// Select a shape in the selected sketch.
    pub fn select_shape(&mut self, id: Option<EntityId>) -> Result<()> {
        let sketch_id = self
            .selected_sketch
            .ok_or(FolioError::not_found(EntityKind::Sketch, self.id))?;
        let index = self.sketch_index(sketch_id)?;
        self.sketches[index].select_shape(id)?;
        self.emit(PortfolioEvent::SelectedShapeChanged(id));
        Ok(())
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        let sketch = self.selected_sketch()?;
        sketch.find_shape(sketch.selected_shape()?)
    }

    pub fn add_shape(&mut self, sketch: EntityId, shape: Shape) -> Result<EntityId> {
        let index = self.sketch_index(sketch)?;
        if let Some(style) = shape.style().shared_id() {
            self.style_index(style)?;
        }
        self.emit(PortfolioEvent::UndoPointRequested);
        self.register_shape(&shape);
        let id = self.sketches[index].push_shape(shape);
        self.emit(PortfolioEvent::ShapesModified(sketch));
        Ok(id)
    }

    pub fn delete_shape(&mut self, id: EntityId) -> Result<Shape> {
        let index = self
            .sketches
            .iter()
            .position(|s| s.find_shape(id).is_some())
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let sketch = &mut self.sketches[index];
        let had_selection = sketch.selected_shape().is_some();
        let removed = sketch
            .take_shape(id)
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        let sketch_id = sketch.id;
        let lost_selection = had_selection && sketch.selected_shape().is_none();
        self.unregister_shape(&removed);
        self.emit(PortfolioEvent::ShapesModified(sketch_id));
        if lost_selection {
            self.emit(PortfolioEvent::SelectedShapeChanged(None));
        }
        Ok(removed)
    }

    /// Edit a shape's geometry or flags.
    pub fn update_shape<R>(&mut self, id: EntityId, edit: impl FnOnce(&mut Shape) -> R) -> Result<R> {
        let sketch_id = self
            .sketch_of_shape(id)
            .map(|s| s.id)
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let shape = self
            .shape_mut(id)
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        let result = edit(shape);
        self.emit(PortfolioEvent::ShapesModified(sketch_id));
        Ok(result)
    }

    /// Wrap top-level shapes of a sketch into a new group.
    pub fn group_shapes(&mut self, sketch: EntityId, ids: &[EntityId]) -> Result<EntityId> {
        let index = self.sketch_index(sketch)?;
        for &id in ids {
            if !self.sketches[index].shapes().iter().any(|s| s.id == id) {
                return Err(FolioError::not_found(EntityKind::Shape, id));
            }
        }
        self.emit(PortfolioEvent::UndoPointRequested);
        let group = self.sketches[index]
            .group_shapes(ids)
            .ok_or(FolioError::not_found(EntityKind::Shape, sketch))?;
        self.emit(PortfolioEvent::ShapesModified(sketch));
        Ok(group)
    }

    /// Move a top-level shape in paint order. `Ok(false)` when it is already
    /// at the requested end.
    pub fn reorder_shape(&mut self, id: EntityId, to: Reorder) -> Result<bool> {
        let index = self
            .sketches
            .iter()
            .position(|s| s.shapes().iter().any(|shape| shape.id == id))
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let moved = self.sketches[index].reorder(id, to);
        if moved {
            let sketch = self.sketches[index].id;
            self.emit(PortfolioEvent::ShapesModified(sketch));
        }
        Ok(moved)
    }

    fn replace_shape_style(&mut self, shape: EntityId, style: ShapeStyle) -> Result<()> {
        if let ShapeStyle::Owned(owned) = &style {
            self.subscribe_style(owned);
        }
        let target = self
            .shape_mut(shape)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?;
        let previous = std::mem::replace(&mut target.style, style);
        if let ShapeStyle::Owned(old) = previous {
            self.subscriptions.remove(old.id);
        }
        Ok(())
    }

    /// Point a shape at a shared style.
    pub fn use_shared_style(&mut self, shape: EntityId, style: EntityId) -> Result<()> {
        self.style_index(style)?;
        let sketch = self
            .sketch_of_shape(shape)
            .map(|s| s.id)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        self.replace_shape_style(shape, ShapeStyle::Shared(style))?;
        self.emit(PortfolioEvent::ShapesModified(sketch));
        Ok(())
    }

    /// Give a shape its own copy of the shared style it uses. Returns the
    /// owned style's id.
    pub fn detach_shape_style(&mut self, shape: EntityId) -> Result<EntityId> {
        let current = self
            .find_shape(shape)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?
            .style()
            .clone();
        let shared_id = match current {
            ShapeStyle::Owned(style) => return Ok(style.id),
            ShapeStyle::Shared(id) => id,
        };
        let shared = self
            .find_style(shared_id)
            .ok_or(FolioError::DanglingReference {
                kind: EntityKind::Style,
                id: shared_id,
            })?;
        let mut owned = shared.duplicate();
        owned.set_kind(shared.kind().owned());
        let id = owned.id;
        let sketch = self
            .sketch_of_shape(shape)
            .map(|s| s.id)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?;

        self.emit(PortfolioEvent::UndoPointRequested);
        self.replace_shape_style(shape, ShapeStyle::Owned(Box::new(owned)))?;
        self.emit(PortfolioEvent::ShapesModified(sketch));
        Ok(id)
    }

    /// Move a shape's owned style into the shared collection as a Standard
    /// (or Text) style named after the shape.
    pub fn promote_shape_style(&mut self, shape: EntityId) -> Result<EntityId> {
        let found = self
            .find_shape(shape)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?;
        let mut style = match found.style() {
            ShapeStyle::Shared(id) => return Ok(*id),
            ShapeStyle::Owned(style) => style.clone(),
        };
        let id = style.id;
        let name = format!("{} Style", found.name);

        self.emit(PortfolioEvent::UndoPointRequested);
        let target = self
            .shape_mut(shape)
            .ok_or(FolioError::not_found(EntityKind::Shape, shape))?;
        target.style = ShapeStyle::Shared(id);
        style.set_kind(style.kind().shared());
        style.name = name;
        self.styles.push(*style);
        log::debug!("promoted style of shape {shape} to shared style {id}");
        self.emit(PortfolioEvent::StylesModified(Some(id)));
        Ok(id)
    }

    // ─── Colors ──────────────────────────────────────────────────────────

    pub fn add_color(&mut self, name: &str, value: Rgba) -> EntityId {
        self.emit(PortfolioEvent::UndoPointRequested);
        let name = if name.is_empty() {
            self.config.color_name.clone()
        } else {
            name.to_string()
        };
        let color = Color::from_rgba(&name, value);
        let id = color.id;
        self.colors.push(color);
        log::debug!("added color {name:?} ({id})");
        self.emit(PortfolioEvent::ColorsModified(Some(id)));
        id
    }

    /// Copy a color (keeping its base) under an incremented name.
    pub fn duplicate_color(&mut self, id: EntityId) -> Result<EntityId> {
        let index = self.color_index(id)?;
        let mut copy = self.colors[index].duplicate();
        copy.name = increment_name(&copy.name);
        let new_id = copy.id;

        self.emit(PortfolioEvent::UndoPointRequested);
        if let Some(base) = copy.base() {
            self.subscriptions.subscribe(base, new_id, Link::Base);
        }
        self.colors.push(copy);
        self.emit(PortfolioEvent::ColorsModified(Some(new_id)));
        Ok(new_id)
    }

    /// Edit a color's value or adjustments; dependents follow before this
    /// returns.
    pub fn update_color<R>(&mut self, id: EntityId, edit: impl FnOnce(&mut Color) -> R) -> Result<R> {
        let index = self.color_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let result = edit(&mut self.colors[index]);
        self.propagate(id);
        self.emit(PortfolioEvent::ColorsModified(Some(id)));
        Ok(result)
    }

    /// Derive a color from `base` (or make it standalone again).
    ///
    /// Binding a base that already depends on `id` creates a cycle; this is
    /// a caller error checked only in debug builds.
    pub fn set_color_base(&mut self, id: EntityId, base: Option<EntityId>) -> Result<()> {
        let index = self.color_index(id)?;
        let link = match base {
            Some(base) => Some((base, self.color_value(base)?)),
            None => None,
        };
        if let Some(base) = base {
            debug_assert!(
                base != id && !self.subscriptions.reaches(id, base),
                "color {id} cannot be based on its own dependent {base}"
            );
        }

        self.emit(PortfolioEvent::UndoPointRequested);
        let previous = self.colors[index].base();
        self.subscriptions.rebind(id, Link::Base, previous, base);
        self.colors[index].rebase(link);
        self.propagate(id);
        self.emit(PortfolioEvent::ColorsModified(Some(id)));
        Ok(())
    }

    /// Remove a color and cut every link to it. Sub-colors lose their
    /// base, gradient stops keep the color's last value, styles keep their
    /// current paint.
    pub fn delete_color(&mut self, id: EntityId) -> Result<Color> {
        let index = self.color_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let removed = self.colors.remove(index);
        let last = removed.value();

        for (subscriber, link) in self.subscriptions.subscribers(id) {
            match link {
                Link::Base => {
                    if let Some(color) = self.colors.iter_mut().find(|c| c.id == subscriber) {
                        color.rebase(None);
                    }
                    self.propagate(subscriber);
                }
                Link::GradientStop => {
                    if let Some(gradient) = self.gradients.iter_mut().find(|g| g.id == subscriber)
                    {
                        gradient.unlink_color(id, last);
                    }
                    self.propagate(subscriber);
                }
                Link::Color(_) | Link::ShadowColor(_) => {
                    if let Some(style) = self.style_mut(subscriber) {
                        style.unlink_color(id);
                    }
                }
                Link::Gradient(_) => {}
            }
        }
        self.subscriptions.remove(id);
        log::debug!("deleted color {:?} ({id})", removed.name);

        self.emit(PortfolioEvent::ColorsModified(None));
        self.announce_selected_shape();
        Ok(removed)
    }

    // ─── Gradients ───────────────────────────────────────────────────────

    pub fn add_gradient(&mut self, name: &str) -> EntityId {
        self.emit(PortfolioEvent::UndoPointRequested);
        let name = if name.is_empty() {
            self.config.gradient_name.clone()
        } else {
            name.to_string()
        };
        let gradient = Gradient::new(&name);
        let id = gradient.id;
        self.gradients.push(gradient);
        log::debug!("added gradient {name:?} ({id})");
        self.emit(PortfolioEvent::GradientsModified(Some(id)));
        id
    }

    pub fn duplicate_gradient(&mut self, id: EntityId) -> Result<EntityId> {
        let index = self.gradient_index(id)?;
        let mut copy = self.gradients[index].duplicate();
        copy.name = increment_name(&copy.name);
        let new_id = copy.id;

        self.emit(PortfolioEvent::UndoPointRequested);
        for color in copy.linked_colors() {
            self.subscriptions.subscribe(color, new_id, Link::GradientStop);
        }
        self.gradients.push(copy);
        self.emit(PortfolioEvent::GradientsModified(Some(new_id)));
        Ok(new_id)
    }

    /// Edit a gradient's kind, geometry or literal stops.
    pub fn update_gradient<R>(
        &mut self,
        id: EntityId,
        edit: impl FnOnce(&mut Gradient) -> R,
    ) -> Result<R> {
        let index = self.gradient_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let before = self.gradients[index].linked_colors();
        let result = edit(&mut self.gradients[index]);
        self.sync_gradient_links(index, &before);
        self.propagate(id);
        self.emit(PortfolioEvent::GradientsModified(Some(id)));
        Ok(result)
    }

    /// Make stop `index` track `color`, or detach it (keeping its value).
    pub fn link_gradient_stop(
        &mut self,
        gradient: EntityId,
        index: usize,
        color: Option<EntityId>,
    ) -> Result<bool> {
        let g = self.gradient_index(gradient)?;
        let link = match color {
            Some(color) => Some((color, self.color_value(color)?)),
            None => None,
        };
        self.emit(PortfolioEvent::UndoPointRequested);
        let before = self.gradients[g].linked_colors();
        let linked = self.gradients[g].link_stop(index, link);
        self.sync_gradient_links(g, &before);
        self.propagate(gradient);
        self.emit(PortfolioEvent::GradientsModified(Some(gradient)));
        Ok(linked)
    }

    fn sync_gradient_links(&mut self, index: usize, before: &[EntityId]) {
        let id = self.gradients[index].id;
        let after = self.gradients[index].linked_colors();
        for color in before.iter().filter(|c| !after.contains(c)) {
            self.subscriptions.unsubscribe(*color, id, Link::GradientStop);
        }
        for color in after {
            self.subscriptions.subscribe(color, id, Link::GradientStop);
        }
    }

    /// Remove a gradient; styles using it lose their shader.
    pub fn delete_gradient(&mut self, id: EntityId) -> Result<Gradient> {
        let index = self.gradient_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let removed = self.gradients.remove(index);
        for (subscriber, _) in self.subscriptions.subscribers(id) {
            if let Some(style) = self.style_mut(subscriber) {
                style.unlink_gradient(id);
            }
        }
        self.subscriptions.remove(id);
        log::debug!("deleted gradient {:?} ({id})", removed.name);

        self.emit(PortfolioEvent::GradientsModified(None));
        self.announce_selected_shape();
        Ok(removed)
    }

    // ─── Styles ──────────────────────────────────────────────────────────

    /// Add a shared style. Owned kinds are turned into their shared form.
    pub fn add_style(&mut self, name: &str, kind: StyleKind) -> EntityId {
        self.emit(PortfolioEvent::UndoPointRequested);
        let name = if name.is_empty() {
            self.config.style_name.clone()
        } else {
            name.to_string()
        };
        let style = Style::new(&name, kind.shared());
        let id = style.id;
        self.styles.push(style);
        log::debug!("added style {name:?} ({id})");
        self.emit(PortfolioEvent::StylesModified(Some(id)));
        id
    }

    /// Copy a shared style under an incremented name. A copy of the Default
    /// style is Standard.
    pub fn duplicate_style(&mut self, id: EntityId) -> Result<EntityId> {
        let index = self.style_index(id)?;
        let mut copy = self.styles[index].duplicate();
        copy.name = increment_name(&copy.name);
        let new_id = copy.id;

        self.emit(PortfolioEvent::UndoPointRequested);
        self.subscribe_style(&copy);
        self.styles.push(copy);
        self.emit(PortfolioEvent::StylesModified(Some(new_id)));
        Ok(new_id)
    }

    /// Edit the local inputs of a shared or shape-owned style.
    pub fn update_style<R>(&mut self, id: EntityId, edit: impl FnOnce(&mut Style) -> R) -> Result<R> {
        self.require_style(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let style = self
            .style_mut(id)
            .ok_or(FolioError::not_found(EntityKind::Style, id))?;
        let result = edit(style);
        self.emit(PortfolioEvent::StylesModified(Some(id)));
        Ok(result)
    }

    /// Drive one side's paint color from a portfolio color.
    pub fn set_style_color(&mut self, style: EntityId, side: Side, color: Option<EntityId>) -> Result<()> {
        self.require_style(style)?;
        let link = match color {
            Some(color) => Some((color, self.color_value(color)?)),
            None => None,
        };
        self.emit(PortfolioEvent::UndoPointRequested);
        if let Some(target) = self.style_mut(style) {
            let previous = target.side(side).color();
            target.link_color(side, link);
            self.subscriptions
                .rebind(style, Link::Color(side), previous, color);
        }
        self.emit(PortfolioEvent::StylesModified(Some(style)));
        Ok(())
    }

    pub fn set_style_gradient(
        &mut self,
        style: EntityId,
        side: Side,
        gradient: Option<EntityId>,
    ) -> Result<()> {
        self.require_style(style)?;
        let link = match gradient {
            Some(gradient) => {
                let shader = self
                    .find_gradient(gradient)
                    .ok_or(FolioError::not_found(EntityKind::Gradient, gradient))?
                    .shader()
                    .clone();
                Some((gradient, shader))
            }
            None => None,
        };
        self.emit(PortfolioEvent::UndoPointRequested);
        if let Some(target) = self.style_mut(style) {
            let previous = target.side(side).gradient();
            target.link_gradient(side, link);
            self.subscriptions
                .rebind(style, Link::Gradient(side), previous, gradient);
        }
        self.emit(PortfolioEvent::StylesModified(Some(style)));
        Ok(())
    }

    /// Tint one side's drop shadow with a portfolio color.
    pub fn set_style_shadow_color(
        &mut self,
        style: EntityId,
        side: Side,
        color: Option<EntityId>,
    ) -> Result<()> {
        self.require_style(style)?;
        let link = match color {
            Some(color) => Some((color, self.color_value(color)?)),
            None => None,
        };
        self.emit(PortfolioEvent::UndoPointRequested);
        if let Some(target) = self.style_mut(style) {
            let previous = target.side(side).shadow().linked_color();
            target.link_shadow_color(side, link);
            self.subscriptions
                .rebind(style, Link::ShadowColor(side), previous, color);
        }
        self.emit(PortfolioEvent::StylesModified(Some(style)));
        Ok(())
    }

    /// Remove a shared style. Shapes using it fall back to a fresh neutral
    /// owned style; style properties naming it are cleared.
    pub fn delete_style(&mut self, id: EntityId) -> Result<Style> {
        let index = self.style_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let removed = self.styles.remove(index);
        self.subscriptions.remove(id);

        for sketch in &mut self.sketches {
            sketch.walk_mut(&mut |shape| {
                if shape.style == ShapeStyle::Shared(id) {
                    shape.style = ShapeStyle::Owned(Box::new(Style::custom()));
                }
            });
        }
        self.clear_property_values(|value| *value == PropertyValue::Style(Some(id)));
        log::debug!("deleted style {:?} ({id})", removed.name);

        self.emit(PortfolioEvent::StylesModified(None));
        self.announce_selected_shape();
        Ok(removed)
    }

    fn clear_property_values(&mut self, matches: impl Fn(&PropertyValue) -> bool) {
        for property in &mut self.properties {
            if matches(property.value()) {
                property.set_value(PropertyValue::default_for(property.kind()));
            }
        }
    }

    fn announce_selected_shape(&mut self) {
        let selected = self.selected_shape().map(|s| s.id);
        self.emit(PortfolioEvent::SelectedShapeChanged(selected));
    }

    // ─── Properties ──────────────────────────────────────────────────────

    /// Add a literal property of `kind` with its default name and value.
    pub fn add_property(&mut self, kind: PropertyKind) -> EntityId {
        self.insert_property(Property::new(kind))
    }

    pub fn insert_property(&mut self, property: Property) -> EntityId {
        self.emit(PortfolioEvent::UndoPointRequested);
        let id = property.id;
        log::debug!("added property {:?} ({id})", property.name);
        self.properties.push(property);
        self.emit(PortfolioEvent::PropertiesModified(Some(id)));
        id
    }

    pub fn duplicate_property(&mut self, id: EntityId) -> Result<EntityId> {
        let index = self.property_index(id)?;
        let mut copy = self.properties[index].duplicate();
        copy.name = increment_name(&copy.name);
        Ok(self.insert_property(copy))
    }

    pub fn update_property<R>(
        &mut self,
        id: EntityId,
        edit: impl FnOnce(&mut Property) -> R,
    ) -> Result<R> {
        let index = self.property_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let result = edit(&mut self.properties[index]);
        self.emit(PortfolioEvent::PropertiesModified(Some(id)));
        Ok(result)
    }

    /// Remove a property and every connection it drives, in colors, shared
    /// styles, shapes and their owned styles.
    pub fn delete_property(&mut self, id: EntityId) -> Result<Property> {
        let index = self.property_index(id)?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let removed = self.properties.remove(index);

        let mut cut = 0;
        for color in &mut self.colors {
            cut += color.connections.remove_property(id);
        }
        for style in &mut self.styles {
            cut += style.connections.remove_property(id);
        }
        for sketch in &mut self.sketches {
            sketch.walk_mut(&mut |shape| {
                cut += shape.connections.remove_property(id);
                if let ShapeStyle::Owned(style) = &mut shape.style {
                    cut += style.connections.remove_property(id);
                }
            });
        }
        log::debug!("deleted property {:?} ({id}), {cut} connections cut", removed.name);

        self.emit(PortfolioEvent::PropertiesModified(None));
        self.announce_selected_shape();
        Ok(removed)
    }

    /// Drive `point` on a color, style or shape from `property`.
    pub fn connect_property(
        &mut self,
        owner: EntityId,
        point: ConnectionPoint,
        property: EntityId,
    ) -> Result<()> {
        self.property_index(property)?;
        let modified = self
            .connection_owner_event(owner)
            .ok_or(FolioError::NotConnectable(owner))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let connections = self
            .connections_mut(owner)
            .ok_or(FolioError::NotConnectable(owner))?;
        connections.connect(point, property);
        self.emit(modified);
        Ok(())
    }

    pub fn disconnect_property(
        &mut self,
        owner: EntityId,
        point: ConnectionPoint,
    ) -> Result<Option<PropertyConnection>> {
        let modified = self
            .connection_owner_event(owner)
            .ok_or(FolioError::NotConnectable(owner))?;
        self.emit(PortfolioEvent::UndoPointRequested);
        let connections = self
            .connections_mut(owner)
            .ok_or(FolioError::NotConnectable(owner))?;
        let removed = connections.disconnect(point);
        self.emit(modified);
        Ok(removed)
    }

    /// The event announcing a connection change on `owner`. Shape-owned
    /// styles report through their sketch.
    fn connection_owner_event(&self, owner: EntityId) -> Option<PortfolioEvent> {
        if self.find_color(owner).is_some() {
            return Some(PortfolioEvent::ColorsModified(Some(owner)));
        }
        if self.find_style(owner).is_some() {
            return Some(PortfolioEvent::StylesModified(Some(owner)));
        }
        self.sketches
            .iter()
            .find(|sketch| {
                let mut holds = false;
                sketch.walk(&mut |shape| {
                    holds |= shape.id == owner
                        || matches!(shape.style(), ShapeStyle::Owned(style) if style.id == owner);
                });
                holds
            })
            .map(|sketch| PortfolioEvent::ShapesModified(sketch.id))
    }

    fn connections_mut(&mut self, owner: EntityId) -> Option<&mut crate::property::Connections> {
        if let Some(pos) = self.colors.iter().position(|c| c.id == owner) {
            return Some(&mut self.colors[pos].connections);
        }
        if self.find_any_style(owner).is_some() {
            return self.style_mut(owner).map(|s| &mut s.connections);
        }
        self.shape_mut(owner).map(|s| &mut s.connections)
    }

    // ─── Evaluation ──────────────────────────────────────────────────────

    /// Evaluate the properties behind `connections`, in order. Failed
    /// evaluations are skipped.
    fn evaluate_connections(
        &mut self,
        connections: &[PropertyConnection],
        evaluator: &dyn ScriptEvaluator,
    ) -> Vec<(ConnectionPoint, PropertyValue)> {
        let mut values = Vec::with_capacity(connections.len());
        for connection in connections {
            let Some(property) = self
                .properties
                .iter_mut()
                .find(|p| p.id == connection.property)
            else {
                continue;
            };
            if let Evaluation {
                successful: true,
                value: Some(value),
            } = property.evaluate(evaluator)
            {
                values.push((connection.point, value));
            }
        }
        values
    }

    /// Re-evaluate every property connected to a color and apply the
    /// results. Returns how many attributes were set.
    pub fn evaluate_color_properties(
        &mut self,
        id: EntityId,
        evaluator: &dyn ScriptEvaluator,
    ) -> Result<usize> {
        let index = self.color_index(id)?;
        let connections = self.colors[index].connections.to_vec();
        let values = self.evaluate_connections(&connections, evaluator);
        let mut applied = 0;
        for (point, value) in &values {
            if self.colors[index].apply_connection(*point, value) {
                applied += 1;
            }
        }
        if applied > 0 {
            self.propagate(id);
        }
        Ok(applied)
    }

    /// Evaluate the linked fill and frame colors, then the style's own
    /// connections.
    pub fn evaluate_style_properties(
        &mut self,
        id: EntityId,
        evaluator: &dyn ScriptEvaluator,
    ) -> Result<usize> {
        let style = self
            .find_any_style(id)
            .ok_or(FolioError::not_found(EntityKind::Style, id))?;
        let mut linked: Vec<EntityId> = Side::BOTH
            .iter()
            .filter_map(|&side| style.side(side).color())
            .collect();
        linked.dedup();
        let connections = style.connections.to_vec();

        let mut applied = 0;
        for color in linked {
            if self.find_color(color).is_some() {
                applied += self.evaluate_color_properties(color, evaluator)?;
            }
        }
        let values = self.evaluate_connections(&connections, evaluator);
        if let Some(style) = self.style_mut(id) {
            for (point, value) in &values {
                if style.apply_connection(*point, value) {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    /// Evaluate a shape's connections, then those of its style.
    pub fn evaluate_shape_properties(
        &mut self,
        id: EntityId,
        evaluator: &dyn ScriptEvaluator,
    ) -> Result<usize> {
        let shape = self
            .find_shape(id)
            .ok_or(FolioError::not_found(EntityKind::Shape, id))?;
        let connections = shape.connections.to_vec();
        let values = self.evaluate_connections(&connections, evaluator);

        let mut applied = 0;
        for (point, value) in &values {
            if *point == ConnectionPoint::ShapeStyle {
                if let Some(style) = value.as_style()
                    && self.find_style(style).is_some()
                {
                    self.replace_shape_style(id, ShapeStyle::Shared(style))?;
                    applied += 1;
                }
                continue;
            }
            if let Some(shape) = self.shape_mut(id)
                && shape.apply_connection(*point, value)
            {
                applied += 1;
            }
        }

        let style = match self.find_shape(id).map(|s| s.style()) {
            Some(ShapeStyle::Shared(style)) => Some(*style),
            Some(ShapeStyle::Owned(style)) => Some(style.id),
            None => None,
        };
        if let Some(style) = style
            && self.find_any_style(style).is_some()
        {
            applied += self.evaluate_style_properties(style, evaluator)?;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::presets;
    use pretty_assertions::assert_eq;

    #[test]
    fn increments_names() {
        assert_eq!(increment_name("Red"), "Red 1");
        assert_eq!(increment_name("Red 1"), "Red 2");
        assert_eq!(increment_name("Untitled 9"), "Untitled 10");
        assert_eq!(increment_name("Big Red"), "Big Red 1");
    }

    #[test]
    fn new_portfolio_has_one_sketch_and_default_style() {
        let portfolio = Portfolio::new();
        assert_eq!(portfolio.sketches().len(), 1);
        assert_eq!(portfolio.sketches()[0].name, "Untitled 1");
        assert_eq!(portfolio.selected_sketch().map(|s| s.id), Some(portfolio.sketches()[0].id));
        assert_eq!(portfolio.styles().len(), 1);
        assert_eq!(portfolio.styles()[0].kind(), StyleKind::Default);
    }

    #[test]
    fn sub_color_follows_base() {
        let mut portfolio = Portfolio::new();
        let base = portfolio.add_color("Brand", presets::RED);
        let tint = portfolio.add_color("Tint", presets::WHITE);
        portfolio.set_color_base(tint, Some(base)).unwrap();
        assert_eq!(portfolio.find_color(tint).unwrap().value(), presets::RED);

        portfolio
            .update_color(base, |c| c.set_color(presets::BLUE))
            .unwrap();
        assert_eq!(portfolio.find_color(tint).unwrap().value().to_hex(), "#0000FF");
    }

    #[test]
    fn rebasing_moves_the_subscription() {
        let mut portfolio = Portfolio::new();
        let a = portfolio.add_color("A", presets::RED);
        let b = portfolio.add_color("B", presets::GREEN);
        let c = portfolio.add_color("C", presets::BLACK);
        portfolio.set_color_base(c, Some(a)).unwrap();
        portfolio.set_color_base(c, Some(b)).unwrap();

        portfolio
            .update_color(a, |color| color.set_color(presets::PURPLE))
            .unwrap();
        assert_eq!(portfolio.find_color(c).unwrap().value(), presets::GREEN);
        assert!(portfolio.subscriptions().subscribers(a).is_empty());
    }

    #[test]
    fn structural_edits_request_undo_before_announcing() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut portfolio = Portfolio::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        portfolio.on_event(move |e| sink.borrow_mut().push(*e));

        let id = portfolio.add_color("Red", presets::RED);
        portfolio.delete_color(id).unwrap();

        let events = log.borrow();
        assert_eq!(
            &events[..4],
            &[
                PortfolioEvent::UndoPointRequested,
                PortfolioEvent::ColorsModified(Some(id)),
                PortfolioEvent::UndoPointRequested,
                PortfolioEvent::ColorsModified(None),
            ]
        );
    }

    #[test]
    fn sketch_lifecycle_keeps_a_selection() {
        let mut portfolio = Portfolio::new();
        let first = portfolio.sketches()[0].id;
        let copy = portfolio.duplicate_selected_sketch().unwrap();
        assert_eq!(portfolio.find_sketch(copy).unwrap().name, "Untitled 2");
        assert_eq!(portfolio.selected_sketch().map(|s| s.id), Some(copy));

        portfolio.delete_selected_sketch().unwrap();
        assert_eq!(portfolio.selected_sketch().map(|s| s.id), Some(first));
        portfolio.delete_selected_sketch().unwrap();
        assert!(portfolio.selected_sketch().is_none());
        assert!(portfolio.delete_selected_sketch().is_none());
    }

    #[test]
    fn sketch_names_stay_unique() {
        let mut portfolio = Portfolio::new();
        portfolio.duplicate_selected_sketch().unwrap();
        portfolio.add_sketch();
        portfolio.duplicate_selected_sketch().unwrap();
        let names: Vec<_> = portfolio.sketches().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Untitled 1", "Untitled 2", "Untitled 3", "Untitled 4"]);
    }
}
