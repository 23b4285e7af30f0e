//! Shapes: lines, triangles, vector polygons and groups.
//!
//! Every shape carries exactly one style, either shared (referenced by id
//! from the portfolio collection) or owned outright. Vector shapes support
//! point editing through a small state machine:
//!
//! ```text
//! Normal ──start_editing──▶ Editing ──add_point near first──▶ Finalizing
//!    ▲                                                            │
//!    └─────────────────────────── end_editing ◀───────────────────┘
//! ```

use crate::error::{EntityKind, FolioError, Result};
use crate::geometry::{Bounds, Point};
use crate::id::EntityId;
use crate::property::{ConnectionPoint, Connections, PropertyValue};
use crate::style::Style;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A point added within this distance (exclusive, both axes) of a vector's
/// first point closes the polygon.
pub const SNAP_TOLERANCE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeState {
    #[default]
    Normal,
    Editing,
    Finalizing,
}

/// Draggable control point bound to one vector point by index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub center: Point,
    pub index: usize,
}

impl Handle {
    /// Edge length of the square hit area.
    pub const SIZE: f32 = 8.0;

    pub fn contains(&self, p: Point) -> bool {
        let half = Self::SIZE / 2.0;
        (p.x - self.center.x).abs() <= half && (p.y - self.center.y).abs() <= half
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorPath {
    pub points: Vec<Point>,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Segment from the top-left to the bottom-right corner of the bounds.
    Line,
    /// Apex at the top center, base along the bottom edge.
    Triangle,
    Vector(VectorPath),
    Group(Vec<Shape>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeStyle {
    /// A Default, Standard or Text style from the portfolio collection.
    Shared(EntityId),
    /// A Custom or CustomText style belonging to this shape alone.
    Owned(Box<Style>),
}

impl ShapeStyle {
    pub fn shared_id(&self) -> Option<EntityId> {
        match self {
            ShapeStyle::Shared(id) => Some(*id),
            ShapeStyle::Owned(_) => None,
        }
    }

    pub fn owned(&self) -> Option<&Style> {
        match self {
            ShapeStyle::Owned(style) => Some(style),
            ShapeStyle::Shared(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: EntityId,
    pub name: String,
    kind: ShapeKind,
    bounds: Bounds,
    pub rotation: f32,
    state: ShapeState,
    pub(crate) style: ShapeStyle,
    handles: SmallVec<[Handle; 8]>,
    pub connections: Connections,
    pub visible: bool,
    pub layer_depth: i32,
}

impl Shape {
    fn with_kind(name: &str, kind: ShapeKind, bounds: Bounds) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.to_string(),
            kind,
            bounds,
            rotation: 0.0,
            state: ShapeState::Normal,
            style: ShapeStyle::Owned(Box::new(Style::custom())),
            handles: SmallVec::new(),
            connections: Connections::new(),
            visible: true,
            layer_depth: 0,
        }
    }

    pub fn line(bounds: Bounds) -> Self {
        Self::with_kind("Line", ShapeKind::Line, bounds)
    }

    pub fn triangle(bounds: Bounds) -> Self {
        Self::with_kind("Triangle", ShapeKind::Triangle, bounds.ensure_positive())
    }

    /// A finished polygon through `points`.
    pub fn vector(points: Vec<Point>, closed: bool) -> Self {
        let bounds = Bounds::from_points(&points).unwrap_or_default();
        Self::with_kind("Vector", ShapeKind::Vector(VectorPath { points, closed }), bounds)
    }

    /// An empty polygon ready for point entry.
    pub fn vector_editing(origin: Point) -> Self {
        let mut shape = Self::vector(Vec::new(), true);
        shape.bounds = Bounds::new(origin.x, origin.y, origin.x, origin.y);
        shape.state = ShapeState::Editing;
        shape
    }

    /// A group owning `children`; its bounds cover theirs.
    pub fn group(children: Vec<Shape>) -> Self {
        let bounds = children
            .iter()
            .map(|c| c.bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self::with_kind("Group", ShapeKind::Group(children), bounds)
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn state(&self) -> ShapeState {
        self.state
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn style(&self) -> &ShapeStyle {
        &self.style
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn points(&self) -> &[Point] {
        match &self.kind {
            ShapeKind::Vector(path) => &path.points,
            _ => &[],
        }
    }

    pub fn children(&self) -> &[Shape] {
        match &self.kind {
            ShapeKind::Group(children) => children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Shape] {
        match &mut self.kind {
            ShapeKind::Group(children) => children,
            _ => &mut [],
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.kind, ShapeKind::Vector(_))
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Resize or move the shape.
    ///
    /// In Normal state vector points and group children are mapped from the
    /// previous bounds onto the new ones. While editing only the rectangle
    /// changes; the points stay authoritative.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        if self.state != ShapeState::Normal {
            self.bounds = bounds;
            return;
        }
        let previous = self.bounds;
        match &mut self.kind {
            ShapeKind::Line => self.bounds = bounds,
            ShapeKind::Triangle => self.bounds = bounds.ensure_positive(),
            ShapeKind::Vector(path) => {
                let bounds = bounds.ensure_positive();
                for p in &mut path.points {
                    *p = previous.map_point(&bounds, *p);
                }
                self.bounds = Bounds::from_points(&path.points).unwrap_or(bounds);
            }
            ShapeKind::Group(children) => {
                let bounds = bounds.ensure_positive();
                for child in children.iter_mut() {
                    let mapped = previous.map_bounds(&bounds, &child.bounds);
                    child.set_bounds(mapped);
                }
                self.bounds = bounds;
            }
        }
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        if self.state != ShapeState::Normal {
            return;
        }
        self.set_bounds(self.bounds.translated(dx, dy));
    }

    /// Hit test in shape space, undoing the rotation about the center.
    pub fn hit_test(&self, p: Point) -> bool {
        if !self.visible {
            return false;
        }
        let local = p.rotated_about(self.bounds.center(), -self.rotation);
        if let ShapeKind::Group(children) = &self.kind {
            return children.iter().any(|c| c.hit_test(local));
        }
        self.bounds.contains(local)
    }

    /// Index of the handle under `p`, while editing.
    pub fn hit_handle(&self, p: Point) -> Option<usize> {
        if self.state == ShapeState::Normal {
            return None;
        }
        self.handles.iter().position(|h| h.contains(p))
    }

    // ─── Point editing ───────────────────────────────────────────────────

    fn path_mut(&mut self) -> Result<&mut VectorPath> {
        match &mut self.kind {
            ShapeKind::Vector(path) => Ok(path),
            _ => Err(FolioError::NotEditable(self.id)),
        }
    }

    /// Enter Editing with one handle per point.
    pub fn start_editing(&mut self) -> Result<()> {
        let handles = self
            .path_mut()?
            .points
            .iter()
            .enumerate()
            .map(|(index, &center)| Handle { center, index })
            .collect();
        self.handles = handles;
        self.state = ShapeState::Editing;
        Ok(())
    }

    pub fn end_editing(&mut self) {
        self.handles.clear();
        self.state = ShapeState::Normal;
    }

    /// Append a point. A point landing within [`SNAP_TOLERANCE`] of the first
    /// point is snapped onto it and closes the shape (→ Finalizing).
    pub fn add_point(&mut self, p: Point) -> Result<ShapeState> {
        let state = self.state;
        let path = self.path_mut()?;
        let mut point = p;
        let mut next = state;
        if let Some(&first) = path.points.first()
            && (point.x - first.x).abs() < SNAP_TOLERANCE
            && (point.y - first.y).abs() < SNAP_TOLERANCE
        {
            point = first;
            next = ShapeState::Finalizing;
        }
        path.points.push(point);
        let index = path.points.len() - 1;

        self.state = next;
        if next != ShapeState::Normal {
            self.handles.push(Handle {
                center: point,
                index,
            });
        }
        self.refresh_vector_bounds();
        Ok(next)
    }

    /// Track the pointer with the point currently being placed.
    pub fn move_last_point(&mut self, p: Point) -> Result<()> {
        let path = self.path_mut()?;
        let Some(last) = path.points.len().checked_sub(1) else {
            return Ok(());
        };
        self.move_point(last, p)
    }

    pub fn move_point(&mut self, index: usize, p: Point) -> Result<()> {
        let path = self.path_mut()?;
        let Some(point) = path.points.get_mut(index) else {
            return Ok(());
        };
        *point = p;
        if let Some(handle) = self.handles.iter_mut().find(|h| h.index == index) {
            handle.center = p;
        }
        self.refresh_vector_bounds();
        Ok(())
    }

    /// Drag a handle; the bound point follows.
    pub fn drag_handle(&mut self, handle: usize, p: Point) -> Result<()> {
        match self.handles.get(handle) {
            Some(h) => {
                let index = h.index;
                self.move_point(index, p)
            }
            None => Ok(()),
        }
    }

    pub fn remove_point(&mut self, index: usize) -> Result<Option<Point>> {
        let path = self.path_mut()?;
        if index >= path.points.len() {
            return Ok(None);
        }
        let removed = path.points.remove(index);
        if self.state != ShapeState::Normal {
            self.handles.retain(|h| h.index != index);
            for h in self.handles.iter_mut().filter(|h| h.index > index) {
                h.index -= 1;
            }
        }
        self.refresh_vector_bounds();
        Ok(Some(removed))
    }

    fn refresh_vector_bounds(&mut self) {
        if let ShapeKind::Vector(path) = &self.kind
            && let Some(bounds) = Bounds::from_points(&path.points)
        {
            self.bounds = bounds;
        }
    }

    // ─── Property binding ────────────────────────────────────────────────

    /// Apply an evaluated property value to a geometry point. The
    /// `ShapeStyle` point needs the portfolio and is handled there.
    pub fn apply_connection(&mut self, point: ConnectionPoint, value: &PropertyValue) -> bool {
        use ConnectionPoint as P;
        let b = self.bounds;
        let target = match (point, value) {
            (P::Left, PropertyValue::Number(n)) => Bounds { left: *n, ..b },
            (P::Top, PropertyValue::Number(n)) => Bounds { top: *n, ..b },
            (P::Right, PropertyValue::Number(n)) => Bounds { right: *n, ..b },
            (P::Bottom, PropertyValue::Number(n)) => Bounds { bottom: *n, ..b },
            (P::Width, PropertyValue::Number(n)) => Bounds {
                right: b.left + n,
                ..b
            },
            (P::Height, PropertyValue::Number(n)) => Bounds {
                bottom: b.top + n,
                ..b
            },
            (P::Rect, PropertyValue::Rect(r)) => *r,
            (P::RotationDegrees, PropertyValue::Number(n)) => {
                self.rotation = *n;
                return true;
            }
            (P::Visible, PropertyValue::Boolean(v)) => {
                self.visible = *v;
                return true;
            }
            _ => return false,
        };
        self.set_bounds(target);
        true
    }

    // ─── Tree helpers ────────────────────────────────────────────────────

    /// Visit this shape and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Shape)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Mutable visit, children before their group.
    pub(crate) fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Shape)) {
        for child in self.children_mut() {
            child.walk_mut(visit);
        }
        visit(self);
    }

    pub fn find(&self, id: EntityId) -> Option<&Shape> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: EntityId) -> Option<&mut Shape> {
        if self.id == id {
            return Some(self);
        }
        self.children_mut().iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Detach a descendant (not this shape itself).
    pub(crate) fn remove_descendant(&mut self, id: EntityId) -> Option<Shape> {
        let ShapeKind::Group(children) = &mut self.kind else {
            return None;
        };
        if let Some(pos) = children.iter().position(|c| c.id == id) {
            return Some(children.remove(pos));
        }
        children.iter_mut().find_map(|c| c.remove_descendant(id))
    }

    /// Find the owned style with identity `id` in this subtree.
    pub(crate) fn find_owned_style_mut(&mut self, id: EntityId) -> Option<&mut Style> {
        if let ShapeStyle::Owned(style) = &mut self.style
            && style.id == id
        {
            return Some(style);
        }
        match &mut self.kind {
            ShapeKind::Group(children) => children
                .iter_mut()
                .find_map(|c| c.find_owned_style_mut(id)),
            _ => None,
        }
    }

    /// Rewrite every reference in this subtree through `resolve`, children
    /// first. Owned styles are relinked in place; shared styles are looked
    /// up by identity.
    pub(crate) fn relink(
        &mut self,
        resolve: &mut impl FnMut(EntityKind, EntityId) -> Result<EntityId>,
    ) -> Result<()> {
        for child in self.children_mut() {
            child.relink(resolve)?;
        }
        match &mut self.style {
            ShapeStyle::Owned(style) => style.relink(resolve)?,
            ShapeStyle::Shared(id) => *id = resolve(EntityKind::Style, *id)?,
        }
        for connection in self.connections.iter_mut() {
            connection.property = resolve(EntityKind::Property, connection.property)?;
        }
        Ok(())
    }

    /// User-level copy: fresh identities for the shape, its owned style
    /// and every descendant.
    pub fn duplicate(&self) -> Shape {
        let mut copy = self.clone();
        copy.walk_mut(&mut |shape| {
            shape.id = EntityId::generate();
            if let ShapeStyle::Owned(style) = &mut shape.style {
                style.id = EntityId::generate();
            }
        });
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn triangle_path() -> Shape {
        let mut shape = Shape::vector_editing(Point::new(0.0, 0.0));
        for p in [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)] {
            shape.add_point(Point::new(p.0, p.1)).unwrap();
        }
        shape
    }

    #[test]
    fn closing_point_snaps_and_finalizes() {
        let mut shape = triangle_path();
        assert_eq!(shape.state(), ShapeState::Editing);
        let state = shape.add_point(Point::new(2.0, 3.0)).unwrap();
        assert_eq!(state, ShapeState::Finalizing);
        assert_eq!(shape.points().last(), Some(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn snap_tolerance_is_strict() {
        let mut shape = triangle_path();
        shape.add_point(Point::new(5.0, 0.0)).unwrap();
        assert_eq!(shape.state(), ShapeState::Editing);
        assert_eq!(shape.points().last(), Some(&Point::new(5.0, 0.0)));
    }

    #[test]
    fn bounds_follow_points() {
        let mut shape = triangle_path();
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 100.0, 100.0));
        shape.move_point(2, Point::new(150.0, 80.0)).unwrap();
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 150.0, 80.0));
        shape.remove_point(2).unwrap();
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 100.0, 0.0));
    }

    #[test]
    fn handles_write_back_by_index() {
        let mut shape = Shape::vector(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            true,
        );
        shape.start_editing().unwrap();
        assert_eq!(shape.handles().len(), 3);
        let hit = shape.hit_handle(Point::new(11.0, 9.0));
        assert_eq!(hit, Some(2));
        shape.drag_handle(2, Point::new(20.0, 30.0)).unwrap();
        assert_eq!(shape.points()[2], Point::new(20.0, 30.0));
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 20.0, 30.0));
        shape.end_editing();
        assert!(shape.handles().is_empty());
    }

    #[test]
    fn only_vectors_edit() {
        let mut line = Shape::line(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(line.start_editing(), Err(FolioError::NotEditable(line.id)));
        assert!(line.add_point(Point::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn resize_scales_points_about_center() {
        let mut shape = Shape::vector(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 50.0), Point::new(0.0, 100.0)],
            true,
        );
        shape.set_bounds(Bounds::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(
            shape.points(),
            &[Point::new(0.0, 0.0), Point::new(200.0, 100.0), Point::new(0.0, 200.0)]
        );
        shape.move_by(10.0, 5.0);
        assert_eq!(shape.points()[1], Point::new(210.0, 105.0));
    }

    #[test]
    fn group_resize_maps_children() {
        let a = Shape::triangle(Bounds::new(0.0, 0.0, 50.0, 50.0));
        let b = Shape::triangle(Bounds::new(50.0, 50.0, 100.0, 100.0));
        let mut group = Shape::group(vec![a, b]);
        assert_eq!(group.bounds(), Bounds::new(0.0, 0.0, 100.0, 100.0));
        group.set_bounds(Bounds::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(group.children()[1].bounds(), Bounds::new(100.0, 50.0, 200.0, 100.0));
    }

    #[test]
    fn duplicate_regenerates_every_identity() {
        let group = Shape::group(vec![Shape::line(Bounds::new(0.0, 0.0, 1.0, 1.0))]);
        let copy = group.duplicate();
        assert_ne!(copy.id, group.id);
        assert_ne!(copy.children()[0].id, group.children()[0].id);
        let (Some(a), Some(b)) = (copy.style().owned(), group.style().owned()) else {
            panic!("shapes start with owned styles");
        };
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn geometry_connections() {
        let mut shape = Shape::triangle(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert!(shape.apply_connection(ConnectionPoint::Width, &PropertyValue::Number(40.0)));
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 40.0, 10.0));
        assert!(shape.apply_connection(ConnectionPoint::Visible, &PropertyValue::Boolean(false)));
        assert!(!shape.hit_test(Point::new(5.0, 5.0)));
        assert!(!shape.apply_connection(ConnectionPoint::TextSize, &PropertyValue::Number(1.0)));
    }
}
