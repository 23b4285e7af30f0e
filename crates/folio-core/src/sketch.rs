//! Sketches: one canvas worth of shapes, in paint order.

use crate::error::{EntityKind, FolioError, Result};
use crate::geometry::Point;
use crate::id::EntityId;
use crate::shape::Shape;
use crate::style::Style;
use serde::{Deserialize, Serialize};

/// Where to move a shape within its sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    Forward,
    Backward,
    Front,
    Back,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub id: EntityId,
    pub name: String,
    shapes: Vec<Shape>,
    selected_shape: Option<EntityId>,
}

impl Sketch {
    pub fn new(name: &str) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.to_string(),
            shapes: Vec::new(),
            selected_shape: None,
        }
    }

    /// Top-level shapes, back to front.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn selected_shape(&self) -> Option<EntityId> {
        self.selected_shape
    }

    /// Select a shape anywhere in the sketch, or clear the selection.
    pub fn select_shape(&mut self, id: Option<EntityId>) -> Result<()> {
        if let Some(id) = id
            && self.find_shape(id).is_none()
        {
            return Err(FolioError::not_found(EntityKind::Shape, id));
        }
        self.selected_shape = id;
        Ok(())
    }

    pub(crate) fn push_shape(&mut self, mut shape: Shape) -> EntityId {
        shape.layer_depth = self.shapes.len() as i32;
        let id = shape.id;
        self.shapes.push(shape);
        id
    }

    /// Detach a shape from the top level or from inside a group.
    pub(crate) fn take_shape(&mut self, id: EntityId) -> Option<Shape> {
        let removed = match self.shapes.iter().position(|s| s.id == id) {
            Some(pos) => Some(self.shapes.remove(pos)),
            None => self
                .shapes
                .iter_mut()
                .find_map(|s| s.remove_descendant(id)),
        }?;
        if let Some(selected) = self.selected_shape
            && removed.find(selected).is_some()
        {
            self.selected_shape = None;
        }
        self.renumber();
        Some(removed)
    }

    pub fn find_shape(&self, id: EntityId) -> Option<&Shape> {
        self.shapes.iter().find_map(|s| s.find(id))
    }

    pub(crate) fn find_shape_mut(&mut self, id: EntityId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find_map(|s| s.find_mut(id))
    }

    pub(crate) fn find_owned_style_mut(&mut self, id: EntityId) -> Option<&mut Style> {
        self.shapes
            .iter_mut()
            .find_map(|s| s.find_owned_style_mut(id))
    }

    /// Visit every shape, groups before their children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Shape)) {
        for shape in &self.shapes {
            shape.walk(visit);
        }
    }

    pub(crate) fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Shape)) {
        for shape in &mut self.shapes {
            shape.walk_mut(visit);
        }
    }

    /// Topmost visible shape under `p`.
    pub fn shape_at(&self, p: Point) -> Option<&Shape> {
        self.shapes.iter().rev().find(|s| s.hit_test(p))
    }

    /// Replace the top-level shapes named by `ids` with one group holding
    /// them in their current paint order.
    pub(crate) fn group_shapes(&mut self, ids: &[EntityId]) -> Option<EntityId> {
        let mut members = Vec::new();
        let mut insert_at = None;
        let mut i = 0;
        while i < self.shapes.len() {
            if ids.contains(&self.shapes[i].id) {
                insert_at.get_or_insert(i);
                members.push(self.shapes.remove(i));
            } else {
                i += 1;
            }
        }
        let insert_at = insert_at?;
        let group = Shape::group(members);
        let id = group.id;
        self.shapes.insert(insert_at, group);
        self.renumber();
        Some(id)
    }

    /// Move a top-level shape in paint order. Returns whether it moved.
    pub fn reorder(&mut self, id: EntityId, to: Reorder) -> bool {
        let Some(pos) = self.shapes.iter().position(|s| s.id == id) else {
            return false;
        };
        let last = self.shapes.len() - 1;
        let target = match to {
            Reorder::Forward if pos < last => pos + 1,
            Reorder::Backward if pos > 0 => pos - 1,
            Reorder::Front if pos < last => last,
            Reorder::Back if pos > 0 => 0,
            _ => return false,
        };
        let shape = self.shapes.remove(pos);
        self.shapes.insert(target, shape);
        self.renumber();
        true
    }

    fn renumber(&mut self) {
        for (depth, shape) in self.shapes.iter_mut().enumerate() {
            shape.layer_depth = depth as i32;
        }
    }

    /// Rewrite references of every shape in place.
    pub(crate) fn relink(
        &mut self,
        resolve: &mut impl FnMut(EntityKind, EntityId) -> Result<EntityId>,
    ) -> Result<()> {
        for shape in &mut self.shapes {
            shape.relink(resolve)?;
        }
        if let Some(selected) = self.selected_shape
            && self.find_shape(selected).is_none()
        {
            return Err(FolioError::DanglingReference {
                kind: EntityKind::Shape,
                id: selected,
            });
        }
        Ok(())
    }

    /// User-level copy: fresh identities throughout, selection carried over
    /// to the copied shape.
    pub fn duplicate(&self) -> Sketch {
        let selected_index = self.selected_shape.and_then(|id| {
            let mut order = Vec::new();
            self.walk(&mut |s| order.push(s.id));
            order.iter().position(|&s| s == id)
        });

        let mut copy = Sketch {
            id: EntityId::generate(),
            name: self.name.clone(),
            shapes: self.shapes.iter().map(Shape::duplicate).collect(),
            selected_shape: None,
        };
        if let Some(index) = selected_index {
            let mut order = Vec::new();
            copy.walk(&mut |s| order.push(s.id));
            copy.selected_shape = order.get(index).copied();
        }
        copy
    }
}
