//! Tool system for canvas interactions.
//!
//! Each tool translates input events into [`Edit`]s that the
//! [`Editor`](crate::editor::Editor) applies to the selected sketch.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Select Tool | Shape Tool | Pen Tool |
//! |----------|-------------|------------|----------|
//! | **Shift** | Toggle selection | Square constraint | none |
//! | **Alt** | Duplicate on drag start | Draw from center | none |

use crate::input::{InputEvent, Key};
use folio_core::{Bounds, EntityId, Point, SNAP_TOLERANCE, Shape};

/// The active tool determines how input events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Pen,
    Line,
    Triangle,
}

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Shape(EntityId),
    /// A vector-editing handle of the shape being edited.
    Handle { shape: EntityId, index: usize },
}

/// A change requested by a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    AddShape(Shape),
    DeleteShapes(Vec<EntityId>),
    DuplicateShape(EntityId),
    MoveShapes { ids: Vec<EntityId>, dx: f32, dy: f32 },
    SetBounds { shape: EntityId, bounds: Bounds },
    StartEditing(EntityId),
    EndEditing(EntityId),
    AddPoint { shape: EntityId, point: Point },
    MoveLastPoint { shape: EntityId, point: Point },
    DragHandle { shape: EntityId, handle: usize, point: Point },
    Select(Vec<EntityId>),
    /// Select whatever the rectangle touches.
    SelectRect(Bounds),
}

/// Trait for tools that handle input and produce edits.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle an input event, returning zero or more edits.
    fn handle(&mut self, event: &InputEvent, hit: Option<Hit>) -> Vec<Edit>;
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SelectTool {
    /// Currently selected shapes.
    pub selected: Vec<EntityId>,
    /// The vector shape whose points are being edited.
    pub editing: Option<EntityId>,
    dragging: bool,
    handle: Option<(EntityId, usize)>,
    last: Point,
    /// Marquee start, set when pointer-down hits empty space.
    pub marquee_start: Option<Point>,
    pub marquee_rect: Option<Bounds>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_selected(&self) -> Option<EntityId> {
        self.selected.first().copied()
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn handle(&mut self, event: &InputEvent, hit: Option<Hit>) -> Vec<Edit> {
        match *event {
            InputEvent::PointerDown { x, y, modifiers } => {
                self.marquee_start = None;
                self.marquee_rect = None;
                self.last = Point::new(x, y);
                match hit {
                    Some(Hit::Handle { shape, index }) => {
                        self.handle = Some((shape, index));
                        vec![]
                    }
                    Some(Hit::Shape(id)) => {
                        if modifiers.shift {
                            if let Some(pos) = self.selected.iter().position(|s| *s == id) {
                                self.selected.remove(pos);
                            } else {
                                self.selected.push(id);
                            }
                        } else if !self.selected.contains(&id) {
                            self.selected = vec![id];
                        }
                        self.dragging = true;

                        let mut edits = vec![Edit::Select(self.selected.clone())];
                        if modifiers.alt && self.selected.len() == 1 {
                            edits.push(Edit::DuplicateShape(id));
                        }
                        edits
                    }
                    None => {
                        if !modifiers.shift {
                            self.selected.clear();
                        }
                        self.dragging = false;
                        let p = Point::new(x, y);
                        self.marquee_start = Some(p);
                        self.marquee_rect = Some(Bounds::new(p.x, p.y, p.x, p.y));
                        vec![Edit::Select(self.selected.clone())]
                    }
                }
            }
            InputEvent::PointerMove { x, y, .. } => {
                let p = Point::new(x, y);
                if let Some((shape, handle)) = self.handle {
                    return vec![Edit::DragHandle {
                        shape,
                        handle,
                        point: p,
                    }];
                }
                if let Some(start) = self.marquee_start {
                    self.marquee_rect = Some(Bounds::new(start.x, start.y, x, y).normalized());
                    return vec![];
                }
                if self.dragging && !self.selected.is_empty() {
                    let (dx, dy) = (x - self.last.x, y - self.last.y);
                    self.last = p;
                    return vec![Edit::MoveShapes {
                        ids: self.selected.clone(),
                        dx,
                        dy,
                    }];
                }
                vec![]
            }
            InputEvent::PointerUp { .. } => {
                self.dragging = false;
                self.handle = None;
                self.marquee_start = None;
                match self.marquee_rect.take() {
                    Some(rect) if rect.width() > 0.0 || rect.height() > 0.0 => {
                        vec![Edit::SelectRect(rect)]
                    }
                    _ => vec![],
                }
            }
            InputEvent::KeyDown { key, .. } => match key {
                Key::Delete if !self.selected.is_empty() => {
                    self.editing = None;
                    vec![Edit::DeleteShapes(std::mem::take(&mut self.selected))]
                }
                Key::Enter if self.editing.is_none() && self.selected.len() == 1 => {
                    let id = self.selected[0];
                    self.editing = Some(id);
                    vec![Edit::StartEditing(id)]
                }
                Key::Escape => match self.editing.take() {
                    Some(id) => vec![Edit::EndEditing(id)],
                    None => {
                        self.selected.clear();
                        vec![Edit::Select(vec![])]
                    }
                },
                _ => vec![],
            },
        }
    }
}

// ─── Shape Tool ──────────────────────────────────────────────────────────

/// Draws lines and triangles by dragging out their bounds.
#[derive(Debug)]
pub struct ShapeTool {
    kind: ToolKind,
    drawing: Option<(EntityId, Point)>,
}

impl ShapeTool {
    pub fn line() -> Self {
        Self {
            kind: ToolKind::Line,
            drawing: None,
        }
    }

    pub fn triangle() -> Self {
        Self {
            kind: ToolKind::Triangle,
            drawing: None,
        }
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn handle(&mut self, event: &InputEvent, _hit: Option<Hit>) -> Vec<Edit> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                let bounds = Bounds::new(x, y, x, y);
                let shape = match self.kind {
                    ToolKind::Line => Shape::line(bounds),
                    _ => Shape::triangle(bounds),
                };
                self.drawing = Some((shape.id, Point::new(x, y)));
                vec![Edit::AddShape(shape), Edit::Select(vec![])]
            }
            InputEvent::PointerMove { x, y, modifiers } => {
                let Some((shape, start)) = self.drawing else {
                    return vec![];
                };
                let (mut dx, mut dy) = (x - start.x, y - start.y);
                if modifiers.shift {
                    let side = dx.abs().max(dy.abs());
                    dx = side.copysign(dx);
                    dy = side.copysign(dy);
                }
                let bounds = if modifiers.alt {
                    Bounds::new(start.x - dx, start.y - dy, start.x + dx, start.y + dy)
                } else {
                    Bounds::new(start.x, start.y, start.x + dx, start.y + dy)
                };
                // Lines keep their drag direction in the rectangle.
                let bounds = match self.kind {
                    ToolKind::Line => bounds,
                    _ => bounds.normalized(),
                };
                vec![Edit::SetBounds { shape, bounds }]
            }
            InputEvent::PointerUp { .. } => match self.drawing.take() {
                Some((shape, _)) => vec![Edit::Select(vec![shape])],
                None => vec![],
            },
            InputEvent::KeyDown { .. } => vec![],
        }
    }
}

// ─── Pen Tool ────────────────────────────────────────────────────────────

/// Places polygon points one click at a time. Clicking near the first
/// point closes the polygon; Enter or Escape finishes it open.
#[derive(Debug, Default)]
pub struct PenTool {
    path: Option<EntityId>,
    first: Option<Point>,
    pressed: bool,
}

impl PenTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The polygon currently receiving points.
    pub fn active_path(&self) -> Option<EntityId> {
        self.path
    }

    fn finish(&mut self) -> Vec<Edit> {
        self.first = None;
        self.pressed = false;
        match self.path.take() {
            Some(id) => vec![Edit::EndEditing(id), Edit::Select(vec![id])],
            None => vec![],
        }
    }
}

impl Tool for PenTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pen
    }

    fn handle(&mut self, event: &InputEvent, _hit: Option<Hit>) -> Vec<Edit> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                let point = Point::new(x, y);
                self.pressed = true;
                let Some(shape) = self.path else {
                    let created = Shape::vector_editing(point);
                    let id = created.id;
                    self.path = Some(id);
                    self.first = Some(point);
                    return vec![Edit::AddShape(created), Edit::AddPoint { shape: id, point }];
                };
                let mut edits = vec![Edit::AddPoint { shape, point }];
                if let Some(first) = self.first
                    && (point.x - first.x).abs() < SNAP_TOLERANCE
                    && (point.y - first.y).abs() < SNAP_TOLERANCE
                {
                    edits.extend(self.finish());
                }
                edits
            }
            InputEvent::PointerMove { x, y, .. } => match self.path {
                Some(shape) if self.pressed => vec![Edit::MoveLastPoint {
                    shape,
                    point: Point::new(x, y),
                }],
                _ => vec![],
            },
            InputEvent::PointerUp { .. } => {
                self.pressed = false;
                vec![]
            }
            InputEvent::KeyDown {
                key: Key::Enter | Key::Escape,
                ..
            } => self.finish(),
            InputEvent::KeyDown { .. } => vec![],
        }
    }
}
