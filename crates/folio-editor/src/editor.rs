//! Editor engine: owns the portfolio, its history and the canvas tools.
//!
//! Input events are hit-tested against the selected sketch, handed to the
//! active tool, and the resulting edits are applied through the
//! [`History`]. A pointer gesture (down → moves → up) is one undo step.

use crate::history::{History, HistoryConfig};
use crate::input::InputEvent;
use crate::tools::{Edit, Hit, PenTool, SelectTool, ShapeTool, Tool, ToolKind};
use folio_core::{EntityId, EntityKind, FolioError, Portfolio, Result, ShapeState};
use folio_render::{hit_test, hit_test_rect};

pub struct Editor {
    pub portfolio: Portfolio,
    pub history: History,
    pub select: SelectTool,
    pub pen: PenTool,
    line: ShapeTool,
    triangle: ShapeTool,
    active: ToolKind,
}

impl Editor {
    pub fn new(portfolio: Portfolio) -> Self {
        Self::with_config(portfolio, HistoryConfig::default())
    }

    pub fn with_config(mut portfolio: Portfolio, config: HistoryConfig) -> Self {
        let history = History::attach(&mut portfolio, config);
        Self {
            portfolio,
            history,
            select: SelectTool::new(),
            pen: PenTool::new(),
            line: ShapeTool::line(),
            triangle: ShapeTool::triangle(),
            active: ToolKind::Select,
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active
    }

    pub fn set_tool(&mut self, kind: ToolKind) {
        log::debug!("tool {:?} -> {kind:?}", self.active);
        self.active = kind;
    }

    fn sketch_id(&self) -> Result<EntityId> {
        self.portfolio
            .selected_sketch()
            .map(|s| s.id)
            .ok_or(FolioError::not_found(EntityKind::Sketch, self.portfolio.id))
    }

    /// What lies under the pointer: a handle of the shape being edited
    /// first, then the topmost shape.
    fn hit_at(&self, event: &InputEvent) -> Option<Hit> {
        let p = event.position()?;
        let sketch = self.portfolio.selected_sketch()?;
        if let Some(editing) = self.select.editing
            && let Some(shape) = sketch.find_shape(editing)
            && shape.state() != ShapeState::Normal
            && let Some(index) = shape.hit_handle(p)
        {
            return Some(Hit::Handle {
                shape: editing,
                index,
            });
        }
        hit_test(sketch, p).map(Hit::Shape)
    }

    /// Route one input event through the active tool.
    pub fn handle(&mut self, event: &InputEvent) -> Result<()> {
        let hit = self.hit_at(event);
        let edits = match self.active {
            ToolKind::Select => self.select.handle(event, hit),
            ToolKind::Pen => self.pen.handle(event, hit),
            ToolKind::Line => self.line.handle(event, hit),
            ToolKind::Triangle => self.triangle.handle(event, hit),
        };

        if matches!(event, InputEvent::PointerDown { .. }) {
            self.history.begin_batch(&self.portfolio)?;
        }
        let mut outcome = Ok(());
        for edit in edits {
            if let Err(err) = self.apply(edit) {
                log::warn!("edit failed: {err}");
                outcome = Err(err);
                break;
            }
        }
        if matches!(event, InputEvent::PointerUp { .. }) && self.history.is_batching() {
            self.history.end_batch("canvas edit");
        }
        outcome
    }

    fn apply(&mut self, edit: Edit) -> Result<()> {
        let sketch = self.sketch_id()?;
        match edit {
            Edit::Select(ids) => {
                self.portfolio.select_shape(ids.first().copied())?;
            }
            Edit::SelectRect(rect) => {
                let hits = self
                    .portfolio
                    .find_sketch(sketch)
                    .map(|s| hit_test_rect(s, &rect))
                    .unwrap_or_default();
                self.portfolio.select_shape(hits.first().copied())?;
                self.select.selected = hits;
            }
            Edit::StartEditing(id) => {
                let started = self
                    .record("edit points", |p| apply_edit(p, sketch, Edit::StartEditing(id)))
                    .and_then(|r| r);
                if started.is_err() {
                    self.select.editing = None;
                }
                started?;
            }
            edit => {
                let description = describe(&edit);
                self.record(description, |p| apply_edit(p, sketch, edit))??;
            }
        }
        Ok(())
    }

    fn record<R>(&mut self, description: &str, edit: impl FnOnce(&mut Portfolio) -> R) -> Result<R> {
        self.history.execute(&mut self.portfolio, description, edit)
    }

    pub fn undo(&mut self) -> Result<Option<String>> {
        self.forget_transient_state();
        self.history.undo(&mut self.portfolio)
    }

    pub fn redo(&mut self) -> Result<Option<String>> {
        self.forget_transient_state();
        self.history.redo(&mut self.portfolio)
    }

    fn forget_transient_state(&mut self) {
        self.select = SelectTool::new();
        self.pen = PenTool::new();
    }
}

fn describe(edit: &Edit) -> &'static str {
    match edit {
        Edit::AddShape(_) => "add shape",
        Edit::DeleteShapes(_) => "delete",
        Edit::DuplicateShape(_) => "duplicate",
        Edit::MoveShapes { .. } => "move",
        Edit::SetBounds { .. } => "resize",
        Edit::StartEditing(_)
        | Edit::EndEditing(_)
        | Edit::AddPoint { .. }
        | Edit::MoveLastPoint { .. }
        | Edit::DragHandle { .. } => "edit points",
        Edit::Select(_) | Edit::SelectRect(_) => "select",
    }
}

/// Apply one document edit to `sketch`.
fn apply_edit(portfolio: &mut Portfolio, sketch: EntityId, edit: Edit) -> Result<()> {
    match edit {
        Edit::AddShape(shape) => {
            portfolio.add_shape(sketch, shape)?;
        }
        Edit::DeleteShapes(ids) => {
            for id in ids {
                portfolio.delete_shape(id)?;
            }
        }
        Edit::DuplicateShape(id) => {
            let copy = portfolio
                .find_shape(id)
                .ok_or(FolioError::not_found(EntityKind::Shape, id))?
                .duplicate();
            portfolio.add_shape(sketch, copy)?;
        }
        Edit::MoveShapes { ids, dx, dy } => {
            for id in ids {
                portfolio.update_shape(id, |s| s.move_by(dx, dy))?;
            }
        }
        Edit::SetBounds { shape, bounds } => {
            portfolio.update_shape(shape, |s| s.set_bounds(bounds))?;
        }
        Edit::StartEditing(shape) => portfolio.update_shape(shape, |s| s.start_editing())??,
        Edit::EndEditing(shape) => portfolio.update_shape(shape, |s| s.end_editing())?,
        Edit::AddPoint { shape, point } => {
            let state = portfolio.update_shape(shape, |s| s.add_point(point))??;
            log::trace!("point added to {shape}, now {state:?}");
        }
        Edit::MoveLastPoint { shape, point } => {
            portfolio.update_shape(shape, |s| s.move_last_point(point))??
        }
        Edit::DragHandle {
            shape,
            handle,
            point,
        } => portfolio.update_shape(shape, |s| s.drag_handle(handle, point))??,
        Edit::Select(_) | Edit::SelectRect(_) => {}
    }
    Ok(())
}
