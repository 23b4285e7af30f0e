//! Integration tests: pointer-driven editing through the Editor (folio-editor).

use folio_core::{Bounds, EntityId, Point, Portfolio, ShapeKind, ShapeState};
use folio_editor::{Editor, InputEvent, Key, Modifiers, ToolKind};
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn editor() -> Editor {
    init();
    Editor::new(Portfolio::new())
}

fn click(editor: &mut Editor, x: f32, y: f32) {
    editor.handle(&InputEvent::down(x, y)).unwrap();
    editor.handle(&InputEvent::up(x, y)).unwrap();
}

fn drag(editor: &mut Editor, from: (f32, f32), to: (f32, f32)) {
    editor.handle(&InputEvent::down(from.0, from.1)).unwrap();
    editor.handle(&InputEvent::moved(to.0, to.1)).unwrap();
    editor.handle(&InputEvent::up(to.0, to.1)).unwrap();
}

fn shapes(editor: &Editor) -> Vec<EntityId> {
    editor
        .portfolio
        .selected_sketch()
        .unwrap()
        .shapes()
        .iter()
        .map(|s| s.id)
        .collect()
}

fn selected(editor: &Editor) -> Option<EntityId> {
    editor.portfolio.selected_shape().map(|s| s.id)
}

// ─── Shape tools ─────────────────────────────────────────────────────────

#[test]
fn triangle_tool_drags_out_bounds() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (10.0, 10.0), (50.0, 40.0));

    let ids = shapes(&editor);
    assert_eq!(ids.len(), 1);
    let shape = editor.portfolio.find_shape(ids[0]).unwrap();
    assert!(matches!(shape.kind(), ShapeKind::Triangle));
    assert_eq!(shape.bounds(), Bounds::new(10.0, 10.0, 50.0, 40.0));
    assert_eq!(selected(&editor), Some(ids[0]));
}

#[test]
fn triangle_tool_drags_up_and_left() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (50.0, 50.0), (10.0, 20.0));

    let id = shapes(&editor)[0];
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(10.0, 20.0, 50.0, 50.0)
    );
}

#[test]
fn line_tool_alt_draws_from_center() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Line);
    editor.handle(&InputEvent::down(50.0, 50.0)).unwrap();
    editor
        .handle(&InputEvent::PointerMove {
            x: 60.0,
            y: 70.0,
            modifiers: Modifiers::ALT,
        })
        .unwrap();
    editor.handle(&InputEvent::up(60.0, 70.0)).unwrap();

    let id = shapes(&editor)[0];
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(40.0, 30.0, 60.0, 70.0)
    );
}

// ─── Select tool ─────────────────────────────────────────────────────────

#[test]
fn select_and_move_a_shape() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (0.0, 0.0), (40.0, 40.0));
    let id = shapes(&editor)[0];

    editor.set_tool(ToolKind::Select);
    click(&mut editor, 200.0, 200.0);
    assert_eq!(selected(&editor), None);

    drag(&mut editor, (20.0, 30.0), (30.0, 45.0));
    assert_eq!(selected(&editor), Some(id));
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(10.0, 15.0, 50.0, 55.0)
    );
}

#[test]
fn marquee_selects_from_any_corner() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (0.0, 0.0), (10.0, 10.0));
    drag(&mut editor, (100.0, 100.0), (110.0, 110.0));
    let ids = shapes(&editor);

    editor.set_tool(ToolKind::Select);
    drag(&mut editor, (20.0, 20.0), (-5.0, -5.0));
    assert_eq!(editor.select.selected, vec![ids[0]]);
    assert_eq!(selected(&editor), Some(ids[0]));
}

#[test]
fn delete_key_removes_the_selection() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (0.0, 0.0), (40.0, 40.0));

    editor.set_tool(ToolKind::Select);
    click(&mut editor, 20.0, 30.0);
    editor.handle(&InputEvent::key(Key::Delete)).unwrap();
    assert!(shapes(&editor).is_empty());
    assert_eq!(selected(&editor), None);
}

// ─── Pen tool ────────────────────────────────────────────────────────────

#[test]
fn pen_tool_builds_a_closed_polygon() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Pen);
    click(&mut editor, 0.0, 0.0);
    click(&mut editor, 100.0, 0.0);
    click(&mut editor, 100.0, 100.0);
    assert!(editor.pen.active_path().is_some());
    click(&mut editor, 2.0, 3.0);

    assert_eq!(editor.pen.active_path(), None);
    let id = shapes(&editor)[0];
    let shape = editor.portfolio.find_shape(id).unwrap();
    assert_eq!(shape.state(), ShapeState::Normal);
    assert_eq!(
        shape.points(),
        &[
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 0.0),
        ]
    );
    assert_eq!(selected(&editor), Some(id));
}

#[test]
fn pen_drag_places_the_point_where_released() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Pen);
    click(&mut editor, 0.0, 0.0);
    drag(&mut editor, (50.0, 50.0), (60.0, 70.0));
    editor.handle(&InputEvent::key(Key::Enter)).unwrap();

    let id = shapes(&editor)[0];
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().points(),
        &[Point::new(0.0, 0.0), Point::new(60.0, 70.0)]
    );
}

// ─── Point editing ───────────────────────────────────────────────────────

#[test]
fn enter_edits_points_and_handles_drag_them() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Pen);
    for (x, y) in [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (1.0, 1.0)] {
        click(&mut editor, x, y);
    }
    let id = shapes(&editor)[0];

    editor.set_tool(ToolKind::Select);
    click(&mut editor, 90.0, 50.0);
    assert_eq!(selected(&editor), Some(id));
    editor.handle(&InputEvent::key(Key::Enter)).unwrap();
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().state(),
        ShapeState::Editing
    );

    drag(&mut editor, (100.0, 100.0), (120.0, 110.0));
    editor.handle(&InputEvent::key(Key::Escape)).unwrap();

    let shape = editor.portfolio.find_shape(id).unwrap();
    assert_eq!(shape.state(), ShapeState::Normal);
    assert_eq!(shape.points()[2], Point::new(120.0, 110.0));
    assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 120.0, 110.0));
}

#[test]
fn editing_a_triangle_is_refused() {
    let mut editor = editor();
    editor.set_tool(ToolKind::Triangle);
    drag(&mut editor, (0.0, 0.0), (40.0, 40.0));

    editor.set_tool(ToolKind::Select);
    click(&mut editor, 20.0, 30.0);
    assert!(editor.handle(&InputEvent::key(Key::Enter)).is_err());
    assert_eq!(editor.select.editing, None);
}
