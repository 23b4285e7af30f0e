//! Integration tests: snapshot undo/redo of portfolio edits (folio-editor).

use folio_core::{Bounds, Portfolio, PortfolioEvent, Side, StyleKind, presets};
use folio_editor::{Editor, History, HistoryConfig, InputEvent, ToolKind};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn color_names(portfolio: &Portfolio) -> Vec<String> {
    portfolio.colors().iter().map(|c| c.name.clone()).collect()
}

// ─── Basic undo/redo ─────────────────────────────────────────────────────

#[test]
fn undo_and_redo_a_color() {
    init();
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    let red = history
        .execute(&mut portfolio, "add color", |p| p.add_color("Red", presets::RED))
        .unwrap();
    assert!(history.can_undo());

    assert_eq!(history.undo(&mut portfolio).unwrap(), Some("add color".to_string()));
    assert!(portfolio.find_color(red).is_none());
    assert!(history.can_redo());

    assert_eq!(history.redo(&mut portfolio).unwrap(), Some("add color".to_string()));
    assert_eq!(color_names(&portfolio), vec!["Red"]);
    assert_eq!(portfolio.find_color(red).unwrap().name, "Red");
}

#[test]
fn undo_on_empty_history_is_a_no_op() {
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    assert_eq!(history.undo(&mut portfolio).unwrap(), None);
    assert_eq!(history.redo(&mut portfolio).unwrap(), None);
}

#[test]
fn new_edit_clears_redo() {
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    history
        .execute(&mut portfolio, "add", |p| p.add_color("A", presets::RED))
        .unwrap();
    history.undo(&mut portfolio).unwrap();
    history
        .execute(&mut portfolio, "add", |p| p.add_color("B", presets::BLUE))
        .unwrap();
    assert!(!history.can_redo());
    assert_eq!(color_names(&portfolio), vec!["B"]);
}

// ─── Restored documents ──────────────────────────────────────────────────

#[test]
fn undo_restores_links_between_entities() {
    init();
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    let red = portfolio.add_color("Red", presets::RED);
    let style = portfolio.add_style("Alarm", StyleKind::Standard);
    portfolio.set_style_color(style, Side::Fill, Some(red)).unwrap();

    history
        .execute(&mut portfolio, "delete color", |p| p.delete_color(red))
        .unwrap()
        .unwrap();
    assert_eq!(portfolio.find_style(style).unwrap().side(Side::Fill).color(), None);

    history.undo(&mut portfolio).unwrap();
    assert_eq!(
        portfolio.find_style(style).unwrap().side(Side::Fill).color(),
        Some(red)
    );
    portfolio
        .update_color(red, |c| c.set_color(presets::GREEN))
        .unwrap();
    assert_eq!(
        portfolio.find_style(style).unwrap().paint(Side::Fill).color.to_hex(),
        presets::GREEN.to_hex()
    );
}

#[test]
fn listeners_survive_a_restore() {
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    let restored = Rc::new(Cell::new(0));
    let seen = Rc::clone(&restored);
    portfolio.on_event(move |e| {
        if *e == PortfolioEvent::Restored {
            seen.set(seen.get() + 1);
        }
    });

    history
        .execute(&mut portfolio, "add sketch", |p| p.add_sketch())
        .unwrap();
    history.undo(&mut portfolio).unwrap();
    history.redo(&mut portfolio).unwrap();
    assert_eq!(restored.get(), 2);

    history
        .execute(&mut portfolio, "add sketch", |p| p.add_sketch())
        .unwrap();
    assert_eq!(history.undo_depth(), 2);
}

// ─── Batching ────────────────────────────────────────────────────────────

#[test]
fn batch_groups_edits_into_one_step() {
    let mut portfolio = Portfolio::new();
    let mut history = History::attach(&mut portfolio, HistoryConfig::default());
    history.begin_batch(&portfolio).unwrap();
    history.begin_batch(&portfolio).unwrap();
    for name in ["A", "B", "C"] {
        history
            .execute(&mut portfolio, "add", |p| p.add_color(name, presets::RED))
            .unwrap();
    }
    history.end_batch("inner");
    assert!(history.is_batching());
    history.end_batch("three colors");

    assert_eq!(history.undo_depth(), 1);
    assert_eq!(
        history.undo(&mut portfolio).unwrap(),
        Some("three colors".to_string())
    );
    assert!(portfolio.colors().is_empty());
}

#[test]
fn a_drag_gesture_is_one_undo_step() {
    init();
    let mut editor = Editor::new(Portfolio::new());
    editor.set_tool(ToolKind::Triangle);
    editor.handle(&InputEvent::down(0.0, 0.0)).unwrap();
    for step in 1..=4 {
        let v = step as f32 * 10.0;
        editor.handle(&InputEvent::moved(v, v)).unwrap();
    }
    editor.handle(&InputEvent::up(40.0, 40.0)).unwrap();
    assert_eq!(editor.history.undo_depth(), 1);

    editor.set_tool(ToolKind::Select);
    let id = editor.portfolio.selected_shape().unwrap().id;
    editor.handle(&InputEvent::down(20.0, 30.0)).unwrap();
    editor.handle(&InputEvent::moved(25.0, 30.0)).unwrap();
    editor.handle(&InputEvent::moved(30.0, 30.0)).unwrap();
    editor.handle(&InputEvent::up(30.0, 30.0)).unwrap();
    assert_eq!(editor.history.undo_depth(), 2);
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(10.0, 0.0, 50.0, 40.0)
    );

    assert_eq!(editor.undo().unwrap(), Some("canvas edit".to_string()));
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(0.0, 0.0, 40.0, 40.0)
    );
    editor.undo().unwrap();
    assert!(editor.portfolio.find_shape(id).is_none());

    editor.redo().unwrap();
    editor.redo().unwrap();
    assert_eq!(
        editor.portfolio.find_shape(id).unwrap().bounds(),
        Bounds::new(10.0, 0.0, 50.0, 40.0)
    );
}

#[test]
fn a_click_without_changes_records_nothing() {
    let mut editor = Editor::new(Portfolio::new());
    editor.handle(&InputEvent::down(5.0, 5.0)).unwrap();
    editor.handle(&InputEvent::up(5.0, 5.0)).unwrap();
    assert!(!editor.history.can_undo());
    assert!(!editor.history.is_batching());
}
