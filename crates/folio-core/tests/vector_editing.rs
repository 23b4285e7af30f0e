//! Integration tests: vector point editing, groups and paint order through
//! the portfolio (folio-core).

use folio_core::{
    Bounds, EntityId, FolioError, Portfolio, PortfolioEvent, Point, Reorder, SNAP_TOLERANCE, Shape,
    ShapeKind, ShapeState, ShapeStyle, StyleKind,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pt(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

/// A portfolio with an empty polygon in Editing state.
fn editing_polygon() -> (Portfolio, EntityId) {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let shape = portfolio
        .add_shape(sketch, Shape::vector_editing(pt(0.0, 0.0)))
        .unwrap();
    (portfolio, shape)
}

fn add(portfolio: &mut Portfolio, shape: EntityId, p: Point) -> ShapeState {
    portfolio
        .update_shape(shape, |s| s.add_point(p))
        .unwrap()
        .unwrap()
}

// ─── Point entry ─────────────────────────────────────────────────────────

#[test]
fn closing_point_snaps_to_the_first() {
    init();
    let (mut portfolio, shape) = editing_polygon();
    for p in [pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0)] {
        assert_eq!(add(&mut portfolio, shape, p), ShapeState::Editing);
    }
    assert_eq!(add(&mut portfolio, shape, pt(2.0, 3.0)), ShapeState::Finalizing);

    let shape = portfolio.find_shape(shape).unwrap();
    assert_eq!(shape.state(), ShapeState::Finalizing);
    assert_eq!(
        shape.points(),
        &[pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0), pt(0.0, 0.0)]
    );
    assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(shape.handles().len(), 4);
}

#[test]
fn point_at_the_tolerance_does_not_snap() {
    let (mut portfolio, shape) = editing_polygon();
    add(&mut portfolio, shape, pt(0.0, 0.0));
    add(&mut portfolio, shape, pt(50.0, 0.0));
    assert_eq!(
        add(&mut portfolio, shape, pt(SNAP_TOLERANCE, 1.0)),
        ShapeState::Editing
    );
    assert_eq!(
        portfolio.find_shape(shape).unwrap().points().last(),
        Some(&pt(SNAP_TOLERANCE, 1.0))
    );
}

#[test]
fn every_point_edit_is_announced() {
    let (mut portfolio, shape) = editing_polygon();
    let sketch = portfolio.sketches()[0].id;
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    portfolio.on_event(move |e| sink.borrow_mut().push(*e));

    add(&mut portfolio, shape, pt(10.0, 10.0));
    assert_eq!(
        *events.borrow(),
        vec![
            PortfolioEvent::UndoPointRequested,
            PortfolioEvent::ShapesModified(sketch),
        ]
    );
}

// ─── Handles ─────────────────────────────────────────────────────────────

#[test]
fn dragging_a_handle_moves_its_point_and_bounds() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let shape = portfolio
        .add_shape(
            sketch,
            Shape::vector(vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0)], true),
        )
        .unwrap();
    portfolio
        .update_shape(shape, |s| s.start_editing())
        .unwrap()
        .unwrap();
    let handle = portfolio
        .find_shape(shape)
        .unwrap()
        .hit_handle(pt(101.0, 99.0))
        .unwrap();
    assert_eq!(handle, 2);

    portfolio
        .update_shape(shape, |s| s.drag_handle(handle, pt(150.0, 120.0)))
        .unwrap()
        .unwrap();
    portfolio.update_shape(shape, |s| s.end_editing()).unwrap();

    let shape = portfolio.find_shape(shape).unwrap();
    assert_eq!(shape.state(), ShapeState::Normal);
    assert!(shape.handles().is_empty());
    assert_eq!(shape.points()[2], pt(150.0, 120.0));
    assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 150.0, 120.0));
}

#[test]
fn only_vectors_enter_editing() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let triangle = portfolio
        .add_shape(sketch, Shape::triangle(Bounds::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let result = portfolio.update_shape(triangle, |s| s.start_editing()).unwrap();
    assert!(matches!(result, Err(FolioError::NotEditable(id)) if id == triangle));
    assert_eq!(
        portfolio.find_shape(triangle).unwrap().state(),
        ShapeState::Normal
    );
}

// ─── Resize ──────────────────────────────────────────────────────────────

#[test]
fn resizing_maps_points_into_new_bounds() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let shape = portfolio
        .add_shape(
            sketch,
            Shape::vector(vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0)], true),
        )
        .unwrap();
    portfolio
        .update_shape(shape, |s| s.set_bounds(Bounds::new(10.0, 10.0, 210.0, 60.0)))
        .unwrap();
    assert_eq!(
        portfolio.find_shape(shape).unwrap().points(),
        &[pt(10.0, 10.0), pt(210.0, 10.0), pt(210.0, 60.0)]
    );
}

#[test]
fn resizing_a_flat_vector_keeps_bounds_on_its_points() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let shape = portfolio
        .add_shape(sketch, Shape::vector(vec![pt(0.0, 10.0), pt(100.0, 10.0)], false))
        .unwrap();
    portfolio
        .update_shape(shape, |s| s.set_bounds(Bounds::new(0.0, 0.0, 200.0, 40.0)))
        .unwrap();

    let shape = portfolio.find_shape(shape).unwrap();
    assert_eq!(shape.points(), &[pt(0.0, 20.0), pt(200.0, 20.0)]);
    assert_eq!(shape.bounds(), Bounds::new(0.0, 20.0, 200.0, 20.0));
}

#[test]
fn grouped_shapes_move_together() {
    init();
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let a = portfolio
        .add_shape(sketch, Shape::triangle(Bounds::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let b = portfolio
        .add_shape(sketch, Shape::line(Bounds::new(20.0, 0.0, 30.0, 10.0)))
        .unwrap();
    let group = portfolio.group_shapes(sketch, &[a, b]).unwrap();

    let top: Vec<_> = portfolio.sketches()[0].shapes().iter().map(|s| s.id).collect();
    assert_eq!(top, vec![group]);
    assert_eq!(
        portfolio.find_shape(group).unwrap().bounds(),
        Bounds::new(0.0, 0.0, 30.0, 10.0)
    );

    portfolio.update_shape(group, |s| s.move_by(5.0, 5.0)).unwrap();
    assert_eq!(
        portfolio.find_shape(a).unwrap().bounds(),
        Bounds::new(5.0, 5.0, 15.0, 15.0)
    );
    assert_eq!(
        portfolio.find_shape(b).unwrap().bounds(),
        Bounds::new(25.0, 5.0, 35.0, 15.0)
    );
    let children = match portfolio.find_shape(group).unwrap().kind() {
        ShapeKind::Group(children) => children.len(),
        _ => 0,
    };
    assert_eq!(children, 2);
}

// ─── Paint order ─────────────────────────────────────────────────────────

#[test]
fn reordering_renumbers_layer_depth() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let ids: Vec<_> = (0..3)
        .map(|i| {
            let x = i as f32 * 20.0;
            portfolio
                .add_shape(sketch, Shape::triangle(Bounds::new(x, 0.0, x + 10.0, 10.0)))
                .unwrap()
        })
        .collect();

    assert!(portfolio.reorder_shape(ids[0], Reorder::Front).unwrap());
    assert!(!portfolio.reorder_shape(ids[0], Reorder::Forward).unwrap());

    let order: Vec<_> = portfolio.sketches()[0]
        .shapes()
        .iter()
        .map(|s| (s.id, s.layer_depth))
        .collect();
    assert_eq!(order, vec![(ids[1], 0), (ids[2], 1), (ids[0], 2)]);
}

// ─── Shape styles ────────────────────────────────────────────────────────

#[test]
fn detaching_a_shared_style_is_announced() {
    let mut portfolio = Portfolio::new();
    let sketch = portfolio.sketches()[0].id;
    let shape = portfolio
        .add_shape(sketch, Shape::triangle(Bounds::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let shared = portfolio.add_style("Outline", StyleKind::Standard);
    portfolio.use_shared_style(shape, shared).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    portfolio.on_event(move |e| sink.borrow_mut().push(*e));
    let owned = portfolio.detach_shape_style(shape).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            PortfolioEvent::UndoPointRequested,
            PortfolioEvent::ShapesModified(sketch),
        ]
    );
    match portfolio.find_shape(shape).unwrap().style() {
        ShapeStyle::Owned(style) => {
            assert_eq!(style.id, owned);
            assert_eq!(style.kind(), StyleKind::Custom);
        }
        ShapeStyle::Shared(id) => panic!("still shared with {id}"),
    }
}
