pub mod hit;
pub mod paint;
pub mod path;

pub use hit::{hit_test, hit_test_deep, hit_test_rect};
pub use paint::{brush_for, paint_sketch, to_color};
pub use path::{apply_path_effect, shape_path, shape_transform};
