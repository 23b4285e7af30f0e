pub mod editor;
pub mod history;
pub mod input;
pub mod tools;

pub use editor::Editor;
pub use history::{History, HistoryConfig};
pub use input::{InputEvent, Key, Modifiers};
pub use tools::{Edit, Hit, PenTool, SelectTool, ShapeTool, Tool, ToolKind};
