//! Built-in tools

mod display;
mod map;
mod media;
mod search;

pub use display::{ShowImageTool, ShowVideoTool};
pub use map::{coordinates_url, query_url, MapLookupTool};
pub use media::{GenerateChartTool, GenerateImageTool, GenerateTableTool};
pub use search::WebSearchTool;
