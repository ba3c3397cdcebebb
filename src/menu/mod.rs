pub mod model;
pub mod resolver;

pub use model::{MenuMeta, MenuNode, RawMenuItem};
pub use resolver::{fallback_menu, MenuResolver, MenuSnapshot, MenuSource, NAV_PATH};
