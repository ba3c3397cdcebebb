pub mod registry;
pub mod synth;
pub mod table;

pub use registry::{canonical_key, ComponentRegistry, ResolveError, ViewFactory, ViewKind, ViewRef};
pub use synth::{filter_menu, join_path, synthesize, visible_menu, RouteDefinition, RouteMeta};
pub use table::{RegisterError, RegisterReport, ResolvedRoute, RouteRecord, RouteTable};
