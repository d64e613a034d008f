mod compiler;
mod database;
mod discovery;
mod factory;
mod types;

pub use compiler::{compile_thing_defs, ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{ThingDef, ThingDefDatabase, ThingDefId};
pub use discovery::BASE_MOD_ID;
pub use factory::{ContentFactory, DefFactory, ThingRecipe};
pub use types::{ContentDiscoveryError, ContentRequest};
