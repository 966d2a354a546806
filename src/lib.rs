//! Bootstrap for the `springboot_db` development database.
//!
//! Collections are declared as [`seed_kernel::CollectionModule`]s; the initializer provisions
//! their indexes and seed documents through any [`seed_kernel::DocumentStore`].

pub mod initializer;
pub mod modules;
pub mod plan;
pub mod utils;
pub mod verify;

pub use initializer::{run, InitReport, COMPLETION_NOTICE};
pub use modules::registry;
