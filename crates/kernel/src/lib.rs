pub mod error;
pub mod module;
pub mod registry;
pub mod settings;
pub mod store;

pub use error::StoreError;
pub use module::{CollectionModule, IndexKind, IndexSpec, InitCtx};
pub use registry::{CollectionRegistry, CollectionSeed, ProvisionedIndex, SeedReport};
pub use store::{DocumentStore, NewUser, UpsertOutcome};
