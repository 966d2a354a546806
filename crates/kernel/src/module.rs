use bson::Document;

use crate::settings::Settings;
use crate::store::DocumentStore;

/// Context provided to collection modules while the database is being bootstrapped
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub store: &'a dyn DocumentStore,
}

/// Key type of a single-field index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ascending,
    Text,
}

/// Secondary index declaration for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: &'static str,
    pub kind: IndexKind,
    pub unique: bool,
}

impl IndexSpec {
    pub const fn ascending(field: &'static str) -> Self {
        Self {
            field,
            kind: IndexKind::Ascending,
            unique: false,
        }
    }

    pub const fn unique(field: &'static str) -> Self {
        Self {
            field,
            kind: IndexKind::Ascending,
            unique: true,
        }
    }

    pub const fn text(field: &'static str) -> Self {
        Self {
            field,
            kind: IndexKind::Text,
            unique: false,
        }
    }

    /// Server-side name, following MongoDB's `<field>_<type>` default
    pub fn name(&self) -> String {
        match self.kind {
            IndexKind::Ascending => format!("{}_1", self.field),
            IndexKind::Text => format!("{}_text", self.field),
        }
    }

    /// Key pattern document as sent to `createIndexes`
    pub fn keys(&self) -> Document {
        let mut keys = Document::new();
        match self.kind {
            IndexKind::Ascending => keys.insert(self.field, 1),
            IndexKind::Text => keys.insert(self.field, "text"),
        };
        keys
    }
}

/// A collection owned by the seeder: its indexes and its seed documents
pub trait CollectionModule: Sync + Send {
    /// Collection name in the target database
    fn name(&self) -> &'static str;

    /// Indexes provisioned before any document is inserted
    fn indexes(&self) -> Vec<IndexSpec> {
        vec![]
    }

    /// Field identifying a seed document across runs, used by upsert mode
    fn natural_key(&self) -> Option<&'static str> {
        None
    }

    /// Seed documents, stamped with the settings' audit author and the current time
    fn seed_documents(&self, _settings: &Settings) -> anyhow::Result<Vec<Document>> {
        Ok(vec![])
    }
}
