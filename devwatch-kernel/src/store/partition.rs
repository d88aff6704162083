use super::quote_ident;
use crate::validator::Identity;

/// Names the partition of an identity: `<identity><suffix>`.
///
/// There is no creation step here; the table appears on the first write
/// through the returned handle. Names the backend refuses (e.g. a leading
/// `sqlite_`) only fail at that write.
#[derive(Debug, Clone)]
pub struct PartitionResolver {
    suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHandle {
    name: String,
}

impl PartitionResolver {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    pub fn resolve(&self, identity: &Identity) -> PartitionHandle {
        PartitionHandle {
            name: format!("{}{}", identity.as_str(), self.suffix),
        }
    }
}

impl PartitionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    pub(crate) fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                _id TEXT NOT NULL,
                Username TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            self.quoted_name()
        )
    }
}
