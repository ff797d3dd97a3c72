use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a table, shared by every run belonging to it.
    TableId
);
string_id!(
    /// Identifier of a row within its table.
    RowId
);
string_id!(
    /// Identifier of a column within its table.
    ColId
);

/// Identifies a cell within one table by its starting row and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    pub row: RowId,
    pub col: ColId,
}

impl CellKey {
    pub fn new(row: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            row: RowId(row.into()),
            col: ColId(col.into()),
        }
    }
}

/// A cell addressed across the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub table: TableId,
    #[serde(flatten)]
    pub cell: CellKey,
}

impl CellRef {
    pub fn new(table: TableId, cell: CellKey) -> Self {
        Self { table, cell }
    }
}

/// Allocates fresh table/row/column ids.
///
/// Ids have the form `<kind>-<n>`. The counter is seeded past every id
/// already present in a document so pasted or imported tables never
/// collide with live ones.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Bump the counter past a numeric suffix found in an existing id.
    pub fn observe(&mut self, id: &str) {
        let Some((_, suffix)) = id.rsplit_once('-') else {
            return;
        };
        if let Ok(n) = suffix.parse::<u64>() {
            if n >= self.next {
                self.next = n.saturating_add(1);
            }
        }
    }

    fn bump(&mut self, kind: &str) -> String {
        let n = self.next.max(1);
        self.next = n.saturating_add(1);
        format!("{kind}-{n}")
    }

    pub fn table(&mut self) -> TableId {
        TableId(self.bump("table"))
    }

    pub fn row(&mut self) -> RowId {
        RowId(self.bump("row"))
    }

    pub fn col(&mut self) -> ColId {
        ColId(self.bump("col"))
    }
}
