//! Resource handles returned by the storage helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of remote resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A Drive folder.
    Folder,
    /// Any other Drive file (uploaded media included).
    File,
    /// A tab inside a spreadsheet.
    SheetTab,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Folder => "folder",
            ResourceKind::File => "file",
            ResourceKind::SheetTab => "sheet tab",
        };
        f.write_str(name)
    }
}

/// A folder, file or sheet tab as reported by the backing service.
///
/// Identity is the opaque `id`. Names are not unique on the server side,
/// they are only treated as unique by the ensure helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Service-assigned identifier.
    pub id: String,
    /// Human-readable name (file name or tab title).
    pub name: String,
    /// Containing folder or spreadsheet identifier.
    pub parent_id: String,
    /// What the handle refers to.
    pub kind: ResourceKind,
}

impl ResourceHandle {
    /// Create a new handle.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.into(),
            kind,
        }
    }

    /// Numeric tab id for sheet tab handles.
    ///
    /// # Errors
    /// - Handle is not a sheet tab
    /// - Id is not numeric
    pub fn sheet_id(&self) -> crate::Result<i64> {
        if self.kind != ResourceKind::SheetTab {
            return Err(crate::Error::InvalidInput(format!(
                "{} '{}' is not a sheet tab",
                self.kind, self.name
            )));
        }
        self.id.parse().map_err(|_| {
            crate::Error::InvalidInput(format!("Sheet id is not numeric: {}", self.id))
        })
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.id)
    }
}

/// Outcome of an ensure-exists call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    /// The existing or newly created resource.
    pub handle: ResourceHandle,
    /// Whether this call created it.
    pub created: bool,
}

impl Ensured {
    /// Wrap a resource found by lookup.
    pub fn existing(handle: ResourceHandle) -> Self {
        Self {
            handle,
            created: false,
        }
    }

    /// Wrap a resource this call created.
    pub fn created(handle: ResourceHandle) -> Self {
        Self {
            handle,
            created: true,
        }
    }

    /// Identifier of the ensured resource.
    pub fn id(&self) -> &str {
        &self.handle.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sheet_id_parses_tab_handles() {
        let tab = ResourceHandle::new("1234", "Sheet2", "spreadsheet", ResourceKind::SheetTab);
        assert_eq!(tab.sheet_id().unwrap(), 1234);
    }

    #[test]
    fn test_sheet_id_rejects_folders() {
        let folder = ResourceHandle::new("abc", "Photos", "root", ResourceKind::Folder);
        assert!(folder.sheet_id().is_err());
    }

    #[test]
    fn test_ensured_constructors() {
        let handle = ResourceHandle::new("abc", "Photos", "root", ResourceKind::Folder);
        assert!(!Ensured::existing(handle.clone()).created);
        assert!(Ensured::created(handle).created);
    }

    #[test]
    fn test_display() {
        let handle = ResourceHandle::new("abc", "Photos", "root", ResourceKind::Folder);
        assert_eq!(handle.to_string(), "folder 'Photos' (abc)");
    }

    proptest! {
        #[test]
        fn sheet_id_round_trips(id in any::<i64>()) {
            let tab = ResourceHandle::new(id.to_string(), "t", "s", ResourceKind::SheetTab);
            prop_assert_eq!(tab.sheet_id().unwrap(), id);
        }
    }
}
