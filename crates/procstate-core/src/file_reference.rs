//! A data item holding a reference to a file on disk.
//!
//! Typical use is a sampler's current sample: the path is part of the saved
//! state, and whenever it changes the referenced file has to be (re)loaded
//! before the component can run with it. That loading is the item's *change
//! action*; it runs synchronously inside [`FileReference::set_file`] and
//! [`DataItem::restore`], so a host restoring state on a loader thread gets
//! control back only once the new file is ready.
//!
//! Serialized form: `<FILE file="/path/to/file"/>`, with an empty `file`
//! attribute when no file is selected. Paths have to be valid UTF-8 so the
//! attribute restores exactly the file that was saved.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::data::{check_kind, ChangeNotifier, DataItem};
use crate::error::DataError;
use crate::tree::StateNode;

/// Node tag for serialized file references.
pub const FILE_TAG: &str = "FILE";

/// Attribute holding the path.
pub const FILE_ATTRIBUTE: &str = "file";

/// Work performed whenever a new file is selected (e.g. loading it).
pub type ChangeAction = Arc<dyn Fn(&Path) -> Result<(), String> + Send + Sync>;

/// Data item referencing a single file.
pub struct FileReference {
    id: String,
    file: Mutex<Option<PathBuf>>,
    /// Serializes changes so two loaders can't interleave their actions.
    change_lock: Mutex<()>,
    action: Option<ChangeAction>,
    notifier: ChangeNotifier,
}

impl FileReference {
    /// Create a reference with no file selected and no change action.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: Mutex::new(None),
            change_lock: Mutex::new(()),
            action: None,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Install the action run for every newly selected file.
    ///
    /// Returning `Err` rejects the file and leaves the previous one in place.
    pub fn with_change_action(
        mut self,
        action: impl Fn(&Path) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Currently selected file.
    pub fn file(&self) -> Option<PathBuf> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Select a new file, running the change action first.
    ///
    /// Listeners are woken immediately rather than at the next scheduled
    /// pump tick, since this is usually a direct UI response. Non-UTF-8
    /// paths are refused before the action runs.
    pub fn set_file(&self, path: impl Into<PathBuf>) -> Result<(), DataError> {
        let path = path.into();
        if path.to_str().is_none() {
            return Err(DataError::NonUtf8Path(path));
        }
        let _guard = self.change_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_action(&path)?;
        self.replace(Some(path));
        self.notify_changed(true);
        Ok(())
    }

    /// Deselect the current file.
    pub fn clear(&self) {
        let _guard = self.change_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.replace(None);
        self.notify_changed(true);
    }

    fn run_action(&self, path: &Path) -> Result<(), DataError> {
        match &self.action {
            Some(action) => action(path).map_err(DataError::ActionFailed),
            None => Ok(()),
        }
    }

    fn replace(&self, file: Option<PathBuf>) {
        *self.file.lock().unwrap_or_else(PoisonError::into_inner) = file;
    }
}

impl DataItem for FileReference {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        FILE_TAG
    }

    fn serialize(&self) -> StateNode {
        let path = self
            .file()
            .and_then(|p| p.to_str().map(str::to_owned))
            .unwrap_or_default();
        StateNode::new(FILE_TAG).with_attribute(FILE_ATTRIBUTE, path)
    }

    fn restore(&self, node: &StateNode) -> Result<(), DataError> {
        check_kind(node, FILE_TAG)?;
        let path = node
            .attribute(FILE_ATTRIBUTE)
            .ok_or(DataError::MissingAttribute(FILE_ATTRIBUTE))?;

        let _guard = self.change_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if path.is_empty() {
            self.replace(None);
        } else {
            let path = PathBuf::from(path);
            self.run_action(&path)?;
            self.replace(Some(path));
        }
        self.notify_changed(false);
        Ok(())
    }

    fn reset_to_default(&self) {
        let _guard = self.change_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.replace(None);
        self.notify_changed(false);
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl fmt::Debug for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileReference")
            .field("id", &self.id)
            .field("file", &self.file())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}
