//! Typed wrappers for the backend routes the client uses.
//!
//! Domain records (programs, platforms, shortcuts) stay opaque
//! [`serde_json::Value`]s; only request payloads are typed.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiClient;
use crate::Result;

/// Start capturing backend console output.
pub const CONSOLE_CAPTURE: &str = "/api/console/capture";
/// Read the accumulated console output as plain text.
pub const CONSOLE_OUTPUT: &str = "/api/console/output";
/// Stop capturing backend console output.
pub const CONSOLE_RELEASE: &str = "/api/console/release";
/// Empty the console buffer.
pub const CONSOLE_CLEAR: &str = "/api/console/clear";

/// Program install or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramAction {
    /// Install the selected programs.
    Install,
    /// Remove the selected programs.
    Remove,
}

impl ProgramAction {
    fn path(self) -> &'static str {
        match self {
            Self::Install => "/api/programs/install",
            Self::Remove => "/api/programs/remove",
        }
    }
}

/// Direction of a state sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    /// Copy emulator state from the device into storage.
    Backup,
    /// Copy emulator state from storage back onto the device.
    Restore,
}

impl StateAction {
    fn path(self) -> &'static str {
        match self {
            Self::Backup => "/api/state/backup",
            Self::Restore => "/api/state/restore",
        }
    }
}

/// Body for program install/removal.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProgramsData {
    /// Program identifiers.
    pub programs: Vec<String>,
    /// Free-form preference flags.
    pub preferences: Vec<String>,
}

/// Body shared by ROM processing and state backup/restore.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PlatformsData {
    /// Platform names to process.
    pub platforms: Vec<String>,
    /// Free-form preference flags.
    pub preferences: Vec<String>,
}

/// Body for the initial setup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetupData {
    /// Link storage folders with symlinks instead of plain folders.
    pub use_symlink: bool,
    /// Root folder for emulation storage.
    pub storage_path: String,
}

/// Body for creating a shortcut from a file on disk.
///
/// The backend works out the platform and launcher from `path`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CreateShortcutData {
    /// Display name; the backend derives one from the file when empty.
    pub name: String,
    /// Executable or ROM path.
    pub path: String,
}

/// Full shortcut definition used when adding or updating a shortcut.
///
/// An empty `id` on add lets the backend generate one from the name and
/// executable; an empty `start_directory` defaults to the executable's
/// folder.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutData {
    /// Shortcut identifier.
    pub id: String,
    /// Program that owns the shortcut, if any.
    pub program: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Working directory for the launch.
    pub start_directory: String,
    /// Executable to launch.
    pub executable: String,
    /// Arguments passed to the executable.
    pub launch_options: String,
    /// Path relative to the storage root, for ROMs.
    pub relative_path: String,
    /// Icon artwork URL.
    pub icon_url: String,
    /// Logo artwork URL.
    pub logo_url: String,
    /// Vertical cover artwork URL.
    pub cover_url: String,
    /// Horizontal banner artwork URL.
    pub banner_url: String,
    /// Hero background artwork URL.
    pub hero_url: String,
    /// Library tags.
    pub tags: Vec<String>,
}

#[derive(Serialize)]
struct UpdateShortcutData<'a> {
    action: &'static str,
    #[serde(flatten)]
    shortcut: &'a ShortcutData,
}

#[derive(Serialize)]
struct IdData<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct DeleteShortcutData<'a> {
    action: &'static str,
    id: &'a str,
}

#[derive(Serialize)]
struct LinkData<'a> {
    link: &'a str,
}

fn to_body<T: Serialize>(data: &T) -> Result<Value> {
    Ok(serde_json::to_value(data)?)
}

impl ApiClient {
    /// Backend version string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the backend is unreachable.
    pub async fn version(&self) -> Result<String> {
        let text = self.request(Method::GET, "/api/version", None).await?;
        Ok(text.trim().to_owned())
    }

    /// List installable programs.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn list_programs(&self) -> Result<Value> {
        self.request_json(Method::GET, "/api/programs", None).await
    }

    /// List console and native platforms.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn list_platforms(&self) -> Result<Value> {
        self.request_json(Method::GET, "/api/platforms", None).await
    }

    /// List shortcuts in the loaded library.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn list_shortcuts(&self) -> Result<Value> {
        self.request_json(Method::GET, "/api/shortcuts", None).await
    }

    /// Load the library from disk on the backend.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn load_library(&self) -> Result<Value> {
        self.request_json(Method::POST, "/api/library/load", None).await
    }

    /// Persist the backend library.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn save_library(&self) -> Result<Value> {
        self.request_json(Method::POST, "/api/library/save", None).await
    }

    /// Reconcile the library with Steam and other frontends.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn sync_library(&self) -> Result<Value> {
        self.request_json(Method::POST, "/api/library/sync", None).await
    }

    /// Install or remove programs.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn programs(&self, action: ProgramAction, data: &ProgramsData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, action.path(), Some(&body)).await
    }

    /// Scan and register ROMs for the given platforms.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn process_roms(&self, data: &PlatformsData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, "/api/roms", Some(&body)).await
    }

    /// Back up or restore emulator state.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn sync_state(&self, action: StateAction, data: &PlatformsData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, action.path(), Some(&body)).await
    }

    /// Run the initial storage setup.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn setup(&self, data: &SetupData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, "/api/setup", Some(&body)).await
    }

    /// Launch a shortcut by id.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn launch_shortcut(&self, id: &str) -> Result<Value> {
        let body = to_body(&IdData { id })?;
        self.request_json(Method::POST, "/api/shortcut/launch", Some(&body))
            .await
    }

    /// Delete a shortcut by id.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn delete_shortcut(&self, id: &str) -> Result<Value> {
        let body = to_body(&DeleteShortcutData {
            action: "delete",
            id,
        })?;
        self.request_json(Method::POST, "/api/shortcut/modify", Some(&body))
            .await
    }

    /// Create a shortcut from a file path, letting the backend detect it.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn create_shortcut(&self, data: &CreateShortcutData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, "/api/shortcut/create", Some(&body))
            .await
    }

    /// Add a fully described shortcut to the library.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn add_shortcut(&self, data: &ShortcutData) -> Result<Value> {
        let body = to_body(data)?;
        self.request_json(Method::POST, "/api/shortcut/add", Some(&body))
            .await
    }

    /// Replace the fields of the shortcut identified by `data.id`.
    ///
    /// The backend drops cached artwork so it is downloaded again.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn update_shortcut(&self, data: &ShortcutData) -> Result<Value> {
        let body = to_body(&UpdateShortcutData {
            action: "update",
            shortcut: data,
        })?;
        self.request_json(Method::POST, "/api/shortcut/modify", Some(&body))
            .await
    }

    /// Search artwork and metadata for `term`.
    ///
    /// The answer carries a `result` object with the matched name and
    /// candidate image URLs per artwork kind.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn scrape(&self, term: &str) -> Result<Value> {
        self.request_json_query(Method::GET, "/api/scrape", &[("term", term)], None)
            .await
    }

    /// Ask the backend to open a link in the system browser.
    ///
    /// # Errors
    ///
    /// Propagates [`request_json`](Self::request_json) failures.
    pub async fn open_link(&self, link: &str) -> Result<Value> {
        let body = to_body(&LinkData { link })?;
        self.request_json(Method::POST, "/api/link/open", Some(&body)).await
    }

    /// Ask the backend application to exit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request cannot be sent.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Method::POST, "/app/shutdown", None).await?;
        Ok(())
    }
}
