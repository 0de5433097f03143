//! Application context: every user action runs behind its control's
//! [`BusyGate`] and inside a captured session.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::api::endpoints::{
    CreateShortcutData, PlatformsData, ProgramAction, ProgramsData, SetupData, ShortcutData,
    StateAction,
};
use crate::api::ApiClient;
use crate::config::GlobalConfig;
use crate::console::sink::BufferSink;
use crate::console::{BusyGate, FocusTarget, OutputSink, SessionCoordinator};
use crate::report::{ErrorBanner, ErrorReporter};
use crate::{AppError, Result};

/// Whether an activation ran or was dropped by a busy gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The operation ran to completion.
    Completed,
    /// The control was busy; nothing happened.
    Ignored,
}

/// One gate per user-facing control.
#[derive(Debug)]
pub struct Gates {
    /// Program install form.
    pub install: BusyGate,
    /// Program install/remove form with library reload.
    pub programs: BusyGate,
    /// ROM processing form.
    pub roms: BusyGate,
    /// Initial setup form.
    pub setup: BusyGate,
    /// State backup/restore form.
    pub state: BusyGate,
    /// External links.
    pub links: BusyGate,
    /// Shortcut launch, create, edit and delete buttons.
    pub shortcuts: BusyGate,
    /// Library sync button.
    pub library: BusyGate,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            install: BusyGate::new("install"),
            programs: BusyGate::new("programs"),
            roms: BusyGate::new("roms"),
            setup: BusyGate::new("setup"),
            state: BusyGate::new("state"),
            links: BusyGate::new("links"),
            shortcuts: BusyGate::new("shortcuts"),
            library: BusyGate::new("library"),
        }
    }
}

/// Shared client state handed to every action.
pub struct App {
    api: ApiClient,
    coordinator: SessionCoordinator,
    banner: Arc<ErrorBanner>,
    gates: Gates,
}

impl App {
    /// Context over `api`, streaming captured output into `sink`.
    #[must_use]
    pub fn new(
        api: ApiClient,
        sink: Arc<dyn OutputSink>,
        banner: Arc<ErrorBanner>,
        config: &GlobalConfig,
    ) -> Self {
        let reporter = Arc::clone(&banner) as Arc<dyn ErrorReporter>;
        let coordinator = SessionCoordinator::new(
            Arc::new(api.clone()),
            sink,
            reporter,
            config.poll_interval(),
        );
        Self {
            api,
            coordinator,
            banner,
            gates: Gates::default(),
        }
    }

    /// Build the HTTP client from `config` and wire everything together.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &GlobalConfig, sink: Arc<dyn OutputSink>) -> Result<Self> {
        let api = ApiClient::new(config)?;
        Ok(Self::new(api, sink, Arc::new(ErrorBanner::new()), config))
    }

    /// Context rendering into an in-memory view sized by
    /// `console.viewport_lines`, returned alongside it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn buffered(config: &GlobalConfig) -> Result<(Self, Arc<BufferSink>)> {
        let sink = Arc::new(BufferSink::new(config.console.viewport_lines));
        let app = Self::from_config(config, Arc::clone(&sink) as Arc<dyn OutputSink>)?;
        Ok((app, sink))
    }

    /// Backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Error banner receiving every surfaced failure.
    #[must_use]
    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    /// Per-control gates.
    #[must_use]
    pub fn gates(&self) -> &Gates {
        &self.gates
    }

    /// Capture coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Run `operation` behind `gate` inside a captured session.
    ///
    /// Returns `Ok(None)` when the gate was busy. A failure is shown in the
    /// banner before being returned; the gate is open again either way.
    ///
    /// # Errors
    ///
    /// Returns the capture-start or operation error.
    pub async fn run_action<F, Fut, T>(
        &self,
        gate: &BusyGate,
        focus: Option<&dyn FocusTarget>,
        should_focus: bool,
        operation: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = gate
            .run(|| self.coordinator.run_captured(focus, should_focus, operation))
            .await;

        match outcome {
            None => {
                info!(gate = gate.name(), "action ignored; control busy");
                Ok(None)
            }
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(err)) => {
                self.banner.report(&err);
                Err(err)
            }
        }
    }

    /// Install programs, then persist the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn install(
        &self,
        focus: Option<&dyn FocusTarget>,
        programs: Vec<String>,
    ) -> Result<ActionOutcome> {
        let data = ProgramsData {
            programs,
            preferences: Vec::new(),
        };
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.install, focus, true, || async move {
                api.programs(ProgramAction::Install, &data).await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Reload the library, install or remove programs, then save the library.
    ///
    /// The save is attempted even when the first steps fail.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn programs(
        &self,
        focus: Option<&dyn FocusTarget>,
        action: ProgramAction,
        data: ProgramsData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let banner: &ErrorBanner = &self.banner;
        let ran = self
            .run_action(&self.gates.programs, focus, true, || async move {
                let primary = async {
                    api.load_library().await?;
                    api.programs(action, &data).await
                }
                .await;
                finish_with_save(api, banner, primary).await
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Reload the library, process ROMs, then save the library.
    ///
    /// The save is attempted even when the first steps fail.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn process_roms(
        &self,
        focus: Option<&dyn FocusTarget>,
        data: PlatformsData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let banner: &ErrorBanner = &self.banner;
        let ran = self
            .run_action(&self.gates.roms, focus, true, || async move {
                let primary = async {
                    api.load_library().await?;
                    api.process_roms(&data).await
                }
                .await;
                finish_with_save(api, banner, primary).await
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Run the initial setup, then load and save the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn setup(
        &self,
        focus: Option<&dyn FocusTarget>,
        data: SetupData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.setup, focus, true, || async move {
                api.setup(&data).await?;
                api.load_library().await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Back up or restore emulator state.
    ///
    /// # Errors
    ///
    /// Returns the backend failure.
    pub async fn sync_state(
        &self,
        focus: Option<&dyn FocusTarget>,
        action: StateAction,
        data: PlatformsData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.state, focus, true, || async move {
                api.sync_state(action, &data).await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Open `link` in the system browser. Never scrolls the console.
    ///
    /// # Errors
    ///
    /// Returns the backend failure.
    pub async fn open_link(&self, link: &str) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.links, None, false, || async move {
                api.open_link(link).await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Launch a shortcut.
    ///
    /// # Errors
    ///
    /// Returns the backend failure.
    pub async fn launch_shortcut(
        &self,
        focus: Option<&dyn FocusTarget>,
        id: &str,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.shortcuts, focus, true, || async move {
                api.launch_shortcut(id).await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Delete a shortcut, then persist the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn delete_shortcut(
        &self,
        focus: Option<&dyn FocusTarget>,
        id: &str,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.shortcuts, focus, true, || async move {
                api.delete_shortcut(id).await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Create a shortcut from a file on disk, then persist the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn create_shortcut(
        &self,
        focus: Option<&dyn FocusTarget>,
        data: CreateShortcutData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.shortcuts, focus, true, || async move {
                api.create_shortcut(&data).await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Add a fully described shortcut, then persist the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn add_shortcut(
        &self,
        focus: Option<&dyn FocusTarget>,
        data: ShortcutData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.shortcuts, focus, true, || async move {
                api.add_shortcut(&data).await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Rewrite an existing shortcut, then persist the library.
    ///
    /// # Errors
    ///
    /// Returns the first failing backend call.
    pub async fn update_shortcut(
        &self,
        focus: Option<&dyn FocusTarget>,
        data: ShortcutData,
    ) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.shortcuts, focus, true, || async move {
                api.update_shortcut(&data).await?;
                api.save_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Reconcile the library with the launchers it feeds.
    ///
    /// # Errors
    ///
    /// Returns the backend failure.
    pub async fn sync_library(&self, focus: Option<&dyn FocusTarget>) -> Result<ActionOutcome> {
        let api = &self.api;
        let ran = self
            .run_action(&self.gates.library, focus, true, || async move {
                api.sync_library().await?;
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(outcome(ran))
    }

    /// Empty the backend console and refresh the view.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn clear_console(&self) -> Result<()> {
        self.coordinator.clear().await.inspect_err(|err| self.banner.report(err))
    }

    /// Backend version.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn version(&self) -> Result<String> {
        self.api.version().await.inspect_err(|err| self.banner.report(err))
    }

    /// Installable programs, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn list_programs(&self) -> Result<Value> {
        self.api.list_programs().await.inspect_err(|err| self.banner.report(err))
    }

    /// Known platforms, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn list_platforms(&self) -> Result<Value> {
        self.api.list_platforms().await.inspect_err(|err| self.banner.report(err))
    }

    /// Library shortcuts, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn list_shortcuts(&self) -> Result<Value> {
        self.api.list_shortcuts().await.inspect_err(|err| self.banner.report(err))
    }

    /// Artwork and metadata matches for `term`.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after reporting it.
    pub async fn scrape(&self, term: &str) -> Result<Value> {
        self.api.scrape(term).await.inspect_err(|err| self.banner.report(err))
    }

    /// Ask the backend to exit.
    ///
    /// # Errors
    ///
    /// Returns the transport failure after reporting it.
    pub async fn shutdown(&self) -> Result<()> {
        self.api.shutdown().await.inspect_err(|err| self.banner.report(err))
    }
}

fn outcome<T>(ran: Option<T>) -> ActionOutcome {
    if ran.is_some() {
        ActionOutcome::Completed
    } else {
        ActionOutcome::Ignored
    }
}

/// Save the library whatever `primary` returned; the primary error wins.
///
/// When both fail the save error is shown on `reporter` right away, the
/// primary one is returned for the caller to surface.
async fn finish_with_save(
    api: &ApiClient,
    reporter: &dyn ErrorReporter,
    primary: Result<Value>,
) -> Result<()> {
    let saved = api.save_library().await;
    match (primary, saved) {
        (Err(err), Err(save_err)) => {
            warn!(%save_err, "library save failed after a failed action");
            reporter.report(&save_err);
            Err(err)
        }
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
        (Ok(_), Ok(_)) => Ok(()),
    }
}
