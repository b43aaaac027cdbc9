pub mod actions;
pub mod app_event;
pub mod backend;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod history;
pub mod local;
pub mod logging;
pub mod models;
pub mod search;
pub mod session;
pub mod startup;
pub mod wikilink;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use actions::{ActionBus, MenuAction};
pub use app_event::AppEvent;
pub use backend::{FileSystem, IndexEvent, SearchIndex};
pub use config::Settings;
pub use error::{CoreError, CoreResult};
pub use local::LocalFileSystem;
pub use models::{ContentMatch, FileMatch, FileReference};
pub use search::{SearchCoordinator, Selection, Surface, SurfaceView};
pub use startup::StartupState;
pub use workspace::Workspace;

/// Bring up a workspace on the local disk: load settings, install logging
/// and start the launch sequence. Must be called inside a tokio runtime.
pub fn launch(index: Arc<dyn SearchIndex>) -> Workspace {
    let settings = Settings::default_path()
        .map(|path| Settings::load(&path))
        .unwrap_or_default();
    logging::init(&settings.log_filter);

    let fs = Arc::new(LocalFileSystem::new(&settings));
    let mut workspace = Workspace::new(fs, index, settings);
    workspace.mount();
    workspace
}
