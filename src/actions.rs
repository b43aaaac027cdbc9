use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::debug;

const ACTION_BUS_CAPACITY: usize = 32;

// Menu and shortcut actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    NewFile,
    NewFolder,
    ToggleSidebar,
    CloseFile,
    About,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::NewFile,
        MenuAction::NewFolder,
        MenuAction::ToggleSidebar,
        MenuAction::CloseFile,
        MenuAction::About,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuAction::NewFile => "new-file",
            MenuAction::NewFolder => "new-folder",
            MenuAction::ToggleSidebar => "toggle-sidebar",
            MenuAction::CloseFile => "close-file",
            MenuAction::About => "about",
        }
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MenuAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MenuAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown menu action '{}'", s))
    }
}

/// In-process publish/subscribe channel for menu actions. Producers (menus,
/// shortcuts, the command palette) publish; every subscriber sees every
/// action published after it subscribed.
#[derive(Debug, Clone)]
pub struct ActionBus {
    tx: broadcast::Sender<MenuAction>,
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ACTION_BUS_CAPACITY);
        Self { tx }
    }

    /// Returns how many subscribers received the action.
    pub fn publish(&self, action: MenuAction) -> usize {
        match self.tx.send(action) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(%action, "menu action published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MenuAction> {
        self.tx.subscribe()
    }
}

// ---- Tests ----
