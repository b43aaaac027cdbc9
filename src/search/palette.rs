use crate::actions::MenuAction;
use crate::fuzzy;

// A ranked entry in the command palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub id: String,
    pub label: String,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    NewFile,
    NewFolder,
    SaveFile,
    ToggleSidebar,
}

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::NewFile => "file.new",
            CommandId::NewFolder => "file.new-folder",
            CommandId::SaveFile => "file.save",
            CommandId::ToggleSidebar => "view.toggle-sidebar",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        COMMANDS
            .iter()
            .map(|command| command.id)
            .find(|command| command.as_str() == id)
    }

    /// The bus action this command publishes. Saving is handled by the
    /// workspace directly.
    pub fn menu_action(&self) -> Option<MenuAction> {
        match self {
            CommandId::NewFile => Some(MenuAction::NewFile),
            CommandId::NewFolder => Some(MenuAction::NewFolder),
            CommandId::ToggleSidebar => Some(MenuAction::ToggleSidebar),
            CommandId::SaveFile => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaletteCommand {
    pub id: CommandId,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

impl PaletteCommand {
    fn haystack(&self) -> String {
        format!("{} {}", self.label, self.keywords.join(" "))
    }

    fn candidate(&self, score: u32) -> MatchCandidate {
        MatchCandidate {
            id: self.id.as_str().to_string(),
            label: self.label.to_string(),
            score,
        }
    }
}

pub const COMMANDS: &[PaletteCommand] = &[
    PaletteCommand {
        id: CommandId::NewFile,
        label: "New File",
        keywords: &["create", "new", "file"],
    },
    PaletteCommand {
        id: CommandId::NewFolder,
        label: "New Folder",
        keywords: &["create", "new", "folder", "directory"],
    },
    PaletteCommand {
        id: CommandId::SaveFile,
        label: "Save File",
        keywords: &["save", "write"],
    },
    PaletteCommand {
        id: CommandId::ToggleSidebar,
        label: "Toggle Sidebar",
        keywords: &["sidebar", "panel", "toggle"],
    },
];

/// Filter the palette commands for `query`. A command is kept when the query
/// matches its label or keywords and is ordered by how well it matches the
/// label. A blank query lists every command in declaration order.
pub fn filter_commands(query: &str) -> Vec<MatchCandidate> {
    if query.trim().is_empty() {
        return COMMANDS.iter().map(|command| command.candidate(0)).collect();
    }

    let mut matches: Vec<MatchCandidate> = COMMANDS
        .iter()
        .filter(|command| fuzzy::score(query, &command.haystack()) > 0)
        .map(|command| command.candidate(fuzzy::score(query, command.label)))
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(matches: &[MatchCandidate]) -> Vec<&str> {
        matches.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn test_blank_query_lists_all_commands() {
        let all = filter_commands("  ");
        assert_eq!(
            labels(&all),
            vec!["New File", "New Folder", "Save File", "Toggle Sidebar"]
        );
        assert!(all.iter().all(|m| m.score == 0));
    }

    #[test]
    fn test_filter_ranks_label_matches_first() {
        let matches = filter_commands("side");
        assert_eq!(labels(&matches), vec!["Toggle Sidebar"]);

        // equal prefixes: the longer label weighs each match higher
        let matches = filter_commands("new");
        assert_eq!(labels(&matches), vec!["New Folder", "New File"]);
    }

    #[test]
    fn test_keyword_only_match_is_kept() {
        let matches = filter_commands("directory");
        assert_eq!(labels(&matches), vec!["New Folder"]);
        assert_eq!(matches[0].score, 0);
    }

    #[test]
    fn test_ids_round_trip() {
        for command in COMMANDS {
            assert_eq!(CommandId::from_id(command.id.as_str()), Some(command.id));
        }
        assert_eq!(CommandId::from_id("view.toggle-theme"), None);
    }
}
