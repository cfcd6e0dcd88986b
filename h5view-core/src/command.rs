//! Command table for menu-driven actions.
//!
//! Each command has a label and an enable predicate. Predicates are pure
//! functions of a [`CommandState`] snapshot, so menus can be built and
//! tested without a live session.

use crate::fit::MIN_POINTS;
use crate::plot::PlotMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Zero-argument commands exposed to the menu layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandId {
    ToggleLog,
    ResetParameters,
    OpenCutView,
    CloseCutView,
    FreezeCut,
    DeleteFrozen,
    RunFit,
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Command::get(*self).label)
    }
}

/// Session facts the enable predicates depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandState {
    pub mode: PlotMode,
    pub log_enabled: bool,
    pub cut_view_open: bool,
    pub has_live_profile: bool,
    pub overlay_count: usize,
    /// Points in the profile a fit would run on, 0 when there is none.
    pub fit_points: usize,
    pub fit_pending: bool,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            mode: PlotMode::Empty,
            log_enabled: false,
            cut_view_open: false,
            has_live_profile: false,
            overlay_count: 0,
            fit_points: 0,
            fit_pending: false,
        }
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub id: CommandId,
    pub label: &'static str,
    pub enabled: fn(&CommandState) -> bool,
}

fn image_shown(s: &CommandState) -> bool {
    s.mode == PlotMode::TwoD
}

fn can_open_cut(s: &CommandState) -> bool {
    s.mode == PlotMode::TwoD && !s.cut_view_open
}

fn can_close_cut(s: &CommandState) -> bool {
    s.cut_view_open
}

fn can_freeze(s: &CommandState) -> bool {
    s.cut_view_open && s.has_live_profile
}

fn can_delete_frozen(s: &CommandState) -> bool {
    s.cut_view_open && s.overlay_count >= 2
}

fn can_fit(s: &CommandState) -> bool {
    s.cut_view_open && s.fit_points >= MIN_POINTS && !s.fit_pending
}

/// Every command in menu order.
pub const COMMANDS: [Command; 7] = [
    Command {
        id: CommandId::ToggleLog,
        label: "Apply log",
        enabled: image_shown,
    },
    Command {
        id: CommandId::ResetParameters,
        label: "Reset parameters",
        enabled: image_shown,
    },
    Command {
        id: CommandId::OpenCutView,
        label: "Open cut window",
        enabled: can_open_cut,
    },
    Command {
        id: CommandId::CloseCutView,
        label: "Close cut window",
        enabled: can_close_cut,
    },
    Command {
        id: CommandId::FreezeCut,
        label: "Freeze current cut",
        enabled: can_freeze,
    },
    Command {
        id: CommandId::DeleteFrozen,
        label: "Delete cuts",
        enabled: can_delete_frozen,
    },
    Command {
        id: CommandId::RunFit,
        label: "Plot fit",
        enabled: can_fit,
    },
];

impl Command {
    /// Table row for `id`.
    #[must_use]
    pub fn get(id: CommandId) -> &'static Command {
        match id {
            CommandId::ToggleLog => &COMMANDS[0],
            CommandId::ResetParameters => &COMMANDS[1],
            CommandId::OpenCutView => &COMMANDS[2],
            CommandId::CloseCutView => &COMMANDS[3],
            CommandId::FreezeCut => &COMMANDS[4],
            CommandId::DeleteFrozen => &COMMANDS[5],
            CommandId::RunFit => &COMMANDS[6],
        }
    }

    /// Label as shown in a menu built from `state`.
    #[must_use]
    pub fn menu_label(&self, state: &CommandState) -> &'static str {
        match self.id {
            CommandId::ToggleLog if state.log_enabled => "Disable log",
            _ => self.label,
        }
    }
}

/// True when `id` may run in `state`.
#[must_use]
pub fn is_enabled(id: CommandId, state: &CommandState) -> bool {
    (Command::get(id).enabled)(state)
}

/// A rendered menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MenuEntry {
    pub id: CommandId,
    pub label: &'static str,
    pub enabled: bool,
}

/// Menu entries for every command in table order.
#[must_use]
pub fn menu(state: &CommandState) -> Vec<MenuEntry> {
    COMMANDS
        .iter()
        .map(|cmd| MenuEntry {
            id: cmd.id,
            label: cmd.menu_label(state),
            enabled: (cmd.enabled)(state),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_state() -> CommandState {
        CommandState {
            mode: PlotMode::TwoD,
            ..CommandState::default()
        }
    }

    #[test]
    fn test_table_order_matches_ids() {
        for cmd in &COMMANDS {
            assert_eq!(Command::get(cmd.id).id, cmd.id);
        }
    }

    #[test]
    fn test_empty_session_disables_everything() {
        let state = CommandState::default();
        assert!(menu(&state).iter().all(|entry| !entry.enabled));
    }

    #[test]
    fn test_cut_view_toggles() {
        let mut state = image_state();
        assert!(is_enabled(CommandId::OpenCutView, &state));
        assert!(!is_enabled(CommandId::CloseCutView, &state));
        state.cut_view_open = true;
        assert!(!is_enabled(CommandId::OpenCutView, &state));
        assert!(is_enabled(CommandId::CloseCutView, &state));
    }

    #[test]
    fn test_profile_guards() {
        let mut state = image_state();
        state.cut_view_open = true;
        assert!(!is_enabled(CommandId::FreezeCut, &state));
        state.has_live_profile = true;
        assert!(is_enabled(CommandId::FreezeCut, &state));

        state.overlay_count = 1;
        assert!(!is_enabled(CommandId::DeleteFrozen, &state));
        state.overlay_count = 2;
        assert!(is_enabled(CommandId::DeleteFrozen, &state));

        state.fit_points = MIN_POINTS - 1;
        assert!(!is_enabled(CommandId::RunFit, &state));
        state.fit_points = MIN_POINTS;
        assert!(is_enabled(CommandId::RunFit, &state));
        state.fit_pending = true;
        assert!(!is_enabled(CommandId::RunFit, &state));
    }

    #[test]
    fn test_log_label_follows_state() {
        let mut state = image_state();
        assert_eq!(menu(&state)[0].label, "Apply log");
        state.log_enabled = true;
        assert_eq!(menu(&state)[0].label, "Disable log");
        assert_eq!(CommandId::FreezeCut.to_string(), "Freeze current cut");
    }
}
