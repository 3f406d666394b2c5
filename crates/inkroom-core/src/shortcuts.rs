//! Keyboard shortcut registry.

use crate::input::KeyEvent;

/// Canvas command bound to a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    DeleteSelection,
    Undo,
    Redo,
    SelectAll,
}

/// A keyboard shortcut definition.
///
/// `command` means Ctrl, or Cmd on macOS. Modifiers must match exactly, so
/// no two shortcuts overlap.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub command: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        command: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            command,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.command {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.key.eq_ignore_ascii_case(self.key)
            && event.modifiers.command() == self.command
            && event.modifiers.shift == self.shift
            && !event.modifiers.alt
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Delete", false, false, ShortcutAction::DeleteSelection, "Delete selected layers"),
            Shortcut::new("Backspace", false, false, ShortcutAction::DeleteSelection, "Delete selected layers"),
            Shortcut::new("Z", true, false, ShortcutAction::Undo, "Undo"),
            Shortcut::new("Z", true, true, ShortcutAction::Redo, "Redo"),
            Shortcut::new("Y", true, false, ShortcutAction::Redo, "Redo"),
            Shortcut::new("A", true, false, ShortcutAction::SelectAll, "Select all layers"),
        ]
    }

    /// Resolve a key press to an action. Keys typed into a text field never
    /// trigger shortcuts.
    pub fn resolve(event: &KeyEvent) -> Option<ShortcutAction> {
        if event.in_text_field {
            return None;
        }
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(event))
            .map(|shortcut| shortcut.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn ctrl(shift: bool) -> Modifiers {
        Modifiers {
            ctrl: true,
            shift,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_undo_redo_are_distinct() {
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("z", ctrl(false))), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("Z", ctrl(true))), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("y", ctrl(false))), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("y", ctrl(true))), None);
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("a", ctrl(true))), None);
    }

    #[test]
    fn test_cmd_works_like_ctrl() {
        let cmd = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("a", cmd)), Some(ShortcutAction::SelectAll));
    }

    #[test]
    fn test_delete_keys() {
        for key in ["Delete", "Backspace"] {
            assert_eq!(
                ShortcutRegistry::resolve(&KeyEvent::new(key, Modifiers::NONE)),
                Some(ShortcutAction::DeleteSelection)
            );
        }
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::new("z", Modifiers::NONE)), None);
    }

    #[test]
    fn test_ignored_in_text_field() {
        let mut event = KeyEvent::new("Backspace", Modifiers::NONE);
        event.in_text_field = true;
        assert_eq!(ShortcutRegistry::resolve(&event), None);
    }

    #[test]
    fn test_format() {
        let redo = ShortcutRegistry::all()
            .into_iter()
            .find(|s| s.action == ShortcutAction::Redo && s.shift)
            .unwrap();
        assert_eq!(redo.format(), "Ctrl+Shift+Z");
    }
}
