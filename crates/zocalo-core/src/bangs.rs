//! Built-in bang commands.
//!
//! A bang is a `!`-prefixed textual command. The shell executes the
//! built-ins below itself; anything else is forwarded to module
//! subscribers through the message registry. The registry is rebuilt
//! on recycle so a reload starts from a clean slate.

use std::collections::BTreeMap;

/// What the shell does for a recognized bang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BangAction {
    /// Soft-restart modules and settings.
    Recycle,
    /// Leave the shell, keeping the session.
    Quit,
    /// End the user session.
    Logoff,
    /// Open the system shutdown flow.
    SystemShutdown,
    /// Broadcast hide to all module windows.
    HideModules,
    /// Broadcast show to all module windows.
    ShowModules,
    /// Reload one module; the argument names its path.
    ReloadModule,
    /// Unload one module; the argument names its path.
    UnloadModule,
}

/// Name → action map for the built-in bang set.
#[derive(Debug)]
pub struct BangRegistry {
    commands: BTreeMap<String, BangAction>,
}

impl Default for BangRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BangRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            commands: BTreeMap::new(),
        };
        registry.install_builtins();
        registry
    }

    fn install_builtins(&mut self) {
        let builtins = [
            ("recycle", BangAction::Recycle),
            ("quit", BangAction::Quit),
            ("logoff", BangAction::Logoff),
            ("shutdown", BangAction::SystemShutdown),
            ("hidemodules", BangAction::HideModules),
            ("showmodules", BangAction::ShowModules),
            ("reloadmodule", BangAction::ReloadModule),
            ("unloadmodule", BangAction::UnloadModule),
        ];
        for (name, action) in builtins {
            self.commands.insert(name.to_string(), action);
        }
    }

    /// Drops and reinstalls the command set.
    pub fn reload(&mut self) {
        self.commands.clear();
        self.install_builtins();
    }

    /// Looks a bang up by name, with or without the leading `!`.
    /// Names are case-insensitive.
    pub fn resolve(&self, name: &str) -> Option<BangAction> {
        let name = name.strip_prefix('!').unwrap_or(name);
        self.commands.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Splits a bang line into its command token and argument rest.
///
/// Returns `None` unless the line starts with `!`.
pub fn split_bang(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if !line.starts_with('!') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => Some((cmd, rest.trim())),
        None => Some((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtins_case_insensitively() {
        let registry = BangRegistry::new();
        assert_eq!(registry.resolve("!Recycle"), Some(BangAction::Recycle));
        assert_eq!(registry.resolve("QUIT"), Some(BangAction::Quit));
        assert_eq!(
            registry.resolve("!HideModules"),
            Some(BangAction::HideModules)
        );
        assert_eq!(registry.resolve("!NoSuchBang"), None);
    }

    #[test]
    fn reload_restores_the_builtin_set() {
        let mut registry = BangRegistry::new();
        let before = registry.command_count();
        registry.reload();
        assert_eq!(registry.command_count(), before);
        assert_eq!(registry.resolve("!quit"), Some(BangAction::Quit));
    }

    #[test]
    fn split_separates_command_and_args() {
        assert_eq!(
            split_bang("!ReloadModule C:\\modules\\clock.dll"),
            Some(("!ReloadModule", "C:\\modules\\clock.dll"))
        );
        assert_eq!(split_bang("!Recycle"), Some(("!Recycle", "")));
        assert_eq!(split_bang("  !Quit  "), Some(("!Quit", "")));
        assert_eq!(split_bang("Recycle"), None);
    }
}
