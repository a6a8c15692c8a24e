//! UI state persistence: JSON save/load across restarts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use roster_core::Address;

use crate::app::{AppState, LayoutMode, Overlay};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub layout: LayoutMode,
    pub welcome_dismissed: bool,
    /// Leader of the team shown last, reopened when no leader is configured.
    pub last_leader: Option<Address>,
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "ignoring corrupt state file");
            PersistedState::default()
        }),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        layout: app.layout,
        welcome_dismissed: app.overlay != Overlay::Welcome,
        last_leader: Some(app.controller.team().leader_address().clone()),
    }
}

pub fn apply(app: &mut AppState, state: &PersistedState) {
    app.layout = state.layout;
    if !state.welcome_dismissed {
        app.overlay = Overlay::Welcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::harness;

    #[test]
    fn save_then_load_keeps_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let leader: Address = format!("0x{:040x}", 3).parse().unwrap();

        let state = PersistedState {
            layout: LayoutMode::Cards,
            welcome_dismissed: true,
            last_leader: Some(leader.clone()),
        };
        save(&path, &state).unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.layout, LayoutMode::Cards);
        assert!(loaded.welcome_dismissed);
        assert_eq!(loaded.last_leader, Some(leader));
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/state.json"));
        assert_eq!(loaded.layout, LayoutMode::Auto);
        assert!(!loaded.welcome_dismissed);
        assert!(loaded.last_leader.is_none());
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert!(!load(&path).welcome_dismissed);
    }

    #[test]
    fn older_file_without_new_fields_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"welcome_dismissed": true}"#).unwrap();
        let loaded = load(&path);
        assert!(loaded.welcome_dismissed);
        assert_eq!(loaded.layout, LayoutMode::Auto);
    }

    #[test]
    fn welcome_shows_until_dismissed() {
        let mut h = harness(3, true);
        apply(&mut h.app, &PersistedState::default());
        assert_eq!(h.app.overlay, Overlay::Welcome);
        assert!(!extract(&h.app).welcome_dismissed);

        h.app.overlay = Overlay::None;
        let state = extract(&h.app);
        assert!(state.welcome_dismissed);
        assert_eq!(
            state.last_leader.as_ref(),
            Some(h.app.controller.team().leader_address())
        );
    }
}
