//! Notification channel settings.
//!
//! [`SettingsHandle`] is the single owner of the live settings for one
//! engine instance. The dispatch queue reads through a clone of the handle;
//! only explicit user toggles write to it.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Persisted, per-installation notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub sound_enabled: bool,
    pub browser_enabled: bool,
    /// OS-level notification permission was granted.
    pub permission_granted: bool,
    pub push_enabled: bool,
    pub push_token_registered: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            browser_enabled: false,
            permission_granted: false,
            push_enabled: false,
            push_token_registered: false,
        }
    }
}

impl NotificationSettings {
    /// At least one channel the dispatch queue delivers to is on.
    pub fn any_local_channel_enabled(&self) -> bool {
        self.sound_enabled || self.browser_enabled
    }

    /// OS notifications are both wanted and permitted.
    pub fn browser_deliverable(&self) -> bool {
        self.browser_enabled && self.permission_granted
    }

    /// Overwrite the fields present in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = patch.browser_enabled {
            self.browser_enabled = v;
        }
        if let Some(v) = patch.permission_granted {
            self.permission_granted = v;
        }
        if let Some(v) = patch.push_enabled {
            self.push_enabled = v;
        }
        if let Some(v) = patch.push_token_registered {
            self.push_token_registered = v;
        }
    }
}

/// A partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_granted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_token_registered: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

// ---------------------------------------------------------------------------
// SettingsHandle
// ---------------------------------------------------------------------------

/// Shared, cheaply cloneable view of one engine's live settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<NotificationSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: NotificationSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings.
    pub fn current(&self) -> NotificationSettings {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `patch` and return the resulting settings.
    pub fn update(&self, patch: &SettingsPatch) -> NotificationSettings {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.apply(patch);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_sound_only() {
        let settings = NotificationSettings::default();
        assert!(settings.sound_enabled);
        assert!(!settings.browser_enabled);
        assert!(settings.any_local_channel_enabled());
        assert!(!settings.browser_deliverable());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"browserEnabled":true}"#).unwrap();
        assert!(settings.browser_enabled);
        assert!(settings.sound_enabled);
        assert!(!settings.permission_granted);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let handle = SettingsHandle::default();
        let updated = handle.update(&SettingsPatch {
            browser_enabled: Some(true),
            permission_granted: Some(true),
            ..Default::default()
        });

        assert!(updated.sound_enabled);
        assert!(updated.browser_deliverable());
        assert_eq!(handle.current(), updated);
    }

    #[test]
    fn clones_share_state() {
        let handle = SettingsHandle::default();
        let reader = handle.clone();
        handle.update(&SettingsPatch {
            sound_enabled: Some(false),
            ..Default::default()
        });
        assert!(!reader.current().sound_enabled);
        assert!(!reader.current().any_local_channel_enabled());
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = SettingsPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "{}");
    }
}
