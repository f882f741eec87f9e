//! Notification settings toggles on the [`TrackerEngine`] facade.
//!
//! Every toggle applies its patch to the shared settings handle first, then
//! persists the full settings. Toggles are serialised by the engine's
//! settings lock so saves land in the order they were applied.

use reelwatch_client::ClientError;
use reelwatch_core::{NotificationSettings, SettingsPatch};

use super::TrackerEngine;
use crate::error::EngineError;

impl TrackerEngine {
    pub fn settings(&self) -> NotificationSettings {
        self.settings.current()
    }

    pub async fn set_sound_enabled(&self, enabled: bool) -> Result<NotificationSettings, EngineError> {
        let _serial = self.settings_lock.lock().await;
        self.save_patch(SettingsPatch {
            sound_enabled: Some(enabled),
            ..Default::default()
        })
        .await
    }

    /// Enable or disable OS notifications. Enabling asks for permission;
    /// a denial leaves the channel off.
    pub async fn set_browser_enabled(
        &self,
        enabled: bool,
    ) -> Result<NotificationSettings, EngineError> {
        let _serial = self.settings_lock.lock().await;

        let patch = if enabled {
            let granted = self.request_permission().await;
            if !granted {
                tracing::info!("Notification permission denied, browser channel stays off");
            }
            SettingsPatch {
                browser_enabled: Some(granted),
                permission_granted: Some(granted),
                ..Default::default()
            }
        } else {
            SettingsPatch {
                browser_enabled: Some(false),
                ..Default::default()
            }
        };
        self.save_patch(patch).await
    }

    /// Enable or disable push delivery.
    ///
    /// Enabling requests permission, then registers the device token. Any
    /// failure turns push off and leaves the other channels untouched; the
    /// returned settings show the effective state.
    pub async fn set_push_enabled(&self, enabled: bool) -> Result<NotificationSettings, EngineError> {
        let _serial = self.settings_lock.lock().await;

        let patch = if enabled {
            self.enable_push().await
        } else {
            if self.settings.current().push_token_registered {
                if let Some(registrar) = &self.push_registrar {
                    if let Err(e) = registrar.unregister().await {
                        tracing::warn!(error = %e, "Failed to unregister push token");
                    }
                }
            }
            SettingsPatch {
                push_enabled: Some(false),
                push_token_registered: Some(false),
                ..Default::default()
            }
        };
        self.save_patch(patch).await
    }

    /// Push needs the notification permission and a registered device
    /// token. `permission_granted` is left as is: it belongs to the browser
    /// channel.
    async fn enable_push(&self) -> SettingsPatch {
        let disabled = SettingsPatch {
            push_enabled: Some(false),
            push_token_registered: Some(false),
            ..Default::default()
        };

        if !self.request_permission().await {
            tracing::warn!("Notification permission denied, push channel disabled");
            return disabled;
        }

        let result = match &self.push_registrar {
            Some(registrar) => registrar.register().await,
            None => Err(ClientError::Unavailable(
                "Push notifications are not available".into(),
            )),
        };

        match result {
            Ok(()) => {
                tracing::info!("Push channel enabled");
                SettingsPatch {
                    push_enabled: Some(true),
                    push_token_registered: Some(true),
                    ..Default::default()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Push registration failed, push channel disabled");
                disabled
            }
        }
    }

    async fn request_permission(&self) -> bool {
        match &self.permission_gate {
            Some(gate) => gate.request_permission().await,
            None => false,
        }
    }

    async fn save_patch(&self, patch: SettingsPatch) -> Result<NotificationSettings, EngineError> {
        let updated = self.settings.update(&patch);
        self.settings_store.save(&updated).await?;
        Ok(updated)
    }
}
