//! Notification settings toggles and their persistence.

mod common;

use std::sync::Arc;

use reelwatch_core::{NotificationSettings, VideoJobStatus};
use reelwatch_engine::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore};

use common::{builder, snapshot, MockMutator, MockRegistrar, MockSource, StaticGate};

fn source() -> Arc<MockSource> {
    MockSource::new(snapshot(&[("a", VideoJobStatus::Queued)]))
}

#[tokio::test]
async fn sound_toggle_is_saved() {
    let store = Arc::new(MemorySettingsStore::default());
    let engine = builder(&source(), &MockMutator::ok())
        .settings_store(store.clone())
        .build()
        .await;
    assert!(engine.settings().sound_enabled);

    let settings = engine.set_sound_enabled(false).await.unwrap();

    assert!(!settings.sound_enabled);
    assert_eq!(store.stored(), Some(settings));
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn browser_toggle_records_permission_denial() {
    let gate = StaticGate::new(false);
    let engine = builder(&source(), &MockMutator::ok())
        .permission_gate(gate.clone())
        .build()
        .await;

    let settings = engine.set_browser_enabled(true).await.unwrap();

    assert_eq!(gate.requests(), 1);
    assert!(!settings.browser_enabled);
    assert!(!settings.permission_granted);
    assert!(settings.sound_enabled);
}

#[tokio::test]
async fn browser_toggle_enables_channel_when_granted() {
    let gate = StaticGate::new(true);
    let engine = builder(&source(), &MockMutator::ok())
        .permission_gate(gate)
        .build()
        .await;

    let settings = engine.set_browser_enabled(true).await.unwrap();
    assert!(settings.browser_deliverable());

    let settings = engine.set_browser_enabled(false).await.unwrap();
    assert!(!settings.browser_enabled);
    assert!(settings.permission_granted);
}

#[tokio::test]
async fn push_registration_failure_disables_only_push() {
    let registrar = MockRegistrar::new(true, false);
    let initial = NotificationSettings {
        sound_enabled: true,
        browser_enabled: true,
        permission_granted: true,
        ..Default::default()
    };
    let engine = builder(&source(), &MockMutator::ok())
        .settings_store(Arc::new(MemorySettingsStore::new(initial)))
        .permission_gate(StaticGate::new(true))
        .push_registrar(registrar.clone())
        .build()
        .await;

    let settings = engine.set_push_enabled(true).await.unwrap();

    assert_eq!(registrar.registers(), 1);
    assert!(!settings.push_enabled);
    assert!(!settings.push_token_registered);
    assert!(settings.sound_enabled);
    assert!(settings.browser_deliverable());
}

#[tokio::test]
async fn push_without_permission_never_registers() {
    let registrar = MockRegistrar::new(false, false);
    let engine = builder(&source(), &MockMutator::ok())
        .permission_gate(StaticGate::new(false))
        .push_registrar(registrar.clone())
        .build()
        .await;

    let settings = engine.set_push_enabled(true).await.unwrap();

    assert_eq!(registrar.registers(), 0);
    assert!(!settings.push_enabled);
}

#[tokio::test]
async fn push_permission_denial_leaves_browser_channel_alone() {
    let initial = NotificationSettings {
        browser_enabled: true,
        permission_granted: true,
        ..Default::default()
    };
    let store = Arc::new(MemorySettingsStore::new(initial));
    let engine = builder(&source(), &MockMutator::ok())
        .settings_store(store.clone())
        .permission_gate(StaticGate::new(false))
        .push_registrar(MockRegistrar::new(false, false))
        .build()
        .await;

    let settings = engine.set_push_enabled(true).await.unwrap();

    assert!(!settings.push_enabled);
    assert!(settings.permission_granted);
    assert!(settings.browser_deliverable());
    assert_eq!(store.stored(), Some(settings));
}

#[tokio::test]
async fn push_without_registrar_stays_off() {
    let engine = builder(&source(), &MockMutator::ok())
        .permission_gate(StaticGate::new(true))
        .build()
        .await;

    let settings = engine.set_push_enabled(true).await.unwrap();
    assert!(!settings.push_enabled);
    assert!(!settings.push_token_registered);
    assert!(!settings.permission_granted);
}

#[tokio::test]
async fn push_enable_then_disable_unregisters() {
    let registrar = MockRegistrar::new(false, true);
    let engine = builder(&source(), &MockMutator::ok())
        .permission_gate(StaticGate::new(true))
        .push_registrar(registrar.clone())
        .build()
        .await;

    let enabled = engine.set_push_enabled(true).await.unwrap();
    assert!(enabled.push_enabled && enabled.push_token_registered);

    // Unregistration fails here; the local flags are cleared regardless.
    let disabled = engine.set_push_enabled(false).await.unwrap();
    assert_eq!(registrar.unregisters(), 1);
    assert!(!disabled.push_enabled);
    assert!(!disabled.push_token_registered);

    // Already unregistered: nothing to tell the server.
    engine.set_push_enabled(false).await.unwrap();
    assert_eq!(registrar.unregisters(), 1);
}

#[tokio::test]
async fn settings_survive_a_restart_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let engine = builder(&source(), &MockMutator::ok())
        .settings_store(Arc::new(JsonFileSettingsStore::new(&path)))
        .build()
        .await;
    engine.set_sound_enabled(false).await.unwrap();
    drop(engine);

    let stored = JsonFileSettingsStore::new(&path).load().await.unwrap();
    assert!(!stored.sound_enabled);

    let restarted = builder(&source(), &MockMutator::ok())
        .settings_store(Arc::new(JsonFileSettingsStore::new(&path)))
        .build()
        .await;
    assert_eq!(restarted.settings(), stored);
}
