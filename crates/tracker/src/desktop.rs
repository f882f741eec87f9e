//! Desktop delivery channels for the tracker binary.
//!
//! Sound is played by an external command (`paplay` by default) with the
//! terminal bell as fallback. OS notifications go through `notify-send`,
//! and are closed over D-Bus with `gdbus` when the dismiss timer fires.
//! Hosts without `notify-send` get a center that only logs.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use reelwatch_events::{DeliveryError, NotificationCenter, PermissionGate, SoundPlayer};
use tokio::process::Command;

/// Upper bound for any helper process we spawn.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

const APP_NAME: &str = "ReelWatch";

/// Run `program args..` and return its stdout, or a message describing
/// why it failed.
async fn run(program: &str, args: &[&str]) -> Result<String, String> {
    let output = tokio::time::timeout(COMMAND_TIMEOUT, Command::new(program).args(args).output())
        .await
        .map_err(|_| format!("{program} timed out after {}s", COMMAND_TIMEOUT.as_secs()))?
        .map_err(|e| format!("Failed to execute {program}: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{program} failed (exit {}): {}",
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

// ---------------------------------------------------------------------------
// Sound
// ---------------------------------------------------------------------------

/// Plays the sound by running a configured command.
pub struct CommandSoundPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandSoundPlayer {
    /// `command[0]` is the program, the rest its arguments. `None` if empty.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl SoundPlayer for CommandSoundPlayer {
    async fn play(&self) -> Result<(), DeliveryError> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        run(&self.program, &args).await.map(|_| ()).map_err(DeliveryError::Sound)
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Fallback player: rings the terminal bell.
pub struct TerminalBell;

#[async_trait::async_trait]
impl SoundPlayer for TerminalBell {
    async fn play(&self) -> Result<(), DeliveryError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| DeliveryError::Sound(e.to_string()))
    }

    fn name(&self) -> &str {
        "bell"
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Freedesktop notifications through `notify-send`.
///
/// Remembers the server-assigned id per tag so a repeat for the same tag
/// replaces the visible notification (`--replace-id`) and a dismissal can
/// close it.
#[derive(Default)]
pub struct NotifySendCenter {
    ids: Mutex<HashMap<String, u32>>,
}

impl NotifySendCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `notify-send` can be executed on this host.
    pub async fn is_available() -> bool {
        run("notify-send", &["--version"]).await.is_ok()
    }

    fn ids(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl NotificationCenter for NotifySendCenter {
    async fn show(&self, tag: &str, title: &str, body: &str) -> Result<(), DeliveryError> {
        let replace_id = self.ids().get(tag).map(u32::to_string);

        let mut args = vec!["--print-id", "--app-name", APP_NAME];
        if let Some(id) = &replace_id {
            args.extend(["--replace-id", id.as_str()]);
        }
        args.extend([title, body]);

        let stdout = run("notify-send", &args)
            .await
            .map_err(DeliveryError::Notification)?;

        match stdout.lines().next().and_then(|line| line.trim().parse::<u32>().ok()) {
            Some(id) => {
                self.ids().insert(tag.to_string(), id);
            }
            None => tracing::debug!(tag, "notify-send did not report an id"),
        }
        Ok(())
    }

    async fn dismiss(&self, tag: &str) -> Result<(), DeliveryError> {
        let Some(id) = self.ids().remove(tag) else {
            return Ok(());
        };
        let id = id.to_string();

        run(
            "gdbus",
            &[
                "call",
                "--session",
                "--dest",
                "org.freedesktop.Notifications",
                "--object-path",
                "/org/freedesktop/Notifications",
                "--method",
                "org.freedesktop.Notifications.CloseNotification",
                &id,
            ],
        )
        .await
        .map(|_| ())
        .map_err(DeliveryError::Notification)
    }
}

#[async_trait::async_trait]
impl PermissionGate for NotifySendCenter {
    /// Desktop notifications need no prompt; permission means the tool works.
    async fn request_permission(&self) -> bool {
        Self::is_available().await
    }
}

/// Notification center for hosts without a desktop session.
pub struct LoggingNotificationCenter;

#[async_trait::async_trait]
impl NotificationCenter for LoggingNotificationCenter {
    async fn show(&self, tag: &str, title: &str, body: &str) -> Result<(), DeliveryError> {
        tracing::info!(tag, title, body, "Notification");
        Ok(())
    }

    async fn dismiss(&self, tag: &str) -> Result<(), DeliveryError> {
        tracing::debug!(tag, "Notification dismissed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl PermissionGate for LoggingNotificationCenter {
    async fn request_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn command_player_needs_a_program() {
        assert!(CommandSoundPlayer::new(&[]).is_none());

        let player = CommandSoundPlayer::new(&["paplay".into(), "ding.oga".into()]).unwrap();
        assert_eq!(player.program, "paplay");
        assert_eq!(player.args, vec!["ding.oga"]);
    }

    #[tokio::test]
    async fn missing_program_is_a_sound_error() {
        let player = CommandSoundPlayer::new(&["reelwatch-no-such-player".into()]).unwrap();
        assert_matches!(player.play().await, Err(DeliveryError::Sound(ref msg)) if msg.contains("Failed to execute"));
    }

    #[tokio::test]
    async fn dismissing_unknown_tag_is_a_no_op() {
        let center = NotifySendCenter::new();
        assert!(center.dismiss("video-ready-x").await.is_ok());
    }

    #[tokio::test]
    async fn logging_center_always_succeeds() {
        let center = LoggingNotificationCenter;
        assert!(center.show("video-ready-a", "Video ready", "body").await.is_ok());
        assert!(center.dismiss("video-ready-a").await.is_ok());
        assert!(center.request_permission().await);
    }
}
