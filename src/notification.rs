//! Desktop notifications
//!
//! Best effort only: on Linux notify-send (libnotify) is used, elsewhere
//! the notification is just logged. Failures never propagate.

#[cfg(target_os = "linux")]
use std::process::Stdio;
#[cfg(target_os = "linux")]
use tokio::process::Command;

const APP_NAME: &str = "Translator";

/// Send a desktop notification with the given title and body.
pub async fn send(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux(title, body).await;

    #[cfg(not(target_os = "linux"))]
    tracing::debug!("Notification (not shown on this platform): {}: {}", title, body);
}

#[cfg(target_os = "linux")]
async fn send_linux(title: &str, body: &str) {
    let app_name = format!("--app-name={}", APP_NAME);
    let result = Command::new("notify-send")
        .args([app_name.as_str(), "--expire-time=4000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Send a notification synchronously (blocking).
///
/// Used before the runtime is up, e.g. for startup failures.
pub fn send_sync(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    {
        let app_name = format!("--app-name={}", APP_NAME);
        let result = std::process::Command::new("notify-send")
            .args([app_name.as_str(), "--expire-time=4000", title, body])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();

        if let Err(e) = result {
            tracing::debug!("Failed to send notification: {}", e);
        }
    }

    #[cfg(not(target_os = "linux"))]
    tracing::debug!("Notification (not shown on this platform): {}: {}", title, body);
}
