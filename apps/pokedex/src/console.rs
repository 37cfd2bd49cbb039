//! Terminal I/O: the line reader/writer the shell runs on, the permission
//! prompt, and the notifier that prints notifications.

use std::{io::Write, sync::Mutex as StdMutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use client_core::PermissionHost;
use shared::notification::{Notification, NotificationPermission};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::Mutex,
};
use worker::Notifier;

pub struct Console<R, W> {
    input: Mutex<R>,
    output: StdMutex<W>,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: StdMutex::new(output),
        }
    }

    /// `None` at end of input. Bytes that are not UTF-8 are replaced rather
    /// than failing the read.
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let read = self.input.lock().await.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    pub fn print(&self, text: &str) -> Result<()> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| anyhow!("console output lock poisoned"))?;
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<R, W> PermissionHost for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn request_permission(&self) -> NotificationPermission {
        if self.print("Allow notifications? [y/n] ").is_err() {
            return NotificationPermission::Default;
        }
        match self.read_line().await {
            Ok(Some(answer)) => parse_answer(&answer),
            _ => NotificationPermission::Default,
        }
    }
}

/// Anything but a clear yes or no dismisses the prompt.
fn parse_answer(answer: &str) -> NotificationPermission {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => NotificationPermission::Granted,
        "n" | "no" => NotificationPermission::Denied,
        _ => NotificationPermission::Default,
    }
}

/// Prints notifications to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\n{}", format_notification(notification))?;
        stdout.flush()?;
        Ok(())
    }
}

fn format_notification(notification: &Notification) -> String {
    let mut line = format!("[notification] {}: {}", notification.title, notification.body);
    if let Some(icon) = &notification.icon {
        line.push_str(&format!(" ({icon})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use shared::notification::NotificationPayload;

    use super::*;

    #[test]
    fn answers_map_to_permissions() {
        assert_eq!(parse_answer("Y"), NotificationPermission::Granted);
        assert_eq!(parse_answer(" yes "), NotificationPermission::Granted);
        assert_eq!(parse_answer("no"), NotificationPermission::Denied);
        assert_eq!(parse_answer(""), NotificationPermission::Default);
        assert_eq!(parse_answer("maybe"), NotificationPermission::Default);
    }

    #[tokio::test]
    async fn prompt_reads_the_next_line() {
        let console = Console::new(&b"y\nnext\n"[..], Vec::new());
        assert_eq!(console.request_permission().await, NotificationPermission::Granted);
        assert_eq!(console.read_line().await.expect("read").as_deref(), Some("next"));
        assert_eq!(console.read_line().await.expect("read"), None);
        let printed = String::from_utf8(console.into_output()).expect("utf8");
        assert_eq!(printed, "Allow notifications? [y/n] ");
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_decoded_lossily() {
        let console = Console::new(&b"search \xff\xfe\r\nquit"[..], Vec::new());
        assert_eq!(
            console.read_line().await.expect("read").as_deref(),
            Some("search \u{FFFD}\u{FFFD}")
        );
        assert_eq!(console.read_line().await.expect("read").as_deref(), Some("quit"));
        assert_eq!(console.read_line().await.expect("read"), None);
    }

    #[tokio::test]
    async fn prompt_at_end_of_input_is_dismissed() {
        let console = Console::new(&b""[..], Vec::new());
        assert_eq!(console.request_permission().await, NotificationPermission::Default);
    }

    #[test]
    fn formats_title_body_and_icon() {
        let notification = NotificationPayload {
            title: Some("Pikachu viewed!".into()),
            body: Some("You viewed Pikachu.".into()),
            icon: None,
        }
        .into_notification();
        assert_eq!(
            format_notification(&notification),
            "[notification] Pikachu viewed!: You viewed Pikachu. (/poke-icon-192.png)"
        );
        assert_eq!(
            format_notification(&Notification::simple("PokéPWA", "Notifications enabled!")),
            "[notification] PokéPWA: Notifications enabled!"
        );
    }
}
