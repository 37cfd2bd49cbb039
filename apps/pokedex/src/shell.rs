use std::io::Write;

use anyhow::Result;
use client_core::Pokedex;
use shared::notification::NotificationPermission;
use tokio::io::AsyncBufRead;
use tracing::debug;

use crate::{
    console::Console,
    render::{render, HELP},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Next,
    Previous,
    View(usize),
    Notify,
    Reload,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "search" | "s" => Self::Search(rest.to_string()),
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Previous,
            "view" | "v" => match rest.parse() {
                Ok(slot) => Self::View(slot),
                Err(_) => Self::Unknown(line.to_string()),
            },
            "notify" => Self::Notify,
            "reload" | "r" => Self::Reload,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Loads the listing, then reads commands until `quit` or end of input.
pub async fn run<R, W>(pokedex: &mut Pokedex, console: &Console<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    console.print(&render(&pokedex.screen()))?;
    pokedex.load().await;
    console.print(&render(&pokedex.screen()))?;

    loop {
        console.print("> ")?;
        let Some(line) = console.read_line().await? else {
            break;
        };
        let command = Command::parse(&line);
        debug!(?command, "shell command");

        match command {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => console.print(HELP)?,
            Command::Unknown(input) => {
                console.print(&format!("unknown command: {input}\n{HELP}"))?;
            }
            Command::Search(term) => {
                pokedex.search(term);
                console.print(&render(&pokedex.screen()))?;
            }
            Command::Next => {
                pokedex.next_page();
                console.print(&render(&pokedex.screen()))?;
            }
            Command::Previous => {
                pokedex.previous_page();
                console.print(&render(&pokedex.screen()))?;
            }
            Command::Reload => {
                console.print(&render(&client_core::Screen::Loading))?;
                pokedex.load().await;
                console.print(&render(&pokedex.screen()))?;
            }
            Command::View(slot) => match pokedex.select_card(slot).await {
                Some(species) => console.print(&format!(
                    "#{} {}\n{}\n",
                    species.id, species.name, species.image_url
                ))?,
                None => console.print(&format!("no card in slot {slot}\n"))?,
            },
            Command::Notify => {
                let permission = pokedex.request_notification_permission(console).await;
                console.print(match permission {
                    NotificationPermission::Granted => "notifications enabled\n",
                    NotificationPermission::Denied => "notifications blocked\n",
                    NotificationPermission::Default => "notification prompt dismissed\n",
                })?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
