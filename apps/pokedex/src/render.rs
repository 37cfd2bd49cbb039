use std::fmt::Write as _;

use client_core::{BrowseView, Screen};

pub const HELP: &str = "\
commands:
  search <term>   filter by name (empty term clears the search)
  next | n        next page
  prev | p        previous page
  view <slot>     open the card in that slot and notify the worker
  notify          enable notifications
  reload          load the listing again
  help            show this help
  quit            exit
";

pub fn render(screen: &Screen) -> String {
    match screen {
        Screen::Loading => "Loading Pokémon...\n".to_string(),
        Screen::Error(message) => format!("Error: {message}\n"),
        Screen::Browse(view) => render_browse(view),
    }
}

fn render_browse(view: &BrowseView) -> String {
    let mut out = String::from(" Pokédex\n");
    if !view.term.is_empty() {
        let _ = writeln!(out, "search: {}", view.term);
    }
    out.push('\n');

    for card in &view.cards {
        let _ = writeln!(
            out,
            "[{:>2}] #{:<5} {:<16} {}",
            card.slot,
            card.id.to_string(),
            card.name,
            card.image_url
        );
    }

    if view.no_results {
        out.push_str("No Pokémon found with that name.\n");
    }

    if let Some(bar) = view.pagination {
        let prev = if bar.can_go_back { "< prev" } else { "      " };
        let next = if bar.can_go_forward { "next >" } else { "" };
        let _ = writeln!(
            out,
            "\n{prev}   Page {} of {}   {next}",
            bar.page, bar.total_pages
        );
    }
    out
}
