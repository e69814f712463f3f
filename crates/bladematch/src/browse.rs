//! Line-oriented interactive session.
//!
//! Each screen lists numbered buttons; typing a number presses one. Button
//! presses travel through the same callback data a chat front end would use.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use bladematch_core::conversation::{ConversationState, ConversationTracker, TextRoute};
use bladematch_core::favorites::UserId;
use bladematch_core::navigator::Navigator;
use bladematch_core::LookupError;
use tracing::info;

use crate::callback::Callback;
use crate::render::{self, Button, Screen};

pub struct Session<'a, W: Write> {
    nav: &'a Navigator,
    conversation: ConversationTracker,
    user: UserId,
    buttons: Vec<Button>,
    out: W,
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(nav: &'a Navigator, user: UserId, out: W) -> Self {
        Self {
            nav,
            conversation: ConversationTracker::new(),
            user,
            buttons: Vec::new(),
            out,
        }
    }

    /// Read lines until EOF or `/quit`.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        self.show(Screen::text(format!("Wiper blade finder.\n{}", render::HELP)))?;
        for line in input.lines() {
            let line = line.context("Failed to read input")?;
            if !self.handle_line(line.trim())? {
                break;
            }
        }
        Ok(())
    }

    /// Returns `false` when the session should end.
    pub fn handle_line(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() {
            return Ok(true);
        }
        self.conversation.record(self.user);
        if let Some(command) = line.strip_prefix('/') {
            return self.command(command);
        }
        if let Ok(pick) = line.parse::<usize>() {
            if (1..=self.buttons.len()).contains(&pick) {
                let data = self.buttons[pick - 1].data.clone();
                let screen = self.press(&data)?;
                self.show(screen)?;
                return Ok(true);
            }
        }
        let screen = match self.conversation.route_text(self.user, line) {
            TextRoute::Search(query) => {
                info!(user = self.user, query = %query, "Search");
                settle(self.nav.search_step(&query).map(|step| render::search(&step)))?
            }
            TextRoute::BrandSearch(brand) => {
                info!(user = self.user, brand = %brand, "Brand search");
                render::search(&self.nav.brand_step(&brand))?
            }
            TextRoute::Feedback(text) => {
                info!(user = self.user, feedback = %text, "Feedback received");
                Screen::text("Thank you! Your feedback has been recorded.")
            }
        };
        self.show(screen)?;
        Ok(true)
    }

    fn command(&mut self, command: &str) -> Result<bool> {
        let screen = match command.split_whitespace().next().unwrap_or_default() {
            "start" | "help" => Screen::text(render::HELP),
            "brand" => {
                self.conversation.await_brand(self.user);
                Screen::text("Enter a brand:")
            }
            "feedback" => {
                self.conversation.await_feedback(self.user);
                Screen::text("Write your feedback in one message:")
            }
            "cancel" => match self.conversation.cancel(self.user) {
                ConversationState::Idle => Screen::text("Nothing to cancel."),
                ConversationState::AwaitingBrand => Screen::text("Brand search cancelled."),
                ConversationState::AwaitingFeedback => Screen::text("Feedback cancelled."),
            },
            "favorites" => render::favorites(&self.nav.favorites_page(self.user, 0))?,
            "stats" => render::stats(self.conversation.usage(), self.nav.finder().token_stats()),
            "quit" | "exit" => return Ok(false),
            other => Screen::text(format!("Unknown command /{other}. Type /help.")),
        };
        self.show(screen)?;
        Ok(true)
    }

    /// Dispatch one button press.
    pub fn press(&mut self, data: &str) -> Result<Screen> {
        let Some(callback) = Callback::parse(data) else {
            return Ok(Screen::text("Unknown action. Start a new search."));
        };
        let nav = self.nav;
        let user = self.user;
        info!(user, action = data, "Button pressed");
        match callback {
            Callback::Model(t) => settle(nav.select_vehicle(&t).map(|s| render::frames(&s))),
            Callback::Frame(t) => settle(nav.select_frame(&t).map(|s| render::types(&s))),
            Callback::Type(t) => settle(nav.select_blade(&t).map(|s| render::blade(&s))),
            Callback::Kit(t) => settle(nav.select_kit(&t).map(|s| render::links(&s))),
            Callback::Single(t) => settle(nav.select_single(&t).map(|s| render::sides(&s))),
            Callback::Side(side, t) => settle(nav.select_side(&t, side).map(|s| render::links(&s))),
            Callback::BackToFrames(t) => settle(nav.back_to_frames(&t).map(|s| render::frames(&s))),
            Callback::BackToTypes(t) => settle(nav.back_to_types(&t).map(|s| render::types(&s))),
            Callback::AddFavorite(t) => settle(nav.add_favorite(user, &t).map(|added| -> Result<Screen> {
                Ok(Screen::text(if added {
                    "Added to favorites."
                } else {
                    "Already in favorites."
                }))
            })),
            Callback::RemoveFavorite(t) => settle(nav.remove_favorite(user, &t).map(|removed| -> Result<Screen> {
                let mut screen = render::favorites(&nav.favorites_page(user, 0))?;
                let note = match removed {
                    Some(key) => format!("Removed {key}."),
                    None => "That entry has already changed.".to_string(),
                };
                screen.text = format!("{note}\n{}", screen.text);
                Ok(screen)
            })),
            Callback::Favorites(page) => render::favorites(&nav.favorites_page(user, page)),
            Callback::NewSearch => {
                self.conversation.cancel(user);
                Ok(Screen::text("Enter a brand and model:"))
            }
        }
    }

    fn show(&mut self, screen: Screen) -> Result<()> {
        writeln!(self.out, "{}", screen.text)?;
        for (n, button) in screen.buttons.iter().enumerate() {
            writeln!(self.out, "  [{}] {}", n + 1, button.label)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        self.buttons = screen.buttons;
        Ok(())
    }
}

/// Turn a lookup failure into its screen; render errors still propagate.
fn settle(result: std::result::Result<Result<Screen>, LookupError>) -> Result<Screen> {
    match result {
        Ok(screen) => screen,
        Err(err) => render::error(&err),
    }
}
