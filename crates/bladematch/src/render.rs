//! User-facing text for navigator steps.

use anyhow::Result;
use bladematch_core::conversation::ConversationUsage;
use bladematch_core::error::{LookupError, Recovery};
use bladematch_core::navigator::{
    BladeStep, FavoritesStep, FrameStep, LinkStep, SearchStep, SideStep, TypeStep, VehicleOption,
};
use bladematch_core::search::SearchKind;
use bladematch_core::selection::{LinkMode, Side};
use bladematch_core::token_store::TokenStoreStats;

use crate::callback::Callback;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: &Callback) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            data: callback.encode()?,
        })
    }
}

/// A message plus the buttons under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Screen {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with(mut self, label: impl Into<String>, callback: &Callback) -> Result<Self> {
        self.buttons.push(Button::new(label, callback)?);
        Ok(self)
    }
}

pub const HELP: &str = "\
Type a brand and model (e.g. \"kia rio\" or \"vw polo 2015\") to search.
Type the number of an option to choose it.

Commands:
  /brand      browse all models of a brand
  /favorites  show saved vehicles
  /feedback   send a note to the catalog maintainers
  /cancel     cancel a pending /brand or /feedback
  /stats      usage counters
  /help       show this message
  /quit       leave";

pub fn side_label(side: Side) -> &'static str {
    match side {
        Side::Driver => "Driver side",
        Side::Passenger => "Passenger side",
    }
}

fn push_vehicles(screen: &mut Screen, options: &[VehicleOption]) -> Result<()> {
    for option in options {
        screen
            .buttons
            .push(Button::new(option.key.to_string(), &Callback::Model(option.token.to_string()))?);
    }
    Ok(())
}

pub fn search(step: &SearchStep) -> Result<Screen> {
    match step {
        SearchStep::Empty => Ok(Screen::text(
            "Nothing found. Check the spelling or try the brand alone.",
        )),
        SearchStep::Frames(frames) => self::frames(frames),
        SearchStep::Vehicles {
            kind,
            matches,
            similar,
        } => {
            let mut screen = Screen::default();
            screen.text = match (kind, matches.is_empty()) {
                (SearchKind::BrandListing, _) => "Choose a model:".to_string(),
                (_, false) => "Found:".to_string(),
                (_, true) => "No exact match. Did you mean:".to_string(),
            };
            push_vehicles(&mut screen, matches)?;
            push_vehicles(&mut screen, similar)?;
            Ok(screen)
        }
    }
}

pub fn frames(step: &FrameStep) -> Result<Screen> {
    let v = &step.vehicle;
    let mut text = format!("{} {} ({})\nMount: {}\n", v.brand, v.model, v.years, v.mount);
    for side in Side::ALL {
        if let Some(size) = step.fitment.sizes.get(side) {
            text.push_str(&format!("{}: {size} mm\n", side_label(side)));
        }
    }
    text.push_str("Choose a frame:");
    let mut screen = Screen::text(text);
    for option in &step.frames {
        screen = screen.with(&option.frame, &Callback::Frame(option.token.to_string()))?;
    }
    screen
        .with(
            "★ Add to favorites",
            &Callback::AddFavorite(step.vehicle_token.to_string()),
        )?
        .with("New search", &Callback::NewSearch)
}

pub fn types(step: &TypeStep) -> Result<Screen> {
    match step {
        TypeStep::Auto(blade) => self::blade(blade),
        TypeStep::Choose {
            selection,
            types,
            token,
        } => {
            let mut screen = Screen::text(format!("Frame {}. Choose a blade type:", selection.frame));
            for option in types {
                let label = match &option.description {
                    Some(description) => format!("{} ({description})", option.blade_type),
                    None => option.blade_type.clone(),
                };
                screen = screen.with(label, &Callback::Type(option.token.to_string()))?;
            }
            screen.with("← Frames", &Callback::BackToFrames(token.to_string()))
        }
    }
}

pub fn blade(step: &BladeStep) -> Result<Screen> {
    let mut text = format!(
        "Frame {}, blade type {}",
        step.selection.frame.frame, step.selection.blade_type
    );
    if let Some(description) = &step.description {
        text.push_str(&format!("\n{description}"));
    }
    let token = step.token.to_string();
    let mut screen = Screen::text(text);
    if step.kit_available {
        screen = screen.with("Kit (driver + passenger)", &Callback::Kit(token.clone()))?;
    }
    screen
        .with("Single blade", &Callback::Single(token.clone()))?
        .with("← Blade types", &Callback::BackToTypes(token.clone()))?
        .with("← Frames", &Callback::BackToFrames(token))
}

pub fn sides(step: &SideStep) -> Result<Screen> {
    let sides = step.sides();
    let token = step.token.to_string();
    let mut screen = Screen::text(if sides.is_empty() {
        "This vehicle declares no blade sizes."
    } else {
        "Which side?"
    });
    for (side, size) in sides {
        let label = format!("{} ({size} mm)", side_label(side));
        screen = screen.with(label, &Callback::Side(side, token.clone()))?;
    }
    screen.with("← Blade types", &Callback::BackToTypes(token))
}

pub fn links(step: &LinkStep) -> Result<Screen> {
    let what = match step.mode {
        LinkMode::Kit => "kit".to_string(),
        LinkMode::Single(side) => side_label(side).to_lowercase(),
    };
    let mut text = if step.links.is_empty() {
        format!("No purchase links for the {what} yet.")
    } else {
        format!("Where to buy ({what}):")
    };
    for link in &step.links {
        text.push_str(&format!("\n  {}: {}", link.marketplace, link.url));
    }
    Screen::text(text)
        .with("← Blade types", &Callback::BackToTypes(step.token.to_string()))?
        .with("New search", &Callback::NewSearch)
}

pub fn favorites(step: &FavoritesStep) -> Result<Screen> {
    if step.total == 0 {
        return Ok(Screen::text("No favorites yet. Add one from a vehicle's frame list."));
    }
    let mut screen = Screen::text(format!(
        "Favorites (page {} of {}):",
        step.page + 1,
        step.pages
    ));
    for entry in &step.entries {
        screen = screen
            .with(entry.key.to_string(), &Callback::Model(entry.open.to_string()))?
            .with(
                format!("✕ Remove {}", entry.key),
                &Callback::RemoveFavorite(entry.remove.to_string()),
            )?;
    }
    if step.page > 0 {
        screen = screen.with("← Previous", &Callback::Favorites(step.page - 1))?;
    }
    if step.page + 1 < step.pages {
        screen = screen.with("Next →", &Callback::Favorites(step.page + 1))?;
    }
    Ok(screen)
}

pub fn stats(usage: ConversationUsage, tokens: TokenStoreStats) -> Screen {
    Screen::text(format!(
        "Messages: {}\nUsers: {}\nSelections: {} live of {} ({} issued, {:.0}% reused)",
        usage.messages,
        usage.unique_users,
        tokens.live,
        tokens.capacity,
        tokens.issued,
        tokens.hit_rate() * 100.0
    ))
}

pub fn error(err: &LookupError) -> Result<Screen> {
    match err.recovery() {
        Recovery::RestartFlow => Screen::text("This selection has expired. Please start a new search.")
            .with("New search", &Callback::NewSearch),
        Recovery::ChooseAnother | Recovery::FixInput => {
            Screen::text(format!("Sorry, {err}.")).with("New search", &Callback::NewSearch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bladematch_core::catalog::{Marketplace, SizePair, VehicleKey};
    use bladematch_core::resolver::PurchaseLink;
    use bladematch_core::selection::{BladeSelection, Fitment, FrameSelection};
    use bladematch_core::token_store::SessionToken;

    fn option(model: &str, score: f64, token: &str) -> VehicleOption {
        VehicleOption {
            key: VehicleKey::new("KIA", model, "2017-2020"),
            score,
            token: SessionToken::from(token),
        }
    }

    fn selection(sizes: SizePair) -> BladeSelection {
        BladeSelection {
            frame: FrameSelection {
                fitment: Fitment {
                    vehicle: VehicleKey::new("KIA", "RIO", "2017-2020"),
                    mount: "hook".into(),
                    sizes,
                },
                frame: "F1".into(),
            },
            blade_type: "FRAMELESS".into(),
        }
    }

    #[test]
    fn search_lists_options_in_order() {
        let screen = search(&SearchStep::Vehicles {
            kind: SearchKind::Ranked,
            matches: vec![option("RIO", 1.0, "a"), option("RIO X", 1.0, "b")],
            similar: Vec::new(),
        })
        .unwrap();
        assert_eq!(screen.text, "Found:");
        let data: Vec<_> = screen.buttons.iter().map(|b| b.data.as_str()).collect();
        assert_eq!(data, ["model_a", "model_b"]);

        let screen = search(&SearchStep::Vehicles {
            kind: SearchKind::Ranked,
            matches: Vec::new(),
            similar: vec![option("CEED", 0.7, "c")],
        })
        .unwrap();
        assert_eq!(screen.text, "No exact match. Did you mean:");
        assert_eq!(screen.buttons.len(), 1);
    }

    #[test]
    fn blade_text_includes_description() {
        let screen = blade(&BladeStep {
            selection: selection(SizePair::new(Some(600), Some(400))),
            description: Some("All-season".into()),
            kit_available: false,
            token: SessionToken::from("t1"),
        })
        .unwrap();
        assert_eq!(screen.text, "Frame F1, blade type FRAMELESS\nAll-season");
        assert_eq!(screen.buttons[0].data, "single_t1");
    }

    #[test]
    fn links_are_listed_one_per_line() {
        let screen = links(&LinkStep {
            selection: selection(SizePair::new(Some(600), Some(400))),
            mode: LinkMode::Single(Side::Passenger),
            links: vec![
                PurchaseLink {
                    marketplace: Marketplace::Ozon,
                    url: "https://ozon.example/400".into(),
                },
                PurchaseLink {
                    marketplace: Marketplace::Wildberries,
                    url: "https://wb.example/400".into(),
                },
            ],
            token: SessionToken::from("t2"),
        })
        .unwrap();
        assert_eq!(
            screen.text,
            "Where to buy (passenger side):\n  ozon: https://ozon.example/400\n  wildberries: https://wb.example/400"
        );
    }

    #[test]
    fn stats_reports_counters() {
        let screen = stats(
            ConversationUsage {
                messages: 5,
                unique_users: 2,
            },
            TokenStoreStats {
                issued: 10,
                hits: 3,
                misses: 1,
                evictions: 0,
                live: 10,
                capacity: 100,
            },
        );
        assert!(screen.text.contains("Messages: 5"));
        assert!(screen.text.contains("Users: 2"));
        assert!(screen.text.contains("75% reused"));
    }
}
