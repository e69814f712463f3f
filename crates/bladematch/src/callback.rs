//! Button callback data.
//!
//! Inline buttons carry at most [`MAX_CALLBACK_BYTES`] bytes, so each button
//! holds a short action prefix plus a session token (or a page number).

use anyhow::{Result, bail};
use bladematch_core::selection::Side;

/// Size ceiling imposed by chat control surfaces.
pub const MAX_CALLBACK_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Model(String),
    Frame(String),
    Type(String),
    Kit(String),
    Single(String),
    Side(Side, String),
    BackToFrames(String),
    BackToTypes(String),
    AddFavorite(String),
    RemoveFavorite(String),
    Favorites(usize),
    NewSearch,
}

// Longer prefixes first: "single_left_" must win over "single_".
const TOKEN_PREFIXES: &[(&str, fn(String) -> Callback)] = &[
    ("back_to_frames_", Callback::BackToFrames),
    ("back_to_types_", Callback::BackToTypes),
    ("add_favorite_", Callback::AddFavorite),
    ("remove_favorite_", Callback::RemoveFavorite),
    ("single_left_", |t| Callback::Side(Side::Driver, t)),
    ("single_right_", |t| Callback::Side(Side::Passenger, t)),
    ("single_", Callback::Single),
    ("model_", Callback::Model),
    ("frame_", Callback::Frame),
    ("type_", Callback::Type),
    ("kit_", Callback::Kit),
];

impl Callback {
    /// Wire form; fails if it would not fit a button.
    pub fn encode(&self) -> Result<String> {
        let data = match self {
            Self::Model(t) => format!("model_{t}"),
            Self::Frame(t) => format!("frame_{t}"),
            Self::Type(t) => format!("type_{t}"),
            Self::Kit(t) => format!("kit_{t}"),
            Self::Single(t) => format!("single_{t}"),
            Self::Side(Side::Driver, t) => format!("single_left_{t}"),
            Self::Side(Side::Passenger, t) => format!("single_right_{t}"),
            Self::BackToFrames(t) => format!("back_to_frames_{t}"),
            Self::BackToTypes(t) => format!("back_to_types_{t}"),
            Self::AddFavorite(t) => format!("add_favorite_{t}"),
            Self::RemoveFavorite(t) => format!("remove_favorite_{t}"),
            Self::Favorites(page) => format!("favorites_{page}"),
            Self::NewSearch => "new_search".to_string(),
        };
        if data.len() > MAX_CALLBACK_BYTES {
            bail!(
                "callback data is {} bytes, limit is {MAX_CALLBACK_BYTES}: {data}",
                data.len()
            );
        }
        Ok(data)
    }

    /// Parse wire data; `None` for anything unrecognized.
    pub fn parse(data: &str) -> Option<Self> {
        if data.len() > MAX_CALLBACK_BYTES {
            return None;
        }
        if data == "new_search" {
            return Some(Self::NewSearch);
        }
        if let Some(page) = data.strip_prefix("favorites_") {
            return page.parse().ok().map(Self::Favorites);
        }
        TOKEN_PREFIXES.iter().find_map(|(prefix, build)| {
            data.strip_prefix(prefix)
                .filter(|token| !token.is_empty())
                .map(|token| build(token.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_prefixes_win_over_single() {
        assert_eq!(
            Callback::parse("single_left_abc"),
            Some(Callback::Side(Side::Driver, "abc".into()))
        );
        assert_eq!(
            Callback::parse("single_right_abc"),
            Some(Callback::Side(Side::Passenger, "abc".into()))
        );
        assert_eq!(Callback::parse("single_abc"), Some(Callback::Single("abc".into())));
    }

    #[test]
    fn encode_parse_agree() {
        let all = [
            Callback::Model("t1".into()),
            Callback::Frame("t2".into()),
            Callback::Type("t3".into()),
            Callback::Kit("t4".into()),
            Callback::BackToFrames("t5".into()),
            Callback::BackToTypes("t6".into()),
            Callback::AddFavorite("t7".into()),
            Callback::RemoveFavorite("t8".into()),
            Callback::Favorites(3),
            Callback::NewSearch,
        ];
        for cb in all {
            let data = cb.encode().unwrap();
            assert_eq!(Callback::parse(&data), Some(cb));
        }
    }

    #[test]
    fn oversized_data_is_rejected() {
        let long = "x".repeat(60);
        assert!(Callback::BackToFrames(long.clone()).encode().is_err());
        assert_eq!(Callback::parse(&format!("back_to_frames_{long}")), None);
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert_eq!(Callback::parse("model_"), None);
        assert_eq!(Callback::parse("favorites_x"), None);
        assert_eq!(Callback::parse("launch_rockets"), None);
    }
}
