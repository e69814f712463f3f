//! Token-driven selection flow.
//!
//! ```text
//! search ─▶ vehicle ─▶ frame ─▶ type ─┬─▶ kit ───────────▶ links
//!                        ▲      ▲     └─▶ single ─▶ side ─▶ links
//!                        │      └── back_to_types
//!                        └───────── back_to_frames
//! ```
//!
//! Every step starts from a token lookup, re-reads the vehicle from the
//! catalog, and mints fresh tokens for the choices it offers. A step never
//! mutates a stored payload.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{SizePair, Vehicle, VehicleKey};
use crate::error::{LookupError, NoParts, NotFound};
use crate::favorites::{FavoritesStore, UserId};
use crate::finder::PartsFinder;
use crate::resolver::{PurchaseLink, TypeChoice};
use crate::search::{SearchKind, SearchOutcome};
use crate::selection::{BladeSelection, Fitment, FrameSelection, LinkMode, SessionPayload, Side};
use crate::token_store::SessionToken;

// =============================================================================
// Step views
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleOption {
    pub key: VehicleKey,
    pub score: f64,
    /// `Vehicle` payload.
    pub token: SessionToken,
}

/// Result of a free-text or brand query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SearchStep {
    /// Nothing matched (or nothing was asked).
    Empty,
    Vehicles {
        kind: SearchKind,
        matches: Vec<VehicleOption>,
        similar: Vec<VehicleOption>,
    },
    /// Exactly one vehicle matched; its frames are shown directly.
    Frames(FrameStep),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameOption {
    pub frame: String,
    /// `Frame` payload.
    pub token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameStep {
    pub vehicle: Vehicle,
    pub fitment: Fitment,
    pub frames: Vec<FrameOption>,
    /// `Vehicle` payload, for adding to favorites.
    pub vehicle_token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeOption {
    pub blade_type: String,
    pub description: Option<String>,
    /// `Blade` payload.
    pub token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TypeStep {
    Choose {
        selection: FrameSelection,
        types: Vec<TypeOption>,
        /// `Frame` payload, for going back to frames.
        token: SessionToken,
    },
    /// The only compatible type was selected automatically.
    Auto(BladeStep),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BladeStep {
    pub selection: BladeSelection,
    pub description: Option<String>,
    pub kit_available: bool,
    /// `Blade` payload shared by the kit, single and back choices.
    pub token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideStep {
    pub selection: BladeSelection,
    pub sizes: SizePair,
    /// `Blade` payload.
    pub token: SessionToken,
}

impl SideStep {
    /// Sides with a declared size, driver first.
    #[must_use]
    pub fn sides(&self) -> Vec<(Side, u32)> {
        Side::ALL
            .into_iter()
            .filter_map(|side| self.sizes.get(side).map(|size| (side, size)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStep {
    pub selection: BladeSelection,
    pub mode: LinkMode,
    pub links: Vec<PurchaseLink>,
    /// `Blade` payload, for going back to types.
    pub token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteEntry {
    pub index: usize,
    pub key: VehicleKey,
    /// `Vehicle` payload, opens the vehicle.
    pub open: SessionToken,
    /// `FavoriteSlot` payload, removes this entry.
    pub remove: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoritesStep {
    pub entries: Vec<FavoriteEntry>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
}

// =============================================================================
// Navigator
// =============================================================================

pub struct Navigator {
    finder: Arc<PartsFinder>,
    favorites: Arc<dyn FavoritesStore>,
}

impl Navigator {
    #[must_use]
    pub fn new(finder: Arc<PartsFinder>, favorites: Arc<dyn FavoritesStore>) -> Self {
        Self { finder, favorites }
    }

    #[must_use]
    pub fn finder(&self) -> &PartsFinder {
        &self.finder
    }

    /// Free-text query. A single distinct match skips straight to frames.
    pub fn search_step(&self, query: &str) -> Result<SearchStep, LookupError> {
        let outcome = self.finder.search(query);
        if let Some(vehicle) = outcome.sole_match() {
            debug!(vehicle = %vehicle.key(), "Single match, showing frames");
            return self.frame_step(&vehicle.key()).map(SearchStep::Frames);
        }
        Ok(self.vehicle_list(&outcome))
    }

    /// Brand-only query (after `/brand`).
    #[must_use]
    pub fn brand_step(&self, brand: &str) -> SearchStep {
        self.vehicle_list(&self.finder.search_brand(brand))
    }

    fn vehicle_list(&self, outcome: &SearchOutcome) -> SearchStep {
        if outcome.is_empty() {
            return SearchStep::Empty;
        }
        let mut seen = std::collections::HashSet::new();
        let mut options = |candidates: &[crate::search::Candidate]| -> Vec<VehicleOption> {
            candidates
                .iter()
                .filter(|c| seen.insert(c.vehicle.key()))
                .map(|c| {
                    let key = c.vehicle.key();
                    VehicleOption {
                        token: self.finder.put_state(key.clone()),
                        key,
                        score: c.score,
                    }
                })
                .collect()
        };
        // Near misses are offered only when nothing matched exactly.
        let matches = options(outcome.matches.as_slice());
        let similar = if matches.is_empty() {
            options(outcome.similar.as_slice())
        } else {
            Vec::new()
        };
        SearchStep::Vehicles {
            kind: outcome.kind,
            matches,
            similar,
        }
    }

    pub fn select_vehicle(&self, token: &str) -> Result<FrameStep, LookupError> {
        match self.finder.get_state(token)?.as_ref() {
            SessionPayload::Vehicle { vehicle } | SessionPayload::FavoriteSlot { vehicle, .. } => {
                self.frame_step(vehicle)
            }
            SessionPayload::Fitment(fitment) => self.frame_step(&fitment.vehicle),
            _ => Err(stage_mismatch(token, "vehicle")),
        }
    }

    fn frame_step(&self, key: &VehicleKey) -> Result<FrameStep, LookupError> {
        let (fitment, frames) = self.finder.resolve_frames(key)?;
        let vehicle = self.finder.resolver().vehicle(key)?.clone();
        let frames = frames
            .into_iter()
            .map(|frame| FrameOption {
                token: self.finder.put_state(FrameSelection {
                    fitment: fitment.clone(),
                    frame: frame.clone(),
                }),
                frame,
            })
            .collect();
        Ok(FrameStep {
            vehicle_token: self.finder.put_state(key.clone()),
            vehicle,
            fitment,
            frames,
        })
    }

    /// Frame chosen. One compatible type auto-advances to the blade step.
    pub fn select_frame(&self, token: &str) -> Result<TypeStep, LookupError> {
        let selection = self.frame_payload(token)?;
        self.type_step(selection, true)
    }

    fn type_step(&self, selection: FrameSelection, auto_advance: bool) -> Result<TypeStep, LookupError> {
        let choice = self.finder.resolve_types(&selection.frame, &selection.fitment)?;
        if auto_advance {
            if let TypeChoice::Auto(only) = &choice {
                debug!(frame = %selection.frame, blade_type = %only.blade_type, "Auto-selected blade type");
                return self
                    .blade_step(BladeSelection {
                        frame: selection,
                        blade_type: only.blade_type.clone(),
                    })
                    .map(TypeStep::Auto);
            }
        }
        let types = choice
            .types()
            .iter()
            .map(|t| TypeOption {
                blade_type: t.blade_type.clone(),
                description: t.description.clone(),
                token: self.finder.put_state(BladeSelection {
                    frame: selection.clone(),
                    blade_type: t.blade_type.clone(),
                }),
            })
            .collect();
        Ok(TypeStep::Choose {
            token: self.finder.put_state(selection.clone()),
            selection,
            types,
        })
    }

    pub fn select_blade(&self, token: &str) -> Result<BladeStep, LookupError> {
        let selection = self.blade_payload(token)?;
        self.blade_step(selection)
    }

    fn blade_step(&self, selection: BladeSelection) -> Result<BladeStep, LookupError> {
        let resolver = self.finder.resolver();
        let description = resolver
            .blade_type(&selection.frame.frame, &selection.blade_type)
            .ok_or_else(|| NoParts::Types {
                frame: selection.frame.frame.clone(),
            })?
            .description
            .clone();
        let kit_available = !self.finder.resolve_links(&selection, LinkMode::Kit)?.is_empty();
        Ok(BladeStep {
            token: self.finder.put_state(selection.clone()),
            selection,
            description,
            kit_available,
        })
    }

    pub fn select_kit(&self, token: &str) -> Result<LinkStep, LookupError> {
        let selection = self.blade_payload(token)?;
        self.link_step(selection, LinkMode::Kit)
    }

    pub fn select_single(&self, token: &str) -> Result<SideStep, LookupError> {
        let selection = self.blade_payload(token)?;
        Ok(SideStep {
            sizes: selection.fitment().sizes,
            token: self.finder.put_state(selection.clone()),
            selection,
        })
    }

    pub fn select_side(&self, token: &str, side: Side) -> Result<LinkStep, LookupError> {
        let selection = self.blade_payload(token)?;
        self.link_step(selection, LinkMode::Single(side))
    }

    fn link_step(&self, selection: BladeSelection, mode: LinkMode) -> Result<LinkStep, LookupError> {
        let links = self.finder.resolve_links(&selection, mode)?;
        info!(
            vehicle = %selection.fitment().vehicle,
            frame = %selection.frame.frame,
            blade_type = %selection.blade_type,
            links = links.len(),
            "Purchase links resolved"
        );
        Ok(LinkStep {
            token: self.finder.put_state(selection.clone()),
            selection,
            mode,
            links,
        })
    }

    pub fn back_to_frames(&self, token: &str) -> Result<FrameStep, LookupError> {
        match self.finder.get_state(token)?.as_ref() {
            SessionPayload::Frame(frame) => self.frame_step(&frame.fitment.vehicle),
            SessionPayload::Blade(blade) => self.frame_step(&blade.fitment().vehicle),
            _ => Err(stage_mismatch(token, "frame")),
        }
    }

    /// Type list for the blade's frame; never auto-advances.
    pub fn back_to_types(&self, token: &str) -> Result<TypeStep, LookupError> {
        let selection = self.blade_payload(token)?;
        self.type_step(selection.frame, false)
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------

    /// Add the vehicle behind a `Vehicle` token. `Ok(false)` if already saved.
    pub fn add_favorite(&self, user: UserId, token: &str) -> Result<bool, LookupError> {
        let payload = self.finder.get_state(token)?;
        let SessionPayload::Vehicle { vehicle } = payload.as_ref() else {
            return Err(stage_mismatch(token, "vehicle"));
        };
        self.finder.current_fitment(vehicle)?;
        Ok(self.favorites.add(user, vehicle.clone()))
    }

    #[must_use]
    pub fn favorites_page(&self, user: UserId, page: usize) -> FavoritesStep {
        let page = self
            .favorites
            .page(user, page, self.finder.config().favorites.page_size);
        let entries = page
            .entries
            .into_iter()
            .map(|(index, key)| FavoriteEntry {
                open: self.finder.put_state(key.clone()),
                remove: self.finder.put_state(SessionPayload::FavoriteSlot {
                    index,
                    vehicle: key.clone(),
                }),
                index,
                key,
            })
            .collect();
        FavoritesStep {
            entries,
            page: page.page,
            pages: page.pages,
            total: page.total,
        }
    }

    /// Remove the entry behind a `FavoriteSlot` token. `Ok(None)` when the
    /// slot no longer holds that vehicle.
    pub fn remove_favorite(&self, user: UserId, token: &str) -> Result<Option<VehicleKey>, LookupError> {
        let payload = self.finder.get_state(token)?;
        let SessionPayload::FavoriteSlot { index, vehicle } = payload.as_ref() else {
            return Err(stage_mismatch(token, "favorite_slot"));
        };
        Ok(self.favorites.remove_matching(user, *index, vehicle))
    }

    // -------------------------------------------------------------------------
    // Payload access
    // -------------------------------------------------------------------------

    fn frame_payload(&self, token: &str) -> Result<FrameSelection, LookupError> {
        match self.finder.get_state(token)?.as_ref() {
            SessionPayload::Frame(frame) => Ok(FrameSelection {
                fitment: self.finder.current_fitment(&frame.fitment.vehicle)?,
                frame: frame.frame.clone(),
            }),
            _ => Err(stage_mismatch(token, "frame")),
        }
    }

    fn blade_payload(&self, token: &str) -> Result<BladeSelection, LookupError> {
        match self.finder.get_state(token)?.as_ref() {
            SessionPayload::Blade(blade) => Ok(BladeSelection {
                frame: FrameSelection {
                    fitment: self.finder.current_fitment(&blade.fitment().vehicle)?,
                    frame: blade.frame.frame.clone(),
                },
                blade_type: blade.blade_type.clone(),
            }),
            _ => Err(stage_mismatch(token, "blade")),
        }
    }
}

fn stage_mismatch(token: &str, expected: &'static str) -> LookupError {
    tracing::warn!(token, expected, "Session token holds a different stage");
    NotFound::Stage {
        token: token.to_string(),
        expected,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BladeType, Catalog, CatalogSnapshot, FrameRule};
    use crate::config::FinderConfig;
    use crate::favorites::InMemoryFavorites;
    use crate::synonyms::SynonymTable;

    fn navigator() -> Navigator {
        let catalog = Catalog::from_snapshot(CatalogSnapshot {
            vehicles: vec![
                Vehicle {
                    brand: "KIA".into(),
                    model: "RIO".into(),
                    years: "2017-2020".into(),
                    mount: "hook".into(),
                    driver: Some(600),
                    passenger: Some(400),
                },
                Vehicle {
                    brand: "KIA".into(),
                    model: "CEED".into(),
                    years: "2012-2018".into(),
                    mount: "pin".into(),
                    driver: Some(650),
                    passenger: None,
                },
            ],
            frames: vec![
                FrameRule {
                    mount: "hook".into(),
                    frame: "F1".into(),
                    sizes: [600, 400].into_iter().collect(),
                },
                FrameRule {
                    mount: "hook".into(),
                    frame: "F2".into(),
                    sizes: [600, 400].into_iter().collect(),
                },
            ],
            blade_types: vec![
                BladeType {
                    frame: "F1".into(),
                    blade_type: "T1".into(),
                    description: Some("frameless".into()),
                    mounts: Vec::new(),
                    sizes: Default::default(),
                },
                BladeType {
                    frame: "F2".into(),
                    blade_type: "A".into(),
                    description: None,
                    mounts: Vec::new(),
                    sizes: Default::default(),
                },
                BladeType {
                    frame: "F2".into(),
                    blade_type: "B".into(),
                    description: None,
                    mounts: Vec::new(),
                    sizes: Default::default(),
                },
            ],
            links: Vec::new(),
        })
        .unwrap();
        let finder = PartsFinder::new(
            Arc::new(catalog),
            Arc::new(SynonymTable::default()),
            FinderConfig::default(),
        );
        Navigator::new(Arc::new(finder), Arc::new(InMemoryFavorites::new()))
    }

    fn frames(step: SearchStep) -> FrameStep {
        match step {
            SearchStep::Frames(frames) => frames,
            other => panic!("expected frames, got {other:?}"),
        }
    }

    #[test]
    fn single_match_skips_vehicle_list() {
        let step = frames(navigator().search_step("rio").unwrap());
        assert_eq!(step.vehicle.model, "RIO");
        let names: Vec<_> = step.frames.iter().map(|f| f.frame.as_str()).collect();
        assert_eq!(names, vec!["F1", "F2"]);
    }

    #[test]
    fn brand_query_lists_vehicles() {
        match navigator().search_step("kia").unwrap() {
            SearchStep::Vehicles { kind, matches, .. } => {
                assert_eq!(kind, SearchKind::BrandListing);
                assert_eq!(matches.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exact_matches_hide_similar_ones() {
        let row = |model: &str, years: &str| Vehicle {
            brand: "KIA".into(),
            model: model.into(),
            years: years.into(),
            mount: "hook".into(),
            driver: Some(600),
            passenger: Some(400),
        };
        let catalog = Catalog::from_snapshot(CatalogSnapshot {
            vehicles: vec![
                row("RIO", "2017-2020"),
                row("RIO", "2011-2017"),
                row("CEED", "2012-2018"),
            ],
            ..Default::default()
        })
        .unwrap();
        let finder = Arc::new(PartsFinder::new(
            Arc::new(catalog),
            Arc::new(SynonymTable::default()),
            FinderConfig::default(),
        ));
        assert_eq!(finder.search("kia rio").similar.len(), 1);

        let nav = Navigator::new(finder, Arc::new(InMemoryFavorites::new()));
        match nav.search_step("kia rio").unwrap() {
            SearchStep::Vehicles { matches, similar, .. } => {
                assert_eq!(matches.len(), 2);
                assert!(similar.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        match nav.search_step("kia rip").unwrap() {
            SearchStep::Vehicles { matches, similar, .. } => {
                assert!(matches.is_empty());
                assert_eq!(similar.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn vehicle_without_frames_has_no_parts() {
        let err = navigator().search_step("ceed").unwrap_err();
        assert_eq!(
            err,
            LookupError::NoCompatibleParts(NoParts::Frames {
                mount: "pin".into()
            })
        );
    }

    #[test]
    fn one_type_auto_advances_but_back_does_not() {
        let nav = navigator();
        let step = frames(nav.search_step("rio").unwrap());
        let TypeStep::Auto(blade) = nav.select_frame(step.frames[0].token.as_str()).unwrap() else {
            panic!("expected auto-advance");
        };
        assert_eq!(blade.selection.blade_type, "T1");
        assert_eq!(blade.description.as_deref(), Some("frameless"));
        assert!(!blade.kit_available);

        let back = nav.back_to_types(blade.token.as_str()).unwrap();
        assert!(matches!(back, TypeStep::Choose { ref types, .. } if types.len() == 1));
    }

    #[test]
    fn several_types_ask() {
        let nav = navigator();
        let step = frames(nav.search_step("rio").unwrap());
        let TypeStep::Choose { types, token, .. } = nav.select_frame(step.frames[1].token.as_str()).unwrap() else {
            panic!("expected choice");
        };
        assert_eq!(types.len(), 2);
        let back = nav.back_to_frames(token.as_str()).unwrap();
        assert_eq!(back.frames.len(), 2);
    }

    #[test]
    fn wrong_stage_token_is_not_found() {
        let nav = navigator();
        let step = frames(nav.search_step("rio").unwrap());
        let err = nav.select_blade(step.frames[0].token.as_str()).unwrap_err();
        assert!(err.requires_restart());
        assert!(matches!(
            err,
            LookupError::NotFound(NotFound::Stage { expected: "blade", .. })
        ));
    }

    #[test]
    fn expired_token_is_not_found() {
        let err = navigator().select_vehicle("nope").unwrap_err();
        assert_eq!(err, LookupError::NotFound(NotFound::Token("nope".into())));
    }

    #[test]
    fn favorites_add_list_remove() {
        let nav = navigator();
        let step = frames(nav.search_step("rio").unwrap());
        assert!(nav.add_favorite(7, step.vehicle_token.as_str()).unwrap());
        assert!(!nav.add_favorite(7, step.vehicle_token.as_str()).unwrap());

        let page = nav.favorites_page(7, 0);
        assert_eq!(page.total, 1);
        let entry = &page.entries[0];
        assert_eq!(nav.select_vehicle(entry.open.as_str()).unwrap().vehicle.model, "RIO");

        let removed = nav.remove_favorite(7, entry.remove.as_str()).unwrap();
        assert_eq!(removed.map(|k| k.model), Some("RIO".to_string()));
        assert_eq!(nav.remove_favorite(7, entry.remove.as_str()).unwrap(), None);
    }
}
