//! Hierarchical fitment resolver.
//!
//! Narrows a vehicle down to purchase links:
//!
//! ```text
//! vehicle ─▶ mount + sizes ─▶ frames ─▶ blade types ─▶ kit | single(side) ─▶ links
//! ```
//!
//! "No such vehicle" (`NotFound`) and "vehicle exists but nothing fits"
//! (`NoCompatibleParts`) are kept apart so the caller can tell a stale
//! selection from an uncatalogued part.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{BladeType, LinkFit, Marketplace, PartsCatalog, SizePair, Vehicle, VehicleKey};
use crate::error::{LookupError, NoParts, NotFound};
use crate::selection::{BladeSelection, Fitment, LinkMode, Side};

/// Outcome of blade-type narrowing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "choice", content = "types", rename_all = "snake_case")]
pub enum TypeChoice {
    /// Exactly one type fits; the flow advances without asking.
    Auto(BladeType),
    /// Several types fit, in catalog order.
    Choose(Vec<BladeType>),
}

impl TypeChoice {
    #[must_use]
    pub fn types(&self) -> &[BladeType] {
        match self {
            Self::Auto(one) => std::slice::from_ref(one),
            Self::Choose(many) => many,
        }
    }
}

/// A validated marketplace URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLink {
    pub marketplace: Marketplace,
    pub url: String,
}

#[derive(Clone)]
pub struct Resolver {
    catalog: Arc<dyn PartsCatalog>,
}

impl Resolver {
    #[must_use]
    pub fn new(catalog: Arc<dyn PartsCatalog>) -> Self {
        Self { catalog }
    }

    /// First catalog row for a key.
    pub fn vehicle(&self, key: &VehicleKey) -> Result<&Vehicle, LookupError> {
        self.catalog
            .find_vehicle(key)
            .ok_or_else(|| NotFound::Vehicle(key.clone()).into())
    }

    /// Fitment of a catalogued vehicle.
    pub fn fitment(&self, key: &VehicleKey) -> Result<Fitment, LookupError> {
        self.vehicle(key).map(Fitment::of)
    }

    /// Frames for a mount whose size sets accept every declared size.
    #[must_use]
    pub fn frames_for(&self, mount: &str, sizes: SizePair) -> Vec<String> {
        let mut frames: Vec<String> = Vec::new();
        for rule in self.catalog.frame_rules(mount) {
            if sizes.fits(&rule.sizes) && !frames.contains(&rule.frame) {
                frames.push(rule.frame.clone());
            }
        }
        frames
    }

    /// Frames for a fitment, or `NoCompatibleParts` when none fit.
    pub fn resolve_frames(&self, fitment: &Fitment) -> Result<Vec<String>, LookupError> {
        let frames = self.frames_for(&fitment.mount, fitment.sizes);
        if frames.is_empty() {
            return Err(NoParts::Frames {
                mount: fitment.mount.clone(),
            }
            .into());
        }
        Ok(frames)
    }

    /// Blade types of `frame` admitted for this mount and sizes.
    pub fn types_for(
        &self,
        frame: &str,
        mount: &str,
        sizes: SizePair,
    ) -> Result<TypeChoice, LookupError> {
        let mut types: Vec<BladeType> = self
            .catalog
            .blade_types(frame)
            .iter()
            .filter(|t| t.admits(mount, sizes))
            .cloned()
            .collect();
        match types.len() {
            0 => Err(NoParts::Types {
                frame: frame.to_string(),
            }
            .into()),
            1 => Ok(TypeChoice::Auto(types.remove(0))),
            _ => Ok(TypeChoice::Choose(types)),
        }
    }

    /// The blade type row behind a selection, if it still exists.
    #[must_use]
    pub fn blade_type(&self, frame: &str, blade_type: &str) -> Option<&BladeType> {
        self.catalog
            .blade_types(frame)
            .iter()
            .find(|t| t.blade_type == blade_type)
    }

    /// Links for the driver + passenger pair. Empty unless both sides are
    /// declared and a kit row exists.
    #[must_use]
    pub fn kit_links(
        &self,
        frame: &str,
        blade_type: &str,
        mount: &str,
        sizes: SizePair,
    ) -> Vec<PurchaseLink> {
        match (sizes.driver, sizes.passenger) {
            (Some(driver), Some(passenger)) => {
                self.links_for(frame, blade_type, mount, LinkFit::Kit(driver, passenger))
            }
            _ => Vec::new(),
        }
    }

    /// Links for one side's blade.
    pub fn single_links(
        &self,
        frame: &str,
        blade_type: &str,
        mount: &str,
        sizes: SizePair,
        side: Side,
    ) -> Result<Vec<PurchaseLink>, LookupError> {
        let size = sizes.get(side).ok_or(NoParts::SideSize { side })?;
        Ok(self.links_for(frame, blade_type, mount, LinkFit::Single(size)))
    }

    /// Links for a blade selection in either mode.
    pub fn links(
        &self,
        blade: &BladeSelection,
        mode: LinkMode,
    ) -> Result<Vec<PurchaseLink>, LookupError> {
        let fitment = blade.fitment();
        let frame = &blade.frame.frame;
        match mode {
            LinkMode::Kit => Ok(self.kit_links(
                frame,
                &blade.blade_type,
                &fitment.mount,
                fitment.sizes,
            )),
            LinkMode::Single(side) => self.single_links(
                frame,
                &blade.blade_type,
                &fitment.mount,
                fitment.sizes,
                side,
            ),
        }
    }

    fn links_for(&self, frame: &str, blade_type: &str, mount: &str, fit: LinkFit) -> Vec<PurchaseLink> {
        let mut links: Vec<PurchaseLink> = Vec::new();
        for row in self.catalog.purchase_rows(frame, blade_type, mount) {
            if row.fit != fit {
                continue;
            }
            for (marketplace, raw) in row.urls() {
                if links.iter().any(|l| l.marketplace == marketplace) {
                    continue;
                }
                match validate_url(raw) {
                    Some(url) => links.push(PurchaseLink { marketplace, url }),
                    None => debug!(
                        frame,
                        blade_type,
                        %marketplace,
                        url = raw,
                        "Excluded malformed purchase link"
                    ),
                }
            }
        }
        links.sort_by_key(|l| l.marketplace);
        links
    }
}

/// Absolute http(s) URL with a host, or `None`.
#[must_use]
pub fn validate_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(trimmed).ok()?;
    let web = matches!(parsed.scheme(), "http" | "https");
    (web && parsed.host_str().is_some_and(|h| !h.is_empty())).then(|| parsed.to_string())
}
