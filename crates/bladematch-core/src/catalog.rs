//! Read-only parts catalog.
//!
//! Four tables drive fitment resolution:
//!
//! ```text
//! vehicles     brand, model, years → mount, driver/passenger blade size
//! frames       mount + accepted sizes → frame
//! blade_types  frame → blade type (+ description, optional restrictions)
//! links        frame + blade type + mount + fit → marketplace URLs
//! ```
//!
//! [`Catalog`] is built once from a [`CatalogSnapshot`], indexed, and never
//! mutated afterwards, so it can be shared across threads behind an `Arc`.
//! The resolver only talks to the [`PartsCatalog`] trait.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::CatalogError;
use crate::selection::Side;

// =============================================================================
// Rows
// =============================================================================

/// Identity of a vehicle as the user sees it.
///
/// Not unique in the catalog: trim variants share a key. Resolution always
/// picks the first catalog row for a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleKey {
    pub brand: String,
    pub model: String,
    pub years: String,
}

impl VehicleKey {
    #[must_use]
    pub fn new(brand: impl Into<String>, model: impl Into<String>, years: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            years: years.into(),
        }
    }
}

impl fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.brand, self.model, self.years)
    }
}

/// Declared blade sizes in millimeters. `None` means the side is not
/// declared for this vehicle (e.g. single-wiper cars).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizePair {
    pub driver: Option<u32>,
    pub passenger: Option<u32>,
}

impl SizePair {
    #[must_use]
    pub fn new(driver: Option<u32>, passenger: Option<u32>) -> Self {
        Self { driver, passenger }
    }

    #[must_use]
    pub fn get(&self, side: Side) -> Option<u32> {
        match side {
            Side::Driver => self.driver,
            Side::Passenger => self.passenger,
        }
    }

    /// Declared sizes only, driver first.
    pub fn declared(&self) -> impl Iterator<Item = u32> {
        self.driver.into_iter().chain(self.passenger)
    }

    /// True when every declared size is in `accepted`.
    ///
    /// An undeclared side never disqualifies.
    #[must_use]
    pub fn fits(&self, accepted: &BTreeSet<u32>) -> bool {
        self.declared().all(|size| accepted.contains(&size))
    }
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub brand: String,
    pub model: String,
    pub years: String,
    pub mount: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub driver: Option<u32>,
    #[serde(default, alias = "passanger", deserialize_with = "deserialize_size")]
    pub passenger: Option<u32>,
}

impl Vehicle {
    #[must_use]
    pub fn key(&self) -> VehicleKey {
        VehicleKey::new(&self.brand, &self.model, &self.years)
    }

    #[must_use]
    pub fn sizes(&self) -> SizePair {
        SizePair::new(self.driver, self.passenger)
    }

    fn matches_key(&self, key: &VehicleKey) -> bool {
        self.brand == key.brand && self.model == key.model && self.years == key.years
    }
}

/// Source spreadsheets carry sizes as numbers, digit strings, or junk like
/// "-"; anything that is not a positive integer is an undeclared side.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Number(u32),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawSize>::deserialize(deserializer)? {
        Some(RawSize::Number(n)) => Some(n),
        Some(RawSize::Text(s)) => s.trim().parse::<u32>().ok(),
        Some(RawSize::Other(_)) | None => None,
    }
    .filter(|n| *n > 0))
}

/// Frame (housing) compatibility: a mount type and the blade sizes the frame
/// is produced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRule {
    pub mount: String,
    pub frame: String,
    #[serde(default)]
    pub sizes: BTreeSet<u32>,
}

/// A blade type offered for a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BladeType {
    pub frame: String,
    pub blade_type: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Mounts this type is restricted to; empty means any mount of the frame.
    #[serde(default)]
    pub mounts: Vec<String>,
    /// Sizes this type is restricted to; empty means any size of the frame.
    #[serde(default)]
    pub sizes: BTreeSet<u32>,
}

impl BladeType {
    /// Whether the optional restrictions admit this mount and size pair.
    #[must_use]
    pub fn admits(&self, mount: &str, sizes: SizePair) -> bool {
        let mount_ok = self.mounts.is_empty() || self.mounts.iter().any(|m| m == mount);
        let sizes_ok = self.sizes.is_empty() || sizes.fits(&self.sizes);
        mount_ok && sizes_ok
    }
}

/// What a purchase link sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkFit {
    /// Driver + passenger pair sold together.
    Kit(u32, u32),
    /// One blade of the given size.
    Single(u32),
}

/// Storefronts a purchase row can point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Ozon,
    Wildberries,
}

impl Marketplace {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ozon => "ozon",
            Self::Wildberries => "wildberries",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw purchase row. URLs are unvalidated; see [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub frame: String,
    pub blade_type: String,
    pub mount: String,
    pub fit: LinkFit,
    #[serde(default)]
    pub ozon: Option<String>,
    #[serde(default)]
    pub wildberries: Option<String>,
}

impl PurchaseRow {
    /// Raw URLs in storefront order.
    pub fn urls(&self) -> impl Iterator<Item = (Marketplace, &str)> {
        [
            (Marketplace::Ozon, self.ozon.as_deref()),
            (Marketplace::Wildberries, self.wildberries.as_deref()),
        ]
        .into_iter()
        .filter_map(|(market, url)| url.map(|u| (market, u)))
    }
}

// =============================================================================
// Query surface
// =============================================================================

/// Read-only query surface the search engine and resolver consume.
pub trait PartsCatalog: Send + Sync {
    /// All vehicle rows in catalog order.
    fn vehicles(&self) -> &[Vehicle];

    /// First row for a key.
    fn find_vehicle(&self, key: &VehicleKey) -> Option<&Vehicle> {
        self.vehicles().iter().find(|v| v.matches_key(key))
    }

    /// Rows whose brand equals `brand`, ignoring case, in catalog order.
    fn brand_rows(&self, brand: &str) -> Vec<&Vehicle> {
        let wanted = brand.trim().to_lowercase();
        self.vehicles()
            .iter()
            .filter(|v| v.brand.to_lowercase() == wanted)
            .collect()
    }

    /// Frame rules registered for a mount type.
    fn frame_rules(&self, mount: &str) -> &[FrameRule];

    /// Blade types registered for a frame.
    fn blade_types(&self, frame: &str) -> &[BladeType];

    /// Purchase rows for a frame/type/mount triple.
    fn purchase_rows(&self, frame: &str, blade_type: &str, mount: &str) -> &[PurchaseRow];
}

// =============================================================================
// Snapshot + indexed catalog
// =============================================================================

/// On-disk form of the catalog (JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub frames: Vec<FrameRule>,
    pub blade_types: Vec<BladeType>,
    pub links: Vec<PurchaseRow>,
}

type LinkIndexKey = (String, String, String);

/// In-memory catalog with lookup indices.
#[derive(Debug, Default)]
pub struct Catalog {
    vehicles: Vec<Vehicle>,
    first_by_key: HashMap<VehicleKey, usize>,
    rows_by_brand: HashMap<String, Vec<usize>>,
    frames_by_mount: HashMap<String, Vec<FrameRule>>,
    types_by_frame: HashMap<String, Vec<BladeType>>,
    links_by_triple: HashMap<LinkIndexKey, Vec<PurchaseRow>>,
}

impl Catalog {
    /// Load and index a JSON snapshot.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: CatalogSnapshot =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let catalog = Self::from_snapshot(snapshot)?;
        info!(
            path = %path.display(),
            vehicles = catalog.vehicles.len(),
            brands = catalog.rows_by_brand.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Validate and index a snapshot.
    ///
    /// Frame rules sharing a (mount, frame) pair are merged: their accepted
    /// size sets are unioned and the first occurrence fixes the order.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, CatalogError> {
        let CatalogSnapshot {
            vehicles,
            frames,
            blade_types,
            links,
        } = snapshot;

        let mut first_by_key = HashMap::new();
        let mut rows_by_brand: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, vehicle) in vehicles.iter().enumerate() {
            require("vehicles", idx, "brand", &vehicle.brand)?;
            require("vehicles", idx, "model", &vehicle.model)?;
            first_by_key.entry(vehicle.key()).or_insert(idx);
            rows_by_brand
                .entry(vehicle.brand.trim().to_lowercase())
                .or_default()
                .push(idx);
        }

        let mut frames_by_mount: HashMap<String, Vec<FrameRule>> = HashMap::new();
        for (idx, rule) in frames.into_iter().enumerate() {
            require("frames", idx, "mount", &rule.mount)?;
            require("frames", idx, "frame", &rule.frame)?;
            let rules = frames_by_mount.entry(rule.mount.clone()).or_default();
            match rules.iter_mut().find(|r| r.frame == rule.frame) {
                Some(existing) => existing.sizes.extend(rule.sizes),
                None => rules.push(rule),
            }
        }

        let mut types_by_frame: HashMap<String, Vec<BladeType>> = HashMap::new();
        for (idx, blade) in blade_types.into_iter().enumerate() {
            require("blade_types", idx, "frame", &blade.frame)?;
            require("blade_types", idx, "blade_type", &blade.blade_type)?;
            let types = types_by_frame.entry(blade.frame.clone()).or_default();
            if !types.iter().any(|t| t.blade_type == blade.blade_type) {
                types.push(blade);
            }
        }

        let mut links_by_triple: HashMap<LinkIndexKey, Vec<PurchaseRow>> = HashMap::new();
        for (idx, row) in links.into_iter().enumerate() {
            require("links", idx, "frame", &row.frame)?;
            require("links", idx, "blade_type", &row.blade_type)?;
            require("links", idx, "mount", &row.mount)?;
            links_by_triple
                .entry((row.frame.clone(), row.blade_type.clone(), row.mount.clone()))
                .or_default()
                .push(row);
        }

        Ok(Self {
            vehicles,
            first_by_key,
            rows_by_brand,
            frames_by_mount,
            types_by_frame,
            links_by_triple,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

fn require(table: &'static str, row: usize, field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidRow {
            table,
            row,
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

impl PartsCatalog for Catalog {
    fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    fn find_vehicle(&self, key: &VehicleKey) -> Option<&Vehicle> {
        self.first_by_key.get(key).map(|&idx| &self.vehicles[idx])
    }

    fn brand_rows(&self, brand: &str) -> Vec<&Vehicle> {
        self.rows_by_brand
            .get(&brand.trim().to_lowercase())
            .map(|rows| rows.iter().map(|&idx| &self.vehicles[idx]).collect())
            .unwrap_or_default()
    }

    fn frame_rules(&self, mount: &str) -> &[FrameRule] {
        self.frames_by_mount.get(mount).map_or(&[][..], Vec::as_slice)
    }

    fn blade_types(&self, frame: &str) -> &[BladeType] {
        self.types_by_frame.get(frame).map_or(&[][..], Vec::as_slice)
    }

    fn purchase_rows(&self, frame: &str, blade_type: &str, mount: &str) -> &[PurchaseRow] {
        self.links_by_triple
            .get(&(frame.to_string(), blade_type.to_string(), mount.to_string()))
            .map_or(&[][..], Vec::as_slice)
    }
}
