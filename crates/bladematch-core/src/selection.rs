//! Selection state carried between interactions.
//!
//! Each stage of the narrowing flow has its own payload type, and every later
//! stage embeds the earlier one. A [`SessionPayload`] is what gets stored
//! behind a session token.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{SizePair, Vehicle, VehicleKey};

/// Windshield side for single-blade purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Driver,
    Passenger,
}

impl Side {
    pub const ALL: [Self; 2] = [Self::Driver, Self::Passenger];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Passenger => "passenger",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A vehicle plus the attributes the resolver narrows on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fitment {
    pub vehicle: VehicleKey,
    pub mount: String,
    pub sizes: SizePair,
}

impl Fitment {
    #[must_use]
    pub fn of(vehicle: &Vehicle) -> Self {
        Self {
            vehicle: vehicle.key(),
            mount: vehicle.mount.clone(),
            sizes: vehicle.sizes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSelection {
    pub fitment: Fitment,
    pub frame: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BladeSelection {
    pub frame: FrameSelection,
    pub blade_type: String,
}

impl BladeSelection {
    #[must_use]
    pub fn fitment(&self) -> &Fitment {
        &self.frame.fitment
    }
}

/// What a link request buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    Kit,
    Single(Side),
}

/// Snapshot stored behind a session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SessionPayload {
    Vehicle { vehicle: VehicleKey },
    Fitment(Fitment),
    Frame(FrameSelection),
    Blade(BladeSelection),
    /// A position in a user's favorites list. The key lets removal check the
    /// slot still holds the same vehicle.
    FavoriteSlot { index: usize, vehicle: VehicleKey },
}

impl SessionPayload {
    /// Stage name, used in diagnostics and stage-mismatch errors.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Vehicle { .. } => "vehicle",
            Self::Fitment(_) => "fitment",
            Self::Frame(_) => "frame",
            Self::Blade(_) => "blade",
            Self::FavoriteSlot { .. } => "favorite_slot",
        }
    }

    /// The vehicle every stage ultimately refers to.
    #[must_use]
    pub fn vehicle(&self) -> &VehicleKey {
        match self {
            Self::Vehicle { vehicle } | Self::FavoriteSlot { vehicle, .. } => vehicle,
            Self::Fitment(fitment) => &fitment.vehicle,
            Self::Frame(frame) => &frame.fitment.vehicle,
            Self::Blade(blade) => &blade.frame.fitment.vehicle,
        }
    }
}

impl From<VehicleKey> for SessionPayload {
    fn from(vehicle: VehicleKey) -> Self {
        Self::Vehicle { vehicle }
    }
}

impl From<Fitment> for SessionPayload {
    fn from(fitment: Fitment) -> Self {
        Self::Fitment(fitment)
    }
}

impl From<FrameSelection> for SessionPayload {
    fn from(frame: FrameSelection) -> Self {
        Self::Frame(frame)
    }
}

impl From<BladeSelection> for SessionPayload {
    fn from(blade: BladeSelection) -> Self {
        Self::Blade(blade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blade() -> BladeSelection {
        BladeSelection {
            frame: FrameSelection {
                fitment: Fitment {
                    vehicle: VehicleKey::new("KIA", "RIO", "2017-2020"),
                    mount: "hook".to_string(),
                    sizes: SizePair::new(Some(600), Some(400)),
                },
                frame: "F1".to_string(),
            },
            blade_type: "T1".to_string(),
        }
    }

    #[test]
    fn side_displays_lowercase() {
        assert_eq!(Side::Driver.to_string(), "driver");
        assert_eq!(Side::Passenger.to_string(), "passenger");
    }

    #[test]
    fn every_stage_exposes_its_vehicle() {
        let payload = SessionPayload::from(blade());
        assert_eq!(payload.stage(), "blade");
        assert_eq!(payload.vehicle().model, "RIO");

        let slot = SessionPayload::FavoriteSlot {
            index: 2,
            vehicle: VehicleKey::new("VW", "POLO", "2010-"),
        };
        assert_eq!(slot.stage(), "favorite_slot");
        assert_eq!(slot.vehicle().brand, "VW");
    }

    #[test]
    fn payload_is_tagged_by_stage() {
        let value = serde_json::to_value(SessionPayload::from(VehicleKey::new("KIA", "RIO", "2017"))).unwrap();
        assert_eq!(value["stage"], "vehicle");
        assert_eq!(value["vehicle"]["model"], "RIO");
    }
}
