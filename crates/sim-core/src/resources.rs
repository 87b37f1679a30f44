//! Resource kinds, the per-resource ledger and cost bundles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// The three resources produced by the administrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Raw case files, the base resource produced by taps.
    Dossiers,
    /// Stamps, spent on most mid-game purchases.
    Tampons,
    /// Forms; the only resource subject to the storage cap.
    Formulaires,
}

impl ResourceKind {
    /// All kinds in ledger order.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Dossiers,
        ResourceKind::Tampons,
        ResourceKind::Formulaires,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Dossiers => "dossiers",
            ResourceKind::Tampons => "tampons",
            ResourceKind::Formulaires => "formulaires",
        }
    }
}

/// A cost or output bundle. Only the named resources matter; entries are
/// independent of each other.
pub type ResourceBundle = BTreeMap<ResourceKind, f64>;

/// Build a bundle from `(kind, amount)` pairs.
pub fn bundle(entries: &[(ResourceKind, f64)]) -> ResourceBundle {
    entries.iter().copied().collect()
}

/// Quantities of every resource. Used for stock, production rates and
/// milestone bookkeeping alike.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Dossiers held (or produced per second).
    pub dossiers: f64,
    /// Tampons held (or produced per second).
    pub tampons: f64,
    /// Formulaires held (or produced per second).
    pub formulaires: f64,
}

impl ResourceSet {
    /// All counters at zero.
    pub const ZERO: ResourceSet = ResourceSet {
        dossiers: 0.0,
        tampons: 0.0,
        formulaires: 0.0,
    };

    /// Every counter set to `value`.
    pub fn splat(value: f64) -> Self {
        Self {
            dossiers: value,
            tampons: value,
            formulaires: value,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Dossiers => self.dossiers,
            ResourceKind::Tampons => self.tampons,
            ResourceKind::Formulaires => self.formulaires,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Dossiers => &mut self.dossiers,
            ResourceKind::Tampons => &mut self.tampons,
            ResourceKind::Formulaires => &mut self.formulaires,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, value: f64) {
        *self.get_mut(kind) = value;
    }

    /// Multiply every counter by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            dossiers: self.dossiers * factor,
            tampons: self.tampons * factor,
            formulaires: self.formulaires * factor,
        }
    }

    /// Sum of all counters.
    pub fn total(&self) -> f64 {
        self.dossiers + self.tampons + self.formulaires
    }

    /// True when every counter is finite and non-negative.
    pub fn is_valid_ledger(&self) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|k| self.get(*k).is_finite() && self.get(*k) >= 0.0)
    }
}

impl Add for ResourceSet {
    type Output = ResourceSet;

    fn add(self, rhs: ResourceSet) -> ResourceSet {
        ResourceSet {
            dossiers: self.dossiers + rhs.dossiers,
            tampons: self.tampons + rhs.tampons,
            formulaires: self.formulaires + rhs.formulaires,
        }
    }
}

impl AddAssign for ResourceSet {
    fn add_assign(&mut self, rhs: ResourceSet) {
        *self = *self + rhs;
    }
}
