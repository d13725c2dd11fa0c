//! Health classification.

use serde::{Deserialize, Serialize};

/// Health status for a source.
///
/// Ordered by severity: `Healthy < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
}

impl Health {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Health::Healthy => "OK",
            Health::Warning => "WARN",
            Health::Critical => "CRIT",
        }
    }

    /// Lowercase label, as used in the JSON API.
    pub fn label(&self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Critical => "critical",
        }
    }
}

/// The three usage percentages that drive classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsagePercents {
    pub cpu: f64,
    pub ram: f64,
    pub storage: f64,
}

impl UsagePercents {
    pub fn new(cpu: f64, ram: f64, storage: f64) -> Self {
        Self { cpu, ram, storage }
    }

    /// The highest of the three percentages. NaN entries are ignored.
    pub fn worst(&self) -> f64 {
        self.cpu.max(self.ram).max(self.storage)
    }
}

/// Thresholds for health classification.
///
/// Both bounds are exclusive: a usage of exactly `warning` is still healthy,
/// and exactly `critical` is still a warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Usage percentage above which a source is in warning state.
    pub warning: f64,
    /// Usage percentage above which a source is critical.
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 75.0,
            critical: 90.0,
        }
    }
}

impl Thresholds {
    /// Classify a set of usage percentages.
    pub fn classify(&self, usage: UsagePercents) -> Health {
        let worst = usage.worst();
        if worst > self.critical {
            Health::Critical
        } else if worst > self.warning {
            Health::Warning
        } else {
            Health::Healthy
        }
    }
}

/// Classify usage percentages against the default 75% / 90% thresholds.
pub fn classify(usage: UsagePercents) -> Health {
    Thresholds::default().classify(usage)
}
