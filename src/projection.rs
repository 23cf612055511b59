//! Presentation-ready aggregates derived from the current hotspot set.
//!
//! Nothing here mutates the canonical state; every function reads a slice and
//! returns a view or a count.

use crate::models::Hotspot;

/// Maximum number of entries in the ranked list.
pub const TOP_N: usize = 5;

/// Confidence bucket used for colors, the legend and the stats bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Buckets are inclusive on their lower bound: 80 is High, 50 is Medium.
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80..=u8::MAX => RiskLevel::High,
            50..=79 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn of(hotspot: &Hotspot) -> Self {
        Self::from_confidence(hotspot.confidence)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskCounts {
    /// Partitions the full hotspot set, not just the ranked subset.
    pub fn tally(hotspots: &[Hotspot]) -> Self {
        hotspots.iter().fold(Self::default(), |mut acc, h| {
            match RiskLevel::of(h) {
                RiskLevel::High => acc.high += 1,
                RiskLevel::Medium => acc.medium += 1,
                RiskLevel::Low => acc.low += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// The ranked subset to store for a result: the server's ranking when it sent
/// one, otherwise the hotspots in the order received. Never re-sorted.
pub fn select_top_ranked(hotspots: &[Hotspot], server_ranked: Option<Vec<Hotspot>>) -> Vec<Hotspot> {
    let mut ranked = server_ranked.unwrap_or_else(|| hotspots.to_vec());
    ranked.truncate(TOP_N);
    ranked
}

/// What the list view renders: at most [`TOP_N`] from `top_ranked`, falling
/// back to `hotspots` when there is no ranking at all.
pub fn list_view<'a>(top_ranked: &'a [Hotspot], hotspots: &'a [Hotspot]) -> &'a [Hotspot] {
    let source = if top_ranked.is_empty() { hotspots } else { top_ranked };
    &source[..source.len().min(TOP_N)]
}
