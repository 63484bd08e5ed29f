//! Tier to cell-size configuration.

use crate::descriptor::{MAX_TIER, MIN_TIER};
use serde::{Deserialize, Serialize};

/// Source of the physical edge length of one cell for a tier.
///
/// The host owns this table; grids only read it when they are created.
pub trait CellSizeLookup {
    /// Edge length in metres, or `None` if the tier is not configured.
    fn cell_size(&self, tier: u8) -> Option<f32>;
}

/// Cell edge lengths indexed by tier, starting at tier 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    /// `cell_sizes[0]` is tier 1.
    pub cell_sizes: Vec<f32>,
}

impl Default for TierTable {
    /// 5 cm cells at tier 1, doubling per tier up to tier 6.
    fn default() -> Self {
        let count = usize::from(MAX_TIER - MIN_TIER + 1);
        Self {
            cell_sizes: (0..count).map(|i| 0.05 * (1u32 << i) as f32).collect(),
        }
    }
}

impl TierTable {
    pub fn new(cell_sizes: Vec<f32>) -> Self {
        Self { cell_sizes }
    }
}

impl CellSizeLookup for TierTable {
    fn cell_size(&self, tier: u8) -> Option<f32> {
        let index = tier.checked_sub(MIN_TIER)?;
        self.cell_sizes
            .get(usize::from(index))
            .copied()
            .filter(|size| *size > 0.0)
    }
}

impl<F> CellSizeLookup for F
where
    F: Fn(u8) -> Option<f32>,
{
    fn cell_size(&self, tier: u8) -> Option<f32> {
        self(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_tier() {
        let table = TierTable::default();
        for tier in MIN_TIER..=MAX_TIER {
            assert!(table.cell_size(tier).is_some(), "tier {tier} missing");
        }
        assert_eq!(table.cell_size(1), Some(0.05));
        assert_eq!(table.cell_size(2), Some(0.1));
        assert_eq!(table.cell_size(0), None);
        assert_eq!(table.cell_size(MAX_TIER + 1), None);
    }

    #[test]
    fn table_loads_from_json() {
        let table: TierTable = serde_json::from_str(r#"{"cell_sizes":[0.25,0.5]}"#).unwrap();
        assert_eq!(table.cell_size(2), Some(0.5));
        assert_eq!(table.cell_size(3), None);
    }
}
