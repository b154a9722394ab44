//! Progression derivation engine.
//!
//! Pure functions from raw ledger counters to the metrics the UI renders.
//! Nothing here touches the network or the cache; the same inputs always
//! produce the same outputs. Callers re-run [`derive`] after any state
//! change instead of persisting the results anywhere authoritative.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ExperienceRecord;

/// XP granted for one logged bake.
pub const XP_PER_BAKE: u64 = 25;

/// Garden growth stages, ordered. Keyed on streak length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GardenStage {
    Seed,
    Seedling,
    Sprout,
    Plant,
    Tree,
    Garden,
}

impl GardenStage {
    pub fn name(self) -> &'static str {
        match self {
            GardenStage::Seed => "Seed",
            GardenStage::Seedling => "Seedling",
            GardenStage::Sprout => "Sprout",
            GardenStage::Plant => "Plant",
            GardenStage::Tree => "Tree",
            GardenStage::Garden => "Garden",
        }
    }
}

/// Display metrics computed from an [`ExperienceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedProgression {
    pub level: u32,
    pub title: &'static str,
    pub garden_stage: GardenStage,
    pub next_garden_stage: Option<GardenStage>,
    pub percent_to_next_level: f64,
    pub percent_to_next_garden_stage: f64,
}

/// `level = max(1, floor(sqrt(xp / 100)))`.
pub fn level(xp: u64) -> u32 {
    let root = ((xp as f64) / 100.0).sqrt().floor() as u32;
    root.max(1)
}

/// Baker title for a level. Ranges are contiguous and non-overlapping.
pub fn title(level: u32) -> &'static str {
    match level {
        0..=2 => "Baker",
        3..=4 => "Skilled Baker",
        5..=6 => "Master Baker",
        7..=9 => "Pastry Chef",
        _ => "Legendary Baker",
    }
}

/// Garden stage from streak length. Monotonic non-decreasing in streak.
pub fn garden_stage(streak: u32) -> GardenStage {
    match streak {
        0 => GardenStage::Seed,
        1..=2 => GardenStage::Seedling,
        3..=6 => GardenStage::Sprout,
        7..=13 => GardenStage::Plant,
        14..=29 => GardenStage::Tree,
        _ => GardenStage::Garden,
    }
}

pub fn next_garden_stage(stage: GardenStage) -> Option<GardenStage> {
    match stage {
        GardenStage::Seed => Some(GardenStage::Seedling),
        GardenStage::Seedling => Some(GardenStage::Sprout),
        GardenStage::Sprout => Some(GardenStage::Plant),
        GardenStage::Plant => Some(GardenStage::Tree),
        GardenStage::Tree => Some(GardenStage::Garden),
        GardenStage::Garden => None,
    }
}

/// XP threshold at which a level begins: `level^2 * 100`.
pub fn xp_for_level(level: u32) -> u64 {
    (level as u64) * (level as u64) * 100
}

/// Progress through the current level band, clamped to [0, 100].
pub fn percent_to_next_level(xp: u64) -> f64 {
    let current = level(xp);
    // The clamped level-1 band starts at 0 XP, not at the 100-XP threshold.
    let floor = if current == 1 { 0 } else { xp_for_level(current) };
    let ceiling = xp_for_level(current + 1);
    let progress = xp.saturating_sub(floor) as f64;
    let width = (ceiling - floor) as f64;
    ((progress / width) * 100.0).clamp(0.0, 100.0)
}

/// Progress through the current garden-stage band, clamped to [0, 100].
pub fn percent_to_next_garden_stage(streak: u32, stage: GardenStage) -> f64 {
    let (start, width) = match stage {
        GardenStage::Seed => (0, 1),
        GardenStage::Seedling => (1, 2),
        GardenStage::Sprout => (3, 4),
        GardenStage::Plant => (7, 7),
        GardenStage::Tree => (14, 16),
        GardenStage::Garden => return 100.0,
    };
    let progress = streak.saturating_sub(start) as f64;
    ((progress / width as f64) * 100.0).clamp(0.0, 100.0)
}

/// True iff the last bake falls on the same UTC calendar date as `now`.
pub fn has_baked_today(last_bake_timestamp: Option<i64>, now: DateTime<Utc>) -> bool {
    match last_bake_timestamp.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
        Some(last) => {
            last.year() == now.year() && last.month() == now.month() && last.day() == now.day()
        }
        None => false,
    }
}

/// Time remaining until the next bake is allowed to count: zero when no
/// bake was logged today, otherwise the gap to the next UTC midnight.
pub fn time_until_next_bake(last_bake_timestamp: Option<i64>, now: DateTime<Utc>) -> Duration {
    if !has_baked_today(last_bake_timestamp, now) {
        return Duration::zero();
    }
    let next_midnight = (now + Duration::days(1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt));
    match next_midnight {
        Some(midnight) => midnight - now,
        None => Duration::zero(),
    }
}

/// Derive the full display metric set from a ledger record.
pub fn derive(record: &ExperienceRecord) -> DerivedProgression {
    let level = level(record.xp);
    let stage = garden_stage(record.streak);
    DerivedProgression {
        level,
        title: title(level),
        garden_stage: stage,
        next_garden_stage: next_garden_stage(stage),
        percent_to_next_level: percent_to_next_level(record.xp),
        percent_to_next_garden_stage: percent_to_next_garden_stage(record.streak, stage),
    }
}
