//! Milestone rule catalog.
//!
//! A fixed, declarative table of the eight milestone definitions and their
//! qualifying rules. `qualifies` is a client-side preview only; the
//! milestone ledger re-validates eligibility itself before minting.

use serde::{Deserialize, Serialize};

/// Combined stats a qualifying rule may inspect.
///
/// Pod-side facts live on a different ledger than the experience counters,
/// so they are optional: a rule that needs one is simply not evaluable
/// from an experience snapshot alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub xp: u64,
    pub streak: u32,
    pub total_bakes: u64,
    pub level: u32,
    pub pods_created: Option<u32>,
    pub pods_joined: Option<u32>,
}

/// A qualifying rule over a [`StatSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    TotalBakesAtLeast(u64),
    StreakAtLeast(u32),
    XpAtLeast(u64),
    LevelAtLeast(u32),
    PodsCreatedAtLeast(u32),
    PodsJoinedAtLeast(u32),
}

impl Requirement {
    /// Evaluate against a snapshot. `None` means the rule is not evaluable
    /// client-side because the pod-side fact is missing.
    pub fn evaluate(&self, stats: &StatSnapshot) -> Option<bool> {
        match *self {
            Requirement::TotalBakesAtLeast(n) => Some(stats.total_bakes >= n),
            Requirement::StreakAtLeast(n) => Some(stats.streak >= n),
            Requirement::XpAtLeast(n) => Some(stats.xp >= n),
            Requirement::LevelAtLeast(n) => Some(stats.level >= n),
            Requirement::PodsCreatedAtLeast(n) => stats.pods_created.map(|c| c >= n),
            Requirement::PodsJoinedAtLeast(n) => stats.pods_joined.map(|j| j >= n),
        }
    }
}

/// Grouping used by the milestones page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneCategory {
    Streak,
    Xp,
    Social,
    Achievement,
}

#[derive(Debug, Clone)]
pub struct MilestoneDefinition {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
    pub reward_xp: u64,
    pub category: MilestoneCategory,
}

static DEFINITIONS: &[MilestoneDefinition] = &[
    MilestoneDefinition {
        id: 1,
        name: "First Bake",
        description: "Complete your first baking session",
        requirement: Requirement::TotalBakesAtLeast(1),
        reward_xp: 100,
        category: MilestoneCategory::Achievement,
    },
    MilestoneDefinition {
        id: 2,
        name: "Week Warrior",
        description: "Maintain a 7-day baking streak",
        requirement: Requirement::StreakAtLeast(7),
        reward_xp: 500,
        category: MilestoneCategory::Streak,
    },
    MilestoneDefinition {
        id: 3,
        name: "XP Hunter",
        description: "Accumulate 200 XP",
        requirement: Requirement::XpAtLeast(200),
        reward_xp: 200,
        category: MilestoneCategory::Xp,
    },
    MilestoneDefinition {
        id: 4,
        name: "Pod Creator",
        description: "Create your first baking pod",
        requirement: Requirement::PodsCreatedAtLeast(1),
        reward_xp: 300,
        category: MilestoneCategory::Social,
    },
    MilestoneDefinition {
        id: 5,
        name: "Social Baker",
        description: "Join 3 different baking pods",
        requirement: Requirement::PodsJoinedAtLeast(3),
        reward_xp: 400,
        category: MilestoneCategory::Social,
    },
    MilestoneDefinition {
        id: 6,
        name: "Century Club",
        description: "Complete 100 baking sessions",
        requirement: Requirement::TotalBakesAtLeast(100),
        reward_xp: 1000,
        category: MilestoneCategory::Achievement,
    },
    MilestoneDefinition {
        id: 7,
        name: "Level Master",
        description: "Reach level 10",
        requirement: Requirement::LevelAtLeast(10),
        reward_xp: 750,
        category: MilestoneCategory::Xp,
    },
    MilestoneDefinition {
        id: 8,
        name: "Streak Legend",
        description: "Maintain a 30-day baking streak",
        requirement: Requirement::StreakAtLeast(30),
        reward_xp: 1500,
        category: MilestoneCategory::Streak,
    },
];

pub fn all() -> &'static [MilestoneDefinition] {
    DEFINITIONS
}

pub fn definition(id: u32) -> Option<&'static MilestoneDefinition> {
    DEFINITIONS.iter().find(|d| d.id == id)
}

pub fn by_category(category: MilestoneCategory) -> Vec<&'static MilestoneDefinition> {
    DEFINITIONS.iter().filter(|d| d.category == category).collect()
}

/// Preview check: does the snapshot qualify for this definition?
///
/// Not-evaluable rules count as not qualified; the ledger is the authority.
pub fn qualifies(definition: &MilestoneDefinition, stats: &StatSnapshot) -> bool {
    definition.requirement.evaluate(stats).unwrap_or(false)
}

/// Definition ids the snapshot qualifies for.
pub fn qualifying_ids(stats: &StatSnapshot) -> Vec<u32> {
    DEFINITIONS
        .iter()
        .filter(|d| qualifies(d, stats))
        .map(|d| d.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(xp: u64, streak: u32, total_bakes: u64) -> StatSnapshot {
        StatSnapshot {
            xp,
            streak,
            total_bakes,
            level: crate::progression::level(xp),
            pods_created: None,
            pods_joined: None,
        }
    }

    #[test]
    fn catalog_has_eight_unique_definitions() {
        assert_eq!(all().len(), 8);
        let mut ids: Vec<u32> = all().iter().map(|d| d.id).collect();
        ids.dedup();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn first_bake_qualifies_after_one_session() {
        let def = definition(1).unwrap();
        assert!(!qualifies(def, &snapshot(0, 0, 0)));
        assert!(qualifies(def, &snapshot(25, 1, 1)));
    }

    #[test]
    fn experience_rules_track_thresholds() {
        assert!(qualifies(definition(2).unwrap(), &snapshot(0, 7, 10)));
        assert!(!qualifies(definition(2).unwrap(), &snapshot(0, 6, 10)));
        assert!(qualifies(definition(3).unwrap(), &snapshot(200, 0, 0)));
        assert!(qualifies(definition(6).unwrap(), &snapshot(0, 0, 100)));
        assert!(qualifies(definition(7).unwrap(), &snapshot(10_000, 0, 0)));
        assert!(qualifies(definition(8).unwrap(), &snapshot(0, 30, 0)));
    }

    #[test]
    fn pod_rules_are_not_evaluable_without_pod_facts() {
        let creator = definition(4).unwrap();
        let social = definition(5).unwrap();

        let blind = snapshot(1000, 10, 50);
        assert_eq!(creator.requirement.evaluate(&blind), None);
        assert!(!qualifies(creator, &blind));

        let sighted = StatSnapshot {
            pods_created: Some(1),
            pods_joined: Some(3),
            ..blind
        };
        assert_eq!(creator.requirement.evaluate(&sighted), Some(true));
        assert!(qualifies(social, &sighted));
    }

    #[test]
    fn qualifying_ids_for_a_fresh_first_bake() {
        // Scenario: one bake worth 25 XP just landed.
        let ids = qualifying_ids(&snapshot(25, 1, 1));
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn categories_partition_the_catalog() {
        let total: usize = [
            MilestoneCategory::Streak,
            MilestoneCategory::Xp,
            MilestoneCategory::Social,
            MilestoneCategory::Achievement,
        ]
        .iter()
        .map(|c| by_category(*c).len())
        .sum();
        assert_eq!(total, all().len());
    }
}
