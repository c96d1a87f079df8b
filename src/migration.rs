use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

/// Combined farming and gathering experience that qualifies a player on its own.
pub const MIGRATION_XP_THRESHOLD: f64 = 10_000.0;

/// Items that qualify a player regardless of experience.
pub const MIGRATION_PASS_ITEMS: [&str; 2] = ["Warrior", "Discord Mod"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub farming: f64,
    pub gathering: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProgress {
    pub skills: Skills,
    pub inventory: BTreeMap<String, f64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("You don't meet the requirements for migrating")]
pub struct IneligibleForMigration;

pub fn check_migration_eligibility(
    progress: &PlayerProgress,
) -> Result<(), IneligibleForMigration> {
    let experience = progress.skills.farming + progress.skills.gathering;
    let holds_pass = MIGRATION_PASS_ITEMS
        .iter()
        .any(|item| progress.inventory.get(*item).is_some_and(|count| *count >= 1.0));
    if experience >= MIGRATION_XP_THRESHOLD || holds_pass {
        Ok(())
    } else {
        Err(IneligibleForMigration)
    }
}
