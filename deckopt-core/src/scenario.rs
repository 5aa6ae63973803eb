//! Battle scenario parameters and their query-string encoding.

use serde::{Deserialize, Serialize};

use crate::codec::Deck;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleMode {
    /// Siege battle against a defensive tower.
    #[default]
    Tower,
    /// Plain deck-versus-deck battle.
    Arena,
}

/// Scenario parameters, constant across one optimizer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub battle_mode: BattleMode,
    pub sims: u32,
    pub mission_level: u32,
    pub raid_level: u32,
    pub tower_level: u32,
    pub tower_type: u32,
    /// Battleground effect hash passed through as `bges`.
    pub battleground_effects: String,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            battle_mode: BattleMode::Tower,
            sims: 100_000,
            mission_level: 7,
            raid_level: 25,
            tower_level: 18,
            tower_type: 506,
            battleground_effects: "9C!C".to_string(),
        }
    }
}

impl Scenario {
    #[must_use]
    pub fn with_battle_mode(mut self, battle_mode: BattleMode) -> Self {
        self.battle_mode = battle_mode;
        self
    }

    #[must_use]
    pub fn with_sims(mut self, sims: u32) -> Self {
        self.sims = sims.max(1);
        self
    }

    /// Load a scenario from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Encode one simulation request as the simulator's query string.
    ///
    /// Deck hashes are passed through verbatim; the simulator's hash alphabet
    /// is URL-safe.
    #[must_use]
    pub fn query(&self, attack: &Deck, defense: &Deck) -> String {
        let mut query = format!(
            "deck1={attack}&deck2={defense}&mission_level={}&raid_level={}",
            self.mission_level, self.raid_level
        );
        if self.battle_mode == BattleMode::Tower {
            query.push_str(&format!(
                "&siege&tower_level={}&tower_type={}",
                self.tower_level, self.tower_type
            ));
        }
        query.push_str(&format!(
            "&bges={}&sims={}&autostart",
            self.battleground_effects,
            self.sims.max(1)
        ));
        query
    }

    /// Full simulator URL for one request.
    #[must_use]
    pub fn url(&self, sim_url: &str, attack: &Deck, defense: &Deck) -> String {
        format!("{sim_url}?{}", self.query(attack, defense))
    }
}
