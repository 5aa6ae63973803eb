//! Leave-one-out deck optimization.
//!
//! A run derives one mutated deck per distinct component, measures the
//! baseline and every candidate against the full opponent set, and reports
//! each candidate's mean win rate. Ranking is left to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::client::PageContext;
use crate::codec::{Deck, DeckLayout, Token};
use crate::naming::{ComponentName, NameResolver};
use crate::outcome::{Averaging, SimRecord, WinRateSummary};
use crate::runner::{Runner, cross_pairs};
use crate::scenario::Scenario;

/// How candidates are derived from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Remove each distinct card.
    #[default]
    CardOptimize,
    /// Swap the hero for each substitute.
    HeroOptimize,
    /// Append each substitute card.
    ReplacementEvaluate,
}

/// Which side of the battle the baseline plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Offence,
    #[default]
    Defence,
}

impl Direction {
    /// Preference the original optimizer applied. The simulator always
    /// reports the attacker's win rate, so a defence deck wants it low.
    #[must_use]
    pub const fn default_preference(self) -> Preference {
        match self {
            Self::Offence => Preference::Highest,
            Self::Defence => Preference::Lowest,
        }
    }

    /// Deck on the direction's side of a record.
    #[must_use]
    pub fn side(self, record: &SimRecord) -> &Deck {
        match self {
            Self::Offence => &record.attack,
            Self::Defence => &record.defense,
        }
    }

    fn pairs(self, own: &[Deck], opponents: &[Deck]) -> Vec<(Deck, Deck)> {
        match self {
            Self::Offence => cross_pairs(own, opponents),
            Self::Defence => cross_pairs(opponents, own),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Lowest,
    Highest,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptimizeError {
    #[error("baseline deck hash is empty")]
    EmptyBaseline,
    #[error("at least one opponent deck hash is required")]
    NoOpponents,
    #[error("{mode:?} needs at least one substitute token")]
    NoSubstitutes { mode: Mode },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub baseline: Deck,
    pub opponents: Vec<Deck>,
    pub mode: Mode,
    pub direction: Direction,
    /// Hero tokens for `HeroOptimize`, card tokens for `ReplacementEvaluate`.
    #[serde(default)]
    pub substitutes: Vec<Token>,
}

impl OptimizeRequest {
    #[must_use]
    pub fn new(baseline: impl Into<Deck>, opponents: Vec<Deck>) -> Self {
        Self {
            baseline: baseline.into(),
            opponents,
            mode: Mode::CardOptimize,
            direction: Direction::Defence,
            substitutes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_substitutes(mut self, substitutes: Vec<Token>) -> Self {
        self.substitutes = substitutes;
        self
    }

    /// Reject inputs the engine cannot meaningfully run.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.baseline.as_str().trim().is_empty() {
            return Err(OptimizeError::EmptyBaseline);
        }
        if self.opponents.iter().all(|deck| deck.as_str().trim().is_empty()) {
            return Err(OptimizeError::NoOpponents);
        }
        if self.mode != Mode::CardOptimize && self.substitutes.iter().all(Token::is_empty) {
            return Err(OptimizeError::NoSubstitutes { mode: self.mode });
        }
        Ok(())
    }
}

/// One mutated deck and the component that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub component: Token,
    pub deck: Deck,
}

/// Build the candidate set, one entry per distinct token in first-seen order.
#[must_use]
pub fn derive_candidates(
    baseline: &Deck,
    mode: Mode,
    substitutes: &[Token],
    layout: DeckLayout,
) -> Vec<Candidate> {
    match mode {
        Mode::CardOptimize => {
            let slots = baseline.slots(layout);
            let mut seen: HashSet<&Token> = HashSet::new();
            let mut candidates = Vec::with_capacity(slots.len());
            for slot in &slots {
                if !seen.insert(&slot.token) {
                    continue;
                }
                candidates.push(Candidate {
                    component: slot.token.clone(),
                    deck: baseline.remove_slot(slot),
                });
            }
            candidates
        }
        Mode::HeroOptimize => {
            let current = baseline.header(layout);
            let mut seen: HashSet<&Token> = HashSet::new();
            substitutes
                .iter()
                .filter(|hero| !hero.is_empty() && current.as_ref() != Some(*hero))
                .filter(|hero| seen.insert(*hero))
                .map(|hero| Candidate {
                    component: hero.clone(),
                    deck: baseline.replace_header(hero, layout),
                })
                .collect()
        }
        Mode::ReplacementEvaluate => {
            let mut seen: HashSet<&Token> = HashSet::new();
            substitutes
                .iter()
                .filter(|card| !card.is_empty())
                .filter(|card| seen.insert(*card))
                .map(|card| Candidate {
                    component: card.clone(),
                    deck: baseline.append_token(card),
                })
                .collect()
        }
    }
}

/// Measured effect of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub component: Token,
    pub deck: Deck,
    pub win_rate: f64,
    pub present: usize,
    pub requested: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ComponentName>,
}

impl Impact {
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .as_ref()
            .map_or_else(|| self.component.to_string(), ComponentName::label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub mode: Mode,
    pub direction: Direction,
    pub averaging: Averaging,
    pub baseline: Deck,
    pub baseline_win_rate: f64,
    pub baseline_present: usize,
    pub baseline_requested: usize,
    /// Candidates in first-seen order.
    pub impacts: Vec<Impact>,
    /// Simulations, across both passes, that produced no result.
    pub absent: usize,
}

impl OptimizationReport {
    /// Candidate preferred under `preference`; ties go to the first seen.
    #[must_use]
    pub fn pick(&self, preference: Preference) -> Option<&Impact> {
        self.impacts.iter().fold(None, |best: Option<&Impact>, impact| match best {
            None => Some(impact),
            Some(current) => {
                let better = match preference {
                    Preference::Lowest => impact.win_rate < current.win_rate,
                    Preference::Highest => impact.win_rate > current.win_rate,
                };
                Some(if better { impact } else { current })
            }
        })
    }

    /// Candidates ordered best-first under `preference`; stable for ties.
    #[must_use]
    pub fn ranked(&self, preference: Preference) -> Vec<&Impact> {
        let mut ranked: Vec<&Impact> = self.impacts.iter().collect();
        ranked.sort_by(|a, b| {
            let order = a.win_rate.total_cmp(&b.win_rate);
            match preference {
                Preference::Lowest => order,
                Preference::Highest => order.reverse(),
            }
        });
        ranked
    }

    /// Display label → mean win rate, in candidate order.
    #[must_use]
    pub fn impact_table(&self) -> Vec<(String, f64)> {
        self.impacts
            .iter()
            .map(|impact| (impact.label(), impact.win_rate))
            .collect()
    }
}

pub struct Optimizer<C> {
    runner: Runner<C>,
    scenario: Scenario,
    layout: DeckLayout,
    averaging: Averaging,
    names: Option<Arc<NameResolver>>,
}

impl<C: PageContext + 'static> Optimizer<C> {
    pub fn new(runner: Runner<C>, scenario: Scenario) -> Self {
        Self {
            runner,
            scenario,
            layout: DeckLayout::default(),
            averaging: Averaging::default(),
            names: None,
        }
    }

    #[must_use]
    pub const fn with_layout(mut self, layout: DeckLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub const fn with_averaging(mut self, averaging: Averaging) -> Self {
        self.averaging = averaging;
        self
    }

    #[must_use]
    pub fn with_names(mut self, names: Arc<NameResolver>) -> Self {
        self.names = Some(names);
        self
    }

    /// Run one full leave-one-out pass.
    ///
    /// Per-simulation failures are folded into the report as absences; the
    /// page context is shut down once the run is over.
    ///
    /// # Errors
    ///
    /// Returns an error only when `request` fails validation.
    pub async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizationReport, OptimizeError> {
        request.validate()?;

        let opponents: Vec<Deck> = request
            .opponents
            .iter()
            .filter(|deck| !deck.as_str().trim().is_empty())
            .cloned()
            .collect();
        let candidates = derive_candidates(
            &request.baseline,
            request.mode,
            &request.substitutes,
            self.layout,
        );
        log::info!(
            "optimizing {} ({:?}, {:?}): {} candidates x {} opponents",
            request.baseline,
            request.mode,
            request.direction,
            candidates.len(),
            opponents.len()
        );

        let baseline_pairs = request
            .direction
            .pairs(std::slice::from_ref(&request.baseline), &opponents);
        let baseline_records = self
            .runner
            .run_pairs(baseline_pairs, &self.scenario, "baseline")
            .await;
        let baseline = WinRateSummary::from_records(&baseline_records, Averaging::PresentOnly);

        let candidate_decks: Vec<Deck> = candidates.iter().map(|c| c.deck.clone()).collect();
        let candidate_records = if candidate_decks.is_empty() {
            Vec::new()
        } else {
            let pairs = request.direction.pairs(&candidate_decks, &opponents);
            self.runner
                .run_pairs(pairs, &self.scenario, "candidates")
                .await
        };

        let mut impacts =
            aggregate(&candidates, &candidate_records, request.direction, opponents.len(), self.averaging);

        if let Some(names) = &self.names {
            for impact in &mut impacts {
                impact.name = Some(names.resolve(&impact.component).await);
            }
        }

        if let Err(e) = self.runner.client().context().shutdown().await {
            log::debug!("page context shutdown failed: {e:#}");
        }

        let absent = baseline_records
            .iter()
            .chain(&candidate_records)
            .filter(|record| record.is_absent())
            .count();
        if absent > 0 {
            log::warn!("{absent} simulations produced no result");
        }

        Ok(OptimizationReport {
            mode: request.mode,
            direction: request.direction,
            averaging: self.averaging,
            baseline: request.baseline.clone(),
            baseline_win_rate: baseline.mean,
            baseline_present: baseline.present,
            baseline_requested: baseline.requested,
            impacts,
            absent,
        })
    }
}

/// Average each candidate's records, matched on the direction's deck side.
fn aggregate(
    candidates: &[Candidate],
    records: &[SimRecord],
    direction: Direction,
    opponent_count: usize,
    averaging: Averaging,
) -> Vec<Impact> {
    candidates
        .iter()
        .map(|candidate| {
            let rates: Vec<f64> = records
                .iter()
                .filter(|record| direction.side(record) == &candidate.deck)
                .filter_map(SimRecord::win_rate)
                .collect();
            let summary = WinRateSummary::from_rates(&rates, opponent_count, averaging);
            Impact {
                component: candidate.component.clone(),
                deck: candidate.deck.clone(),
                win_rate: summary.mean,
                present: summary.present,
                requested: summary.requested,
                name: None,
            }
        })
        .collect()
}
