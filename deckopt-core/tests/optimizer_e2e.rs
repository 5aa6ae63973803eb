use deckopt_core::stub::{ScriptedNames, ScriptedOracle, StubBehavior};
use deckopt_core::{
    Averaging, ClientConfig, Deck, Direction, Mode, NameResolver, OptimizeError, OptimizeRequest,
    Optimizer, Preference, ProgressObserver, Runner, Scenario, SimulationClient, Token,
    WinRateSummary,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn config() -> ClientConfig {
    ClientConfig {
        page_timeout: Duration::from_secs(5),
        result_wait: Duration::from_secs(5),
        poll_interval: Duration::from_millis(5),
        ..ClientConfig::default()
    }
}

fn optimizer(oracle: ScriptedOracle) -> Optimizer<ScriptedOracle> {
    let runner = Runner::new(SimulationClient::new(oracle, config())).with_concurrency(8);
    Optimizer::new(runner, Scenario::default())
}

fn decks(raw: &[&str]) -> Vec<Deck> {
    raw.iter().copied().map(Deck::from).collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Baseline 50%, 70% without BBBBB, 30% without CCCCC.
fn three_card_oracle() -> ScriptedOracle {
    ScriptedOracle::new(|_attack, defense| {
        let rate = match defense {
            "AAAAABBBBBCCCCC" => "50.00%",
            "AAAAACCCCC" => "70.00%",
            "AAAAABBBBB" => "30.00%",
            _ => return None,
        };
        Some(rate.to_string())
    })
}

#[tokio::test]
async fn defence_run_reports_baseline_and_per_card_rates() {
    let oracle = three_card_oracle();
    let report = optimizer(oracle.clone())
        .optimize(&OptimizeRequest::new("AAAAABBBBBCCCCC", decks(&["OPP00"])))
        .await
        .unwrap();

    assert!(close(report.baseline_win_rate, 50.0));
    let table = report.impact_table();
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].0, "BBBBB");
    assert!(close(table[0].1, 70.0));
    assert_eq!(table[1].0, "CCCCC");
    assert!(close(table[1].1, 30.0));

    let least_valuable = report.pick(Preference::Highest).unwrap();
    assert_eq!(least_valuable.component.as_str(), "BBBBB");
    assert_eq!(least_valuable.deck.as_str(), "AAAAACCCCC");
    assert_eq!(
        report
            .pick(Direction::Defence.default_preference())
            .unwrap()
            .component
            .as_str(),
        "CCCCC"
    );
    assert_eq!(report.absent, 0);
    assert_eq!(oracle.stats().shutdowns, 1);
}

#[tokio::test]
async fn candidate_rate_is_the_plain_mean_across_opponents() {
    let oracle = ScriptedOracle::new(|attack, defense| {
        if defense == "AAAAACCCCC" {
            Some(if attack == "OPP01" { "40%" } else { "60%" }.to_string())
        } else {
            Some("55%".to_string())
        }
    });
    let report = optimizer(oracle)
        .optimize(&OptimizeRequest::new(
            "AAAAABBBBBCCCCC",
            decks(&["OPP01", "OPP02"]),
        ))
        .await
        .unwrap();

    let bbbbb = &report.impacts[0];
    assert_eq!(bbbbb.component.as_str(), "BBBBB");
    assert!(close(bbbbb.win_rate, 50.0));
    assert_eq!(bbbbb.present, 2);
    assert_eq!(bbbbb.requested, 2);
}

#[tokio::test]
async fn empty_opponent_list_is_rejected_before_any_simulation() {
    let oracle = three_card_oracle();
    let result = optimizer(oracle.clone())
        .optimize(&OptimizeRequest::new("AAAAABBBBBCCCCC", Vec::new()))
        .await;
    assert_eq!(result, Err(OptimizeError::NoOpponents));
    assert_eq!(oracle.stats().pages_opened, 0);
    assert!(close(
        WinRateSummary::from_rates(&[], 0, Averaging::PresentOnly).mean,
        0.0
    ));
}

#[tokio::test]
async fn absences_are_excluded_by_default_and_counted_as_zero_on_request() {
    // OPP02 never yields a result for the BBBBB candidate.
    let responder = |attack: &str, defense: &str| {
        if defense == "AAAAACCCCC" && attack == "OPP02" {
            None
        } else {
            Some("80%".to_string())
        }
    };
    let request = OptimizeRequest::new("AAAAABBBBBCCCCC", decks(&["OPP01", "OPP02"]));

    let present = optimizer(ScriptedOracle::new(responder))
        .optimize(&request)
        .await
        .unwrap();
    assert!(close(present.impacts[0].win_rate, 80.0));
    assert_eq!(present.impacts[0].present, 1);
    assert_eq!(present.absent, 1);

    let requested = optimizer(ScriptedOracle::new(responder))
        .with_averaging(Averaging::Requested)
        .optimize(&request)
        .await
        .unwrap();
    assert!(close(requested.impacts[0].win_rate, 40.0));
    assert!(close(requested.impacts[1].win_rate, 80.0));
}

#[tokio::test]
async fn malformed_baseline_completes_with_zero_sample_aggregates() {
    let oracle = ScriptedOracle::new(|_, _| None);
    let report = optimizer(oracle)
        .optimize(&OptimizeRequest::new("AAAAABBBBBCC", decks(&["OPP01"])))
        .await
        .unwrap();
    assert!(close(report.baseline_win_rate, 0.0));
    assert_eq!(report.baseline_present, 0);
    assert_eq!(report.impacts.len(), 1);
    assert_eq!(report.impacts[0].present, 0);
    assert!(close(report.impacts[0].win_rate, 0.0));
    assert_eq!(report.absent, 2);
}

#[tokio::test]
async fn transient_failures_are_retried_inside_the_client() {
    let oracle = three_card_oracle().with_behavior(StubBehavior::default().failing_loads(2));
    let report = optimizer(oracle.clone())
        .optimize(&OptimizeRequest::new("AAAAABBBBBCCCCC", decks(&["OPP00"])))
        .await
        .unwrap();
    assert_eq!(report.absent, 0);
    assert!(close(report.impacts[1].win_rate, 30.0));
    assert_eq!(oracle.stats().navigations, 9);
}

#[tokio::test]
async fn offence_puts_the_baseline_on_the_attack_side() {
    let oracle = ScriptedOracle::new(|attack, defense| {
        assert!(defense.starts_with("OPP"), "defense was {defense}");
        Some(
            match attack {
                "AAAAABBBBBCCCCC" => "60%",
                "AAAAACCCCC" => "20%",
                _ => "90%",
            }
            .to_string(),
        )
    });
    let report = optimizer(oracle)
        .optimize(
            &OptimizeRequest::new("AAAAABBBBBCCCCC", decks(&["OPP01", "OPP02"]))
                .with_direction(Direction::Offence),
        )
        .await
        .unwrap();
    assert!(close(report.baseline_win_rate, 60.0));
    assert_eq!(
        report
            .pick(Direction::Offence.default_preference())
            .unwrap()
            .component
            .as_str(),
        "CCCCC"
    );
}

#[tokio::test]
async fn hero_and_replacement_modes_measure_substitutes() {
    let oracle = ScriptedOracle::new(|_, defense| {
        Some(
            match defense {
                "HHHHHBBBBB" => "35%",
                "GGGGGBBBBB" => "45%",
                "AAAAABBBBBDDDDD" => "25%",
                _ => "50%",
            }
            .to_string(),
        )
    });

    let heroes = optimizer(oracle.clone())
        .optimize(
            &OptimizeRequest::new("AAAAABBBBB", decks(&["OPP01"]))
                .with_mode(Mode::HeroOptimize)
                .with_substitutes(vec![Token::from("HHHHH"), Token::from("GGGGG")]),
        )
        .await
        .unwrap();
    let table = heroes.impact_table();
    assert_eq!(table.len(), 2);
    assert!(close(table[0].1, 35.0));
    assert!(close(table[1].1, 45.0));

    let replacements = optimizer(oracle)
        .optimize(
            &OptimizeRequest::new("AAAAABBBBB", decks(&["OPP01"]))
                .with_mode(Mode::ReplacementEvaluate)
                .with_substitutes(vec![Token::from("DDDDD"), Token::from("EEEEE")]),
        )
        .await
        .unwrap();
    assert_eq!(
        replacements.pick(Preference::Lowest).unwrap().component.as_str(),
        "DDDDD"
    );
}

#[tokio::test]
async fn names_label_the_table_without_changing_the_ranking() {
    let names = ScriptedNames::default().with("BBBBB", "Ember Drake", Some("Fire Rune"));
    let report = optimizer(three_card_oracle())
        .with_names(Arc::new(NameResolver::new(names)))
        .optimize(&OptimizeRequest::new("AAAAABBBBBCCCCC", decks(&["OPP00"])))
        .await
        .unwrap();
    let table = report.impact_table();
    assert_eq!(table[0].0, "Ember Drake (Fire Rune)");
    assert_eq!(table[1].0, "CCCCC");
    assert_eq!(
        report.pick(Preference::Highest).unwrap().component.as_str(),
        "BBBBB"
    );
}

#[derive(Default)]
struct BatchCounter {
    batches: AtomicUsize,
}

impl ProgressObserver for BatchCounter {
    fn batch_started(&self, _label: &str, _total: usize) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }

    fn completed(&self, _done: usize, _total: usize) {}
}

#[tokio::test]
async fn candidates_run_as_a_single_batch() {
    let counter = Arc::new(BatchCounter::default());
    let runner = Runner::new(SimulationClient::new(three_card_oracle(), config()))
        .with_progress(Arc::clone(&counter) as Arc<dyn ProgressObserver>);
    let report = Optimizer::new(runner, Scenario::default())
        .optimize(&OptimizeRequest::new(
            "AAAAABBBBBCCCCCDDDDDEEEEE",
            decks(&["OPP01", "OPP02", "OPP03"]),
        ))
        .await
        .unwrap();
    assert_eq!(report.impacts.len(), 4);
    assert_eq!(counter.batches.load(Ordering::SeqCst), 2);
}
