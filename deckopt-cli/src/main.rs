mod browser;
mod progress;
mod reports;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use deckopt_core::{
    Averaging, BattleMode, ClientConfig, Deck, Direction, Mode, NameResolver, OptimizationReport,
    OptimizeRequest, Optimizer, PageContext, Preference, Runner, Scenario, SimulationClient, Token,
};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use browser::{BrowserConfig, BrowserKind, BrowserNameSource, WebDriverContext};
use progress::ConsoleProgress;
use util::{read_deck_lines, split_csv};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Remove each distinct card in turn
    Card,
    /// Swap the hero for each substitute
    Hero,
    /// Append each substitute card in turn
    Replacement,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Card => Self::CardOptimize,
            ModeArg::Hero => Self::HeroOptimize,
            ModeArg::Replacement => Self::ReplacementEvaluate,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    /// The baseline attacks the opponents
    Offence,
    /// The opponents attack the baseline
    Defence,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Offence => Self::Offence,
            DirectionArg::Defence => Self::Defence,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BattleModeArg {
    Tower,
    Arena,
}

impl From<BattleModeArg> for BattleMode {
    fn from(arg: BattleModeArg) -> Self {
        match arg {
            BattleModeArg::Tower => Self::Tower,
            BattleModeArg::Arena => Self::Arena,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AveragingArg {
    /// Average only the simulations that returned a result
    Present,
    /// Divide by every requested simulation (missing results count as 0%)
    Requested,
}

impl From<AveragingArg> for Averaging {
    fn from(arg: AveragingArg) -> Self {
        match arg {
            AveragingArg::Present => Self::PresentOnly,
            AveragingArg::Requested => Self::Requested,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PreferenceArg {
    Lowest,
    Highest,
}

impl From<PreferenceArg> for Preference {
    fn from(arg: PreferenceArg) -> Self {
        match arg {
            PreferenceArg::Lowest => Self::Lowest,
            PreferenceArg::Highest => Self::Highest,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HeadlessMode {
    /// Run browsers in headless mode
    Headless,
    /// Run browsers with visible windows
    Windowed,
}

impl HeadlessMode {
    const fn is_headless(self) -> bool {
        matches!(self, Self::Headless)
    }
}

#[derive(Debug, Parser)]
#[command(name = "deckopt", version = "0.1.0")]
#[command(about = "Leave-one-out deck optimization against the SIMSpellstone battle simulator")]
struct Args {
    /// Deck hash to optimize
    #[arg(long, default_value = "")]
    baseline: String,

    /// Opponent deck hashes (comma-separated)
    #[arg(long, default_value = "")]
    opponents: String,

    /// File with one opponent deck hash per line
    #[arg(long)]
    opponents_file: Option<PathBuf>,

    /// Candidate derivation: remove cards, swap heroes, or append replacements
    #[arg(long, value_enum, default_value_t = ModeArg::Card)]
    mode: ModeArg,

    /// Side the baseline plays on
    #[arg(long, value_enum, default_value_t = DirectionArg::Defence)]
    direction: DirectionArg,

    /// Hero or card tokens to try (comma-separated) - hero/replacement modes
    #[arg(long, default_value = "")]
    substitutes: String,

    /// Battle mode; overrides the scenario file
    #[arg(long, value_enum)]
    battle_mode: Option<BattleModeArg>,

    /// Simulations per battle; overrides the scenario file
    #[arg(long)]
    sims: Option<u32>,

    /// JSON file with scenario parameters
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Maximum simulations in flight
    #[arg(long, default_value_t = deckopt_core::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Page load attempts per simulation
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Upper bound for each page load and result wait, in seconds
    #[arg(long, default_value_t = 100)]
    page_timeout_secs: u64,

    /// How missing results enter the averages
    #[arg(long, value_enum, default_value_t = AveragingArg::Present)]
    averaging: AveragingArg,

    /// Which win rate marks the pick (default: lowest for defence, highest for offence)
    #[arg(long, value_enum)]
    prefer: Option<PreferenceArg>,

    /// Resolve card and rune names for the report
    #[arg(long)]
    names: bool,

    /// Browser to drive
    #[arg(long, value_enum, default_value_t = BrowserKind::Chrome)]
    browser: BrowserKind,

    /// Connect to a Selenium Grid hub instead of a local driver
    #[arg(long)]
    hub: Option<String>,

    /// Run headless where supported
    #[arg(long, value_enum, default_value_t = HeadlessMode::Headless)]
    headless: HeadlessMode,

    /// Simulator page the battle query is appended to
    #[arg(long, default_value = "https://vuzaldo.github.io/SIMSpellstone/Titans.html")]
    sim_url: String,

    /// Directory for screenshots and DOM dumps of failed simulations
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let request = build_request(&args)?;
    let scenario = build_scenario(&args)?;

    announce_banner(&args, &request);

    let start_time = Instant::now();
    let context = build_context(&args);
    let names = args.names.then(|| {
        let source = BrowserNameSource::new(context.clone(), args.sim_url.clone());
        Arc::new(NameResolver::new(source))
    });

    let report = run_optimization(&args, &request, scenario, context.clone(), names.clone())
        .await
        .context("optimization failed")?;
    if let Some(names) = names {
        names.shutdown().await;
    }
    log::info!(
        "{} {} sessions used",
        context.pages_opened(),
        context.kind().label()
    );

    write_reports(&args, &report, start_time)?;
    Ok(())
}

fn announce_banner(args: &Args, request: &OptimizeRequest) {
    println!("{}", "🃏 Deck Optimizer".bright_cyan().bold());
    println!("{}", "================================".cyan());
    if args.verbose {
        println!(
            "Baseline {} vs {} opponents ({:?}, {:?}) on {}",
            request.baseline,
            request.opponents.len(),
            request.mode,
            request.direction,
            args.browser.label()
        );
    }
}

/// Gather and check the caller's inputs before any browser is started.
fn build_request(args: &Args) -> Result<OptimizeRequest> {
    let mut opponents = split_csv(&args.opponents);
    if let Some(path) = &args.opponents_file {
        opponents.extend(read_deck_lines(path)?);
    }

    let request = OptimizeRequest::new(args.baseline.trim(), opponents.into_iter().map(Deck::from).collect())
        .with_mode(args.mode.into())
        .with_direction(args.direction.into())
        .with_substitutes(split_csv(&args.substitutes).into_iter().map(Token::new).collect());

    request
        .validate()
        .context("please enter a baseline deck hash and at least one opponent deck hash")?;
    Ok(request)
}

fn build_scenario(args: &Args) -> Result<Scenario> {
    let mut scenario = match &args.scenario_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Scenario::from_json(&raw).with_context(|| format!("invalid scenario in {}", path.display()))?
        }
        None => Scenario::default(),
    };
    if let Some(mode) = args.battle_mode {
        scenario = scenario.with_battle_mode(mode.into());
    }
    if let Some(sims) = args.sims {
        scenario = scenario.with_sims(sims);
    }
    Ok(scenario)
}

fn build_browser_config(args: &Args) -> BrowserConfig {
    BrowserConfig {
        headless: args.headless.is_headless(),
        page_load_secs: args.page_timeout_secs,
        remote_hub: args.hub.clone(),
    }
}

fn build_context(args: &Args) -> WebDriverContext {
    WebDriverContext::new(args.browser, build_browser_config(args))
        .with_artifacts(args.artifacts_dir.clone())
}

fn build_client_config(args: &Args) -> ClientConfig {
    let page_timeout = Duration::from_secs(args.page_timeout_secs.max(1));
    ClientConfig {
        sim_url: args.sim_url.clone(),
        attempts: args.attempts.max(1),
        page_timeout,
        result_wait: page_timeout,
        ..ClientConfig::default()
    }
}

fn preference(args: &Args) -> Preference {
    args.prefer.map_or_else(
        || Direction::from(args.direction).default_preference(),
        Preference::from,
    )
}

async fn run_optimization<C: PageContext + 'static>(
    args: &Args,
    request: &OptimizeRequest,
    scenario: Scenario,
    context: C,
    names: Option<Arc<NameResolver>>,
) -> Result<OptimizationReport> {
    let client = SimulationClient::new(context, build_client_config(args));
    let runner = Runner::new(client)
        .with_concurrency(args.concurrency)
        .with_progress(Arc::new(ConsoleProgress::default()));
    let mut optimizer = Optimizer::new(runner, scenario).with_averaging(args.averaging.into());
    if let Some(names) = names {
        optimizer = optimizer.with_names(names);
    }
    Ok(optimizer.optimize(request).await?)
}

fn write_reports(args: &Args, report: &OptimizationReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let preference = preference(args);

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report, preference)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report, preference)?,
        _ => {
            reports::generate_console_report(
                &mut output_target,
                report,
                preference,
                start_time.elapsed(),
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
