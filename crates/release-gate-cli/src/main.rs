// release-gate-cli/src/main.rs
// ============================================================================
// Module: Release Gate CLI Entry Point
// Description: Command dispatcher for the gate pipeline and companion tools.
// Purpose: Provide the release-gate binary: run, replay, compare, guard,
//          and chaos commands with the contracted exit codes.
// Dependencies: clap, release-gate-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The release-gate CLI wires configuration and evidence files into the core
//! supervisor and its companion tools. Exit codes follow the pipeline
//! contract: `0` for an admitted run, `2` for a policy rejection, `3` for a
//! tool error such as malformed configuration. Each `run` invocation prints
//! exactly one machine-readable JSON line on stdout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use release_gate_core::ActingOwners;
use release_gate_core::ChaosScenario;
use release_gate_core::EvidencePaths;
use release_gate_core::Gate;
use release_gate_core::GateContext;
use release_gate_core::GateSupervisor;
use release_gate_core::MetricRegistry;
use release_gate_core::Profile;
use release_gate_core::ReasonCodeCatalog;
use release_gate_core::RunnerGuardPolicy;
use release_gate_core::SourceFallbackPolicy;
use release_gate_core::SupervisorConfig;
use release_gate_core::core::io::read_json_compat;
use release_gate_core::core::io::read_json_object;
use release_gate_core::core::io::write_json_pretty;
use release_gate_core::core::time::utc_now_run_id;
use release_gate_core::runtime::chaos::run_chaos;
use release_gate_core::runtime::compare::compare_documents;
use release_gate_core::runtime::guard::evaluate_runner_guard;
use release_gate_core::runtime::guard::load_history;
use release_gate_core::runtime::guard::load_state;
use release_gate_core::runtime::guard::persist_evaluation;
use release_gate_core::runtime::replay::replay_log;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for a policy rejection.
const EXIT_POLICY_FAIL: u8 = 2;
/// Exit code for a tool error.
const EXIT_TOOL_ERROR: u8 = 3;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "release-gate", version, about = "Release-gate decision engine")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the G0-G4 gate pipeline and emit a verdict.
    Run(RunCommand),
    /// Replay a runtime state-machine log and validate its transitions.
    Replay(ReplayCommand),
    /// Compare two verdict documents for equivalence.
    Compare(CompareCommand),
    /// Evaluate the runner guard without running the pipeline.
    Guard(GuardCommand),
    /// Run the pipeline in an isolated root with an injected fault.
    Chaos(ChaosCommand),
}

/// `run` command flags.
#[derive(Args, Debug)]
struct RunCommand {
    /// Repository root the run validates.
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,
    /// Profile document path.
    #[arg(long, default_value = "data/config/profiles/profile_m0_72h.v5_1.yaml")]
    profile: PathBuf,
    /// Metric registry document path.
    #[arg(long, default_value = "data/config/metric_registry.v1.yaml")]
    registry: PathBuf,
    /// Reason-code catalog path.
    #[arg(long, default_value = "docs/research/templates/verdict_reason_codes.v1.json")]
    reason_codes: PathBuf,
    /// Acting-owners document path.
    #[arg(long, default_value = "data/config/acting_owners.v1.json")]
    owners: PathBuf,
    /// Source-fallback policy path.
    #[arg(long, default_value = "data/config/source_fallback_policy.v1.json")]
    source_fallback_policy: PathBuf,
    /// Runner-guard policy path.
    #[arg(long, default_value = "data/config/runner_guard_policy.v1.json")]
    runner_guard_policy: PathBuf,
    /// Checkpoint history NDJSON path.
    #[arg(long, default_value = "data/runtime/gates/history.ndjson")]
    history: PathBuf,
    /// Output root for run folders and guard state.
    #[arg(long, default_value = "data/runtime/gates")]
    output_root: PathBuf,
    /// Run identifier; derived from the UTC clock when absent.
    #[arg(long)]
    run_id: Option<String>,
    /// Previous run identifier when continuing a failed run.
    #[arg(long)]
    resumed_from_run_id: Option<String>,
    /// Attestation payload path for G4.
    #[arg(long)]
    attestation: Option<PathBuf>,
    /// Research cards document path.
    #[arg(long, default_value = "data/research/strategy-watch/latest_experiment_cards.json")]
    research_cards: PathBuf,
    /// Strategy admission report path.
    #[arg(
        long,
        default_value = "data/research/strategy-watch/admission/latest_strategy_admission_report.json"
    )]
    admission_report: PathBuf,
    /// External benchmark report path.
    #[arg(
        long,
        default_value = "data/research/external-benchmark/latest_external_benchmark_report.json"
    )]
    external_benchmark_report: PathBuf,
    /// Source-health report path.
    #[arg(long, default_value = "data/research/strategy-watch/health/latest_health_report.json")]
    health_report: PathBuf,
    /// Strategy metrics document path.
    #[arg(long, default_value = "data/runtime/gates/strategy_metrics.json")]
    strategy_metrics: PathBuf,
    /// Budget usage document path.
    #[arg(long, default_value = "data/runtime/gates/model_budget_usage.json")]
    budget_usage: PathBuf,
    /// Dataset snapshot input path.
    #[arg(long, default_value = "data/research/strategy-watch/latest_experiment_cards.json")]
    dataset_path: PathBuf,
    /// Features snapshot input path.
    #[arg(
        long,
        default_value = "data/research/external-benchmark/latest_external_benchmark_report.json"
    )]
    features_path: PathBuf,
    /// Labels snapshot input path.
    #[arg(
        long,
        default_value = "data/research/strategy-watch/admission/latest_strategy_admission_report.json"
    )]
    labels_path: PathBuf,
    /// Split snapshot input path.
    #[arg(long, default_value = "data/research/strategy-watch/health/latest_health_report.json")]
    split_path: PathBuf,
    /// Verdict output path override.
    #[arg(long)]
    verdict_output: Option<PathBuf>,
}

/// `replay` command flags.
#[derive(Args, Debug)]
struct ReplayCommand {
    /// State-machine log file path.
    #[arg(long, default_value = "decision_packet/state_machine_log.jsonl")]
    log_file: PathBuf,
    /// Replay report output path.
    #[arg(long, default_value = "decision_packet/replay_report.json")]
    output: PathBuf,
    /// Return a tool error for exit-code contract tests.
    #[arg(long, default_value_t = false)]
    simulate_tool_error: bool,
}

/// `compare` command flags.
#[derive(Args, Debug)]
struct CompareCommand {
    /// Baseline verdict document path.
    #[arg(long)]
    baseline: PathBuf,
    /// Candidate verdict document path.
    #[arg(long)]
    candidate: PathBuf,
    /// Comparison report output path.
    #[arg(long, default_value = "data/runtime/gates/migration_compare_report.json")]
    output: PathBuf,
}

/// `guard` command flags.
#[derive(Args, Debug)]
struct GuardCommand {
    /// Runner-guard policy path.
    #[arg(long, default_value = "data/config/runner_guard_policy.v1.json")]
    policy: PathBuf,
    /// Checkpoint history NDJSON path.
    #[arg(long, default_value = "data/runtime/gates/history.ndjson")]
    history: PathBuf,
    /// Persisted guard state path.
    #[arg(long, default_value = "data/runtime/gates/runner_guard_state.json")]
    state: PathBuf,
    /// Guard report output path.
    #[arg(long, default_value = "data/runtime/gates/runner_guard_latest_report.json")]
    output: PathBuf,
}

/// `chaos` scenario argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioArg {
    /// Inject a non-canonical reason-code catalog.
    UnknownReasonCode,
    /// Point snapshot inputs at missing files.
    MissingDatasetSnapshotInput,
    /// Withhold the attestation payload.
    MissingAttestation,
}

impl From<ScenarioArg> for ChaosScenario {
    fn from(value: ScenarioArg) -> Self {
        match value {
            ScenarioArg::UnknownReasonCode => Self::UnknownReasonCode,
            ScenarioArg::MissingDatasetSnapshotInput => Self::MissingDatasetSnapshotInput,
            ScenarioArg::MissingAttestation => Self::MissingAttestation,
        }
    }
}

/// `chaos` command flags.
#[derive(Args, Debug)]
struct ChaosCommand {
    /// Repository root the pipeline validates.
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,
    /// Isolated non-production directory for chaos outputs.
    #[arg(long, default_value = "/tmp/release-gate-chaos")]
    isolated_root: PathBuf,
    /// Fault scenario to inject.
    #[arg(long, value_enum, default_value_t = ScenarioArg::UnknownReasonCode)]
    scenario: ScenarioArg,
    /// Profile document path.
    #[arg(long, default_value = "data/config/profiles/profile_m0_72h.v5_1.yaml")]
    profile: PathBuf,
    /// Metric registry document path.
    #[arg(long, default_value = "data/config/metric_registry.v1.yaml")]
    registry: PathBuf,
    /// Reason-code catalog path.
    #[arg(long, default_value = "docs/research/templates/verdict_reason_codes.v1.json")]
    reason_codes: PathBuf,
    /// Acting-owners document path.
    #[arg(long, default_value = "data/config/acting_owners.v1.json")]
    owners: PathBuf,
    /// Source-fallback policy path.
    #[arg(long, default_value = "data/config/source_fallback_policy.v1.json")]
    source_fallback_policy: PathBuf,
    /// Runner-guard policy path.
    #[arg(long, default_value = "data/config/runner_guard_policy.v1.json")]
    runner_guard_policy: PathBuf,
    /// Chaos report output path override.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI-level failure carrying a short operator-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Short failure description.
    message: String,
}

impl CliError {
    /// Creates a CLI error from any displayable failure.
    fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Result alias for CLI command handlers.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point: dispatch and map failures onto the tool-error code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command),
        Commands::Replay(command) => command_replay(&command),
        Commands::Compare(command) => command_compare(&command),
        Commands::Guard(command) => command_guard(&command),
        Commands::Chaos(command) => command_chaos(&command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Stdout line emitted once per `run` invocation.
#[derive(Debug, Serialize)]
struct RunReceipt<'a> {
    /// Run identifier.
    #[serde(rename = "runId")]
    run_id: &'a str,
    /// Verdict result label.
    result: &'a str,
    /// Verdict artifact path.
    #[serde(rename = "verdictPath")]
    verdict_path: String,
}

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let repo_root = command.repo_root.clone();
    let resolve = |path: &Path| resolve_against(&repo_root, path);

    let profile_path = resolve(&command.profile);
    let registry_path = resolve(&command.registry);
    let reason_codes_path = resolve(&command.reason_codes);

    let profile = load_profile(&profile_path)?;
    let registry = load_registry(&registry_path)?;
    let catalog = load_catalog(&reason_codes_path)?;
    let owners = load_owners(&resolve(&command.owners))?;
    let source_fallback = load_source_fallback(&resolve(&command.source_fallback_policy))?;
    let guard_policy = load_guard_policy(&resolve(&command.runner_guard_policy))?;

    let output_root = resolve(&command.output_root);
    let history_path = resolve(&command.history);
    let run_id = command
        .run_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(utc_now_run_id, str::to_string);
    let run_dir = output_root.join(&run_id);

    let evidence = EvidencePaths {
        research_cards: resolve(&command.research_cards),
        admission_report: resolve(&command.admission_report),
        external_report: resolve(&command.external_benchmark_report),
        health_report: resolve(&command.health_report),
        strategy_metrics: resolve(&command.strategy_metrics),
        budget_usage: resolve(&command.budget_usage),
        dataset: resolve(&command.dataset_path),
        features: resolve(&command.features_path),
        labels: resolve(&command.labels_path),
        split: resolve(&command.split_path),
    };
    let subcheck_timeout_seconds = profile.timeout_seconds(Gate::G1);

    let ctx = GateContext {
        repo_root: repo_root.clone(),
        run_id: run_id.clone(),
        run_dir,
        profile,
        registry,
        catalog,
        owners,
        source_fallback,
        evidence,
        attestation_path: command.attestation.as_deref().map(|path| resolve(path)),
        subcheck_timeout_seconds,
    };
    let config = SupervisorConfig {
        output_root,
        history_path,
        verdict_output: command.verdict_output.as_deref().map(|path| resolve(path)),
        resumed_from: command.resumed_from_run_id.clone(),
        profile_path,
        registry_path,
        reason_codes_path,
    };

    let supervisor = GateSupervisor::new(ctx, guard_policy, config);
    let outcome = supervisor.execute().map_err(CliError::new)?;

    let receipt = RunReceipt {
        run_id: &outcome.run_id,
        result: outcome.verdict.result.as_str(),
        verdict_path: outcome.verdict_path.display().to_string(),
    };
    let line = serde_json::to_string(&receipt).map_err(CliError::new)?;
    write_stdout_line(&line).map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;

    Ok(ExitCode::from(outcome.verdict.result.exit_code()))
}

// ============================================================================
// SECTION: Replay Command
// ============================================================================

/// Executes the `replay` command.
fn command_replay(command: &ReplayCommand) -> CliResult<ExitCode> {
    if command.simulate_tool_error {
        return Err(CliError::new("simulated tool error"));
    }
    let report = replay_log(&command.log_file).map_err(CliError::new)?;
    write_json_pretty(&command.output, &report).map_err(CliError::new)?;
    if report.valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_POLICY_FAIL))
    }
}

// ============================================================================
// SECTION: Compare Command
// ============================================================================

/// Executes the `compare` command.
fn command_compare(command: &CompareCommand) -> CliResult<ExitCode> {
    let baseline_path = command.baseline.display().to_string();
    let candidate_path = command.candidate.display().to_string();

    let loaded = read_json_object(&command.baseline)
        .and_then(|baseline| read_json_object(&command.candidate).map(|candidate| (baseline, candidate)));
    let (baseline, candidate) = match loaded {
        Ok(documents) => documents,
        Err(err) => {
            let report = json!({
                "version": "v1",
                "generatedAt": release_gate_core::core::time::utc_now_iso(),
                "baselinePath": baseline_path,
                "candidatePath": candidate_path,
                "valid": false,
                "errors": [format!("input_load_error: {err}")],
            });
            write_json_pretty(&command.output, &report).map_err(CliError::new)?;
            write_stdout_line(&report.to_string())
                .map_err(|write_err| CliError::new(format!("stdout write failed: {write_err}")))?;
            return Ok(ExitCode::from(EXIT_POLICY_FAIL));
        }
    };

    let report = compare_documents(&baseline_path, &candidate_path, &baseline, &candidate);
    write_json_pretty(&command.output, &report).map_err(CliError::new)?;
    let line = serde_json::to_string(&report).map_err(CliError::new)?;
    write_stdout_line(&line).map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;

    let equivalent = report
        .comparison
        .as_ref()
        .is_some_and(release_gate_core::runtime::compare::VerdictComparison::is_equivalent);
    if report.valid && equivalent {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_POLICY_FAIL))
    }
}

// ============================================================================
// SECTION: Guard Command
// ============================================================================

/// Executes the `guard` command.
fn command_guard(command: &GuardCommand) -> CliResult<ExitCode> {
    let policy = load_guard_policy(&command.policy)?;
    let history = load_history(&command.history);
    let previous = load_state(&command.state);
    let report = evaluate_runner_guard(&policy, &history, previous);
    persist_evaluation(&report, &command.state, &command.output).map_err(CliError::new)?;
    if report.hard_open() {
        Ok(ExitCode::from(EXIT_POLICY_FAIL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

// ============================================================================
// SECTION: Chaos Command
// ============================================================================

/// Executes the `chaos` command.
fn command_chaos(command: &ChaosCommand) -> CliResult<ExitCode> {
    let repo_root = command.repo_root.clone();
    let resolve = |path: &Path| resolve_against(&repo_root, path);

    let profile = load_profile(&resolve(&command.profile))?;
    let registry = load_registry(&resolve(&command.registry))?;
    let catalog = load_catalog(&resolve(&command.reason_codes))?;
    let owners = load_owners(&resolve(&command.owners))?;
    let source_fallback = load_source_fallback(&resolve(&command.source_fallback_policy))?;
    let guard_policy = load_guard_policy(&resolve(&command.runner_guard_policy))?;
    let subcheck_timeout_seconds = profile.timeout_seconds(Gate::G1);

    // Evidence defaults match the run command; the scenario may rewire them.
    let evidence = EvidencePaths {
        research_cards: resolve(Path::new(
            "data/research/strategy-watch/latest_experiment_cards.json",
        )),
        admission_report: resolve(Path::new(
            "data/research/strategy-watch/admission/latest_strategy_admission_report.json",
        )),
        external_report: resolve(Path::new(
            "data/research/external-benchmark/latest_external_benchmark_report.json",
        )),
        health_report: resolve(Path::new(
            "data/research/strategy-watch/health/latest_health_report.json",
        )),
        strategy_metrics: resolve(Path::new("data/runtime/gates/strategy_metrics.json")),
        budget_usage: resolve(Path::new("data/runtime/gates/model_budget_usage.json")),
        dataset: resolve(Path::new("data/research/strategy-watch/latest_experiment_cards.json")),
        features: resolve(Path::new(
            "data/research/external-benchmark/latest_external_benchmark_report.json",
        )),
        labels: resolve(Path::new(
            "data/research/strategy-watch/admission/latest_strategy_admission_report.json",
        )),
        split: resolve(Path::new(
            "data/research/strategy-watch/health/latest_health_report.json",
        )),
    };

    let ctx = GateContext {
        repo_root,
        run_id: String::new(),
        run_dir: PathBuf::new(),
        profile,
        registry,
        catalog,
        owners,
        source_fallback,
        evidence,
        attestation_path: None,
        subcheck_timeout_seconds,
    };

    let report = run_chaos(
        ctx,
        guard_policy,
        &command.isolated_root,
        command.scenario.into(),
        command.output.as_deref(),
    )
    .map_err(CliError::new)?;
    let line = serde_json::to_string(&report).map_err(CliError::new)?;
    write_stdout_line(&line).map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Loading
// ============================================================================

/// Loads and types the profile document.
fn load_profile(path: &Path) -> CliResult<Profile> {
    let value = read_json_compat(path).map_err(CliError::new)?;
    Profile::from_value(value).map_err(|err| CliError::new(format!("profile malformed: {err}")))
}

/// Loads and types the metric registry document.
fn load_registry(path: &Path) -> CliResult<MetricRegistry> {
    let value = read_json_compat(path).map_err(CliError::new)?;
    serde_json::from_value(value).map_err(|err| CliError::new(format!("registry malformed: {err}")))
}

/// Loads and types the reason-code catalog.
fn load_catalog(path: &Path) -> CliResult<ReasonCodeCatalog> {
    let value = read_json_object(path).map_err(CliError::new)?;
    serde_json::from_value(value)
        .map_err(|err| CliError::new(format!("reason codes malformed: {err}")))
}

/// Loads and types the acting-owners document.
fn load_owners(path: &Path) -> CliResult<ActingOwners> {
    let value = read_json_object(path).map_err(CliError::new)?;
    serde_json::from_value(value).map_err(|err| CliError::new(format!("owners malformed: {err}")))
}

/// Loads and types the source-fallback policy.
fn load_source_fallback(path: &Path) -> CliResult<SourceFallbackPolicy> {
    let value = read_json_object(path).map_err(CliError::new)?;
    serde_json::from_value(value)
        .map_err(|err| CliError::new(format!("source fallback policy malformed: {err}")))
}

/// Loads and types the runner-guard policy.
fn load_guard_policy(path: &Path) -> CliResult<RunnerGuardPolicy> {
    let value = read_json_object(path).map_err(CliError::new)?;
    serde_json::from_value(value)
        .map_err(|err| CliError::new(format!("runner guard policy malformed: {err}")))
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves a possibly relative path against the repository root.
fn resolve_against(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits a short error to stderr and returns the tool-error exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_TOOL_ERROR)
}
