use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use workout_core::checklist::RowState;
use workout_core::lifecycle::ActionOutcome;
use workout_core::rollup::{self, SETS_CSV_FILE};
use workout_core::*;

#[derive(Parser)]
#[command(name = "workout")]
#[command(about = "Guided strength workout sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log engine decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session from a routine file
    Start {
        /// Path to the routine TOML file
        routine: PathBuf,
    },

    /// Show the active session
    Status,

    /// Work through the active session
    Run {
        /// Log every target set and finish each exercise without prompting
        #[arg(long)]
        auto_finish: bool,
    },

    /// End the active session
    End {
        /// End even if exercises are incomplete
        #[arg(long)]
        force: bool,

        /// Notes to attach to the session
        #[arg(long)]
        notes: Option<String>,
    },

    /// Discard the active session
    Cancel,

    /// Roll up finished sessions to CSV
    Rollup {
        /// Clean up processed log files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    workout_core::logging::init_verbose(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let engine = config.session.engine();

    match cli.command {
        Commands::Start { routine } => cmd_start(&data_dir, &routine),
        Commands::Status => cmd_status(&data_dir, engine),
        Commands::Run { auto_finish } => cmd_run(&data_dir, engine, auto_finish),
        Commands::End { force, notes } => cmd_end(&data_dir, engine, force, notes),
        Commands::Cancel => cmd_cancel(&data_dir, engine),
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, cleanup),
    }
}

fn open(data_dir: &Path, engine: EngineConfig) -> Result<Option<SessionController<FileGateway>>> {
    let controller = SessionController::open(FileGateway::new(data_dir), engine)?;
    if controller.is_none() {
        println!("No active session. Start one with `workout start <routine>`.");
    }
    Ok(controller)
}

fn cmd_start(data_dir: &Path, routine_path: &Path) -> Result<()> {
    let routine = Routine::load_from(routine_path)?;
    let mut gateway = FileGateway::new(data_dir);
    let session = gateway.start_session(&routine, Utc::now())?;

    println!("✓ Session started: {}", routine.name);
    println!("  {} exercises", session.exercises.len());
    println!("  ID: {}", session.id);
    Ok(())
}

fn cmd_status(data_dir: &Path, engine: EngineConfig) -> Result<()> {
    let Some(controller) = open(data_dir, engine)? else {
        return Ok(());
    };

    display_view(&controller.view(Utc::now()));
    if controller.phase() == &SessionPhase::Preview {
        for exercise in &controller.session().exercises {
            println!("  {}. {}  {}", exercise.position, exercise.name, format_target(&exercise.target));
        }
        println!();
    }
    Ok(())
}

fn cmd_run(data_dir: &Path, engine: EngineConfig, auto_finish: bool) -> Result<()> {
    let Some(mut controller) = open(data_dir, engine)? else {
        return Ok(());
    };

    if controller.phase() == &SessionPhase::Preview {
        controller.begin(Utc::now())?;
    }

    loop {
        match controller.phase() {
            SessionPhase::Ended | SessionPhase::Cancelled => break,
            SessionPhase::Workout { current: None } => {
                let outcome = controller.end_session(true, None, Utc::now())?;
                report(outcome);
                break;
            }
            _ => {}
        }

        display_view(&controller.view(Utc::now()));

        let command = if auto_finish {
            RunCommand::FinishAll
        } else {
            prompt_command()?
        };

        if command == RunCommand::Quit {
            println!("Session saved. Resume with `workout run`.");
            break;
        }

        match apply(&mut controller, command) {
            Ok(outcome) => report(outcome),
            // Interactive runs keep going so the user can retry
            Err(e) if !auto_finish => eprintln!("Error: {}", e),
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn cmd_end(
    data_dir: &Path,
    engine: EngineConfig,
    force: bool,
    notes: Option<String>,
) -> Result<()> {
    let Some(mut controller) = open(data_dir, engine)? else {
        return Ok(());
    };

    let outcome = controller.end_session(force, notes.as_deref(), Utc::now())?;
    let needs_force = matches!(outcome, ActionOutcome::ConfirmationRequired { .. });
    report(outcome);
    if needs_force {
        println!("Use --force to end anyway.");
    }
    Ok(())
}

fn cmd_cancel(data_dir: &Path, engine: EngineConfig) -> Result<()> {
    let Some(mut controller) = open(data_dir, engine)? else {
        return Ok(());
    };

    let outcome = controller.cancel_session()?;
    report(outcome);
    Ok(())
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let log_path = FileGateway::new(data_dir).finished_log_path();
    let csv_path = data_dir.join(SETS_CSV_FILE);

    if !log_path.exists() {
        println!("No finished sessions found - nothing to roll up.");
        return Ok(());
    }

    let count = rollup::finished_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = rollup::cleanup_processed_wals(data_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed log files", cleaned);
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum RunCommand {
    FinishAll,
    Finish,
    Tap(u32),
    Untap(u32),
    Skip,
    Delete(u32),
    Undo,
    End,
    Cancel,
    Quit,
}

fn apply(
    controller: &mut SessionController<FileGateway>,
    command: RunCommand,
) -> Result<ActionOutcome> {
    let now = Utc::now();
    let current = controller
        .current_exercise()
        .map(|e| e.exercise_id.clone())
        .ok_or_else(|| Error::State("No exercise is in progress".into()))?;

    match command {
        RunCommand::FinishAll => {
            let open_slots: Vec<u32> = controller
                .checklist(&current)
                .into_iter()
                .filter(|row| row.state == RowState::Unchecked)
                .map(|row| row.set_index)
                .collect();
            for set_index in open_slots {
                controller.tap_set(&current, set_index, now)?;
            }
            controller.finish_exercise(now)
        }
        RunCommand::Finish => controller.finish_exercise(now),
        RunCommand::Tap(set_index) => controller.tap_set(&current, set_index, now),
        RunCommand::Untap(set_index) => controller.untap_set(&current, set_index),
        RunCommand::Skip => controller.skip_exercise(now),
        RunCommand::Delete(set_index) => {
            let set_id = controller
                .current_exercise()
                .and_then(|e| e.sets.iter().find(|s| s.set_index == set_index))
                .and_then(|s| s.id)
                .ok_or_else(|| Error::Other(format!("No logged set {}", set_index)))?;
            controller.delete_set(set_id, now)
        }
        RunCommand::Undo => controller.undo_delete_set(now),
        RunCommand::End => match controller.end_session(false, None, now)? {
            ActionOutcome::ConfirmationRequired { incomplete } => {
                println!("Incomplete: {}", incomplete.join(", "));
                if confirm("End the session anyway?")? {
                    controller.end_session(true, None, now)
                } else {
                    Ok(ActionOutcome::Applied)
                }
            }
            outcome => Ok(outcome),
        },
        RunCommand::Cancel => {
            if confirm("Discard this session?")? {
                controller.cancel_session()
            } else {
                Ok(ActionOutcome::Applied)
            }
        }
        RunCommand::Quit => Ok(ActionOutcome::Applied),
    }
}

fn report(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Started { exercise_id } | ActionOutcome::Advanced { exercise_id } => {
            tracing::debug!("Now on {}", exercise_id);
        }
        ActionOutcome::ReadyToEnd => println!("\nAll exercises done."),
        ActionOutcome::ConfirmationRequired { incomplete } => {
            println!("\nIncomplete exercises: {}", incomplete.join(", "));
        }
        ActionOutcome::Ended(summary) => display_summary(&summary),
        ActionOutcome::Cancelled => println!("\n✓ Session cancelled"),
        ActionOutcome::Applied => {}
    }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0} kg", weight)
    } else {
        format!("{} kg", weight)
    }
}

fn format_target(target: &Prescription) -> String {
    let mut parts = Vec::new();
    match (target.sets, &target.reps) {
        (Some(sets), Some(reps)) => parts.push(format!("{} x {}", sets, reps)),
        (Some(sets), None) => parts.push(format!("{} sets", sets)),
        (None, Some(reps)) => parts.push(format!("{} reps", reps)),
        (None, None) => {}
    }
    if let Some(weight) = target.weight {
        parts.push(format!("@ {}", format_weight(weight)));
    }
    if let Some(ref band) = target.band_label {
        parts.push(format!("band {}", band));
    }
    if let Some(rest) = target.rest_seconds {
        parts.push(format!("rest {}s", rest));
    }
    parts.join("  ")
}

fn display_view(view: &WorkoutView) {
    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {}  ({}/{} done)",
        view.routine_name.as_deref().unwrap_or("Workout"),
        view.progress.completed,
        view.progress.total
    );
    println!("╰─────────────────────────────────────────╯");

    if let Some(ref current) = view.current {
        display_exercise(current);
    }
    if let Some(ref partner) = view.partner {
        println!("  Superset with:");
        display_exercise(partner);
    }
    if let Some(remaining) = view.undo_remaining {
        println!("  'z' to undo delete ({}s)", remaining.num_seconds());
    }
    println!();
}

fn display_exercise(exercise: &ExerciseView) {
    println!();
    match exercise.equipment {
        Some(ref equipment) => println!("  {}  [{}]", exercise.name, equipment),
        None => println!("  {}", exercise.name),
    }
    println!("  {}", format_target(&exercise.target));

    for row in &exercise.checklist {
        match row.state {
            RowState::Logged(ref set) => {
                let weight = set.weight.map(|w| format!(" @ {}", format_weight(w))).unwrap_or_default();
                println!("    [x] Set {}  {} reps{}", row.set_index, set.reps, weight);
            }
            RowState::CheckedUnsaved { .. } => println!("    [~] Set {}  (not saved)", row.set_index),
            RowState::Unchecked => println!("    [ ] Set {}", row.set_index),
        }
    }
}

fn display_summary(summary: &SessionSummary) {
    println!("\n✓ Session complete!");
    if let Some(seconds) = summary.duration_seconds {
        println!("  Duration: {} min", seconds / 60);
    }
    println!(
        "  Exercises: {}/{}",
        summary.exercises_completed, summary.exercises_total
    );
    println!(
        "  Sets: {}  Reps: {}  Volume: {}",
        summary.total_sets,
        summary.total_reps,
        format_weight(summary.total_volume)
    );
    for exercise in &summary.exercises {
        let top = exercise
            .top_weight
            .map(|w| format!(", top {}", format_weight(w)))
            .unwrap_or_default();
        println!("    {}: {} sets, {} reps{}", exercise.name, exercise.sets, exercise.reps, top);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn prompt_command() -> Result<RunCommand> {
    loop {
        println!("─────────────────────────────────────────");
        println!("Press Enter to log all sets and finish");
        println!("  't N' / 'u N' tap or untap set N, 'f' finish with tapped sets");
        println!("  's' skip, 'd N' delete logged set N, 'z' undo delete");
        println!("  'e' end session, 'c' cancel, 'q' quit");
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(RunCommand::Quit);
        }

        match parse_command(&input) {
            Some(command) => return Ok(command),
            None => println!("Unknown command: {}", input.trim()),
        }
    }
}

fn parse_command(input: &str) -> Option<RunCommand> {
    let mut words = input.split_whitespace();
    let verb = words.next().map(str::to_lowercase);
    let index = words.next().and_then(|w| w.parse::<u32>().ok());

    match (verb.as_deref(), index) {
        (None, _) => Some(RunCommand::FinishAll),
        (Some("f"), _) => Some(RunCommand::Finish),
        (Some("t"), Some(n)) => Some(RunCommand::Tap(n)),
        (Some("u"), Some(n)) => Some(RunCommand::Untap(n)),
        (Some("s"), _) => Some(RunCommand::Skip),
        (Some("d"), Some(n)) => Some(RunCommand::Delete(n)),
        (Some("z"), _) => Some(RunCommand::Undo),
        (Some("e"), _) => Some(RunCommand::End),
        (Some("c"), _) => Some(RunCommand::Cancel),
        (Some("q"), _) => Some(RunCommand::Quit),
        _ => None,
    }
}
