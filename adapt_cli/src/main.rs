use adapt_core::*;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "adapt")]
#[command(about = "Real-time adaptive training decisions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL file of observations through the engine
    Replay {
        /// One observation per line
        file: PathBuf,

        /// Print each result as a JSON line instead of text
        #[arg(long)]
        json: bool,

        /// Exercises still to come after the replayed ones
        #[arg(long = "remaining", value_delimiter = ',')]
        remaining: Vec<String>,
    },

    /// Check logged history of an exercise for a plateau
    Plateau {
        #[arg(long)]
        exercise: String,

        /// History window in days (defaults to the configured window)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Compute rest before the next set
    Rest {
        /// Exercise kind (strength, cardio, flexibility, ...)
        #[arg(long, default_value = "strength")]
        kind: String,

        /// Form quality of the last set, 0-1
        #[arg(long)]
        form: f64,

        /// RPE of the last set, 1-10
        #[arg(long)]
        rpe: u8,

        /// Current fatigue level
        #[arg(long)]
        fatigue: Option<f64>,

        /// Planned target intensity, 0-1
        #[arg(long)]
        target: Option<f64>,
    },

    /// Log a completed set to the journal
    Log {
        #[arg(long)]
        exercise: String,

        #[arg(long)]
        weight: f64,

        #[arg(long)]
        reps: i32,

        #[arg(long)]
        form: f64,

        #[arg(long)]
        rpe: u8,

        /// Defaults to weight x reps
        #[arg(long)]
        volume: Option<f64>,
    },

    /// Predict rest days from fatigue and recent session intensities
    Recovery {
        #[arg(long)]
        fatigue: f64,

        /// Recent session intensities, newest last
        #[arg(long = "intensity", value_delimiter = ',')]
        intensities: Vec<f64>,
    },

    /// Roll up the journal into the CSV archive
    Rollup {
        /// Remove processed journals after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    adapt_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    match cli.command {
        Commands::Replay {
            file,
            json,
            remaining,
        } => cmd_replay(&config, &file, json, &remaining),
        Commands::Plateau { exercise, days } => cmd_plateau(&config, &exercise, days),
        Commands::Rest {
            kind,
            form,
            rpe,
            fatigue,
            target,
        } => cmd_rest(&kind, form, rpe, fatigue, target),
        Commands::Log {
            exercise,
            weight,
            reps,
            form,
            rpe,
            volume,
        } => cmd_log(&config, exercise, weight, reps, form, rpe, volume),
        Commands::Recovery {
            fatigue,
            intensities,
        } => cmd_recovery(fatigue, &intensities),
        Commands::Rollup { cleanup } => cmd_rollup(&config, cleanup),
    }
}

fn read_observations(path: &Path) -> Result<Vec<Observation>> {
    let reader = BufReader::new(File::open(path)?);
    let mut observations = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Observation>(&line) {
            Ok(obs) => observations.push(obs),
            Err(e) => eprintln!("Skipping line {}: {}", line_num + 1, e),
        }
    }

    tracing::debug!("Read {} observations from {:?}", observations.len(), path);
    Ok(observations)
}

fn cmd_replay(config: &Config, file: &Path, json: bool, remaining: &[String]) -> Result<()> {
    let observations = read_observations(file)?;

    let mut exercises: Vec<&str> = Vec::new();
    for obs in &observations {
        if exercises.last() != Some(&obs.exercise_id.as_str()) {
            exercises.push(&obs.exercise_id);
        }
    }
    let total = (exercises.len() + remaining.len()) as u32;

    let mut engine = AdaptiveEngine::new(config, Box::new(ReplayProvider::default()))?
        .with_repository(Box::new(FileRepository::from_config(config)));
    let session_id = uuid::Uuid::new_v4().to_string();
    engine.open(&session_id, total)?;

    let started = observations.first().map(|o| o.timestamp);
    let mut current: Option<String> = None;
    let mut rejected = 0;

    for obs in &observations {
        if current.as_deref().is_some_and(|id| id != obs.exercise_id) {
            complete(&mut engine, started, obs.timestamp)?;
        }
        current = Some(obs.exercise_id.clone());

        match engine.observe(obs) {
            Ok(observed) if json => println!("{}", serde_json::to_string(&observed)?),
            Ok(observed) => display_observed(&observed),
            Err(e) => {
                eprintln!("Rejected {} @ {}: {}", obs.exercise_id, obs.timestamp, e);
                rejected += 1;
            }
        }
    }
    if let (Some(_), Some(last)) = (&current, observations.last()) {
        complete(&mut engine, started, last.timestamp)?;
    }

    let learning = engine.session_learning(remaining)?;
    let context = engine.close()?;

    if json {
        println!("{}", serde_json::to_string(&learning)?);
    } else {
        display_learning(&context, &learning, rejected);
    }
    Ok(())
}

fn complete(
    engine: &mut AdaptiveEngine,
    started: Option<chrono::DateTime<chrono::Utc>>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let elapsed = started
        .map(|s| (now - s).num_minutes().max(0) as u32)
        .unwrap_or(0);
    let energy = (1.0 - engine.current_fatigue()).clamp(0.0, 1.0);
    engine.complete_exercise(energy, elapsed)?;
    Ok(())
}

fn display_observed(observed: &Observed) {
    let s = &observed.snapshot;
    println!(
        "[{}] {} form {:.2} rpe {} fatigue {:.2}",
        s.timestamp.format("%H:%M:%S"),
        s.exercise_id,
        s.form_quality,
        s.perceived_exertion,
        s.fatigue_measure
    );

    let msg = &observed.message;
    for line in &msg.messages {
        println!("  {:?}: {}", msg.priority, line);
    }
    for action in &msg.actions {
        println!("  → {}", action);
    }

    let d = &observed.decision;
    if d.kind != AdaptationType::NoChange {
        println!("  ⚑ {:?} ({:.0}%): {}", d.kind, d.confidence * 100.0, d.reasoning);
    }
}

fn display_learning(context: &SessionContext, learning: &SessionLearning, rejected: usize) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  SESSION SUMMARY");
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  Exercises: {}/{}",
        context.completed_exercises, context.total_exercises
    );
    println!("  Overall trend: {:?}", learning.overall_trend);
    println!("  Fatigue progression: {:+.2}", learning.fatigue_progression);
    println!("  Average form: {:.2}", learning.average_form);
    println!("  Confidence: {:.0}%", learning.learning_confidence * 100.0);
    if rejected > 0 {
        println!("  Rejected observations: {}", rejected);
    }

    for strength in &learning.strengths {
        println!("  ✓ {}", strength);
    }
    for improvement in &learning.improvements {
        println!("  ! {}", improvement);
    }
    for m in &learning.adaptations {
        println!(
            "  → {}: weight {:+.0}%, reps {:+}, rest x{:.1}, tempo x{:.1}",
            m.exercise_id,
            m.weight_adjustment * 100.0,
            m.rep_adjustment,
            m.rest_time_multiplier,
            m.tempo_multiplier
        );
    }
}

fn cmd_plateau(config: &Config, exercise: &str, days: Option<i64>) -> Result<()> {
    let mut config = config.clone();
    if let Some(days) = days {
        config.engine.history_window_days = days;
    }
    let engine = AdaptiveEngine::new(&config, Box::new(ReplayProvider::default()))?
        .with_repository(Box::new(FileRepository::from_config(&config)));

    let report = engine.detect_plateau(exercise);

    println!("{}", report.message);
    println!("  Plateau score: {:.2}", report.plateau_score);
    println!("  Recommendation: {}", report.recommendation);
    for action in &report.suggested_actions {
        println!("  → {}", action);
    }
    Ok(())
}

fn cmd_rest(kind: &str, form: f64, rpe: u8, fatigue: Option<f64>, target: Option<f64>) -> Result<()> {
    if !(0.0..=1.0).contains(&form) || !(1..=10).contains(&rpe) {
        return Err(Error::InvalidObservation(format!(
            "form {} must be in [0, 1] and rpe {} in [1, 10]",
            form, rpe
        )));
    }
    let set = SetPerformance {
        form_quality: form,
        perceived_exertion: rpe,
        actual_reps: 0,
        target_reps: 0,
        weight: 0.0,
    };
    let kind = ExerciseKind::parse(kind);
    let fatigue = fatigue.unwrap_or(adapt_core::fatigue::DEFAULT_FATIGUE_LEVEL);
    let calc = adapt_core::rest::calculate_rest(&set, fatigue, target, &kind);

    println!("Rest: {} seconds", calc.seconds());
    println!("  {}", calc.reasoning);
    Ok(())
}

fn cmd_log(
    config: &Config,
    exercise: String,
    weight: f64,
    reps: i32,
    form: f64,
    rpe: u8,
    volume: Option<f64>,
) -> Result<()> {
    if !(0.0..=1.0).contains(&form) || !(1..=10).contains(&rpe) || reps < 0 || weight < 0.0 {
        return Err(Error::InvalidObservation(
            "form must be in [0, 1], rpe in [1, 10], reps and weight non-negative".into(),
        ));
    }
    let record = PerformanceRecord {
        id: uuid::Uuid::new_v4(),
        user_id: config.user.user_id.clone(),
        exercise_id: exercise,
        weight,
        reps,
        form_quality: form,
        rpe,
        volume: volume.unwrap_or(weight * f64::from(reps)),
        timestamp: chrono::Utc::now(),
    };

    let mut sink = JsonlSink::new(config.journal_path());
    sink.append(&record)?;

    println!("✓ Logged {} x{} @ {} for {}", record.exercise_id, reps, weight, record.user_id);
    Ok(())
}

fn cmd_recovery(fatigue: f64, intensities: &[f64]) -> Result<()> {
    let prediction = adapt_core::fatigue::predict_rest_days(fatigue, intensities);

    println!("Rest days: {}", prediction.recommended_rest_days);
    println!("  {}", prediction.reasoning);
    println!("  Recovery score: {:.2}", prediction.recovery_score);
    println!("  Stress level: {:.2}", prediction.stress_level);
    println!("  Next workout intensity: {:.1}", prediction.next_workout_intensity);
    Ok(())
}

fn cmd_rollup(config: &Config, cleanup: bool) -> Result<()> {
    let journal = config.journal_path();
    let csv_path = config.archive_path();

    if !journal.exists() {
        println!("No journal found - nothing to roll up.");
        return Ok(());
    }

    let count = adapt_core::csv_rollup::journal_to_csv_and_archive(&journal, &csv_path)?;

    println!("✓ Rolled up {} records to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = adapt_core::csv_rollup::cleanup_processed_journals(&config.data.data_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed journals", cleaned);
        }
    }

    Ok(())
}
