//! vitalita - Workout history analytics and adaptive journal rendering
//!
//! Vitalità: a personal training log where every session counts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vitalita::history::{
    personal_record, reps_max_by_weight, weight_progression, ExerciseHistory, TemplateFilter,
};
use vitalita::session::sessions_from_json;
use vitalita::store::SqliteStore;
use vitalita::window::{HostSignals, RenderWindow, WindowTuner};

#[derive(Parser)]
#[command(name = "vitalita")]
#[command(author, version, about = "Vitalità - workout history and journal window tuning")]
struct Cli {
    /// SQLite file holding local client state
    #[arg(long, env = "VITALITA_DB", default_value = "vitalita.db", global = true)]
    db: String,

    /// Logical CPU cores (detected when omitted)
    #[arg(long, env = "VITALITA_CORES", global = true)]
    cores: Option<u32>,

    /// Device memory in GB
    #[arg(long, env = "VITALITA_MEMORY_GB", global = true)]
    memory_gb: Option<f64>,

    /// Data-saving mode requested
    #[arg(long, env = "VITALITA_SAVE_DATA", global = true)]
    save_data: Option<bool>,

    /// Effective connection type (e.g. "4g", "3g", "slow-2g")
    #[arg(long, env = "VITALITA_EFFECTIVE_TYPE", global = true)]
    effective_type: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show exercise history from an exported sessions file
    History {
        /// JSON array of session documents
        file: String,

        /// Only sessions of this template
        #[arg(short, long)]
        template: Option<String>,

        /// Show entries and records of one exercise
        #[arg(short, long)]
        exercise: Option<String>,
    },

    /// Show the recommended journal window
    Window {
        /// Simulate paging through a list of this many items
        #[arg(short, long)]
        total: Option<usize>,
    },

    /// Record a render duration in milliseconds
    Record {
        #[arg(allow_negative_numbers = true)]
        ms: f64,
    },

    /// List persisted render durations
    Metrics,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let signals = HostSignals {
        cores: cli.cores,
        memory_gb: cli.memory_gb,
        save_data: cli.save_data,
        effective_type: cli.effective_type.clone(),
    };

    match cli.command {
        Commands::History { file, template, exercise } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading sessions file {}", file))?;
            let sessions = sessions_from_json(&raw)
                .with_context(|| format!("parsing sessions file {}", file))?;
            let history = ExerciseHistory::build(&sessions);
            let filter = TemplateFilter::from_option(template.as_deref());

            println!("Templates:");
            for option in history.templates() {
                let mark = if *option == filter { "*" } else { " " };
                println!(" {} {}", mark, option);
            }

            match exercise {
                Some(name) => print_exercise(&history, &name, &filter),
                None => {
                    println!("\nExercises ({}):", filter);
                    for name in history.exercises_for_template(&filter) {
                        println!("  {}", name);
                    }
                }
            }
        }

        Commands::Window { total } => {
            let store = SqliteStore::open(&cli.db)?;
            let tuner = WindowTuner::new(store, signals);
            let config = tuner.window_config();

            println!("Device tier: {}", tuner.device_tier());
            println!("Samples: {}", tuner.samples().len());
            println!("Window: initial {} / step {}", config.initial, config.step);

            if let Some(total) = total {
                let mut window = RenderWindow::new(config, total);
                print!("Paging {}: {}", total, window.visible());
                while window.has_more(total) {
                    window.load_more(total);
                    print!(" -> {}", window.visible());
                }
                println!();
            }
        }

        Commands::Record { ms } => {
            let store = SqliteStore::open(&cli.db)?;
            let tuner = WindowTuner::new(store, signals);
            tuner.record_render_metric(ms);
            println!("Samples: {}", tuner.samples().len());
        }

        Commands::Metrics => {
            let store = SqliteStore::open(&cli.db)?;
            let tuner = WindowTuner::new(store, signals);
            println!("Render durations:");
            println!("{:-<40}", "");
            for sample in tuner.samples() {
                let at = chrono::DateTime::from_timestamp_millis(sample.at)
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{} | {:>8.2} ms", at, sample.ms);
            }
        }
    }

    Ok(())
}

fn print_exercise(history: &ExerciseHistory, name: &str, filter: &TemplateFilter) {
    let entries = history.entries_for(name, filter);
    if entries.is_empty() {
        println!("\nNo entries for {} ({})", name, filter);
        return;
    }

    println!("\n{} ({}):", name, filter);
    println!("{:-<60}", "");
    for e in &entries {
        println!(
            "{} | {:16} | {:>6} x {:<4} | {}",
            e.date.format("%Y-%m-%d"),
            e.template_name,
            e.weight,
            e.reps,
            if e.target.is_empty() { "-" } else { e.target.as_str() }
        );
    }

    if let Some(pr) = personal_record(entries.iter().copied()) {
        println!("\nPersonal record: {} x {} ({})", pr.weight, pr.reps, pr.date.format("%Y-%m-%d"));
    }

    let progression: Vec<String> = weight_progression(entries.iter().copied())
        .iter()
        .map(|(_, weight)| weight.to_string())
        .collect();
    if progression.len() > 1 {
        println!("Progression: {}", progression.join(" -> "));
    }

    let table = reps_max_by_weight(entries.iter().copied());
    if !table.is_empty() {
        println!("\nMax reps by weight:");
        for row in table {
            println!("  {:>6} -> {}", row.weight, row.reps);
        }
    }
}
