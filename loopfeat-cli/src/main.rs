// CLI application
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use loopfeat_cli::commands::{analyze_units, inspect_unit};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loopfeat")]
#[command(about = "Static loop feature extractor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Extract loop features from compilation unit files into the dataset
    Analyze {
        /// Paths to compilation unit JSON files
        #[arg(required = true)]
        units: Vec<PathBuf>,

        /// Path to the feature dataset file
        #[arg(short, long, default_value = "loop_features.csv")]
        dataset: PathBuf,

        /// Path to the run counter side-store file
        #[arg(short, long, default_value = "code_id.txt")]
        counter: PathBuf,
    },
    /// Print a unit's loop-forest summary without writing the dataset
    Inspect {
        /// Path to a compilation unit JSON file
        unit: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            units,
            dataset,
            counter,
        } => {
            let pb = create_progress_bar("Extracting loop features...");
            let stats = analyze_units(&units, &dataset, &counter)?;
            pb.finish_with_message(format!(
                "Done: {} loops across {} functions in {} units, {} records written",
                stats.loops_analyzed, stats.functions_analyzed, stats.units, stats.records_written
            ));
            if stats.records_failed > 0 {
                log::warn!("{} records failed to write", stats.records_failed);
            }
        }
        Commands::Inspect { unit } => {
            inspect_unit(&unit)?;
        }
    }

    Ok(())
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb
}
