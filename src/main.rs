use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use word_neighbors::{Config, Mode, Pipeline};

// results go to stdout, logs to stderr
#[derive(Parser)]
#[command(name = "word_neighbors")]
#[command(about = "Nearest-neighbor words from a trained or pre-trained embedding model")]
#[command(version)]
struct Cli {
    /// Path to the json configuration file
    config: PathBuf,

    /// Overrides the `mode` field of the configuration
    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

fn main() -> ExitCode {

    word_neighbors::init_logging();
    let cli = Cli::parse();

    tracing::info!("building parameters...");
    let mut params = match Config::from_file(&cli.config) {
        Ok(config) => config.get_params(),
        Err(e) => {
            tracing::error!("cannot read configuration {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(mode) = cli.mode {
        params.mode = mode;
        // the override has to pass the same checks as the file
        if let Err(e) = Config::new(params.clone()) {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let stdout = std::io::stdout();
    match Pipeline::run(&params, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
