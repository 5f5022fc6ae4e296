use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use kreol_toxicity::config::Config;
use kreol_toxicity::features::VectorizerParams;
use kreol_toxicity::history::SupabaseHistory;
use kreol_toxicity::inference::InferenceService;
use kreol_toxicity::toxicity::classifier::TrainParams;
use kreol_toxicity::training::TrainingConfig;
use kreol_toxicity::web::AppState;

/// Kreol Toxicity: toxic / non-toxic classification for Kreol text.
///
/// Train a TF-IDF + logistic regression model from labeled CSV data,
/// then serve it over HTTP.
#[derive(Parser)]
#[command(name = "kreol-toxicity", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the model from a labeled CSV and save the artifacts
    Train {
        /// CSV with `text` and `label` (toxic / non_toxic) columns
        #[arg(long, default_value = "data/kreol_toxicity.csv")]
        data: PathBuf,

        /// Where to write vectorizer.json and toxicity_model.json
        /// (default: KREOL_MODEL_DIR or ./model)
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Fraction of rows held out for evaluation (default: 0.2)
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Seed for the train/test split (default: 42)
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Max optimizer iterations (default: 1000)
        #[arg(long, default_value = "1000")]
        max_iter: usize,
    },

    /// Serve the model over HTTP
    Serve {
        /// Model directory (default: KREOL_MODEL_DIR or ./model)
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Address to bind (default: KREOL_BIND or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (default: KREOL_PORT or 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Record every prediction to the Supabase search_history table
        #[arg(long)]
        record_history: bool,
    },

    /// Classify a single text from the command line
    Predict {
        /// The text to classify
        text: String,

        /// Model directory (default: KREOL_MODEL_DIR or ./model)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Rewrite a CSV as plain ASCII (repairs mis-decoded UTF-8, strips accents)
    NormalizeCsv {
        /// The CSV to clean
        input: PathBuf,

        /// Output path (default: <input>_ascii.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("kreol_toxicity=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            model_dir,
            test_size,
            seed,
            max_iter,
        } => {
            let training = TrainingConfig {
                data_path: data,
                model_dir: model_dir.unwrap_or_else(Config::model_dir),
                test_size,
                seed,
                vectorizer: VectorizerParams::default(),
                classifier: TrainParams {
                    max_iter,
                    ..TrainParams::default()
                },
            };

            println!("Training from {}...", training.data_path.display());
            let outcome = kreol_toxicity::training::run(&training)?;

            println!(
                "  Train rows: {}  Test rows: {}  Features: {}",
                outcome.train_rows,
                outcome.test_rows,
                outcome.artifacts.vectorizer.n_features()
            );
            let classifier = &outcome.artifacts.classifier;
            if !classifier.converged {
                println!(
                    "  {} optimizer stopped after {} iterations without converging",
                    "Warning:".yellow(),
                    classifier.iterations
                );
            }

            kreol_toxicity::output::terminal::display_evaluation(&outcome.report);

            println!(
                "\n{} {}",
                "Model and vectorizer saved to".bold(),
                training.model_dir.display()
            );
        }

        Commands::Serve {
            model_dir,
            bind,
            port,
            record_history,
        } => {
            let mut config = Config::load()?;
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            if record_history {
                config.require_history()?;
            }
            config.require_model()?;

            // Load once; every request shares this read-only service.
            let service = InferenceService::load(&config.model_dir)?;
            let mut state = AppState::new(service);

            if record_history {
                info!(policy = ?config.history_policy, "Recording search history to Supabase");
                let store = SupabaseHistory::new(
                    &config.supabase_url,
                    config.supabase_service_key.clone(),
                    config.history_timeout,
                )?;
                state = state.with_history(Arc::new(store), config.history_policy);
            }

            let bind = bind.unwrap_or(config.bind.clone());
            let port = port.unwrap_or(config.port);
            kreol_toxicity::web::run_server(state, &config.cors_origins, &bind, port).await?;
        }

        Commands::Predict { text, model_dir } => {
            let model_dir = model_dir.unwrap_or_else(Config::model_dir);
            let service = InferenceService::load(&model_dir)?;

            let prediction = service.predict(&text);
            kreol_toxicity::output::terminal::display_prediction(&prediction);
        }

        Commands::NormalizeCsv { input, output } => {
            let output =
                output.unwrap_or_else(|| kreol_toxicity::normalize::default_output_path(&input));

            let rows = kreol_toxicity::normalize::normalize_csv(&input, &output)?;

            println!(
                "{} {} rows converted to plain ASCII: {}",
                "Done.".bold(),
                rows,
                output.display()
            );
        }
    }

    Ok(())
}
