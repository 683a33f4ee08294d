//! symptom-insight CLI and HTTP server.
//!
//! Usage:
//!   symptom-insight serve
//!   symptom-insight predict -s itching -s skin_rash
//!   symptom-insight feedback "the rash suggestion was spot on"
//!   symptom-insight symptoms
//!   symptom-insight check

use anyhow::Result;
use clap::{Parser, Subcommand};
use symptom_insight::{
    config::{self, Config, RuntimeConfig},
    feedback::FeedbackSink, http::start_http_server, pipeline::DiagnosisPipeline,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "symptom-insight")]
#[command(about = "Symptom-based disease prediction with live article enrichment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Predict a disease for the given symptoms and print the enriched result as JSON
    Predict {
        /// Symptom name from the vocabulary; repeat for several
        #[arg(short, long = "symptom", required = true)]
        symptoms: Vec<String>,
    },
    /// Append free-text feedback to the feedback log
    Feedback { text: String },
    /// List the symptom vocabulary
    Symptoms,
    /// Load configuration and artifacts, then report what was found
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing must be up before Config::load logs anything
    config::load_env_file();
    symptom_insight::init_tracing(&RuntimeConfig::load_from_env().log_level);

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Predict { symptoms } => predict(config, symptoms).await,
        Commands::Feedback { text } => feedback(config, text),
        Commands::Symptoms => symptoms(config),
        Commands::Check => check(config),
    }
}

async fn serve(config: Config) -> Result<()> {
    let pipeline = DiagnosisPipeline::from_config(&config)?;
    info!("Pipeline ready; search via {}", pipeline.search().provider_name());
    start_http_server(&config, pipeline).await
}

async fn predict(config: Config, symptoms: Vec<String>) -> Result<()> {
    let pipeline = DiagnosisPipeline::from_config(&config)?;
    let vocabulary = pipeline.artifacts().vocabulary();
    let (_, unknown) = vocabulary.partition(symptoms.iter().map(String::as_str));
    for name in unknown {
        match vocabulary.suggest(name) {
            Some(s) => eprintln!("Ignoring unknown symptom '{}' (did you mean '{}'?)", name, s),
            None => eprintln!("Ignoring unknown symptom '{}'", name),
        }
    }

    let result = pipeline.diagnose(&symptoms).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn feedback(config: Config, text: String) -> Result<()> {
    let sink = FeedbackSink::from_config(&config.feedback);
    let outcome = sink.submit(&text);
    println!("{}", outcome.message());
    if !outcome.accepted() {
        anyhow::bail!("feedback was not recorded");
    }
    Ok(())
}

fn symptoms(config: Config) -> Result<()> {
    let artifacts = symptom_insight::ModelArtifacts::load(&config.artifacts)?;
    for name in artifacts.vocabulary().names() {
        println!("{}", name);
    }
    Ok(())
}

fn check(config: Config) -> Result<()> {
    let pipeline = DiagnosisPipeline::from_config(&config)?;
    let artifacts = pipeline.artifacts();
    println!("✅ Model artifacts loaded from {}", config.artifacts.dir.display());
    println!("   symptoms:    {}", artifacts.vocabulary().len());
    println!("   classes:     {}", artifacts.labels().len());
    println!(
        "   fingerprint: {}",
        artifacts.fingerprint().unwrap_or("<none>")
    );
    println!("✅ Knowledge base: {} diseases", pipeline.knowledge().len());
    println!("✅ Article search: {}", pipeline.search().provider_name());
    println!("✅ Feedback log: {}", config.feedback.path.display());
    Ok(())
}
