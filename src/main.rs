use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use poemscope::analysis::{
    ChatCompletionClient, ClientConfig, PoemAnalyzer, PromptTemplate, RunConfig, DEFAULT_ENDPOINT,
    DEFAULT_MODEL, DEFAULT_OUTPUT_DIR,
};
use poemscope::corpus::{CorpusConfig, CorpusLoader, LoadMode, DEFAULT_DATA_DIR};
use poemscope::store::{ExportLoader, RunState};
use poemscope::utils::estimate_batch;
use poemscope::{AnalysisRecord, AnalysisRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "poemscope", version, about = "Flower and imagery analysis of classical poems", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[arg(long, default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, global = true)]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Count corpus files per database
    Scan,
    /// Analyze a fresh selection of poems
    Analyze {
        #[arg(long, value_enum, default_value_t = Mode::Sample)]
        mode: Mode,
        #[arg(long, default_value_t = 10)]
        sample_size: usize,
        #[arg(long, default_value_t = 0.01)]
        rate: f64,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Continue from the newest export in the output directory
    Resume {
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Print sample results of an export
    Show {
        file: PathBuf,
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    /// Print the estimated token usage and cost of a batch
    Estimate {
        #[arg(long)]
        poems: usize,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sample,
    Full,
    Rate,
}

#[derive(Args)]
struct ApiArgs {
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    #[arg(long, default_value_t = 1_000)]
    delay_ms: u64,
    #[arg(long, default_value_t = 20)]
    checkpoint_every: usize,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_analyzer(api: &ApiArgs, output_dir: PathBuf) -> anyhow::Result<PoemAnalyzer<ChatCompletionClient>> {
    let client = ChatCompletionClient::new(
        ClientConfig::new(api.api_key.clone())
            .with_endpoint(api.endpoint.clone())
            .with_model(api.model.clone())
            .with_timeout(Duration::from_secs(api.timeout_secs)),
    )?;
    let config = RunConfig::default()
        .with_output_dir(output_dir)
        .with_delay(Duration::from_millis(api.delay_ms))
        .with_checkpoint_every(api.checkpoint_every);
    Ok(PoemAnalyzer::new(Arc::new(client), PromptTemplate::default()).with_config(config))
}

fn print_estimate(poems: usize) {
    let estimate = estimate_batch(poems);
    println!("poems: {}", estimate.poems);
    println!("estimated tokens: {}", estimate.tokens);
    println!("estimated cost: {:.2}", estimate.cost);
}

fn print_samples(results: &[AnalysisRecord], count: usize) {
    for record in results.iter().filter(|r| r.is_success()).take(count) {
        let analysis = record.analysis();
        let preview: String = record.content.chars().take(50).collect();
        println!("《{}》 - {}", record.title, record.author);
        println!("  content: {preview}...");
        println!("  date: {}", analysis.date);
        println!("  flower: {}", analysis.flower);
        println!("  imagery: {}", analysis.imagery.join(", "));
    }
}

fn run(
    analyzer: &PoemAnalyzer<ChatCompletionClient>,
    poems: &[AnalysisRequest],
    state: &mut RunState,
) -> anyhow::Result<()> {
    if poems.is_empty() {
        warn!("no poems to analyze");
        return Ok(());
    }
    let summary = analyzer
        .run_batch(poems, state)
        .context("batch aborted: results could not be saved")?;
    println!("processed in total: {}", state.processed());
    println!(
        "succeeded: {}/{} ({:.1}%)",
        summary.succeeded,
        summary.attempted,
        summary.success_rate() * 100.0
    );
    println!("elapsed: {:.1} min", summary.elapsed.as_secs_f64() / 60.0);
    if let Some(export) = &summary.export {
        println!("results: {}", export.display());
    }
    print_samples(state.results(), 3);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let corpus = CorpusConfig::default().with_data_dir(&cli.data_dir);

    match cli.command {
        Commands::Scan => {
            let stats = CorpusLoader::new(corpus).scan();
            for (database, files) in &stats.files_per_database {
                println!("{database}: {files} files");
            }
            println!("total files: {}", stats.total_files);
            println!("estimated poems: {}", stats.estimated_poems);
        }
        Commands::Analyze {
            mode,
            sample_size,
            rate,
            limit,
            seed,
            api,
        } => {
            if mode == Mode::Rate && !(rate > 0.0 && rate <= 1.0) {
                bail!("--rate must be in (0, 1], got {rate}");
            }
            let mut loader = CorpusLoader::new(corpus);
            if let Some(seed) = seed {
                loader = loader.with_seed(seed);
            }
            let stats = loader.scan();
            let load_mode = match mode {
                Mode::Sample => LoadMode::Sample { size: sample_size },
                Mode::Rate => LoadMode::Rate { rate },
                Mode::Full => LoadMode::Full,
            };
            let poems = loader.load(load_mode, limit);
            let planned = match mode {
                Mode::Sample => sample_size,
                _ => limit.unwrap_or(stats.estimated_poems),
            };
            let estimate = estimate_batch(planned);
            info!(poems = estimate.poems, tokens = estimate.tokens, cost = estimate.cost, "cost estimate");

            let analyzer = build_analyzer(&api, cli.output_dir)?;
            let mut state = RunState::new();
            run(&analyzer, &poems, &mut state)?;
        }
        Commands::Resume { limit, api } => {
            let mut state = match ExportLoader::latest(&cli.output_dir) {
                Ok(Some((path, document))) => {
                    info!(path = %path.display(), "resuming from export");
                    RunState::resume(document)
                }
                Ok(None) => RunState::new(),
                Err(err) => {
                    warn!(error = %err, "previous export unusable, starting fresh");
                    RunState::new()
                }
            };
            let poems = CorpusLoader::new(corpus).load(LoadMode::Full, None);
            let loaded = poems.len();
            let mut pending = state.filter_pending(poems);
            if let Some(limit) = limit {
                pending.truncate(limit);
            }
            info!(pending = pending.len(), loaded, "poems left to analyze");

            let analyzer = build_analyzer(&api, cli.output_dir)?;
            run(&analyzer, &pending, &mut state)?;
        }
        Commands::Show { file, count } => {
            let document = ExportLoader::load_from_path(&file)
                .with_context(|| format!("cannot load export {:?}", file))?;
            println!("project: {}", document.project);
            println!("analysis date: {}", document.analysis_date);
            println!(
                "processed: {}, analyzed: {}, tokens: {}",
                document.total_processed, document.total_analyzed, document.metadata.api_tokens_used
            );
            print_samples(&document.results, count);
        }
        Commands::Estimate { poems } => print_estimate(poems),
    }

    Ok(())
}
