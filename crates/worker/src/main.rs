use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use valuecard_core::service::error::LookupError;
use valuecard_core::service::Analyzer;

mod report;

#[derive(Debug, Parser)]
#[command(name = "valuecard_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print JSON instead of the text report.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score one stock by ticker, company name, or Korean alias.
    Lookup { query: String },

    /// Rank index members by score, optionally within one GICS sector.
    Scan {
        #[arg(long)]
        sector: Option<String>,

        /// Rows fetched, in index-list order. Defaults to SCAN_LIMIT.
        #[arg(long)]
        limit: Option<usize>,

        /// Rows shown after sorting. Defaults to SCAN_TOP.
        #[arg(long)]
        top: Option<usize>,
    },

    /// List sectors in the index membership with constituent counts.
    Sectors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = valuecard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let analyzer = Analyzer::from_settings(&settings)?;

    let res = run(&analyzer, &settings, args).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    res
}

async fn run(
    analyzer: &Analyzer,
    settings: &valuecard_core::config::Settings,
    args: Args,
) -> anyhow::Result<()> {
    match args.command {
        Command::Lookup { query } => match analyzer.lookup(&query).await {
            Ok(lookup) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&lookup)?);
                } else {
                    print!("{}", report::render_lookup(&lookup));
                }
            }
            Err(LookupError::EmptyQuery) => anyhow::bail!("query must be non-empty"),
            Err(err @ LookupError::DataUnavailable { .. }) => {
                // No result for this query is an answer, not a crash.
                tracing::warn!(query = %query, error = %err, "no result");
                println!("{err}");
            }
        },
        Command::Scan { sector, limit, top } => {
            let mut opts = settings.rank_options();
            if let Some(limit) = limit {
                opts.limit = Some(limit);
            }
            if let Some(top) = top {
                anyhow::ensure!(top >= 1, "--top must be >= 1 (got {top})");
                opts.top = top;
            }

            let rows = analyzer.scan(sector.as_deref(), &opts).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", report::render_scan(sector.as_deref(), &rows));
            }
        }
        Command::Sectors => {
            let sectors = analyzer.sectors().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&sectors)?);
            } else {
                for s in &sectors {
                    println!("{:<28} {:>4}", s.name, s.count);
                }
            }
        }
    }
    Ok(())
}

fn init_sentry(settings: &valuecard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
