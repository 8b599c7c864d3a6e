use clap::{Parser, ValueEnum};
use eyre::{Context, Result};
use packline::work::{DEFAULT_SLEEP_PER_UNIT, DEFAULT_SPIN_ITERATIONS};
use packline::{Config, Coordinator, RunParams, WorkConfig};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

static LONG_VERSION: OnceLock<String> = OnceLock::new();

fn get_long_version() -> &'static str {
    LONG_VERSION.get_or_init(|| {
        format!(
            "{} (commit: {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_REVISION", "unknown")
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WorkKind {
    None,
    Spin,
    Sleep,
}

#[derive(Parser)]
#[command(name = "packline")]
#[command(about = "maker/packer production line over a bounded buffer")]
#[command(version = None, long_version = get_long_version())]
struct Args {
    #[arg(help = "total units to produce")]
    order: u64,

    #[arg(help = "buffer slots, must be smaller than the order")]
    capacity: usize,

    #[arg(help = "number of making machines")]
    makers: usize,

    #[arg(help = "number of packing machines (at most 30)")]
    packers: usize,

    #[arg(short, long, help = "configuration file path (toml format)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "event log output file [default: log.txt]")]
    log: Option<PathBuf>,

    #[arg(short, long, value_enum, help = "delay model for build/send/finish phases")]
    work: Option<WorkKind>,

    #[arg(
        long,
        value_parser = humantime::parse_duration,
        help = "sleep per work unit (e.g. 10ms), implies --work sleep"
    )]
    work_unit: Option<Duration>,

    #[arg(long, help = "busy loop iterations per work unit, implies --work spin")]
    spin_iterations: Option<u64>,
}

impl Args {
    fn params(&self) -> RunParams {
        RunParams {
            order: self.order,
            capacity: self.capacity,
            makers: self.makers,
            packers: self.packers,
        }
    }

    /// Applies the work flags on top of the configured model.
    fn resolve_work(&self, configured: WorkConfig) -> Result<WorkConfig> {
        let kind = match (self.work, self.work_unit, self.spin_iterations) {
            (_, Some(_), Some(_)) => {
                eyre::bail!("--work-unit and --spin-iterations cannot be combined")
            }
            (Some(kind), _, _) => kind,
            (None, Some(_), None) => WorkKind::Sleep,
            (None, None, Some(_)) => WorkKind::Spin,
            (None, None, None) => return Ok(configured),
        };

        let work = match kind {
            WorkKind::None => WorkConfig::Idle,
            WorkKind::Spin => WorkConfig::Spin {
                iterations: self.spin_iterations.unwrap_or(match configured {
                    WorkConfig::Spin { iterations } => iterations,
                    _ => DEFAULT_SPIN_ITERATIONS,
                }),
            },
            WorkKind::Sleep => WorkConfig::Sleep {
                per_unit: self.work_unit.unwrap_or(match configured {
                    WorkConfig::Sleep { per_unit } => per_unit,
                    _ => DEFAULT_SLEEP_PER_UNIT,
                }),
            },
        };
        Ok(work)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let params = args.params();
    params.validate().wrap_err("invalid arguments")?;

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => Config::default(),
    };
    let work = args.resolve_work(config.work)?;
    let log_path = args.log.clone().unwrap_or(config.log_path);

    tracing::debug!(?work, log = %log_path.display(), "resolved configuration");

    let file = File::create(&log_path)
        .with_context(|| format!("failed to create log path={}", log_path.display()))?;
    let report = Coordinator::new(params, &work, BufWriter::new(file))?
        .run()
        .wrap_err("production run failed")?;

    tracing::info!(
        log = %log_path.display(),
        made = report.tallies.total_made(),
        packed = report.tallies.total_packed(),
        "production complete"
    );
    Ok(())
}
