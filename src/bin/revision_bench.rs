use clap::{ArgAction, Parser};
use revision_bench::config::{BenchmarkList, EffectiveConfig};
use revision_bench::logging::init_logging;
use revision_bench::report::{self, ReportOptions};
use revision_bench::runner::ProcessRunner;
use revision_bench::schema::RunReport;
use revision_bench::vcs::GitRepository;
use revision_bench::{Error, Orchestrator, RunOutcome, RunSettings};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "revision-bench")]
#[command(about = "Run benchmarks at a base revision, the latest release and HEAD; fail on regressions")]
struct Args {
    /// Benchmark list (YAML).
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Repository to benchmark.
    #[arg(long, value_name = "DIR", default_value = ".")]
    repo: PathBuf,

    /// Baseline revision.
    #[arg(long, value_name = "REF", default_value = "HEAD~1")]
    base: String,

    /// Also compare against the highest semver tag.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    release: bool,

    /// Only print regressed benchmarks.
    #[arg(long, default_value_t = false)]
    only_regression: bool,

    /// Default time budget per benchmark.
    #[arg(long, default_value = "1s")]
    benchtime: String,

    /// Default regression threshold as a fraction (0.2 = 20%).
    #[arg(long, default_value_t = 0.2)]
    threshold: f64,

    /// Default metrics to check (comma-separated: ns/op, B/op).
    #[arg(long, default_value = "ns/op,B/op")]
    compare: String,

    /// Default CPU count.
    #[arg(long, default_value = "4")]
    cpu: String,

    /// Default per-run timeout.
    #[arg(long, default_value = "10m")]
    timeout: String,

    /// Default for memory profiling.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    benchmem: bool,

    /// Where to write a JSON report.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn global_defaults(&self) -> EffectiveConfig {
        EffectiveConfig {
            benchtime: self.benchtime.clone(),
            threshold: self.threshold,
            compare: self.compare.clone(),
            cpu: self.cpu.clone(),
            timeout: self.timeout.clone(),
            benchmem: self.benchmem,
        }
    }
}

fn run(args: &Args) -> Result<RunOutcome, Error> {
    let list = BenchmarkList::load(&args.config)?;
    let settings = RunSettings {
        command: list.command().to_string(),
        benchmarks: list.resolve(&args.global_defaults()),
        base_ref: args.base.clone(),
        compare_release: args.release,
    };
    info!(
        config = %args.config.display(),
        benchmarks = settings.benchmarks.len(),
        "loaded benchmark list"
    );

    let scm = GitRepository::open(&args.repo)?;
    let runner = ProcessRunner::new(&args.repo);
    let outcome = Orchestrator::new(scm, runner, settings).run()?;

    let opts = ReportOptions {
        only_regression: args.only_regression,
        color: io::stdout().is_terminal(),
    };
    report::write_outcome(&mut io::stdout().lock(), &outcome, opts)?;

    if let Some(out) = &args.out {
        RunReport::new(&outcome).write(out)?;
    }
    Ok(outcome)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(outcome) if outcome.regressed => {
            error!("this commit makes benchmarks worse");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
