use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use wfbench::benchmark;
use wfbench::config::Config;
use wfbench::core::dag::{self, WorkflowGraph};
use wfbench::experiment::{
    Architecture, ExperimentArgs, ExperimentRunner, ExternalExecutor, RunnerSettings,
};
use wfbench::recipe::{self, ExternalRecipe, WorkflowKind};
use wfbench::sanity::{self, Dimension};
use wfbench::workflow::document;
use wfbench::{
    wlog, wlog_debug, CommandFamily, Error, GeneratorConfig, Programs, ResourceConfig, Result,
    Topology, WorkflowMeta,
};

/// wfbench - synthetic workflow benchmarks and experiment batches
#[derive(Parser, Debug)]
#[command(name = "wfbench")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    WFBENCH_DEBUG=1        Enable debug logging (alternative to --debug)\n    WFBENCH_LOG=<level>    Log level: error, warn, info, debug, trace"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.wfbench/wfbench.log)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a chain benchmark: 1 -> 2 -> ... -> N
    Chain(GenerateArgs),

    /// Create a fork-join benchmark: 1 -> {2..N-1} -> N
    ForkJoin(GenerateArgs),

    /// Run an experiment batch and archive every trial
    Run(RunArgs),

    /// Check makespan trends across a directory of results
    Sanity {
        /// Directory holding result documents
        dir: PathBuf,

        /// Dimensions to check (default: all)
        #[arg(long = "check", value_delimiter = ',')]
        checks: Vec<Dimension>,
    },

    /// Validate a workflow document's structure
    Validate {
        /// Path to the workflow document
        path: PathBuf,
    },

    /// Show the configuration file and its settings
    Config {
        /// Write a config file with every default filled in
        #[arg(long)]
        init: bool,

        /// Overwrite an existing config file
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandArg {
    #[value(name = "Sleep")]
    Sleep,
    #[value(name = "WfBench")]
    WfBench,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    /// Program each task runs
    #[arg(long, value_enum, default_value = "Sleep")]
    pub command: CommandArg,

    /// Directory for the document and its input data
    #[arg(long, default_value = "./workflow")]
    pub save_dir: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub num_tasks: usize,

    /// Sleep duration per task (Sleep only)
    #[arg(long, default_value_t = 30)]
    pub seconds: u64,

    /// CPU work per task (WfBench only)
    #[arg(long, default_value_t = 1000)]
    pub cpu_work: u64,

    /// Fraction of CPU work done on the CPU (WfBench only)
    #[arg(long, default_value_t = 0.6)]
    pub percent_cpu: f64,

    /// Total data footprint in MB (WfBench only)
    #[arg(long, default_value_t = 10000)]
    pub data: u64,

    /// Folder for the lock and cores files (default from config)
    #[arg(long)]
    pub lock_files_folder: Option<PathBuf>,

    /// Also translate the written document into this executor script
    #[arg(long, requires = "write")]
    pub pegasus_file: Option<PathBuf>,

    /// Write the document and input data to --save-dir
    #[arg(long)]
    pub write: bool,
}

impl GenerateArgs {
    fn generator_config(&self, config: &Config) -> GeneratorConfig {
        let command = match self.command {
            CommandArg::Sleep => CommandFamily::Sleep {
                seconds: self.seconds,
            },
            CommandArg::WfBench => CommandFamily::WfBench,
        };
        GeneratorConfig {
            num_tasks: self.num_tasks,
            command,
            resources: ResourceConfig {
                cpu_work: self.cpu_work,
                percent_cpu: self.percent_cpu,
                data_mb: self.data,
                lock_dir: self
                    .lock_files_folder
                    .clone()
                    .unwrap_or_else(|| config.lock_dir()),
            },
            programs: Programs::from_config(config),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
#[command(group(
    ArgGroup::new("size")
        .required(true)
        .args(["workflow_size_factor", "workflow_size"])
))]
pub struct RunArgs {
    /// Compute node architecture (haswell, skylake, cascadelake)
    #[arg(short = 'a', long)]
    pub architecture: Architecture,

    /// Workflow to benchmark
    #[arg(short = 'w', long)]
    pub workflow: WorkflowKind,

    #[arg(short = 'n', long)]
    pub num_compute_nodes: usize,

    #[arg(short = 't', long)]
    pub num_trials: usize,

    #[arg(short = 'c', long, num_args = 1.., required = true)]
    pub cpu_work: Vec<u64>,

    #[arg(short = 'f', long, num_args = 1.., required = true)]
    pub cpu_fraction: Vec<f64>,

    /// Data footprints in MB
    #[arg(short = 'd', long, num_args = 1.., required = true)]
    pub data_footprint: Vec<u64>,

    /// Existing directory for the trial archives
    #[arg(short = 'o', long)]
    pub output_dir: PathBuf,

    /// Multiples of the recipe's minimum size
    #[arg(short = 's', long, num_args = 1..)]
    pub workflow_size_factor: Vec<f64>,

    /// Exact task counts (chain and forkjoin only)
    #[arg(short = 'S', long, num_args = 1..)]
    pub workflow_size: Vec<usize>,

    /// Print the resolved sizes and exit
    #[arg(short = 'p', long)]
    pub print_workflow_sizes: bool,
}

impl RunArgs {
    fn experiment_args(&self) -> ExperimentArgs {
        ExperimentArgs {
            architecture: self.architecture,
            workflow: self.workflow,
            num_compute_nodes: self.num_compute_nodes,
            num_trials: self.num_trials,
            cpu_work: self.cpu_work.clone(),
            cpu_fraction: self.cpu_fraction.clone(),
            data_footprint: self.data_footprint.clone(),
            output_dir: self.output_dir.clone(),
            size_factors: self.workflow_size_factor.clone(),
            sizes: self.workflow_size.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    wfbench::log::init_with_debug(cli.debug);
    wlog_debug!("Parsed command: {:?}", cli.command);

    match cli.command {
        Command::Chain(args) => run_generate(Topology::Chain, &args),
        Command::ForkJoin(args) => run_generate(Topology::ForkJoin, &args),
        Command::Run(args) => run_experiments(&args),
        Command::Sanity { dir, checks } => run_sanity(&dir, &checks),
        Command::Validate { path } => run_validate(&path),
        Command::Config { init, force } => run_config(init, force),
    }
}

/// Generate a synthetic benchmark, print it, and optionally lay it out on disk.
fn run_generate(topology: Topology, args: &GenerateArgs) -> Result<()> {
    let config = Config::load()?;
    let generator = args.generator_config(&config);
    let meta = WorkflowMeta::from_config(&config);
    wlog!(
        "Generating {} benchmark: {} tasks, command {}",
        topology,
        generator.num_tasks,
        generator.command.name()
    );

    if !args.write {
        let workflow = topology.generate(&generator, &meta)?;
        println!("{}", document::to_json(&workflow)?);
        return Ok(());
    }

    let bench = benchmark::materialize(topology, &generator, &meta, &args.save_dir)?;
    println!("{}", document::to_json(&bench.workflow)?);
    eprintln!("Wrote {}", bench.document.display());

    if let Some(pegasus_file) = &args.pegasus_file {
        let executor = ExternalExecutor::from_config(&config)?;
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(executor.translate_to(&bench.document, pegasus_file))?;
        eprintln!("Translated to {}", pegasus_file.display());
    }
    Ok(())
}

fn run_experiments(args: &RunArgs) -> Result<()> {
    let config = Config::load()?;
    let experiment = args.experiment_args().validate()?;

    let recipes = ExternalRecipe::new(config.recipe_command());
    let scratch = std::env::temp_dir().join("wfbench-sizes");
    let sizes = recipe::resolve_sizes(
        &recipes,
        experiment.workflow,
        &experiment.size_request,
        &scratch,
    )?;

    if args.print_workflow_sizes {
        print_sizes(experiment.workflow, &sizes);
        return Ok(());
    }

    let executor = ExternalExecutor::from_config(&config)?;
    let runner = ExperimentRunner::new(executor, recipes, RunnerSettings::from_config(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(runner.run_batch(&experiment, &sizes));

    println!("{}", report.summary());
    for archive in &report.archives {
        println!("  {}", archive.display());
    }
    if !report.is_success() {
        for failure in &report.failures {
            println!(
                "  FAILED {}: {}",
                experiment.archive_name(&failure.point),
                failure.error
            );
        }
        return Err(Error::Subprocess(format!(
            "{} of {} trials failed",
            report.failures.len(),
            report.failures.len() + report.archives.len()
        )));
    }
    Ok(())
}

fn print_sizes(workflow: WorkflowKind, sizes: &BTreeMap<usize, usize>) {
    println!("{}", workflow);
    println!("{:>16}  {:>16}", "Desired #tasks", "Actual #tasks");
    for (desired, actual) in sizes {
        println!("{:>16}  {:>16}", desired, actual);
    }
}

fn run_sanity(dir: &Path, checks: &[Dimension]) -> Result<()> {
    let dimensions: &[Dimension] = if checks.is_empty() {
        &Dimension::ALL
    } else {
        checks
    };
    let results = sanity::load_results(dir)?;
    if results.is_empty() {
        println!("No results found in {}", dir.display());
        return Ok(());
    }
    for report in sanity::report(&results, dimensions) {
        print!("{}", report);
    }
    Ok(())
}

fn run_validate(path: &Path) -> Result<()> {
    let workflow = document::read(path)?;
    dag::validate(&workflow)?;
    let graph = WorkflowGraph::build(&workflow)?;
    println!(
        "{}: {} tasks, {} edges, {} roots, {} leaves",
        workflow.name,
        graph.task_count(),
        graph.edge_count(),
        graph.roots().len(),
        graph.leaves().len()
    );
    Ok(())
}

fn run_config(init: bool, force: bool) -> Result<()> {
    let path = Config::config_path()?;
    if init {
        if path.exists() && !force {
            println!("{} already exists (use --force to overwrite)", path.display());
            return Ok(());
        }
        Config::with_defaults().save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = Config::load()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
