//! viewc
//!
//! Compiles declarative component definitions into reactive C++ that
//! drives the browser DOM through the webcc host runtime.

mod backend;
mod feedback;
mod frontend;
mod middle;
mod types;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use backend::{plan_components, CodeGen, CppCodeGen};
use feedback::{CompilationFeedback, CompilationStats, Diagnostics, ErrorReport};
use frontend::module::load_program;
use frontend::{mutability, semantic};
use middle::graph::topological_sort;
use middle::region_printer::RegionPrinter;
use middle::regions::{build_program_regions, ComponentRegions};
use types::{TypeEnv, TypeSchema};

/// viewc component compiler
#[derive(Parser, Debug)]
#[command(name = "viewc")]
#[command(version = "0.1.0")]
#[command(about = "Reactive component compiler for declarative view definitions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log compiler passes
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by every compiling subcommand
#[derive(clap::Args, Debug, Clone)]
struct InputArgs {
    /// Input AST files (.json)
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Host type schema (.json)
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Emit machine-readable diagnostics
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile components to C++
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Component mounted by the entry point (defaults to the last in dependency order)
        #[arg(long, value_name = "NAME")]
        root: Option<String>,
    },
    /// Type check without generating code
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Dump the reactive region tables
    Regions {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print version information
    Version,
}

/// How far the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Check,
    Regions,
    Build,
}

/// Everything one compilation needs
#[derive(Debug, Clone)]
struct CompileOptions {
    inputs: Vec<PathBuf>,
    schema: Option<PathBuf>,
    output: Option<PathBuf>,
    root: Option<String>,
    json: bool,
    stage: Stage,
}

impl CompileOptions {
    fn new(input: InputArgs, output: Option<PathBuf>, root: Option<String>, stage: Stage) -> Self {
        Self {
            inputs: input.inputs,
            schema: input.schema,
            output,
            root,
            json: input.json,
            stage,
        }
    }

    fn source_name(&self) -> String {
        self.inputs.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(",")
    }
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let options = match cli.command {
        Commands::Build { input, output, root } => CompileOptions::new(input, output, root, Stage::Build),
        Commands::Check { input } => CompileOptions::new(input, None, None, Stage::Check),
        Commands::Regions { input, output } => CompileOptions::new(input, output, None, Stage::Regions),
        Commands::Version => {
            println!("viewc 0.1.0");
            println!("Reactive component compiler");
            println!("License: Apache-2.0");
            return;
        }
    };

    match run(&options) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Run one compilation and report it; returns whether it succeeded
fn run(options: &CompileOptions) -> anyhow::Result<bool> {
    let started = Instant::now();
    let mut diagnostics = Diagnostics::new();
    let mut stats = CompilationStats::default();

    let result = compile(options, &mut diagnostics, &mut stats);
    stats.total_time_ms = started.elapsed().as_millis() as u64;
    let source = options.source_name();

    if options.json {
        let warnings = diagnostics.reports(&source);
        let feedback = match &result {
            Ok(_) => CompilationFeedback::success(source.clone(), warnings, stats),
            Err(e) => {
                let mut reports = vec![ErrorReport::from_error(e, &source)];
                reports.extend(warnings);
                CompilationFeedback::failure(source.clone(), reports, stats)
            }
        };
        println!("{}", feedback.to_json());
        if let (Ok(Some(text)), Some(path)) = (&result, &options.output) {
            write_output(path, text)?;
        }
        return Ok(result.is_ok());
    }

    for warning in diagnostics.warnings() {
        eprintln!("warning: {}: {}", warning.span(), warning.message());
    }

    match result {
        Ok(Some(text)) => {
            match &options.output {
                Some(path) => {
                    write_output(path, &text)?;
                    log::info!("wrote {}", path.display());
                }
                None => print!("{}", text),
            }
            Ok(true)
        }
        Ok(None) => {
            println!("No errors found in {}", source);
            Ok(true)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(false)
        }
    }
}

fn write_output(path: &PathBuf, text: &str) -> anyhow::Result<()> {
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

/// The compiler pipeline; yields the emitted text for `build` and `regions`
fn compile(
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
    stats: &mut CompilationStats,
) -> utils::Result<Option<String>> {
    let program = load_program(&options.inputs)?;
    let schema = match &options.schema {
        Some(path) => TypeSchema::load(path)?,
        None => TypeSchema::empty(),
    };
    log::debug!(
        "loaded {} component(s), {} schema type(s)",
        program.components.len(),
        schema.len()
    );
    stats.component_count = program.components.len();

    let env = TypeEnv::new(&program, &schema);
    semantic::check_program(&program, &env)?;
    mutability::check_program(&program, &env)?;
    let order = topological_sort(&program)?;
    log::debug!("component order: {}", order.join(", "));

    let regions = build_program_regions(&program, &env, diagnostics)?;
    count_regions(&regions, stats);

    match options.stage {
        Stage::Check => Ok(None),
        Stage::Regions => Ok(Some(RegionPrinter::new().print_all(&regions))),
        Stage::Build => {
            let plans = plan_components(&program, &env, &order, regions)?;
            let mut codegen = CppCodeGen::new(&program, &env).with_root(options.root.clone());
            log::debug!("generating {} output", codegen.name());
            codegen.generate(&plans).map(Some)
        }
    }
}

fn count_regions(regions: &[ComponentRegions], stats: &mut CompilationStats) {
    for r in regions {
        stats.binding_count += r.bindings.len();
        stats.loop_count += r.loops.len();
        stats.if_count += r.ifs.len();
    }
}
