use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use shade_backend_core::{BackendOptions, BackendRegistry, ShaderStage};
use shade_opt::{OptLevel, PassManager};

mod samples;

/// Shade: compile expression graphs to GLSL shaders
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Sample graph to compile (see --list)
    #[arg(required_unless_present = "list")]
    sample: Option<String>,

    /// Target backend (default: glsl)
    #[arg(short, long, default_value = "glsl")]
    target: String,

    /// Output path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optimization level: 0, 1, or 2
    #[arg(long, default_value = "1", value_parser = parse_opt_level)]
    opt_level: OptLevel,

    /// Shader stage: fragment or vertex (default: the sample's own)
    #[arg(long, value_parser = parse_stage)]
    stage: Option<ShaderStage>,

    /// Dump the optimized graph to stderr before backend compilation
    #[arg(long)]
    emit_ir: bool,

    /// List the available samples and targets
    #[arg(long)]
    list: bool,
}

fn parse_opt_level(s: &str) -> Result<OptLevel, String> {
    match s {
        "0" => Ok(OptLevel::O0),
        "1" => Ok(OptLevel::O1),
        "2" => Ok(OptLevel::O2),
        _ => Err(format!(
            "invalid optimization level '{s}', expected 0, 1, or 2"
        )),
    }
}

fn parse_stage(s: &str) -> Result<ShaderStage, String> {
    match s {
        "fragment" | "frag" => Ok(ShaderStage::Fragment),
        "vertex" | "vert" => Ok(ShaderStage::Vertex),
        _ => Err(format!(
            "invalid shader stage '{s}', expected fragment or vertex"
        )),
    }
}

fn registry() -> BackendRegistry {
    let mut registry = BackendRegistry::with_builtins();
    registry.register(Box::new(shade_backend_glsl::GlslBackend));
    registry
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let registry = registry();

    if cli.list {
        println!("samples:");
        for s in samples::SAMPLES {
            println!("  {:<10} {} ({})", s.name, s.description, s.stage);
        }
        println!("targets: {}", registry.list_targets().join(", "));
        return Ok(());
    }

    // 1. Build the sample graph.
    let name = cli
        .sample
        .as_deref()
        .ok_or_else(|| miette::miette!("no sample given (use --list to see them)"))?;
    let sample = samples::find(name).ok_or_else(|| {
        let available: Vec<_> = samples::SAMPLES.iter().map(|s| s.name).collect();
        miette::miette!("unknown sample '{name}' (available: {})", available.join(", "))
    })?;
    let (mut graph, root) = sample
        .build()
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err_with(|| format!("failed to build sample '{name}'"))?;

    // 2. Optimize.
    let root = PassManager::for_level(cli.opt_level)
        .run(&mut graph, root)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err("optimization failed")?;

    // 3. Optionally dump IR to stderr.
    if cli.emit_ir {
        eprintln!("{}", shade_ir::debug_print(&graph, root));
    }

    // 4. Backend dispatch.
    let backend = registry.find(&cli.target).ok_or_else(|| {
        let available = registry.list_targets().join(", ");
        miette::miette!("unknown target '{}' (available: {})", cli.target, available)
    })?;

    let opts = BackendOptions {
        opt_level: cli.opt_level,
        stage: cli.stage.unwrap_or(sample.stage),
    };

    let output = backend
        .compile(&mut graph, root, &opts)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err_with(|| format!("{} compilation failed", backend.name()))?;

    // 5. Print diagnostics.
    for diag in &output.diagnostics {
        eprintln!("{:?}: {}", diag.level, diag.message);
    }

    // 6. Write output.
    for file in &output.files {
        match &cli.output {
            Some(path) => std::fs::write(path, &file.content)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?,
            None => print!("{}", file.content),
        }
    }

    Ok(())
}
