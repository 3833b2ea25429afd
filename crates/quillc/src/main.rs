//! Quill compiler
//!
//! Usage: quillc [OPTIONS] <input> [-o <output>]

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use quill_compiler::common::DiagnosticReporter;
use quill_compiler::driver::Pipeline;
use quill_compiler::frontend::{CompileContext, FrontendConfig};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "quillc")]
#[command(version)]
#[command(about = "Semantic analyzer and IR generator for the Quill language", long_about = None)]
struct Args {
    /// Input source file (.ql)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file for the textual IR
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Show where in the compiler each error was raised
    #[arg(long)]
    error_origin: bool,

    /// Dump IR (for debugging)
    #[arg(long)]
    dump_ir: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the scope tree after analysis (for debugging)
    #[arg(long)]
    dump_scopes: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `-v` selects debug output
fn init_logging(verbose: bool) {
    let default = if verbose { "quill_compiler=debug,quillc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new().with_origin(args.error_origin);
    let file_id = reporter.add_file(&filename, &source);
    let ctx = CompileContext::new(filename.clone(), file_id, &reporter);

    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("qir");
        path
    });
    tracing::info!(input = %filename, output = %output_path.display(), "compiling");

    let config = FrontendConfig {
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_scopes: args.dump_scopes,
        dump_ir: args.dump_ir,
        verbose: args.verbose,
    };

    let compilation = match Pipeline::new().compile_source(&source, &ctx.filename, &config) {
        Ok(compilation) => compilation,
        Err(error) => {
            ctx.reporter.report_error(ctx.file_id, &error);
            bail!("could not parse {}", ctx.filename);
        }
    };

    for (title, text) in &compilation.dumps {
        eprintln!("=== {} ===", title);
        eprintln!("{}", text);
        eprintln!("=== End {} ===\n", title);
    }

    if compilation.has_errors() {
        ctx.reporter.report_all(ctx.file_id, &compilation.diagnostics);
        bail!(
            "could not compile {} due to {} error(s)",
            ctx.filename,
            compilation.diagnostics.len()
        );
    }

    fs::write(&output_path, compilation.module.to_string())
        .with_context(|| format!("cannot write {}", output_path.display()))?;
    tracing::info!(output = %output_path.display(), "compiled");

    Ok(())
}
