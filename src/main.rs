//! Decel - a headless spreadsheet engine front end

mod cli;
mod config;

use anyhow::{Context, Result, bail};
use decel_core::storage::write_display;
use decel_core::{Bindings, ScriptLoader, Table, Value};
use decel_engine::engine::{CellRef, Formula};
use std::path::PathBuf;
use std::process::ExitCode;

fn load_bindings(opts: &cli::Options) -> Result<Bindings> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if !opts.no_scripts {
        let (config, warnings) = config::Config::load();
        for warning in warnings {
            eprintln!("Warning: {}", warning);
        }
        if config.load_scripts {
            dirs.extend(config.script_dirs);
            dirs.extend(ScriptLoader::env_dirs());
        }
    }
    dirs.extend(opts.script_dirs.iter().cloned());

    let loader = ScriptLoader::from_dirs(&dirs).context("Failed to load scripts")?;
    if !loader.files().is_empty() {
        log::info!("{} script file(s) loaded", loader.files().len());
    }
    Ok(loader.bindings())
}

fn open_table(opts: &cli::Options, bindings: Bindings) -> Result<Table> {
    match &opts.file {
        Some(path) if path.exists() => Table::open(path, bindings)
            .with_context(|| format!("Failed to open {}", path.display())),
        Some(path) => {
            let mut table = Table::with_bindings(bindings);
            table.set_filename(path);
            Ok(table)
        }
        None => Ok(Table::with_bindings(bindings)),
    }
}

/// Evaluate `expr` as if it were a formula in the top-left cell.
fn evaluate_command(table: &Table, expr: &str) -> Result<Value> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('=').unwrap_or(expr);
    let formula = Formula::new(CellRef::new(0, 0), expr)?;
    Ok(formula.value_at(formula.origin(), table, table.bindings()))
}

fn print_functions(bindings: &Bindings) {
    for (name, description) in bindings.functions() {
        println!("{:<10} {}", name, description.unwrap_or("(script)"));
    }
}

fn run(opts: cli::Options) -> Result<ExitCode> {
    let bindings = load_bindings(&opts)?;
    if opts.functions {
        print_functions(&bindings);
        return Ok(ExitCode::SUCCESS);
    }
    let mut table = open_table(&opts, bindings)?;

    for (cell, text) in &opts.sets {
        table.set_text_value(*cell, text);
    }
    for fill in &opts.fills {
        table.fill(fill.source, fill.start, fill.end);
    }
    let report = table.propagate();
    for cell in &report.cyclic {
        eprintln!("Warning: circular reference at {}", cell);
    }

    let mut code = ExitCode::SUCCESS;
    if let Some(expr) = &opts.command {
        let value = evaluate_command(&table, expr)?;
        println!("{}", value);
        if value.is_error() {
            code = ExitCode::FAILURE;
        }
    }

    if opts.print {
        print!("{}", write_display(&table)?);
    }

    if let Some(path) = &opts.output {
        let saved = table
            .save_as(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        eprintln!("Saved to {}", saved.display());
    }
    if opts.write {
        if !table.has_filename() {
            bail!("--write needs a FILE argument");
        }
        let saved = table.save().context("Failed to save")?;
        eprintln!("Saved to {}", saved.display());
    }

    Ok(code)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opts = match cli::parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_usage();
            return ExitCode::FAILURE;
        }
    };
    if opts.help {
        cli::print_usage();
        return ExitCode::SUCCESS;
    }

    match run(opts) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
