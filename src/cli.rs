//! Command line parsing.

use decel_core::CellRef;
use std::path::PathBuf;

pub fn print_usage() {
    eprintln!("Usage: decel [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Document to open (.json); created on save if missing");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --set <CELL=TEXT>     Enter TEXT into CELL (can be repeated)");
    eprintln!("  --fill <SRC:START:END>    Fill SRC over the range START:END (can be repeated)");
    eprintln!("  -p, --print               Print displayed values as CSV");
    eprintln!("  -o, --output <FILE>       Save the document to FILE");
    eprintln!("  -w, --write               Save the document back to [FILE]");
    eprintln!("  -c, --command <EXPR>      Evaluate EXPR against the document and print it");
    eprintln!("  --scripts <DIR>           Load *.rhai scripts from DIR (can be repeated)");
    eprintln!("  --no-scripts              Skip configured and DECEL_SCRIPT_DIR scripts");
    eprintln!("  --functions               List the functions formulas can call");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub source: CellRef,
    pub start: CellRef,
    pub end: CellRef,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Options {
    pub file: Option<PathBuf>,
    pub sets: Vec<(CellRef, String)>,
    pub fills: Vec<Fill>,
    pub print: bool,
    pub output: Option<PathBuf>,
    pub write: bool,
    pub command: Option<String>,
    pub script_dirs: Vec<PathBuf>,
    pub no_scripts: bool,
    pub functions: bool,
    pub help: bool,
}

fn parse_cell(text: &str) -> Result<CellRef, String> {
    CellRef::from_str(text.trim()).ok_or_else(|| format!("Invalid cell: {}", text))
}

fn parse_set(arg: &str) -> Result<(CellRef, String), String> {
    let (cell, text) = arg
        .split_once('=')
        .ok_or_else(|| format!("--set expects CELL=TEXT, got: {}", arg))?;
    Ok((parse_cell(cell)?, text.to_string()))
}

fn parse_fill(arg: &str) -> Result<Fill, String> {
    let parts: Vec<&str> = arg.split(':').collect();
    let [source, start, end] = parts.as_slice() else {
        return Err(format!("--fill expects SRC:START:END, got: {}", arg));
    };
    Ok(Fill {
        source: parse_cell(source)?,
        start: parse_cell(start)?,
        end: parse_cell(end)?,
    })
}

/// Parse arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<Options, String>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str, what: &str| {
            args.next()
                .ok_or_else(|| format!("{} requires {}", flag, what))
        };
        match arg.as_str() {
            "-h" | "--help" => opts.help = true,
            "-s" | "--set" => {
                let raw = value("--set", "CELL=TEXT")?;
                opts.sets.push(parse_set(&raw)?);
            }
            "--fill" => {
                let raw = value("--fill", "SRC:START:END")?;
                opts.fills.push(parse_fill(&raw)?);
            }
            "-p" | "--print" => opts.print = true,
            "-o" | "--output" => opts.output = Some(PathBuf::from(value("--output", "a file path")?)),
            "-w" | "--write" => opts.write = true,
            "-c" | "--command" => opts.command = Some(value("--command", "an expression")?),
            "--scripts" => opts
                .script_dirs
                .push(PathBuf::from(value("--scripts", "a directory")?)),
            "--no-scripts" => opts.no_scripts = true,
            "--functions" => opts.functions = true,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("Unknown option: {}", other));
            }
            _ => {
                if opts.file.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                opts.file = Some(PathBuf::from(arg));
            }
        }
    }

    Ok(opts)
}
