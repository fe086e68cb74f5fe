//! sdinspect — print SD generation metadata embedded in image files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sdinspect", version, about = "Inspect Stable-Diffusion metadata in images")]
struct Args {
    /// Image files to inspect.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Emit the full record as JSON.
    #[arg(long)]
    json: bool,

    /// Also print the raw source texts.
    #[arg(long)]
    raw: bool,

    /// Disable the recovery layer (container parsing only).
    #[arg(long)]
    no_recovery: bool,

    /// Verbose extraction logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let multi = args.files.len() > 1;
    for (i, path) in args.files.iter().enumerate() {
        if multi && !args.json {
            if i > 0 {
                println!();
            }
            println!("{}:", path.display());
        }
        if let Err(e) = inspect_file(path, &args) {
            eprintln!("  error: {e}");
        }
    }

    Ok(())
}

fn inspect_file(path: &Path, args: &Args) -> Result<()> {
    let data = std::fs::read(path)?;
    let hint = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let meta = sdmeta::ExtractRequest::new(&data)
        .with_format_hint(hint)
        .with_recovery(!args.no_recovery)
        .extract();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    println!("  format: {}", meta.format.as_str());
    if meta.fields.is_empty() && meta.raw.is_empty() {
        println!("  no metadata found");
        return Ok(());
    }

    // Prompts first, then the remaining fields.
    for key in ["prompt", "negative_prompt"] {
        if let Some(value) = meta.fields.get(key) {
            println!("  {key}: {}", display_value(value));
        }
    }
    for (key, value) in &meta.fields {
        if key == "prompt" || key == "negative_prompt" || key == "parameters_raw" {
            continue;
        }
        if key.ends_with("_json") {
            continue;
        }
        println!("  {key}: {}", display_value(value));
    }

    if args.raw {
        for (key, value) in &meta.raw {
            println!("  raw[{key}]: {value}");
        }
    }

    Ok(())
}

/// Strings print bare; everything else as compact JSON.
fn display_value(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
