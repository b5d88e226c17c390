#![cfg(not(tarpaulin_include))]

use annual_report::config::PageSetup;
use annual_report::duration::duration_between;
use annual_report::saving::load_state;
use annual_report::validate::validate;
use annual_report::{export_bundle, export_pdf};
use std::env;
use std::fs;
use std::path::PathBuf;

fn usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} export <draft.json|draft.json.gz> [--zip] [-o <output>]", program);
    eprintln!("  {} validate <draft.json|draft.json.gz>", program);
    eprintln!("  {} duration <start YYYY-MM-DD> <end YYYY-MM-DD>", program);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("annual-report");

    match args.get(1).map(String::as_str) {
        Some("export") if args.len() >= 3 => {
            let state = load_state(&args[2])?;
            let mut zip = false;
            let mut output: Option<PathBuf> = None;

            let mut rest = args[3..].iter();
            while let Some(arg) = rest.next() {
                match arg.as_str() {
                    "--zip" => zip = true,
                    "-o" | "--output" => output = rest.next().map(PathBuf::from),
                    other => {
                        eprintln!("Error: unknown option {}", other);
                        usage(program);
                        return Ok(());
                    }
                }
            }

            let setup = PageSetup::default();
            let export = if zip {
                export_bundle(&state, &setup)?
            } else {
                export_pdf(&state, &setup)?
            };
            let path = output.unwrap_or_else(|| PathBuf::from(&export.file_name));
            fs::write(&path, &export.bytes)?;
            println!("Wrote {} ({} bytes)", path.display(), export.bytes.len());
        }
        Some("validate") if args.len() == 3 => {
            let state = load_state(&args[2])?;
            let errors = validate(&state);
            if errors.is_empty() {
                println!("No problems found.");
            } else {
                for e in &errors {
                    println!("- {}", e);
                }
                std::process::exit(1);
            }
        }
        Some("duration") if args.len() == 4 => match duration_between(&args[2], &args[3]) {
            Ok(span) => println!("{}", span),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        _ => usage(program),
    }

    Ok(())
}
