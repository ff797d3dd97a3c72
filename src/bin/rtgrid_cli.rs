//! CLI tool for rtgrid - imports an HTML table and prints it as document runs
//!
//! Usage:
//!   rtgrid_cli <input.html>                # Delta JSON to stdout
//!   rtgrid_cli <input.html> -o out.json    # Delta JSON to file
//!   rtgrid_cli <input.html> --html         # Re-exported HTML to stdout

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use rtgrid::html::{export_html, import_table};
use rtgrid::sync::table_delta;
use rtgrid::{IdGenerator, TableConfig};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: rtgrid_cli <input.html> [--html] [-o output]");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let as_html = args.iter().skip(2).any(|a| a == "--html");
    let output_path = args
        .iter()
        .skip(2)
        .position(|a| a == "-o")
        .and_then(|i| args.get(i + 3));

    // Read input file
    let html = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    // Import (the importer repairs the grid)
    let mut ids = IdGenerator::new();
    let table = match import_table(&html, &mut ids, &TableConfig::default()) {
        Ok(Some(t)) => t,
        Ok(None) => {
            eprintln!("No <table> found in {}", input_path);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error parsing HTML: {}", e);
            std::process::exit(1);
        }
    };
    eprintln!(
        "Imported {}x{} table ({} cells)",
        table.row_count(),
        table.col_count(),
        table.cell_count()
    );

    let output = if as_html {
        export_html(&table)
    } else {
        let delta = match table_delta(&table) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Error serializing table: {}", e);
                std::process::exit(1);
            }
        };
        match serde_json::to_string_pretty(&delta) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Error serializing JSON: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Output
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &output) {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Written: {}", path);
        }
        None => {
            io::stdout().write_all(output.as_bytes()).unwrap();
            println!();
        }
    }
}
