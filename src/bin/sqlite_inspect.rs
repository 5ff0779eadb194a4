//! Command-line page map inspector.
//!
//! Usage:
//!   sqlite_inspect <db_path> info
//!   sqlite_inspect <db_path> tables
//!   sqlite_inspect <db_path> pages <table>
//!   sqlite_inspect <db_path> leaves <table>
//!   sqlite_inspect <db_path> usage <table>
//!   sqlite_inspect <db_path> dot <table>
//!   sqlite_inspect <db_path> page <pgno>
//!   sqlite_inspect <db_path> cell <pgno> <idx>
//!   sqlite_inspect <db_path> freelist

use sqlite_pagemap::{Config, Database, PageId};
use std::env;
use std::process::exit;

fn usage() -> ! {
    eprintln!("Usage: sqlite_inspect <db_path> <command> [args...]");
    eprintln!("Commands:");
    eprintln!("  info                - Show database header fields");
    eprintln!("  tables              - List table names");
    eprintln!("  pages <table>       - Describe every page of a table or index");
    eprintln!("  leaves <table>      - List leaf page numbers");
    eprintln!("  usage <table>       - Page usage as JSON");
    eprintln!("  dot <table>         - Page graph in Graphviz format");
    eprintln!("  page <pgno>         - Show the layout of one page");
    eprintln!("  cell <pgno> <idx>   - Decode one cell");
    eprintln!("  freelist            - List freelist pages");
    exit(1);
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("ERROR: {}", e);
    exit(1);
}

fn arg<'a>(args: &'a [String], i: usize) -> &'a str {
    match args.get(i) {
        Some(value) => value,
        None => usage(),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| fail(format!("Invalid {}: {}", what, value)))
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        usage();
    }

    let db_path = &args[1];
    let command = &args[2];

    let db = Database::open(Config::new(db_path))
        .unwrap_or_else(|e| fail(format!("Failed to open database: {}", e)));

    match command.as_str() {
        "info" => {
            for (name, value) in db.database_info() {
                println!("{:<22} {}", name, value);
            }
        }

        "tables" => {
            for name in db.table_names().unwrap_or_else(|e| fail(e)) {
                println!("{}", name);
            }
        }

        "pages" => {
            let usage = db.page_usage(arg(&args, 3)).unwrap_or_else(|e| fail(e));
            for line in usage.descriptions() {
                println!("{}", line);
            }
        }

        "leaves" => {
            let leaves = db.leaf_page_ids(arg(&args, 3)).unwrap_or_else(|e| fail(e));
            println!("COUNT: {}", leaves.len());
            for pgno in leaves {
                println!("{}", pgno);
            }
        }

        "usage" => {
            let usage = db.page_usage(arg(&args, 3)).unwrap_or_else(|e| fail(e));
            println!("{}", usage.to_json().unwrap_or_else(|e| fail(e)));
        }

        "dot" => {
            let usage = db.page_usage(arg(&args, 3)).unwrap_or_else(|e| fail(e));
            print!("{}", usage.to_dot());
        }

        "page" => {
            let pgno = PageId::new(parse_number(arg(&args, 3), "page number"));
            let page = db.decode_page(pgno).unwrap_or_else(|e| fail(e));
            println!("page {}: {}", pgno, page.page_type().describe());
            println!("header       {}+{}", page.header_area.offset, page.header_area.len);
            println!(
                "cell index   {}+{}",
                page.cell_index_area.offset, page.cell_index_area.len
            );
            println!("unused       {}+{}", page.unused_area.offset, page.unused_area.len);
            for (i, cell) in page.cells.iter().enumerate() {
                println!("cell {:<7} {}+{}", i, cell.offset, cell.len);
            }
            for block in &page.free_blocks {
                println!("freeblock    {}+{}", block.offset, block.len);
            }
            for anomaly in &page.anomalies {
                println!("anomaly: {}", anomaly);
            }
        }

        "cell" => {
            let pgno = PageId::new(parse_number(arg(&args, 3), "page number"));
            let idx: usize = parse_number(arg(&args, 4), "cell index");
            match db.decode_cell_full(pgno, idx).unwrap_or_else(|e| fail(e)) {
                Some(cell) => {
                    if let Some(rowid) = cell.layout.rowid {
                        println!("rowid: {}", rowid);
                    }
                    if let Some(child) = cell.layout.left_child {
                        println!("left child: {}", child);
                    }
                    println!("payload: {} bytes", cell.layout.payload_len);
                    if !cell.overflow_pages.is_empty() {
                        let pages: Vec<String> =
                            cell.overflow_pages.iter().map(|p| p.to_string()).collect();
                        println!("overflow: {}", pages.join(" -> "));
                    }
                    for (i, value) in cell.record.values.iter().enumerate() {
                        println!("  [{}] {}", i, value);
                    }
                    if cell.truncated || cell.record.truncated {
                        println!("TRUNCATED");
                    }
                }
                None => println!("NOT_FOUND"),
            }
        }

        "freelist" => {
            let pages = db.free_page_ids();
            println!("COUNT: {}", pages.len());
            for pgno in pages {
                println!("{}", pgno);
            }
        }

        _ => usage(),
    }
}
