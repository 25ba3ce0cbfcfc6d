//! Simple CLI that reads HTML from stdin and prints extracted comments as JSON.
//!
//! Usage: `extract_stdin <selectors.json> [max_comments] < page.html`
//!
//! Runs one static pass (no scrolling). Logs go to stderr, filtered by
//! `RUST_LOG`.

use std::io::{self, Read};
use std::time::Duration;

use rs_comment_harvest::{extract_comments, ScrollOptions, SelectorMap, ShadowDocument};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_COMMENTS: usize = 500;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(selectors_path) = args.next() else {
        eprintln!("usage: extract_stdin <selectors.json> [max_comments] < page.html");
        std::process::exit(2);
    };
    let max_comments = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_MAX_COMMENTS);

    let selectors: SelectorMap = match std::fs::read_to_string(&selectors_path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Failed to read selector map {selectors_path}: {e}");
            std::process::exit(1);
        }
    };

    // Read HTML from stdin
    let mut html = String::new();
    if io::stdin().read_to_string(&mut html).is_err() {
        eprintln!("Failed to read from stdin");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let page = ShadowDocument::parse(&html);
    let options = ScrollOptions {
        enabled: false,
        initial_wait_timeout: Duration::ZERO,
        toggle_settle_delay: Duration::ZERO,
        scroll_delay: Duration::ZERO,
        ..ScrollOptions::default()
    };
    let report = runtime.block_on(extract_comments(&page, &selectors, max_comments, &options, None, None));

    println!("{}", serde_json::to_string(&report.comments).unwrap_or_default());
}
