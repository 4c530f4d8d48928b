//! Blockmark - render a markdown document to HTML, block by block.
//!
//! # Usage
//!
//! ```bash
//! blockmark README.md
//! blockmark --base-path docs/Guide/ docs/Guide/README.md
//! blockmark --split-only --json README.md
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockmark::render::RenderOptions;
use blockmark::worker::{RenderWorker, Response};

/// How long to wait for the worker before giving up; initialization loads
/// the full syntax-definition set, which dominates this.
const WORKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Render a markdown document to HTML, block by block
#[derive(Parser, Debug)]
#[command(name = "blockmark", version, about, long_about = None)]
struct Cli {
    /// Markdown file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Directory of the document relative to the document root, used to
    /// rewrite relative image and link paths (e.g. "docs/Guide/")
    #[arg(long, value_name = "DIR")]
    base_path: Option<String>,

    /// Split the document and print the block list without rendering
    #[arg(long)]
    split_only: bool,

    /// Print machine-readable JSON instead of HTML
    #[arg(long)]
    json: bool,

    /// Disable raw HTML passthrough in the converter
    #[arg(long)]
    no_html: bool,

    /// Disable lazy-loading attributes on images
    #[arg(long)]
    no_lazy_images: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let markdown = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let options = RenderOptions {
        allow_html: !cli.no_html,
        lazy_images: !cli.no_lazy_images,
        ..RenderOptions::default()
    };

    let worker = RenderWorker::spawn(options);
    worker
        .wait_ready(WORKER_TIMEOUT)
        .context("Render worker did not become ready")?;

    let split_id = worker.split_text(markdown)?;
    let blocks = match worker.recv_timeout(WORKER_TIMEOUT)? {
        Response::BlocksSplitted { request_id, blocks } if request_id == split_id => blocks,
        Response::Error { message, .. } => bail!("Split failed: {message}"),
        other => bail!("Unexpected worker response: {other:?}"),
    };

    if cli.split_only {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        } else {
            for block in &blocks {
                println!("{}\t{}", block.id, block.contained_heading_ids.join(","));
            }
        }
        return Ok(());
    }

    let mut fragments = Vec::with_capacity(blocks.len());
    for block in blocks {
        let block_id = block.id.clone();
        let parse_id = worker.parse_block(block, cli.base_path.clone())?;
        match worker.recv_timeout(WORKER_TIMEOUT)? {
            Response::BlockParsed {
                request_id,
                html,
                original_id,
            } if request_id == parse_id => {
                fragments.push((original_id, html));
            }
            Response::Error {
                message,
                original_id,
                ..
            } => bail!(
                "Rendering block {} failed: {message}",
                original_id.unwrap_or(block_id)
            ),
            other => bail!("Unexpected worker response: {other:?}"),
        }
    }

    if cli.json {
        let rendered: Vec<serde_json::Value> = fragments
            .iter()
            .map(|(id, html)| serde_json::json!({ "id": id, "html": html }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for (_, html) in &fragments {
            println!("{html}");
        }
    }

    Ok(())
}
