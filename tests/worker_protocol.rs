//! End-to-end tests of the worker message protocol.

use std::time::Duration;

use blockmark::render::RenderOptions;
use blockmark::splitter::Block;
use blockmark::worker::{RenderWorker, Response, WorkerState};

const TICK: Duration = Duration::from_secs(10);

fn spawn_ready() -> blockmark::worker::WorkerHandle {
    let worker = RenderWorker::spawn(RenderOptions::default());
    worker.wait_ready(TICK).expect("worker should become ready");
    worker
}

#[test]
fn test_full_document_round_trip() {
    let markdown = include_str!("fixtures/guide.md");
    let worker = spawn_ready();

    let split_id = worker.split_text(markdown).unwrap();
    let blocks = match worker.recv_timeout(TICK).unwrap() {
        Response::BlocksSplitted { request_id, blocks } => {
            assert_eq!(request_id, split_id);
            blocks
        }
        other => panic!("expected blocks_splitted, got {other:?}"),
    };

    // H1/H2 boundaries: title, Overview, Authoring, Review, Publication,
    // plus the blank-run-separated trailing paragraph (the horizontal rule
    // itself is dropped).
    assert!(blocks.len() >= 5, "expected several blocks, got {}", blocks.len());

    // Every heading anchor appears exactly once across the document.
    let all_ids: Vec<&str> = blocks
        .iter()
        .flat_map(|block| block.contained_heading_ids.iter())
        .map(String::as_str)
        .collect();
    assert!(all_ids.contains(&"heading-overview"));
    assert!(all_ids.contains(&"heading-front-matter"));
    assert!(all_ids.contains(&"heading-rollback"));
    let mut deduped = all_ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), all_ids.len(), "anchor ids must be unique");

    // Render every block; each completion names its block.
    for block in blocks {
        let expected_id = block.id.clone();
        let parse_id = worker
            .parse_block(block, Some("docs/Guide/".to_string()))
            .unwrap();
        match worker.recv_timeout(TICK).unwrap() {
            Response::BlockParsed {
                request_id,
                html,
                original_id,
            } => {
                assert_eq!(request_id, parse_id);
                assert_eq!(original_id, expected_id);
                assert!(!html.trim().is_empty());
            }
            other => panic!("expected block_parsed, got {other:?}"),
        }
    }
}

#[test]
fn test_relative_paths_rewritten_during_block_render() {
    let worker = spawn_ready();
    worker.split_text("![d](img/workflow.png)").unwrap();
    let blocks = match worker.recv_timeout(TICK).unwrap() {
        Response::BlocksSplitted { blocks, .. } => blocks,
        other => panic!("expected blocks_splitted, got {other:?}"),
    };

    worker
        .parse_block(blocks[0].clone(), Some("docs/Guide/".to_string()))
        .unwrap();
    match worker.recv_timeout(TICK).unwrap() {
        Response::BlockParsed { html, .. } => {
            assert!(html.contains("src=\"docs/Guide/img/workflow.png\""));
            assert!(html.contains("loading=\"lazy\""));
        }
        other => panic!("expected block_parsed, got {other:?}"),
    }
}

#[test]
fn test_rendering_same_block_twice_is_idempotent() {
    let worker = spawn_ready();
    let block = Block {
        id: "block-fixed".to_string(),
        markdown: "## Setup\n\n```rust\nfn main() {}\n```".to_string(),
        contained_heading_ids: vec!["heading-setup".to_string()],
    };

    let mut outputs = Vec::new();
    for _ in 0..2 {
        worker
            .parse_block(block.clone(), Some("docs/".to_string()))
            .unwrap();
        match worker.recv_timeout(TICK).unwrap() {
            Response::BlockParsed { html, .. } => outputs.push(html),
            other => panic!("expected block_parsed, got {other:?}"),
        }
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_worker_reads_document_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.md");
    std::fs::write(&path, "# Title\n\n\n\n## Setup\nsteps").unwrap();

    let markdown = std::fs::read_to_string(&path).unwrap();
    let worker = spawn_ready();
    worker.split_text(markdown).unwrap();
    match worker.recv_timeout(TICK).unwrap() {
        Response::BlocksSplitted { blocks, .. } => {
            assert_eq!(blocks.len(), 2);
            assert_eq!(blocks[1].contained_heading_ids, ["heading-setup"]);
        }
        other => panic!("expected blocks_splitted, got {other:?}"),
    }
}

#[test]
fn test_protocol_is_json_compatible_end_to_end() {
    let worker = spawn_ready();
    worker
        .send_json(r###"{"type":"split_text","request_id":5,"markdown_text":"## Setup"}"###)
        .unwrap();
    let blocks = match worker.recv_timeout(TICK).unwrap() {
        Response::BlocksSplitted { request_id, blocks } => {
            assert_eq!(request_id, 5);
            blocks
        }
        other => panic!("expected blocks_splitted, got {other:?}"),
    };

    // Feed a block back through the JSON ingress, exactly as a remote caller
    // would after receiving the serialized split response.
    let payload = serde_json::json!({
        "type": "parse_block",
        "request_id": 6,
        "markdown_block": &blocks[0],
    });
    worker.send_json(payload.to_string()).unwrap();
    match worker.recv_timeout(TICK).unwrap() {
        Response::BlockParsed {
            request_id,
            html,
            original_id,
        } => {
            assert_eq!(request_id, 6);
            assert_eq!(original_id, blocks[0].id);
            assert!(html.contains("heading-setup"));
        }
        other => panic!("expected block_parsed, got {other:?}"),
    }
}

#[test]
fn test_worker_survives_a_burst_of_mixed_traffic() {
    let worker = spawn_ready();

    let mut expected = 0u32;
    for round in 0..5 {
        worker.split_text(format!("# Doc {round}\n\n\n\ntext")).unwrap();
        expected += 1;
        if round % 2 == 0 {
            worker.send_json("not even json").unwrap();
            expected += 1;
        }
    }

    let mut answered = 0u32;
    while answered < expected {
        match worker.recv_timeout(TICK).unwrap() {
            Response::BlocksSplitted { .. } | Response::Error { .. } => answered += 1,
            Response::WorkerReady => panic!("worker_ready must only be sent once"),
            Response::BlockParsed { .. } => panic!("no parse_block was sent"),
        }
    }
    assert_eq!(worker.state(), WorkerState::Ready);
}
