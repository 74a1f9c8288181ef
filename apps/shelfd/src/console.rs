//! Console scan source.
//!
//! Stands in for the tag reader and the remote catalog feed: each stdin line
//! is one JSON command.
//!
//! ```text
//! {"tag": {"tagId": "A", "code": "SKU1", "lot": 100}}          → console.tag.scan
//! {"update": {"productId": "widget", "code": "SKU1", ...}}     → console.update.product
//! ```

use serde::Deserialize;
use shelf_core::{Product, ProductTag};
use shelf_sync::{Publisher, ShelfEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// One console line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleCommand {
    Tag(ProductTag),
    Update(Product),
}

impl ConsoleCommand {
    fn into_event(self) -> (&'static str, ShelfEvent) {
        match self {
            ConsoleCommand::Tag(tag) => ("tag.scan", ShelfEvent::Tag(tag)),
            ConsoleCommand::Update(product) => ("update.product", ShelfEvent::Update(product)),
        }
    }
}

/// Parses a line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Publishes every command read from `input` until end of input.
pub async fn run<R>(input: R, publisher: Publisher<ShelfEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Console read failed");
                break;
            }
        };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, line = %line, "Skipping malformed console line");
                continue;
            }
        };

        let (suffix, event) = command.into_event();
        match publisher.publish(suffix, event).await {
            Ok(delivered) => debug!(suffix, delivered, "Console command published"),
            Err(e) => warn!(suffix, error = %e, "Console command not published"),
        }
    }

    info!("Console input closed");
}
