//! Line stream over encoder progress output.

use futures::{Stream, StreamExt};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::debug;

use super::types::{ProgressSnapshot, ProgressState};

/// Lazily yields the non-blank lines of `reader`.
///
/// The stream ends at EOF, or right after yielding the first read error.
pub fn progress_lines<R>(reader: R) -> impl Stream<Item = io::Result<String>>
where
    R: AsyncRead + Unpin,
{
    futures::stream::unfold(
        Some(BufReader::new(reader).lines()),
        |lines: Option<Lines<BufReader<R>>>| async move {
            let mut lines = lines?;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => return Some((Ok(line), Some(lines))),
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        },
    )
}

/// Feeds every line of `lines` into `state`, in order.
///
/// When a line changes the tracked progress a snapshot is offered to
/// `progress_tx`; a full or closed channel is skipped.
pub async fn track<S>(
    lines: S,
    state: &mut ProgressState,
    progress_tx: Option<&mpsc::Sender<ProgressSnapshot>>,
) -> io::Result<()>
where
    S: Stream<Item = io::Result<String>>,
{
    futures::pin_mut!(lines);
    while let Some(line) = lines.next().await {
        let line = line?;
        if !state.update(&line) {
            continue;
        }

        debug!(
            percent = state.percent(),
            current_secs = state.current_secs(),
            finished = state.is_finished(),
            "Encoder progress"
        );
        if let Some(tx) = progress_tx {
            let _ = tx.try_send(state.snapshot());
        }
    }
    Ok(())
}
