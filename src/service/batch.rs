//! Chunked concurrent execution with inter-batch pauses

use std::future::Future;

use futures::future::join_all;

use crate::model::ScheduleSettings;

/// Run `op` over all items in waves of `settings.batch_size`.
///
/// Items within a wave run concurrently; waves run strictly in sequence
/// with `settings.pause` between them and no pause after the last one.
/// Result order always matches input order, regardless of completion
/// order inside a wave.
pub async fn process_in_batches<T, R, F, Fut>(
    items: Vec<T>,
    settings: ScheduleSettings,
    op: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = settings.batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());

    let mut remaining = items.into_iter().peekable();
    let mut wave = 0usize;
    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(batch_size).collect();
        tracing::debug!(wave = wave, size = chunk.len(), "Processing batch wave");

        results.extend(join_all(chunk.into_iter().map(&op)).await);
        wave += 1;

        if remaining.peek().is_some() {
            tokio::time::sleep(settings.pause).await;
        }
    }

    results
}
