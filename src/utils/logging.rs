//! Logging helpers on top of `tracing`.

use crate::types::protocols::protocol_label;

/// Hides the value of an `api-key=` query parameter.
#[must_use]
pub fn sanitize_rpc_url(rpc_url: &str) -> String {
    let Some(pos) = rpc_url.find("api-key=") else {
        return rpc_url.to_string();
    };
    let before = &rpc_url[..pos + 8];
    let after = &rpc_url[pos + 8..];
    let end_pos = after.find('&').unwrap_or(after.len());
    format!("{}[REDACTED]{}", before, &after[end_pos..])
}

/// Logs collector startup information
pub fn log_startup(mode: &str, rpc_url: &str, rate_limit: u32, protocols: &[String]) {
    tracing::info!(
        mode,
        rpc_url = sanitize_rpc_url(rpc_url),
        rate_limit,
        protocols = protocols
            .iter()
            .map(|p| protocol_label(p))
            .collect::<Vec<_>>()
            .join(","),
        "Solana transaction collector startup"
    );
}

/// Logs the slots planned for a cycle
pub fn log_assignment(stream: &str, slots: &[u64]) {
    match (slots.first(), slots.last()) {
        (Some(first), Some(last)) => tracing::info!(
            stream,
            blocks = slots.len(),
            first_slot = first,
            last_slot = last,
            "Blocks for collection"
        ),
        _ => tracing::debug!(stream, "Nothing to collect this cycle"),
    }
}

/// Logs cycle summary
pub fn log_batch(
    iteration: u64,
    blocks: usize,
    relevant: usize,
    written: usize,
    events: usize,
    duration_ms: u64,
) {
    tracing::info!(
        iteration,
        blocks,
        relevant,
        written,
        events,
        duration_ms,
        "Cycle completed"
    );
}

/// Logs an error with context
pub fn log_error(context: &str, error: &str) {
    tracing::error!(context = context, error = error, "Collector error");
}
