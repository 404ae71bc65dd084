//! Canonical object keys under a storage prefix.
//!
//! ```text
//! {prefix}/checkpoint.json                              latest checkpoint
//! {prefix}/checkpoints/checkpoint_{timestamp}.json      checkpoint history
//! {prefix}/batches/batch_{n}.json                       important series per page
//! {prefix}/series_index.json                            consolidated index
//! ```

/// Key of the checkpoint that is overwritten on every save.
#[must_use]
pub fn latest_checkpoint(prefix: &str) -> String {
    format!("{prefix}/checkpoint.json")
}

/// Key of the append-only history copy of a checkpoint taken at
/// `timestamp`.
///
/// `:` is not safe in object keys on every backend, so it is replaced
/// with `-`.
#[must_use]
pub fn checkpoint_history(prefix: &str, timestamp: &str) -> String {
    format!(
        "{prefix}/checkpoints/checkpoint_{}.json",
        timestamp.replace(':', "-")
    )
}

/// Key of batch `batch_number`. Depends on nothing else, so writing the
/// same batch twice overwrites it.
#[must_use]
pub fn batch(prefix: &str, batch_number: u64) -> String {
    format!("{prefix}/batches/batch_{batch_number}.json")
}

/// Key of the consolidated series index.
#[must_use]
pub fn series_index(prefix: &str) -> String {
    format!("{prefix}/series_index.json")
}
