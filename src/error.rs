use thiserror::Error;

/// The one failure the resolution machinery raises on its own. Every other
/// rejection carries whatever reason the producer, a reaction, or a thenable
/// supplied, untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A container was asked to adopt itself as its own outcome.
    #[error("chaining cycle detected")]
    ChainingCycle,
}
