use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("queue_full")]
    QueueFull,
    #[error("duplicate")]
    Duplicate,
    #[error("queue is stopped")]
    Stopped,
}
