//! Input side: batching ring buffer fed by the upstream producer.

mod buffer;

pub use buffer::{BatchingInputBuffer, ErrorSink, InputState};
