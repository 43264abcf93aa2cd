mod mock;
mod noop;

pub use mock::{MockScript, MockTranscriber};
pub use noop::NoOpTranscriber;
