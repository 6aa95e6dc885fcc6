//! Command line host for the `deconv` engine: image I/O, argument handling and a
//! background worker that streams progress back to the terminal.

pub mod cli;
pub mod codec;
pub mod task;

pub use cli::{run, Args, BlurType};
pub use codec::{CodecError, FileCodec, ImageCodec};
pub use task::{Poll, ProgressEvent, TaskError, TaskHandle, TaskRunner};
