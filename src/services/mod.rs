pub mod events;
pub mod filesystem;
pub mod materializer;
pub mod summary;

pub use events::{Action, EventSink, MemorySink, TracingSink};
pub use filesystem::{Filesystem, LocalFilesystem, Transfer};
pub use materializer::{Materializer, Outcome};
pub use summary::{RunDetails, RunSummary};
