pub mod collector;
pub mod fake;
pub mod history;
pub mod kill;
pub mod process;
pub mod query;
pub mod rate;
pub mod sampler;
pub mod snapshot;
pub mod source;

pub use collector::SysinfoSource;
pub use process::{ProcessEntry, ProcessStatus};
pub use query::{ProcessQueryEngine, SortKey};
pub use sampler::{SamplerHandle, SamplerSettings, SamplingLoop};
pub use snapshot::{Snapshot, SnapshotPublisher, SnapshotReader};
pub use source::MetricsSource;
