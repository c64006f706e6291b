pub mod block_source;
pub mod collector;
pub mod events;
pub mod filter;
pub mod persister;
pub mod planner;

pub use block_source::RpcBlockSource;
pub use collector::{Collector, CycleReport};
pub use events::{DecodedLogs, EventDecodeFailure, ProgramEvent, ProgramLogDecoder};
pub use filter::RelevanceFilter;
pub use persister::Persister;
pub use planner::{AssignmentPlanner, CurrentPlanner, HistoricalPlanner};
