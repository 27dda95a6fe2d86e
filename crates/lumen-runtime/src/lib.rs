//! Chunk streaming: what to load, in which order, and the generation workers.
#![forbid(unsafe_code)]

mod config;
mod scheduler;
mod workers;

pub use config::StreamConfig;
pub use scheduler::{SchedulerCounters, StreamingScheduler, Ticket};
pub use workers::{ChunkWorkers, GenerateJob, JobOut, process_generate_job};
