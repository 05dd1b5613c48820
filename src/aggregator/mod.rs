//! The aggregation engine: one feed per tick, least recently fetched first.
//!
//! - [`scrape`] - A single unit of work (claim, fetch, ingest)
//! - [`scheduler`] - The fixed-interval loop with its failure counter and
//!   cancellation contract

mod scheduler;
mod scrape;

pub use scheduler::{
    FailureCounter, Scheduler, SchedulerError, SchedulerState, DEFAULT_INTERVAL,
    FAILURE_THRESHOLD,
};
pub use scrape::{scrape_next_feed, AggregateError, TickReport};
