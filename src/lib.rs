//! gator: a command-line RSS aggregator.
//!
//! Users register feeds, follow them, and browse the latest posts. The
//! `agg` command runs a scheduler that fetches one feed per tick, oldest
//! first, and stores every new item as a post.

pub mod aggregator;
pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
