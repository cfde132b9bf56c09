//! Test module organization for the blocking queue

pub mod basic_queue;
pub mod properties;
