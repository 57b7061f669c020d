//! TCP front end: accepts connections and hands each one to a worker.

pub mod listener;
