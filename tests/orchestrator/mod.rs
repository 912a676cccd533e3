//! Restart cycles, debouncing and the full run loop.

#[cfg(unix)]
mod cycle_test;
#[cfg(unix)]
mod run_test;
