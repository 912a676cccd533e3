//! Process supervision against real child processes.

#[cfg(unix)]
mod tree_test;
