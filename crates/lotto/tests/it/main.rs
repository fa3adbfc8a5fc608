//! Integration tests for the lottery harness.

mod live;
mod lottery;
