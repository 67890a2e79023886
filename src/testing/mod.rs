//! Test doubles for exercising stream semantics without a live broker.

pub mod mocks;

pub use mocks::MockBroker;
