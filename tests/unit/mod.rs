//! Unit tests for public wire shapes and the event surface

pub mod event_tests;
