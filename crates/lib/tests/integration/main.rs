//! End-to-end tests against a real compiler and ninja.
//!
//! Every test returns early when `g++` or `ninja` is not installed; the
//! library's unit tests cover the same scenarios with a stand-in ninja.

mod common;
mod compile_tests;
mod deps_tests;
