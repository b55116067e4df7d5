//! Unit tests for the session module.

mod domain_tests;
