//! Shared factories for unit tests.
