//! Engine tests against an in-memory store.

mod lifecycle;
