//! Workflow backend access: the HTTP client and the status poll loop.

pub(crate) mod poll;
pub(crate) mod workflow;
