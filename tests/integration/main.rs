//! Multi-run publish scenarios against the in-memory upstream and bucket.

mod dry_run;
mod multi_run;
mod partial_failure;
