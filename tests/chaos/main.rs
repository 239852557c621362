//! Publishing under injected latency, failures and CDN quotas.

mod faulty_storage;
mod purge_quota;
