// Shared support modules

pub(crate) mod tracing;

pub(crate) use self::tracing::{DEFAULT_LOG_LEVEL, init_tracing};
