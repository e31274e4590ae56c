use std::path::Path;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use crate::{SphereError, SphereResult};

/// Route the `log` records of every crate to stderr through `env_logger`, or
/// with `log_dir` set, to a daily rolling file. The returned guard flushes
/// the file writer on drop and must be held for the life of the process
pub fn init(log_dir: Option<&Path>) -> SphereResult<Option<WorkerGuard>> {
    let Some(dir) = log_dir else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()
            .map_err(|e| SphereError::Logging(format!("{e:}")))?;
        return Ok(None);
    };

    LogTracer::init().map_err(|e| SphereError::Logging(format!("{e:}")))?;

    let log = rolling::daily(dir, "sphered");
    let (nb, guard) = tracing_appender::non_blocking(log);

    let sub = FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(nb)
        .finish();

    tracing::subscriber::set_global_default(sub)
        .map_err(|e| SphereError::Logging(format!("{e:}")))?;

    Ok(Some(guard))
}
