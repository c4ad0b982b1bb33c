use log::SetLoggerError;

/// Install `env_logger` as the logger of the process, filtering at `info` unless `RUST_LOG`
/// says otherwise. Without the `builtin_env_logger` feature this does nothing, and the VM
/// is expected to install a logger of its own.
///
/// Fails if the process already has a logger.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
        } else {
            Ok(())
        }
    }
}
