use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the logging pipeline alive.
///
/// Dropping the handle flushes the file sink, so the binary holds it until
/// the broker has exited.
pub struct LoggingHandle {
    _file_guard: Option<WorkerGuard>,
    installed: bool,
}

impl LoggingHandle {
    pub(crate) fn new(
        file_guard: Option<WorkerGuard>,
        installed: bool,
    ) -> Self {
        Self {
            _file_guard: file_guard,
            installed,
        }
    }

    /// `false` when another global subscriber was already in place and this
    /// call left it untouched.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("installed", &self.installed)
            .field("file_sink", &self._file_guard.is_some())
            .finish()
    }
}
