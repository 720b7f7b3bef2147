use tracing::info;

/// Receives human-readable status lines while a run is in progress.
pub trait Progress {
    fn report(&mut self, message: &str);
}

impl<F: FnMut(&str)> Progress for F {
    fn report(&mut self, message: &str) {
        self(message)
    }
}

/// Forwards progress lines to the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&mut self, message: &str) {
        info!("{message}");
    }
}

/// Discards progress lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Progress for Silent {
    fn report(&mut self, _message: &str) {}
}
