/// User-facing notification surface.
pub trait Modal {
    fn open(&mut self, message: &str);
}

impl<F: FnMut(&str)> Modal for F {
    fn open(&mut self, message: &str) {
        self(message)
    }
}

/// Headless [`Modal`] that writes notices to the log.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogModal;

impl Modal for LogModal {
    fn open(&mut self, message: &str) {
        log::info!("{}", message);
    }
}
