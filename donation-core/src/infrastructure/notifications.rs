//! Notice sinks

use crate::application::ports::Notifier;
use crate::shared::types::{Notice, NoticeLevel};

/// Forwards notices to the log under the `donation_core::notices` target
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        let target = "donation_core::notices";
        match notice.level {
            NoticeLevel::Info => log::info!(target: target, "{}: {}", notice.title, notice.description),
            NoticeLevel::Warning => log::warn!(target: target, "{}: {}", notice.title, notice.description),
            NoticeLevel::Error => log::error!(target: target, "{}: {}", notice.title, notice.description),
        }
    }
}
