//! Presentation-layer boundary.
//!
//! The core never assumes a particular UI technology; it reports progress,
//! asks for confirmation, and surfaces messages through this trait. The
//! launcher binary provides a console implementation, a GUI would provide
//! its own.

/// Callbacks the core invokes at well-defined points.
///
/// Implementations must be cheap and non-blocking where possible; `confirm`
/// is the one call that may wait on the user.
pub trait Frontend: Send + Sync {
    /// Signals the start (`true`) and end (`false`) of an install
    /// transaction. The core guarantees exactly one `false` per `true`,
    /// regardless of how the transaction exits.
    fn update_in_progress(&self, in_progress: bool);

    /// Asks the user a yes/no question. Returning `false` declines.
    fn confirm(&self, message: &str) -> bool;

    /// Reports a user-visible failure.
    fn report_error(&self, message: &str);

    /// Reports a user-visible informational message.
    fn report_info(&self, message: &str);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::Frontend;

    /// Records every callback for assertions.
    pub struct RecordingFrontend {
        confirm_reply: bool,
        pub progress: Mutex<Vec<bool>>,
        pub prompts: Mutex<Vec<String>>,
        pub errors: Mutex<Vec<String>>,
        pub infos: Mutex<Vec<String>>,
    }

    impl RecordingFrontend {
        pub fn new(confirm_reply: bool) -> Self {
            Self {
                confirm_reply,
                progress: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
                errors: Mutex::new(Vec::new()),
                infos: Mutex::new(Vec::new()),
            }
        }
    }

    impl Frontend for RecordingFrontend {
        fn update_in_progress(&self, in_progress: bool) {
            self.progress.lock().unwrap().push(in_progress);
        }

        fn confirm(&self, message: &str) -> bool {
            self.prompts.lock().unwrap().push(message.to_string());
            self.confirm_reply
        }

        fn report_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn report_info(&self, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
        }
    }
}
