//! Console implementation of the core's frontend callbacks.

use std::io::{self, BufRead, Write};

use matcha_core::Frontend;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, info};

/// Frontend that prompts and reports on the terminal.
pub struct ConsoleFrontend {
    assume_yes: bool,
}

impl ConsoleFrontend {
    /// `assume_yes` answers every confirmation prompt affirmatively.
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

fn read_reply() -> bool {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    parse_reply(&line)
}

fn parse_reply(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

impl Frontend for ConsoleFrontend {
    fn update_in_progress(&self, in_progress: bool) {
        if in_progress {
            println!("Downloading and installing update...");
        } else {
            println!("Update transaction finished.");
        }
    }

    fn confirm(&self, message: &str) -> bool {
        println!("{message}");
        if self.assume_yes {
            println!("[y/N] y (assumed)");
            return true;
        }

        print!("[y/N] ");
        let _ = io::stdout().flush();

        // The stdin read blocks until the user answers; keep it off the
        // async workers when a multi-thread runtime is driving us.
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(read_reply)
            }
            _ => read_reply(),
        }
    }

    fn report_error(&self, message: &str) {
        error!("{message}");
        eprintln!("Error: {message}");
    }

    fn report_info(&self, message: &str) {
        info!("{message}");
        println!("{message}");
    }
}
