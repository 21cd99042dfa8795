//! Console collaborators for the command-line front end.

use std::io::{self, BufRead, IsTerminal, Write};

use log::debug;

use crate::notify::{Notice, Notifier};
use crate::recorder::ConfirmPrompt;

/// Asks on stderr and reads one line from stdin. Anything but `y`/`yes` is a no,
/// and so is a stdin that is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, question: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }
        eprint!("{question} [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match stdin.lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// The command's own result already carries any error, so error notices are
/// only logged. Success and info notices are echoed when `verbose` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier {
    pub verbose: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Error(message) => debug!("error notice: {message}"),
            other if self.verbose => eprintln!("{}", other.message()),
            _ => {}
        }
    }
}
