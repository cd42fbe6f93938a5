//! User interruption of long-running commands
//!
//! Ctrl-C always cancels. When stdout is an interactive terminal, pressing
//! `q` or Escape cancels too.

use console::{Key, Term};
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Whether a keypress asks to stop
pub fn is_quit_key(key: &Key) -> bool {
    matches!(key, Key::Char('q') | Key::Char('Q') | Key::Escape)
}

/// Cancel `token` on Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    debug!("Received Ctrl-C");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

/// Active keypress listener
///
/// Dropping it cancels the token and writes back the terminal attributes
/// saved before the reader thread started, so a read left in raw mode
/// cannot outlive the command.
#[must_use = "dropping the listener stops it immediately"]
pub struct KeypressListener {
    token: CancellationToken,
    #[cfg(unix)]
    _restore: Option<tty::TerminalRestore>,
}

impl Drop for KeypressListener {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Cancel `token` on `q`, Escape or Ctrl-C
///
/// Key reading blocks, so it runs on a detached thread. Keep the returned
/// listener alive for as long as keys should be read.
pub fn cancel_on_keypress(token: CancellationToken) -> KeypressListener {
    cancel_on_ctrl_c(token.clone());

    let term = Term::stdout();
    if !term.is_term() {
        return KeypressListener {
            token,
            #[cfg(unix)]
            _restore: None,
        };
    }

    #[cfg(unix)]
    let restore = tty::TerminalRestore::capture_controlling();

    let reader_token = token.clone();
    std::thread::spawn(move || loop {
        if reader_token.is_cancelled() {
            break;
        }
        match term.read_key() {
            Ok(key) if is_quit_key(&key) => {
                debug!("Quit key pressed");
                reader_token.cancel();
                break;
            }
            Ok(_) => {}
            // Ctrl-C while the terminal is in raw mode
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                reader_token.cancel();
                break;
            }
            Err(e) => {
                debug!("Stopped listening for keys: {}", e);
                break;
            }
        }
    });

    KeypressListener {
        token,
        #[cfg(unix)]
        _restore: restore,
    }
}

#[cfg(unix)]
mod tty {
    use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
    use std::fs::File;
    use std::os::fd::{AsFd, OwnedFd};
    use tracing::debug;

    /// Terminal attributes written back on drop
    pub struct TerminalRestore {
        fd: OwnedFd,
        saved: Termios,
    }

    impl TerminalRestore {
        /// `None` when `fd` is not a terminal
        pub fn capture(fd: impl AsFd) -> Option<Self> {
            let fd = fd.as_fd().try_clone_to_owned().ok()?;
            let saved = tcgetattr(&fd).ok()?;
            Some(Self { fd, saved })
        }

        /// The terminal keys are read from: stdin, or `/dev/tty` when stdin is redirected
        pub fn capture_controlling() -> Option<Self> {
            Self::capture(std::io::stdin()).or_else(|| {
                File::open("/dev/tty")
                    .ok()
                    .and_then(|tty| Self::capture(&tty))
            })
        }
    }

    impl Drop for TerminalRestore {
        fn drop(&mut self) {
            if let Err(e) = tcsetattr(&self.fd, SetArg::TCSANOW, &self.saved) {
                debug!("Could not restore terminal attributes: {}", e);
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&Key::Char('q')));
        assert!(is_quit_key(&Key::Char('Q')));
        assert!(is_quit_key(&Key::Escape));
        assert!(!is_quit_key(&Key::Char('x')));
        assert!(!is_quit_key(&Key::Enter));
    }

    #[tokio::test]
    async fn test_dropping_keypress_listener_cancels() {
        let token = CancellationToken::new();
        {
            let _listener = cancel_on_keypress(token.clone());
            assert!(!token.is_cancelled());
        }
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_listener_exits_with_token() {
        let token = CancellationToken::new();
        cancel_on_ctrl_c(token.clone());
        token.cancel();
        tokio::task::yield_now().await;
        assert!(token.is_cancelled());
    }
}
