//! Keep `^C` from being echoed while the interactive prompt is up.

/// Clears the terminal's ECHOCTL flag on stdin for as long as it lives and
/// puts the original settings back on drop, including on unwinding.
pub struct EchoCtlGuard {
    #[cfg(unix)]
    saved: Option<libc::termios>,
}

impl EchoCtlGuard {
    /// Does nothing when stdin is not a terminal.
    #[cfg(unix)]
    pub fn new() -> Self {
        Self {
            saved: disable_echoctl(),
        }
    }

    #[cfg(not(unix))]
    pub fn new() -> Self {
        Self {}
    }

    pub fn active(&self) -> bool {
        #[cfg(unix)]
        {
            self.saved.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl Default for EchoCtlGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn disable_echoctl() -> Option<libc::termios> {
    // SAFETY: termios is plain old data; tcgetattr fills it or fails.
    let mut attrs: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut attrs) } != 0 {
        return None;
    }
    let saved = attrs;
    attrs.c_lflag &= !libc::ECHOCTL;
    if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &attrs) } != 0 {
        tracing::debug!("could not clear ECHOCTL");
        return None;
    }
    Some(saved)
}

impl Drop for EchoCtlGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(saved) = self.saved.take() {
            // SAFETY: restores attributes previously read from the same fd.
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &saved);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_harmless_without_a_terminal() {
        // Under the test harness stdin is usually not a tty; either way the
        // guard must construct and drop cleanly.
        let guard = EchoCtlGuard::new();
        let _ = guard.active();
        drop(guard);
    }
}
