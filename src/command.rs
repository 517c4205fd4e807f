use std::collections::VecDeque;

const LINE_TERMINATOR: &str = "\r\n";

/// Ordered, single-flight dispatcher state for outbound commands.
///
/// [`CommandQueue::submit`] returns the framed line to write now, or parks
/// it behind the write already in flight; [`CommandQueue::complete`] is the
/// send-completion hook that hands back the next pending line. Exactly one
/// write is outstanding at any instant and submission order is preserved on
/// the wire. The supervisor task is the only caller, which serializes access.
pub(crate) struct CommandQueue {
    pending: VecDeque<String>,
    in_flight: bool,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: false,
        }
    }

    /// Frame `body` with the protocol terminator and either return it for
    /// immediate transmission or queue it. Commands submitted while not
    /// connected, or with an empty body, are dropped entirely.
    pub fn submit(&mut self, connected: bool, body: &str) -> Option<String> {
        if !connected || body.is_empty() {
            return None;
        }
        let line = format!("{body}{LINE_TERMINATOR}");
        if self.in_flight {
            self.pending.push_back(line);
            None
        } else {
            self.in_flight = true;
            Some(line)
        }
    }

    /// Send-completion: pop the next pending line (staying in flight) or
    /// clear the in-flight flag.
    pub fn complete(&mut self) -> Option<String> {
        match self.pending.pop_front() {
            Some(line) => Some(line),
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    /// Drop all pending commands and the in-flight flag. Called on session
    /// loss so stale commands never replay into a new connection.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.in_flight = false;
    }
}
