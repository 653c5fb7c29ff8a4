use std::time::Duration;

/// Consecutive reconnects before a session is given up on.
pub const MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Ignore,
    Reconnect(Duration),
    Teardown,
}

/// Picks what to do after the voice websocket for a guild closed.
pub fn recovery_for(code: u16, reason: &str, by_remote: bool) -> Recovery {
    match code {
        // disconnected: kicked, or the channel was deleted
        4014 => Recovery::Teardown,
        // voice server crashed
        4015 => Recovery::Reconnect(Duration::from_secs(1)),
        // session no longer valid / timed out
        4006 | 4009 => Recovery::Reconnect(Duration::from_secs(3)),
        1000 if !by_remote => Recovery::Ignore,
        _ if reason.to_ascii_lowercase().contains("timed out") => {
            Recovery::Reconnect(Duration::from_secs(3))
        }
        _ => Recovery::Reconnect(Duration::from_secs(5)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kicked_tears_down() {
        assert_eq!(recovery_for(4014, "Disconnected.", true), Recovery::Teardown);
    }

    #[test]
    fn crash_reconnects_fast() {
        assert_eq!(
            recovery_for(4015, "Voice server crashed", true),
            Recovery::Reconnect(Duration::from_secs(1))
        );
    }

    #[test]
    fn session_errors_and_timeouts_share_a_delay() {
        let three = Recovery::Reconnect(Duration::from_secs(3));
        assert_eq!(recovery_for(4006, "Session is no longer valid.", true), three);
        assert_eq!(recovery_for(4009, "Session timeout.", true), three);
        assert_eq!(recovery_for(1006, "Connection Timed Out", true), three);
    }

    #[test]
    fn local_normal_close_is_ignored() {
        assert_eq!(recovery_for(1000, "", false), Recovery::Ignore);
        assert_eq!(
            recovery_for(1000, "", true),
            Recovery::Reconnect(Duration::from_secs(5))
        );
    }

    #[test]
    fn unknown_codes_use_default_delay() {
        assert_eq!(
            recovery_for(4000, "Unknown error", true),
            Recovery::Reconnect(Duration::from_secs(5))
        );
    }
}
