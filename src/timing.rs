//! Stage timing.

use std::time::{Duration, Instant};

/// Wall-clock timer for one pipeline stage.
pub struct Timer {
    stage: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(stage: &'static str) -> Self {
        log::debug!("stage {} started", stage);
        Self {
            stage,
            start: Instant::now(),
        }
    }

    /// Print `[elapsed] stage` and return the elapsed time.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        println!("  [{}] {}", format_elapsed(elapsed), self.stage);
        elapsed
    }
}

/// `12.3s` below a minute, `2.5m` from there on.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1300)), "1.3s");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59.0s");
        assert_eq!(format_elapsed(Duration::from_secs(150)), "2.5m");
    }
}
