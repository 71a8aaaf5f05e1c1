//! Shared terminal output helpers.

use std::time::Duration;

use anyhow::Result;
use refit_ops::FailedEntry;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print failed entries, one per line.
pub fn print_failures(failed: &[FailedEntry]) {
    for entry in failed {
        println!("   • {:<32} [{}] {}", entry.component, entry.kind, entry.error);
    }
}

/// Format milliseconds as `850 ms` or `12.3 s`.
pub fn millis(ms: u64) -> String {
    if ms < 1000 {
        format!("{} ms", ms)
    } else {
        format!("{:.1} s", ms as f64 / 1000.0)
    }
}

/// Coarse "time ago" rendering.
pub fn ago(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Join cycle members as `A → B → A`.
pub fn cycle_path<T: std::fmt::Display>(cycle: &[T]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|c| c.to_string()).collect();
    if let Some(first) = parts.first().cloned() {
        parts.push(first);
    }
    parts.join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis() {
        assert_eq!(millis(850), "850 ms");
        assert_eq!(millis(12_345), "12.3 s");
    }

    #[test]
    fn test_ago() {
        assert_eq!(ago(Duration::from_secs(5)), "5s ago");
        assert_eq!(ago(Duration::from_secs(125)), "2m ago");
        assert_eq!(ago(Duration::from_secs(7200)), "2h ago");
        assert_eq!(ago(Duration::from_secs(172_800)), "2d ago");
    }

    #[test]
    fn test_cycle_path_closes_the_loop() {
        assert_eq!(cycle_path(&["A", "B"]), "A → B → A");
        assert_eq!(cycle_path::<&str>(&[]), "");
    }
}
