use colored::Colorize;
use std::time::Duration;

use fanout::{ExecutionReport, RunOptions};

/// Print the batch header
pub fn running(count: usize, options: &RunOptions) {
    if options.quiet {
        return;
    }
    println!(
        "{}",
        format!("running in {count} dirs ({})", options.mode_label()).bold()
    );
}

/// Print the end-of-batch summary line
pub fn summary(elapsed: Duration, report: &ExecutionReport, quiet: bool) {
    if quiet {
        return;
    }
    println!("{}", summary_line(elapsed, report));
}

/// List failed and abandoned directories on stderr
pub fn failures(report: &ExecutionReport) {
    for dir in &report.failed {
        eprintln!("  {} {}", "FAIL".red().bold(), dir.display());
    }
    for dir in &report.skipped {
        eprintln!("  {} {}", "SKIP".yellow(), dir.display());
    }
}

/// Print the cancellation notice
pub fn cancelled() {
    eprintln!("{}", "cancelled".yellow());
}

/// Print the `--dirty` empty-result notice
pub fn nothing_dirty() {
    println!("{}", "nothing dirty".dimmed());
}

// ============================================================================
// Formatting
// ============================================================================

/// `done in <elapsed>: <ok> ok, <failed> failed[, <skipped> skipped]`
pub fn summary_line(elapsed: Duration, report: &ExecutionReport) -> String {
    let mut line = format!(
        "done in {}: {} ok, {} failed",
        format_elapsed(elapsed),
        report.succeeded,
        report.failed.len()
    );
    if !report.skipped.is_empty() {
        line.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    line
}

/// Format elapsed time for humans
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0ms");
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m05s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h02m05s");
    }

    #[test]
    fn test_summary_line() {
        let report = ExecutionReport {
            succeeded: 2,
            failed: vec![PathBuf::from("/b")],
            ..Default::default()
        };
        assert_eq!(
            summary_line(Duration::from_millis(40), &report),
            "done in 40ms: 2 ok, 1 failed"
        );
    }

    #[test]
    fn test_summary_line_with_skipped() {
        let report = ExecutionReport {
            succeeded: 1,
            skipped: vec![PathBuf::from("/c"), PathBuf::from("/d")],
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(
            summary_line(Duration::from_millis(5), &report),
            "done in 5ms: 1 ok, 0 failed, 2 skipped"
        );
    }
}
