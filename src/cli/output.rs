//! Output formatting module for Topogen
//!
//! Command messages go to the terminal, colored or as JSON lines. Library
//! diagnostics go through `tracing` instead.

use colored::Colorize;
use std::io::{self, Write};
use std::time::Instant;

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    fn json_line(kind: &str, message: &str) -> String {
        serde_json::json!({"type": kind, "message": message}).to_string()
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            eprintln!("{}", Self::json_line("error", message));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            eprintln!("{}", Self::json_line("warning", message));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.json_mode {
            println!("{}", Self::json_line("info", message));
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a success line (always shown)
    pub fn success(&self, message: &str) {
        if self.json_mode {
            println!("{}", Self::json_line("success", message));
            return;
        }

        let elapsed = self.start_time.elapsed();
        if self.use_color {
            println!("{} {} ({:.2?})", "OK:".green().bold(), message, elapsed);
        } else {
            println!("OK: {} ({:.2?})", message, elapsed);
        }
    }

    /// Print a list of items
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            let list = serde_json::json!({
                "type": "list",
                "title": title,
                "items": items
            });
            println!("{}", list);
            return;
        }

        if self.verbosity < 1 {
            return;
        }

        if self.use_color {
            println!("\n{}:", title.bright_white().bold());
        } else {
            println!("\n{}:", title);
        }

        for item in items {
            if self.use_color {
                println!("  {} {}", "-".bright_black(), item);
            } else {
                println!("  - {}", item);
            }
        }
    }

    /// Print raw document text to stdout, unaffected by output mode
    pub fn document(&self, text: &str) {
        println!("{}", text);
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
