//! Terminal output utilities: ANSI notes and the result card.

use meterlens_core::{AnalysisResult, OutputShape};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Errors go to stderr.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Result card
// ---------------------------------------------------------------------------

/// Render one labelled row per declared field. Unreadable fields are dimmed
/// when color is on.
pub fn render_result_card(result: &AnalysisResult, shape: &OutputShape) -> String {
    let color = supports_color();
    let width = shape
        .fields()
        .iter()
        .map(|f| f.label().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for field in shape.fields() {
        let value = result.get(*field).unwrap_or("");
        let value = if color && result.is_undetermined(*field) {
            format!("{DIM}{value}{RESET}")
        } else {
            value.to_string()
        };
        let label = format!("{:<width$}", field.label());
        if color {
            out.push_str(&format!("  {BOLD}{label}{RESET}  {value}\n"));
        } else {
            out.push_str(&format!("  {label}  {value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterlens_core::{MeterField, UNDETERMINED};

    /// Strip ANSI escape codes from a string.
    fn strip_ansi(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for next in chars.by_ref() {
                    if next == 'm' {
                        break;
                    }
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            meter_size: "15(45)A".into(),
            meter_type: "rotary-dial".into(),
            serial_number: UNDETERMINED.into(),
            reading: "0452.7".into(),
            meter_condition: "normal".into(),
            authority: Some("PEA".into()),
        }
    }

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn card_has_one_row_per_declared_field() {
        let card = strip_ansi(&render_result_card(&result(), &OutputShape::standard()));
        assert_eq!(card.lines().count(), 5);
        assert!(card.contains("0452.7"));
        assert!(card.contains(MeterField::Reading.label()));
        assert!(!card.contains("PEA"));
    }

    #[test]
    fn card_shows_authority_when_declared() {
        let card = strip_ansi(&render_result_card(&result(), &OutputShape::with_authority()));
        assert_eq!(card.lines().count(), 6);
        assert!(card.contains("PEA"));
        assert!(card.contains(UNDETERMINED));
    }
}
