//! Identifier formatting
//!
//! A format template is parsed once, when a prefix configuration is
//! written, into one of a small closed set of shapes. Issuance then
//! renders without re-parsing. Rendering is pure: no I/O, no failure —
//! templates that cannot be rendered are rejected at config-update time.

use chrono::{DateTime, Datelike, Utc};
use shared::models::PrefixConfig;
use std::fmt::Write;

/// One piece of a tokenized template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `%s`
    Str,
    /// `%d`
    Int,
    /// `%0Nd`
    Padded(usize),
}

/// A parsed format template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdTemplate {
    /// One integer slot with explicit width: `SG%06d`
    Padded {
        head: String,
        width: usize,
        tail: String,
    },
    /// Prefix then padded counter: `%s%06d`
    PrefixPadded {
        head: String,
        mid: String,
        width: usize,
        tail: String,
    },
    /// Four-digit year then padded counter: `INV%d-%04d`
    YearPadded {
        head: String,
        mid: String,
        width: usize,
        tail: String,
    },
    /// Any other arrangement: `<prefix><counter zero-padded to padding_length>`
    Fallback,
}

impl IdTemplate {
    /// Parse a template into its shape. Never fails: unrecognized
    /// arrangements render through the fallback.
    pub fn parse(template: &str) -> Self {
        let segments = tokenize(template);
        classify(&segments)
    }

    /// Validate a template for storage: it must carry at least one
    /// integer placeholder (the counter slot).
    pub fn validate(template: &str) -> Result<Self, String> {
        let segments = tokenize(template);
        let has_counter = segments
            .iter()
            .any(|s| matches!(s, Segment::Int | Segment::Padded(_)));
        if !has_counter {
            return Err(format!(
                "template {template:?} has no integer placeholder for the counter"
            ));
        }
        if segments.iter().any(|s| matches!(s, Segment::Padded(0))) {
            return Err(format!("template {template:?} declares a zero pad width"));
        }
        Ok(classify(&segments))
    }

    /// Render the identifier for one counter value.
    pub fn render(&self, config: &PrefixConfig, counter: i64, now: DateTime<Utc>) -> String {
        let mut out = String::with_capacity(16);
        match self {
            Self::Padded { head, width, tail } => {
                out.push_str(head);
                let _ = write!(out, "{counter:0width$}", width = *width);
                out.push_str(tail);
            }
            Self::PrefixPadded {
                head,
                mid,
                width,
                tail,
            } => {
                out.push_str(head);
                out.push_str(&config.prefix);
                out.push_str(mid);
                let _ = write!(out, "{counter:0width$}", width = *width);
                out.push_str(tail);
            }
            Self::YearPadded {
                head,
                mid,
                width,
                tail,
            } => {
                out.push_str(head);
                let _ = write!(out, "{}", now.year());
                out.push_str(mid);
                let _ = write!(out, "{counter:0width$}", width = *width);
                out.push_str(tail);
            }
            Self::Fallback => {
                out.push_str(&config.prefix);
                let width = config.padding_length.max(0) as usize;
                let _ = write!(out, "{counter:0width$}");
            }
        }
        out
    }
}

fn tokenize(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                flush(&mut segments, &mut literal);
                segments.push(Segment::Str);
            }
            Some('d') => {
                chars.next();
                flush(&mut segments, &mut literal);
                segments.push(Segment::Int);
            }
            Some('0') => {
                // `%0Nd` — zero flag, decimal width, `d`. Anything else
                // falls back to literal text.
                let mut lookahead = chars.clone();
                lookahead.next();
                let mut digits = String::new();
                while let Some(d) = lookahead.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(*d);
                    lookahead.next();
                }
                if lookahead.peek() == Some(&'d') {
                    lookahead.next();
                    chars = lookahead;
                    flush(&mut segments, &mut literal);
                    let width = digits.parse().unwrap_or(0);
                    segments.push(Segment::Padded(width));
                } else {
                    literal.push(c);
                }
            }
            _ => literal.push(c),
        }
    }
    flush(&mut segments, &mut literal);
    segments
}

fn flush(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn classify(segments: &[Segment]) -> IdTemplate {
    // Strip literals into positional slots around the placeholders.
    let placeholders: Vec<&Segment> = segments
        .iter()
        .filter(|s| !matches!(s, Segment::Literal(_)))
        .collect();

    let lit = |idx: usize| -> String {
        // Literal text between placeholder idx-1 and idx (0 = leading).
        let mut seen = 0usize;
        let mut out = String::new();
        for seg in segments {
            match seg {
                Segment::Literal(text) if seen == idx => out.push_str(text),
                Segment::Literal(_) => {}
                _ => seen += 1,
            }
        }
        out
    };

    match placeholders.as_slice() {
        [Segment::Padded(width)] => IdTemplate::Padded {
            head: lit(0),
            width: *width,
            tail: lit(1),
        },
        [Segment::Str, Segment::Padded(width)] => IdTemplate::PrefixPadded {
            head: lit(0),
            mid: lit(1),
            width: *width,
            tail: lit(2),
        },
        [Segment::Int, Segment::Padded(width)] => IdTemplate::YearPadded {
            head: lit(0),
            mid: lit(1),
            width: *width,
            tail: lit(2),
        },
        _ => IdTemplate::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::models::ResetRule;

    fn config(prefix: &str, padding: i32, template: &str) -> PrefixConfig {
        PrefixConfig {
            prefix: prefix.into(),
            padding_length: padding,
            format_template: template.into(),
            reset_rule: ResetRule::Never,
            last_reset_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            updated_by: None,
        }
    }

    fn at_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_padded_literal_shape() {
        let cfg = config("PFX", 6, "PFX%06d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert!(matches!(tpl, IdTemplate::Padded { .. }));
        assert_eq!(tpl.render(&cfg, 42, at_2025()), "PFX000042");
    }

    #[test]
    fn test_prefix_padded_shape() {
        let cfg = config("SG", 6, "%s%06d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert!(matches!(tpl, IdTemplate::PrefixPadded { .. }));
        assert_eq!(tpl.render(&cfg, 1, at_2025()), "SG000001");
    }

    #[test]
    fn test_year_padded_shape() {
        let cfg = config("INV", 4, "INV%d-%04d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert!(matches!(tpl, IdTemplate::YearPadded { .. }));
        assert_eq!(tpl.render(&cfg, 43, at_2025()), "INV2025-0043");
    }

    #[test]
    fn test_fallback_shape() {
        let cfg = config("SG", 8, "%d%d%d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert_eq!(tpl, IdTemplate::Fallback);
        assert_eq!(tpl.render(&cfg, 7, at_2025()), "SG00000007");
    }

    #[test]
    fn test_counter_wider_than_pad() {
        let cfg = config("SG", 4, "%s%04d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        // Wider counters keep all their digits instead of truncating.
        assert_eq!(tpl.render(&cfg, 123_456, at_2025()), "SG123456");
    }

    #[test]
    fn test_trailing_literal() {
        let cfg = config("PO", 4, "%s-%04d/X");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert_eq!(tpl.render(&cfg, 9, at_2025()), "PO-0009/X");
    }

    #[test]
    fn test_validate_rejects_no_counter_slot() {
        assert!(IdTemplate::validate("SG-fixed").is_err());
        assert!(IdTemplate::validate("%s").is_err());
        assert!(IdTemplate::validate("%s%06d").is_ok());
        assert!(IdTemplate::validate("INV%d-%04d").is_ok());
        assert!(IdTemplate::validate("SG%06d").is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        assert!(IdTemplate::validate("%s%0d").is_err());
    }

    #[test]
    fn test_unrecognized_escape_is_literal() {
        let cfg = config("SG", 6, "A%x%06d");
        let tpl = IdTemplate::parse(&cfg.format_template);
        assert_eq!(tpl.render(&cfg, 5, at_2025()), "A%x000005");
    }
}
