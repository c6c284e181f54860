//! Fallback text conversion for parameters.
//!
//! Parameters registered without their own `to_text` / `from_text` closures
//! use a [`Formatter`]. Text never carries the unit; the parameter's label
//! is shown next to it by the UI, and both the label and the formatter's
//! [`unit`](Formatter::unit) are accepted as suffixes when parsing.
//!
//! ```ignore
//! let level = Formatter::Decibels { precision: 1, min_db: -60.0 };
//! assert_eq!(level.text(-6.0), "-6.0");
//! assert_eq!(level.text(-75.0), "-inf");
//! assert_eq!(level.parse("-inf dB"), Some(-60.0));
//!
//! let cutoff = Formatter::Frequency { precision: 1 };
//! assert_eq!(cutoff.text(2500.0), "2.5k");
//! assert_eq!(cutoff.parse("2.5 kHz"), Some(2500.0));
//! ```

/// Text used for levels below a decibel formatter's floor.
pub const NEG_INF_TEXT: &str = "-inf";

/// Display style of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formatter {
    /// Plain number.
    Float {
        /// Digits after the decimal point.
        precision: usize,
    },

    /// Level already expressed in dB; anything below `min_db` reads `-inf`.
    Decibels {
        /// Digits after the decimal point.
        precision: usize,
        /// Quietest level shown as a number.
        min_db: f64,
    },

    /// Frequency in Hz, switching to a `k` multiplier from 1 kHz up.
    Frequency {
        /// Digits after the decimal point.
        precision: usize,
    },

    /// A 0-1 proportion shown as 0-100.
    Percent {
        /// Digits after the decimal point.
        precision: usize,
    },

    /// On/off switch; values above one half are on.
    Boolean,
}

impl Formatter {
    /// Display text for a natural-unit value.
    pub fn text(&self, value: f64) -> String {
        match *self {
            Self::Float { precision } => fixed(value, precision),
            Self::Decibels { min_db, .. } if value < min_db => NEG_INF_TEXT.to_string(),
            Self::Decibels { precision, .. } => fixed(value, precision),
            Self::Frequency { precision } if value.abs() >= 1000.0 => {
                format!("{}k", fixed(value / 1000.0, precision))
            }
            Self::Frequency { precision } => fixed(value, precision),
            Self::Percent { precision } => fixed(value * 100.0, precision),
            Self::Boolean => (if value > 0.5 { "On" } else { "Off" }).to_string(),
        }
    }

    /// Natural-unit value for display text, or `None` if it doesn't parse.
    pub fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        let bare = strip_suffix_ignore_case(text, self.unit())
            .unwrap_or(text)
            .trim();

        match *self {
            Self::Float { .. } => number(bare),
            Self::Decibels { min_db, .. } => {
                if bare.eq_ignore_ascii_case(NEG_INF_TEXT) {
                    Some(min_db)
                } else {
                    number(bare)
                }
            }
            Self::Frequency { .. } => match strip_suffix_ignore_case(bare, "k") {
                Some(kilo) => number(kilo).map(|v| v * 1000.0),
                None => number(bare),
            },
            Self::Percent { .. } => number(bare).map(|v| v / 100.0),
            Self::Boolean => match bare.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Some(1.0),
                "off" | "false" | "no" | "0" => Some(0.0),
                _ => None,
            },
        }
    }

    /// Unit conventionally shown next to the text.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Decibels { .. } => "dB",
            Self::Frequency { .. } => "Hz",
            Self::Percent { .. } => "%",
            Self::Float { .. } | Self::Boolean => "",
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::Float { precision: 2 }
    }
}

fn fixed(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

fn number(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// `text` without `suffix`, compared ASCII case-insensitively.
pub(crate) fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() {
        return None;
    }
    let split = text.len().checked_sub(suffix.len())?;
    if text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(suffix) {
        Some(&text[..split])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_two_decimals() {
        let f = Formatter::default();
        assert_eq!(f.text(1.0), "1.00");
        assert_eq!(f.text(-0.5), "-0.50");
        assert_eq!(f.parse(" 0.25 "), Some(0.25));
        assert_eq!(f.parse("abc"), None);
        assert_eq!(f.unit(), "");
    }

    #[test]
    fn test_decibels() {
        let f = Formatter::Decibels {
            precision: 1,
            min_db: -60.0,
        };
        assert_eq!(f.text(6.0), "6.0");
        assert_eq!(f.text(-60.0), "-60.0");
        assert_eq!(f.text(-61.0), "-inf");
        assert_eq!(f.parse("-12 dB"), Some(-12.0));
        assert_eq!(f.parse("-12DB"), Some(-12.0));
        assert_eq!(f.parse("-INF"), Some(-60.0));
    }

    #[test]
    fn test_frequency() {
        let f = Formatter::Frequency { precision: 1 };
        assert_eq!(f.text(2500.0), "2.5k");
        assert_eq!(f.text(440.0), "440.0");
        assert_eq!(f.parse("2.5 kHz"), Some(2500.0));
        assert_eq!(f.parse("2K"), Some(2000.0));
        assert_eq!(f.parse("440hz"), Some(440.0));
        assert_eq!(f.parse("loud"), None);
    }

    #[test]
    fn test_percent() {
        let f = Formatter::Percent { precision: 0 };
        assert_eq!(f.text(0.75), "75");
        assert_eq!(f.parse("50%"), Some(0.5));
        assert_eq!(f.parse("12.5"), Some(0.125));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(Formatter::Boolean.text(1.0), "On");
        assert_eq!(Formatter::Boolean.text(0.2), "Off");
        assert_eq!(Formatter::Boolean.parse("OFF"), Some(0.0));
        assert_eq!(Formatter::Boolean.parse("maybe"), None);
    }

    #[test]
    fn test_strip_suffix_ignore_case() {
        assert_eq!(strip_suffix_ignore_case("10ms", "MS"), Some("10"));
        assert_eq!(strip_suffix_ignore_case("10", "ms"), None);
        assert_eq!(strip_suffix_ignore_case("10", ""), None);
        assert_eq!(strip_suffix_ignore_case("é", "x"), None);
    }
}
