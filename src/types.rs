// src/types.rs

use std::str::FromStr;
use std::time::Duration;

use owo_colors::AnsiColors;
use serde::Deserialize;

/// What happens when one service runs out of restart attempts.
///
/// - `StopService`: only that service's supervision loop ends; every other
///   service keeps running (default).
/// - `ShutdownAll`: the exhausted service fires the global shutdown and the
///   whole supervisor winds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    #[default]
    StopService,
    ShutdownAll,
}

impl FromStr for ExhaustionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop_service" => Ok(ExhaustionPolicy::StopService),
            "shutdown_all" => Ok(ExhaustionPolicy::ShutdownAll),
            other => Err(format!(
                "invalid on_exhaustion: {other} (expected \"stop_service\" or \"shutdown_all\")"
            )),
        }
    }
}

/// Colour used to tag a service's output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl DisplayColor {
    /// Colours handed out, in order, to services that don't name one.
    pub const PALETTE: [DisplayColor; 6] = [
        DisplayColor::Cyan,
        DisplayColor::Green,
        DisplayColor::Yellow,
        DisplayColor::Magenta,
        DisplayColor::Blue,
        DisplayColor::Red,
    ];

    /// Palette entry for the `index`-th service (wraps around).
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn ansi(self) -> AnsiColors {
        match self {
            DisplayColor::Red => AnsiColors::Red,
            DisplayColor::Green => AnsiColors::Green,
            DisplayColor::Yellow => AnsiColors::Yellow,
            DisplayColor::Blue => AnsiColors::Blue,
            DisplayColor::Magenta => AnsiColors::Magenta,
            DisplayColor::Cyan => AnsiColors::Cyan,
            DisplayColor::White => AnsiColors::White,
        }
    }
}

impl FromStr for DisplayColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(DisplayColor::Red),
            "green" => Ok(DisplayColor::Green),
            "yellow" => Ok(DisplayColor::Yellow),
            "blue" => Ok(DisplayColor::Blue),
            "magenta" => Ok(DisplayColor::Magenta),
            "cyan" => Ok(DisplayColor::Cyan),
            "white" => Ok(DisplayColor::White),
            other => Err(format!("unknown color '{other}'")),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
