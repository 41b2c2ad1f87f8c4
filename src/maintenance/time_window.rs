//! Maintenance time windows
//!
//! Begin and end are `HHMMSS+ZZZZ` (or `-ZZZZ`) times of day. Windows may wrap
//! midnight and must last between 30 minutes and 6 hours.

use chrono::{DateTime, Timelike, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::apis::common::MaintenanceTimeWindow;
use crate::error::{Error, Result};

const DAY_SECS: i64 = 24 * 3600;

/// Shortest allowed window
pub const MIN_WINDOW_SECS: i64 = 30 * 60;

/// Longest allowed window
pub const MAX_WINDOW_SECS: i64 = 6 * 3600;

/// Hours (UTC) at which default windows may start
const DEFAULT_BEGIN_HOURS: [u32; 7] = [22, 23, 0, 1, 2, 3, 4];

/// A parsed time of day with its UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Offset east of UTC in seconds
    pub offset_secs: i32,
}

impl TimeOfDay {
    /// Parse `HHMMSS+ZZZZ`
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidTimeWindow(format!("{:?}: {}", s, why));
        if s.len() != 11 || !s.is_ascii() {
            return Err(invalid("expected format HHMMSS+ZZZZ"));
        }
        let digits = |range: std::ops::Range<usize>| -> Result<u32> {
            let part = &s[range];
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("non-digit in time"));
            }
            part.parse::<u32>().map_err(|_| invalid("non-digit in time"))
        };

        let hour = digits(0..2)?;
        let minute = digits(2..4)?;
        let second = digits(4..6)?;
        let sign = match &s[6..7] {
            "+" => 1,
            "-" => -1,
            _ => return Err(invalid("missing zone sign")),
        };
        let zone_hours = digits(7..9)?;
        let zone_minutes = digits(9..11)?;

        if hour > 23 || minute > 59 || second > 59 {
            return Err(invalid("time out of range"));
        }
        if zone_hours > 14 || zone_minutes > 59 {
            return Err(invalid("zone out of range"));
        }

        Ok(Self {
            hour,
            minute,
            second,
            offset_secs: sign * (zone_hours * 3600 + zone_minutes * 60) as i32,
        })
    }

    /// Seconds after midnight UTC
    pub fn utc_seconds(&self) -> i64 {
        let local = (self.hour * 3600 + self.minute * 60 + self.second) as i64;
        (local - self.offset_secs as i64).rem_euclid(DAY_SECS)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_secs < 0 { '-' } else { '+' };
        let offset = self.offset_secs.unsigned_abs();
        write!(
            f,
            "{:02}{:02}{:02}{}{:02}{:02}",
            self.hour,
            self.minute,
            self.second,
            sign,
            offset / 3600,
            (offset % 3600) / 60
        )
    }
}

/// A validated maintenance window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// Parse both ends without checking the duration
    pub fn parse(begin: &str, end: &str) -> Result<Self> {
        Ok(Self {
            begin: TimeOfDay::parse(begin)?,
            end: TimeOfDay::parse(end)?,
        })
    }

    /// Parse and validate an API window
    pub fn from_api(window: &MaintenanceTimeWindow) -> Result<Self> {
        let parsed = Self::parse(&window.begin, &window.end)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Length of the window; wraps midnight when end is before begin
    pub fn duration_secs(&self) -> i64 {
        (self.end.utc_seconds() - self.begin.utc_seconds()).rem_euclid(DAY_SECS)
    }

    /// Check the 30 minute to 6 hour bounds
    pub fn validate(&self) -> Result<()> {
        let duration = self.duration_secs();
        if !(MIN_WINDOW_SECS..=MAX_WINDOW_SECS).contains(&duration) {
            return Err(Error::InvalidTimeWindow(format!(
                "window {} - {} lasts {} minutes, must be between {} and {} minutes",
                self.begin,
                self.end,
                duration / 60,
                MIN_WINDOW_SECS / 60,
                MAX_WINDOW_SECS / 60
            )));
        }
        Ok(())
    }

    /// Whether `now` falls into the window; the end is exclusive
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let t = now.num_seconds_from_midnight() as i64;
        let begin = self.begin.utc_seconds();
        let end = self.end.utc_seconds();
        if begin <= end {
            begin <= t && t < end
        } else {
            t >= begin || t < end
        }
    }

    /// Deterministic one-hour window for an object without one.
    ///
    /// The start hour is chosen from 22:00 to 04:00 UTC by a hash of `seed`,
    /// which should be the object's UID (or name when there is none).
    pub fn default_for(seed: &str) -> Self {
        let index = (stable_hash(seed.as_bytes()) % DEFAULT_BEGIN_HOURS.len() as u64) as usize;
        let hour = DEFAULT_BEGIN_HOURS[index];
        let at = |hour: u32| TimeOfDay {
            hour,
            minute: 0,
            second: 0,
            offset_secs: 0,
        };
        Self {
            begin: at(hour),
            end: at((hour + 1) % 24),
        }
    }

    /// API representation of the window
    pub fn to_api(&self) -> MaintenanceTimeWindow {
        MaintenanceTimeWindow {
            begin: self.begin.to_string(),
            end: self.end.to_string(),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

/// First eight bytes of the SHA-256 digest; stable across platforms and releases
fn stable_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        let t = TimeOfDay::parse("220000+0100").unwrap();
        assert_eq!(t.utc_seconds(), 21 * 3600);
        assert_eq!(t.to_string(), "220000+0100");

        let t = TimeOfDay::parse("010000-0230").unwrap();
        assert_eq!(t.utc_seconds(), 3 * 3600 + 30 * 60);

        for bad in ["22000+0100", "250000+0000", "220000*0100", "22a000+0000", "220000+1500"] {
            assert_matches!(TimeOfDay::parse(bad), Err(Error::InvalidTimeWindow(_)), "{bad}");
        }
    }

    #[test]
    fn test_window_bounds() {
        assert!(TimeWindow::parse("220000+0000", "230000+0000").unwrap().validate().is_ok());
        assert!(TimeWindow::parse("220000+0000", "222959+0000").unwrap().validate().is_err());
        assert!(TimeWindow::parse("220000+0000", "040000+0000").unwrap().validate().is_ok());
        assert!(TimeWindow::parse("220000+0000", "040001+0000").unwrap().validate().is_err());
        assert!(TimeWindow::parse("220000+0000", "220000+0000").unwrap().validate().is_err());
    }

    #[test]
    fn test_contains_wraps_midnight() {
        let window = TimeWindow::parse("230000+0000", "010000+0000").unwrap();
        assert!(window.contains(at(23, 30)));
        assert!(window.contains(at(0, 59)));
        assert!(!window.contains(at(1, 0)));
        assert!(!window.contains(at(22, 59)));

        let plain = TimeWindow::parse("030000+0200", "040000+0200").unwrap();
        assert!(plain.contains(at(1, 15)));
        assert!(!plain.contains(at(3, 15)));
    }

    #[test]
    fn test_default_window_is_stable() {
        let a = TimeWindow::default_for("0b2a0a3e-2b7f-4a0d-8d0e-3c1f4d5b6a7c");
        let b = TimeWindow::default_for("0b2a0a3e-2b7f-4a0d-8d0e-3c1f4d5b6a7c");
        assert_eq!(a, b);
        assert_eq!(a.duration_secs(), 3600);
        assert!(a.validate().is_ok());
        assert!(DEFAULT_BEGIN_HOURS.contains(&a.begin.hour));

        let api = a.to_api();
        assert_eq!(TimeWindow::from_api(&api).unwrap(), a);
    }

    #[test]
    fn test_default_window_hash_is_sha256_prefix() {
        // SHA-256("abc") = ba7816bf 8f01cfea ...
        assert_eq!(stable_hash(b"abc"), 0xba78_16bf_8f01_cfea);

        let hours: std::collections::BTreeSet<u32> = (0..64)
            .map(|i| TimeWindow::default_for(&format!("shoot-{}", i)).begin.hour)
            .collect();
        assert!(hours.len() > 1);
        assert!(hours.iter().all(|h| DEFAULT_BEGIN_HOURS.contains(h)));
    }
}
