//! Reusable field checks: names, CIDRs, cron schedules, quantities

use cron::Schedule;
use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;

use crate::apis::common::MaintenanceTimeWindow;
use crate::maintenance::TimeWindow;
use crate::validation::{ErrorList, FieldError, FieldPath};

const DNS_LABEL_MAX: usize = 63;
const DNS_SUBDOMAIN_MAX: usize = 253;

/// Whether `s` is an RFC 1123 label: lower case alphanumerics and `-`,
/// starting and ending alphanumeric
pub fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= DNS_LABEL_MAX
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}

/// Whether `s` is an RFC 1123 subdomain: dot separated labels
pub fn is_dns_subdomain(s: &str) -> bool {
    s.len() <= DNS_SUBDOMAIN_MAX && s.split('.').all(is_dns_label)
}

pub fn validate_dns_label(value: &str, path: &FieldPath, errors: &mut ErrorList) {
    if value.is_empty() {
        errors.push(FieldError::required(path, ""));
    } else if !is_dns_label(value) {
        errors.push(FieldError::invalid(
            path,
            value,
            "must consist of lower case alphanumeric characters or '-', and start and end with an alphanumeric character",
        ));
    }
}

pub fn validate_dns_subdomain(value: &str, path: &FieldPath, errors: &mut ErrorList) {
    if value.is_empty() {
        errors.push(FieldError::required(path, ""));
    } else if !is_dns_subdomain(value) {
        errors.push(FieldError::invalid(path, value, "must be a DNS subdomain"));
    }
}

pub fn validate_required(value: &str, path: &FieldPath, errors: &mut ErrorList) {
    if value.trim().is_empty() {
        errors.push(FieldError::required(path, ""));
    }
}

/// Report a change of a field that may not change
pub fn validate_immutable<T: PartialEq + std::fmt::Debug>(
    new: &T,
    old: &T,
    path: &FieldPath,
    errors: &mut ErrorList,
) {
    if new != old {
        errors.push(FieldError::invalid(
            path,
            format!("{:?}", new),
            "field is immutable",
        ));
    }
}

/// Like [`validate_immutable`], but only once the old value was set
pub fn validate_immutable_once_set<T: PartialEq + std::fmt::Debug>(
    new: &Option<T>,
    old: &Option<T>,
    path: &FieldPath,
    errors: &mut ErrorList,
) {
    if old.is_some() {
        validate_immutable(new, old, path, errors);
    }
}

/// Report duplicates among `values`
pub fn validate_unique<'a>(
    values: impl IntoIterator<Item = &'a str>,
    path: impl Fn(usize) -> FieldPath,
    errors: &mut ErrorList,
) {
    let mut seen = HashSet::new();
    for (i, value) in values.into_iter().enumerate() {
        if !seen.insert(value) {
            errors.push(FieldError::duplicate(&path(i), value));
        }
    }
}

pub fn validate_time_window(window: &MaintenanceTimeWindow, path: &FieldPath, errors: &mut ErrorList) {
    if let Err(e) = TimeWindow::from_api(window) {
        errors.push(FieldError::invalid(
            path,
            format!("{}-{}", window.begin, window.end),
            &e.to_string(),
        ));
    }
}

// =============================================================================
// CIDRs
// =============================================================================

/// A parsed CIDR, normalized to its network address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub network: IpAddr,
    pub prefix: u8,
}

impl Cidr {
    pub fn parse(s: &str) -> Option<Self> {
        let (addr, prefix) = s.split_once('/')?;
        let addr: IpAddr = addr.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return None;
        }
        Some(Self {
            network: mask(addr, prefix),
            prefix,
        })
    }

    /// Whether two ranges share an address
    pub fn overlaps(&self, other: &Cidr) -> bool {
        if self.network.is_ipv4() != other.network.is_ipv4() {
            return false;
        }
        let prefix = self.prefix.min(other.prefix);
        mask(self.network, prefix) == mask(other.network, prefix)
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let masked = if prefix == 0 { 0 } else { bits & (u32::MAX << (32 - prefix)) };
            IpAddr::V4(masked.into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let masked = if prefix == 0 { 0 } else { bits & (u128::MAX << (128 - prefix)) };
            IpAddr::V6(masked.into())
        }
    }
}

pub fn validate_cidr(value: &str, path: &FieldPath, errors: &mut ErrorList) -> Option<Cidr> {
    let parsed = Cidr::parse(value);
    if parsed.is_none() {
        errors.push(FieldError::invalid(path, value, "must be a valid CIDR"));
    }
    parsed
}

/// Report every pair of overlapping ranges
pub fn validate_no_overlap(cidrs: &[(FieldPath, Cidr)], errors: &mut ErrorList) {
    for (i, (path, a)) in cidrs.iter().enumerate() {
        for (other_path, b) in &cidrs[i + 1..] {
            if a.overlaps(b) {
                errors.push(FieldError::invalid(
                    path,
                    format!("{}/{}", a.network, a.prefix),
                    &format!("must not overlap with {}", other_path),
                ));
            }
        }
    }
}

// =============================================================================
// Cron
// =============================================================================

const WEEKDAYS: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Check a five field cron schedule (minute hour day-of-month month day-of-week)
/// or a descriptor such as `@daily`.
pub fn parse_cron(schedule: &str) -> Result<(), String> {
    let schedule = schedule.trim();
    let expression = if schedule.starts_with('@') {
        schedule.to_string()
    } else {
        let fields: Vec<&str> = schedule.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        }
        if fields.iter().flat_map(|f| f.split(',')).any(has_zero_step) {
            return Err("step must be positive".into());
        }
        // `cron` schedules start with seconds and number weekdays from 1 (Sunday)
        format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            weekdays_by_name(fields[4])
        )
    };
    Schedule::from_str(&expression)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn has_zero_step(item: &str) -> bool {
    item.split_once('/')
        .is_some_and(|(_, step)| step.parse::<u32>() == Ok(0))
}

/// Rewrite numeric weekdays (0 and 7 are Sunday) as names
fn weekdays_by_name(field: &str) -> String {
    let name = |day: &str| match day.parse::<usize>() {
        Ok(n) if n < WEEKDAYS.len() => WEEKDAYS[n].to_string(),
        _ => day.to_string(),
    };
    field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = match range.split_once('-') {
                Some(("7", "7")) => name("7"),
                // Sunday closes the week, split it off the range
                Some((lo, "7")) if step.is_none() && lo != "0" && lo != "7" => {
                    format!("{}-Sat,Sun", name(lo))
                }
                Some((lo, "7")) => format!("{}-Sat", name(lo)),
                Some((lo, hi)) => format!("{}-{}", name(lo), name(hi)),
                None => name(range),
            };
            match step {
                Some(step) => format!("{}/{}", range, step),
                None => range,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Quantities
// =============================================================================

/// Parse a Kubernetes quantity (`100`, `1.5Gi`, `250m`, `1e3`) into its value
pub fn parse_quantity(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty quantity".into());
    }

    let mut num_end = 0;
    for (i, c) in s.char_indices() {
        if !c.is_ascii_digit() && c != '.' && !(i == 0 && (c == '+' || c == '-')) {
            num_end = i;
            break;
        }
        num_end = i + 1;
    }

    let num_str = &s[..num_end];
    let suffix = &s[num_end..];
    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Pi" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Ei" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        exp if exp.starts_with(['e', 'E']) => {
            let e: i32 = exp[1..]
                .parse()
                .map_err(|_| format!("invalid exponent: {}", exp))?;
            10f64.powi(e)
        }
        other => return Err(format!("unknown suffix: {}", other)),
    };

    Ok(num * multiplier)
}

// =============================================================================
// URLs
// =============================================================================

/// Whether `s` is an `https://` URL with a host and without fragment or query
pub fn is_https_url(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("https://") else {
        return false;
    };
    let host = rest.split('/').next().unwrap_or_default();
    !host.is_empty() && !s.contains('#') && !s.contains('?')
}
