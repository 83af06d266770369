//! Deterministic report ordering.
//!
//! Two independent total orders are used when sorted output is requested:
//! server names in DNS canonical order (RFC 4034 section 6.1), and within one
//! server the results by address family (IPv6 first) then numeric address.

use std::cmp::Ordering;
use std::net::IpAddr;

use crate::types::SerialResult;

/// Compare two domain names in DNS canonical order.
///
/// Names are compared label by label starting from the rightmost label,
/// ignoring ASCII case and the trailing root dot. A name that runs out of
/// labels first sorts earlier.
#[must_use]
pub fn canonical_domain_cmp(a: &str, b: &str) -> Ordering {
    let mut left = labels_from_right(a);
    let mut right = labels_from_right(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_label(l, r) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
}

fn labels_from_right(name: &str) -> impl Iterator<Item = &str> {
    name.rsplit('.').filter(|label| !label.is_empty())
}

fn compare_label(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Compare two optional addresses for report order.
///
/// A missing address sorts first, then IPv6 before IPv4, then ascending
/// numeric value within a family. IPv4-mapped IPv6 addresses count as IPv4.
#[must_use]
pub fn address_family_cmp(a: Option<IpAddr>, b: Option<IpAddr>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.to_canonical(), b.to_canonical()) {
            (IpAddr::V6(x), IpAddr::V6(y)) => x.cmp(&y),
            (IpAddr::V4(x), IpAddr::V4(y)) => x.cmp(&y),
            (IpAddr::V6(_), IpAddr::V4(_)) => Ordering::Less,
            (IpAddr::V4(_), IpAddr::V6(_)) => Ordering::Greater,
        },
    }
}

/// Stable-sort server names into canonical order
pub fn sort_names<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| canonical_domain_cmp(a.as_ref(), b.as_ref()));
}

/// Stable-sort one server's results by address family and value
pub fn sort_by_address(results: &mut [SerialResult]) {
    results.sort_by(|a, b| address_family_cmp(a.address, b.address));
}
