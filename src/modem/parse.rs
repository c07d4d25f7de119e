//! Result-line parsing.
//!
//! The modem answers in loosely formatted text: a `+TAG:` prefix followed by
//! comma-separated integers, surrounded by echo, blank lines and `OK`.
//! Numbers are read leniently (leading whitespace skipped, digits taken
//! until the first non-digit, `0` when none), and a missing field reads as
//! `-1` so it never matches a success code.

/// Value for a field the response did not carry.
pub const MISSING: i32 = -1;

/// SIM presence as reported by `AT+CCID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    Present,
    NotInserted,
    Unknown,
}

/// Lenient integer read: `" 0\r\nOK"` → 0, `"x"` → 0.
pub fn lenient_int(field: &str) -> i32 {
    let s = field.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i32 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i32::from(b - b'0'));
    }
    if negative { -value } else { value }
}

/// Text following the first occurrence of `prefix`.
pub fn after<'a>(response: &'a str, prefix: &str) -> Option<&'a str> {
    response
        .find(prefix)
        .map(|idx| &response[idx + prefix.len()..])
}

/// The first `N` comma-separated integers after `prefix`.
pub fn int_fields<const N: usize>(response: &str, prefix: &str) -> Option<[i32; N]> {
    let rest = after(response, prefix)?;
    let mut out = [MISSING; N];
    for (slot, field) in out.iter_mut().zip(rest.split(',')) {
        *slot = lenient_int(field);
    }
    Some(out)
}

/// `+QMTOPEN: <client>,<result>`
pub fn mqtt_open_result(response: &str) -> Option<(i32, i32)> {
    int_fields::<2>(response, "+QMTOPEN:").map(|[a, b]| (a, b))
}

/// `+QMTCONN: <client>,<result>,<return code>`
pub fn mqtt_connect_result(response: &str) -> Option<(i32, i32, i32)> {
    int_fields::<3>(response, "+QMTCONN:").map(|[a, b, c]| (a, b, c))
}

/// `+QMTPUB:` followed by a `0,0,0` acknowledgement.
pub fn publish_acknowledged(response: &str) -> bool {
    after(response, "+QMTPUB:").is_some_and(|rest| rest.contains("0,0,0"))
}

/// The broker closed the session (`+QMTSTAT: 0,1`).
pub fn mqtt_session_closed(response: &str) -> bool {
    response.contains("+QMTSTAT: 0,1")
}

/// Registered on the home network or roaming.
pub fn registered(response: &str) -> bool {
    response.contains("+CREG: 0,1") || response.contains("+CREG: 0,5")
}

pub fn sim_status(response: &str) -> SimStatus {
    if response.contains("+CME ERROR: SIM not inserted") {
        SimStatus::NotInserted
    } else if response.contains("+CCID") {
        SimStatus::Present
    } else {
        SimStatus::Unknown
    }
}

/// `+CGATT: 1`
pub fn gprs_attached(response: &str) -> bool {
    response.contains("+CGATT: 1")
}
