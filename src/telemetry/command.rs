//! Remote setpoint command carried in the telemetry response body.
//!
//! The server appends queued TalkBack commands to its reply. A setpoint
//! command is the token `SETPOINT=` followed by a number and terminated
//! by `"`, a space, CR, LF or the end of the body. The number is read
//! like C `strtof`: the longest numeric prefix wins and an empty prefix
//! reads as 0, which the range check then rejects.

const TOKEN: &str = "SETPOINT=";

/// Extract the setpoint value, `None` if the body has no command.
pub fn find_setpoint(body: &str) -> Option<f32> {
    let start = body.find(TOKEN)? + TOKEN.len();
    let rest = &body[start..];
    let end = rest
        .find(|c: char| matches!(c, '"' | ' ' | '\r' | '\n'))
        .unwrap_or(rest.len());
    Some(parse_prefix(&rest[..end]))
}

/// Longest-prefix float parse with `strtof` semantics.
fn parse_prefix(s: &str) -> f32 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let lower = s[i..].to_ascii_lowercase();
    if lower.starts_with("nan") {
        return f32::NAN;
    }
    if lower.starts_with("inf") {
        return if s.starts_with('-') { f32::NEG_INFINITY } else { f32::INFINITY };
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_len = digits(i);
    i += int_len;
    let mut frac_len = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_len = digits(i + 1);
        if int_len + frac_len > 0 {
            i += 1 + frac_len;
        }
    }
    if int_len + frac_len == 0 {
        return 0.0;
    }

    // Exponent only counts if at least one digit follows.
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_len = digits(j);
        if exp_len > 0 {
            i = j + exp_len;
        }
    }

    s[..i].parse().unwrap_or(0.0)
}
