/// Commands the interpreter handles itself instead of launching.
pub const BUILTINS: &[&str] = &["exit"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Status requested by `exit [status]`. Missing or non-numeric means 0.
pub fn exit_status(args: &[&str]) -> i32 {
    args.get(1).map_or(0, |arg| atoi(arg))
}

/// C `atoi`: optional leading whitespace and sign, then as many digits as
/// follow. Anything unparsable yields 0.
fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    let value = if negative { -value } else { value };
    value as i32
}
