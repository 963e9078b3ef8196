/// Splits a line into whitespace-delimited tokens borrowed from it.
/// No quoting or escaping. The argument cap is applied later, by
/// [`crate::redirection::parse_command`], so redirections do not count against it.
pub fn tokenize(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}
