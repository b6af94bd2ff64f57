// ABOUTME: Line-oriented pattern matching over free-form command output.
// ABOUTME: Status lines are often surrounded by diagnostic chatter, so each line is searched on its own.

use regex::Regex;

/// Non-empty lines of `output`, splitting on any run of `\n` / `\r`.
pub fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.split(['\n', '\r']).filter(|line| !line.is_empty())
}

/// First capture group of the first line where `pattern` matches with a non-blank group.
///
/// A line that matches with a blank (or absent) group does not stop the search.
pub fn first_capture<'a>(output: &'a str, pattern: &Regex) -> Option<&'a str> {
    lines(output).find_map(|line| {
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|value| !value.trim().is_empty())
    })
}

/// True if `pattern` is found on any line of `output`.
pub fn any_line_matches(output: &str, pattern: &Regex) -> bool {
    lines(output).any(|line| pattern.is_match(line))
}
