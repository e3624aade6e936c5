/// If `line` is `"<name> <value>"`, return the value.
pub(crate) fn header<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    if line.contains(&b' ') {
        let (maybe_name, value) = split_once(line, &b' ');
        if maybe_name == name {
            Some(value)
        } else {
            None
        }
    } else {
        None
    }
}

pub(crate) fn split_once<'a>(s: &'a [u8], c: &u8) -> (&'a [u8], &'a [u8]) {
    match s.iter().position(|b| b == c) {
        Some(n) => (&s[0..n], &s[n + 1..]),
        None => (s, &[]),
    }
}

/// Splits the header block of a commit or tag from its message.
///
/// Returns the header lines (without their newlines) and the message,
/// which is everything after the first empty line.
pub(crate) fn split_headers(body: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut lines = Vec::new();
    let mut rest = body;

    loop {
        match rest.iter().position(|b| *b == b'\n') {
            Some(0) => return (lines, &rest[1..]),
            Some(n) => {
                lines.push(&rest[..n]);
                rest = &rest[n + 1..];
            }
            None => {
                if !rest.is_empty() {
                    lines.push(rest);
                }
                return (lines, &[]);
            }
        }
    }
}
