/// Splits a line into its content and its trailing comment
///
/// The comment starts at the first `;` that is neither quoted nor escaped with a backslash, and
/// keeps its `;`. Both parts come back trimmed.
pub(crate) fn split_comment(line: &str) -> (&str, &str) {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => return (line[..i].trim(), line[i..].trim()),
            _ => {}
        }
    }
    (line.trim(), "")
}
