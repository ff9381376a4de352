/// Join a namespace prefix and a logical secret name into a remote identifier.
///
/// Behaves like a lexical path join with `/` separators: empty and `.`
/// segments are dropped, `..` removes the preceding segment, and a leading `/`
/// on the prefix is kept.
pub fn join_secret_id(prefix: &str, name: &str) -> String {
    if prefix.is_empty() && name.is_empty() {
        return String::new();
    }

    let rooted = if prefix.is_empty() {
        name.starts_with('/')
    } else {
        prefix.starts_with('/')
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split('/').chain(name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
