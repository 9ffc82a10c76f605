/// Longest channel name the service accepts.
pub const MAX_CHANNEL_NAME_LEN: usize = 255;

/// Why a channel name was refused.
pub fn channel_name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("channel name is empty".into());
    }
    if name.len() > MAX_CHANNEL_NAME_LEN {
        return Some(format!(
            "channel name is {} bytes, limit is {MAX_CHANNEL_NAME_LEN}",
            name.len()
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
    {
        return Some(format!("channel name contains invalid character {c:?}"));
    }
    None
}
