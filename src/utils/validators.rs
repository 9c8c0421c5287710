use anyhow::{anyhow, Result};

/// Largest batch that keeps a six-column bulk insert under PostgreSQL's
/// 65535 bind-parameter limit.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Longest playlist name accepted by the playlist filter
pub const MAX_PLAYLIST_NAME_LEN: usize = 200;

/// Validate the generator batch size (1..=MAX_BATCH_SIZE)
pub fn validate_batch_size(batch_size: usize) -> Result<usize> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(anyhow!(
            "Batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE,
            batch_size
        ));
    }

    Ok(batch_size)
}

/// Truncate to at most `max_chars` characters (not bytes), so multi-byte
/// titles never split inside a code point.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Validate a playlist name coming from the dashboard selection
pub fn validate_playlist_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(anyhow!("Playlist name must not be empty"));
    }

    if trimmed.chars().count() > MAX_PLAYLIST_NAME_LEN {
        return Err(anyhow!(
            "Playlist name must be at most {} characters",
            MAX_PLAYLIST_NAME_LEN
        ));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_batch_size() {
        assert_eq!(validate_batch_size(2000).unwrap(), 2000);
        assert_eq!(validate_batch_size(1).unwrap(), 1);
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(MAX_BATCH_SIZE + 1).is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Bohemian Rhapsody", 8), "Bohemian");
        assert_eq!(truncate_chars("short", 300), "short");
        assert_eq!(truncate_chars("", 10), "");
        // Multi-byte characters count as one each
        assert_eq!(truncate_chars("Björk Guðmundsdóttir", 5), "Björk");
        assert_eq!(truncate_chars("音楽のテスト", 2), "音楽");
    }

    #[test]
    fn test_validate_playlist_name() {
        assert_eq!(validate_playlist_name("  Sunny Mix 3 ").unwrap(), "Sunny Mix 3");
        assert_eq!(
            validate_playlist_name("x' OR '1'='1").unwrap(),
            "x' OR '1'='1"
        );
        assert!(validate_playlist_name("   ").is_err());
        assert!(validate_playlist_name(&"a".repeat(MAX_PLAYLIST_NAME_LEN + 1)).is_err());
    }
}
