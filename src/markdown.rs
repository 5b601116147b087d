/// Storage root that must never leak into a web path.
pub const DEFAULT_STORAGE_PREFIX: &str = "public/";

pub fn image_markdown(path: &str) -> String {
    format!("![generated image]({path})")
}

/// Turns a saved file reference into a web-servable path: forward slashes,
/// leading storage root prefix removed, leading `/` on relative paths. Absolute
/// URLs pass through unchanged.
pub fn web_path(path: &str, storage_prefix: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let normalized = path.replace('\\', "/");
    let relative = normalized.trim_start_matches('/');
    let prefix = storage_prefix.replace('\\', "/");
    let prefix = prefix.trim_matches('/');

    // Only a leading storage root is stripped; inner segments are real.
    let relative = if prefix.is_empty() {
        relative
    } else {
        relative
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(relative)
    };
    format!("/{relative}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_path_in_image_tag() {
        assert_eq!(
            image_markdown("/images/u1/a.png"),
            "![generated image](/images/u1/a.png)"
        );
    }

    #[test]
    fn normalizes_windows_separators_and_strips_prefix() {
        assert_eq!(
            web_path("public\\images\\u1\\a.png", DEFAULT_STORAGE_PREFIX),
            "/images/u1/a.png"
        );
        assert_eq!(
            web_path("/public/images/u1/a.png", DEFAULT_STORAGE_PREFIX),
            "/images/u1/a.png"
        );
    }

    #[test]
    fn prefix_only_stripped_at_segment_boundary() {
        assert_eq!(
            web_path("images/notpublic/a.png", DEFAULT_STORAGE_PREFIX),
            "/images/notpublic/a.png"
        );
    }

    #[test]
    fn inner_segments_matching_prefix_are_kept() {
        assert_eq!(
            web_path("/images/public/a.png", DEFAULT_STORAGE_PREFIX),
            "/images/public/a.png"
        );
        assert_eq!(
            web_path("public/images/public/a.png", DEFAULT_STORAGE_PREFIX),
            "/images/public/a.png"
        );
        assert_eq!(web_path("publicity/a.png", DEFAULT_STORAGE_PREFIX), "/publicity/a.png");
    }

    #[test]
    fn absolute_urls_are_untouched() {
        let url = "https://bucket.example.com/public/images/a.png";
        assert_eq!(web_path(url, DEFAULT_STORAGE_PREFIX), url);
    }
}
