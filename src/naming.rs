use uuid::Uuid;

const DEFAULT_EXTENSION: &str = "png";

/// Last path segment of `url`, without query or fragment.
pub fn image_basename(url: &str) -> &str {
    let url = url.split(['?', '#']).next().unwrap_or_default();
    let path = url
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, path)| path).unwrap_or(""))
        .unwrap_or(url);
    path.rsplit('/').next().unwrap_or_default()
}

fn extension_of(basename: &str) -> Option<&str> {
    let (stem, ext) = basename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    ext.chars()
        .all(|c| c.is_ascii_alphanumeric())
        .then_some(ext)
}

/// `img-<uuid>.<ext>` keeping the extension of the remote file.
pub fn name_for_url(url: &str) -> String {
    let ext = extension_of(image_basename(url))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("img-{}.{ext}", Uuid::new_v4())
}

/// `<uuid>.png` for images produced from in-memory bytes.
pub fn name_for_bytes() -> String {
    format!("{}.{DEFAULT_EXTENSION}", Uuid::new_v4())
}
