use url::Url;

pub const FALLBACK_FILE_NAME: &str = "download";

/// Derives the local file name from the URL's final path segment.
///
/// Query and fragment are ignored, percent-escapes are decoded, and anything
/// that could escape the output directory falls back to [`FALLBACK_FILE_NAME`].
pub fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .filter(|name| is_safe_name(name))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
