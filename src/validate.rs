//! Video link validation.
//!
//! Accepted shapes, scheme and `www.` optional:
//! - `youtube.com/watch?v=<id>` (further query parameters allowed)
//! - `youtube.com/shorts/<id>`
//! - `youtu.be/<id>`
//!
//! `<id>` is exactly 11 characters of `[A-Za-z0-9_-]`.

use crate::error::SubmitError;

const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl {
    pub url: String,
    pub video_id: Option<String>,
}

/// Check a raw link before anything touches the network. Empty input is
/// always rejected; with `strict` set the link must also match a known video
/// host and carry a well-formed id.
pub fn parse_video_url(raw: &str, strict: bool) -> Result<VideoUrl, SubmitError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::InvalidUrl("the link is empty".into()));
    }
    if !strict {
        return Ok(VideoUrl {
            url: trimmed.to_string(),
            video_id: None,
        });
    }
    match extract_video_id(trimmed) {
        Some(id) => Ok(VideoUrl {
            url: trimmed.to_string(),
            video_id: Some(id.to_string()),
        }),
        None => Err(SubmitError::InvalidUrl(
            "expected a youtube.com or youtu.be link with an 11-character video id".into(),
        )),
    }
}

fn extract_video_id(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    if let Some(path) = rest.strip_prefix("youtu.be/") {
        return take_video_id(path);
    }
    if let Some(path) = rest.strip_prefix("youtube.com/") {
        if let Some(query) = path.strip_prefix("watch?") {
            return query
                .split('&')
                .find_map(|pair| pair.strip_prefix("v="))
                .and_then(take_video_id);
        }
        if let Some(short) = path.strip_prefix("shorts/") {
            return take_video_id(short);
        }
    }
    None
}

/// The id must be exactly 11 URL-safe characters and end at the string, a
/// query separator, a fragment, or a path boundary.
fn take_video_id(s: &str) -> Option<&str> {
    let end = s
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
        .unwrap_or(s.len());
    let id = &s[..end];
    if id.len() != VIDEO_ID_LEN {
        return None;
    }
    match s.as_bytes().get(end) {
        None | Some(b'?') | Some(b'&') | Some(b'#') | Some(b'/') => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(raw: &str) -> VideoUrl {
        parse_video_url(raw, true).unwrap_or_else(|e| panic!("{raw:?} rejected: {e}"))
    }

    fn rejects(raw: &str) {
        assert!(
            parse_video_url(raw, true).is_err(),
            "{raw:?} unexpectedly accepted"
        );
    }

    #[test]
    fn test_accepts_standard_watch_link() {
        let v = accepts("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(v.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_accepts_short_host_and_extra_query() {
        let v = accepts("https://youtu.be/dQw4w9WgXcQ?t=30");
        assert_eq!(v.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_accepts_shorts_path() {
        let v = accepts("https://www.youtube.com/shorts/abc123def45");
        assert_eq!(v.video_id.as_deref(), Some("abc123def45"));
    }

    #[test]
    fn test_accepts_missing_scheme_and_www() {
        accepts("youtube.com/watch?v=dQw4w9WgXcQ");
        accepts("www.youtube.com/watch?v=dQw4w9WgXcQ");
        accepts("youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_accepts_trailing_playlist_parameter() {
        let v = accepts("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy");
        assert_eq!(v.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        rejects("");
        rejects("   ");
        rejects("\t\n");
    }

    #[test]
    fn test_rejects_free_text() {
        rejects("not a url");
    }

    #[test]
    fn test_rejects_unknown_host() {
        rejects("https://vimeo.com/123456789");
    }

    #[test]
    fn test_rejects_malformed_id() {
        rejects("https://www.youtube.com/watch?v=short");
        rejects("https://youtu.be/dQw4w9WgXcQtoolong");
        rejects("https://www.youtube.com/watch?v=");
        rejects("https://www.youtube.com/playlist?list=PLrAXtmRdnEQy");
    }

    #[test]
    fn test_lenient_mode_only_requires_non_empty() {
        let v = parse_video_url("not a url", false).expect("lenient accepts free text");
        assert_eq!(v.video_id, None);
        assert!(parse_video_url("  ", false).is_err());
    }

    #[test]
    fn test_input_is_trimmed() {
        let v = accepts("  https://youtu.be/dQw4w9WgXcQ  ");
        assert_eq!(v.url, "https://youtu.be/dQw4w9WgXcQ");
    }
}
