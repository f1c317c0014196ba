//! Invite URL Helpers
//!
//! One query parameter carries the host's session id. Its presence in the
//! launch URL makes the local side a joiner (with the parameter value as the
//! connect target); its absence makes it the host, which then publishes its
//! own id through the same parameter.

use url::Url;

use crate::signaling::SessionId;

/// Extract the invite target from a launch URL, if present.
#[must_use]
pub fn invite_target(launch_url: &str, param: &str) -> Option<SessionId> {
    let url = Url::parse(launch_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| SessionId(value.into_owned()))
}

/// Render the shareable invite URL for a session id.
///
/// Any existing occurrence of the invite parameter is replaced; other query
/// parameters survive untouched.
///
/// # Errors
///
/// Fails when `base` is not a parseable URL.
pub fn invite_url(base: &str, param: &str, id: &SessionId) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        pairs.append_pair(param, &id.0);
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_present() {
        let target = invite_target("https://play.example/match?game=peer_abc123", "game");
        assert_eq!(target, Some(SessionId("peer_abc123".to_string())));
    }

    #[test]
    fn test_target_absent() {
        assert_eq!(invite_target("https://play.example/match", "game"), None);
        assert_eq!(
            invite_target("https://play.example/match?other=1", "game"),
            None
        );
    }

    #[test]
    fn test_target_bad_url() {
        assert_eq!(invite_target("::not a url::", "game"), None);
    }

    #[test]
    fn test_invite_url_appends_parameter() {
        let id = SessionId("peer_abc".to_string());
        let url = invite_url("https://play.example/match", "game", &id).unwrap();
        assert_eq!(url, "https://play.example/match?game=peer_abc");
    }

    #[test]
    fn test_invite_url_replaces_existing_parameter() {
        let id = SessionId("peer_new".to_string());
        let url = invite_url("https://play.example/match?game=peer_old&lang=en", "game", &id)
            .unwrap();
        assert_eq!(url, "https://play.example/match?lang=en&game=peer_new");
    }

    #[test]
    fn test_roundtrip_through_shared_url() {
        let id = SessionId("peer_42".to_string());
        let url = invite_url("https://play.example/", "game", &id).unwrap();
        assert_eq!(invite_target(&url, "game"), Some(id));
    }
}
