use crate::types::{SocialClient, Source, SourceKind, AT_URI_SCHEME};
use tracing::{debug, warn};
use url::Url;

const WEB_HOSTS: [&str; 2] = ["bsky.app", "www.bsky.app"];
const STABLE_ID_PREFIX: &str = "did:";

/// Why a configured link could not be turned into a canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("link is empty")]
    Empty,

    #[error("not a recognised {kind} link: {link}")]
    UnrecognizedShape { kind: &'static str, link: String },

    #[error("could not resolve handle {handle}: {reason}")]
    IdentityLookup { handle: String, reason: String },
}

pub fn is_stable_id(actor: &str) -> bool {
    actor.starts_with(STABLE_ID_PREFIX)
}

/// Whether `link` already is a canonical identifier for `kind`.
pub fn is_canonical(link: &str, kind: SourceKind) -> bool {
    link.starts_with(AT_URI_SCHEME) && link.contains(&format!("/{}/", kind.collection()))
}

/// Split `https://bsky.app/profile/<actor>/<feed|lists>/<rkey>` into `(actor, rkey)`.
/// Anything after the rkey (trailing segments, query, fragment) is ignored.
pub fn parse_web_link(link: &str, kind: SourceKind) -> Option<(String, String)> {
    let url = Url::parse(link).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;
    if !WEB_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return None;
    }

    let mut segments = url.path_segments()?;
    let profile = segments.next()?;
    let actor = segments.next()?;
    let collection = segments.next()?;
    let rkey = segments.next()?;

    if !profile.eq_ignore_ascii_case("profile") || !collection.eq_ignore_ascii_case(kind.web_segment()) {
        return None;
    }
    if actor.is_empty() || rkey.is_empty() {
        return None;
    }

    Some((actor.to_string(), rkey.to_string()))
}

/// Map an actor token to a stable id, asking the network only for handles.
pub async fn resolve_actor(client: &dyn SocialClient, actor: &str) -> Result<String, LinkError> {
    if is_stable_id(actor) {
        return Ok(actor.to_string());
    }

    match client.resolve_identity(actor).await {
        Ok(did) if !did.is_empty() => {
            debug!("Resolved handle {} to {}", actor, did);
            Ok(did)
        }
        Ok(_) => Err(LinkError::IdentityLookup {
            handle: actor.to_string(),
            reason: "empty identity returned".to_string(),
        }),
        Err(e) => Err(LinkError::IdentityLookup {
            handle: actor.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Produce `at://<stable-id>/<collection>/<rkey>` from a canonical identifier or a web link.
pub async fn normalize_link(client: &dyn SocialClient, raw: &str, kind: SourceKind) -> Result<String, LinkError> {
    let link = raw.trim();
    if link.is_empty() {
        return Err(LinkError::Empty);
    }
    if is_canonical(link, kind) {
        return Ok(link.to_string());
    }

    let (actor, rkey) = parse_web_link(link, kind).ok_or_else(|| LinkError::UnrecognizedShape {
        kind: kind.label(),
        link: link.to_string(),
    })?;
    let did = resolve_actor(client, &actor).await?;

    Ok(format!("{}{}/{}/{}", AT_URI_SCHEME, did, kind.collection(), rkey))
}

/// Resolve a configured source. Failures are logged and leave `uri` empty.
pub async fn resolve_source(
    client: &dyn SocialClient,
    kind: SourceKind,
    key: &str,
    note: Option<&str>,
    link: &str,
) -> Source {
    let uri = match normalize_link(client, link, kind).await {
        Ok(uri) => Some(uri),
        Err(e) => {
            warn!("Invalid {} {} (skipped): {}", kind.label(), key, e);
            None
        }
    };

    Source {
        kind,
        key: key.to_string(),
        note: note.map(|n| n.to_string()),
        link: link.to_string(),
        uri,
    }
}
