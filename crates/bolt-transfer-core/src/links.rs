//! Share-link rewriting for hosts that serve an interstitial page instead of bytes.

use url::Url;

const DRIVE_DIRECT: &str = "https://drive.google.com/uc?export=download&id=";

/// Rewrite a Google Drive share link to its direct download form.
///
/// Returns `None` when the link is not recognised or nothing would change.
#[must_use]
pub fn convert_share_link(link: &str) -> Option<String> {
    let file_id = link
        .split_once("/file/d/")
        .and_then(|(_, rest)| rest.split(['/', '?', '#']).next())
        .map(str::to_string)
        .or_else(|| {
            Url::parse(link).ok().and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "id")
                    .map(|(_, value)| value.into_owned())
            })
        })
        .filter(|id| !id.is_empty())?;
    let direct = format!("{DRIVE_DIRECT}{file_id}");
    (direct != link).then_some(direct)
}
