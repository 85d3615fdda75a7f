//! Post-processing of the digest the agent wrote.

use chrono::{DateTime, Utc};
use extraction::sanitize_image_url;
use tracing::debug;

use crate::models::DigestOutput;

/// Fill in image URLs and the generation timestamp.
///
/// `lookup` answers from the extractor's image cache: `None` when the URL
/// was never extracted, `Some(image)` when it was. A cached entry always
/// wins, even when it says there is no image; otherwise whatever the agent
/// wrote is kept. Either way only absolute http(s) URLs survive.
pub fn enrich_digest<F>(digest: &mut DigestOutput, lookup: F, now: DateTime<Utc>)
where
    F: Fn(&str) -> Option<Option<String>>,
{
    let mut from_cache = 0;

    for story in digest.stories_mut() {
        let cached = (!story.url.trim().is_empty())
            .then(|| lookup(&story.url))
            .flatten();

        story.image_url = match cached {
            Some(image) => {
                from_cache += 1;
                sanitize_image_url(image.as_deref())
            }
            None => sanitize_image_url(story.image_url.as_deref()),
        };
    }

    digest.generated_at = Some(now);
    debug!(
        stories = digest.story_count(),
        from_cache, "Enriched digest with cached images"
    );
}
