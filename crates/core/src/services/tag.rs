//! NFC tag resolution service.

use punch_common::AppResult;
use punch_db::{entities::restaurant, repositories::RestaurantRepository};

use crate::tag::{ScannedTag, TagResolution, classify};

/// Resolves scanned tags against restaurant bindings.
#[derive(Clone)]
pub struct TagResolverService {
    restaurant_repo: RestaurantRepository,
    peer_marker: String,
}

impl TagResolverService {
    /// Create a new tag resolver.
    #[must_use]
    pub fn new(restaurant_repo: RestaurantRepository, peer_marker: impl Into<String>) -> Self {
        Self {
            restaurant_repo,
            peer_marker: peer_marker.into(),
        }
    }

    /// The restaurant bound to `tag_id`, if any.
    pub async fn find_restaurant(&self, tag_id: &str) -> AppResult<Option<restaurant::Model>> {
        self.restaurant_repo.find_by_tag(tag_id).await
    }

    /// Classify a tag id with its optional decoded payload.
    pub async fn resolve(
        &self,
        tag_id: &str,
        payload_text: Option<&str>,
    ) -> AppResult<TagResolution> {
        let bound = self.restaurant_repo.find_by_tag(tag_id).await?;
        let resolution = classify(
            tag_id,
            bound.as_ref().map(|r| r.id.as_str()),
            payload_text,
            &self.peer_marker,
        );

        tracing::debug!(tag_id = %tag_id, resolution = ?resolution, "Resolved tag");
        Ok(resolution)
    }

    /// Classify a tag straight from the reader.
    pub async fn resolve_scanned(&self, tag: &ScannedTag) -> AppResult<TagResolution> {
        let text = tag.payload_text();
        self.resolve(&tag.tag_id, text.as_deref()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::create_test_restaurant;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn resolver(results: Vec<restaurant::Model>) -> TagResolverService {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([results])
                .into_connection(),
        );
        TagResolverService::new(RestaurantRepository::new(db), "punch:peer")
    }

    #[tokio::test]
    async fn test_bound_tag_resolves_to_restaurant() {
        let restaurant = create_test_restaurant("r1", Some("04:A2:19"), Some(10));
        let resolution = resolver(vec![restaurant])
            .resolve("04:A2:19", Some("punch:peer"))
            .await
            .unwrap();

        assert_eq!(
            resolution,
            TagResolution::Restaurant {
                restaurant_id: "r1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_peer_payload() {
        let tag = ScannedTag {
            tag_id: "ff:01".to_string(),
            payload: Some(b"\x02enpunch:peer:u1".to_vec()),
        };

        let resolution = resolver(vec![]).resolve_scanned(&tag).await.unwrap();
        assert_eq!(resolution, TagResolution::Peer);
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let resolution = resolver(vec![]).resolve("ff:02", None).await.unwrap();
        assert_eq!(
            resolution,
            TagResolution::Unknown {
                tag_id: "ff:02".to_string()
            }
        );
    }
}
