use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::listing::PageSource;
use crate::post::{self, PostDetail, PostRef};
use crate::prismic::{RawDocument, SearchResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Every post document reachable from a listing URL, ordered by first
/// publication (unpublished drafts last).
///
/// The fetched pages are kept by cursor, so a catalog can serve as the
/// [`PageSource`] of a listing without going back to the network.
pub struct Catalog {
    documents: Vec<RawDocument>,
    pages: HashMap<String, SearchResponse>,
}

impl Catalog {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self::with_pages(documents, HashMap::new())
    }

    fn with_pages(
        mut documents: Vec<RawDocument>,
        pages: HashMap<String, SearchResponse>,
    ) -> Self {
        documents.sort_by_key(|doc| {
            let published = doc
                .first_publication_date
                .as_deref()
                .and_then(|d| crate::format::parse_timestamp(d).ok());
            (published.is_none(), published)
        });
        Self { documents, pages }
    }

    /// Follow cursors from `first_url` to the last page.
    pub async fn collect<S: PageSource>(source: &S, first_url: &str) -> Result<Self> {
        let mut documents = Vec::new();
        let mut pages = HashMap::new();
        let mut cursor = Some(first_url.to_string());

        while let Some(url) = cursor {
            if pages.contains_key(&url) {
                tracing::warn!(cursor = %url, "listing cursor repeats, stopping");
                break;
            }
            let page = source
                .fetch_page(&url)
                .await
                .with_context(|| format!("Failed to fetch listing page {}", url))?;
            tracing::debug!(count = page.results.len(), "collected listing page");
            documents.extend(page.results.iter().cloned());
            cursor = page.next_page.clone();
            pages.insert(url, page);
        }

        Ok(Self::with_pages(documents, pages))
    }

    pub fn documents(&self) -> &[RawDocument] {
        &self.documents
    }

    /// Look up a post by uid. `Ok(None)` means not found (or not renderable).
    pub fn post_by_uid(&self, uid: &str) -> Result<Option<PostDetail>> {
        match self.documents.iter().find(|d| d.uid.as_deref() == Some(uid)) {
            Some(doc) => PostDetail::from_raw(doc),
            None => Ok(None),
        }
    }

    /// The post published right before or after the document `id`. `None` when
    /// that neighbor has no page of its own.
    pub fn adjacent(&self, id: &str, direction: Direction) -> Option<PostRef> {
        let pos = self.documents.iter().position(|d| d.id == id)?;
        let neighbor = match direction {
            Direction::Previous => pos.checked_sub(1).and_then(|i| self.documents.get(i)),
            Direction::Next => self.documents.get(pos + 1),
        }?;
        Some(PostRef {
            uid: neighbor.uid.clone().filter(|uid| post::is_safe_slug(uid))?,
            title: neighbor.data.title.clone().unwrap_or_default(),
        })
    }
}

#[async_trait(?Send)]
impl PageSource for Catalog {
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse> {
        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| anyhow!("Listing page not collected: {}", cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingController, LoadOutcome};
    use crate::prismic::{RawPostData, RawSection};
    use crate::richtext::RichTextBlock;
    use anyhow::bail;
    use std::cell::Cell;

    fn doc(id: &str, published: Option<&str>) -> RawDocument {
        RawDocument {
            id: id.to_string(),
            uid: Some(format!("post-{}", id)),
            first_publication_date: published.map(str::to_string),
            last_publication_date: published.map(str::to_string),
            data: RawPostData {
                title: Some(format!("Post {}", id)),
                content: Some(vec![RawSection {
                    heading: Some("Heading".to_string()),
                    body: vec![RichTextBlock::paragraph("Body text")],
                }]),
                ..Default::default()
            },
        }
    }

    struct Pages(HashMap<String, SearchResponse>, Cell<usize>);

    #[async_trait(?Send)]
    impl PageSource for Pages {
        async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse> {
            self.1.set(self.1.get() + 1);
            match self.0.get(cursor) {
                Some(resp) => Ok(resp.clone()),
                None => bail!("HTTP 404"),
            }
        }
    }

    fn sample() -> Catalog {
        Catalog::new(vec![
            doc("b", Some("2021-03-02T00:00:00+0000")),
            doc("draft", None),
            doc("a", Some("2021-03-01T00:00:00+0000")),
            doc("c", Some("2021-03-03T00:00:00+0000")),
        ])
    }

    #[test]
    fn test_orders_by_publication() {
        let ids: Vec<_> = sample().documents().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "draft"]);
    }

    #[test]
    fn test_adjacent() {
        let catalog = sample();
        assert_eq!(catalog.adjacent("b", Direction::Previous).unwrap().uid, "post-a");
        assert_eq!(catalog.adjacent("b", Direction::Next).unwrap().title, "Post c");
        assert!(catalog.adjacent("a", Direction::Previous).is_none());
        assert!(catalog.adjacent("missing", Direction::Next).is_none());
    }

    #[test]
    fn test_adjacent_skips_link_to_unsafe_uid() {
        let mut unsafe_doc = doc("b", Some("2021-03-02T00:00:00+0000"));
        unsafe_doc.uid = Some("../b".to_string());
        let catalog = Catalog::new(vec![
            doc("a", Some("2021-03-01T00:00:00+0000")),
            unsafe_doc,
        ]);
        assert!(catalog.adjacent("a", Direction::Next).is_none());
        assert_eq!(catalog.adjacent("b", Direction::Previous).unwrap().uid, "post-a");
    }

    #[test]
    fn test_post_by_uid() {
        let catalog = sample();
        let post = catalog.post_by_uid("post-b").unwrap().unwrap();
        assert_eq!(post.id, "b");
        assert_eq!(post.reading_time, 1);
        assert!(catalog.post_by_uid("nope").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collect_follows_cursors() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            SearchResponse {
                results: vec![doc("a", Some("2021-03-01T00:00:00Z"))],
                next_page: Some("p2".to_string()),
            },
        );
        pages.insert(
            "p2".to_string(),
            SearchResponse {
                results: vec![doc("b", Some("2021-03-02T00:00:00Z"))],
                next_page: None,
            },
        );
        let catalog = Catalog::collect(&Pages(pages, Cell::new(0)), "p1").await.unwrap();
        assert_eq!(catalog.documents().len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_serves_listing_without_refetching() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            SearchResponse {
                results: vec![doc("a", Some("2021-03-01T00:00:00Z"))],
                next_page: Some("p2".to_string()),
            },
        );
        pages.insert(
            "p2".to_string(),
            SearchResponse {
                results: vec![doc("b", Some("2021-03-02T00:00:00Z"))],
                next_page: None,
            },
        );
        let source = Pages(pages, Cell::new(0));
        let catalog = Catalog::collect(&source, "p1").await.unwrap();
        assert_eq!(source.1.get(), 2);

        let controller = ListingController::start(&catalog, "p1").await.unwrap();
        assert_eq!(controller.state().items.len(), 1);
        assert_eq!(controller.request_more().await, LoadOutcome::Merged(1));
        assert!(!controller.can_request_more());
        assert_eq!(source.1.get(), 2);

        assert!(catalog.fetch_page("p3").await.is_err());
    }

    #[tokio::test]
    async fn test_collect_stops_on_cursor_loop_and_fails_on_error() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            SearchResponse {
                results: vec![doc("a", None)],
                next_page: Some("p1".to_string()),
            },
        );
        let source = Pages(pages, Cell::new(0));
        let catalog = Catalog::collect(&source, "p1").await.unwrap();
        assert_eq!(catalog.documents().len(), 1);
        assert!(Catalog::collect(&source, "missing").await.is_err());
    }
}
