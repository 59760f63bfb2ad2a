use std::cell::{Ref, RefCell};

use anyhow::Result;
use async_trait::async_trait;

use crate::post::{ListingPage, PostSummary};
use crate::prismic::SearchResponse;

/// Source of listing pages, addressed by opaque cursor URLs.
#[async_trait(?Send)]
pub trait PageSource {
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse>;
}

#[async_trait(?Send)]
impl<'a, T: PageSource + ?Sized> PageSource for &'a T {
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse> {
        (**self).fetch_page(cursor).await
    }
}

/// Listing state owned by a [`ListingController`].
///
/// `items` only ever grows at the tail. `is_fetching` is true only while a
/// fetch is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    pub items: Vec<PostSummary>,
    pub next_cursor: Option<String>,
    pub is_fetching: bool,
}

/// What a call to [`ListingController::request_more`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No cursor left, or a fetch was already in flight.
    Skipped,
    /// A page was merged; holds the number of appended items.
    Merged(usize),
    /// The fetch or its parsing failed. State is unchanged and a retry is allowed.
    Failed,
}

/// Clears the in-flight flag when dropped, on every exit path.
struct FetchGuard<'a> {
    state: &'a RefCell<ListingState>,
}

impl<'a> FetchGuard<'a> {
    fn acquire(state: &'a RefCell<ListingState>) -> Option<(Self, String)> {
        let mut s = state.borrow_mut();
        if s.is_fetching {
            return None;
        }
        let cursor = s.next_cursor.clone()?;
        s.is_fetching = true;
        Some((Self { state }, cursor))
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().is_fetching = false;
    }
}

/// Incremental post listing: holds the posts shown so far plus the cursor of
/// the next page, and appends pages on demand.
///
/// Meant for a single-threaded, cooperative runtime. At most one fetch is in
/// flight at a time; overlapping calls to [`request_more`](Self::request_more)
/// are no-ops.
pub struct ListingController<S> {
    source: S,
    state: RefCell<ListingState>,
}

impl<S: PageSource> ListingController<S> {
    pub fn new(source: S, initial: ListingPage) -> Self {
        Self {
            source,
            state: RefCell::new(ListingState {
                items: initial.items,
                next_cursor: initial.next_cursor,
                is_fetching: false,
            }),
        }
    }

    /// Fetch the page at `first_url` and start a listing from it.
    pub async fn start(source: S, first_url: &str) -> Result<Self> {
        let resp = source.fetch_page(first_url).await?;
        let initial = ListingPage::from_response(&resp)?;
        Ok(Self::new(source, initial))
    }

    /// Current state. Do not hold the returned borrow across an await.
    pub fn state(&self) -> Ref<'_, ListingState> {
        self.state.borrow()
    }

    /// Whether a "load more" action should be offered.
    pub fn can_request_more(&self) -> bool {
        let s = self.state.borrow();
        s.next_cursor.is_some() && !s.is_fetching
    }

    /// Fetch the next page and append it to the listing.
    ///
    /// Fetch and parse errors are logged and swallowed; the caller may retry.
    pub async fn request_more(&self) -> LoadOutcome {
        let Some((_guard, cursor)) = FetchGuard::acquire(&self.state) else {
            return LoadOutcome::Skipped;
        };

        let page = match self.fetch(&cursor).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    cursor = %cursor,
                    error = %format!("{:#}", e),
                    "failed to load more posts"
                );
                return LoadOutcome::Failed;
            }
        };

        let added = page.items.len();
        {
            let mut s = self.state.borrow_mut();
            s.items.extend(page.items);
            s.next_cursor = page.next_cursor;
            tracing::debug!(
                added,
                total = s.items.len(),
                more = s.next_cursor.is_some(),
                "merged listing page"
            );
        }
        LoadOutcome::Merged(added)
    }

    /// Call [`request_more`](Self::request_more) up to `pages` times, stopping
    /// early at the last page or on a failure. Returns the number of items added.
    pub async fn load_pages(&self, pages: usize) -> usize {
        let mut added = 0;
        for _ in 0..pages {
            match self.request_more().await {
                LoadOutcome::Merged(n) => added += n,
                LoadOutcome::Skipped | LoadOutcome::Failed => break,
            }
        }
        added
    }

    async fn fetch(&self, cursor: &str) -> Result<ListingPage> {
        let resp = self.source.fetch_page(cursor).await?;
        ListingPage::from_response(&resp)
    }
}
