use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::format::{self, Section};
use crate::prismic::{RawDocument, SearchResponse};

/// A post as shown on the listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub id: String,
    pub uid: Option<String>,
    /// Absent for drafts that were never published.
    pub publication_date: Option<DateTime<Utc>>,
    pub formatted_date: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// One page of listing results, with the cursor of the following page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub items: Vec<PostSummary>,
    pub next_cursor: Option<String>,
}

/// Link target for previous/next post navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRef {
    pub uid: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostNavigation {
    pub previous: Option<PostRef>,
    pub next: Option<PostRef>,
}

/// A full post, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub id: String,
    pub uid: String,
    pub publication_date: Option<DateTime<Utc>>,
    /// Only set when the post was edited after it was first published.
    pub last_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub sections: Vec<Section>,
    /// Minutes, computed once from `sections`.
    pub reading_time: usize,
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(format::parse_timestamp).transpose()
}

/// The "edited at" timestamp to display: absent unless it differs from the
/// publication timestamp.
pub fn edited_timestamp(
    published: Option<DateTime<Utc>>,
    last_published: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (published, last_published) {
        (Some(first), Some(last)) if first == last => None,
        (_, last) => last,
    }
}

/// Whether a uid can be used as a page file name and link segment.
pub fn is_safe_slug(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

impl PostSummary {
    /// Link to the post page; `None` when the post has no page of its own.
    pub fn link(&self) -> Option<String> {
        self.uid
            .as_deref()
            .filter(|uid| is_safe_slug(uid))
            .map(|uid| format!("/post/{}", uid))
    }

    pub fn from_raw(doc: &RawDocument) -> Result<Self> {
        let publication_date = parse_optional_date(doc.first_publication_date.as_deref())
            .with_context(|| format!("Bad publication date on document {}", doc.id))?;
        let formatted_date = publication_date
            .map(|ts| format::format_date(&ts, false))
            .unwrap_or_default();
        Ok(Self {
            id: doc.id.clone(),
            uid: doc.uid.clone(),
            publication_date,
            formatted_date,
            title: doc.data.title.clone().unwrap_or_default(),
            subtitle: doc.data.subtitle.clone().unwrap_or_default(),
            author: doc.data.author.clone().unwrap_or_default(),
        })
    }
}

impl ListingPage {
    /// Format every result of a search response. Fails as a whole if any
    /// record carries an unparseable date.
    pub fn from_response(resp: &SearchResponse) -> Result<Self> {
        let items = resp
            .results
            .iter()
            .map(PostSummary::from_raw)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            items,
            next_cursor: resp.next_page.clone(),
        })
    }
}

impl PostDetail {
    /// Build a post from a full CMS document. Returns `None` for documents
    /// without a uid or without fetched content, which cannot be rendered as
    /// a post page.
    pub fn from_raw(doc: &RawDocument) -> Result<Option<Self>> {
        let (Some(uid), Some(content)) = (&doc.uid, &doc.data.content) else {
            return Ok(None);
        };
        let publication_date = parse_optional_date(doc.first_publication_date.as_deref())
            .with_context(|| format!("Bad publication date on post {}", uid))?;
        let last_publication_date = parse_optional_date(doc.last_publication_date.as_deref())
            .with_context(|| format!("Bad last publication date on post {}", uid))?;

        let sections: Vec<Section> = content
            .iter()
            .map(|s| Section {
                heading: s.heading.clone().unwrap_or_default(),
                body: s.body.clone(),
            })
            .collect();
        let reading_time = format::reading_time(&sections);

        Ok(Some(Self {
            id: doc.id.clone(),
            uid: uid.clone(),
            publication_date,
            last_publication_date: edited_timestamp(publication_date, last_publication_date),
            title: doc.data.title.clone().unwrap_or_default(),
            banner_url: doc.data.banner.as_ref().and_then(|b| b.url.clone()),
            author: doc.data.author.clone().unwrap_or_default(),
            sections,
            reading_time,
        }))
    }
}
