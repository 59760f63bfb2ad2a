use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ramhorns::{Content, Template};

use crate::config::SiteConfig;
use crate::format;
use crate::listing::ListingState;
use crate::post::{PostDetail, PostNavigation, PostRef};
use crate::richtext;

const LIST_TEMPLATE: &str = include_str!("../templates/list.html");
const POST_TEMPLATE: &str = include_str!("../templates/post.html");

#[derive(Content)]
struct ListPage<'a> {
    site_name: &'a str,
    posts: Vec<PostItem<'a>>,
    load_more: Option<LoadMore<'a>>,
    fetching: bool,
    exit_preview: Option<ExitPreview<'a>>,
}

#[derive(Content)]
struct PostItem<'a> {
    link: Option<Link>,
    title: &'a str,
    subtitle: &'a str,
    date: &'a str,
    author: &'a str,
}

#[derive(Content)]
struct Link {
    href: String,
}

#[derive(Content)]
struct LoadMore<'a> {
    next: &'a str,
}

#[derive(Content)]
struct ExitPreview<'a> {
    url: &'a str,
}

#[derive(Content)]
struct PostPage<'a> {
    site_name: &'a str,
    title: &'a str,
    banner: Option<Banner<'a>>,
    date: String,
    author: &'a str,
    reading_time: String,
    edited: Option<Edited>,
    sections: Vec<ViewSection<'a>>,
    previous: Option<NavLink<'a>>,
    next: Option<NavLink<'a>>,
    comments: Option<ViewComments<'a>>,
    exit_preview: Option<ExitPreview<'a>>,
}

#[derive(Content)]
struct Banner<'a> {
    url: &'a str,
}

#[derive(Content)]
struct Edited {
    at: String,
}

#[derive(Content)]
struct ViewSection<'a> {
    heading: &'a str,
    /// Already-rendered HTML, emitted unescaped.
    body: String,
}

#[derive(Content)]
struct NavLink<'a> {
    href: String,
    title: &'a str,
}

#[derive(Content)]
struct ViewComments<'a> {
    script_url: &'a str,
    repo: &'a str,
    issue_term: &'a str,
    label: &'a str,
    theme: &'a str,
}

impl<'a> NavLink<'a> {
    fn from(post: &'a PostRef) -> Self {
        NavLink {
            href: format!("/post/{}", post.uid),
            title: post.title.as_str(),
        }
    }
}

/// Renders the listing and post pages through ramhorns templates.
pub struct Renderer {
    site: SiteConfig,
    list: Template<'static>,
    post: Template<'static>,
}

impl Renderer {
    /// Compile the templates from `site.template_dir`, or the bundled ones.
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let (list_src, post_src) = match &site.template_dir {
            Some(dir) => (
                read_template(dir, "list.html")?,
                read_template(dir, "post.html")?,
            ),
            None => (LIST_TEMPLATE.to_string(), POST_TEMPLATE.to_string()),
        };

        Ok(Renderer {
            site: site.clone(),
            list: parse_template("list", list_src)?,
            post: parse_template("post", post_src)?,
        })
    }

    /// Home page: post cards plus the "load more" affordance.
    pub fn render_listing(&self, state: &ListingState, preview: bool) -> String {
        let posts = state
            .items
            .iter()
            .map(|post| PostItem {
                link: post.link().map(|href| Link { href }),
                title: post.title.as_str(),
                subtitle: post.subtitle.as_str(),
                date: post.formatted_date.as_str(),
                author: post.author.as_str(),
            })
            .collect();

        let load_more = match (&state.next_cursor, state.is_fetching) {
            (Some(next), false) => Some(LoadMore {
                next: next.as_str(),
            }),
            _ => None,
        };

        self.list.render(&ListPage {
            site_name: self.site.site_name.as_str(),
            posts,
            load_more,
            fetching: state.is_fetching,
            exit_preview: self.exit_preview(preview),
        })
    }

    pub fn render_post(
        &self,
        post: &PostDetail,
        navigation: &PostNavigation,
        preview: bool,
    ) -> String {
        let sections = post
            .sections
            .iter()
            .map(|section| ViewSection {
                heading: section.heading.as_str(),
                body: richtext::as_html(&section.body),
            })
            .collect();

        let c = &self.site.comments;
        let comments = (!preview).then(|| ViewComments {
            script_url: c.script_url.as_str(),
            repo: c.repo.as_str(),
            issue_term: c.issue_term.as_str(),
            label: c.label.as_str(),
            theme: c.theme.as_str(),
        });

        self.post.render(&PostPage {
            site_name: self.site.site_name.as_str(),
            title: post.title.as_str(),
            banner: post.banner_url.as_deref().map(|url| Banner { url }),
            date: post
                .publication_date
                .map(|ts| format::format_date(&ts, false))
                .unwrap_or_default(),
            author: post.author.as_str(),
            reading_time: post.reading_time.to_string(),
            edited: post.last_publication_date.map(|ts| Edited {
                at: format::format_date(&ts, true),
            }),
            sections,
            previous: navigation.previous.as_ref().map(NavLink::from),
            next: navigation.next.as_ref().map(NavLink::from),
            comments,
            exit_preview: self.exit_preview(preview),
        })
    }

    fn exit_preview(&self, preview: bool) -> Option<ExitPreview<'_>> {
        preview.then(|| ExitPreview {
            url: self.site.exit_preview_url.as_str(),
        })
    }
}

fn read_template(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template {:?}", path))
}

fn parse_template(name: &str, src: String) -> Result<Template<'static>> {
    Template::new(src).map_err(|e| anyhow!("Error parsing {} template: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Section;
    use crate::post::PostSummary;
    use crate::richtext::RichTextBlock;
    use chrono::{TimeZone, Utc};

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            id: uid.to_string(),
            uid: Some(uid.to_string()),
            publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 15, 0, 0, 0).unwrap()),
            formatted_date: "15 mar 2021".to_string(),
            title: "Tom & Jerry".to_string(),
            subtitle: "sub".to_string(),
            author: "Ana".to_string(),
        }
    }

    fn detail() -> PostDetail {
        PostDetail {
            id: "1".to_string(),
            uid: "hello".to_string(),
            publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 15, 0, 0, 0).unwrap()),
            last_publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 20, 14, 5, 0).unwrap()),
            title: "Hello".to_string(),
            banner_url: Some("https://images.example.com/b.png".to_string()),
            author: "Ana".to_string(),
            sections: vec![Section {
                heading: "Intro".to_string(),
                body: vec![RichTextBlock::paragraph("First <paragraph>")],
            }],
            reading_time: 1,
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn test_listing_with_more_pages() {
        let state = ListingState {
            items: vec![summary("a"), summary("b")],
            next_cursor: Some("https://cms.example.com/search?page=2".to_string()),
            is_fetching: false,
        };
        let html = renderer().render_listing(&state, false);
        assert!(html.contains("<title>Início | spacetraveling</title>"));
        assert!(html.contains("href=\"/post/a\""));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("Carregar mais posts"));
        assert!(!html.contains("Carregando..."));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_listing_fetching_and_last_page() {
        let mut state = ListingState {
            items: vec![summary("a")],
            next_cursor: Some("next".to_string()),
            is_fetching: true,
        };
        let html = renderer().render_listing(&state, true);
        assert!(!html.contains("Carregar mais posts"));
        assert!(html.contains("Carregando..."));
        assert!(html.contains("href=\"/api/exit-preview\""));

        state.is_fetching = false;
        state.next_cursor = None;
        let html = renderer().render_listing(&state, false);
        assert!(!html.contains("Carregar mais posts"));
        assert!(!html.contains("Carregando..."));
    }

    #[test]
    fn test_listing_card_without_page_has_no_link() {
        let state = ListingState {
            items: vec![summary("../escape")],
            next_cursor: None,
            is_fetching: false,
        };
        let html = renderer().render_listing(&state, false);
        assert!(!html.contains("/post/"));
        assert!(html.contains("<div class=\"post-card\">"));
        assert!(html.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn test_post_page() {
        let nav = PostNavigation {
            previous: Some(PostRef {
                uid: "older".to_string(),
                title: "Older".to_string(),
            }),
            next: None,
        };
        let html = renderer().render_post(&detail(), &nav, false);
        assert!(html.contains("<title>Hello | spacetraveling</title>"));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("1 min"));
        assert!(html.contains("* editado em 20 mar 2021, às 14:05"));
        assert!(html.contains("<h2>Intro</h2>"));
        assert!(html.contains("<p>First &lt;paragraph&gt;</p>"));
        assert!(html.contains("href=\"/post/older\""));
        assert!(!html.contains("Próximo post"));
        assert!(html.contains("repo=\"betolarbac/ignite-reactjs-spacetraveling\""));
        assert!(html.contains("issue-term=\"pathname\""));
    }

    #[test]
    fn test_post_page_in_preview_hides_comments() {
        let mut post = detail();
        post.last_publication_date = None;
        let html = renderer().render_post(&post, &PostNavigation::default(), true);
        assert!(!html.contains("utteranc.es"));
        assert!(!html.contains("editado em"));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_custom_template_dir() {
        let dir = std::env::temp_dir()
            .join(format!("spacetraveling-tpl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("list.html"), "{{#posts}}[{{title}}]{{/posts}}").unwrap();
        std::fs::write(dir.join("post.html"), "{{title}}: {{reading_time}} min").unwrap();

        let site = SiteConfig {
            template_dir: Some(dir.clone()),
            ..SiteConfig::default()
        };
        let renderer = Renderer::new(&site).unwrap();
        let state = ListingState {
            items: vec![summary("a")],
            ..ListingState::default()
        };
        assert_eq!(renderer.render_listing(&state, false), "[Tom &amp; Jerry]");
        assert_eq!(
            renderer.render_post(&detail(), &PostNavigation::default(), false),
            "Hello: 1 min"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_template_dir() {
        let site = SiteConfig {
            template_dir: Some("/nonexistent/templates".into()),
            ..SiteConfig::default()
        };
        assert!(Renderer::new(&site).is_err());
    }
}
