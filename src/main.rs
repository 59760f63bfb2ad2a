use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spacetraveling::catalog::{Catalog, Direction};
use spacetraveling::config::SiteConfig;
use spacetraveling::listing::ListingController;
use spacetraveling::post::{is_safe_slug, PostDetail, PostNavigation};
use spacetraveling::prismic::{self, HttpPageSource};
use spacetraveling::render::Renderer;

#[derive(Parser, Debug)]
#[clap(
    author = "Sridhar Ratnakumar",
    version,
    about = "Render a blog from a headless CMS listing into static HTML pages"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Site settings file (TOML); built-in defaults are used when absent
    #[arg(short, long, global = true, env = "SPACETRAVELING_CONFIG")]
    config: Option<PathBuf>,

    /// CMS preview ref; resolves draft content and switches pages to preview mode
    #[arg(long, global = true, env = "SPACETRAVELING_PREVIEW_REF")]
    preview_ref: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the listing page and every post page into a directory
    Build {
        /// URL of the first listing page (CMS document search endpoint)
        url: String,

        /// Output directory
        #[arg(short, long, default_value = "site")]
        out_dir: PathBuf,

        /// Extra listing pages to load into the home page
        #[arg(long, default_value_t = 0)]
        load_more: usize,
    },
    /// Render a single post page
    Post {
        /// URL of the first listing page (CMS document search endpoint)
        url: String,

        /// Post uid (slug)
        uid: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let site = SiteConfig::load(args.config.as_deref())?;
    let renderer = Renderer::new(&site)?;
    let preview = args.preview_ref.is_some();
    let source = HttpPageSource::new()?;

    match args.command {
        Command::Build {
            url,
            out_dir,
            load_more,
        } => {
            let first_url = listing_url(&url, args.preview_ref.as_deref())?;
            build(&source, &first_url, &out_dir, load_more, &renderer, preview).await
        }
        Command::Post { url, uid, output } => {
            let first_url = listing_url(&url, args.preview_ref.as_deref())?;
            let catalog = Catalog::collect(&source, &first_url).await?;
            let Some(post) = catalog.post_by_uid(&uid)? else {
                bail!("Post not found: {}", uid);
            };
            let rendered = renderer.render_post(&post, &navigation(&catalog, &post), preview);
            write_output(output.as_deref(), &rendered)
        }
    }
}

fn listing_url(url: &str, preview_ref: Option<&str>) -> Result<String> {
    match preview_ref {
        Some(r) => prismic::with_ref(url, r),
        None => Ok(url.to_string()),
    }
}

fn navigation(catalog: &Catalog, post: &PostDetail) -> PostNavigation {
    PostNavigation {
        previous: catalog.adjacent(&post.id, Direction::Previous),
        next: catalog.adjacent(&post.id, Direction::Next),
    }
}

async fn build(
    source: &HttpPageSource,
    first_url: &str,
    out_dir: &Path,
    load_more: usize,
    renderer: &Renderer,
    preview: bool,
) -> Result<()> {
    let catalog = Catalog::collect(source, first_url).await?;
    tracing::info!(documents = catalog.documents().len(), "catalog collected");

    // The home page walks the same pages through the listing controller.
    let controller = ListingController::start(&catalog, first_url)
        .await
        .context("Failed to read the first listing page")?;
    let added = controller.load_pages(load_more).await;
    tracing::info!(
        posts = controller.state().items.len(),
        added,
        more = controller.can_request_more(),
        "listing loaded"
    );

    std::fs::create_dir_all(out_dir.join("post"))
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;
    let index = renderer.render_listing(&controller.state(), preview);
    write_output(Some(out_dir.join("index.html").as_path()), &index)?;

    let mut written = 0;
    for doc in catalog.documents() {
        let Some(post) = PostDetail::from_raw(doc)? else {
            tracing::debug!(id = %doc.id, "skipping document without uid or content");
            continue;
        };
        if !is_safe_slug(&post.uid) {
            tracing::warn!(uid = %post.uid, "skipping post with unsafe uid");
            continue;
        }
        let rendered = renderer.render_post(&post, &navigation(&catalog, &post), preview);
        let path = out_dir.join("post").join(format!("{}.html", post.uid));
        write_output(Some(path.as_path()), &rendered)?;
        written += 1;
    }

    tracing::info!(written, out_dir = ?out_dir, "site written");
    Ok(())
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write output to {:?}", path))?;
            tracing::debug!(path = ?path, "output written");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
