//! Quill CLI
//!
//! Rewrites an HTML page with its critical CSS inlined and prints the
//! result. Stylesheets are fetched over HTTP unless local fixtures are given
//! with `--css`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use quill_common::logging::init_logging;
use quill_common::net::{HttpFetcher, MockFetcher, UrlFetcher};
use quill_common::options::RewriteOptions;
use quill_common::url::parse_document_url;
use quill_rewrite::{ServerContext, rewrite_html, write_critical_selectors};

/// Inline the critical CSS of an HTML page
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Rewrite a saved page, fetching its stylesheets
    quill --url https://example.com/ --critical-selectors 'body,h1,.nav' page.html

    # Serve stylesheets from local files instead
    quill --url http://test.com/ --critical-selectors div \
        --css http://test.com/a.css=a.css \
        --html '<link rel=stylesheet href=a.css><div>x</div>'

    # Flush every 512 bytes and list summary states in a comment
    quill --chunk-size 512 --debug --critical-selectors-file sel.json page.html
"#)]
struct Cli {
    /// Path to the HTML file
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Rewrite this HTML string instead of a file
    #[arg(long, value_name = "HTML")]
    html: Option<String>,

    /// URL of the document, used to resolve stylesheet links
    #[arg(long, default_value = "http://localhost/")]
    url: String,

    /// Comma-separated critical selectors
    #[arg(long, value_name = "SELECTORS", value_delimiter = ',')]
    critical_selectors: Vec<String>,

    /// File with critical selectors: a JSON array, or one per line
    #[arg(long, value_name = "FILE")]
    critical_selectors_file: Option<PathBuf>,

    /// JSON file with rewrite options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Stop parsing after this many bytes of HTML
    #[arg(long, value_name = "BYTES")]
    max_html_bytes: Option<i64>,

    /// Flush after every N bytes of input (0 = whole document at once)
    #[arg(long, default_value = "0")]
    chunk_size: usize,

    /// Add debug comments to the output
    #[arg(long)]
    debug: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Serve a stylesheet from a local file, as URL=FILE (repeatable)
    #[arg(long, value_name = "URL=FILE")]
    css: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let html = load_html(&cli)?;
    let options = load_options(&cli)?;
    let fetcher = build_fetcher(&cli.css)?;
    let context = ServerContext::new(fetcher).with_options(options);

    // The filter looks selectors up under the URL as the parser
    // normalizes it.
    let page_url = parse_document_url(&cli.url)
        .with_context(|| format!("{} is not an absolute URL", cli.url))?;
    let selectors = load_selectors(&cli)?;
    if selectors.is_empty() {
        eprintln!("{} no critical selectors given, page is left as is", "warning:".yellow().bold());
    }
    write_critical_selectors(context.property_cache.as_ref(), page_url.as_str(), selectors)
        .context("storing critical selectors")?;

    let output = rewrite_html(&context, &cli.url, &html, cli.chunk_size)
        .with_context(|| format!("rewriting {}", cli.url))?;
    println!("{output}");

    print_statistics(&context);
    Ok(())
}

/// Read the document from `--html` or the file argument
fn load_html(cli: &Cli) -> Result<String> {
    if let Some(ref html) = cli.html {
        Ok(html.clone())
    } else if let Some(ref path) = cli.path {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    } else {
        bail!("an HTML file or --html is required")
    }
}

/// Options from `--options`, with flags applied on top
fn load_options(cli: &Cli) -> Result<RewriteOptions> {
    let mut options = match cli.options {
        Some(ref path) => RewriteOptions::from_path(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => RewriteOptions::default(),
    };
    if let Some(limit) = cli.max_html_bytes {
        options.max_html_bytes = limit;
    }
    if cli.debug {
        options.debug = true;
    }
    Ok(options)
}

/// A mock fetcher when fixtures are given, HTTP otherwise
fn build_fetcher(fixtures: &[String]) -> Result<Arc<dyn UrlFetcher>> {
    if fixtures.is_empty() {
        return Ok(Arc::new(HttpFetcher::new().context("building HTTP client")?));
    }
    let fetcher = MockFetcher::new();
    for fixture in fixtures {
        let Some((url, path)) = fixture.split_once('=') else {
            bail!("--css expects URL=FILE, got {fixture}");
        };
        let css = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        fetcher.insert_css(url, &css);
    }
    Ok(Arc::new(fetcher))
}

/// Selectors from `--critical-selectors` and `--critical-selectors-file`
fn load_selectors(cli: &Cli) -> Result<Vec<String>> {
    let mut selectors: Vec<String> = cli
        .critical_selectors
        .iter()
        .map(|selector| selector.trim().to_string())
        .filter(|selector| !selector.is_empty())
        .collect();
    if let Some(ref path) = cli.critical_selectors_file {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        if text.trim_start().starts_with('[') {
            let list: Vec<String> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {} as a JSON array", path.display()))?;
            selectors.extend(list);
        } else {
            selectors.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }
    }
    Ok(selectors)
}

/// Print non-zero counters to stderr
fn print_statistics(context: &ServerContext) {
    let counters: Vec<_> = context
        .stats
        .snapshot()
        .into_iter()
        .filter(|&(_, value)| value > 0)
        .collect();
    if counters.is_empty() {
        return;
    }
    eprintln!("{}", "=== Statistics ===".bold());
    for (name, value) in counters {
        eprintln!("  {} {}", format!("{name:<28}").dimmed(), value.green());
    }
}
