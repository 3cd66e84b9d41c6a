//! Example: Fetching a page through a local FlareSolverr.
//!
//! Start the solver first, e.g. `docker run -p 8191:8191 ghcr.io/flaresolverr/flaresolverr`.
//!
//! Run with: cargo run --example fetch_page -- https://example.com

use flaresolverr_fetch::{CookieJar, FlareSolverrFetcher, HttpFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output (optional)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    // Override the solver location through the environment if needed
    let config = |key: &str| std::env::var(key.to_uppercase()).ok();

    let fetcher = FlareSolverrFetcher::new(HttpFetcher::new()?, config);
    println!("Solver endpoint: {}", fetcher.proxy_config().endpoint());

    match fetcher.get(&url).await {
        Ok(page) => {
            println!("Success!");
            println!("  final url: {}", page.redirect_url);
            println!("  bytes: {}", page.content.len());
            let preview: String = page.text().chars().take(200).collect();
            println!("  preview: {}...", preview);
        }
        Err(e) if e.is_proxy_failure() => {
            println!("Solver failed: {}", e);
        }
        Err(e) => {
            println!("Failed: {}", e);
        }
    }

    let jar = fetcher.cookie_jar();
    let cookies = jar.read().map(|j| j.cookies()).unwrap_or_default();
    for cookie in cookies {
        println!("  cookie {}={} ({})", cookie.name, cookie.value, cookie.domain);
    }

    Ok(())
}
