use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Hard ceiling on pages fetched for one paged sequence (100 records each)
pub const MAX_PAGES: usize = 50;

/// One page of a paged endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records decoded from the page body
    pub records: Vec<T>,
    /// Cursor URL of the following page, if the server advertised one
    pub next: Option<String>,
}

/// Something that can fetch a single page by URL
#[async_trait]
pub trait PageFetcher<T: Send>: Sync {
    /// Fetches the page at `url`
    async fn fetch_page(&self, url: &str) -> Result<Page<T>>;
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header
///
/// `<https://api.github.com/...?page=2>; rel="next", <...?page=5>; rel="last"`
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });

        if is_next && !target.is_empty() {
            Some(target.to_string())
        } else {
            None
        }
    })
}

/// Follows next links from `first_url`, concatenating every page's records
///
/// Pages are fetched strictly in order. Any page failure aborts the whole
/// sequence; fetching stops after [`MAX_PAGES`] pages even if more remain.
pub async fn collect_pages<T, F>(fetcher: &F, first_url: String) -> Result<Vec<T>>
where
    T: Send,
    F: PageFetcher<T> + ?Sized,
{
    let mut records = Vec::new();
    let mut next = Some(first_url);
    let mut pages = 0;

    while let Some(url) = next.take() {
        if pages == MAX_PAGES {
            warn!(pages, "reached page limit, stopping pagination");
            break;
        }

        let page = fetcher.fetch_page(&url).await?;
        pages += 1;
        debug!(page = pages, records = page.records.len(), "fetched page");

        records.extend(page.records);
        next = page.next;
    }

    debug!(pages, total = records.len(), "pagination finished");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntrospectError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `pages` pages of `per_page` numbers each, failing at `fail_at` if set
    struct SyntheticServer {
        pages: usize,
        per_page: usize,
        fail_at: Option<usize>,
        calls: AtomicUsize,
    }

    impl SyntheticServer {
        fn new(pages: usize, per_page: usize) -> Self {
            Self {
                pages,
                per_page,
                fail_at: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher<usize> for SyntheticServer {
        async fn fetch_page(&self, url: &str) -> Result<Page<usize>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let page: usize = url
                .rsplit("page=")
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| IntrospectError::new("bad url"))?;

            if self.fail_at == Some(page) {
                return Err(IntrospectError::Network("connection reset".into()));
            }

            let records = (0..self.per_page).map(|i| page * 1000 + i).collect();
            let next = (page < self.pages).then(|| format!("mem://commits?page={}", page + 1));
            Ok(Page { records, next })
        }
    }

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.github.com/repositories/1/commits?page=2>; rel="next", <https://api.github.com/repositories/1/commits?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/commits?page=2")
        );
    }

    #[test]
    fn test_parse_next_link_not_first() {
        let header = r#"<https://x/?page=1>; rel="prev", <https://x/?page=3>; rel="next""#;
        assert_eq!(parse_next_link(header).as_deref(), Some("https://x/?page=3"));
    }

    #[test]
    fn test_parse_next_link_absent() {
        assert_eq!(parse_next_link(""), None);
        assert_eq!(parse_next_link(r#"<https://x/?page=1>; rel="prev""#), None);
        assert_eq!(parse_next_link("garbage"), None);
    }

    #[tokio::test]
    async fn test_collects_all_pages_under_limit() -> Result<()> {
        let server = SyntheticServer::new(3, 2);
        let records = collect_pages(&server, "mem://commits?page=1".to_string()).await?;

        assert_eq!(records, vec![1000, 1001, 2000, 2001, 3000, 3001]);
        assert_eq!(server.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_exactly_max_pages() -> Result<()> {
        let server = SyntheticServer::new(MAX_PAGES, 1);
        let records = collect_pages(&server, "mem://commits?page=1".to_string()).await?;

        assert_eq!(records.len(), MAX_PAGES);
        assert_eq!(server.calls.load(Ordering::SeqCst), MAX_PAGES);
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_at_page_ceiling() -> Result<()> {
        let server = SyntheticServer::new(80, 100);
        let records = collect_pages(&server, "mem://commits?page=1".to_string()).await?;

        assert_eq!(server.calls.load(Ordering::SeqCst), MAX_PAGES);
        assert_eq!(records.len(), MAX_PAGES * 100);
        assert_eq!(records.last(), Some(&(MAX_PAGES * 1000 + 99)));
        Ok(())
    }

    #[tokio::test]
    async fn test_page_failure_aborts_sequence() {
        let server = SyntheticServer {
            fail_at: Some(2),
            ..SyntheticServer::new(4, 10)
        };
        let result = collect_pages(&server, "mem://commits?page=1".to_string()).await;

        assert!(matches!(result, Err(IntrospectError::Network(_))));
        assert_eq!(server.calls.load(Ordering::SeqCst), 2);
    }
}
