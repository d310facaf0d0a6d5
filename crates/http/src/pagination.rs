//! Page-number pagination.

use bookstore_kernel::settings::ApiSettings;

use crate::error::AppError;

const PAGE_PARAM: &str = "page";

/// Requested window over a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: PageNumber,
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageNumber {
    Number(usize),
    Last,
}

/// One page of results plus links to its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageRequest {
    /// Parse `page` and `page_size` query values.
    ///
    /// An unusable `page_size` falls back to the configured default; an
    /// unusable `page` is rejected.
    pub fn from_params(
        page: Option<&str>,
        page_size: Option<&str>,
        settings: &ApiSettings,
    ) -> Result<Self, AppError> {
        let page = match page.map(str::trim) {
            None | Some("") => PageNumber::Number(1),
            Some("last") => PageNumber::Last,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => PageNumber::Number(n),
                _ => return Err(invalid_page()),
            },
        };

        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .map(|size| size.min(settings.max_page_size))
            .unwrap_or(settings.page_size);

        Ok(Self { page, page_size })
    }

    /// Slice `items` and build `next`/`previous` links from the request path
    /// and raw query string.
    pub fn paginate<T>(
        &self,
        items: Vec<T>,
        path: &str,
        query: Option<&str>,
    ) -> Result<Page<T>, AppError> {
        let count = items.len();
        let num_pages = count.div_ceil(self.page_size).max(1);
        let page = match self.page {
            PageNumber::Number(n) if n <= num_pages => n,
            PageNumber::Number(_) => return Err(invalid_page()),
            PageNumber::Last => num_pages,
        };

        let start = (page - 1) * self.page_size;
        let items: Vec<T> = items.into_iter().skip(start).take(self.page_size).collect();

        let next = (page < num_pages).then(|| page_link(path, query, Some(page + 1)));
        let previous = match page {
            1 => None,
            2 => Some(page_link(path, query, None)),
            n => Some(page_link(path, query, Some(n - 1))),
        };

        Ok(Page {
            items,
            count,
            next,
            previous,
        })
    }
}

fn invalid_page() -> AppError {
    AppError::not_found("Invalid page", "Invalid page.")
}

/// Rebuild the request target with only the `page` pair replaced.
fn page_link(path: &str, query: Option<&str>, page: Option<usize>) -> String {
    let mut pairs: Vec<String> = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(PAGE_PARAM))
        .map(str::to_string)
        .collect();

    if let Some(page) = page {
        pairs.push(format!("{PAGE_PARAM}={page}"));
    }

    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, pairs.join("&"))
    }
}
