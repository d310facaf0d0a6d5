//! Query-string filtering, search and ordering over the book collection.

use std::cmp::Ordering;
use std::str::FromStr;

use bookstore_http::{AppError, FieldErrors};
use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};
use utoipa::IntoParams;

use super::models::Book;

/// Query parameters accepted by the list endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListParams {
    /// Search terms matched against title, author, genre and description
    pub search: Option<String>,
    /// Order by title, author, published_year, price, stock, created_at or
    /// updated_at; prefix with `-` for descending, separate several with commas
    pub ordering: Option<String>,
    /// Filter by title (case-insensitive substring)
    pub title: Option<String>,
    /// Filter by author (case-insensitive substring)
    pub author: Option<String>,
    /// Filter by genre (case-insensitive substring)
    pub genre: Option<String>,
    /// Filter by exact ISBN
    pub isbn: Option<String>,
    /// Minimum price
    #[param(value_type = Option<f64>)]
    pub price_min: Option<String>,
    /// Maximum price
    #[param(value_type = Option<f64>)]
    pub price_max: Option<String>,
    /// Price range, e.g. `10.00-50.00`
    pub price: Option<String>,
    /// Minimum published year
    #[param(value_type = Option<i32>)]
    pub published_year_min: Option<String>,
    /// Maximum published year
    #[param(value_type = Option<i32>)]
    pub published_year_max: Option<String>,
    /// Published year range, e.g. `2000-2023`
    pub published_year: Option<String>,
    /// Minimum stock quantity
    #[param(value_type = Option<i64>)]
    pub stock_min: Option<String>,
    /// Maximum stock quantity
    #[param(value_type = Option<i64>)]
    pub stock_max: Option<String>,
    /// Stock range, e.g. `1-10`
    pub stock: Option<String>,
    /// `true` for books in stock, `false` for books out of stock
    #[param(value_type = Option<bool>)]
    pub in_stock: Option<String>,
    /// Created at or after this RFC 3339 timestamp or date
    pub created_after: Option<String>,
    /// Created at or before this RFC 3339 timestamp or date
    pub created_before: Option<String>,
    /// Updated at or after this RFC 3339 timestamp or date
    pub updated_after: Option<String>,
    /// Updated at or before this RFC 3339 timestamp or date
    pub updated_before: Option<String>,
    /// Page number, or `last`
    #[param(value_type = Option<String>)]
    pub page: Option<String>,
    /// Results per page
    #[param(value_type = Option<u32>)]
    pub page_size: Option<String>,
}

/// Inclusive lower/upper bound pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn raise_min(&mut self, value: T) {
        match self.min {
            Some(current) if current >= value => {}
            _ => self.min = Some(value),
        }
    }

    fn lower_max(&mut self, value: T) {
        match self.max {
            Some(current) if current <= value => {}
            _ => self.max = Some(value),
        }
    }

    fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderField {
    Title,
    Author,
    PublishedYear,
    Price,
    Stock,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Self::Title,
            "author" => Self::Author,
            "published_year" => Self::PublishedYear,
            "price" => Self::Price,
            "stock" => Self::Stock,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            _ => return None,
        })
    }

    fn compare(self, a: &Book, b: &Book) -> Ordering {
        match self {
            Self::Title => a.title.cmp(&b.title),
            Self::Author => a.author.cmp(&b.author),
            Self::PublishedYear => a.published_year.cmp(&b.published_year),
            Self::Price => a.price.cmp(&b.price),
            Self::Stock => a.stock.cmp(&b.stock),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderKey {
    field: OrderField,
    descending: bool,
}

const DEFAULT_ORDERING: OrderKey = OrderKey {
    field: OrderField::CreatedAt,
    descending: true,
};

/// Predicate set and ordering derived from [`BookListParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct BookFilter {
    title: Option<String>,
    author: Option<String>,
    genre: Option<String>,
    isbn: Option<String>,
    price: Bounds<f64>,
    published_year: Bounds<i64>,
    stock: Bounds<i64>,
    in_stock: Option<bool>,
    created_at: Bounds<OffsetDateTime>,
    updated_at: Bounds<OffsetDateTime>,
    search_terms: Vec<String>,
    ordering: Vec<OrderKey>,
}

impl BookFilter {
    /// Parse query parameters; malformed values are reported per parameter.
    pub fn from_params(params: &BookListParams) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();

        let mut price = Bounds::default();
        let mut published_year = Bounds::default();
        let mut stock = Bounds::default();
        let mut created_at = Bounds::default();
        let mut updated_at = Bounds::default();

        numeric_bounds(
            &mut price,
            ("price", &params.price),
            ("price_min", &params.price_min),
            ("price_max", &params.price_max),
            &mut errors,
        );
        numeric_bounds(
            &mut published_year,
            ("published_year", &params.published_year),
            ("published_year_min", &params.published_year_min),
            ("published_year_max", &params.published_year_max),
            &mut errors,
        );
        numeric_bounds(
            &mut stock,
            ("stock", &params.stock),
            ("stock_min", &params.stock_min),
            ("stock_max", &params.stock_max),
            &mut errors,
        );

        if let Some(ts) = timestamp_bound(&params.created_after, "created_after", &mut errors) {
            created_at.raise_min(ts);
        }
        if let Some(ts) = timestamp_bound(&params.created_before, "created_before", &mut errors) {
            created_at.lower_max(ts);
        }
        if let Some(ts) = timestamp_bound(&params.updated_after, "updated_after", &mut errors) {
            updated_at.raise_min(ts);
        }
        if let Some(ts) = timestamp_bound(&params.updated_before, "updated_before", &mut errors) {
            updated_at.lower_max(ts);
        }

        let in_stock = match non_empty(&params.in_stock) {
            None => None,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => {
                    reject(&mut errors, "in_stock", "Select a valid choice.");
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(AppError::validation(errors, "Invalid filter parameters."));
        }

        Ok(Self {
            title: non_empty(&params.title).map(str::to_lowercase),
            author: non_empty(&params.author).map(str::to_lowercase),
            genre: non_empty(&params.genre).map(str::to_lowercase),
            isbn: non_empty(&params.isbn).map(str::to_string),
            price,
            published_year,
            stock,
            in_stock,
            created_at,
            updated_at,
            search_terms: search_terms(params.search.as_deref()),
            ordering: ordering(params.ordering.as_deref()),
        })
    }

    pub fn matches(&self, book: &Book) -> bool {
        contains_ci(&book.title, self.title.as_deref())
            && contains_ci(&book.author, self.author.as_deref())
            && contains_ci(&book.genre, self.genre.as_deref())
            && self.isbn.as_deref().is_none_or(|isbn| book.isbn == isbn)
            && self.price.contains(book.price.as_f64())
            && self
                .published_year
                .contains(i64::from(book.published_year))
            && self.stock.contains(i64::from(book.stock))
            && self
                .in_stock
                .is_none_or(|wanted| (book.stock > 0) == wanted)
            && self.created_at.contains(book.created_at)
            && self.updated_at.contains(book.updated_at)
            && self.matches_search(book)
    }

    /// Every term must appear in at least one searchable field.
    fn matches_search(&self, book: &Book) -> bool {
        if self.search_terms.is_empty() {
            return true;
        }
        let haystacks = [
            book.title.to_lowercase(),
            book.author.to_lowercase(),
            book.genre.to_lowercase(),
            book.description.as_deref().unwrap_or_default().to_lowercase(),
        ];
        self.search_terms
            .iter()
            .all(|term| haystacks.iter().any(|field| field.contains(term.as_str())))
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        self.ordering
            .iter()
            .map(|key| {
                let ord = key.field.compare(a, b);
                if key.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Filter then order.
    pub fn apply(&self, books: Vec<Book>) -> Vec<Book> {
        let mut selected: Vec<Book> = books.into_iter().filter(|b| self.matches(b)).collect();
        selected.sort_by(|a, b| self.compare(a, b));
        selected
    }
}

fn reject(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|needle| haystack.to_lowercase().contains(needle))
}

/// Numeric filter value; floats must be finite.
trait FilterNumber: FromStr + PartialOrd + Copy {
    fn is_usable(&self) -> bool {
        true
    }
}

impl FilterNumber for i64 {}

impl FilterNumber for f64 {
    fn is_usable(&self) -> bool {
        self.is_finite()
    }
}

fn parse_number<T: FilterNumber>(raw: &str) -> Option<T> {
    raw.trim().parse().ok().filter(T::is_usable)
}

/// Fold the combined `lo-hi` parameter and the explicit `_min`/`_max`
/// parameters into one bound.
fn numeric_bounds<T: FilterNumber>(
    bounds: &mut Bounds<T>,
    range: (&str, &Option<String>),
    min: (&str, &Option<String>),
    max: (&str, &Option<String>),
    errors: &mut FieldErrors,
) {
    if let Some(raw) = non_empty(range.1) {
        match parse_range::<T>(raw) {
            Some((lo, hi)) => {
                if let Some(lo) = lo {
                    bounds.raise_min(lo);
                }
                if let Some(hi) = hi {
                    bounds.lower_max(hi);
                }
            }
            None => reject(errors, range.0, "Enter a valid range, e.g. 10-50."),
        }
    }
    if let Some(raw) = non_empty(min.1) {
        match parse_number(raw) {
            Some(value) => bounds.raise_min(value),
            None => reject(errors, min.0, "Enter a number."),
        }
    }
    if let Some(raw) = non_empty(max.1) {
        match parse_number(raw) {
            Some(value) => bounds.lower_max(value),
            None => reject(errors, max.0, "Enter a number."),
        }
    }
}

/// `lo-hi`, `lo-`, `-hi`, or a single value meaning `value-value`.
fn parse_range<T: FilterNumber>(raw: &str) -> Option<(Option<T>, Option<T>)> {
    let Some((lo, hi)) = raw.split_once('-') else {
        let exact = parse_number(raw)?;
        return Some((Some(exact), Some(exact)));
    };
    let side = |part: &str| -> Option<Option<T>> {
        if part.trim().is_empty() {
            Some(None)
        } else {
            parse_number(part).map(Some)
        }
    };
    let (lo, hi) = (side(lo)?, side(hi)?);
    if lo.is_none() && hi.is_none() {
        return None;
    }
    Some((lo, hi))
}

fn timestamp_bound(
    value: &Option<String>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<OffsetDateTime> {
    let raw = non_empty(value)?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        reject(errors, field, "Enter a valid date/time.");
    }
    parsed
}

/// RFC 3339, or a naive `YYYY-MM-DD[ HH:MM:SS]` read as UTC.
fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for format in naive_formats {
        if let Ok(ts) = PrimitiveDateTime::parse(raw, format) {
            return Some(ts.assume_utc());
        }
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fields outside the allow-list are skipped; nothing usable means the
/// default newest-first ordering.
fn ordering(raw: Option<&str>) -> Vec<OrderKey> {
    let keys: Vec<OrderKey> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (descending, name) = match term.strip_prefix('-') {
                Some(name) => (true, name),
                None => (false, term),
            };
            OrderField::parse(name).map(|field| OrderKey { field, descending })
        })
        .collect();

    if keys.is_empty() {
        vec![DEFAULT_ORDERING]
    } else {
        keys
    }
}
