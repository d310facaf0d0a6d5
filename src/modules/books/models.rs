use std::collections::HashSet;
use std::fmt;

use bookstore_db::Record;
use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MIN_PUBLISHED_YEAR: i64 = 1000;
pub const MAX_PUBLISHED_YEAR: i64 = 2025;
pub const MAX_STOCK: i64 = 2_147_483_647;

const PRICE_MAX_INTEGER_DIGITS: usize = 6;
const PRICE_DECIMAL_PLACES: usize = 2;
const PRICE_MIN_CENTS: u64 = 1;

/// Amount in USD with cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse a decimal literal such as `12`, `12.5` or `12.50`.
    ///
    /// The error is the client-facing message for the `price` field.
    pub fn parse(raw: &str) -> Result<Self, String> {
        const INVALID: &str = "A valid number is required.";

        let raw = raw.trim();
        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if integer.is_empty() && fraction.is_empty() {
            return Err(INVALID.to_string());
        }
        if !integer.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(INVALID.to_string());
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > PRICE_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
            ));
        }
        let integer = integer.trim_start_matches('0');
        if integer.len() > PRICE_MAX_INTEGER_DIGITS {
            return Err(format!(
                "Ensure that there are no more than {PRICE_MAX_INTEGER_DIGITS} digits before the decimal point."
            ));
        }

        let whole: u64 = if integer.is_empty() {
            0
        } else {
            integer.parse().map_err(|_| INVALID.to_string())?
        };
        let cents: u64 = format!("{fraction:0<2}")
            .parse()
            .map_err(|_| INVALID.to_string())?;
        let total = whole * 100 + cents;

        if negative || total < PRICE_MIN_CENTS {
            return Err("Ensure this value is greater than or equal to 0.01.".to_string());
        }

        Ok(Self(total))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A book in the bookstore catalog.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Book {
    /// Unique identifier for the book
    pub id: Uuid,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// ISBN-10 or ISBN-13 of the book
    #[schema(example = "978-0-7432-7356-5")]
    pub isbn: String,
    /// Year the book was published
    pub published_year: i32,
    /// Genre of the book
    pub genre: String,
    /// Price of the book in USD
    #[schema(value_type = String, example = "12.99")]
    pub price: Price,
    /// Number of books in stock
    pub stock: u32,
    /// Description of the book
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Book {
    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("isbn", self.isbn.clone())]
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

/// Writable book fields, as accepted by create and update.
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct BookRequest {
    /// Non-blank, at most 200 characters
    title: String,
    /// Non-blank, at most 100 characters
    author: String,
    /// ISBN-10 or ISBN-13, unique across the catalog
    #[schema(example = "978-0-123456-78-9")]
    isbn: String,
    /// Between 1000 and 2025
    published_year: i32,
    /// Non-blank, at most 50 characters
    genre: String,
    /// At least 0.01, two decimal places
    #[schema(value_type = f64, example = 19.99)]
    price: Price,
    /// Defaults to 0 on create
    stock: Option<u32>,
    /// At most 1000 characters
    description: Option<String>,
}

/// Aggregate figures over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookStats {
    pub total_books: usize,
    pub total_stock: u64,
    pub out_of_stock_books: usize,
    pub genres_count: usize,
    pub average_price: f64,
    pub most_expensive_book: f64,
    pub cheapest_book: f64,
}

impl BookStats {
    pub fn from_books(books: &[Book]) -> Self {
        let total_cents: u64 = books.iter().map(|book| book.price.cents()).sum();
        let average_price = if books.is_empty() {
            0.0
        } else {
            total_cents as f64 / books.len() as f64 / 100.0
        };
        let genres: HashSet<&str> = books.iter().map(|book| book.genre.as_str()).collect();

        Self {
            total_books: books.len(),
            total_stock: books.iter().map(|book| u64::from(book.stock)).sum(),
            out_of_stock_books: books.iter().filter(|book| book.stock == 0).count(),
            genres_count: genres.len(),
            average_price,
            most_expensive_book: books
                .iter()
                .map(|book| book.price)
                .max()
                .map_or(0.0, Price::as_f64),
            cheapest_book: books
                .iter()
                .map(|book| book.price)
                .min()
                .map_or(0.0, Price::as_f64),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_book(title: &str, genre: &str, cents: u64, stock: u32) -> Book {
        let now = OffsetDateTime::now_utc();
        Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: "Test Author".to_string(),
            isbn: format!("978{:010}", Uuid::new_v4().as_u128() % 10_000_000_000),
            published_year: 2000,
            genre: genre.to_string(),
            price: Price::from_cents(cents),
            stock,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn price_parses_decimal_literals() {
        assert_eq!(Price::parse("12").unwrap().cents(), 1200);
        assert_eq!(Price::parse("12.5").unwrap().cents(), 1250);
        assert_eq!(Price::parse("0.01").unwrap().cents(), 1);
        assert_eq!(Price::parse(".99").unwrap().cents(), 99);
        assert_eq!(Price::parse("19.990").unwrap().cents(), 1999);
        assert_eq!(Price::parse("999999.99").unwrap().cents(), 99_999_999);
    }

    #[test]
    fn price_rejects_out_of_contract_values() {
        assert!(Price::parse("0").unwrap_err().contains("greater than or equal to 0.01"));
        assert!(Price::parse("-5").unwrap_err().contains("greater than or equal to 0.01"));
        assert!(Price::parse("1.999").unwrap_err().contains("decimal places"));
        assert!(Price::parse("1000000").unwrap_err().contains("digits before"));
        assert_eq!(
            Price::parse("ten").unwrap_err(),
            "A valid number is required."
        );
        assert!(Price::parse(".").is_err());
        assert!(Price::parse("1e3").is_err());
    }

    #[test]
    fn price_serializes_with_two_decimals() {
        let value = serde_json::to_value(Price::from_cents(1250)).unwrap();
        assert_eq!(value, serde_json::json!("12.50"));
        assert_eq!(Price::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn stats_over_known_fixture() {
        let books = vec![
            sample_book("A", "Fiction", 1000, 5),
            sample_book("B", "Fiction", 2000, 0),
            sample_book("C", "Poetry", 3000, 7),
            sample_book("D", "History", 4500, 0),
        ];

        let stats = BookStats::from_books(&books);
        assert_eq!(stats.total_books, 4);
        assert_eq!(stats.total_stock, 12);
        assert_eq!(stats.out_of_stock_books, 2);
        assert_eq!(stats.genres_count, 3);
        assert_eq!(stats.average_price, 26.25);
        assert_eq!(stats.most_expensive_book, 45.0);
        assert_eq!(stats.cheapest_book, 10.0);
    }

    #[test]
    fn average_price_is_the_exact_mean() {
        let books = vec![
            sample_book("A", "Fiction", 1000, 1),
            sample_book("B", "Fiction", 1001, 1),
            sample_book("C", "Fiction", 1001, 1),
        ];

        let stats = BookStats::from_books(&books);
        assert!((stats.average_price - 3002.0 / 300.0).abs() < 1e-9);
        assert_ne!(stats.average_price, 10.01);
        assert_eq!(stats.cheapest_book, 10.0);
        assert_eq!(stats.most_expensive_book, 10.01);
    }

    #[test]
    fn stats_of_empty_catalog_are_zero() {
        let stats = BookStats::from_books(&[]);
        assert_eq!(stats.total_books, 0);
        assert_eq!(stats.average_price, 0.0);
        assert_eq!(stats.most_expensive_book, 0.0);
        assert_eq!(stats.cheapest_book, 0.0);
    }

    #[test]
    fn book_serializes_price_as_string_and_rfc3339_timestamps() {
        let book = sample_book("Dune", "Sci-Fi", 1599, 3);
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["price"], "15.99");
        assert!(value["created_at"].as_str().unwrap().contains('T'));
        assert_eq!(value["id"], book.id.to_string());
    }
}
