//! Request payload validation for book writes.
//!
//! Payloads are checked field by field and every problem is reported in one
//! field-error map, so a client sees all offending fields at once.

use anyhow::anyhow;
use bookstore_http::{AppError, FieldErrors};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{Book, Price, MAX_PUBLISHED_YEAR, MAX_STOCK, MIN_PUBLISHED_YEAR};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NON_FIELD_ERRORS: &str = "non_field_errors";
const INVALID_MESSAGE: &str = "The submitted book data is invalid.";

const TITLE_MAX: usize = 200;
const AUTHOR_MAX: usize = 100;
const GENRE_MAX: usize = 50;
const ISBN_MAX: usize = 17;
const DESCRIPTION_MAX: usize = 1000;

static ISBN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ISBN(?:-1[03])?:? ").expect("ISBN prefix pattern is valid"));

static ISBN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:97[89][- ]?)?[0-9]{1,5}[- ]?[0-9]+[- ]?[0-9]+[- ]?[0-9X]$")
        .expect("ISBN shape pattern is valid")
});

/// Which write is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// POST: required fields must be present.
    Create,
    /// PUT: required fields must be present; absent optional fields keep their value.
    Replace,
    /// PATCH: any non-empty subset of fields.
    Partial,
}

impl Mode {
    fn requires_all(self) -> bool {
        !matches!(self, Mode::Partial)
    }
}

/// Validated, trimmed field values. `None` means "not supplied".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub genre: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<u32>,
    pub description: Option<Option<String>>,
}

impl BookChanges {
    /// Validate a JSON body for the given write mode.
    pub fn parse(body: &Value, mode: Mode) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();

        let Some(object) = body.as_object() else {
            errors.insert(
                NON_FIELD_ERRORS.to_string(),
                vec![format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_kind(body)
                )],
            );
            return Err(AppError::validation(errors, INVALID_MESSAGE));
        };

        let mut fields = Fields {
            object,
            mode,
            errors: &mut errors,
        };
        let changes = BookChanges {
            title: fields.non_blank_text("title", "Title", TITLE_MAX),
            author: fields.non_blank_text("author", "Author", AUTHOR_MAX),
            isbn: fields.isbn(),
            published_year: fields.published_year(),
            genre: fields.non_blank_text("genre", "Genre", GENRE_MAX),
            price: fields.price(),
            stock: fields.stock(),
            description: fields.description(),
        };

        if errors.is_empty() && mode == Mode::Partial && changes.is_empty() {
            errors.insert(
                NON_FIELD_ERRORS.to_string(),
                vec!["At least one field must be provided for update.".to_string()],
            );
        }

        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(AppError::validation(errors, INVALID_MESSAGE))
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == BookChanges::default()
    }

    /// Build a new record from a payload validated in [`Mode::Create`].
    pub fn into_new_book(self, now: OffsetDateTime) -> Result<Book, AppError> {
        let BookChanges {
            title: Some(title),
            author: Some(author),
            isbn: Some(isbn),
            published_year: Some(published_year),
            genre: Some(genre),
            price: Some(price),
            stock,
            description,
        } = self
        else {
            return Err(AppError::Internal(anyhow!(
                "book payload was not validated for creation"
            )));
        };

        Ok(Book {
            id: Uuid::new_v4(),
            title,
            author,
            isbn,
            published_year,
            genre,
            price,
            stock: stock.unwrap_or(0),
            description: description.flatten(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite the supplied fields of `book` and refresh `updated_at`.
    pub fn apply(self, book: &mut Book, now: OffsetDateTime) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(year) = self.published_year {
            book.published_year = year;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(stock) = self.stock {
            book.stock = stock;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        book.updated_at = now;
    }
}

/// Per-request field reader that records problems as it goes.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    mode: Mode,
    errors: &'a mut FieldErrors,
}

impl<'a> Fields<'a> {
    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Present, non-null value; records required/null errors otherwise.
    fn value(&mut self, field: &str, required: bool) -> Option<&'a Value> {
        let object = self.object;
        match object.get(field) {
            None => {
                if required && self.mode.requires_all() {
                    self.reject(field, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.reject(field, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    fn text(&mut self, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.reject(field, "Not a valid string.");
                None
            }
        }
    }

    fn check_length(&mut self, field: &str, value: String, max: usize) -> Option<String> {
        if value.chars().count() > max {
            self.reject(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
            return None;
        }
        Some(value)
    }

    fn non_blank_text(&mut self, field: &str, label: &str, max: usize) -> Option<String> {
        let value = self.value(field, true)?;
        let text = self.text(field, value)?;
        if text.is_empty() {
            self.reject(
                field,
                format!("{label} cannot be empty or contain only whitespace."),
            );
            return None;
        }
        self.check_length(field, text, max)
    }

    fn isbn(&mut self) -> Option<String> {
        let value = self.value("isbn", true)?;
        let isbn = self.text("isbn", value)?;
        if isbn.is_empty() {
            self.reject("isbn", "This field may not be blank.");
            return None;
        }
        let isbn = self.check_length("isbn", isbn, ISBN_MAX)?;
        if !is_valid_isbn(&isbn) {
            self.reject(
                "isbn",
                "Invalid ISBN format. Please provide a valid ISBN-10 or ISBN-13.",
            );
            return None;
        }
        Some(isbn)
    }

    fn integer(&mut self, field: &str, value: &Value) -> Option<i64> {
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.reject(field, "A valid integer is required.");
        }
        parsed
    }

    fn published_year(&mut self) -> Option<i32> {
        let value = self.value("published_year", true)?;
        let year = self.integer("published_year", value)?;
        if year < MIN_PUBLISHED_YEAR {
            self.reject(
                "published_year",
                format!("Published year must be at least {MIN_PUBLISHED_YEAR}"),
            );
            return None;
        }
        if year > MAX_PUBLISHED_YEAR {
            self.reject(
                "published_year",
                format!("Published year cannot be more than {MAX_PUBLISHED_YEAR}"),
            );
            return None;
        }
        i32::try_from(year).ok()
    }

    fn price(&mut self) -> Option<Price> {
        let value = self.value("price", true)?;
        let literal = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => {
                self.reject("price", "A valid number is required.");
                return None;
            }
        };
        match Price::parse(&literal) {
            Ok(price) => Some(price),
            Err(message) => {
                self.reject("price", message);
                None
            }
        }
    }

    fn stock(&mut self) -> Option<u32> {
        let value = self.value("stock", false)?;
        let stock = self.integer("stock", value)?;
        if stock < 0 {
            self.reject("stock", "Ensure this value is greater than or equal to 0.");
            return None;
        }
        if stock > MAX_STOCK {
            self.reject(
                "stock",
                format!("Ensure this value is less than or equal to {MAX_STOCK}."),
            );
            return None;
        }
        u32::try_from(stock).ok()
    }

    fn description(&mut self) -> Option<Option<String>> {
        let object = self.object;
        match object.get("description") {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => {
                let text = self.text("description", value)?;
                let text = self.check_length("description", text, DESCRIPTION_MAX)?;
                Some(Some(text))
            }
        }
    }
}

/// ISBN-10 or ISBN-13, bare or grouped with hyphens/spaces, with an
/// optional `ISBN`, `ISBN-10:` or `ISBN-13:` prefix.
pub fn is_valid_isbn(raw: &str) -> bool {
    let body = match ISBN_PREFIX.find(raw) {
        Some(prefix) => &raw[prefix.end()..],
        None => raw,
    };
    if !ISBN_SHAPE.is_match(body) {
        return false;
    }

    let separators = body.chars().filter(|c| *c == '-' || *c == ' ').count();
    let has_x = body.contains('X');
    match (separators, body.len()) {
        (0, 10) => true,
        (0, 13) => !has_x && (body.starts_with("978") || body.starts_with("979")),
        (3 | 4, 13) => true,
        (4, 17) => !has_x,
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
