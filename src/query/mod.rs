//! Query Builders
//!
//! Literal SQL issued next to the stored procedures:
//! - multi-term keyword / genre search (one `EXISTS` clause per term)
//! - natural-key lookups that recover an id the insert procedure did not return
//! - author lookup, genre existence check and the `BookAuthor` insert
//!
//! Builders return SQL text plus positional [`Param`]s; placeholders follow the
//! engine's dialect, so the same builder serves every engine.
//!
//! Console input parsing (argument splitting, lookup classification) lives here
//! too because it decides how values are bound.

use crate::engine::{DatabaseType, Param};
use crate::error::{CirculateError, Result};

/// Parameterized statement ready for `DatabaseEngine::query` / `execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Collects parameters and hands out dialect placeholders in bind order
struct Binder {
    dialect: DatabaseType,
    params: Vec<Param>,
}

impl Binder {
    const fn new(dialect: DatabaseType) -> Self {
        Self { dialect, params: Vec::new() }
    }

    fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        self.dialect.placeholder(self.params.len())
    }

    fn finish(self, sql: String) -> Statement {
        Statement { sql, params: self.params }
    }
}

/// What a multi-term search matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Keywords,
    Genres,
}

impl SearchKind {
    fn clause(self, placeholder: &str) -> String {
        match self {
            Self::Keywords => format!(
                "EXISTS (SELECT 1 FROM Keyword k WHERE k.bookID = b.bookID AND k.word = {placeholder})"
            ),
            Self::Genres => format!(
                "EXISTS (SELECT 1 FROM BookGenre bg JOIN Genre g ON bg.genreID = g.genreID \
                 WHERE bg.bookID = b.bookID AND UPPER(g.genreName) = {placeholder})"
            ),
        }
    }

    fn normalize(self, term: &str) -> String {
        match self {
            Self::Keywords => term.to_string(),
            Self::Genres => term.to_uppercase(),
        }
    }
}

/// Build a search for books matching every comma-separated term
///
/// Terms are trimmed; blank terms are dropped. A list with no terms left is
/// rejected instead of matching every book.
pub fn build_search(kind: SearchKind, raw: &str, dialect: DatabaseType) -> Result<Statement> {
    let terms: Vec<&str> = raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();

    if terms.is_empty() {
        return Err(CirculateError::invalid_input(match kind {
            SearchKind::Keywords => "Enter at least one keyword",
            SearchKind::Genres => "Enter at least one genre",
        }));
    }

    let mut binder = Binder::new(dialect);
    let clauses: Vec<String> = terms
        .iter()
        .map(|term| {
            let placeholder = binder.bind(Param::Text(kind.normalize(term)));
            kind.clause(&placeholder)
        })
        .collect();

    let sql = format!("SELECT * FROM Book b WHERE {}", clauses.join(" AND "));
    Ok(binder.finish(sql))
}

/// Bind a single lookup value
///
/// Values that fit a 32-bit integer are matched exactly; anything else becomes
/// a `%...%` partial match. A 13-digit ISBN is therefore a text match.
#[must_use]
pub fn classify_lookup(raw: &str) -> Param {
    let trimmed = raw.trim();
    trimmed
        .parse::<i32>()
        .map_or_else(|_| Param::Text(format!("%{trimmed}%")), |n| Param::Int(i64::from(n)))
}

/// Split an argument line into exactly `count` values
///
/// One argument takes the whole trimmed line. With more, the line splits on
/// whitespace and the last argument keeps the remainder.
pub fn split_args(line: &str, count: usize) -> Result<Vec<String>> {
    let trimmed = line.trim();
    if count == 0 {
        return Ok(Vec::new());
    }
    if trimmed.is_empty() {
        return Err(CirculateError::invalid_input(format!(
            "Expected {count} argument(s), got none"
        )));
    }
    if count == 1 {
        return Ok(vec![trimmed.to_string()]);
    }

    let mut parts: Vec<String> = Vec::with_capacity(count);
    let mut rest = trimmed;
    while parts.len() + 1 < count {
        match rest.split_once(char::is_whitespace) {
            Some((head, tail)) => {
                parts.push(head.to_string());
                rest = tail.trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }

    if parts.len() < count {
        return Err(CirculateError::invalid_input(format!(
            "Expected {count} arguments, got {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// Parse an integer id argument
pub fn parse_id(raw: &str, name: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| CirculateError::invalid_input(format!("{name} must be a number, got '{raw}'")))
}

/// Recover the newest id whose natural key matches
///
/// With `null_safe`, each key compares with the dialect's null-safe equality so
/// optional fields bound as `NULL` still match.
#[must_use]
pub fn natural_key_lookup(
    table: &str,
    id_column: &str,
    keys: &[(&str, Param)],
    null_safe: bool,
    dialect: DatabaseType,
) -> Statement {
    let op = if null_safe { dialect.null_safe_eq() } else { "=" };

    let mut binder = Binder::new(dialect);
    let mut sql = format!("SELECT {id_column} FROM {table} WHERE ");
    for (i, (column, value)) in keys.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        let placeholder = binder.bind(value.clone());
        sql.push_str(&format!("{column} {op} {placeholder}"));
    }
    sql.push_str(&format!(" ORDER BY {id_column} DESC LIMIT 1"));

    binder.finish(sql)
}

/// `Last First` entry of the authors line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub last: String,
    pub first: Option<String>,
}

impl AuthorName {
    /// Parse comma-separated `Last First` entries, first name optional
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .filter_map(|entry| {
                let mut words = entry.split_whitespace();
                let last = words.next()?.to_string();
                let first = words.next().map(str::to_string);
                Some(Self { last, first })
            })
            .collect()
    }

    /// Display form used in prompts: `First Last`, or just `Last`
    #[must_use]
    pub fn display(&self) -> String {
        match &self.first {
            Some(first) => format!("{first} {}", self.last),
            None => self.last.clone(),
        }
    }
}

/// Find an existing author by last name and first name (or a null first name)
#[must_use]
pub fn author_lookup(name: &AuthorName, dialect: DatabaseType) -> Statement {
    let mut binder = Binder::new(dialect);
    let last = binder.bind(Param::text(name.last.as_str()));

    let sql = match &name.first {
        Some(first) => {
            let first = binder.bind(Param::text(first.as_str()));
            format!(
                "SELECT authorID FROM Author WHERE lastName = {last} \
                 AND (firstName = {first} OR firstName IS NULL) ORDER BY authorID LIMIT 1"
            )
        }
        None => format!(
            "SELECT authorID FROM Author WHERE lastName = {last} \
             AND firstName IS NULL ORDER BY authorID LIMIT 1"
        ),
    };

    binder.finish(sql)
}

/// Check whether a genre with this exact name exists
#[must_use]
pub fn genre_lookup(genre_name: &str, dialect: DatabaseType) -> Statement {
    let mut binder = Binder::new(dialect);
    let name = binder.bind(Param::text(genre_name));
    binder.finish(format!("SELECT genreID FROM Genre WHERE genreName = {name}"))
}

/// Link an author to a book
#[must_use]
pub fn book_author_insert(
    book_id: i64,
    author_id: i64,
    primary: bool,
    dialect: DatabaseType,
) -> Statement {
    let mut binder = Binder::new(dialect);
    let book = binder.bind(Param::Int(book_id));
    let author = binder.bind(Param::Int(author_id));
    let is_primary = binder.bind(Param::Bool(primary));
    binder.finish(format!(
        "INSERT INTO BookAuthor (bookID, authorID, isPrimaryAuthor) VALUES ({book}, {author}, {is_primary})"
    ))
}
