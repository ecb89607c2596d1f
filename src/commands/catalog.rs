//! Catalog maintenance: books, authors, genres, keywords and copies
//!
//! The insert procedures do not return generated keys. After each insert the
//! handler re-selects the newest row with the same natural key, inside the same
//! transaction, to learn the id.

use super::Context;
use crate::console::Console;
use crate::engine::{DatabaseEngine, Param};
use crate::error::{CirculateError, Result};
use crate::output::AUTHOR_COLUMNS;
use crate::query::{
    author_lookup, book_author_insert, classify_lookup, genre_lookup, natural_key_lookup,
    parse_id, AuthorName,
};

const AUTHOR_STATUSES: &[&str] = &["active", "inactive", "unknown"];
const COPY_CONDITIONS: &[&str] = &["good", "neutral", "poor"];

fn validate_status(status: &str) -> Result<()> {
    if AUTHOR_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CirculateError::invalid_input(
            "Invalid status. Please enter 'active', 'inactive', or 'unknown'.",
        ))
    }
}

fn validate_condition(condition: &str) -> Result<()> {
    if COPY_CONDITIONS.contains(&condition) {
        Ok(())
    } else {
        Err(CirculateError::invalid_input(
            "Invalid condition. Please enter 'good', 'neutral', or 'poor'.",
        ))
    }
}

/// Prompt for an author's details, add them and return the new author id
///
/// Names already known (from the authors line of a new book) are not asked
/// again.
pub async fn create_author<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<i64> {
    const FAILURE: &str = "Error adding author.";

    if let (Some(first), Some(last)) = (&first_name, &last_name) {
        ctx.say(&format!("Please fill out all available information for {first} {last}:"))?;
    }
    let first_name = match first_name {
        Some(first) => first,
        None => ctx.ask("Enter author's first name:")?.trim().to_string(),
    };
    let last_name = match last_name {
        Some(last) => last,
        None => ctx.ask("Enter author's last name:")?.trim().to_string(),
    };
    let dob = ctx.ask("Enter author's date of birth:")?;
    let status = ctx.ask("Enter author's status (active, inactive, or unknown)")?;
    let status = status.trim();
    validate_status(status)?;

    let first = Param::optional_text(&first_name);
    let last = Param::optional_text(&last_name);
    ctx.invoke(
        "addAuthor",
        &[first.clone(), last.clone(), Param::optional_text(&dob), Param::text(status)],
        FAILURE,
    )
    .await?;

    let lookup = natural_key_lookup(
        "Author",
        "authorID",
        &[("firstName", first), ("lastName", last)],
        true,
        ctx.dialect(),
    );
    let Some(author_id) = ctx.lookup_id(&lookup, "authorID").await? else {
        ctx.say(FAILURE)?;
        return Err(CirculateError::procedure_failed("addAuthor", "new author row not found"));
    };

    let display = [first_name.as_str(), last_name.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    ctx.say(&format!("Author {display} added successfully with ID {author_id}."))?;
    Ok(author_id)
}

pub async fn find_author_by_name<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    name: &str,
) -> Result<()> {
    ctx.show("findAuthorName", &[classify_lookup(name)], AUTHOR_COLUMNS).await
}

pub async fn find_author_by_id<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    author_id: &str,
) -> Result<()> {
    let author_id = parse_id(author_id, "authorID")?;
    ctx.show("findAuthorID", &[Param::Int(author_id)], AUTHOR_COLUMNS).await
}

/// Replace every field of an author
pub async fn update_author<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    author_id: &str,
) -> Result<()> {
    let author_id = parse_id(author_id, "authorID")?;

    let first_name = ctx.ask("Enter author's first name:")?;
    let last_name = ctx.ask("Enter author's last name:")?;
    let dob = ctx.ask("Enter author's date of birth:")?;
    let status = ctx.ask("Enter author's status (active, inactive, or unknown):")?;
    let status = status.trim();
    validate_status(status)?;

    ctx.perform(
        "updateAuthor",
        &[
            Param::Int(author_id),
            Param::optional_text(&first_name),
            Param::optional_text(&last_name),
            Param::optional_text(&dob),
            Param::text(status),
        ],
        "Author updated successfully.",
        "Error updating author.",
    )
    .await
}

/// Prompt for a genre description, add the genre and return its id
pub async fn create_genre<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    genre_name: &str,
) -> Result<i64> {
    const FAILURE: &str = "Error adding genre.";

    ctx.say(&format!("Please fill out all available information for {genre_name}:"))?;
    let description = ctx.ask("Enter genre description:")?;

    ctx.invoke(
        "addGenre",
        &[Param::text(genre_name), Param::optional_text(&description)],
        FAILURE,
    )
    .await?;

    let lookup = natural_key_lookup(
        "Genre",
        "genreID",
        &[("genreName", Param::text(genre_name))],
        false,
        ctx.dialect(),
    );
    let Some(genre_id) = ctx.lookup_id(&lookup, "genreID").await? else {
        ctx.say(FAILURE)?;
        return Err(CirculateError::procedure_failed("addGenre", "new genre row not found"));
    };

    ctx.say(&format!("Genre {genre_name} added successfully with ID {genre_id}."))?;
    Ok(genre_id)
}

/// Tag a book with a genre, creating the genre first when it is new
pub async fn add_genre_to_book<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
    genre_name: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;

    let existing = genre_lookup(genre_name, ctx.dialect());
    if ctx.lookup_id(&existing, "genreID").await?.is_none() {
        ctx.say("Genre not found, opening new genre prompt!")?;
        create_genre(ctx, genre_name).await?;
    }

    ctx.perform(
        "addBookGenre",
        &[Param::Int(book_id), Param::text(genre_name)],
        "Genre added to book successfully.",
        "Error adding genre to book.",
    )
    .await
}

pub async fn remove_genre_from_book<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
    genre_name: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.perform(
        "removeBookGenre",
        &[Param::Int(book_id), Param::text(genre_name)],
        "Genre removed from book successfully.",
        "Error removing genre from book.",
    )
    .await
}

pub async fn add_keyword<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
    keyword: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.perform(
        "addKeyword",
        &[Param::Int(book_id), Param::text(keyword)],
        "Keyword added to book successfully.",
        "Error adding keyword to book.",
    )
    .await
}

pub async fn remove_keyword<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
    keyword: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.perform(
        "removeKeyword",
        &[Param::Int(book_id), Param::text(keyword)],
        "Keyword removed from book successfully.",
        "Error removing keyword from book.",
    )
    .await
}

pub async fn add_copy<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
    condition: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    validate_condition(condition)?;

    ctx.perform(
        "addCopy",
        &[Param::Int(book_id), Param::text(condition)],
        "Copy added successfully.",
        "Error adding copy.",
    )
    .await
}

pub async fn remove_copy<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    copy_id: &str,
) -> Result<()> {
    let copy_id = parse_id(copy_id, "copyID")?;
    ctx.perform(
        "removeCopy",
        &[Param::Int(copy_id)],
        "Copy removed successfully.",
        "Error removing copy.",
    )
    .await
}

/// Prompt for a new book and link its authors
///
/// Optional fields left blank are stored as `NULL`. Every listed author is
/// linked; the first one is the primary author. Unknown authors are created
/// on the spot.
pub async fn add_book<E: DatabaseEngine, C: Console>(ctx: &mut Context<'_, E, C>) -> Result<()> {
    const FAILURE: &str = "Error adding book.";

    let title = ctx.ask("Enter book title:")?;
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CirculateError::invalid_input("A book needs a title"));
    }

    let isbn = Param::optional_text(&ctx.ask("ISBN, enter for N/A:")?);
    let edition = Param::optional_text(&ctx.ask("Edition, enter for N/A:")?);
    let published = Param::optional_text(&ctx.ask("Publication date, enter for N/A:")?);
    let publisher = Param::optional_text(&ctx.ask("Publisher, enter for N/A:")?);
    let copyright = Param::optional_text(&ctx.ask("Copyright year, enter for N/A:")?);
    let authors_line =
        ctx.ask("Authors (firstName lastName), primary author first, comma separated:")?;

    let authors = AuthorName::parse_list(&authors_line);
    if authors.is_empty() {
        return Err(CirculateError::invalid_input("A book needs at least one author"));
    }

    let fields = [
        ("title", Param::text(title.as_str())),
        ("ISBN", isbn),
        ("edition", edition),
        ("publicationDate", published),
        ("publisher", publisher),
        ("copyrightYear", copyright),
    ];
    let params: Vec<Param> = fields.iter().map(|(_, value)| value.clone()).collect();
    ctx.invoke("addBook", &params, FAILURE).await?;

    let lookup = natural_key_lookup("Book", "bookID", &fields, true, ctx.dialect());
    let Some(book_id) = ctx.lookup_id(&lookup, "bookID").await? else {
        ctx.say(FAILURE)?;
        return Err(CirculateError::procedure_failed("addBook", "new book row not found"));
    };

    for (position, author) in authors.iter().enumerate() {
        let existing = author_lookup(author, ctx.dialect());
        let author_id = match ctx.lookup_id(&existing, "authorID").await? {
            Some(id) => id,
            None => {
                ctx.say("Author not found, opening new author prompt!")?;
                create_author(ctx, author.first.clone(), Some(author.last.clone())).await?
            }
        };

        let link = book_author_insert(book_id, author_id, position == 0, ctx.dialect());
        ctx.engine.execute(&link.sql, &link.params).await?;
        log::debug!("linked author {author_id} ({}) to book {book_id}", author.display());
    }

    ctx.say(&format!("Book {title} added successfully with ID {book_id}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_status() {
        for status in ["active", "inactive", "unknown"] {
            assert!(validate_status(status).is_ok());
        }
        let err = validate_status("retired").unwrap_err();
        assert!(err.message().contains("'active', 'inactive', or 'unknown'"));
    }

    #[test]
    fn test_validate_condition() {
        assert!(validate_condition("neutral").is_ok());
        let err = validate_condition("Good").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.message().contains("Invalid condition."));
    }
}
