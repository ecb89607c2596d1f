//! Book search, available to every tier

use super::Context;
use crate::console::Console;
use crate::engine::{DatabaseEngine, Param};
use crate::error::Result;
use crate::output::BOOK_COLUMNS;
use crate::query::{build_search, classify_lookup, parse_id, SearchKind};

pub async fn book_details<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    book_id: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.show("bookDetails", &[Param::Int(book_id)], BOOK_COLUMNS).await
}

pub async fn by_title<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    title: &str,
) -> Result<()> {
    ctx.show("searchTitle", &[classify_lookup(title)], BOOK_COLUMNS).await
}

pub async fn by_author<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    author: &str,
) -> Result<()> {
    ctx.show("searchAuthor", &[classify_lookup(author)], BOOK_COLUMNS).await
}

pub async fn by_isbn<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    isbn: &str,
) -> Result<()> {
    ctx.show("searchISBN", &[classify_lookup(isbn)], BOOK_COLUMNS).await
}

pub async fn by_keywords<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    keywords: &str,
) -> Result<()> {
    run_search(ctx, SearchKind::Keywords, keywords).await
}

pub async fn by_genres<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    genres: &str,
) -> Result<()> {
    run_search(ctx, SearchKind::Genres, genres).await
}

async fn run_search<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    kind: SearchKind,
    raw: &str,
) -> Result<()> {
    let statement = build_search(kind, raw, ctx.dialect())?;
    log::debug!("{kind:?} search with {} term(s)", statement.params.len());

    let result = ctx.engine.query(&statement.sql, &statement.params).await?;
    ctx.print_rows(&result, BOOK_COLUMNS)
}
