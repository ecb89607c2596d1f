//! Holds, checkouts and returns
//!
//! The procedures take the member first, then the book or copy. Eligibility
//! (availability, limits, who holds what) is decided by the database.

use super::Context;
use crate::console::Console;
use crate::engine::{DatabaseEngine, Param};
use crate::error::Result;
use crate::output::MEMBER_COPY_COLUMNS;
use crate::query::parse_id;

pub async fn check_out_book<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
    book_id: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.perform(
        "checkOutBook",
        &[Param::Int(member_id), Param::Int(book_id)],
        "Book checked out successfully.",
        "Error checking out book.",
    )
    .await
}

pub async fn check_out_copy<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
    copy_id: &str,
) -> Result<()> {
    let copy_id = parse_id(copy_id, "copyID")?;
    ctx.perform(
        "checkoutCopy",
        &[Param::Int(member_id), Param::Int(copy_id)],
        "Copy checked out successfully.",
        "Error checking out copy.",
    )
    .await
}

pub async fn hold_book<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
    book_id: &str,
) -> Result<()> {
    let book_id = parse_id(book_id, "bookID")?;
    ctx.perform(
        "holdBook",
        &[Param::Int(member_id), Param::Int(book_id)],
        "Book held successfully.",
        "Error holding book.",
    )
    .await
}

pub async fn hold_copy<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
    copy_id: &str,
) -> Result<()> {
    let copy_id = parse_id(copy_id, "copyID")?;
    ctx.perform(
        "holdCopy",
        &[Param::Int(member_id), Param::Int(copy_id)],
        "Copy held successfully.",
        "Error holding copy.",
    )
    .await
}

/// Return a copy; the loan is identified by the copy alone
pub async fn return_copy<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    copy_id: &str,
) -> Result<()> {
    let copy_id = parse_id(copy_id, "copyID")?;
    ctx.perform(
        "returnCopy",
        &[Param::Int(copy_id)],
        "Copy returned successfully.",
        "Error returning copy.",
    )
    .await
}

pub async fn loans<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
) -> Result<()> {
    ctx.show("getLoans", &[Param::Int(member_id)], MEMBER_COPY_COLUMNS).await
}

pub async fn holds<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: i64,
) -> Result<()> {
    ctx.show("getHolds", &[Param::Int(member_id)], MEMBER_COPY_COLUMNS).await
}
