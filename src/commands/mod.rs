//! Command Handlers
//!
//! One handler per [`Command`]. Handlers run inside the transaction the
//! session opened; returning an error rolls back everything they did.
//!
//! - [`search`]: book lookups and the multi-term searches (every tier)
//! - [`circulation`]: holds, checkouts, returns, loan and hold listings
//! - [`members`]: member lookup and maintenance (staff)
//! - [`catalog`]: books, authors, genres, keywords and copies (curator)

pub mod catalog;
pub mod circulation;
pub mod members;
pub mod search;

use chrono::Local;

use crate::console::Console;
use crate::engine::{DatabaseEngine, DatabaseType, Param, QueryResult};
use crate::error::{CirculateError, Result};
use crate::output::render_rows;
use crate::permission::Command;
use crate::query::Statement;
use crate::session::Session;

/// Everything a handler needs for one command
pub struct Context<'a, E, C> {
    pub engine: &'a mut E,
    pub console: &'a mut C,
    pub session: &'a Session,
}

impl<'a, E: DatabaseEngine, C: Console> Context<'a, E, C> {
    pub fn new(engine: &'a mut E, console: &'a mut C, session: &'a Session) -> Self {
        Self { engine, console, session }
    }

    pub fn dialect(&self) -> DatabaseType {
        self.engine.database_type()
    }

    /// Call a result-producing procedure and print its rows
    pub async fn show(&mut self, procedure: &str, params: &[Param], columns: &[&str]) -> Result<()> {
        log::debug!("calling {procedure} for rows");
        let result = self.engine.call_query(procedure, params).await?;
        self.print_rows(&result, columns)
    }

    /// Print rows with the current local time as the overdue reference
    pub fn print_rows(&mut self, result: &QueryResult, columns: &[&str]) -> Result<()> {
        let now = Local::now().naive_local();
        self.console.say_all(render_rows(result, columns, now))
    }

    /// Call a mutating procedure, printing `success` or `failure`
    pub async fn perform(
        &mut self,
        procedure: &str,
        params: &[Param],
        success: &str,
        failure: &str,
    ) -> Result<()> {
        self.invoke(procedure, params, failure).await?;
        self.console.say(success)
    }

    /// Call a mutating procedure, printing only `failure`
    pub async fn invoke(&mut self, procedure: &str, params: &[Param], failure: &str) -> Result<()> {
        log::debug!("calling {procedure}");
        if let Err(err) = self.engine.call(procedure, params).await {
            self.console.say(failure)?;
            return Err(err);
        }
        Ok(())
    }

    /// Run a lookup and read an integer id from its first row
    pub async fn lookup_id(&mut self, statement: &Statement, column: &str) -> Result<Option<i64>> {
        log::debug!("lookup: {}", statement.sql);
        let result = self.engine.query(&statement.sql, &statement.params).await?;
        Ok(result.first_i64(column))
    }

    /// Prompt and read one answer
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        self.console.ask(prompt)
    }

    pub fn say(&mut self, line: &str) -> Result<()> {
        self.console.say(line)
    }
}

/// Argument `index` of an already split argument line
fn arg(args: &[String], index: usize) -> Result<&str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| CirculateError::invalid_input(format!("Missing argument {}", index + 1)))
}

/// Run the handler for `command`
pub async fn dispatch<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    command: Command,
    args: &[String],
) -> Result<()> {
    match command {
        Command::BookDetails => search::book_details(ctx, arg(args, 0)?).await,
        Command::SearchTitle => search::by_title(ctx, arg(args, 0)?).await,
        Command::SearchAuthor => search::by_author(ctx, arg(args, 0)?).await,
        Command::SearchKeywords => search::by_keywords(ctx, arg(args, 0)?).await,
        Command::SearchIsbn => search::by_isbn(ctx, arg(args, 0)?).await,
        Command::SearchGenres => search::by_genres(ctx, arg(args, 0)?).await,

        Command::HoldBook => {
            let member_id = ctx.session.member_id()?;
            circulation::hold_book(ctx, member_id, arg(args, 0)?).await
        }
        Command::HoldCopy => {
            let member_id = ctx.session.member_id()?;
            circulation::hold_copy(ctx, member_id, arg(args, 0)?).await
        }
        Command::ViewLoans => {
            let member_id = ctx.session.member_id()?;
            circulation::loans(ctx, member_id).await
        }
        Command::ViewHolds => {
            let member_id = ctx.session.member_id()?;
            circulation::holds(ctx, member_id).await
        }
        Command::ReturnCopy | Command::ReturnCopyFor => {
            circulation::return_copy(ctx, arg(args, 0)?).await
        }
        Command::CheckOutBook => {
            let member_id = ctx.session.member_id()?;
            circulation::check_out_book(ctx, member_id, arg(args, 0)?).await
        }
        Command::CheckOutCopy => {
            let member_id = ctx.session.member_id()?;
            circulation::check_out_copy(ctx, member_id, arg(args, 0)?).await
        }

        Command::HoldBookFor => {
            let member_id = members::member_arg(arg(args, 1)?)?;
            circulation::hold_book(ctx, member_id, arg(args, 0)?).await
        }
        Command::HoldCopyFor => {
            let member_id = members::member_arg(arg(args, 1)?)?;
            circulation::hold_copy(ctx, member_id, arg(args, 0)?).await
        }
        Command::CheckOutBookFor => {
            let member_id = members::member_arg(arg(args, 1)?)?;
            circulation::check_out_book(ctx, member_id, arg(args, 0)?).await
        }
        Command::CheckOutCopyFor => {
            let member_id = members::member_arg(arg(args, 1)?)?;
            circulation::check_out_copy(ctx, member_id, arg(args, 0)?).await
        }
        Command::FindMemberByName => members::find_by_name(ctx, arg(args, 0)?).await,
        Command::FindMemberById => members::find_by_id(ctx, arg(args, 0)?).await,
        Command::AddMember => {
            members::add_member(ctx, arg(args, 0)?, arg(args, 1)?, arg(args, 2)?).await
        }
        Command::RemoveMember => members::remove_member(ctx, arg(args, 0)?).await,
        Command::MemberLoans => {
            let member_id = members::member_arg(arg(args, 0)?)?;
            circulation::loans(ctx, member_id).await
        }
        Command::MemberHolds => {
            let member_id = members::member_arg(arg(args, 0)?)?;
            circulation::holds(ctx, member_id).await
        }

        Command::AddBook => catalog::add_book(ctx).await,
        Command::AddAuthor => catalog::create_author(ctx, None, None).await.map(|_| ()),
        Command::FindAuthorByName => catalog::find_author_by_name(ctx, arg(args, 0)?).await,
        Command::FindAuthorById => catalog::find_author_by_id(ctx, arg(args, 0)?).await,
        Command::UpdateAuthor => catalog::update_author(ctx, arg(args, 0)?).await,
        Command::AddGenre => catalog::create_genre(ctx, arg(args, 0)?).await.map(|_| ()),
        Command::AddGenreToBook => {
            catalog::add_genre_to_book(ctx, arg(args, 0)?, arg(args, 1)?).await
        }
        Command::RemoveGenreFromBook => {
            catalog::remove_genre_from_book(ctx, arg(args, 0)?, arg(args, 1)?).await
        }
        Command::AddKeywordToBook => {
            catalog::add_keyword(ctx, arg(args, 0)?, arg(args, 1)?).await
        }
        Command::RemoveKeywordFromBook => {
            catalog::remove_keyword(ctx, arg(args, 0)?, arg(args, 1)?).await
        }
        Command::AddCopy => catalog::add_copy(ctx, arg(args, 0)?, arg(args, 1)?).await,
        Command::RemoveCopy => catalog::remove_copy(ctx, arg(args, 0)?).await,
    }
}
