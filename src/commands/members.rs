//! Member lookup and maintenance

use super::Context;
use crate::console::Console;
use crate::engine::{DatabaseEngine, Param};
use crate::error::{CirculateError, Result};
use crate::output::MEMBER_COLUMNS;
use crate::query::{classify_lookup, natural_key_lookup, parse_id};

/// Member id given as a command argument
pub fn member_arg(raw: &str) -> Result<i64> {
    parse_id(raw, "memberID")
}

pub async fn find_by_name<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    name: &str,
) -> Result<()> {
    ctx.show("findMemberByName", &[classify_lookup(name)], MEMBER_COLUMNS).await
}

pub async fn find_by_id<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: &str,
) -> Result<()> {
    let member_id = member_arg(member_id)?;
    ctx.show("findMemberByID", &[Param::Int(member_id)], MEMBER_COLUMNS).await
}

/// Add a member and report the id the database gave them
pub async fn add_member<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    first_name: &str,
    last_name: &str,
    dob: &str,
) -> Result<()> {
    const FAILURE: &str = "Error adding member.";

    ctx.invoke(
        "addMember",
        &[Param::text(first_name), Param::text(last_name), Param::text(dob)],
        FAILURE,
    )
    .await?;

    let lookup = natural_key_lookup(
        "Member",
        "memberID",
        &[("memFirstName", Param::text(first_name)), ("memLastName", Param::text(last_name))],
        false,
        ctx.dialect(),
    );
    let Some(member_id) = ctx.lookup_id(&lookup, "memberID").await? else {
        ctx.say(FAILURE)?;
        return Err(CirculateError::procedure_failed("addMember", "new member row not found"));
    };

    ctx.say(&format!("Member {first_name} {last_name} added successfully with ID {member_id}."))
}

pub async fn remove_member<E: DatabaseEngine, C: Console>(
    ctx: &mut Context<'_, E, C>,
    member_id: &str,
) -> Result<()> {
    let member_id = member_arg(member_id)?;
    ctx.perform(
        "removeMember",
        &[Param::Int(member_id)],
        "Member removed successfully.",
        "Error removing member.",
    )
    .await
}
