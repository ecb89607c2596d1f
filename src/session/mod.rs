//! Login and the Read-Eval Loop
//!
//! A session is fixed at login: the database user, its [`Tier`] and, for
//! member logins, the member id that self-service commands act on.
//!
//! The loop runs one command per line. Every command that reaches a handler is
//! bracketed by a transaction on the session connection:
//!
//! ```text
//! resolve number -> collect arguments -> BEGIN -> handler -> COMMIT
//!                                                   \-> error -> ROLLBACK
//! ```
//!
//! Lines rejected by the command table never touch the database.

use crate::commands::{self, Context};
use crate::config::StoredConnection;
use crate::console::Console;
use crate::engine::{ConnectionConfig, DatabaseEngine};
use crate::error::{CirculateError, Result};
use crate::output::SEPARATOR;
use crate::permission::{self, Command, Rejection, Tier};
use crate::query::{parse_id, split_args};

const ROLLED_BACK: &str = "This transaction failed and was rolled back.";
const LOGGED_OUT: &str = "Logged out of library database";

/// Who is logged in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: String,
    tier: Tier,
    member_id: Option<i64>,
}

impl Session {
    #[must_use]
    pub fn new(user: impl Into<String>, tier: Tier, member_id: Option<i64>) -> Self {
        Self { user: user.into(), tier, member_id }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Member id for self-service commands
    pub fn member_id(&self) -> Result<i64> {
        self.member_id.ok_or_else(|| {
            CirculateError::invalid_input(format!(
                "Login '{}' has no member ID; log in as a member to use this command",
                self.user
            ))
        })
    }
}

/// Prompt for credentials and classify the login
///
/// Returns the session and the connection config carrying the credentials.
/// Unrecognised login names get the member tier without a member id.
pub fn login<C: Console>(
    console: &mut C,
    profile: &StoredConnection,
) -> Result<(Session, ConnectionConfig)> {
    let user = console.ask("Enter database login:")?.trim().to_string();
    let password = console.ask("Enter database password:")?;

    let session = match profile.logins.classify(&user) {
        Some(Tier::Member) => {
            let raw = console.ask("Enter member ID:")?;
            let member_id = parse_id(&raw, "Member ID")?;
            Session::new(user.as_str(), Tier::Member, Some(member_id))
        }
        Some(tier) => Session::new(user.as_str(), tier, None),
        None => {
            log::warn!("login '{user}' is not a known tier login; using member permissions");
            Session::new(user.as_str(), Tier::Member, None)
        }
    };

    let config = profile.with_login(&user, &password)?;
    log::info!("logging in as {} ({} tier)", session.user, session.tier);
    Ok((session, config))
}

/// Run the command loop until `exit`, `logout` or end of input
pub async fn run_session<E, C>(engine: &mut E, console: &mut C, session: &Session) -> Result<()>
where
    E: DatabaseEngine,
    C: Console,
{
    console.say("Successfully connected!")?;

    loop {
        print_menu(console, session.tier)?;

        let Some(line) = console.read_line()? else {
            log::info!("input closed, ending session");
            break;
        };
        let line = line.trim();
        if line == "exit" || line == "logout" {
            break;
        }

        console.say(SEPARATOR)?;
        run_line(engine, console, session, line).await?;
    }

    console.say(LOGGED_OUT)?;
    log::info!("{} logged out", session.user);
    Ok(())
}

fn print_menu<C: Console>(console: &mut C, tier: Tier) -> Result<()> {
    console.say("Enter command:")?;
    console.say(SEPARATOR)?;
    console.say("Available commands:")?;
    console.say_all(permission::menu(tier))?;
    console.say("(Type 'exit' to quit.)")?;
    console.say(SEPARATOR)
}

/// Resolve, run and commit (or roll back) one command line
///
/// Only console failures escape; everything else is reported and the loop
/// continues.
async fn run_line<E, C>(engine: &mut E, console: &mut C, session: &Session, line: &str) -> Result<()>
where
    E: DatabaseEngine,
    C: Console,
{
    let command = match permission::resolve(line, session.tier) {
        Ok(command) => command,
        Err(Rejection::NotPermitted { number, tier }) => {
            let err = CirculateError::permission_denied(format!(
                "command {number} is not available to {tier} logins"
            ));
            log::warn!("{} rejected [{}]: {err}", session.user, err.error_code());
            return console.say(ROLLED_BACK);
        }
        Err(rejection) => {
            log::debug!("rejected command line {line:?}: {rejection}");
            console.say(&rejection.to_string())?;
            return console.say(ROLLED_BACK);
        }
    };

    let args = match collect_arguments(console, command) {
        Ok(args) => args,
        Err(err @ CirculateError::ConsoleError(_)) => return Err(err),
        Err(err) => return report_failure(console, &err),
    };

    log::debug!("running {command:?} for {}", session.user);
    match execute(engine, console, session, command, &args).await {
        Ok(()) => Ok(()),
        Err(err @ CirculateError::ConsoleError(_)) => Err(err),
        Err(err) => report_failure(console, &err),
    }
}

fn collect_arguments<C: Console>(console: &mut C, command: Command) -> Result<Vec<String>> {
    let names = command.arguments();
    if names.is_empty() {
        return Ok(Vec::new());
    }

    console.say("Enter the following arguments separated by spaces:")?;
    let line = console.ask(&names.join(" "))?;
    split_args(&line, names.len())
}

async fn execute<E, C>(
    engine: &mut E,
    console: &mut C,
    session: &Session,
    command: Command,
    args: &[String],
) -> Result<()>
where
    E: DatabaseEngine,
    C: Console,
{
    engine.begin().await?;

    let outcome = {
        let mut ctx = Context::new(engine, console, session);
        commands::dispatch(&mut ctx, command, args).await
    };

    let outcome = match outcome {
        Ok(()) => engine.commit().await,
        Err(err) => Err(err),
    };

    if outcome.is_err() {
        if let Err(rollback_err) = engine.rollback().await {
            log::warn!("rollback failed: {rollback_err}");
        } else {
            log::warn!("{command:?} rolled back");
        }
    }
    outcome
}

fn report_failure<C: Console>(console: &mut C, err: &CirculateError) -> Result<()> {
    log::debug!("command failed with {}", err.error_code());
    console.say(&err.message())?;
    console.say(ROLLED_BACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoginNames;
    use crate::console::LineConsole;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn profile() -> StoredConnection {
        StoredConnection::new(ConnectionConfig::sqlite(PathBuf::from("library.db")))
    }

    fn console(input: &str) -> LineConsole<Cursor<String>, Vec<u8>> {
        LineConsole::new(Cursor::new(input.to_string()), Vec::new())
    }

    #[test]
    fn test_member_login_reads_member_id() {
        let mut console = console("member_login\nsecret\n42\n");
        let (session, config) = login(&mut console, &profile()).unwrap();

        assert_eq!(session, Session::new("member_login", Tier::Member, Some(42)));
        assert_eq!(config.user.as_deref(), Some("member_login"));
        assert_eq!(config.password.as_deref(), Some("secret"));

        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output, "Enter database login:\nEnter database password:\nEnter member ID:\n");
    }

    #[test]
    fn test_member_login_requires_numeric_id() {
        let mut console = console("member_login\nsecret\nforty-two\n");
        let err = login(&mut console, &profile()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_staff_logins() {
        let (session, _) = login(&mut console("employee_login\npw\n"), &profile()).unwrap();
        assert_eq!(session.tier(), Tier::Employee);
        assert!(session.member_id().is_err());

        let (session, _) = login(&mut console("curator_login\npw\n"), &profile()).unwrap();
        assert_eq!(session.tier(), Tier::Curator);
    }

    #[test]
    fn test_unknown_login_is_member_without_id() {
        let (session, _) = login(&mut console("visitor\npw\n"), &profile()).unwrap();
        assert_eq!(session.tier(), Tier::Member);
        assert!(session.member_id().is_err());
    }

    #[test]
    fn test_profile_login_names() {
        let mut profile = profile();
        profile.logins = LoginNames {
            member: "patron".to_string(),
            employee: "desk".to_string(),
            curator: "archivist".to_string(),
        };

        let (session, _) = login(&mut console("desk\npw\n"), &profile).unwrap();
        assert_eq!(session.tier(), Tier::Employee);

        // Default names mean nothing once the profile renames them
        let (session, _) = login(&mut console("curator_login\npw\n"), &profile).unwrap();
        assert_eq!(session.tier(), Tier::Member);
    }

    #[test]
    fn test_login_input_ends_early() {
        let err = login(&mut console("member_login\n"), &profile()).unwrap_err();
        assert_eq!(err.error_code(), "CONSOLE_ERROR");
    }
}
