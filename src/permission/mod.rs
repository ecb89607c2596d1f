//! Permission Tiers and the Command Table
//!
//! Every menu command has a number. Numbers 7-13 mean different commands for
//! members (self-service) and for staff (acting on behalf of a member), so the
//! table is keyed by `(number, tier)` rather than by number alone.
//!
//! Resolving console input against the table happens before any database
//! work: a rejected line never reaches a handler.

use thiserror::Error;

/// Permission class fixed at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Member,
    Employee,
    Curator,
}

impl Tier {
    /// Get the tier name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Employee => "employee",
            Self::Curator => "curator",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A runnable menu command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Search (every tier)
    BookDetails,
    SearchTitle,
    SearchAuthor,
    SearchKeywords,
    SearchIsbn,
    SearchGenres,

    // Member self-service
    HoldBook,
    HoldCopy,
    ViewLoans,
    ViewHolds,
    ReturnCopy,
    CheckOutBook,
    CheckOutCopy,

    // Staff
    HoldBookFor,
    HoldCopyFor,
    CheckOutBookFor,
    CheckOutCopyFor,
    ReturnCopyFor,
    FindMemberByName,
    FindMemberById,
    AddMember,
    RemoveMember,
    MemberLoans,
    MemberHolds,

    // Curator catalog maintenance
    AddBook,
    AddAuthor,
    FindAuthorByName,
    FindAuthorById,
    UpdateAuthor,
    AddGenre,
    AddGenreToBook,
    RemoveGenreFromBook,
    AddKeywordToBook,
    RemoveKeywordFromBook,
    AddCopy,
    RemoveCopy,
}

impl Command {
    /// Menu text, without the argument hint
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::BookDetails => "View details about a book",
            Self::SearchTitle => "Search for books by title",
            Self::SearchAuthor => "Search for books by author",
            Self::SearchKeywords => "Search for books with all keywords",
            Self::SearchIsbn => "Search for books by ISBN",
            Self::SearchGenres => "Search for books with all genres",
            Self::HoldBook => "Hold a book",
            Self::HoldCopy => "Hold a copy",
            Self::ViewLoans => "View your loans",
            Self::ViewHolds => "View your holds",
            Self::ReturnCopy => "Return a copy you've checked out",
            Self::CheckOutBook => "Check out an available copy of a book",
            Self::CheckOutCopy => "Check out a specific copy",
            Self::HoldBookFor => "Hold a book for a member",
            Self::HoldCopyFor => "Hold a copy for a member",
            Self::CheckOutBookFor => "Check out a book for a member",
            Self::CheckOutCopyFor => "Check out a copy for a member",
            Self::ReturnCopyFor => "Return a copy for a member",
            Self::FindMemberByName => "Find a member by name",
            Self::FindMemberById => "Find a member by ID",
            Self::AddMember => "Add a new member",
            Self::RemoveMember => "Remove a member",
            Self::MemberLoans => "View a member's loans",
            Self::MemberHolds => "View a member's holds",
            Self::AddBook => "Add a new book",
            Self::AddAuthor => "Add a new author",
            Self::FindAuthorByName => "Find an author by name",
            Self::FindAuthorById => "Find an author by ID",
            Self::UpdateAuthor => "Update an author by ID",
            Self::AddGenre => "Add a new genre",
            Self::AddGenreToBook => "Add a genre to a book",
            Self::RemoveGenreFromBook => "Remove a genre from a book",
            Self::AddKeywordToBook => "Add a keyword to a book",
            Self::RemoveKeywordFromBook => "Remove a keyword from a book",
            Self::AddCopy => "Add a copy of a book",
            Self::RemoveCopy => "Remove a copy of a book",
        }
    }

    /// Argument names collected on one line before the handler runs
    ///
    /// Commands that prompt field by field (adding a book or an author)
    /// declare none.
    #[must_use]
    pub const fn arguments(&self) -> &'static [&'static str] {
        match self {
            Self::BookDetails => &["bookID"],
            Self::SearchTitle => &["title"],
            Self::SearchAuthor => &["author"],
            Self::SearchKeywords => &["keywords (comma separated)"],
            Self::SearchIsbn => &["isbn"],
            Self::SearchGenres => &["genres (comma separated)"],
            Self::HoldBook | Self::CheckOutBook => &["bookID"],
            Self::HoldCopy | Self::ReturnCopy | Self::CheckOutCopy => &["copyID"],
            Self::ViewLoans | Self::ViewHolds | Self::AddBook | Self::AddAuthor => &[],
            Self::HoldBookFor | Self::CheckOutBookFor => &["bookID", "memberID"],
            Self::HoldCopyFor | Self::CheckOutCopyFor => &["copyID", "memberID"],
            Self::ReturnCopyFor | Self::RemoveCopy => &["copyID"],
            Self::FindMemberByName | Self::FindAuthorByName => &["name"],
            Self::FindMemberById | Self::RemoveMember | Self::MemberLoans | Self::MemberHolds => {
                &["memberID"]
            }
            Self::AddMember => &["firstName", "lastName", "dob"],
            Self::FindAuthorById | Self::UpdateAuthor => &["authorID"],
            Self::AddGenre => &["genreName"],
            Self::AddGenreToBook | Self::RemoveGenreFromBook => &["bookID", "genreName"],
            Self::AddKeywordToBook | Self::RemoveKeywordFromBook => &["bookID", "keyword"],
            Self::AddCopy => &["bookID", "condition"],
        }
    }

    /// Argument hint shown in the menu, e.g. `<bookID> <memberID>`
    #[must_use]
    pub fn usage(&self) -> String {
        match self {
            Self::SearchKeywords => "<keyword1, keyword2, ...>".to_string(),
            Self::SearchGenres => "<genre1, genre2, ...>".to_string(),
            // Prompts for the name first, then the description
            Self::AddGenre => String::new(),
            _ => self.arguments().iter().map(|a| format!("<{a}>")).collect::<Vec<_>>().join(" "),
        }
    }
}

/// One row of the command table
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    pub number: u32,
    pub tiers: &'static [Tier],
    pub command: Command,
}

const EVERYONE: &[Tier] = &[Tier::Member, Tier::Employee, Tier::Curator];
const MEMBER: &[Tier] = &[Tier::Member];
const STAFF: &[Tier] = &[Tier::Employee, Tier::Curator];
const CURATOR: &[Tier] = &[Tier::Curator];

const fn entry(number: u32, tiers: &'static [Tier], command: Command) -> CommandEntry {
    CommandEntry { number, tiers, command }
}

/// Command number to permitted tiers
pub const COMMANDS: &[CommandEntry] = &[
    entry(1, EVERYONE, Command::BookDetails),
    entry(2, EVERYONE, Command::SearchTitle),
    entry(3, EVERYONE, Command::SearchAuthor),
    entry(4, EVERYONE, Command::SearchKeywords),
    entry(5, EVERYONE, Command::SearchIsbn),
    entry(6, EVERYONE, Command::SearchGenres),
    entry(7, MEMBER, Command::HoldBook),
    entry(8, MEMBER, Command::HoldCopy),
    entry(9, MEMBER, Command::ViewLoans),
    entry(10, MEMBER, Command::ViewHolds),
    entry(11, MEMBER, Command::ReturnCopy),
    entry(12, MEMBER, Command::CheckOutBook),
    entry(13, MEMBER, Command::CheckOutCopy),
    entry(7, STAFF, Command::HoldBookFor),
    entry(8, STAFF, Command::HoldCopyFor),
    entry(9, STAFF, Command::CheckOutBookFor),
    entry(10, STAFF, Command::CheckOutCopyFor),
    entry(11, STAFF, Command::ReturnCopyFor),
    entry(12, STAFF, Command::FindMemberByName),
    entry(13, STAFF, Command::FindMemberById),
    entry(14, STAFF, Command::AddMember),
    entry(15, STAFF, Command::RemoveMember),
    entry(16, STAFF, Command::MemberLoans),
    entry(17, STAFF, Command::MemberHolds),
    entry(18, CURATOR, Command::AddBook),
    entry(19, CURATOR, Command::AddAuthor),
    entry(20, CURATOR, Command::FindAuthorByName),
    entry(21, CURATOR, Command::FindAuthorById),
    entry(22, CURATOR, Command::UpdateAuthor),
    entry(23, CURATOR, Command::AddGenre),
    entry(24, CURATOR, Command::AddGenreToBook),
    entry(25, CURATOR, Command::RemoveGenreFromBook),
    entry(26, CURATOR, Command::AddKeywordToBook),
    entry(27, CURATOR, Command::RemoveKeywordFromBook),
    entry(28, CURATOR, Command::AddCopy),
    entry(29, CURATOR, Command::RemoveCopy),
];

/// Why a command line was not dispatched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid command. Please enter a number.")]
    NotANumber,

    #[error("Invalid command.")]
    Unknown(u32),

    #[error("Permission denied: command {number} is not available to {tier} logins.")]
    NotPermitted { number: u32, tier: Tier },
}

/// Resolve a console line to the command the tier may run
pub fn resolve(input: &str, tier: Tier) -> std::result::Result<Command, Rejection> {
    let number: u32 = input.trim().parse().map_err(|_| Rejection::NotANumber)?;

    let mut known = false;
    for entry in COMMANDS.iter().filter(|e| e.number == number) {
        if entry.tiers.contains(&tier) {
            return Ok(entry.command);
        }
        known = true;
    }

    if known {
        Err(Rejection::NotPermitted { number, tier })
    } else {
        Err(Rejection::Unknown(number))
    }
}

/// Menu lines for a tier, in command-number order
#[must_use]
pub fn menu(tier: Tier) -> Vec<String> {
    COMMANDS
        .iter()
        .filter(|e| e.tiers.contains(&tier))
        .map(|e| {
            let usage = e.command.usage();
            if usage.is_empty() {
                format!("{}. {}", e.number, e.command.description())
            } else {
                format!("{}. {} {usage}", e.number, e.command.description())
            }
        })
        .collect()
}
