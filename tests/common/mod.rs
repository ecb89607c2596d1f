//! Shared fixture: a small library database on a temporary `SQLite` file
//!
//! The schema mirrors the production tables and every procedure the commands
//! call is installed in the procedure catalog.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use circulate::config::StoredConnection;
use circulate::console::LineConsole;
use circulate::engine::sqlite::{install_procedure, SqliteEngine};
use circulate::engine::{ConnectionConfig, DatabaseEngine};
use circulate::session::{login, run_session};
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE Book (
    bookID INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    ISBN TEXT,
    edition TEXT,
    publicationDate TEXT,
    publisher TEXT,
    copyrightYear INTEGER
);
CREATE TABLE Member (
    memberID INTEGER PRIMARY KEY AUTOINCREMENT,
    memFirstName TEXT NOT NULL,
    memLastName TEXT NOT NULL,
    memdob TEXT,
    memdor TEXT NOT NULL DEFAULT CURRENT_DATE
);
CREATE TABLE Copy (
    copyID INTEGER PRIMARY KEY AUTOINCREMENT,
    bookID INTEGER NOT NULL REFERENCES Book(bookID),
    copyCondition TEXT NOT NULL CHECK (copyCondition IN ('good', 'neutral', 'poor'))
);
CREATE TABLE MemberCopy (
    memberID INTEGER NOT NULL REFERENCES Member(memberID),
    copyID INTEGER PRIMARY KEY REFERENCES Copy(copyID),
    memCopyStatus TEXT NOT NULL,
    createdDate TEXT NOT NULL DEFAULT CURRENT_DATE,
    expiryDate TEXT NOT NULL
);
CREATE TABLE Author (
    authorID INTEGER PRIMARY KEY AUTOINCREMENT,
    firstName TEXT,
    lastName TEXT NOT NULL,
    dob TEXT,
    status TEXT NOT NULL CHECK (status IN ('active', 'inactive', 'unknown'))
);
CREATE TABLE BookAuthor (
    bookID INTEGER NOT NULL REFERENCES Book(bookID),
    authorID INTEGER NOT NULL REFERENCES Author(authorID),
    isPrimaryAuthor INTEGER NOT NULL,
    PRIMARY KEY (bookID, authorID)
);
CREATE TABLE Genre (
    genreID INTEGER PRIMARY KEY AUTOINCREMENT,
    genreName TEXT NOT NULL UNIQUE,
    description TEXT
);
CREATE TABLE BookGenre (
    bookID INTEGER NOT NULL REFERENCES Book(bookID),
    genreID INTEGER NOT NULL REFERENCES Genre(genreID),
    PRIMARY KEY (bookID, genreID)
);
CREATE TABLE Keyword (
    bookID INTEGER NOT NULL REFERENCES Book(bookID),
    word TEXT NOT NULL,
    PRIMARY KEY (bookID, word)
);
";

const SEED: &str = "
INSERT INTO Book (title, ISBN, edition, publicationDate, publisher, copyrightYear)
    VALUES ('Dune', '9780441013593', '1st', '1965-08-01', 'Chilton', 1965);
INSERT INTO Book (title, ISBN, edition, publicationDate, publisher, copyrightYear)
    VALUES ('The Hobbit', '9780547928227', NULL, '1937-09-21', 'Allen & Unwin', 1937);
INSERT INTO Member (memFirstName, memLastName, memdob) VALUES ('Ada', 'Lovelace', '1815-12-10');
INSERT INTO Copy (bookID, copyCondition) VALUES (1, 'good');
INSERT INTO Copy (bookID, copyCondition) VALUES (2, 'neutral');
INSERT INTO Copy (bookID, copyCondition) VALUES (2, 'good');
INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, createdDate, expiryDate)
    VALUES (1, 1, 'checkedOut', '2000-01-01', '2000-01-15');
INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, expiryDate)
    VALUES (1, 2, 'checkedOut', '2999-01-01');
INSERT INTO Author (firstName, lastName, dob, status) VALUES ('Neil', 'Gaiman', '1960-11-10', 'active');
INSERT INTO Genre (genreName, description) VALUES ('Sci-Fi', 'Science fiction');
INSERT INTO Genre (genreName, description) VALUES ('Fantasy', NULL);
INSERT INTO BookGenre (bookID, genreID) VALUES (1, 1);
INSERT INTO BookGenre (bookID, genreID) VALUES (2, 2);
INSERT INTO Keyword (bookID, word) VALUES (1, 'desert');
INSERT INTO Keyword (bookID, word) VALUES (1, 'spice');
INSERT INTO Keyword (bookID, word) VALUES (2, 'dragon');
";

const PROCEDURES: &[(&str, &[&str])] = &[
    ("bookDetails", &["SELECT * FROM Book WHERE bookID = ?1"]),
    ("searchTitle", &["SELECT * FROM Book WHERE title LIKE ?1 ORDER BY bookID"]),
    (
        "searchAuthor",
        &["SELECT b.* FROM Book b
           JOIN BookAuthor ba ON ba.bookID = b.bookID
           JOIN Author a ON a.authorID = ba.authorID
           WHERE a.firstName LIKE ?1 OR a.lastName LIKE ?1
           ORDER BY b.bookID"],
    ),
    ("searchISBN", &["SELECT * FROM Book WHERE ISBN LIKE ?1 ORDER BY bookID"]),
    (
        "checkOutBook",
        &["INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, expiryDate)
           SELECT ?1, c.copyID, 'checkedOut', date('now', '+14 days') FROM Copy c
           WHERE c.bookID = ?2 AND c.copyID NOT IN (SELECT copyID FROM MemberCopy)
           ORDER BY c.copyID LIMIT 1"],
    ),
    (
        "checkoutCopy",
        &["INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, expiryDate)
           VALUES (?1, ?2, 'checkedOut', date('now', '+14 days'))"],
    ),
    (
        "holdBook",
        &["INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, expiryDate)
           SELECT ?1, c.copyID, 'held', date('now', '+7 days') FROM Copy c
           WHERE c.bookID = ?2 AND c.copyID NOT IN (SELECT copyID FROM MemberCopy)
           ORDER BY c.copyID LIMIT 1"],
    ),
    (
        "holdCopy",
        &["INSERT INTO MemberCopy (memberID, copyID, memCopyStatus, expiryDate)
           VALUES (?1, ?2, 'held', date('now', '+7 days'))"],
    ),
    ("returnCopy", &["DELETE FROM MemberCopy WHERE copyID = ?1 AND memCopyStatus = 'checkedOut'"]),
    (
        "getLoans",
        &["SELECT * FROM MemberCopy WHERE memberID = ?1 AND memCopyStatus = 'checkedOut' ORDER BY copyID"],
    ),
    (
        "getHolds",
        &["SELECT * FROM MemberCopy WHERE memberID = ?1 AND memCopyStatus = 'held' ORDER BY copyID"],
    ),
    (
        "findMemberByName",
        &["SELECT * FROM Member WHERE memFirstName LIKE ?1 OR memLastName LIKE ?1 ORDER BY memberID"],
    ),
    ("findMemberByID", &["SELECT * FROM Member WHERE memberID = ?1"]),
    ("addMember", &["INSERT INTO Member (memFirstName, memLastName, memdob) VALUES (?1, ?2, ?3)"]),
    (
        "removeMember",
        &["DELETE FROM MemberCopy WHERE memberID = ?1", "DELETE FROM Member WHERE memberID = ?1"],
    ),
    (
        "addBook",
        &["INSERT INTO Book (title, ISBN, edition, publicationDate, publisher, copyrightYear)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"],
    ),
    ("addAuthor", &["INSERT INTO Author (firstName, lastName, dob, status) VALUES (?1, ?2, ?3, ?4)"]),
    (
        "updateAuthor",
        &["UPDATE Author SET firstName = ?2, lastName = ?3, dob = ?4, status = ?5 WHERE authorID = ?1"],
    ),
    (
        "findAuthorName",
        &["SELECT * FROM Author WHERE firstName LIKE ?1 OR lastName LIKE ?1 ORDER BY authorID"],
    ),
    ("findAuthorID", &["SELECT * FROM Author WHERE authorID = ?1"]),
    ("addGenre", &["INSERT INTO Genre (genreName, description) VALUES (?1, ?2)"]),
    (
        "addBookGenre",
        &["INSERT INTO BookGenre (bookID, genreID) SELECT ?1, genreID FROM Genre WHERE genreName = ?2"],
    ),
    (
        "removeBookGenre",
        &["DELETE FROM BookGenre WHERE bookID = ?1
           AND genreID IN (SELECT genreID FROM Genre WHERE genreName = ?2)"],
    ),
    ("addKeyword", &["INSERT INTO Keyword (bookID, word) VALUES (?1, ?2)"]),
    ("removeKeyword", &["DELETE FROM Keyword WHERE bookID = ?1 AND word = ?2"]),
    ("addCopy", &["INSERT INTO Copy (bookID, copyCondition) VALUES (?1, ?2)"]),
    ("removeCopy", &["DELETE FROM Copy WHERE copyID = ?1"]),
];

/// Temporary library database, removed on drop
pub struct TestLibrary {
    path: PathBuf,
}

impl TestLibrary {
    /// Create the schema, seed rows and install every procedure
    pub fn create() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir()
            .join(format!("circulate_library_{}_{id}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let conn = Connection::open(&path).expect("Failed to create temp database");
        conn.execute_batch(SCHEMA).expect("Failed to create schema");
        conn.execute_batch(SEED).expect("Failed to seed database");
        for (name, steps) in PROCEDURES {
            install_procedure(&conn, name, steps).expect("Failed to install procedure");
        }

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a separate connection for assertions
    pub fn open(&self) -> Connection {
        Connection::open(&self.path).expect("Failed to open test database")
    }

    /// Single integer from a query
    pub fn count(&self, sql: &str) -> i64 {
        self.open().query_row(sql, [], |row| row.get(0)).expect("count query")
    }

    /// Run a whole session (login lines included) and return everything printed
    pub async fn run_script(&self, script: &str) -> String {
        let profile = StoredConnection::new(ConnectionConfig::sqlite(self.path.clone()));
        let mut console = LineConsole::new(Cursor::new(script.to_string()), Vec::new());

        let (session, config) = login(&mut console, &profile).expect("login");
        let mut engine = SqliteEngine::connect(&config).await.expect("connect");
        run_session(&mut engine, &mut console, &session).await.expect("session");
        engine.close().await.expect("close");

        String::from_utf8(console.into_output()).expect("utf-8 output")
    }
}

impl Drop for TestLibrary {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
