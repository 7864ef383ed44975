//! Session list view, most recent first

use super::SessionStore;
use std::cmp::Ordering;

/// One row of the session list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListEntry {
    /// Session id
    pub id: String,
    /// Display title
    pub title: String,
    /// Whether this is the active session
    pub active: bool,
    /// Number of messages in the transcript
    pub message_count: usize,
}

/// List all sessions ordered by id, newest first
///
/// Ids embed a millisecond timestamp, so descending id order is recency
/// order.
///
/// # Examples
///
/// ```
/// use ctutor::session::{session_list, SessionStore};
/// use ctutor::storage::MemoryStore;
///
/// let mut store = SessionStore::new(Box::new(MemoryStore::new()));
/// store.create_session_at(100);
/// store.create_session_at(50);
/// store.create_session_at(200);
///
/// let ids: Vec<String> = session_list(&store).into_iter().map(|e| e.id).collect();
/// assert_eq!(ids, vec!["chat_200", "chat_100", "chat_50"]);
/// ```
pub fn session_list(store: &SessionStore) -> Vec<SessionListEntry> {
    let active = store.active_id();
    let mut entries: Vec<SessionListEntry> = store
        .sessions()
        .map(|s| SessionListEntry {
            id: s.id.clone(),
            title: s.title.clone(),
            active: active == Some(s.id.as_str()),
            message_count: s.messages.len(),
        })
        .collect();

    entries.sort_by(|a, b| natural_cmp(&b.id, &a.id));
    entries
}

/// Compare strings with runs of ASCII digits ordered by numeric value
///
/// Non-digit characters compare as plain characters, so for ids of equal
/// width this matches lexicographic order.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x_run = take_digits(&mut a_chars);
                let y_run = take_digits(&mut b_chars);
                let x_trimmed = x_run.trim_start_matches('0');
                let y_trimmed = y_run.trim_start_matches('0');

                let ord = x_trimmed
                    .len()
                    .cmp(&y_trimmed.len())
                    .then_with(|| x_trimmed.cmp(y_trimmed))
                    .then_with(|| x_run.len().cmp(&y_run.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}
