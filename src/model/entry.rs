//! Board entries and their comments
//!
//! An `Entry` is one post on a board. Its timestamp is kept exactly as the
//! board reports it (e.g. `Sat Oct  4 21:16:48 2025`) so that results can be
//! written back out unchanged; `Entry::timestamp` parses it on demand.

use chrono::NaiveDateTime;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Format used when rendering a timestamp the way the board does
pub const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Format used to parse a whitespace-normalized board timestamp
pub const DATE_PARSE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// A single post on a board
///
/// Field order matches the persisted JSON layout consumed downstream:
/// `index, title, author, date, aid, ip, content, push_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Position in the board (1 is the oldest post), also for entries found
    /// through a search
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub title: String,
    /// Author as displayed by the board, usually `userid (nickname)`
    #[serde(default)]
    pub author: String,
    /// Raw board timestamp
    #[serde(default)]
    pub date: String,
    /// Board-wide article id
    #[serde(default)]
    pub aid: Option<String>,
    /// Posting IP as reported by the board
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(rename = "content", default)]
    pub body: String,
    #[serde(rename = "push_list", default)]
    pub comments: Vec<Comment>,
}

impl Entry {
    /// Create an entry with a raw board timestamp
    pub fn new(
        index: u64,
        title: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            index,
            title: title.into(),
            author: author.into(),
            date: date.into(),
            aid: None,
            ip: None,
            body: String::new(),
            comments: Vec::new(),
        }
    }

    /// Create an entry, rendering `timestamp` in the board's date format
    pub fn posted_at(
        index: u64,
        title: impl Into<String>,
        author: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self::new(index, title, author, timestamp.format(DATE_FORMAT).to_string())
    }

    /// Builder: set the body text
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder: set the article id
    pub fn aid(mut self, aid: impl Into<String>) -> Self {
        self.aid = Some(aid.into());
        self
    }

    /// Builder: set the posting IP
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Builder: append a comment
    pub fn comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }

    /// Parse the raw board timestamp
    pub fn timestamp(&self) -> Result<NaiveDateTime, TimestampError> {
        parse_board_date(&self.date)
    }

    /// The user id part of `author`, without the trailing nickname
    pub fn author_id(&self) -> &str {
        self.author
            .split_once(" (")
            .map(|(id, _)| id)
            .unwrap_or(&self.author)
            .trim()
    }
}

/// Parse a board timestamp such as `Sat Oct  4 21:16:48 2025`
///
/// Days below 10 are space padded by the board, so runs of whitespace are
/// collapsed before parsing.
pub(crate) fn parse_board_date(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(TimestampError::Empty);
    }

    NaiveDateTime::parse_from_str(&normalized, DATE_PARSE_FORMAT).map_err(|e| {
        TimestampError::Malformed {
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })
}

/// A board timestamp that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Entry has no timestamp")]
    Empty,

    #[error("Malformed timestamp {value:?}: {reason}")]
    Malformed { value: String, reason: String },
}

/// A reply attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "type")]
    pub tag: CommentTag,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    /// Free-form time as shown next to the comment, e.g. `10/04 21:17`
    #[serde(default)]
    pub time: String,
}

impl Comment {
    pub fn new(tag: CommentTag, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tag,
            author: author.into(),
            content: content.into(),
            time: String::new(),
        }
    }

    pub fn push(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(CommentTag::Push, author, content)
    }

    pub fn boo(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(CommentTag::Boo, author, content)
    }

    pub fn neutral(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(CommentTag::Neutral, author, content)
    }

    /// Builder: set the displayed time
    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }
}

/// Sentiment tag of a comment
///
/// Persisted as the board's numeric code: 1 = push, 2 = boo, 3 = neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentTag {
    Push,
    Boo,
    Neutral,
}

impl CommentTag {
    /// Numeric code used in persisted output
    pub fn code(&self) -> u8 {
        match self {
            Self::Push => 1,
            Self::Boo => 2,
            Self::Neutral => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Push),
            2 => Some(Self::Boo),
            3 => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Parse a textual tag, either the board glyph or its English name
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "推" | "push" => Some(Self::Push),
            "噓" | "boo" => Some(Self::Boo),
            "→" | "neutral" | "arrow" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "推"),
            Self::Boo => write!(f, "噓"),
            Self::Neutral => write!(f, "→"),
        }
    }
}

impl Serialize for CommentTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for CommentTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u8),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("unknown comment type {}", code))),
            Raw::Label(label) => Self::from_label(&label)
                .ok_or_else(|| de::Error::custom(format!("unknown comment type {:?}", label))),
        }
    }
}
