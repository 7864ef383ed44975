//! Model conversations for chat sessions
//!
//! - [`handle`]: one live conversation handle per session
//! - [`streaming`]: writes streamed replies into the session store
//! - [`title`]: background title summaries

pub mod handle;
pub mod streaming;
pub mod title;

pub use handle::{ChatHandle, HandleCache};
pub use streaming::{StreamingUpdater, ERROR_MESSAGE};
pub use title::{clean_title, TitleSummarizer, TitleUpdate};
