#![forbid(unsafe_code)]

pub mod model;
pub mod progress;
pub mod streak;
pub mod time;

pub use progress::{ProgressState, SubtopicProgress, TopicProgress, TopicQuiz, compute_progress};
pub use time::Clock;
