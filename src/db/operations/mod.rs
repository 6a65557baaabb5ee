pub mod progress;
pub mod review;
pub mod sessions;
pub mod words;

pub use progress::{ProgressEntry, UserProgress};
pub use review::ReviewEntry;
pub use sessions::StudySessionRecord;
pub use words::{CategorySummary, NewWord, SectionSummary, Word};
