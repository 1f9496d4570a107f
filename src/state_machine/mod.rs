mod outcome;
mod state;

pub use outcome::{CompletionPolicy, Outcome, SuccessFlag};
pub use state::{JobState, OutcomeResolver};
