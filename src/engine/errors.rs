use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("rendered template is not a valid statement sequence: {message}")]
    CandidateParse { message: String },

    #[error("rendered template produced no statements")]
    EmptyCandidate,

    #[error("mutation out of bounds: {count} statement(s) at {at} in a block of {len}")]
    Bounds { at: usize, count: usize, len: usize },
}
