//! Session lifecycle as an explicit state machine.
//!
//! Every session walks the same path: entry, argument validation, resource
//! setup, the running exchange, then teardown. Transitions are pattern
//! matches over (phase, outcome) pairs, so the whole lifecycle is auditable
//! in one place and illegal jumps cannot be expressed.

/// A phase in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session object exists, nothing has run yet.
    Entry,
    /// Validating configuration.
    ParseArgs,
    /// Acquiring resources (socket bind, engine construction).
    Setup,
    /// The data exchange loop.
    Running,
    /// A fatal error was recorded; teardown still runs.
    FatalError,
    /// Releasing resources and reporting the session summary.
    Cleanup,
    /// Terminal. A session never leaves this phase.
    End,
}

/// How the work of one phase concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The phase completed; advance along the normal path.
    Ok,
    /// The phase failed fatally; divert to error handling.
    Error,
    /// The running exchange finished cleanly; proceed to teardown.
    Done,
}

impl SessionPhase {
    /// The phase that follows `self` given how it concluded.
    ///
    /// Error handling converges: any failure leads through
    /// [`FatalError`](Self::FatalError) into [`Cleanup`](Self::Cleanup),
    /// never back into [`Setup`](Self::Setup).
    pub fn next(self, outcome: PhaseOutcome) -> SessionPhase {
        match (self, outcome) {
            (SessionPhase::Entry, PhaseOutcome::Ok) => SessionPhase::ParseArgs,
            (SessionPhase::ParseArgs, PhaseOutcome::Ok) => SessionPhase::Setup,
            (SessionPhase::Setup, PhaseOutcome::Ok) => SessionPhase::Running,
            (SessionPhase::Running, PhaseOutcome::Ok) => SessionPhase::Running,

            (
                SessionPhase::Entry
                | SessionPhase::ParseArgs
                | SessionPhase::Setup
                | SessionPhase::Running,
                PhaseOutcome::Error,
            ) => SessionPhase::FatalError,
            (
                SessionPhase::Entry
                | SessionPhase::ParseArgs
                | SessionPhase::Setup
                | SessionPhase::Running,
                PhaseOutcome::Done,
            ) => SessionPhase::Cleanup,

            // Teardown is unconditional: whatever the error handler or the
            // cleanup step report, the path continues toward End.
            (SessionPhase::FatalError, _) => SessionPhase::Cleanup,
            (SessionPhase::Cleanup, _) => SessionPhase::End,
            (SessionPhase::End, _) => SessionPhase::End,
        }
    }

    /// `true` for the terminal phase.
    pub fn is_terminal(self) -> bool {
        self == SessionPhase::End
    }
}
