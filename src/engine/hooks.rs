use crate::types::Outcome;

/// What the host says when the last life is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinueOffer {
    /// No continue; the session ends `lost` right away.
    Declined,
    /// The host is asking its economy collaborator. The session waits in
    /// `AwaitingContinue` until `GameEngine::resolve_continue` is called.
    Pending,
}

/// Callbacks from the engine to whoever hosts the session.
///
/// Called synchronously from inside a tick, so implementations must not
/// block. Anything slow (a network call, a user prompt) belongs behind
/// `ContinueOffer::Pending`.
pub trait SessionHooks: Send {
    /// Fires once per session end. Further end triggers never reach it.
    fn on_session_end(&mut self, final_score: u32, outcome: Outcome);

    fn on_life_lost(&mut self) -> ContinueOffer {
        ContinueOffer::Declined
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl SessionHooks for NoopHooks {
    fn on_session_end(&mut self, _final_score: u32, _outcome: Outcome) {}
}
