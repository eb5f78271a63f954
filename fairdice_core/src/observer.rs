use fairdice_shared::{AgentState, BetResult};
use tokio::sync::mpsc;

/// Receives what the agent publishes after every resolved bet.
///
/// `on_state_update` is always called before `on_bet_result` for the same bet.
pub trait BetObserver: Send {
    fn on_state_update(&mut self, state: &AgentState);
    fn on_bet_result(&mut self, result: &BetResult);
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StateUpdated(Box<AgentState>),
    BetResolved(BetResult),
}

/// Forwards owned copies of every update over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BetObserver for ChannelObserver {
    fn on_state_update(&mut self, state: &AgentState) {
        // a dropped receiver just means nobody is listening any more
        let _ = self.tx.send(AgentEvent::StateUpdated(Box::new(state.clone())));
    }

    fn on_bet_result(&mut self, result: &BetResult) {
        let _ = self.tx.send(AgentEvent::BetResolved(result.clone()));
    }
}

/// Adapts a pair of closures.
pub struct FnObserver<S, B> {
    on_state: S,
    on_bet: B,
}

impl<S, B> FnObserver<S, B>
where
    S: FnMut(&AgentState) + Send,
    B: FnMut(&BetResult) + Send,
{
    pub fn new(on_state: S, on_bet: B) -> Self {
        Self { on_state, on_bet }
    }
}

impl<S, B> BetObserver for FnObserver<S, B>
where
    S: FnMut(&AgentState) + Send,
    B: FnMut(&BetResult) + Send,
{
    fn on_state_update(&mut self, state: &AgentState) {
        (self.on_state)(state)
    }

    fn on_bet_result(&mut self, result: &BetResult) {
        (self.on_bet)(result)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BetObserver for NoopObserver {
    fn on_state_update(&mut self, _state: &AgentState) {}
    fn on_bet_result(&mut self, _result: &BetResult) {}
}
