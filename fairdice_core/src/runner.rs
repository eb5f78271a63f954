use std::time::Duration;

use fairdice_shared::{AgentConfig, AgentState, DiceError, DiceResult};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::{BettingAgent, GuardBlock, TickOutcome};
use crate::observer::BetObserver;
use crate::rng::SeedPair;

enum Command {
    Activate(oneshot::Sender<DiceResult<()>>),
    Deactivate(oneshot::Sender<()>),
    Reset(oneshot::Sender<()>),
    Configure(AgentConfig, oneshot::Sender<DiceResult<()>>),
    SetSeeds(SeedPair, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<AgentState>),
    Status(oneshot::Sender<AgentStatus>),
    Shutdown,
}

/// Scheduler-level view of the agent, alongside the published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentStatus {
    pub active: bool,
    pub nonce: u64,
    pub blocked: Option<GuardBlock>,
}

/// Control surface for an agent running on its own task.
///
/// Cloning the handle is cheap; the task exits once every handle is dropped
/// or [`AgentHandle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl AgentHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> DiceResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| DiceError::AgentStopped)?;
        reply_rx.await.map_err(|_| DiceError::AgentStopped)
    }

    pub async fn activate(&self) -> DiceResult<()> {
        self.request(Command::Activate).await?
    }

    /// Once this returns no further bet will be placed.
    pub async fn deactivate(&self) -> DiceResult<()> {
        self.request(Command::Deactivate).await
    }

    pub async fn reset(&self) -> DiceResult<()> {
        self.request(Command::Reset).await
    }

    pub async fn configure(&self, config: AgentConfig) -> DiceResult<()> {
        self.request(|tx| Command::Configure(config, tx)).await?
    }

    pub async fn set_seeds(&self, seeds: SeedPair) -> DiceResult<()> {
        self.request(|tx| Command::SetSeeds(seeds, tx)).await
    }

    pub async fn snapshot(&self) -> DiceResult<AgentState> {
        self.request(Command::Snapshot).await
    }

    pub async fn status(&self) -> DiceResult<AgentStatus> {
        self.request(Command::Status).await
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

pub struct AgentRunner;

impl AgentRunner {
    /// Move the agent onto a tokio task. The join handle yields the agent back
    /// once the task stops.
    pub fn spawn<O>(agent: BettingAgent, observer: O) -> (AgentHandle, JoinHandle<BettingAgent>)
    where
        O: BetObserver + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(agent, observer, rx));
        (AgentHandle { tx }, task)
    }
}

struct Schedule {
    interval: Option<Interval>,
    period: Option<Duration>,
}

impl Schedule {
    /// Start, stop or re-time the interval to match the agent.
    fn sync(&mut self, agent: &BettingAgent) {
        if !agent.is_active() {
            self.interval = None;
            self.period = None;
            return;
        }
        let period = agent.config().bet_period();
        if self.period == Some(period) && self.interval.is_some() {
            return;
        }
        // first bet one full period after (re)start
        let now = Instant::now();
        let start = now.checked_add(period).unwrap_or(now);
        let mut interval = time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(?period, "bet schedule started");
        self.interval = Some(interval);
        self.period = Some(period);
    }

    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

async fn run<O: BetObserver>(
    mut agent: BettingAgent,
    mut observer: O,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> BettingAgent {
    let mut schedule = Schedule {
        interval: None,
        period: None,
    };

    loop {
        tokio::select! {
            // commands win over a tick that is ready at the same time
            biased;
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    Command::Activate(reply) => {
                        let _ = reply.send(agent.activate());
                    }
                    Command::Deactivate(reply) => {
                        agent.deactivate();
                        let _ = reply.send(());
                    }
                    Command::Reset(reply) => {
                        agent.reset();
                        let _ = reply.send(());
                    }
                    Command::Configure(config, reply) => {
                        let res = agent.configure(config);
                        if let Err(err) = &res {
                            warn!(%err, "configuration rejected");
                        }
                        let _ = reply.send(res);
                    }
                    Command::SetSeeds(seeds, reply) => {
                        agent.set_seeds(seeds);
                        let _ = reply.send(());
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(agent.state().clone());
                    }
                    Command::Status(reply) => {
                        let _ = reply.send(AgentStatus {
                            active: agent.is_active(),
                            nonce: agent.nonce(),
                            blocked: agent.guard(),
                        });
                    }
                    Command::Shutdown => break,
                }
                schedule.sync(&agent);
            }
            _ = schedule.tick() => {
                match agent.tick(&mut observer) {
                    Ok(TickOutcome::Placed(_)) | Ok(TickOutcome::Skipped(_)) => {}
                    Ok(TickOutcome::Inactive) => schedule.sync(&agent),
                    Err(err) => warn!(%err, "bet could not be settled"),
                }
            }
        }
    }

    agent.deactivate();
    info!(total_bets = agent.state().total_bets, "agent task stopped");
    agent
}
