//! # Session context: single-writer reconciliation
//!
//! [`session_context`] returns a [`SessionHandle`] and a [`SessionDriver`]. The driver
//! is the only writer of the published [`SessionSnapshot`]; the caller spawns
//! [`SessionDriver::run`] on whatever executor it has (`tokio::spawn` on the server and
//! in tests, `dioxus::prelude::spawn` in the UI).
//!
//! ## Triggers
//!
//! | Source | Trigger | Step |
//! |--------|---------|------|
//! | startup / lagged event stream | | drop the event backlog, read `get_session()`, reconcile or clear |
//! | provider | `SignedIn`, `TokenRefreshed` | reconcile the carried session |
//! | provider | `SignedOut` | clear |
//! | handle | `refresh_user()` | refetch identity, reconcile |
//! | handle | `logout()` | clear |
//!
//! ## Ordering
//!
//! Steps run one at a time. While a reconciliation pass is in flight the driver keeps
//! listening; the next trigger supersedes the pass, which is dropped without
//! publishing. A pass started before a sign-out therefore can never resurrect the user
//! afterwards. Every publication bumps [`SessionSnapshot::seq`].
//!
//! The driver exits once every [`SessionHandle`] has been dropped.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, warn};

use super::accounts::AccountService;
use crate::auth::IdentityProvider;
use crate::error::{AuthError, RegistrationError};
use crate::models::{AuthEvent, NewAccount, Role, Session, User};

const COMMAND_CAPACITY: usize = 16;

/// What the session context publishes to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Publication counter, strictly increasing.
    pub seq: u64,
    /// A reconciliation pass (or the initial session check) is running.
    pub loading: bool,
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            seq: 0,
            loading: true,
            session: None,
            user: None,
        }
    }
}

#[derive(Debug)]
enum Command {
    Refresh(oneshot::Sender<()>),
    SignOut(oneshot::Sender<()>),
}

enum Step {
    Resync,
    Reconcile {
        session: Session,
        refetch: bool,
        done: Option<oneshot::Sender<()>>,
    },
    Clear {
        done: Option<oneshot::Sender<()>>,
    },
    Stop,
}

enum Input {
    Command(Option<Command>),
    Event(Result<AuthEvent, RecvError>),
}

enum PassOutcome {
    Resolved {
        session: Session,
        user: Result<User, AuthError>,
    },
    Expired,
}

enum Race {
    Superseded(Step),
    Finished(PassOutcome),
}

/// Create a session context over `provider` and `accounts`.
pub fn session_context<P, A>(provider: Arc<P>, accounts: Arc<A>) -> (SessionHandle<P, A>, SessionDriver<P, A>)
where
    P: IdentityProvider,
    A: AccountService,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
    let events = provider.subscribe();

    let handle = SessionHandle {
        provider: Arc::clone(&provider),
        accounts: Arc::clone(&accounts),
        commands: command_tx,
        snapshots: snapshot_rx,
    };
    let driver = SessionDriver {
        provider,
        accounts,
        commands: command_rx,
        events,
        events_open: true,
        snapshots: snapshot_tx,
        seq: 0,
        passes: 0,
        session: None,
        latest: None,
    };
    (handle, driver)
}

/// Imperative side of the session context. Cheap to clone.
pub struct SessionHandle<P, A> {
    provider: Arc<P>,
    accounts: Arc<A>,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl<P, A> Clone for SessionHandle<P, A> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            accounts: Arc::clone(&self.accounts),
            commands: self.commands.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<P, A> PartialEq for SessionHandle<P, A> {
    fn eq(&self, other: &Self) -> bool {
        self.commands.same_channel(&other.commands)
    }
}

impl<P, A> SessionHandle<P, A>
where
    P: IdentityProvider,
    A: AccountService,
{
    /// Establish a session. The user is populated by the `SignedIn` event that follows.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.provider
            .sign_in_with_password(email, password)
            .await
            .map(|_| ())
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<(), RegistrationError> {
        let account = NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        };
        self.accounts.register(&account).await.map(|_| ())
    }

    /// Sign out with the provider, then clear local state even if that failed.
    ///
    /// The provider's current session is revoked first; the published session can lag
    /// behind it while a pass for a refreshed token is still in flight.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let mut tokens = Vec::with_capacity(2);
        match self.provider.get_session().await {
            Ok(Some(session)) => tokens.push(session.access_token),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not read provider session during logout"),
        }
        if let Some(session) = self.snapshot().session {
            if !tokens.contains(&session.access_token) {
                tokens.push(session.access_token);
            }
        }

        for token in &tokens {
            if let Err(e) = self.provider.sign_out(token).await {
                error!(error = %e, "provider sign-out failed, clearing local session anyway");
            }
        }

        self.request(Command::SignOut).await
    }

    /// Rerun reconciliation for the current session and wait until it is published
    /// (or superseded by a newer trigger).
    pub async fn refresh_user(&self) -> Result<(), AuthError> {
        self.request(Command::Refresh).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    async fn request(&self, command: fn(oneshot::Sender<()>) -> Command) -> Result<(), AuthError> {
        let (done, ack) = oneshot::channel();
        self.commands
            .send(command(done))
            .await
            .map_err(|_| AuthError::Closed)?;
        // A dropped sender means the step was superseded; a newer one will publish.
        let _ = ack.await;
        Ok(())
    }
}

/// Single writer of the session snapshot.
pub struct SessionDriver<P, A> {
    provider: Arc<P>,
    accounts: Arc<A>,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Receiver<AuthEvent>,
    events_open: bool,
    snapshots: watch::Sender<SessionSnapshot>,
    seq: u64,
    passes: u64,
    /// Session of the last published user.
    session: Option<Session>,
    /// Most recent session any trigger asked for.
    latest: Option<Session>,
}

impl<P, A> SessionDriver<P, A>
where
    P: IdentityProvider,
    A: AccountService,
{
    pub async fn run(mut self) {
        let mut pending = Some(Step::Resync);
        loop {
            let step = match pending.take() {
                Some(step) => step,
                None => self.next_step().await,
            };
            pending = match step {
                Step::Stop => break,
                Step::Resync => self.resync().await,
                Step::Clear { done } => {
                    self.clear();
                    acknowledge(done);
                    None
                }
                Step::Reconcile {
                    session,
                    refetch,
                    done,
                } => self.reconcile(session, refetch, done).await,
            };
        }
        debug!("session context stopped");
    }

    async fn next_step(&mut self) -> Step {
        loop {
            let input = tokio::select! {
                command = self.commands.recv() => Input::Command(command),
                event = self.events.recv(), if self.events_open => Input::Event(event),
            };

            match input {
                Input::Command(None) => return Step::Stop,
                Input::Command(Some(Command::SignOut(done))) => {
                    self.latest = None;
                    return Step::Clear { done: Some(done) };
                }
                Input::Command(Some(Command::Refresh(done))) => match &self.latest {
                    Some(session) => {
                        return Step::Reconcile {
                            session: session.clone(),
                            refetch: true,
                            done: Some(done),
                        }
                    }
                    None => acknowledge(Some(done)),
                },
                Input::Event(Ok(AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session))) => {
                    self.latest = Some(session.clone());
                    return Step::Reconcile {
                        session,
                        refetch: false,
                        done: None,
                    };
                }
                Input::Event(Ok(AuthEvent::SignedOut)) => {
                    self.latest = None;
                    return Step::Clear { done: None };
                }
                Input::Event(Err(RecvError::Lagged(missed))) => {
                    warn!(missed, "auth events lagged, resyncing session");
                    // The backlog is stale once the provider is asked directly.
                    self.events = self.events.resubscribe();
                    return Step::Resync;
                }
                Input::Event(Err(RecvError::Closed)) => {
                    debug!("identity provider closed its event stream");
                    self.events_open = false;
                }
            }
        }
    }

    async fn resync(&mut self) -> Option<Step> {
        match self.provider.get_session().await {
            Ok(Some(session)) => {
                self.latest = Some(session.clone());
                Some(Step::Reconcile {
                    session,
                    refetch: false,
                    done: None,
                })
            }
            Ok(None) => {
                self.latest = None;
                self.clear();
                None
            }
            Err(e) => {
                warn!(error = %e, "could not read provider session");
                let user = self.snapshots.borrow().user.clone();
                self.publish(user, false);
                None
            }
        }
    }

    async fn reconcile(
        &mut self,
        session: Session,
        refetch: bool,
        done: Option<oneshot::Sender<()>>,
    ) -> Option<Step> {
        self.passes += 1;
        let pass = self.passes;
        debug!(pass, user_id = %session.user.id, refetch, "reconciliation pass started");

        let user = self.snapshots.borrow().user.clone();
        self.publish(user, true);

        let run = run_pass(
            Arc::clone(&self.provider),
            Arc::clone(&self.accounts),
            session,
            refetch,
        );
        tokio::pin!(run);

        let race = tokio::select! {
            biased;
            step = self.next_step() => Race::Superseded(step),
            outcome = &mut run => Race::Finished(outcome),
        };

        match race {
            Race::Superseded(step) => {
                debug!(pass, "reconciliation pass superseded");
                Some(step)
            }
            Race::Finished(outcome) => {
                self.apply(outcome);
                acknowledge(done);
                debug!(pass, seq = self.seq, "reconciliation pass published");
                None
            }
        }
    }

    fn apply(&mut self, outcome: PassOutcome) {
        match outcome {
            PassOutcome::Expired
            | PassOutcome::Resolved {
                user: Err(AuthError::SessionExpired),
                ..
            } => {
                debug!("session expired during reconciliation");
                self.latest = None;
                self.clear();
            }
            PassOutcome::Resolved {
                session,
                user: Ok(user),
            } => {
                self.latest = Some(session.clone());
                self.session = Some(session);
                self.publish(Some(user), false);
            }
            PassOutcome::Resolved {
                session,
                user: Err(e),
            } => {
                error!(user_id = %session.user.id, error = %e, "could not resolve user");
                let kept = self
                    .snapshots
                    .borrow()
                    .user
                    .clone()
                    .filter(|u| u.id == session.user.id);
                self.session = Some(session);
                self.publish(kept, false);
            }
        }
    }

    fn clear(&mut self) {
        self.session = None;
        self.publish(None, false);
    }

    fn publish(&mut self, user: Option<User>, loading: bool) {
        self.seq += 1;
        self.snapshots.send_replace(SessionSnapshot {
            seq: self.seq,
            loading,
            session: self.session.clone(),
            user,
        });
    }
}

async fn run_pass<P, A>(provider: Arc<P>, accounts: Arc<A>, mut session: Session, refetch: bool) -> PassOutcome
where
    P: IdentityProvider,
    A: AccountService,
{
    if refetch {
        match provider.get_user(&session.access_token).await {
            Ok(Some(identity)) => session.user = identity,
            Ok(None) | Err(AuthError::SessionExpired) => return PassOutcome::Expired,
            Err(e) => {
                warn!(error = %e, "could not refetch identity, using cached session user");
            }
        }
    }

    let user = accounts.resolve_user(&session).await;
    PassOutcome::Resolved { session, user }
}

fn acknowledge(done: Option<oneshot::Sender<()>>) {
    if let Some(done) = done {
        let _ = done.send(());
    }
}
