//! # Lifecycle Controller
//!
//! Tracks one session per connected player and enforces life gating.
//!
//! ```text
//!            login
//!   (none) ────────► Connecting ──► Active ◄──────┐
//!     ▲                   │           │ death     │ respawn (token spent)
//!     │ disconnect        └──► Dead ◄─┘           │
//!     └──────────────────────── Dead ─────────────┘
//!                                 ▲ │ respawn refused: lethal damage
//!                                 └─┘
//! ```
//!
//! The session owns the `RuntimeMirror`. The ledger is written when a token
//! is spent and once more on disconnect; everything else reads the mirror.

use std::collections::HashMap;

use crate::account::{AccountKey, PlayerUid, Tokens};
use crate::error::{EconomyError, EconomyResult};
use crate::host::{GameHost, PlayerRef};
use crate::ledger::Ledger;
use crate::mirror::RuntimeMirror;
use crate::notice::Notice;

/// Tokens spent per respawn.
pub const RESPAWN_COST: Tokens = 1;

/// Where a session is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Login in progress; the account is being loaded.
    Connecting,
    /// Alive.
    Active,
    /// Dead, waiting for a respawn attempt.
    Dead,
}

/// Per-connection state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Display name at login.
    pub name: String,
    /// Current state.
    pub state: SessionState,
    /// Balance mirror.
    pub mirror: RuntimeMirror,
}

/// Result of a respawn attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespawnOutcome {
    /// A token was spent and the player is alive.
    Granted {
        /// Tokens left.
        remaining: Tokens,
    },
    /// The player was kept dead.
    Denied {
        /// Tokens held.
        balance: Tokens,
    },
}

impl RespawnOutcome {
    /// Whether the respawn went through.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Session table and event handlers.
#[derive(Debug, Default)]
pub struct Lifecycle {
    sessions: HashMap<PlayerUid, Session>,
}

impl Lifecycle {
    /// Creates an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session of a connected player.
    #[must_use]
    pub fn session(&self, uid: &PlayerUid) -> Option<&Session> {
        self.sessions.get(uid)
    }

    /// Mirror of a connected player.
    #[must_use]
    pub fn mirror(&self, uid: &PlayerUid) -> Option<RuntimeMirror> {
        self.sessions.get(uid).map(|session| session.mirror)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Loads (or creates) the player's account and opens a session.
    ///
    /// A player who logs in dead without a token is killed again on the spot.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the account could not be loaded or saved;
    /// no session is left behind in that case.
    pub fn on_login(
        &mut self,
        ledger: &Ledger,
        starting_balance: Tokens,
        host: &mut dyn GameHost,
        player: &PlayerRef,
    ) -> EconomyResult<RuntimeMirror> {
        self.sessions.insert(
            player.uid.clone(),
            Session {
                name: player.name.clone(),
                state: SessionState::Connecting,
                mirror: RuntimeMirror::default(),
            },
        );

        let (account, origin) = match ledger.get_or_create(&player.uid, &player.name, starting_balance) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.sessions.remove(&player.uid);
                tracing::error!(uid = %player.uid, error = %err, "login failed to load account");
                return Err(err);
            }
        };

        let dead = host.is_dead(&player.uid);
        let mirror = RuntimeMirror::from_balance(account.balance);
        if let Some(session) = self.sessions.get_mut(&player.uid) {
            session.mirror = mirror;
            session.state = if dead { SessionState::Dead } else { SessionState::Active };
        }
        host.publish_mirror(&player.uid, &mirror);

        if dead && account.balance < RESPAWN_COST {
            host.kill(&player.uid);
            host.notify(
                &player.uid,
                &Notice::RespawnDenied {
                    required: RESPAWN_COST,
                    balance: account.balance,
                },
            );
        }

        tracing::info!(
            uid = %player.uid,
            name = %player.name,
            balance = account.balance,
            ?origin,
            dead,
            "player logged in"
        );
        Ok(mirror)
    }

    /// Records a death. Running out of tokens also wipes the player's skills
    /// when a skill system is present.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::NoActiveSession` for an unknown player.
    pub fn on_death(&mut self, host: &mut dyn GameHost, uid: &PlayerUid) -> EconomyResult<()> {
        let session = self
            .sessions
            .get_mut(uid)
            .ok_or_else(|| EconomyError::NoActiveSession(uid.to_string()))?;

        session.mirror.record_death(host.elapsed_ms());
        session.state = SessionState::Dead;
        let mirror = session.mirror;
        host.publish_mirror(uid, &mirror);
        tracing::info!(%uid, balance = mirror.balance, can_respawn = mirror.can_respawn, "player died");

        if mirror.balance < RESPAWN_COST {
            host.notify(
                uid,
                &Notice::RespawnDenied {
                    required: RESPAWN_COST,
                    balance: mirror.balance,
                },
            );
            reset_skills(host, uid);
        }
        Ok(())
    }

    /// Spends a token to let the player back in, or keeps them dead.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::NoActiveSession` for an unknown player. A failed
    /// ledger write is not an error here: the respawn is refused instead.
    pub fn on_respawn(
        &mut self,
        ledger: &Ledger,
        host: &mut dyn GameHost,
        uid: &PlayerUid,
    ) -> EconomyResult<RespawnOutcome> {
        let session = self
            .sessions
            .get_mut(uid)
            .ok_or_else(|| EconomyError::NoActiveSession(uid.to_string()))?;

        if session.mirror.can_respawn && session.mirror.balance >= RESPAWN_COST {
            match ledger.debit(&AccountKey::known(uid), RESPAWN_COST) {
                Ok(remaining) => {
                    session.mirror.sync_balance(remaining);
                    session.state = SessionState::Active;
                    let mirror = session.mirror;
                    host.publish_mirror(uid, &mirror);
                    host.notify(
                        uid,
                        &Notice::RespawnGranted {
                            spent: RESPAWN_COST,
                            remaining,
                        },
                    );
                    tracing::info!(%uid, remaining, "respawn granted");
                    return Ok(RespawnOutcome::Granted { remaining });
                }
                Err(err) => {
                    tracing::error!(%uid, error = %err, "respawn debit failed, keeping player dead");
                }
            }
        }

        session.state = SessionState::Dead;
        let mirror = session.mirror;
        host.kill(uid);
        host.publish_mirror(uid, &mirror);
        host.notify(
            uid,
            &Notice::RespawnDenied {
                required: RESPAWN_COST,
                balance: mirror.balance,
            },
        );
        tracing::info!(%uid, balance = mirror.balance, "respawn denied");
        Ok(RespawnOutcome::Denied {
            balance: mirror.balance,
        })
    }

    /// Writes the mirror balance back to the ledger and closes the session.
    /// Unknown players are ignored.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the final write fails. The session is
    /// closed either way.
    pub fn on_disconnect(&mut self, ledger: &Ledger, uid: &PlayerUid) -> EconomyResult<()> {
        let Some(session) = self.sessions.remove(uid) else {
            tracing::debug!(%uid, "disconnect without session");
            return Ok(());
        };
        ledger.set(&AccountKey::known(uid), session.mirror.balance)?;
        tracing::info!(%uid, balance = session.mirror.balance, "player disconnected");
        Ok(())
    }

    /// Closes every session, flushing each mirror. Returns the first error.
    ///
    /// # Errors
    ///
    /// Returns the first ledger write failure; all sessions are still closed.
    pub fn close_all(&mut self, ledger: &Ledger) -> EconomyResult<()> {
        let uids: Vec<PlayerUid> = self.sessions.keys().cloned().collect();
        let mut first_err = None;
        for uid in uids {
            if let Err(err) = self.on_disconnect(ledger, &uid) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Pushes a new ledger balance into a connected player's mirror.
    ///
    /// Returns true if the player is dead and just became able to respawn.
    pub fn sync_balance(&mut self, host: &mut dyn GameHost, uid: &PlayerUid, balance: Tokens) -> bool {
        let Some(session) = self.sessions.get_mut(uid) else {
            return false;
        };
        let unlocked = session.mirror.sync_balance(balance) && session.state == SessionState::Dead;
        let mirror = session.mirror;
        host.publish_mirror(uid, &mirror);
        unlocked
    }
}

/// Best-effort skill wipe for a player who ran out of tokens.
fn reset_skills(host: &mut dyn GameHost, uid: &PlayerUid) {
    let result = host.skills().map(|skills| skills.reset_all_tiers(uid));
    match result {
        None => {
            tracing::warn!(%uid, "skill system not installed, skills not reset");
            host.notify(uid, &Notice::SkillsUnavailable);
        }
        Some(Err(err)) => {
            tracing::warn!(%uid, error = %err, "skill reset failed");
        }
        Some(Ok(())) => {
            tracing::info!(%uid, "skills reset after running out of tokens");
            host.notify(uid, &Notice::SkillsReset);
        }
    }
}
