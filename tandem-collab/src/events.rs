use crossbeam::channel::{Receiver, Sender};

use crate::{PlaybackSnapshot, PrimaryKey};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Events emitted by the collab system whenever a record changes.
/// Clients still poll, these exist for logging and other in-process observers.
#[derive(Debug, Clone)]
pub enum CollabEvent {
    InvitationCreated {
        invitation_id: PrimaryKey,
        from_id: PrimaryKey,
        to_id: PrimaryKey,
    },
    InvitationAccepted {
        invitation_id: PrimaryKey,
        session_id: PrimaryKey,
    },
    InvitationDeclined {
        invitation_id: PrimaryKey,
    },
    /// An invitation was found past its deadline while someone tried to answer it
    InvitationExpired {
        invitation_id: PrimaryKey,
    },
    SessionStarted {
        session_id: PrimaryKey,
        host_id: PrimaryKey,
        participant_id: PrimaryKey,
    },
    /// A session ended, either explicitly, by the host leaving, or by being superseded
    SessionEnded {
        session_id: PrimaryKey,
        reason: EndReason,
    },
    /// A participant left a session that is still going
    UserLeft {
        session_id: PrimaryKey,
        user_id: PrimaryKey,
    },
    /// The host synced playback
    PlaybackUpdated {
        session_id: PrimaryKey,
        snapshot: PlaybackSnapshot,
    },
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The host ended it
    Ended,
    /// The host left
    HostLeft,
    /// The host was left without anyone to listen with
    Deserted,
    /// A member accepted a new invitation
    Superseded,
}
