use std::{io, time::Duration};

use gridmerge_cli::{
    session::{
        GameSession, SessionSettings, MANUAL_FALLBACK_NOTICE, MILESTONE_NOTICE, SAVE_FAILED_NOTICE,
    },
    transfer,
};
use gridmerge_core::{
    CellId, CellOverride, CellRegion, CellState, Direction, InteractionOutcome, LatLng, Token,
    DEFAULT_START, MILESTONE_TOKEN,
};
use gridmerge_storage::{MemoryStore, SessionSnapshot, SnapshotStore, StorageError};
use gridmerge_system_generation::natural;
use gridmerge_system_movement::{FixFeed, PositionSourceError};
use gridmerge_world::query;

fn settings() -> SessionSettings {
    SessionSettings {
        start: DEFAULT_START,
        view_half_extent: 4,
        notice_lifetime: Duration::from_secs(1),
    }
}

fn token(value: u32) -> Token {
    Token::new(value).expect("valid token")
}

fn new_session(store: MemoryStore) -> GameSession<MemoryStore> {
    GameSession::start(settings(), store, false).expect("session starts")
}

fn reachable_token(session: &GameSession<MemoryStore>) -> (CellId, Token) {
    let here = query::player_cell(session.world());
    let reach = CellRegion::spanning(
        CellId::new(here.i() - 3, here.j() - 3),
        CellId::new(here.i() + 3, here.j() + 3),
    );
    reach
        .iter()
        .find_map(|cell| natural(cell).token().map(|token| (cell, token)))
        .expect("some cell within reach holds a natural token")
}

#[test]
fn fresh_session_materializes_view_without_saving() {
    let session = new_session(MemoryStore::new());
    let status = session.status();

    assert_eq!(status.position, DEFAULT_START);
    assert_eq!(status.inventory, None);
    assert_eq!(status.overrides, 0);
    assert!(status.materialized >= 81);
    assert!(!status.live);
    assert!(session.store().contents().is_none());
}

#[test]
fn pickup_survives_a_restart() {
    let mut session = new_session(MemoryStore::new());
    let (cell, held) = reachable_token(&session);

    let outcome = session.interact(cell).expect("interaction saves");
    assert_eq!(outcome, InteractionOutcome::PickedUp { token: held });

    let saved = session
        .store()
        .contents()
        .expect("snapshot written after pickup")
        .to_owned();
    let restored = new_session(MemoryStore::with_contents(saved));

    assert_eq!(restored.status().inventory, Some(held));
    assert_eq!(restored.status().position, DEFAULT_START);
    assert!(query::effective_state(restored.world(), cell).is_empty());
    assert!(query::is_overridden(restored.world(), cell));
}

#[test]
fn movement_is_saved_and_keeps_view_synchronised() {
    let mut session = new_session(MemoryStore::new());
    let before = session.status().cell;

    session.step(Direction::North).expect("step saves");
    session.step(Direction::East).expect("step saves");

    let status = session.status();
    assert_eq!(status.cell, CellId::new(before.i() + 1, before.j() + 1));
    assert!(query::materialized_view(session.world()).contains(status.cell));
    assert!(!query::materialized_view(session.world()).contains(CellId::new(
        before.i() - 20,
        before.j()
    )));

    let saved = SessionSnapshot::decode(session.store().contents().expect("snapshot written"))
        .expect("snapshot decodes");
    assert_eq!(saved.position, status.position);
}

#[test]
fn rejected_interaction_posts_expiring_notice() {
    let mut session = new_session(MemoryStore::new());
    let here = session.status().cell;
    let far = CellId::new(here.i() + 4, here.j());

    let outcome = session.interact(far).expect("interaction resolves");
    assert_eq!(outcome, InteractionOutcome::OutOfRange);
    assert!(session.store().contents().is_none());

    let scene = session.scene();
    assert_eq!(scene.notice.as_deref(), Some("that cell is out of reach"));
    assert_eq!(scene.feedback.map(|feedback| feedback.cell), Some(far));

    session.tick(Duration::from_secs(1));
    assert!(session.scene().notice.is_none());
}

#[test]
fn corrupt_snapshot_starts_fresh_and_is_discarded() {
    let session = new_session(MemoryStore::with_contents("{\"inventory\": \"oops\""));

    assert_eq!(session.status().position, DEFAULT_START);
    assert_eq!(session.status().inventory, None);
    assert!(session.store().contents().is_none());
}

#[test]
fn reset_erases_progress_and_snapshot() {
    let mut session = new_session(MemoryStore::new());
    let (cell, _) = reachable_token(&session);
    let _ = session.interact(cell).expect("interaction saves");
    session
        .move_to(LatLng::new(36.9979, -122.0570))
        .expect("move saves");
    assert!(session.store().contents().is_some());

    session.reset().expect("reset erases");

    let status = session.status();
    assert!(session.store().contents().is_none());
    assert_eq!(status.position, DEFAULT_START);
    assert_eq!(status.inventory, None);
    assert_eq!(status.overrides, 0);
    assert!(status.materialized > 0);
    assert_eq!(
        query::effective_state(session.world(), cell),
        natural(cell)
    );
}

#[test]
fn fresh_flag_ignores_saved_progress() {
    let snapshot = SessionSnapshot {
        inventory: Some(token(16)),
        position: LatLng::new(10.0, 10.0),
        overrides: Vec::new(),
    };
    let store = MemoryStore::with_contents(snapshot.encode().expect("snapshot encodes"));

    let session = GameSession::start(settings(), store, true).expect("session starts");

    assert_eq!(session.status().inventory, None);
    assert_eq!(session.status().position, DEFAULT_START);
    assert!(session.store().contents().is_none());
}

#[test]
fn forging_the_milestone_celebrates_once() {
    let here = CellId::containing(DEFAULT_START);
    let snapshot = SessionSnapshot {
        inventory: Some(token(64)),
        position: DEFAULT_START,
        overrides: vec![CellOverride {
            cell: here,
            state: CellState::holding(token(64)),
        }],
    };
    let store = MemoryStore::with_contents(snapshot.encode().expect("snapshot encodes"));
    let mut session = new_session(store);

    let outcome = session.interact(here).expect("merge saves");
    assert_eq!(
        outcome,
        InteractionOutcome::Merged {
            token: MILESTONE_TOKEN
        }
    );
    assert_eq!(session.milestones(), 1);
    assert_eq!(session.scene().notice.as_deref(), Some(MILESTONE_NOTICE));

    let picked = session.interact(here).expect("pickup saves");
    assert_eq!(
        picked,
        InteractionOutcome::PickedUp {
            token: MILESTONE_TOKEN
        }
    );
    let placed = session.interact(here).expect("placement saves");
    assert_eq!(
        placed,
        InteractionOutcome::Placed {
            token: MILESTONE_TOKEN
        }
    );
    assert_eq!(session.milestones(), 1);
}

#[test]
fn unavailable_feed_falls_back_to_manual_steps() {
    let mut session = new_session(MemoryStore::new());
    session.attach_feed(Err(PositionSourceError::Unsupported {
        reason: "no device".into(),
    }));

    assert!(!session.status().live);
    assert_eq!(
        session.scene().notice.as_deref(),
        Some(MANUAL_FALLBACK_NOTICE)
    );
    assert!(!session.follow_feed().expect("polling is harmless"));

    let before = session.status().cell;
    session.step(Direction::South).expect("manual step works");
    assert_eq!(session.status().cell, CellId::new(before.i() - 1, before.j()));
}

#[test]
fn live_feed_replays_fixes_in_order() {
    let first = LatLng::new(36.9979, -122.0570);
    let second = LatLng::new(36.9981, -122.0568);
    let mut session = new_session(MemoryStore::new());
    session.attach_feed(Ok(FixFeed::new([first, second])));

    assert!(session.status().live);
    assert!(session.follow_feed().expect("fix applies"));
    assert_eq!(session.status().position, first);
    assert!(session.follow_feed().expect("fix applies"));
    assert_eq!(session.status().position, second);
    assert!(!session.follow_feed().expect("exhausted feed is harmless"));
    assert_eq!(session.status().position, second);
}

#[test]
fn export_and_import_move_a_session_between_stores() {
    let mut original = new_session(MemoryStore::new());
    let (cell, held) = reachable_token(&original);
    let _ = original.interact(cell).expect("interaction saves");
    original.step(Direction::West).expect("step saves");
    let exported = original.export().expect("session exports");
    assert!(exported.starts_with("gridmerge:"));

    let mut copy = new_session(MemoryStore::new());
    copy.import(&exported).expect("session imports");

    assert_eq!(copy.snapshot(), original.snapshot());
    assert_eq!(copy.status().inventory, Some(held));
    assert_eq!(copy.store().contents(), original.store().contents());
    assert!(query::materialized_view(copy.world()).contains(copy.status().cell));
}

#[test]
fn malformed_import_leaves_session_untouched() {
    let mut session = new_session(MemoryStore::new());
    let before = session.snapshot();

    assert!(session.import("gridmerge:!!!").is_err());
    assert!(session.import("worldsave:abc").is_err());
    assert_eq!(session.snapshot(), before);
    assert!(transfer::decode("").is_err());
}

#[derive(Debug, Default)]
struct FullDisk {
    saved: Option<String>,
    failed_writes: usize,
}

impl SnapshotStore for FullDisk {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.saved.clone())
    }

    fn write(&mut self, _contents: &str) -> Result<(), StorageError> {
        self.failed_writes += 1;
        Err(StorageError::Io {
            location: "disk".into(),
            source: io::Error::new(io::ErrorKind::Other, "no space left"),
        })
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.saved = None;
        Ok(())
    }
}

#[test]
fn failed_save_keeps_the_change_and_the_session_playable() {
    let mut session =
        GameSession::start(settings(), FullDisk::default(), false).expect("session starts");
    let before = session.status().cell;

    assert!(session.step(Direction::North).is_err());
    assert_eq!(session.status().cell, CellId::new(before.i() + 1, before.j()));
    assert_eq!(session.scene().notice.as_deref(), Some(SAVE_FAILED_NOTICE));

    assert!(session.step(Direction::North).is_err());
    let after = session.status().cell;
    assert_eq!(after, CellId::new(before.i() + 2, before.j()));
    assert!(query::materialized_view(session.world()).contains(after));
    assert_eq!(session.store().failed_writes, 2);
}

#[test]
fn restore_survives_a_failing_resave() {
    let snapshot = SessionSnapshot {
        inventory: Some(token(32)),
        position: DEFAULT_START,
        overrides: Vec::new(),
    };
    let store = FullDisk {
        saved: Some(snapshot.encode().expect("snapshot encodes")),
        failed_writes: 0,
    };

    let session = GameSession::start(settings(), store, false).expect("session starts");

    assert_eq!(session.status().inventory, Some(token(32)));
    assert_eq!(session.store().failed_writes, 1);
    assert_eq!(session.scene().notice.as_deref(), Some(SAVE_FAILED_NOTICE));
}
