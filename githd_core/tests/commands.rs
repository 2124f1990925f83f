mod support;

use std::rc::Rc;

use camino::Utf8Path;
use githd_core::commands::{ids, CommandCenter, CommandContext, CommandRegistry};
use githd_core::config::SettingsStore;
use githd_core::history::HistoryView;
use githd_core::host::{CommandArg, DiffOptions, Disposable};
use githd_core::listing::ListingHandle;
use githd_core::{uri, CommittedFile, Error, FileStatus, GitRef, ListingKind, RefType};
use support::{drain, FakeGit, FakeHost, FakeListing, HostEvent};
use tokio::task::LocalSet;

struct Fixture {
    host: Rc<FakeHost>,
    git: Rc<FakeGit>,
    listing: Rc<FakeListing>,
    history: Rc<HistoryView>,
    settings: Rc<SettingsStore>,
    registry: Rc<CommandRegistry>,
    center: CommandCenter,
}

fn fixture(git: FakeGit, listing: Rc<FakeListing>) -> Fixture {
    let host = Rc::new(FakeHost::default());
    let git = Rc::new(git);
    let handle = ListingHandle::new(listing.clone());
    let history = HistoryView::new(git.clone(), handle.clone(), 3);
    let settings = Rc::new(SettingsStore::in_memory());
    let registry = CommandRegistry::new();
    let center = CommandCenter::new(
        &registry,
        CommandContext {
            host: host.clone(),
            git: git.clone(),
            listing: handle,
            history: Rc::clone(&history),
            settings: Rc::clone(&settings),
        },
    )
    .expect("register commands");

    Fixture {
        host,
        git,
        listing,
        history,
        settings,
        registry,
        center,
    }
}

fn scm_listing() -> Rc<FakeListing> {
    FakeListing::new(ListingKind::Scm, true)
}

#[test]
fn every_command_is_registered_once() {
    let fx = fixture(FakeGit::default(), scm_listing());
    assert_eq!(fx.registry.len(), ids::ALL.len());
    for id in ids::ALL {
        assert!(fx.registry.contains(id), "{id} missing");
    }

    let second = CommandCenter::new(
        &fx.registry,
        CommandContext {
            host: fx.host.clone(),
            git: fx.git.clone(),
            listing: fx.center.listing().clone(),
            history: Rc::clone(&fx.history),
            settings: Rc::clone(&fx.settings),
        },
    );
    assert!(matches!(second, Err(Error::CommandAlreadyRegistered { .. })));
    assert_eq!(fx.registry.len(), ids::ALL.len());
}

#[test]
fn failed_registration_leaves_no_partial_table() {
    let fx = fixture(FakeGit::default(), scm_listing());
    fx.center.dispose();
    assert!(fx.registry.is_empty());

    let _taken = fx
        .registry
        .register(ids::INPUT_REF, Rc::new(|_| {}))
        .expect("register");
    let result = CommandCenter::new(
        &fx.registry,
        CommandContext {
            host: fx.host.clone(),
            git: fx.git.clone(),
            listing: fx.center.listing().clone(),
            history: Rc::clone(&fx.history),
            settings: Rc::clone(&fx.settings),
        },
    );

    assert!(matches!(
        result,
        Err(Error::CommandAlreadyRegistered { id }) if id == ids::INPUT_REF
    ));
    assert_eq!(fx.registry.ids(), [ids::INPUT_REF]);
}

#[test]
fn dispose_unregisters_every_command() {
    let fx = fixture(FakeGit::default(), scm_listing());
    fx.center.dispose();
    fx.center.dispose();

    assert!(fx.registry.is_empty());
    assert!(matches!(
        fx.registry.execute(ids::CLEAR, Vec::new()),
        Err(Error::UnknownCommand { .. })
    ));
}

#[tokio::test]
async fn open_committed_file_pairs_parent_with_commit() {
    let fx = fixture(FakeGit::default(), scm_listing().showing("abc123"));
    let file = CommittedFile::new("/repo/src/main.rs", "src/main.rs", FileStatus::Modified);

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::OPEN_COMMITTED_FILE, vec![CommandArg::File(file)])
                .expect("execute");
            drain().await;
        })
        .await;

    let path = Utf8Path::new("/repo/src/main.rs");
    assert_eq!(
        fx.host.events(),
        [HostEvent::OpenDiff {
            left: uri::encode(path, "abc123~", false),
            right: uri::encode(path, "abc123", false),
            title: "abc123 src/main.rs".into(),
            options: DiffOptions { preview: true },
        }]
    );
}

#[tokio::test]
async fn open_committed_file_without_ref_is_swallowed() {
    let fx = fixture(FakeGit::default(), scm_listing());
    let file = CommittedFile::new("/repo/a.txt", "a.txt", FileStatus::Added);

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::OPEN_COMMITTED_FILE, vec![CommandArg::File(file)])
                .expect("dispatch succeeds even though the handler fails");
            fx.registry
                .execute(ids::OPEN_COMMITTED_FILE, vec![CommandArg::Text("a.txt".into())])
                .expect("dispatch succeeds");
            drain().await;
        })
        .await;

    assert!(fx.host.events().is_empty());
}

#[tokio::test]
async fn bounded_history_moves_cursor_and_full_history_does_not() {
    let fx = fixture(FakeGit::default().with_history(None, 7), scm_listing());

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::VIEW_HISTORY, Vec::new())
                .expect("execute");
            drain().await;
        })
        .await;
    assert_eq!(
        fx.host.events(),
        [
            HostEvent::ShowDocument(HistoryView::DEFAULT_URI),
            HostEvent::CursorTop
        ]
    );
    assert_eq!(fx.history.entries().len(), 3);

    fx.host.events.borrow_mut().clear();
    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::VIEW_ALL_HISTORY, Vec::new())
                .expect("execute");
            drain().await;
        })
        .await;
    assert_eq!(
        fx.host.events(),
        [HostEvent::ShowDocument(HistoryView::DEFAULT_URI)]
    );
    assert_eq!(fx.history.entries().len(), 7);
    assert!(!fx.history.loading_more());
    assert!(fx.history.is_exhausted());
}

#[tokio::test]
async fn failed_document_open_skips_cursor() {
    let fx = fixture(FakeGit::default().with_history(None, 2), scm_listing());
    fx.host.fail_documents.set(true);

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::VIEW_HISTORY, Vec::new())
                .expect("execute");
            drain().await;
        })
        .await;

    assert_eq!(
        fx.host.events(),
        [HostEvent::ShowDocument(HistoryView::DEFAULT_URI)]
    );
}

#[tokio::test]
async fn cancelled_or_blank_ref_input_updates_nothing() {
    let fx = fixture(FakeGit::default(), scm_listing());
    fx.host.input(None);
    fx.host.input(Some("   "));
    fx.host.input(Some("v1.0"));

    LocalSet::new()
        .run_until(async {
            for _ in 0..3 {
                fx.registry
                    .execute(ids::INPUT_REF, Vec::new())
                    .expect("execute");
                drain().await;
            }
        })
        .await;

    assert_eq!(fx.listing.updates(), ["v1.0"]);
    assert_eq!(
        fx.host.events(),
        vec![
            HostEvent::InputBox("Input a ref (sha1) to see its committed files");
            3
        ]
    );
}

#[tokio::test]
async fn selecting_a_branch_shows_its_history() {
    let git = FakeGit {
        refs: vec![
            GitRef::new("main", "c1", RefType::Head),
            GitRef::new("v1", "c2", RefType::Tag),
            GitRef::new("origin/main", "c3", RefType::RemoteHead),
        ],
        ..FakeGit::default()
    }
    .with_history(Some("v1"), 2);
    let fx = fixture(git, scm_listing());
    fx.host.pick(Some("v1"));

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::SELECT_BRANCH, Vec::new())
                .expect("execute");
            drain().await;
        })
        .await;

    assert_eq!(
        fx.host.events(),
        [
            HostEvent::QuickPick {
                labels: vec!["main".into(), "v1".into(), "origin/main".into()],
                descriptions: vec![
                    Some("c1".into()),
                    Some("Tag at c2".into()),
                    Some("Remote branch at c3".into()),
                ],
                placeholder: "Select a ref to see its history",
            },
            HostEvent::ShowDocument(HistoryView::DEFAULT_URI),
            HostEvent::CursorTop,
        ]
    );
    assert_eq!(fx.history.branch().as_deref(), Some("v1"));
    assert_eq!(*fx.git.log_calls.borrow(), [(Some("v1".to_owned()), 0, 3)]);
    assert_eq!(fx.history.entries().len(), 2);
}

#[tokio::test]
async fn cancelled_branch_pick_changes_nothing() {
    let git = FakeGit {
        refs: vec![GitRef::new("main", "c1", RefType::Head)],
        ..FakeGit::default()
    };
    let fx = fixture(git, scm_listing());
    fx.host.pick(None);

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::SELECT_BRANCH, Vec::new())
                .expect("execute");
            drain().await;
        })
        .await;

    assert_eq!(fx.host.events().len(), 1);
    assert_eq!(fx.history.branch(), None);
    assert!(fx.git.log_calls.borrow().is_empty());
}

#[tokio::test]
async fn handler_failure_does_not_break_later_commands() {
    let git = FakeGit {
        fail_refs: true,
        ..FakeGit::default()
    };
    let fx = fixture(git, scm_listing().showing("abc"));

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::SELECT_BRANCH, Vec::new())
                .expect("failure stays inside the handler");
            drain().await;
            fx.registry.execute(ids::CLEAR, Vec::new()).expect("execute");
            drain().await;
        })
        .await;

    assert!(fx.host.events().is_empty());
    assert_eq!(fx.listing.clears.get(), 1);
    assert_eq!(*fx.listing.reference.borrow(), None);
}

#[tokio::test]
async fn update_sha_and_switch_use_host_state() {
    let fx = fixture(FakeGit::default(), scm_listing());
    *fx.host.scm_input.borrow_mut() = "deadbeef".into();

    LocalSet::new()
        .run_until(async {
            fx.registry
                .execute(ids::UPDATE_SHA, Vec::new())
                .expect("execute");
            fx.registry.execute(ids::SWITCH, Vec::new()).expect("execute");
            drain().await;
        })
        .await;

    assert_eq!(fx.listing.updates(), ["deadbeef"]);
    assert_eq!(fx.host.events(), [HostEvent::SwitchScm(vec!["Git".into()])]);
}

#[tokio::test]
async fn view_pickers_write_settings() {
    let fx = fixture(FakeGit::default(), scm_listing());
    fx.host.pick(Some("Explorer"));
    fx.host.pick(Some("No"));
    fx.host.pick(None);

    LocalSet::new()
        .run_until(async {
            for id in [
                ids::SELECT_COMMITTED_FILES_VIEW,
                ids::SET_EXPLORER_VIEW_WITH_FOLDER,
                ids::SELECT_COMMITTED_FILES_VIEW,
            ] {
                fx.registry.execute(id, Vec::new()).expect("execute");
                drain().await;
            }
        })
        .await;

    let prefs = fx.settings.preferences();
    assert!(prefs.use_explorer);
    assert!(!prefs.with_folder);

    let events = fx.host.events();
    assert!(matches!(
        &events[0],
        HostEvent::QuickPick { labels, placeholder: "Select the committed files view", .. }
            if labels == &["Explorer", "SCM"]
    ));
    assert!(matches!(
        &events[1],
        HostEvent::QuickPick { labels, .. } if labels == &["Yes", "No"]
    ));
}
