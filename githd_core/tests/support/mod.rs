#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use githd_core::host::{DiffOptions, Host, QuickPickItem};
use githd_core::uri::DiffResource;
use githd_core::{
    CommittedFile, FileListing, FileStatus, GitQuery, GitRef, ListingKind, ListingSink,
    ListingView, LogEntry, Result,
};
use githd_listing_api::{QueryError, QueryResult};

/// Let spawned local tasks run to completion.
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    QuickPick {
        labels: Vec<String>,
        descriptions: Vec<Option<String>>,
        placeholder: &'static str,
    },
    InputBox(&'static str),
    ShowDocument(&'static str),
    CursorTop,
    OpenDiff {
        left: DiffResource,
        right: DiffResource,
        title: String,
        options: DiffOptions,
    },
    SwitchScm(Vec<String>),
}

/// Host answering prompts from scripted queues and recording every request.
#[derive(Default)]
pub struct FakeHost {
    pub scm_input: RefCell<String>,
    pub picks: RefCell<VecDeque<Option<String>>>,
    pub inputs: RefCell<VecDeque<Option<String>>>,
    pub events: RefCell<Vec<HostEvent>>,
    pub fail_documents: Cell<bool>,
}

impl FakeHost {
    pub fn pick(&self, label: Option<&str>) {
        self.picks.borrow_mut().push_back(label.map(str::to_owned));
    }

    pub fn input(&self, value: Option<&str>) {
        self.inputs.borrow_mut().push_back(value.map(str::to_owned));
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    fn record(&self, event: HostEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Host for FakeHost {
    fn scm_input_value(&self) -> String {
        self.scm_input.borrow().clone()
    }

    fn show_quick_pick(
        &self,
        items: Vec<QuickPickItem>,
        placeholder: &'static str,
    ) -> LocalBoxFuture<'_, Option<QuickPickItem>> {
        self.record(HostEvent::QuickPick {
            labels: items.iter().map(|item| item.label.clone()).collect(),
            descriptions: items.iter().map(|item| item.description.clone()).collect(),
            placeholder,
        });
        let answer = self.picks.borrow_mut().pop_front().flatten();
        let picked = answer.and_then(|label| items.into_iter().find(|item| item.label == label));
        future::ready(picked).boxed_local()
    }

    fn show_input_box(&self, placeholder: &'static str) -> LocalBoxFuture<'_, Option<String>> {
        self.record(HostEvent::InputBox(placeholder));
        let answer = self.inputs.borrow_mut().pop_front().flatten();
        future::ready(answer).boxed_local()
    }

    fn show_document(&self, uri: &'static str) -> LocalBoxFuture<'_, Result<()>> {
        self.record(HostEvent::ShowDocument(uri));
        let result = if self.fail_documents.get() {
            Err(githd_core::Error::host("document unavailable"))
        } else {
            Ok(())
        };
        future::ready(result).boxed_local()
    }

    fn cursor_top(&self) {
        self.record(HostEvent::CursorTop);
    }

    fn open_diff(
        &self,
        left: DiffResource,
        right: DiffResource,
        title: String,
        options: DiffOptions,
    ) -> LocalBoxFuture<'_, Result<()>> {
        self.record(HostEvent::OpenDiff {
            left,
            right,
            title,
            options,
        });
        future::ready(Ok(())).boxed_local()
    }

    fn switch_scm(&self, providers: &'static [&'static str]) -> LocalBoxFuture<'_, Result<()>> {
        self.record(HostEvent::SwitchScm(
            providers.iter().map(|provider| (*provider).to_owned()).collect(),
        ));
        future::ready(Ok(())).boxed_local()
    }
}

/// In-memory git facade.
#[derive(Default)]
pub struct FakeGit {
    pub refs: Vec<GitRef>,
    pub files: HashMap<String, Vec<CommittedFile>>,
    pub history: HashMap<Option<String>, Vec<LogEntry>>,
    pub fail_refs: bool,
    pub log_calls: RefCell<Vec<(Option<String>, usize, usize)>>,
}

impl FakeGit {
    pub fn with_files(mut self, reference: &str, paths: &[&str]) -> Self {
        self.files.insert(
            reference.to_owned(),
            paths
                .iter()
                .map(|path| CommittedFile::new(format!("/repo/{path}"), *path, FileStatus::Modified))
                .collect(),
        );
        self
    }

    pub fn with_history(mut self, branch: Option<&str>, count: usize) -> Self {
        let label = branch.unwrap_or("HEAD");
        let entries = (0..count)
            .map(|index| LogEntry {
                sha: format!("{label}-{index:04}"),
                subject: format!("commit {index} on {label}"),
                author: "Test User".into(),
                email: Some("test@example.com".into()),
                timestamp: 1_700_000_000 - i64::try_from(index).unwrap_or_default(),
            })
            .collect();
        self.history.insert(branch.map(str::to_owned), entries);
        self
    }
}

impl GitQuery for FakeGit {
    fn refs(&self) -> LocalBoxFuture<'_, QueryResult<Vec<GitRef>>> {
        let result = if self.fail_refs {
            Err(QueryError::message("repository unavailable"))
        } else {
            Ok(self.refs.clone())
        };
        future::ready(result).boxed_local()
    }

    fn committed_files<'a>(
        &'a self,
        reference: &'a str,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<CommittedFile>>> {
        let result = self
            .files
            .get(reference)
            .cloned()
            .ok_or_else(|| QueryError::UnknownRef {
                reference: reference.to_owned(),
            });
        future::ready(result).boxed_local()
    }

    fn log<'a>(
        &'a self,
        branch: Option<&'a str>,
        skip: usize,
        count: usize,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<LogEntry>>> {
        self.log_calls
            .borrow_mut()
            .push((branch.map(str::to_owned), skip, count));
        let page = self
            .history
            .get(&branch.map(str::to_owned))
            .map(|entries| entries.iter().skip(skip).take(count).cloned().collect())
            .unwrap_or_default();
        future::ready(Ok(page)).boxed_local()
    }
}

/// Listing recording every call instead of querying git.
pub struct FakeListing {
    pub kind: ListingKind,
    pub with_folder: Cell<bool>,
    pub reference: RefCell<Option<String>>,
    pub updates: RefCell<Vec<String>>,
    pub clears: Cell<usize>,
    pub disposed: Cell<bool>,
}

impl FakeListing {
    pub fn new(kind: ListingKind, with_folder: bool) -> Rc<Self> {
        Rc::new(Self {
            kind,
            with_folder: Cell::new(with_folder),
            reference: RefCell::new(None),
            updates: RefCell::new(Vec::new()),
            clears: Cell::new(0),
            disposed: Cell::new(false),
        })
    }

    pub fn showing(self: Rc<Self>, reference: &str) -> Rc<Self> {
        *self.reference.borrow_mut() = Some(reference.to_owned());
        self
    }

    pub fn updates(&self) -> Vec<String> {
        self.updates.borrow().clone()
    }
}

impl FileListing for FakeListing {
    fn kind(&self) -> ListingKind {
        self.kind
    }

    fn update<'a>(&'a self, reference: &'a str) -> LocalBoxFuture<'a, QueryResult<()>> {
        self.updates.borrow_mut().push(reference.to_owned());
        if !self.disposed.get() {
            *self.reference.borrow_mut() =
                Some(reference.to_owned()).filter(|reference| !reference.is_empty());
        }
        future::ready(Ok(())).boxed_local()
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
        *self.reference.borrow_mut() = None;
    }

    fn current_ref(&self) -> Option<String> {
        self.reference.borrow().clone()
    }

    fn files(&self) -> Vec<CommittedFile> {
        Vec::new()
    }

    fn view(&self) -> ListingView {
        ListingView::Empty
    }

    fn dispose(&self) {
        self.disposed.set(true);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn supports_folder_grouping(&self) -> bool {
        self.kind == ListingKind::Explorer
    }

    fn set_with_folder(&self, with_folder: bool) {
        self.with_folder.set(with_folder);
    }
}

/// Sink keeping every published view.
#[derive(Default)]
pub struct RecordingSink {
    pub views: RefCell<Vec<ListingView>>,
}

impl RecordingSink {
    pub fn last(&self) -> Option<ListingView> {
        self.views.borrow().last().cloned()
    }
}

impl ListingSink for RecordingSink {
    fn listing_changed(&self, view: &ListingView) {
        self.views.borrow_mut().push(view.clone());
    }
}
