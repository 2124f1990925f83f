use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use futures::future::{FutureExt, LocalBoxFuture};
use githd_core::{
    commands::{ids, CommandRegistry},
    config::SettingsStore,
    extension::Extension,
    git::GitService,
    history::HistoryView,
    host::{CommandArg, DiffOptions, Disposable, Host, QuickPickItem},
    repository::Repository,
    uri::DiffResource,
    CommittedFile, ListingSink, ListingView,
};
use githd_listing_api::ListingNode;
use similar::TextDiff;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  githd.<command> [ref]   run a githd command (the ref feeds githd.updateSha)
  more                    load the next page of history
  show <n>                list the files of history entry <n>
  open <n>                diff file <n> of the last printed listing
  set <key> <json>        change a setting, e.g. set githd.explorerView.withFolder false
  help                    print this message
  quit                    exit
an empty line cancels a prompt";

fn main() -> Result<()> {
    init_tracing();
    let options = Options::parse(std::env::args().skip(1))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(options))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("githd=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct Options {
    repository: Utf8PathBuf,
    settings: Option<Utf8PathBuf>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut repository = None;
        let mut settings = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => {
                    let path = args.next().context("--settings expects a path")?;
                    settings = Some(Utf8PathBuf::from(path));
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                _ if repository.is_none() => repository = Some(Utf8PathBuf::from(arg)),
                _ => bail!("unexpected argument {arg}"),
            }
        }
        Ok(Self {
            repository: repository.unwrap_or_else(|| Utf8PathBuf::from(".")),
            settings: settings.or_else(SettingsStore::default_path),
        })
    }
}

async fn run(options: Options) -> Result<()> {
    let service = GitService::open(&options.repository)
        .with_context(|| format!("failed to open repository at {}", options.repository))?;
    let repository = Repository::open(service.root())
        .with_context(|| format!("failed to open repository at {}", options.repository))?;

    let settings = Rc::new(match &options.settings {
        Some(path) => SettingsStore::load(path.clone())
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => SettingsStore::in_memory(),
    });

    let host = Rc::new(TerminalHost::new(repository));
    let registry = CommandRegistry::new();
    let extension = Extension::activate(
        Rc::clone(&host) as Rc<dyn Host>,
        Rc::new(service),
        &registry,
        Rc::clone(&settings),
        Rc::clone(&host) as Rc<dyn ListingSink>,
    )
    .context("failed to register commands")?;

    let history = Rc::downgrade(extension.history());
    let printer = Rc::clone(&host);
    extension
        .history()
        .on_did_change(move |content| printer.history_changed(&history, content));

    println!("githd: browsing {}", options.repository);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if host.answer(&line) {
            continue;
        }
        match Input::parse(&line) {
            Input::Quit => break,
            input => dispatch(input, &host, &registry, &extension, &settings),
        }
    }

    extension.dispose();
    Ok(())
}

enum Input<'a> {
    Empty,
    Help,
    Quit,
    More,
    Show(usize),
    Open(usize),
    Set(&'a str, &'a str),
    Command(&'a str, &'a str),
    Invalid(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match word {
            "" => Self::Empty,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "more" => Self::More,
            "show" => rest.parse().map_or(Self::Invalid(line), Self::Show),
            "open" => rest.parse().map_or(Self::Invalid(line), Self::Open),
            "set" => rest
                .split_once(' ')
                .map_or(Self::Invalid(line), |(key, value)| {
                    Self::Set(key, value.trim())
                }),
            id if id.starts_with("githd.") => Self::Command(id, rest),
            _ => Self::Invalid(line),
        }
    }
}

fn dispatch(
    input: Input<'_>,
    host: &Rc<TerminalHost>,
    registry: &Rc<CommandRegistry>,
    extension: &Extension,
    settings: &SettingsStore,
) {
    let outcome = match input {
        Input::Empty | Input::Quit => Ok(()),
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::More => {
            extension.history().load_more();
            Ok(())
        }
        Input::Show(index) => {
            let history = Rc::clone(extension.history());
            tokio::task::spawn_local(async move {
                match history.show_committed_files(index).await {
                    Ok(true) => {}
                    Ok(false) => println!("no history entry {index}"),
                    Err(err) => println!("failed to list files: {err}"),
                }
            });
            Ok(())
        }
        Input::Open(index) => match host.shown_file(index) {
            Some(file) => registry
                .execute(ids::OPEN_COMMITTED_FILE, vec![CommandArg::File(file)])
                .map_err(anyhow::Error::from),
            None => {
                println!("no committed file {index}");
                Ok(())
            }
        },
        Input::Set(key, value) => serde_json::from_str::<serde_json::Value>(value)
            .with_context(|| format!("`{value}` is not JSON"))
            .and_then(|value| settings.update(key, value).map_err(anyhow::Error::from)),
        Input::Command(id, argument) => {
            if !argument.is_empty() {
                host.set_scm_input(argument);
            }
            registry.execute(id, Vec::new()).map_err(anyhow::Error::from)
        }
        Input::Invalid(line) => {
            println!("unrecognised input `{line}`; type `help`");
            Ok(())
        }
    };
    if let Err(err) = outcome {
        println!("error: {err:#}");
    }
}

/// Line-oriented [`Host`] reading prompt answers from stdin.
struct TerminalHost {
    repository: Repository,
    scm_input: RefCell<String>,
    pending: RefCell<Option<oneshot::Sender<String>>>,
    document_open: Cell<bool>,
    // Files in the order and numbering of the last printed listing.
    shown: RefCell<Vec<CommittedFile>>,
}

impl TerminalHost {
    fn new(repository: Repository) -> Self {
        Self {
            repository,
            scm_input: RefCell::new(String::new()),
            pending: RefCell::new(None),
            document_open: Cell::new(false),
            shown: RefCell::new(Vec::new()),
        }
    }

    fn shown_file(&self, index: usize) -> Option<CommittedFile> {
        self.shown.borrow().get(index).cloned()
    }

    fn set_scm_input(&self, value: &str) {
        *self.scm_input.borrow_mut() = value.to_owned();
    }

    /// Hand `line` to an open prompt. Returns whether a prompt consumed it.
    fn answer(&self, line: &str) -> bool {
        let Some(sender) = self.pending.borrow_mut().take() else {
            return false;
        };
        sender.send(line.trim().to_owned()).is_ok()
    }

    async fn prompt(&self) -> Option<String> {
        let (sender, receiver) = oneshot::channel();
        if self.pending.replace(Some(sender)).is_some() {
            tracing::debug!("replacing an unanswered prompt");
        }
        let answer = receiver.await.ok()?;
        (!answer.is_empty()).then_some(answer)
    }

    fn history_changed(&self, history: &Weak<HistoryView>, content: &str) {
        let loading = history.upgrade().is_some_and(|history| history.is_loading());
        if self.document_open.get() && !loading {
            println!("{content}");
        }
    }

    fn read_side(&self, resource: &DiffResource) -> githd_core::Result<String> {
        let bytes = self.repository.resolve_resource(resource)?;
        Ok(bytes
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }
}

impl Host for TerminalHost {
    fn scm_input_value(&self) -> String {
        self.scm_input.borrow().clone()
    }

    fn show_quick_pick(
        &self,
        items: Vec<QuickPickItem>,
        placeholder: &'static str,
    ) -> LocalBoxFuture<'_, Option<QuickPickItem>> {
        async move {
            println!("{placeholder}:");
            for (index, item) in items.iter().enumerate() {
                match &item.description {
                    Some(description) => println!("  {index}) {}  {description}", item.label),
                    None => println!("  {index}) {}", item.label),
                }
            }
            let answer = self.prompt().await?;
            let picked = match answer.parse::<usize>() {
                Ok(index) => items.get(index).cloned(),
                Err(_) => items.iter().find(|item| item.label == answer).cloned(),
            };
            if picked.is_none() {
                println!("no such choice `{answer}`");
            }
            picked
        }
        .boxed_local()
    }

    fn show_input_box(&self, placeholder: &'static str) -> LocalBoxFuture<'_, Option<String>> {
        async move {
            println!("{placeholder}:");
            self.prompt().await
        }
        .boxed_local()
    }

    fn show_document(&self, uri: &'static str) -> LocalBoxFuture<'_, githd_core::Result<()>> {
        async move {
            tracing::debug!(uri, "showing document");
            self.document_open.set(true);
            Ok(())
        }
        .boxed_local()
    }

    fn cursor_top(&self) {
        tracing::debug!("cursor moved to the top of the history document");
    }

    fn open_diff(
        &self,
        left: DiffResource,
        right: DiffResource,
        title: String,
        options: DiffOptions,
    ) -> LocalBoxFuture<'_, githd_core::Result<()>> {
        async move {
            tracing::debug!(%title, preview = options.preview, "opening diff");
            let old = self.read_side(&left)?;
            let new = self.read_side(&right)?;
            let diff = TextDiff::from_lines(&old, &new);
            println!("=== {title}");
            print!(
                "{}",
                diff.unified_diff()
                    .context_radius(3)
                    .header(&left.to_string(), &right.to_string())
            );
            Ok(())
        }
        .boxed_local()
    }

    fn switch_scm(&self, providers: &'static [&'static str]) -> LocalBoxFuture<'_, githd_core::Result<()>> {
        async move {
            println!("source control switched to {}", providers.join(", "));
            Ok(())
        }
        .boxed_local()
    }
}

impl ListingSink for TerminalHost {
    fn listing_changed(&self, view: &ListingView) {
        let (text, shown) = render_listing(view);
        println!("{text}");
        *self.shown.borrow_mut() = shown;
    }
}

/// Render `view` with every file numbered for `open <n>`.
///
/// Returns the text and the files in numbering order.
fn render_listing(view: &ListingView) -> (String, Vec<CommittedFile>) {
    let mut lines = Vec::new();
    let mut shown = Vec::new();
    match view {
        ListingView::Empty => lines.push("committed files: (none)".to_owned()),
        ListingView::Flat { reference, files } => {
            lines.push(format!("committed files at {reference}:"));
            for file in files {
                lines.push(format!(
                    "  {}) {} {}",
                    shown.len(),
                    file.status.code(),
                    file.relative_path
                ));
                shown.push(file.clone());
            }
        }
        ListingView::Tree { reference, nodes } => {
            lines.push(format!("committed files at {reference}:"));
            render_nodes(nodes, 1, &mut lines, &mut shown);
        }
    }
    (lines.join("\n"), shown)
}

fn render_nodes(
    nodes: &[ListingNode],
    depth: usize,
    lines: &mut Vec<String>,
    shown: &mut Vec<CommittedFile>,
) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            ListingNode::Folder { name, children } => {
                lines.push(format!("{indent}{name}/"));
                render_nodes(children, depth + 1, lines, shown);
            }
            ListingNode::File { file } => {
                lines.push(format!(
                    "{indent}{}) {} {}",
                    shown.len(),
                    file.status.code(),
                    file.file_name()
                ));
                shown.push(file.clone());
            }
        }
    }
}
