//! Command-line front end: subcommands, prompts and printing.
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{instrument, warn};

use smm_console::activity::{self, FeedSource};
use smm_console::api::model::{Section, SectionUpdate};
use smm_console::api::{ConsoleApi, TaskBoardKind};
use smm_console::config::Config;
use smm_console::customers::{self, CustomerList, CustomerUpdate};
use smm_console::dashboard;
use smm_console::media::{self, MediaFilters, MediaGallery, MediaTab, SortBy};
use smm_console::model::{
    Customer, CustomerId, CustomerStatus, Media, MediaId, MediaType, NewCustomer, NewTask,
    NoteId, TaskId, TaskStatus,
};
use smm_console::notes::NoteList;
use smm_console::notify::{ConfirmRequest, Confirmer};
use smm_console::recycle_bin::RecycleBin;
use smm_console::scope::Scope;
use smm_console::services::Services;
use smm_console::session::SessionStore;
use smm_console::tasks::TaskBoard;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Customer list, details and editing
    Customers {
        #[command(subcommand)]
        action: CustomerCmd,
    },
    /// Remember a customer for later media commands
    Select {
        id: Option<CustomerId>,
        /// Forget the selected customer
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
    /// Media gallery of a customer
    Media {
        #[command(subcommand)]
        action: MediaCmd,
    },
    /// Dashboard stats, platforms and recent activity
    Dashboard,
    /// Soft-deleted customers
    RecycleBin {
        #[command(subcommand)]
        action: RecycleCmd,
    },
    /// Onboarding and AI-content task boards
    Tasks {
        #[command(subcommand)]
        action: TaskCmd,
    },
    /// Customer notes
    Notes {
        #[command(subcommand)]
        action: NoteCmd,
    },
    /// Activity feed
    Activity {
        #[arg(long)]
        customer: Option<CustomerId>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CustomerCmd {
    List {
        #[arg(long)]
        status: Option<CustomerStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: CustomerId,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "ACTIVE")]
        status: CustomerStatus,
        #[arg(long)]
        package: Option<String>,
    },
    Status {
        id: CustomerId,
        status: CustomerStatus,
    },
    /// Replace one section with the JSON payload in FILE
    Update {
        id: CustomerId,
        section: Section,
        file: PathBuf,
    },
    /// Move to the recycle bin
    Delete {
        id: CustomerId,
    },
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    #[arg(long, default_value = "ALL")]
    tab: MediaTab,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "date-desc")]
    sort: SortBy,
}

impl From<FilterArgs> for MediaFilters {
    fn from(args: FilterArgs) -> Self {
        MediaFilters {
            active_tab: args.tab,
            search_query: args.search,
            sort_by: args.sort,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct Selection {
    /// Media ids to act on
    ids: Vec<MediaId>,
    /// Act on everything visible under the filters instead of explicit ids
    #[arg(long, conflicts_with = "ids")]
    all_visible: bool,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Debug, Subcommand)]
pub enum MediaCmd {
    List {
        #[arg(long)]
        customer: Option<CustomerId>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    Upload {
        #[arg(long)]
        customer: Option<CustomerId>,
        /// Media type; guessed from the extension when omitted
        #[arg(long = "type")]
        media_type: Option<MediaType>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Delete {
        #[arg(long)]
        customer: Option<CustomerId>,
        #[command(flatten)]
        selection: Selection,
    },
    /// Download a ZIP of the selection
    Zip {
        #[arg(long)]
        customer: Option<CustomerId>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        selection: Selection,
    },
}

#[derive(Debug, Subcommand)]
pub enum RecycleCmd {
    List,
    Restore { id: CustomerId },
    /// Delete permanently
    Purge { id: CustomerId },
}

#[derive(Debug, Clone, Args)]
pub struct BoardArgs {
    customer: CustomerId,
    #[arg(long, default_value = "onboarding")]
    board: TaskBoardKind,
}

#[derive(Debug, Subcommand)]
pub enum TaskCmd {
    List {
        #[command(flatten)]
        board: BoardArgs,
    },
    Add {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        task_type: Option<String>,
        #[arg(long, default_value_t = 0)]
        total: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    Move {
        #[command(flatten)]
        board: BoardArgs,
        task: TaskId,
        status: TaskStatus,
    },
    Delete {
        #[command(flatten)]
        board: BoardArgs,
        task: TaskId,
    },
}

#[derive(Debug, Subcommand)]
pub enum NoteCmd {
    List { customer: CustomerId },
    Add { customer: CustomerId, text: String },
    Delete { customer: CustomerId, note: NoteId },
}

/// Asks on the terminal unless `--yes` was given.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfirmer {
    pub assume_yes: bool,
}

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!("{}: {} [y/N] ", request.title, request.message);
        let mut stderr = tokio::io::stderr();
        if stderr.write_all(prompt.as_bytes()).await.is_err() {
            return false;
        }
        let _ = stderr.flush().await;
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                warn!(?err, "could not read confirmation");
                false
            }
        }
    }
}

pub struct Console {
    pub cfg: Config,
    pub services: Services,
    pub session: SessionStore,
}

impl Console {
    async fn customer_or_selected(&self, customer: Option<CustomerId>) -> Result<CustomerId> {
        match customer {
            Some(id) => Ok(id),
            None => self.session.selected_customer().await.ok_or_else(|| {
                anyhow!("no customer given; pass --customer or run `select <id>` first")
            }),
        }
    }
}

#[instrument(skip_all)]
pub async fn run(ctx: &Console, command: Command) -> Result<()> {
    match command {
        Command::Customers { action } => run_customers(ctx, action).await,
        Command::Select { id, clear } => {
            if clear {
                ctx.session.clear().await?;
                println!("Selection cleared.");
                return Ok(());
            }
            match id {
                Some(id) => {
                    let customer = ctx
                        .services
                        .api
                        .get_customer(id)
                        .await
                        .with_context(|| format!("customer #{} not found", id))?;
                    ctx.session.select_customer(id).await?;
                    println!("Selected #{} {}", customer.id, customer.company_name);
                }
                None => match ctx.session.selected_customer().await {
                    Some(id) => println!("Selected customer: #{}", id),
                    None => println!("No customer selected."),
                },
            }
            Ok(())
        }
        Command::Media { action } => run_media(ctx, action).await,
        Command::Dashboard => {
            let scope = Scope::new();
            let board = dashboard::load(&ctx.services, &scope, ctx.cfg.app.recent_activity_limit)
                .await
                .context("failed to load dashboard")?;
            if let Some(stats) = &board.stats {
                println!(
                    "Customers: {} ({} active)  Media: {}  Tasks: {} pending / {} completed",
                    stats.total_customers,
                    stats.active_customers,
                    stats.total_media,
                    stats.pending_tasks,
                    stats.completed_tasks
                );
            }
            if let Some(b) = &board.status_breakdown {
                println!(
                    "Status: {} active, {} passive, {} cancelled",
                    b.active, b.passive, b.cancelled
                );
            }
            if !board.platforms.is_empty() {
                println!("Platforms:");
                for p in &board.platforms {
                    println!("  {:<12} {}", p.platform, p.count);
                }
            }
            print_activity(&board.recent_activity);
            for issue in &board.issues {
                eprintln!("! {} unavailable: {}", issue.part, issue.message);
            }
            Ok(())
        }
        Command::RecycleBin { action } => {
            let mut bin = RecycleBin::new(ctx.services.clone());
            bin.load().await.context("failed to load recycle bin")?;
            match action {
                RecycleCmd::List => {
                    for c in bin.customers() {
                        let when = c
                            .deleted_at
                            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("#{:<5} {:<30} deleted {}", c.id, c.company_name, when);
                    }
                    if bin.customers().is_empty() {
                        println!("Recycle bin is empty.");
                    }
                }
                RecycleCmd::Restore { id } => bin.restore(id).await?,
                RecycleCmd::Purge { id } => {
                    if !bin.purge(id).await? {
                        println!("Cancelled.");
                    }
                }
            }
            Ok(())
        }
        Command::Tasks { action } => run_tasks(ctx, action).await,
        Command::Notes { action } => {
            let customer = match &action {
                NoteCmd::List { customer }
                | NoteCmd::Add { customer, .. }
                | NoteCmd::Delete { customer, .. } => *customer,
            };
            let mut notes = NoteList::new(ctx.services.clone(), customer);
            match action {
                NoteCmd::List { .. } => notes.load().await?,
                NoteCmd::Add { text, .. } => {
                    notes.add(&text).await?;
                }
                NoteCmd::Delete { note, .. } => notes.delete(note).await?,
            }
            for n in notes.notes() {
                println!(
                    "#{:<5} {} {}: {}",
                    n.id,
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.created_by.as_deref().unwrap_or("-"),
                    n.note
                );
            }
            Ok(())
        }
        Command::Activity { customer, limit } => {
            let source = customer.map_or(FeedSource::Global, FeedSource::Customer);
            let limit = limit.unwrap_or(ctx.cfg.app.recent_activity_limit);
            let feed = activity::load_feed(&ctx.services, &Scope::new(), source, limit).await?;
            print_activity(&feed);
            Ok(())
        }
    }
}

async fn run_customers(ctx: &Console, action: CustomerCmd) -> Result<()> {
    match action {
        CustomerCmd::List { status, search } => {
            let mut list = CustomerList::new(ctx.services.clone());
            list.set_status_filter(status);
            list.set_search(search.unwrap_or_default());
            list.load().await.context("failed to load customers")?;
            for c in list.visible() {
                print_customer_row(c);
            }
            let b = list.breakdown();
            println!(
                "{} customer(s): {} active, {} passive, {} cancelled",
                b.total(),
                b.active,
                b.passive,
                b.cancelled
            );
        }
        CustomerCmd::Show { id } => {
            let overview = customers::load_overview(&ctx.services, &Scope::new(), id)
                .await
                .with_context(|| format!("failed to load customer #{}", id))?;
            let c = &overview.customer;
            print_customer_row(c);
            for contact in &c.contacts {
                println!(
                    "  contact: {} {} <{}> {}",
                    contact.name,
                    contact.surname,
                    contact.email.as_deref().unwrap_or("-"),
                    contact.phone.as_deref().unwrap_or("")
                );
            }
            let social = &c.social_media;
            println!(
                "  instagram: {}  facebook: {}  tiktok: {}",
                social.instagram.as_deref().unwrap_or("-"),
                social.facebook.as_deref().unwrap_or("-"),
                social.tiktok.as_deref().unwrap_or("-")
            );
            println!(
                "  media: {}  notes: {}  onboarding: {}%  ai: {}%",
                c.media.len(),
                overview.notes.len(),
                smm_console::tasks::completion_percent(&overview.onboarding_tasks),
                smm_console::tasks::completion_percent(&overview.ai_tasks)
            );
            print_activity(&overview.activities);
        }
        CustomerCmd::Create {
            name,
            sector,
            address,
            status,
            package,
        } => {
            let mut list = CustomerList::new(ctx.services.clone());
            let created = list
                .create(NewCustomer {
                    company_name: name,
                    sector,
                    address,
                    status,
                    membership_package: package,
                    contacts: Vec::new(),
                })
                .await?;
            print_customer_row(&created);
        }
        CustomerCmd::Status { id, status } => {
            let mut list = CustomerList::new(ctx.services.clone());
            list.change_status(id, status).await?;
        }
        CustomerCmd::Update { id, section, file } => {
            let raw = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_slice(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let update = SectionUpdate::from_json(section, value)?;
            let mut editor = CustomerUpdate::new(ctx.services.clone(), id);
            editor.load().await?;
            let customer = editor.save(update).await?;
            print_customer_row(customer);
        }
        CustomerCmd::Delete { id } => {
            let mut list = CustomerList::new(ctx.services.clone());
            list.load().await?;
            if !list.soft_delete(id).await? {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

/// Apply an explicit id list or "select all visible" to a loaded gallery.
fn apply_selection(gallery: &mut MediaGallery, selection: Selection) -> Result<()> {
    gallery.set_filters(selection.filters.into());
    if selection.all_visible {
        gallery.toggle_select_all();
    } else {
        if selection.ids.is_empty() {
            bail!("give media ids or --all-visible");
        }
        for id in &selection.ids {
            if gallery.all_media().iter().any(|m| m.id == *id) {
                gallery.toggle(*id);
            } else {
                warn!(media_id = id, "unknown media id ignored");
            }
        }
    }
    if gallery.selection().is_empty() {
        bail!("selection is empty");
    }
    Ok(())
}

async fn run_media(ctx: &Console, action: MediaCmd) -> Result<()> {
    let mut gallery = MediaGallery::new(ctx.services.clone(), ctx.cfg.app.bulk_concurrency);
    match action {
        MediaCmd::List { customer, filters } => {
            let id = ctx.customer_or_selected(customer).await?;
            gallery.load(id).await.context("failed to load media")?;
            gallery.set_filters(filters.into());
            let counts = gallery.tab_counts();
            println!(
                "ALL {}  LOGO {}  PHOTO {}  VIDEO {}  DOCUMENT {}",
                counts.all, counts.logo, counts.photo, counts.video, counts.document
            );
            for m in gallery.filtered() {
                print_media_row(m);
            }
        }
        MediaCmd::Upload {
            customer,
            media_type,
            files,
        } => {
            let id = ctx.customer_or_selected(customer).await?;
            let uploads =
                media::prepare_uploads(&files, media_type, ctx.cfg.app.max_upload_bytes).await?;
            gallery.load(id).await?;
            for m in gallery.upload(&uploads).await? {
                print_media_row(&m);
            }
        }
        MediaCmd::Delete {
            customer,
            selection,
        } => {
            let id = ctx.customer_or_selected(customer).await?;
            gallery.load(id).await?;
            apply_selection(&mut gallery, selection)?;
            match gallery.delete_selected().await? {
                None => println!("Cancelled."),
                Some(report) => {
                    println!("Deleted: {:?}", report.succeeded);
                    for failure in &report.failed {
                        eprintln!("Failed #{}: {}", failure.id, failure.error);
                    }
                    if !report.is_complete_success() {
                        bail!("{} of {} deletes failed", report.failed.len(), report.total());
                    }
                }
            }
        }
        MediaCmd::Zip {
            customer,
            out,
            selection,
        } => {
            let id = ctx.customer_or_selected(customer).await?;
            gallery.load(id).await?;
            apply_selection(&mut gallery, selection)?;
            let dir = out.unwrap_or_else(|| PathBuf::from(&ctx.cfg.app.download_dir));
            let path = gallery.download_selected(Path::new(&dir)).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn run_tasks(ctx: &Console, action: TaskCmd) -> Result<()> {
    let args = match &action {
        TaskCmd::List { board }
        | TaskCmd::Add { board, .. }
        | TaskCmd::Move { board, .. }
        | TaskCmd::Delete { board, .. } => board.clone(),
    };
    let mut board = TaskBoard::new(ctx.services.clone(), args.board, args.customer);
    board.load().await?;
    match action {
        TaskCmd::List { .. } => {}
        TaskCmd::Add {
            name,
            task_type,
            total,
            notes,
            ..
        } => {
            board
                .create(NewTask {
                    task_name: name,
                    task_type,
                    progress_total: total,
                    notes,
                })
                .await?;
        }
        TaskCmd::Move { task, status, .. } => board.move_task(task, status).await?,
        TaskCmd::Delete { task, .. } => {
            if !board.delete(task).await? {
                println!("Cancelled.");
            }
        }
    }
    println!("{} board: {}% complete", board.kind(), board.completion_percent());
    for column in board.columns() {
        println!("{} ({})", column.status, column.tasks.len());
        for t in column.tasks {
            println!(
                "  #{:<5} {:<30} {:>3}%",
                t.id,
                t.task_name,
                t.progress_percent()
            );
        }
    }
    Ok(())
}

fn print_customer_row(c: &Customer) {
    println!(
        "#{:<5} {:<30} {:<10} {:<16} {}",
        c.id,
        c.company_name,
        c.status,
        c.sector.as_deref().unwrap_or("-"),
        c.membership_package.as_deref().unwrap_or("-")
    );
}

fn print_media_row(m: &Media) {
    println!(
        "#{:<6} {:<9} {:>10} {} {}",
        m.id,
        m.media_type,
        human_size(m.file_size),
        m.uploaded_at.format("%Y-%m-%d %H:%M"),
        m.original_file_name
    );
}

fn print_activity(feed: &[smm_console::model::Activity]) {
    if feed.is_empty() {
        return;
    }
    println!("Recent activity:");
    for a in feed {
        println!(
            "  {} [{}] {}",
            a.timestamp.format("%Y-%m-%d %H:%M"),
            activity::label(a),
            a.message
        );
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
