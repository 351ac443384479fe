use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::api::Order;

#[derive(Debug, Args)]
#[group(id = "target", required = true, multiple = false)]
pub struct LocationArgs {
    #[arg(long, help = "Parent block or page uid.")]
    pub parent: Option<String>,

    #[arg(long, help = "Page title (created if missing).")]
    pub page: Option<String>,

    #[arg(
        long,
        value_name = "DATE",
        help = "Daily note date (MM-DD-YYYY or YYYY-MM-DD)."
    )]
    pub daily_note: Option<String>,

    #[arg(long, help = "Today's daily note.")]
    pub today: bool,
}

#[derive(Debug, Args)]
pub struct BlockOptionArgs {
    #[arg(long = "uid", value_name = "UID", help = "Explicit uid for the new block.")]
    pub explicit_uid: Option<String>,

    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(0..=3),
        help = "Heading level (0 clears)."
    )]
    pub heading: Option<u8>,

    #[arg(long, conflicts_with = "collapsed", help = "Expand the block.")]
    pub open: bool,

    #[arg(long, help = "Collapse the block.")]
    pub collapsed: bool,

    #[arg(long, help = "Text alignment: left, center, right, or justify.")]
    pub text_align: Option<String>,

    #[arg(long, help = "Children view: bullet, numbered, or document.")]
    pub children_view_type: Option<String>,

    #[arg(long, help = "Block view: outline, horizontal, popout, tabs, ...")]
    pub block_view_type: Option<String>,

    #[arg(long, help = "Block props as a JSON object.")]
    pub props: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Page commands.")]
pub struct PageArgs {
    #[command(subcommand)]
    pub command: PageSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum PageSubcommands {
    #[command(about = "Show a page and its blocks.")]
    Get(PageGetArgs),
    #[command(about = "Create a page.")]
    Create(PageCreateArgs),
    #[command(about = "Rename a page or change its view.")]
    Update(PageUpdateArgs),
    #[command(about = "Delete a page.")]
    Delete(UidArgs),
    #[command(about = "List pages.")]
    List(PageListArgs),
}

#[derive(Debug, Args)]
pub struct PageGetArgs {
    #[arg(help = "Page title.")]
    pub title: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PageCreateArgs {
    #[arg(help = "Page title.")]
    pub title: String,

    #[arg(long, help = "Explicit uid for the new page.")]
    pub uid: Option<String>,

    #[arg(long, help = "Children view: bullet, numbered, or document.")]
    pub children_view_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct PageUpdateArgs {
    #[arg(help = "Page uid.")]
    pub uid: String,

    #[arg(long, help = "New title.")]
    pub title: Option<String>,

    #[arg(long, help = "Children view: bullet, numbered, or document.")]
    pub children_view_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct PageListArgs {
    #[arg(long, help = "Only pages edited today.")]
    pub today: bool,

    #[arg(
        short = 'n',
        long,
        default_value_t = 0,
        help = "Maximum results (0 for all)."
    )]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct UidArgs {
    #[arg(help = "Entity uid.")]
    pub uid: String,
}

#[derive(Debug, Args)]
#[command(about = "Block commands.")]
pub struct BlockArgs {
    #[command(subcommand)]
    pub command: BlockSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum BlockSubcommands {
    #[command(about = "Show a block and its children.")]
    Get(BlockGetArgs),
    #[command(about = "Create a block.")]
    Create(BlockCreateArgs),
    #[command(about = "Edit a block's text or properties.")]
    Update(BlockUpdateArgs),
    #[command(about = "Move a block.")]
    Move(BlockMoveArgs),
    #[command(about = "Delete a block and its children.")]
    Delete(UidArgs),
}

#[derive(Debug, Args)]
pub struct BlockGetArgs {
    #[arg(help = "Block uid.")]
    pub uid: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct BlockCreateArgs {
    #[arg(help = "Block text.")]
    pub content: String,

    #[command(flatten)]
    pub location: LocationArgs,

    #[arg(short = 'o', long, default_value = "last", help = "Position: first, last, or an index.")]
    pub order: Order,

    #[command(flatten)]
    pub options: BlockOptionArgs,
}

#[derive(Debug, Args)]
pub struct BlockUpdateArgs {
    #[arg(help = "Block uid.")]
    pub uid: String,

    #[arg(help = "New block text (unchanged when omitted).")]
    pub content: Option<String>,

    #[command(flatten)]
    pub options: BlockOptionArgs,
}

#[derive(Debug, Args)]
pub struct BlockMoveArgs {
    #[arg(help = "Block uid.")]
    pub uid: String,

    #[command(flatten)]
    pub location: LocationArgs,

    #[arg(short = 'o', long, default_value = "last", help = "Position: first, last, or an index.")]
    pub order: Order,
}

#[derive(Debug, Args)]
#[command(about = "Daily note commands.")]
pub struct DailyArgs {
    #[command(subcommand)]
    pub command: DailySubcommands,
}

#[derive(Debug, Subcommand)]
pub enum DailySubcommands {
    #[command(about = "Add a block to a daily note.")]
    Add(DailyAddArgs),
    #[command(about = "Show a daily note.")]
    Get(DailyGetArgs),
}

#[derive(Debug, Args)]
pub struct DailyAddArgs {
    #[arg(help = "Block text.")]
    pub text: String,

    #[arg(short = 'd', long, help = "Date (MM-DD-YYYY or YYYY-MM-DD); today when omitted.")]
    pub date: Option<String>,

    #[arg(short = 'o', long, default_value = "last", help = "Position: first, last, or an index.")]
    pub order: Order,
}

#[derive(Debug, Args)]
pub struct DailyGetArgs {
    #[arg(short = 'd', long, help = "Date (MM-DD-YYYY or YYYY-MM-DD); today when omitted.")]
    pub date: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(
    about = "Local API commands.",
    long_about = "Actions only the desktop app's Local API supports. Requires --local or mode = encrypted."
)]
pub struct LocalArgs {
    #[command(subcommand)]
    pub command: LocalSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum LocalSubcommands {
    #[command(about = "Undo the last change.")]
    Undo,
    #[command(about = "Redo the last undone change.")]
    Redo,
    #[command(about = "Set the order of a parent's children.")]
    Reorder(ReorderArgs),
    #[command(about = "Add a page to the left sidebar shortcuts.")]
    ShortcutAdd(ShortcutAddArgs),
    #[command(about = "Remove a page from the shortcuts.")]
    ShortcutRemove(UidArgs),
    #[command(about = "Upload a file and print its URL.")]
    Upload(UploadArgs),
    #[command(about = "Download a hosted file.")]
    Download(DownloadArgs),
    #[command(about = "Delete a hosted file.")]
    DeleteFile(UrlArgs),
    #[command(about = "Create or rename a user.")]
    UserUpsert(UserUpsertArgs),
    #[command(about = "Full-text search as the app's search box does it.")]
    Search(LocalSearchArgs),
    #[command(about = "Send any Local API action.")]
    Call(CallArgs),
}

#[derive(Debug, Args)]
pub struct ReorderArgs {
    #[arg(help = "Parent uid.")]
    pub parent: String,

    #[arg(required = true, help = "Child uids in their new order.")]
    pub uids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShortcutAddArgs {
    #[arg(help = "Page uid.")]
    pub uid: String,

    #[arg(short = 'i', long, help = "Position in the shortcut list.")]
    pub index: Option<u32>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(help = "File to upload.")]
    pub path: PathBuf,

    #[arg(long, help = "File name to store (defaults to the path's name).")]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[arg(help = "Hosted file URL.")]
    pub url: String,

    #[arg(short = 'o', long, help = "Write to this path instead of stdout.")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UrlArgs {
    #[arg(help = "Hosted file URL.")]
    pub url: String,
}

#[derive(Debug, Args)]
pub struct UserUpsertArgs {
    #[arg(help = "User uid.")]
    pub uid: String,

    #[arg(long, help = "Display name.")]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct LocalSearchArgs {
    #[arg(help = "Search text.")]
    pub text: String,

    #[arg(short = 'n', long, help = "Maximum results.")]
    pub limit: Option<usize>,

    #[arg(long, help = "Skip block matches.")]
    pub no_blocks: bool,

    #[arg(long, help = "Skip page matches.")]
    pub no_pages: bool,

    #[arg(long, help = "Ignore code blocks.")]
    pub hide_code_blocks: bool,

    #[arg(short = 'p', long, help = "Pull selector applied to each hit.")]
    pub pull: Option<String>,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    #[arg(help = "Action name, e.g. data.q.")]
    pub action: String,

    #[arg(short = 'a', long, help = "Arguments as a JSON array.")]
    pub args: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Config commands.")]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommands {
    #[command(about = "Print the config (token masked).")]
    Show,
    #[command(about = "Print the config file path.")]
    Path,
    #[command(about = "Set a key.")]
    Set(ConfigSetArgs),
    #[command(about = "Remove a key.")]
    Unset(ConfigKeyArgs),
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    #[arg(help = "Key: base_url, graph_name, token, mode, timeout_secs, output_format.")]
    pub key: String,

    #[arg(help = "Value.")]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct ConfigKeyArgs {
    #[arg(help = "Key to remove.")]
    pub key: String,
}
