use serde_json::{json, Map, Value};

use crate::api::{
    self, AppendLocation, BatchBuilder, BlockOptions, Client, Location, Order, PageOptions,
    RoamApi,
};
use crate::app::{AppError, Session};
use crate::cli::{
    AppendArgs, BatchArgs, BlockArgs, BlockOptionArgs, BlockSubcommands, Commands, DailyArgs,
    DailySubcommands, LocationArgs, PageArgs, PageSubcommands,
};
use crate::roamdb::{self, daily};
use crate::{parse_json_array, print_json, read_input, ui};

/// Runs a command that needs a connected graph.
pub(crate) fn run_graph_command(
    command: Commands,
    client: &Client,
    prefers_json: bool,
) -> Result<(), AppError> {
    let api = client.api();
    match command {
        Commands::Query(args) => {
            let inputs = match args.args.as_deref() {
                Some(raw) => parse_json_array(raw, "--args")?,
                None => Vec::new(),
            };
            print_json(&api.query(&args.query, &inputs)?);
        }
        Commands::Pull(args) => {
            let eid = entity_id(&args.eid)?;
            print_json(&api.pull(&eid, &args.pattern)?);
        }
        Commands::PullMany(args) => {
            let eids = args
                .eids
                .iter()
                .map(|raw| entity_id(raw))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&api.pull_many(&eids, &args.pattern)?);
        }
        Commands::Page(args) => run_page(&args, client, prefers_json)?,
        Commands::Block(args) => run_block(&args, client, prefers_json)?,
        Commands::Search(args) => print_json(&api.search_blocks(&args.text, args.limit)?),
        Commands::Daily(args) => run_daily(&args, client, prefers_json)?,
        Commands::Batch(args) => {
            let batch = load_batch(&args)?;
            if batch.is_empty() {
                return Err(AppError::InvalidArgument("batch has no actions".to_string()));
            }
            api.execute_batch(&batch)?;
            print_json(&json!({"success": true, "actions": batch.len()}));
        }
        Commands::Append(_) | Commands::Local(_) | Commands::Config(_) | Commands::Completions(_) => {
            return Err(AppError::InvalidArgument(
                "command does not run against a graph connection".to_string(),
            ))
        }
    }
    Ok(())
}

fn run_page(args: &PageArgs, client: &Client, prefers_json: bool) -> Result<(), AppError> {
    let api = client.api();
    match &args.command {
        PageSubcommands::Get(get) => {
            let raw = api.get_page_by_title(&get.title)?;
            show_page(&raw, get.json || prefers_json)?;
        }
        PageSubcommands::Create(create) => {
            let opts = PageOptions {
                title: create.title.clone(),
                uid: create.uid.clone(),
                children_view_type: create.children_view_type.clone(),
            };
            let uid = match client.as_local() {
                Some(local) => Some(local.create_page_and_get_uid(&opts)?),
                None => {
                    api.create_page_with_options(&opts)?;
                    opts.uid.clone()
                }
            };
            print_json(&written(&[("title", Some(opts.title.clone())), ("uid", uid)]));
        }
        PageSubcommands::Update(update) => {
            let opts = PageOptions {
                title: update.title.clone().unwrap_or_default(),
                uid: None,
                children_view_type: update.children_view_type.clone(),
            };
            if opts == PageOptions::default() {
                return Err(AppError::InvalidArgument(
                    "nothing to update; pass --title or --children-view-type".to_string(),
                ));
            }
            api.update_page_with_options(&update.uid, &opts)?;
            print_json(&written(&[("uid", Some(update.uid.clone()))]));
        }
        PageSubcommands::Delete(delete) => {
            api.delete_page(&delete.uid)?;
            print_json(&written(&[("uid", Some(delete.uid.clone()))]));
        }
        PageSubcommands::List(list) => print_json(&api.list_pages(list.today, list.limit)?),
    }
    Ok(())
}

fn run_block(args: &BlockArgs, client: &Client, prefers_json: bool) -> Result<(), AppError> {
    let api = client.api();
    match &args.command {
        BlockSubcommands::Get(get) => {
            let raw = api.get_block_by_uid(&get.uid)?;
            if get.json || prefers_json {
                print_json(&raw);
            } else {
                ui::print_block(&roamdb::parse_block(&raw)?);
            }
        }
        BlockSubcommands::Create(create) => {
            let location = location_from_args(&create.location, create.order)?;
            let opts = block_options(&create.content, &create.options)?;
            let uid = create_block(client, &location, &opts)?;
            print_json(&written(&[("uid", uid)]));
        }
        BlockSubcommands::Update(update) => {
            let mut opts = block_options(
                update.content.as_deref().unwrap_or_default(),
                &update.options,
            )?;
            opts.uid = None;
            if opts == BlockOptions::default() {
                return Err(AppError::InvalidArgument(
                    "nothing to update; pass new content or a block option".to_string(),
                ));
            }
            api.update_block_with_options(&update.uid, &opts)?;
            print_json(&written(&[("uid", Some(update.uid.clone()))]));
        }
        BlockSubcommands::Move(mv) => {
            let location = location_from_args(&mv.location, mv.order)?;
            api.move_block_to_location(&mv.uid, &location)?;
            print_json(&written(&[("uid", Some(mv.uid.clone()))]));
        }
        BlockSubcommands::Delete(delete) => {
            api.delete_block(&delete.uid)?;
            print_json(&written(&[("uid", Some(delete.uid.clone()))]));
        }
    }
    Ok(())
}

fn run_daily(args: &DailyArgs, client: &Client, prefers_json: bool) -> Result<(), AppError> {
    match &args.command {
        DailySubcommands::Add(add) => {
            let date = daily_date(add.date.as_deref())?;
            let location = Location::daily_note(wire_date(date)?).with_order(add.order);
            let uid = create_block(client, &location, &BlockOptions::with_content(&add.text))?;
            print_json(&written(&[
                ("page", Some(daily::daily_note_title(date))),
                ("uid", uid),
            ]));
        }
        DailySubcommands::Get(get) => {
            let title = daily::daily_note_title(daily_date(get.date.as_deref())?);
            let raw = client.api().get_page_by_title(&title)?;
            show_page(&raw, get.json || prefers_json)?;
        }
    }
    Ok(())
}

/// Parses and plans a batch without connecting.
pub(crate) fn dry_run_batch(args: &BatchArgs) -> Result<(), AppError> {
    let batch = load_batch(args)?;
    print_json(&batch.build());
    Ok(())
}

fn load_batch(args: &BatchArgs) -> Result<BatchBuilder, AppError> {
    let raw = read_input(args.file.as_deref())?;
    let records = parse_json_array(&raw, "batch")?;
    tracing::debug!(records = records.len(), "loaded batch records");
    Ok(BatchBuilder::from_records(&records)?)
}

pub(crate) fn run_append(args: &AppendArgs, session: &Session) -> Result<(), AppError> {
    let text = match &args.text {
        Some(text) => text.clone(),
        None => read_input(None)?,
    };
    let blocks = api::parse_outline(&text);
    if blocks.is_empty() {
        return Err(AppError::InvalidArgument("no content provided".to_string()));
    }

    let mut location = AppendLocation::page(&args.page);
    if let Some(nest_under) = args.nest_under.as_deref().filter(|s| !s.is_empty()) {
        location = location.nest_under(nest_under);
    }
    let client = session.append_client(args.api_url.as_deref())?;
    client.append(&location, &blocks)?;

    let count = api::count_blocks(&blocks);
    if args.json || session.prefers_json() {
        print_json(&json!({"success": true, "blocks_count": count, "page": args.page}));
    } else {
        println!("Appended {} block(s) to {}", count, location.describe());
    }
    Ok(())
}

/// Creates a block, returning its uid when it is known.
fn create_block(
    client: &Client,
    location: &Location,
    opts: &BlockOptions,
) -> Result<Option<String>, AppError> {
    match client.as_local() {
        Some(local) => Ok(Some(
            local.create_block_at_location_and_get_uid(location, opts)?,
        )),
        None => {
            client.api().create_block_at_location(location, opts)?;
            Ok(opts.uid.clone())
        }
    }
}

fn show_page(raw: &Value, as_json: bool) -> Result<(), AppError> {
    if as_json {
        print_json(raw);
    } else {
        ui::print_page(&roamdb::parse_page(raw)?);
    }
    Ok(())
}

/// `{"success": true, ...}` with the fields that have values.
fn written(fields: &[(&str, Option<String>)]) -> Value {
    let mut map = Map::new();
    map.insert("success".to_string(), Value::Bool(true));
    for (key, value) in fields {
        if let Some(value) = value {
            map.insert(key.to_string(), Value::from(value.as_str()));
        }
    }
    Value::Object(map)
}

fn entity_id(raw: &str) -> Result<Value, AppError> {
    roamdb::parse_entity_id(raw).map_err(AppError::InvalidArgument)
}

fn daily_date(raw: Option<&str>) -> Result<time::Date, AppError> {
    match raw {
        Some(raw) => daily::parse_date(raw).map_err(AppError::InvalidArgument),
        None => Ok(daily::today()),
    }
}

fn wire_date(date: time::Date) -> Result<String, AppError> {
    daily::wire_date(date).map_err(AppError::InvalidArgument)
}

pub(crate) fn location_from_args(args: &LocationArgs, order: Order) -> Result<Location, AppError> {
    let location = if let Some(parent) = args.parent.as_deref() {
        Location::parent(parent)
    } else if let Some(title) = args.page.as_deref() {
        Location::page(title)
    } else if let Some(date) = args.daily_note.as_deref() {
        Location::daily_note(wire_date(daily_date(Some(date))?)?)
    } else if args.today {
        Location::daily_note(wire_date(daily::today())?)
    } else {
        return Err(AppError::InvalidArgument(
            "pass one of --parent, --page, --daily-note, or --today".to_string(),
        ));
    };
    Ok(location.with_order(order))
}

pub(crate) fn block_options(content: &str, args: &BlockOptionArgs) -> Result<BlockOptions, AppError> {
    let open = match (args.open, args.collapsed) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    };
    let props = match args.props.as_deref() {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Some(map),
            _ => {
                return Err(AppError::InvalidArgument(
                    "--props must be a JSON object".to_string(),
                ))
            }
        },
        None => None,
    };
    Ok(BlockOptions {
        content: content.to_string(),
        uid: args.explicit_uid.clone(),
        open,
        heading: args.heading,
        text_align: args.text_align.clone(),
        children_view_type: args.children_view_type.clone(),
        block_view_type: args.block_view_type.clone(),
        props,
    })
}

#[cfg(test)]
#[path = "graph_commands_tests.rs"]
mod tests;
