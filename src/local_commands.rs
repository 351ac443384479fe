use std::io::Write;

use serde_json::json;

use crate::api::{Client, LocalClient, SearchOptions};
use crate::app::AppError;
use crate::cli::{LocalArgs, LocalSubcommands};
use crate::{parse_json_array, print_json};

pub(crate) fn run_local_command(args: &LocalArgs, client: &Client) -> Result<(), AppError> {
    let local = require_local(client)?;
    match &args.command {
        LocalSubcommands::Undo => {
            local.undo()?;
            print_json(&json!({"success": true}));
        }
        LocalSubcommands::Redo => {
            local.redo()?;
            print_json(&json!({"success": true}));
        }
        LocalSubcommands::Reorder(reorder) => {
            local.reorder_blocks(&reorder.parent, &reorder.uids)?;
            print_json(&json!({"success": true, "parent": reorder.parent}));
        }
        LocalSubcommands::ShortcutAdd(shortcut) => {
            local.add_page_shortcut(&shortcut.uid, shortcut.index)?;
            print_json(&json!({"success": true, "uid": shortcut.uid}));
        }
        LocalSubcommands::ShortcutRemove(shortcut) => {
            local.remove_page_shortcut(&shortcut.uid)?;
            print_json(&json!({"success": true, "uid": shortcut.uid}));
        }
        LocalSubcommands::Upload(upload) => {
            let name = match upload.name.as_deref() {
                Some(name) => name.to_string(),
                None => upload
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        AppError::InvalidArgument(format!(
                            "cannot derive a file name from {}; pass --name",
                            upload.path.display()
                        ))
                    })?,
            };
            let data = std::fs::read(&upload.path)?;
            let url = local.upload_file(&name, &data)?;
            print_json(&json!({"success": true, "url": url}));
        }
        LocalSubcommands::Download(download) => {
            let data = local.download_file(&download.url)?;
            match &download.output {
                Some(path) => {
                    std::fs::write(path, &data)?;
                    print_json(&json!({
                        "success": true,
                        "path": path.display().to_string(),
                        "bytes": data.len(),
                    }));
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&data)?;
                    stdout.flush()?;
                }
            }
        }
        LocalSubcommands::DeleteFile(file) => {
            local.delete_file(&file.url)?;
            print_json(&json!({"success": true, "url": file.url}));
        }
        LocalSubcommands::UserUpsert(user) => {
            local.upsert_user(&user.uid, user.name.as_deref())?;
            print_json(&json!({"success": true, "uid": user.uid}));
        }
        LocalSubcommands::Search(search) => {
            let opts = SearchOptions {
                search_blocks: !search.no_blocks,
                search_pages: !search.no_pages,
                hide_code_blocks: search.hide_code_blocks,
                limit: search.limit,
                pull: search.pull.clone(),
            };
            print_json(&local.search(&search.text, &opts)?);
        }
        LocalSubcommands::Call(call) => {
            let call_args = match call.args.as_deref() {
                Some(raw) => parse_json_array(raw, "--args")?,
                None => Vec::new(),
            };
            print_json(&local.call(&call.action, call_args)?);
        }
    }
    Ok(())
}

fn require_local(client: &Client) -> Result<&LocalClient, AppError> {
    client.as_local().ok_or_else(|| {
        AppError::InvalidArgument(
            "local commands require --local or mode = encrypted".to_string(),
        )
    })
}
