use serde_json::json;

use crate::app::{AppError, Session};
use crate::cli::{ConfigArgs, ConfigSubcommands};
use crate::print_json;

pub(crate) fn run_config_command(args: &ConfigArgs, session: &Session) -> Result<(), AppError> {
    let store = session.store();
    match &args.command {
        ConfigSubcommands::Show => print_json(&session.config().redacted()),
        ConfigSubcommands::Path => println!("{}", store.path().display()),
        ConfigSubcommands::Set(set) => {
            let mut config = session.config().clone();
            config.set(&set.key, &set.value)?;
            store.save(&config)?;
            tracing::debug!(key = %set.key, path = %store.path().display(), "config updated");
            print_json(&json!({"success": true, "key": set.key}));
        }
        ConfigSubcommands::Unset(unset) => {
            let mut config = session.config().clone();
            config.unset(&unset.key)?;
            store.save(&config)?;
            print_json(&json!({"success": true, "key": unset.key}));
        }
    }
    Ok(())
}
