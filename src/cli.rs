//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, FilterArgs};
pub use presentation::{
    format_bulk_modify_result, format_follow_up_list, format_generate_result, format_import_result,
};
pub use route::RunContext;
