//! CLI presentation: text and json formatters per command.

use crate::bulk::BulkModifyResponse;
use crate::error::{ApiError, StorageError};
use crate::generation::GenerateResponse;
use crate::model::{Dataset, FollowUp};
use comfy_table::Table;
use serde::Serialize;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::InvalidDataset(e)))
}

pub fn format_import_result(dataset: &Dataset, format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&serde_json::json!({
            "outbreaks": dataset.outbreaks.len(),
            "locations": dataset.locations.len(),
            "teams": dataset.teams.len(),
            "contacts": dataset.contacts.len(),
            "follow_ups": dataset.follow_ups.len(),
        }));
    }
    Ok(format!(
        "Imported dataset:\n  Outbreaks: {}\n  Locations: {}\n  Teams: {}\n  Contacts: {}\n  Follow-ups: {}",
        dataset.outbreaks.len(),
        dataset.locations.len(),
        dataset.teams.len(),
        dataset.contacts.len(),
        dataset.follow_ups.len()
    ))
}

pub fn format_generate_result(
    response: &GenerateResponse,
    format: &str,
) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(response);
    }
    Ok(format!(
        "Generated {} follow-ups for {} contacts ({} removed)",
        response.count, response.contacts, response.deleted
    ))
}

pub fn format_bulk_modify_result(
    response: &BulkModifyResponse,
    format: &str,
) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(response);
    }
    Ok(format!("Updated {} follow-ups", response.count))
}

pub fn format_follow_up_list(follow_ups: &[FollowUp], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(follow_ups);
    }
    if follow_ups.is_empty() {
        return Ok("No follow-ups match.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Date", "Contact", "Index", "Team", "Status", "Targeted", "Id"]);
    for follow_up in follow_ups {
        table.add_row(vec![
            follow_up.date.to_string(),
            follow_up.contact_id.clone(),
            follow_up.index.to_string(),
            follow_up.team_id.clone().unwrap_or_else(|| "-".to_string()),
            follow_up.status.to_string(),
            follow_up.targeted.to_string(),
            follow_up.id.clone(),
        ]);
    }
    Ok(format!("{}\n{} follow-ups", table, follow_ups.len()))
}
