use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // User types
    types.push(clean_type(User::export_to_string()?));
    types.push(clean_type(CreateUserRequest::export_to_string()?));
    types.push(clean_type(UsersResponse::export_to_string()?));

    // Email types
    types.push(clean_type(Email::export_to_string()?));
    types.push(clean_type(ListEmailsRequest::export_to_string()?));
    types.push(clean_type(ListEmailsResponse::export_to_string()?));
    types.push(clean_type(GetEmailLabelsResponse::export_to_string()?));

    // Label types
    types.push(clean_type(Label::export_to_string()?));
    types.push(clean_type(ListLabelsResponse::export_to_string()?));

    // Sync types
    types.push(clean_type(SyncState::export_to_string()?));
    types.push(clean_type(SyncResult::export_to_string()?));
    types.push(clean_type(SyncStatusView::export_to_string()?));
    types.push(clean_type(SyncUserRequest::export_to_string()?));
    types.push(clean_type(SyncAllResponse::export_to_string()?));

    let output_dir = Path::new("../gui/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    let lines: Vec<&str> = type_def.lines().collect();
    let has_import = lines
        .iter()
        .any(|line| line.trim().starts_with("import type"));

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            // Keep import lines if they're part of a type definition
            if trimmed.starts_with("import type") {
                return has_import;
            }
            // Filter out the generated comment line
            !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .cloned()
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
