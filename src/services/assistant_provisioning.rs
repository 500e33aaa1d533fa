use std::collections::BTreeSet;

use crate::{
    constants::books::BookInfo,
    errors::AppResult,
    services::assistant_client::AssistantClient,
};

pub const VECTOR_STORE_NAME: &str = "UPSC Books Vector Store";

/// Attaches every reachable book file to the assistant's file search.
///
/// Books whose file id is pending are ignored, and files the service cannot
/// retrieve are logged and left out. Returns the id of the new vector store,
/// or `None` when no file could be verified.
pub async fn provision_file_search(
    client: &dyn AssistantClient,
    books: &[BookInfo],
) -> AppResult<Option<String>> {
    let candidates: BTreeSet<&str> = books
        .iter()
        .filter(|book| book.is_available())
        .map(|book| book.file_id)
        .collect();

    let mut verified = Vec::with_capacity(candidates.len());
    for file_id in candidates {
        match client.retrieve_file(file_id).await {
            Ok(file) => {
                log::info!("Verified file {} ({})", file_id, file.filename);
                verified.push(file_id.to_string());
            }
            Err(err) => log::warn!("Skipping file {}: {}", file_id, err),
        }
    }

    if verified.is_empty() {
        log::warn!("No book files could be verified, assistant file search left unchanged");
        return Ok(None);
    }

    let file_count = verified.len();
    let store_id = client.create_vector_store(VECTOR_STORE_NAME, verified).await?;
    client.update_assistant(&store_id).await?;

    log::info!(
        "Assistant file search now uses vector store {} with {} files",
        store_id,
        file_count
    );
    Ok(Some(store_id))
}
