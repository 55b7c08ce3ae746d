use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use console::style;

use crate::cache::load_from_file;
use crate::collab::{FileManager, FlatJsonFileManager};

pub async fn run(output: PathBuf) -> Result<()> {
    let items = load_from_file(&output)?;
    let file_manager: Arc<dyn FileManager> = Arc::new(FlatJsonFileManager);
    let export_path = output.join("output");
    file_manager.write_to_path(&export_path, &items).await?;
    println!(
        "{} {}",
        style("Exported to").green(),
        style(export_path.display()).cyan()
    );
    Ok(())
}
