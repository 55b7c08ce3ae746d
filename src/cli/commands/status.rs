use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::cache::{load_from_file, load_project_from_file, CacheStatus};

pub async fn run(output: PathBuf) -> Result<()> {
    let project = load_project_from_file(&output)?;
    let items = load_from_file(&output)?;

    let translated = items.iter().filter(|i| i.status == CacheStatus::Translated).count();
    let untranslated = items.iter().filter(|i| i.status == CacheStatus::Untranslated).count();
    let excluded = items.iter().filter(|i| i.status == CacheStatus::Excluded).count();

    println!("Project status: {}", style(format!("{:?}", project.status)).cyan().bold());
    println!("  translated:   {translated}");
    println!("  untranslated: {untranslated}");
    println!("  excluded:     {excluded}");
    println!(
        "  lines:        {}/{}",
        project.extras.line, project.extras.total_line
    );
    Ok(())
}
