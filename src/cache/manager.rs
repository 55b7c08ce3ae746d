use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::item::{CacheItem, CacheStatus};
use super::project::CacheProject;
use crate::events::{Event, EventBus};

pub const SAVE_INTERVAL: Duration = Duration::from_secs(15);

/// Sentence-terminal punctuation a preceding-context candidate must end with.
pub const END_LINE_PUNCTUATION: &[char] = &[
    '.', '。', '?', '？', '!', '！', '…', '\'', '"', '\u{2019}', '\u{201d}', '」', '』',
];

/// Serializes cache-file writes across every `CacheManager` instance in the process,
/// matching the single process-wide file lock the persistence layer relies on.
static FILE_LOCK: StdMutex<()> = StdMutex::new(());

/// One batch plan: the original indices of its items (for writing results back),
/// the items themselves, and the preceding-context items supplied for continuity.
#[derive(Debug, Clone)]
pub struct ItemChunk {
    pub indices: Vec<usize>,
    pub items: Vec<CacheItem>,
    pub preceding: Vec<CacheItem>,
}

pub struct CacheManager {
    items: Arc<Mutex<Vec<CacheItem>>>,
    project: Arc<Mutex<CacheProject>>,
    save_requested: Arc<AtomicBool>,
    save_folder: Arc<Mutex<Option<PathBuf>>>,
    ticker: Option<JoinHandle<()>>,
}

impl CacheManager {
    /// `tick = true` spawns the background snapshotter for the lifetime of this
    /// instance, matching the upstream scheduler's single long-lived manager.
    pub fn new(tick: bool, bus: Option<EventBus>) -> Self {
        let items = Arc::new(Mutex::new(Vec::new()));
        let project = Arc::new(Mutex::new(CacheProject::default()));
        let save_requested = Arc::new(AtomicBool::new(false));
        let save_folder = Arc::new(Mutex::new(None));

        let ticker = if tick {
            let items = items.clone();
            let project = project.clone();
            let save_requested = save_requested.clone();
            let save_folder = save_folder.clone();
            Some(tokio::spawn(async move {
                save_to_file_tick(items, project, save_requested, save_folder, bus).await
            }))
        } else {
            None
        };

        Self {
            items,
            project,
            save_requested,
            save_folder,
            ticker,
        }
    }

    pub async fn set_items(&self, items: Vec<CacheItem>) {
        *self.items.lock().await = items;
    }

    pub async fn get_items(&self) -> Vec<CacheItem> {
        self.items.lock().await.clone()
    }

    /// Deep copy via a serialize/deserialize round trip so a background writer or
    /// post-processor never aliases the live item list.
    pub async fn copy_items(&self) -> Result<Vec<CacheItem>> {
        copy_items(&self.items).await
    }

    pub async fn set_project(&self, project: CacheProject) {
        *self.project.lock().await = project;
    }

    pub async fn get_project(&self) -> CacheProject {
        self.project.lock().await.clone()
    }

    pub async fn get_item_count(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn get_item_count_by_status(&self, status: CacheStatus) -> usize {
        self.items
            .lock()
            .await
            .iter()
            .filter(|i| i.status == status)
            .count()
    }

    /// Apply the results of a completed chunk back into the live item list.
    pub async fn apply_chunk(&self, chunk: &ItemChunk) {
        debug!(indices = chunk.indices.len(), "applying chunk results");
        let mut items = self.items.lock().await;
        for (&idx, item) in chunk.indices.iter().zip(chunk.items.iter()) {
            if let Some(slot) = items.get_mut(idx) {
                *slot = item.clone();
            }
        }
    }

    /// Append synthesized items (MTool postprocess) to the live list.
    pub async fn push_items(&self, extra: Vec<CacheItem>) {
        self.items.lock().await.extend(extra);
    }

    pub async fn require_save_to_file(&self, folder: PathBuf) {
        *self.save_folder.lock().await = Some(folder);
        self.save_requested.store(true, Ordering::SeqCst);
    }

    pub async fn generate_item_chunks(
        &self,
        token_threshold: u32,
        preceding_lines_threshold: usize,
    ) -> Vec<ItemChunk> {
        let items = self.items.lock().await;
        plan_chunks(&items, token_threshold, preceding_lines_threshold)
    }

    pub async fn save_now(&self, folder: &Path) -> Result<()> {
        let items = self.copy_items().await?;
        let project = self.get_project().await;
        save_to_file(&project, &items, folder)
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

async fn copy_items(items: &Mutex<Vec<CacheItem>>) -> Result<Vec<CacheItem>> {
    let guard = items.lock().await;
    let json = serde_json::to_vec(&*guard)?;
    Ok(serde_json::from_slice(&json)?)
}

async fn save_to_file_tick(
    items: Arc<Mutex<Vec<CacheItem>>>,
    project: Arc<Mutex<CacheProject>>,
    save_requested: Arc<AtomicBool>,
    save_folder: Arc<Mutex<Option<PathBuf>>>,
    bus: Option<EventBus>,
) {
    let mut interval = tokio::time::interval(SAVE_INTERVAL);
    loop {
        interval.tick().await;
        if !save_requested.load(Ordering::SeqCst) {
            continue;
        }
        let folder = save_folder.lock().await.clone();
        let Some(folder) = folder else {
            continue;
        };

        let snapshot_items = match copy_items(&items).await {
            Ok(items) => items,
            Err(e) => {
                warn!("periodic cache snapshot failed to copy items: {e}");
                continue;
            }
        };
        let snapshot_project = project.lock().await.clone();

        match save_to_file(&snapshot_project, &snapshot_items, &folder) {
            Ok(()) => {
                if let Some(bus) = &bus {
                    bus.publish(Event::CacheFileAutoSave);
                }
            }
            Err(e) => warn!("periodic cache snapshot failed: {e}"),
        }
        save_requested.store(false, Ordering::SeqCst);
    }
}

/// Writes `<folder>/cache/items.json` and `<folder>/cache/project.json`. Failures are
/// logged and swallowed by the caller context that cares (the ticker); callers that
/// want the error (manual export, finalize) get it back here.
pub fn save_to_file(project: &CacheProject, items: &[CacheItem], folder: &Path) -> Result<()> {
    let _guard = FILE_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let cache_dir = folder.join("cache");
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir {}", cache_dir.display()))?;

    let items_json = serde_json::to_string(items)?;
    std::fs::write(cache_dir.join("items.json"), items_json)?;

    let project_json = serde_json::to_string(project)?;
    std::fs::write(cache_dir.join("project.json"), project_json)?;

    Ok(())
}

pub fn load_from_file(folder: &Path) -> Result<Vec<CacheItem>> {
    let path = folder.join("cache").join("items.json");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = read_bom_tolerant(&path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

pub fn load_project_from_file(folder: &Path) -> Result<CacheProject> {
    let path = folder.join("cache").join("project.json");
    if !path.exists() {
        return Ok(CacheProject::default());
    }
    let content = read_bom_tolerant(&path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn read_bom_tolerant(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// The chunk planner: groups the ordered, UNTRANSLATED subsequence of `items` into
/// token/line-budgeted, single-file batches, pairing each with its preceding-context
/// chunk. Pure function of its inputs so it is directly testable.
pub fn plan_chunks(
    items: &[CacheItem],
    token_threshold: u32,
    preceding_lines_threshold: usize,
) -> Vec<ItemChunk> {
    let line_limit = (token_threshold / 16).max(8) as usize;

    let mut chunks = Vec::new();
    let mut indices: Vec<usize> = Vec::new();
    let mut chunk: Vec<CacheItem> = Vec::new();
    let mut chunk_lines: usize = 0;
    let mut chunk_tokens: u32 = 0;
    let mut skip: usize = 0;

    for (i, item) in items.iter().enumerate() {
        if item.status != CacheStatus::Untranslated {
            skip += 1;
            continue;
        }

        let lines = item.non_empty_line_count();
        let tokens = item.token_count;

        let should_flush = !chunk.is_empty()
            && (chunk_lines + lines > line_limit
                || chunk_tokens + tokens > token_threshold
                || chunk.last().map(|c| c.file_path.as_str()) != Some(item.file_path.as_str()));

        if should_flush {
            let preceding = generate_preceding_chunks(items, &chunk, i, skip, preceding_lines_threshold);
            chunks.push(ItemChunk {
                indices: std::mem::take(&mut indices),
                items: std::mem::take(&mut chunk),
                preceding,
            });
            chunk_lines = 0;
            chunk_tokens = 0;
            skip = 0;
        }

        indices.push(i);
        chunk.push(item.clone());
        chunk_lines += lines;
        chunk_tokens += tokens;
    }

    if !chunk.is_empty() {
        let preceding =
            generate_preceding_chunks(items, &chunk, items.len(), skip, preceding_lines_threshold);
        chunks.push(ItemChunk {
            indices,
            items: chunk,
            preceding,
        });
    }

    chunks
}

fn generate_preceding_chunks(
    items: &[CacheItem],
    chunk: &[CacheItem],
    flush_boundary: usize,
    skip: usize,
    threshold: usize,
) -> Vec<CacheItem> {
    let Some(file_path) = chunk.first().map(|i| i.file_path.clone()) else {
        return Vec::new();
    };

    let start = flush_boundary as isize - skip as isize - chunk.len() as isize - 1;
    let mut result = Vec::new();
    let mut index = start;

    while index >= 0 && result.len() < threshold {
        let item = &items[index as usize];

        if item.status == CacheStatus::Excluded {
            index -= 1;
            continue;
        }

        let trimmed = item.src.trim();
        if trimmed.is_empty() {
            index -= 1;
            continue;
        }

        if item.file_path != file_path {
            break;
        }
        if !trimmed.ends_with(|c| END_LINE_PUNCTUATION.contains(&c)) {
            break;
        }

        result.push(item.clone());
        index -= 1;
    }

    result.reverse();
    result
}
