//! The round-loop orchestrator. Owns the `CacheManager`, drives the chunk plan
//! through a bounded worker pool each round, and exposes the cooperative stop
//! protocol described by `WorkStatus`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn, Instrument};

use crate::cache::{CacheManager, CacheStatus, Extras, ProjectStatus, SAVE_INTERVAL};
use crate::collab::{FileManager, PlatformConfig, PromptBuilder, TranslatorRequester};
use crate::config::Config;
use crate::error::OrchestratorError;
use crate::events::{Event, EventBus};
use crate::response::Language;
use crate::status::{self, WorkStatus};
use crate::translator::limiter::TaskLimiter;
use crate::translator::optimizer;
use crate::translator::task::TranslatorTask;

/// A session's fixed source/target language pair.
#[derive(Debug, Clone, Copy)]
pub struct LanguagePair {
    pub source: Language,
    pub target: Language,
}

pub struct Translator {
    bus: EventBus,
    manager: Arc<CacheManager>,
    file_manager: Arc<dyn FileManager>,
    requester: Arc<dyn TranslatorRequester>,
    prompt_builder: Arc<dyn PromptBuilder>,
    languages: LanguagePair,
    output_folder: PathBuf,
    source_path: PathBuf,
    /// Distinct from the global `WorkStatus`: the watcher spawned by `request_stop`
    /// polls this flag, not the status, so the status can stay `Stopping` until the
    /// main loop itself observes it and flips both to idle at a round boundary.
    translating: Arc<AtomicBool>,
}

impl Translator {
    pub fn new(
        bus: EventBus,
        file_manager: Arc<dyn FileManager>,
        requester: Arc<dyn TranslatorRequester>,
        prompt_builder: Arc<dyn PromptBuilder>,
        languages: LanguagePair,
        output_folder: PathBuf,
        source_path: PathBuf,
    ) -> Self {
        let manager = Arc::new(CacheManager::new(true, Some(bus.clone())));
        Self {
            bus,
            manager,
            file_manager,
            requester,
            prompt_builder,
            languages,
            output_folder,
            source_path,
            translating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the full session lifecycle to completion or exhaustion; returns once
    /// finalize has written output, or early if a STOP is observed at a round
    /// boundary.
    pub async fn translation_start_target(&self, status: ProjectStatus) -> Result<()> {
        status::set(WorkStatus::Translating);
        self.translating.store(true, Ordering::SeqCst);
        self.bus.publish(Event::TranslationStart { status });

        let config = Config::load().context("loading configuration")?;
        let platform = config
            .active_platform()
            .context("active platform is not configured")?;

        let local_flag = is_local_endpoint(&platform.api_url);
        let (max_workers, rpm) = self.resolve_worker_policy(&platform, local_flag).await;

        let resuming = status == ProjectStatus::Translating;
        let fresh_start = !resuming;

        if resuming {
            let items = crate::cache::load_from_file(&self.output_folder).map_err(|source| {
                OrchestratorError::CacheLoad { path: self.output_folder.display().to_string(), source }
            })?;
            let project =
                crate::cache::load_project_from_file(&self.output_folder).map_err(|source| {
                    OrchestratorError::CacheLoad {
                        path: self.output_folder.display().to_string(),
                        source,
                    }
                })?;
            self.manager.set_items(items).await;
            self.manager.set_project(project).await;
        } else {
            let cache_dir = self.output_folder.join("cache");
            let _ = std::fs::remove_dir_all(&cache_dir);
            let (items, project) = self
                .file_manager
                .read_from_path(&self.source_path)
                .await
                .map_err(|source| OrchestratorError::ReadFromPath {
                    path: self.source_path.display().to_string(),
                    source,
                })?;
            self.manager.set_items(items).await;
            self.manager.set_project(project).await;
        }
        let loaded_count = self.manager.get_item_count().await;
        info!(platform = %platform.name, count = loaded_count, "loaded items for session");

        let mut project = self.manager.get_project().await;
        let session_start = Instant::now();
        if resuming {
            project.extras.start_time = now_seconds() - project.extras.time;
        } else {
            project.extras = Extras::default();
            project.extras.start_time = now_seconds();
        }
        project.status = ProjectStatus::Translating;
        self.manager.set_project(project).await;

        if config.mtool_preprocess_enabled {
            let mut items = self.manager.get_items().await;
            optimizer::preprocess(&mut items);
            self.manager.set_items(items).await;
        }

        let limiter = TaskLimiter::new(platform.rps, rpm);
        let mut token_threshold = config.token_threshold;
        let data_lock = Arc::new(Mutex::new(()));

        for round in 0..=config.max_round {
            if status::get() == WorkStatus::Stopping {
                self.translating.store(false, Ordering::SeqCst);
                status::set(WorkStatus::Idle);
                return Ok(());
            }

            let untranslated = self
                .manager
                .get_item_count_by_status(CacheStatus::Untranslated)
                .await;

            if untranslated == 0 {
                break;
            }
            if round == config.max_round {
                warn!("translation session exhausted max_round with {untranslated} items remaining");
                break;
            }

            if round == 0 && fresh_start {
                let mut project = self.manager.get_project().await;
                project.extras.total_line = untranslated as u64;
                self.manager.set_project(project).await;
            }
            if round > 0 {
                token_threshold = token_threshold.saturating_div(3).max(1);
            }

            let mut chunks = self
                .manager
                .generate_item_chunks(token_threshold, config.preceding_lines_threshold)
                .await;
            if round > 0 {
                for chunk in chunks.iter_mut() {
                    chunk.preceding.clear();
                }
            }

            self.run_round(chunks, &platform, max_workers, &limiter, &data_lock)
                .await;
        }

        if config.mtool_preprocess_enabled {
            let items = self.manager.get_items().await;
            let expanded = optimizer::postprocess(&items);
            self.manager.push_items(expanded).await;
        }

        let remaining = self
            .manager
            .get_item_count_by_status(CacheStatus::Untranslated)
            .await;
        if remaining == 0 {
            let mut project = self.manager.get_project().await;
            project.status = ProjectStatus::Translated;
            project.extras.time += session_start.elapsed().as_secs_f64();
            self.manager.set_project(project).await;
        }

        tokio::time::sleep(SAVE_INTERVAL).await;

        self.manager
            .save_now(&self.output_folder)
            .await
            .context("writing final cache snapshot")?;

        let final_items = self.manager.get_items().await;
        check_result_consistency(&final_items);
        self.file_manager
            .write_to_path(&self.output_folder.join("output"), &final_items)
            .await
            .context("writing final output")?;

        self.translating.store(false, Ordering::SeqCst);
        status::set(WorkStatus::Idle);
        self.bus.publish(Event::TranslationStopDone);
        Ok(())
    }

    /// STOP handler: flips WORK_STATUS to `Stopping` and spawns a watcher that waits
    /// for the main loop to observe it and clear `translating` at its next round
    /// boundary, then emits STOP_DONE. The watcher polls `translating`, not
    /// `WORK_STATUS` — polling the status it just set would fire on its first tick,
    /// long before the in-flight round (seconds of LLM calls) actually finishes.
    pub fn request_stop(&self) {
        status::set(WorkStatus::Stopping);
        let bus = self.bus.clone();
        let translating = self.translating.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if !translating.load(Ordering::SeqCst) {
                    break;
                }
            }
            status::set(WorkStatus::Idle);
            bus.publish(Event::TranslationStopDone);
        });
    }

    async fn run_round(
        &self,
        chunks: Vec<crate::cache::ItemChunk>,
        platform: &PlatformConfig,
        max_workers: u32,
        limiter: &TaskLimiter,
        data_lock: &Arc<Mutex<()>>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1) as usize));
        let mut handles = Vec::with_capacity(chunks.len());

        for mut chunk in chunks {
            limiter.wait().await;
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let manager = self.manager.clone();
            let bus = self.bus.clone();
            let data_lock = data_lock.clone();
            let output_folder = self.output_folder.clone();
            let task = TranslatorTask::new(
                platform.clone(),
                self.languages.source,
                self.languages.target,
                self.requester.clone(),
                self.prompt_builder.clone(),
            );

            let span = tracing::info_span!("translator_task", items = chunk.items.len());
            let handle = tokio::spawn(
                async move {
                    let _permit = permit;
                    let usage = task.run(&mut chunk).await;
                    manager.apply_chunk(&chunk).await;

                    let _guard = data_lock.lock().await;
                    let mut project = manager.get_project().await;
                    project.extras.line += usage.row_count as u64;
                    project.extras.total_tokens += usage.input_tokens as u64;
                    project.extras.total_output_tokens += usage.output_tokens as u64;
                    manager.set_project(project.clone()).await;
                    manager.require_save_to_file(output_folder).await;
                    bus.publish(Event::TranslationUpdate {
                        extras: project.extras,
                    });
                }
                .instrument(span),
            );
            handles.push(handle);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("translation task panicked: {e}");
            }
        }
    }

    async fn resolve_worker_policy(&self, platform: &PlatformConfig, local_flag: bool) -> (u32, u32) {
        if platform.max_workers > 0 {
            return (platform.max_workers, platform.rpm);
        }

        if local_flag && let Some(n) = query_slot_count(&platform.api_url).await {
            return (n, platform.rpm);
        }

        if platform.rpm == 0 {
            (8, 0)
        } else {
            (8192, platform.rpm)
        }
    }
}

fn is_local_endpoint(api_url: &str) -> bool {
    let re = regex::Regex::new(r"^https?://(localhost|\d+\.\d+\.\d+\.\d+)").unwrap();
    re.is_match(api_url)
}

async fn query_slot_count(api_url: &str) -> Option<u32> {
    let base = api_url.trim_end_matches('/').trim_end_matches("/v1");
    let response = reqwest::get(format!("{base}/slots")).await.ok()?;
    let slots: Vec<serde_json::Value> = response.json().await.ok()?;
    Some(slots.len() as u32)
}

/// A thin post-hoc consistency pass: never fatal, just logs translated items that
/// ended up with an empty destination despite a non-empty source.
fn check_result_consistency(items: &[crate::cache::CacheItem]) {
    for item in items {
        if item.status == CacheStatus::Translated && item.dst.trim().is_empty() && !item.src.trim().is_empty() {
            warn!("item in {} translated to an empty line", item.file_path);
        }
    }
}

fn now_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
