use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cache::ProjectStatus;
use crate::cli::LanguageArg;
use crate::collab::{DefaultPromptBuilder, FlatJsonFileManager, OpenAiRequester};
use crate::events::{Event, EventBus};
use crate::translator::scheduler::LanguagePair;
use crate::translator::Translator;

static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");

pub async fn run(
    source: PathBuf,
    output: PathBuf,
    source_lang: LanguageArg,
    target_lang: LanguageArg,
    resume: bool,
) -> Result<()> {
    println!();
    println!("{}", style(" translorc - Translation Session ").bold().reverse());
    println!();
    println!("{}Source: {}", BRAIN, style(source.display()).cyan());
    println!("{}Output: {}", BRAIN, style(output.display()).cyan());
    println!();

    let bus = EventBus::new();
    let mut rx = bus.subscribe();

    let translator = Arc::new(Translator::new(
        bus.clone(),
        Arc::new(FlatJsonFileManager),
        Arc::new(OpenAiRequester::new()),
        Arc::new(DefaultPromptBuilder),
        LanguagePair { source: source_lang.into(), target: target_lang.into() },
        output,
        source,
    ));

    let scheduler = translator.clone();
    let starting_status = if resume {
        ProjectStatus::Translating
    } else {
        ProjectStatus::Untranslated
    };
    let session = tokio::spawn(async move { scheduler.translation_start_target(starting_status).await });

    let stop_on_ctrl_c = translator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_on_ctrl_c.request_stop();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    loop {
        match crate::events::recv_resilient(&mut rx).await {
            Some(Event::TranslationUpdate { extras }) => {
                pb.set_message(format!(
                    "{} lines translated ({}/{})",
                    extras.line,
                    extras.line,
                    extras.total_line.max(1)
                ));
            }
            Some(Event::TranslationStopDone) => {
                pb.finish_and_clear();
                println!("{}Session finished.", CHECK);
                break;
            }
            Some(_) => {}
            None => break,
        }
    }

    session.await??;
    Ok(())
}
