use crate::core::config::Config;
use crate::core::novel::{ChapterKey, ChapterPayload, NovelSummary};
use crate::core::state::ReadingState;
use crate::services::catalog::{CatalogService, RANKING_CATEGORIES};
use crate::services::chapters::ChapterService;
use crate::services::generator::{ChapterGenerator, LlmChapterGenerator};
use crate::services::llm::LlmClient;
use crate::services::preload::PreloadScheduler;
use crate::services::session::{ReadPhase, ReaderSession};
use crate::services::sources::{SourceDirectory, SourcedGenerator};
use crate::utils::text::paginate;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Select, Text};
use std::sync::Arc;
use std::time::Duration;

const MENU_CONTINUE: &str = "Continue reading";
const MENU_RANKINGS: &str = "Rankings";
const MENU_SEARCH: &str = "Search";
const MENU_TYPOGRAPHY: &str = "Typography";
const MENU_QUIT: &str = "Quit";

const PAGE_NEXT: &str = "Next page";
const PAGE_PREV: &str = "Previous page";
const CHAPTER_NEXT: &str = "Next chapter";
const CHAPTER_PREV: &str = "Previous chapter";
const BACK_TO_MENU: &str = "Back to menu";

enum ChapterOutcome {
    NextChapter,
    PrevChapter,
    Reload,
    Back,
}

pub struct ReaderApp {
    config: Config,
    state: ReadingState,
    catalog: CatalogService,
    chapters: ChapterService,
    preload: PreloadScheduler,
    sources: Arc<SourceDirectory>,
}

impl ReaderApp {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let state = ReadingState::load(&config.cache_folder)?;
        let sources = Arc::new(SourceDirectory::simulate(&config.sources));

        let generator: Arc<dyn ChapterGenerator> = Arc::new(SourcedGenerator::new(
            Arc::new(LlmChapterGenerator::new(Arc::clone(&llm))),
            Arc::clone(&sources),
        ));
        let chapters = ChapterService::new(generator, config.fetch.min_body_chars);
        let preload = PreloadScheduler::new(chapters.clone(), config.fetch.preload_workers);
        let catalog = CatalogService::new(llm, &config.cache_folder);

        Ok(Self {
            config,
            state,
            catalog,
            chapters,
            preload,
            sources,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let mut options = Vec::new();
            if !self.state.last_read.is_empty() {
                options.push(MENU_CONTINUE);
            }
            options.extend([MENU_RANKINGS, MENU_SEARCH, MENU_TYPOGRAPHY, MENU_QUIT]);

            match Select::new("novelreader:", options).prompt()? {
                MENU_CONTINUE => self.continue_reading().await?,
                MENU_RANKINGS => self.browse_rankings().await?,
                MENU_SEARCH => self.run_search().await?,
                MENU_TYPOGRAPHY => self.adjust_typography()?,
                _ => {
                    println!("Goodbye.");
                    return Ok(());
                }
            }
        }
    }

    async fn browse_rankings(&mut self) -> Result<()> {
        let category = Select::new("Category:", RANKING_CATEGORIES.to_vec()).prompt()?;
        let list = {
            let spinner = spinner("Fetching rankings...");
            let result = self.catalog.rankings(category).await;
            spinner.finish_and_clear();
            result?
        };
        self.pick_and_read(list).await
    }

    async fn run_search(&mut self) -> Result<()> {
        let query = Text::new("Search for:").prompt()?;
        if query.trim().is_empty() {
            return Ok(());
        }
        let list = {
            let spinner = spinner("Searching...");
            let result = self.catalog.search(&query).await;
            spinner.finish_and_clear();
            result?
        };
        if list.is_empty() {
            println!("No matches.");
            return Ok(());
        }
        self.pick_and_read(list).await
    }

    async fn continue_reading(&mut self) -> Result<()> {
        let mut entries: Vec<(String, usize)> = self
            .state
            .last_read
            .iter()
            .map(|(novel, index)| (novel.clone(), *index))
            .collect();
        entries.sort();

        let labels: Vec<String> = entries
            .iter()
            .map(|(novel, index)| format!("{} (chapter {})", novel, index + 1))
            .collect();
        let choice = Select::new("Pick up where you left off:", labels.clone()).prompt()?;
        let position = labels.iter().position(|l| l == &choice).unwrap_or(0);
        let (novel, _) = entries.swap_remove(position);
        self.read_novel(&novel).await
    }

    async fn pick_and_read(&mut self, list: Vec<NovelSummary>) -> Result<()> {
        let labels: Vec<String> = list
            .iter()
            .map(|n| format!("{} by {} · {}", n.title, n.author, n.intro))
            .collect();
        let choice = Select::new("Novel:", labels.clone()).prompt()?;
        let position = labels.iter().position(|l| l == &choice).unwrap_or(0);
        let novel = list[position].title.clone();
        self.read_novel(&novel).await
    }

    async fn read_novel(&mut self, novel: &str) -> Result<()> {
        self.pick_source()?;
        let mut index = self.state.resume(novel).unwrap_or(0);

        loop {
            self.state.bookmark(novel, index);
            self.state.save(&self.config.cache_folder)?;

            match self.read_chapter(novel, index).await? {
                ChapterOutcome::NextChapter => index += 1,
                ChapterOutcome::PrevChapter => index = index.saturating_sub(1),
                ChapterOutcome::Reload => {}
                ChapterOutcome::Back => return Ok(()),
            }
        }
    }

    fn adjust_typography(&mut self) -> Result<()> {
        let width = Text::new("Line width (characters):")
            .with_default(&self.config.reading.line_width.to_string())
            .prompt()?;
        let lines = Text::new("Lines per page:")
            .with_default(&self.config.reading.page_lines.to_string())
            .prompt()?;

        if let Ok(width) = width.trim().parse::<usize>() {
            self.config.reading.line_width = width.max(20);
        }
        if let Ok(lines) = lines.trim().parse::<usize>() {
            self.config.reading.page_lines = lines.max(4);
        }
        self.config.save()?;
        println!("Typography saved.");
        Ok(())
    }

    fn pick_source(&self) -> Result<()> {
        let labels: Vec<String> = self
            .sources
            .list()
            .iter()
            .map(|s| format!("{} (~{}ms)", s.name, s.latency.as_millis()))
            .collect();
        let choice = Select::new("Delivery source:", labels.clone()).prompt()?;
        let position = labels.iter().position(|l| l == &choice).unwrap_or(0);
        self.sources.select(position);
        Ok(())
    }

    async fn read_chapter(&mut self, novel: &str, index: usize) -> Result<ChapterOutcome> {
        let key = ChapterKey::new(novel, index);
        let (session, mut events) = ReaderSession::new(
            self.chapters.clone(),
            key,
            self.config.fetch.max_attempts,
            Duration::from_millis(self.config.fetch.retry_delay_ms),
        );
        let reading = tokio::spawn(session.run());

        let spinner = spinner(&format!("Loading chapter {}...", index + 1));
        while let Some(status) = events.recv().await {
            match status.phase {
                ReadPhase::Loading => spinner.set_message(format!(
                    "Loading chapter {} via {}...",
                    index + 1,
                    status.source_label
                )),
                ReadPhase::Retrying => {
                    self.sources.advance();
                    spinner.set_message(format!("Switching source ({})...", status.source_label));
                }
                ReadPhase::Success | ReadPhase::FinalFailure => break,
                ReadPhase::Idle => {}
            }
        }
        spinner.finish_and_clear();

        match reading.await? {
            Ok(payload) => {
                // Warm the chapters the reader is most likely to open next.
                for ahead in 1..=self.config.fetch.preload_depth {
                    self.preload
                        .schedule(ChapterKey::new(novel, index + ahead));
                }
                self.page_through(&payload)
            }
            Err(err) => {
                eprintln!("Could not load chapter {}: {err}", index + 1);
                let again = Confirm::new("Start this chapter over?")
                    .with_default(false)
                    .prompt()?;
                Ok(if again {
                    ChapterOutcome::Reload
                } else {
                    ChapterOutcome::Back
                })
            }
        }
    }

    fn page_through(&self, payload: &ChapterPayload) -> Result<ChapterOutcome> {
        let pages = paginate(
            &payload.body,
            self.config.reading.line_width,
            self.config.reading.page_lines,
        );
        let mut page = 0;

        loop {
            println!("\n== {} · {} ==\n", payload.key.novel, payload.title);
            println!("{}", pages[page]);
            println!("\n-- page {}/{} --", page + 1, pages.len());

            let mut options = Vec::new();
            if page + 1 < pages.len() {
                options.push(PAGE_NEXT);
            }
            if page > 0 {
                options.push(PAGE_PREV);
            }
            options.push(CHAPTER_NEXT);
            if payload.key.index > 0 {
                options.push(CHAPTER_PREV);
            }
            options.push(BACK_TO_MENU);

            match Select::new("", options).prompt()? {
                PAGE_NEXT => page += 1,
                PAGE_PREV => page -= 1,
                CHAPTER_NEXT => return Ok(ChapterOutcome::NextChapter),
                CHAPTER_PREV => return Ok(ChapterOutcome::PrevChapter),
                _ => return Ok(ChapterOutcome::Back),
            }
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
