use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tutor::chat::{ChatConfig, ChatTracker};
use tutor::config::{CONFIG_FILE, get_config, init_config};
use tutor::core::{Category, Notice, TutorBackend};
use tutor::logging::init_logging;
use tutor::progress::LearningProgress;
use tutor::upload::{UploadEvent, UploadFile, UploadOutcome, UploadSettings, UploadTracker};
use tutor::utils::format_file_size;
use tutor::HttpBackend;

#[derive(Parser)]
#[command(name = "tutor", version, about = "Client for the AI tutor backend")]
struct Cli {
    /// Config file, defaults apply when it does not exist
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Backend address, overrides the config file
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload PDF documents for a syllabus
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        syllabus: Option<String>,
    },

    /// Ask the tutor a question
    Ask {
        question: String,

        #[arg(short, long)]
        syllabus: Option<String>,

        /// Request follow-up quiz questions
        #[arg(long)]
        quiz: bool,
    },

    /// Show the document status of a syllabus
    Status {
        #[arg(short, long)]
        syllabus: Option<String>,
    },

    /// Check backend health
    Health,

    /// Summarize a learning progress JSON file
    Progress {
        file: PathBuf,
    },
}

fn print_notice(notice: &Notice) {
    println!("[{:?}] {}: {}", notice.level, notice.title, notice.description);
}

async fn upload(
    backend: Arc<dyn TutorBackend>,
    settings: UploadSettings,
    paths: Vec<PathBuf>,
    category: Category,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("Can't read {}", path.display()))?;
        files.push(file);
    }

    let handle = UploadTracker::new(backend, settings);
    let tracker = handle.tracker.clone();

    let mut events = tracker.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(UploadEvent::Progress { upload_id, progress }) => {
                    println!("{} {:>3}%", upload_id, progress);
                }
                Ok(UploadEvent::Notice(notice)) => print_notice(&notice),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let submission = tracker.submit(files, category).await?;
    for rejection in &submission.rejected {
        println!("skipped {} ({})", rejection.name, rejection.reason);
    }

    let mut failed = 0;
    for upload in submission.handles {
        if let UploadOutcome::Failed(_) = upload.outcome().await? {
            failed += 1;
        }
    }

    for task in tracker.tasks().await? {
        println!(
            "{:<40} {:>12} {:?} {}%",
            task.name,
            format_file_size(task.size_bytes),
            task.status,
            task.progress
        );
    }

    drop(tracker);
    handle.shutdown().await?;
    printer.await.context("Event printer stopped unexpectedly")?;

    if failed > 0 {
        bail!("{} upload(s) failed", failed);
    }
    Ok(())
}

async fn ask(
    backend: Arc<dyn TutorBackend>,
    config: ChatConfig,
    question: String,
    category: Category,
    quiz_mode: bool,
) -> anyhow::Result<()> {
    let handle = ChatTracker::new(backend, ChatConfig { greeting: None, ..config });

    let Some(pending) = handle.tracker.ask(question, category, quiz_mode).await? else {
        bail!("Question is empty");
    };
    let reply = pending.reply().await?;
    println!("{}", reply.text);

    handle.shutdown().await?;
    Ok(())
}

async fn summarize_progress(file: PathBuf) -> anyhow::Result<()> {
    let progress = LearningProgress::from_file(&file)
        .await
        .with_context(|| format!("Can't load progress from {}", file.display()))?;

    println!(
        "Accuracy: {}% ({}/{})",
        progress.accuracy(),
        progress.correct_answers,
        progress.total_questions
    );
    println!("Streak: {} days", progress.current_streak);
    println!("Time spent: {}", progress.time_spent_label());
    println!(
        "Topics: {}/{} ({}%)",
        progress.topics_completed,
        progress.total_topics,
        progress.topic_completion()
    );
    for activity in &progress.recent_activity {
        println!("  {} {:<30} {:>3}% {}", activity.date, activity.topic, activity.score, activity.grade());
    }
    if !progress.weak_areas.is_empty() {
        println!("Needs work: {}", progress.weak_areas.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    init_config(&cli.config).with_context(|| format!("Can't load config {}", cli.config.display()))?;
    let config = get_config().with_base_url_override(cli.base_url);

    let syllabus = |syllabus: Option<String>| {
        syllabus.map(Category::new).unwrap_or_else(|| config.default_syllabus.clone())
    };

    let backend = || -> anyhow::Result<Arc<dyn TutorBackend>> {
        tracing::debug!(base_url = %config.base_url, "backend configured");
        Ok(Arc::new(HttpBackend::from_config(&config)?))
    };

    match cli.command {
        Command::Upload { files, syllabus: tag } => {
            upload(backend()?, UploadSettings::from(&config), files, syllabus(tag)).await
        }
        Command::Ask { question, syllabus: tag, quiz } => {
            let quiz_mode = quiz || config.quiz_mode;
            ask(backend()?, ChatConfig::from(&config), question, syllabus(tag), quiz_mode).await
        }
        Command::Status { syllabus: tag } => {
            let status = backend()?.syllabus_status(&syllabus(tag)).await?;
            println!("{}: {} (documents uploaded: {})", status.syllabus, status.status, status.documents_uploaded);
            Ok(())
        }
        Command::Health => {
            let health = backend()?.health().await?;
            println!("status: {}", health.status);
            println!("ncert ready: {}", health.ncert_ready);
            println!("samacheer ready: {}", health.samacheer_ready);
            println!("openai configured: {}", health.openai_configured);
            Ok(())
        }
        Command::Progress { file } => summarize_progress(file).await,
    }
}
