use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, broadcast};
use tutor::chat::{Author, ChatConfig, ChatEvent, ChatTracker};
use tutor::core::{Category, NoticeLevel, ProgressCallback, Result, TransferSignal, TutorBackend, TutorError};
use tutor::upload::{UploadEvent, UploadFile, UploadOutcome, UploadSettings, UploadStatus, UploadTracker};
use tutor::{AnswerResponse, AskRequest, HealthReport, SyllabusStatus, UploadReceipt};

/// Mock backend - scripted responses, optional gates to hold requests open
#[derive(Default)]
struct MockBackend {
    pages: u32,
    upload_error: Option<String>,
    upload_gate: Option<Arc<Notify>>,
    ask_error: Option<u16>,
    ask_gate: Option<Arc<Notify>>,
    quiz: Vec<String>,
    uploads: Mutex<Vec<String>>,
    asked: Mutex<Vec<AskRequest>>,
}

impl MockBackend {
    fn with_pages(pages: u32) -> Self {
        Self { pages, ..Default::default() }
    }

    fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn asked(&self) -> Vec<AskRequest> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TutorBackend for MockBackend {
    async fn upload_pdf(
        &self,
        file: &UploadFile,
        category: &Category,
        on_progress: ProgressCallback,
    ) -> Result<UploadReceipt> {
        self.uploads.lock().unwrap().push(file.name().to_string());
        let total = file.size_bytes();
        on_progress(TransferSignal::BytesSent { sent: total / 2, total });

        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        if let Some(error) = &self.upload_error {
            return Err(TutorError::server_error(400, error.clone()));
        }

        on_progress(TransferSignal::BytesSent { sent: total, total });
        on_progress(TransferSignal::Accepted);

        Ok(UploadReceipt {
            message: Some("PDF processed successfully".to_string()),
            filename: file.name().to_string(),
            syllabus: category.to_string(),
            pages_processed: self.pages,
        })
    }

    async fn ask_question(&self, request: &AskRequest) -> Result<AnswerResponse> {
        self.asked.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.ask_gate {
            gate.notified().await;
        }
        if let Some(status) = self.ask_error {
            return Err(TutorError::Status(status));
        }

        Ok(AnswerResponse {
            answer: format!("Answer to: {}", request.question),
            quiz_questions: request.quiz_mode.then(|| self.quiz.clone()),
            syllabus: Some(request.syllabus.to_string()),
        })
    }

    async fn syllabus_status(&self, category: &Category) -> Result<SyllabusStatus> {
        Ok(SyllabusStatus {
            syllabus: category.to_string(),
            documents_uploaded: true,
            status: "ready".to_string(),
        })
    }

    async fn health(&self) -> Result<HealthReport> {
        Err(TutorError::Status(503))
    }
}

/// Backend whose upload and ask calls panic
struct PanickingBackend;

#[async_trait::async_trait]
impl TutorBackend for PanickingBackend {
    async fn upload_pdf(
        &self,
        _file: &UploadFile,
        _category: &Category,
        _on_progress: ProgressCallback,
    ) -> Result<UploadReceipt> {
        panic!("upload handler crashed");
    }

    async fn ask_question(&self, _request: &AskRequest) -> Result<AnswerResponse> {
        panic!("ask handler crashed");
    }

    async fn syllabus_status(&self, _category: &Category) -> Result<SyllabusStatus> {
        Err(TutorError::Status(503))
    }

    async fn health(&self) -> Result<HealthReport> {
        Err(TutorError::Status(503))
    }
}

fn pdf(name: &str, size: usize) -> UploadFile {
    UploadFile::from_bytes(name, vec![b'%'; size])
}

fn drain<T: Clone>(events: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[tokio::test]
async fn test_upload_success_reports_checkpoints() {
    let handle = UploadTracker::new(Arc::new(MockBackend::with_pages(7)), UploadSettings::default());
    let tracker = handle.tracker.clone();
    let mut events = tracker.subscribe();

    let submission = tracker
        .submit(vec![pdf("motion.pdf", 1000), pdf("force.pdf", 400)], Category::ncert())
        .await
        .unwrap();
    assert_eq!(submission.handles.len(), 2);
    assert!(submission.rejected.is_empty());

    let ids = submission.ids();
    for upload in submission.handles {
        match upload.outcome().await.unwrap() {
            UploadOutcome::Succeeded(receipt) => assert_eq!(receipt.pages_processed, 7),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    let tasks = tracker.tasks().await.unwrap();
    assert_eq!(tasks.iter().map(|task| task.id).collect::<Vec<_>>(), ids);
    assert_eq!(tasks[0].name, "motion.pdf");
    assert_eq!(tasks[1].name, "force.pdf");
    for task in &tasks {
        assert_eq!(task.status, UploadStatus::Succeeded);
        assert_eq!(task.progress, 100);
        assert_eq!(task.category, Category::ncert());
    }

    let events = drain(&mut events);
    for id in &ids {
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                UploadEvent::Progress { upload_id, progress } if upload_id == id => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![20, 50, 80, 100]);
    }

    let notices: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Notice(notice) => Some(notice.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|notice| notice.level == NoticeLevel::Success));
    assert!(notices[0].description.contains('7'));
    assert!(notices[0].description.contains("ncert"));

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_upload_failure_keeps_last_progress() {
    let backend = MockBackend {
        upload_error: Some("Only PDF files are allowed".to_string()),
        ..Default::default()
    };
    let handle = UploadTracker::new(Arc::new(backend), UploadSettings::default());
    let tracker = handle.tracker.clone();
    let mut events = tracker.subscribe();

    let submission = tracker.submit(vec![pdf("broken.pdf", 100)], Category::samacheer()).await.unwrap();
    let upload_id = submission.handles[0].upload_id();
    let outcome = submission.handles.into_iter().next().unwrap().outcome().await.unwrap();
    assert_eq!(outcome, UploadOutcome::Failed("Only PDF files are allowed".to_string()));

    let task = tracker.task(upload_id).await.unwrap().unwrap();
    assert_eq!(task.status, UploadStatus::Failed);
    assert_eq!(task.progress, 50);
    assert_eq!(task.error.as_deref(), Some("Only PDF files are allowed"));

    let notice = drain(&mut events)
        .into_iter()
        .find_map(|event| match event {
            UploadEvent::Notice(notice) => Some(notice),
            _ => None,
        })
        .unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.description.contains("broken.pdf"));

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_type_never_becomes_a_task() {
    let backend = Arc::new(MockBackend::with_pages(1));
    let handle = UploadTracker::new(backend.clone(), UploadSettings::default());
    let tracker = handle.tracker.clone();
    let mut events = tracker.subscribe();

    let files = vec![
        UploadFile::from_bytes("notes.txt", "plain text"),
        pdf("chapter.pdf", 10),
    ];
    let submission = tracker.submit(files, Category::ncert()).await.unwrap();

    assert_eq!(submission.rejected.len(), 1);
    assert_eq!(submission.rejected[0].name, "notes.txt");
    assert_eq!(submission.handles.len(), 1);

    for upload in submission.handles {
        upload.outcome().await.unwrap();
    }
    let tasks = tracker.tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "chapter.pdf");
    assert_eq!(backend.uploads(), vec!["chapter.pdf".to_string()]);

    let events = drain(&mut events);
    assert!(events.iter().any(|event| matches!(event, UploadEvent::Rejected(r) if r.name == "notes.txt")));
    assert!(events.iter().any(|event| matches!(
        event,
        UploadEvent::Notice(notice) if notice.title == "Invalid file type"
    )));

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_submission_is_a_no_op() {
    let backend = Arc::new(MockBackend::default());
    let handle = UploadTracker::new(backend.clone(), UploadSettings::default());

    let submission = handle.tracker.submit(Vec::new(), Category::ncert()).await.unwrap();
    assert!(submission.is_empty());
    assert!(handle.tracker.tasks().await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
    assert!(backend.uploads().is_empty());
}

#[tokio::test]
async fn test_dismissed_task_is_not_resurrected() {
    let gate = Arc::new(Notify::new());
    let backend = MockBackend {
        pages: 3,
        upload_gate: Some(gate.clone()),
        ..Default::default()
    };
    let handle = UploadTracker::new(Arc::new(backend), UploadSettings::default());
    let tracker = handle.tracker.clone();

    let submission = tracker.submit(vec![pdf("slow.pdf", 100)], Category::ncert()).await.unwrap();
    let upload = submission.handles.into_iter().next().unwrap();

    assert!(tracker.dismiss(upload.upload_id()).await.unwrap());
    assert!(!tracker.dismiss(upload.upload_id()).await.unwrap());
    gate.notify_one();

    // The handle still resolves, the board stays empty
    assert!(matches!(upload.outcome().await.unwrap(), UploadOutcome::Succeeded(_)));
    assert!(tracker.tasks().await.unwrap().is_empty());

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_clear_finished_keeps_running_tasks() {
    let handle = UploadTracker::new(Arc::new(MockBackend::with_pages(2)), UploadSettings::default());
    let tracker = handle.tracker.clone();

    let first = tracker.submit(vec![pdf("done.pdf", 10)], Category::ncert()).await.unwrap();
    for upload in first.handles {
        upload.outcome().await.unwrap();
    }
    assert_eq!(tracker.clear_finished().await.unwrap(), 1);
    assert_eq!(tracker.clear_finished().await.unwrap(), 0);
    assert!(tracker.tasks().await.unwrap().is_empty());

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_upload_fails_the_task() {
    let handle = UploadTracker::new(Arc::new(PanickingBackend), UploadSettings::default());
    let tracker = handle.tracker.clone();

    let submission = tracker.submit(vec![pdf("crash.pdf", 100)], Category::ncert()).await.unwrap();
    let upload = submission.handles.into_iter().next().unwrap();
    let upload_id = upload.upload_id();

    assert!(matches!(upload.outcome().await.unwrap(), UploadOutcome::Failed(_)));

    let task = tracker.task(upload_id).await.unwrap().unwrap();
    assert_eq!(task.status, UploadStatus::Failed);
    assert_eq!(task.progress, 20);

    drop(tracker);
    handle.shutdown().await.unwrap();
}

fn chat_config(greeting: Option<&str>) -> ChatConfig {
    ChatConfig {
        greeting: greeting.map(str::to_string),
        category: Category::ncert(),
        quiz_mode: false,
        backend_address: "http://localhost:8000".to_string(),
        event_capacity: 64,
    }
}

#[tokio::test]
async fn test_ask_appends_user_then_assistant() {
    let backend = Arc::new(MockBackend {
        quiz: vec!["What is velocity?".to_string(), "Define speed.".to_string()],
        ..Default::default()
    });
    let handle = ChatTracker::new(backend.clone(), chat_config(Some("Hello!")));
    let tracker = handle.tracker.clone();

    let reply = tracker
        .ask("  What is motion?  ", Category::samacheer(), true)
        .await
        .unwrap()
        .unwrap()
        .reply()
        .await
        .unwrap();

    assert_eq!(reply.author, Author::Assistant);
    assert_eq!(
        reply.text,
        "Answer to: What is motion?\n\nQuiz Questions:\n1. What is velocity?\n2. Define speed."
    );

    let transcript = tracker.transcript().await.unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[0].text, "Hello!");
    assert_eq!(transcript[1].author, Author::User);
    assert_eq!(transcript[1].text, "What is motion?");
    assert_eq!(transcript[1].category, Some(Category::samacheer()));
    assert!(!tracker.is_pending().await.unwrap());

    let asked = backend.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].syllabus, Category::samacheer());
    assert!(asked[0].quiz_mode);

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_second_question_dropped_while_pending() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(MockBackend {
        ask_gate: Some(gate.clone()),
        ..Default::default()
    });
    let handle = ChatTracker::new(backend.clone(), chat_config(None));
    let tracker = handle.tracker.clone();

    let first = tracker.ask_active("First?").await.unwrap().unwrap();
    assert!(tracker.is_pending().await.unwrap());
    assert!(tracker.ask_active("Second?").await.unwrap().is_none());
    assert!(tracker.ask_active("   ").await.unwrap().is_none());

    gate.notify_one();
    assert_eq!(first.reply().await.unwrap().text, "Answer to: First?");

    let transcript = tracker.transcript().await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(backend.asked().len(), 1);

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_question_becomes_diagnostic() {
    let backend = Arc::new(MockBackend {
        ask_error: Some(500),
        ..Default::default()
    });
    let handle = ChatTracker::new(backend, chat_config(None));
    let tracker = handle.tracker.clone();
    let mut events = tracker.subscribe();

    let reply = tracker.ask_active("Why?").await.unwrap().unwrap().reply().await.unwrap();
    assert_eq!(reply.author, Author::Assistant);
    assert!(reply.text.contains("http://localhost:8000"));
    assert!(reply.text.contains("NCERT syllabus"));
    assert!(reply.text.ends_with("Error: API Error: 500"));
    assert!(!tracker.is_pending().await.unwrap());

    let events = drain(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        ChatEvent::Notice(notice) if notice.level == NoticeLevel::Error
    )));

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_switch_category_applies_to_later_questions() {
    let backend = Arc::new(MockBackend::default());
    let handle = ChatTracker::new(backend.clone(), chat_config(None));
    let tracker = handle.tracker.clone();

    tracker.ask_active("One").await.unwrap().unwrap().reply().await.unwrap();
    tracker.switch_category(Category::samacheer()).await.unwrap();
    tracker.set_quiz_mode(true).await.unwrap();
    tracker.ask_active("Two").await.unwrap().unwrap().reply().await.unwrap();

    let settings = tracker.settings().await.unwrap();
    assert_eq!(settings.category, Category::samacheer());
    assert!(settings.quiz_mode);

    let asked = backend.asked();
    assert_eq!(asked[0].syllabus, Category::ncert());
    assert!(!asked[0].quiz_mode);
    assert_eq!(asked[1].syllabus, Category::samacheer());
    assert!(asked[1].quiz_mode);

    let transcript = tracker.transcript().await.unwrap();
    assert_eq!(transcript[0].category, Some(Category::ncert()));
    assert_eq!(transcript[2].category, Some(Category::samacheer()));

    drop(tracker);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_question_clears_pending_slot() {
    let handle = ChatTracker::new(Arc::new(PanickingBackend), chat_config(None));
    let tracker = handle.tracker.clone();

    let reply = tracker.ask_active("First?").await.unwrap().unwrap().reply().await.unwrap();
    assert_eq!(reply.author, Author::Assistant);
    assert!(reply.text.starts_with("Sorry, I couldn't process your question."));
    assert!(!tracker.is_pending().await.unwrap());

    // The tracker keeps accepting questions
    let second = tracker.ask_active("Second?").await.unwrap();
    assert!(second.is_some());
    second.unwrap().reply().await.unwrap();
    assert_eq!(tracker.transcript().await.unwrap().len(), 4);

    drop(tracker);
    handle.shutdown().await.unwrap();
}
