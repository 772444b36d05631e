use chrono::Utc;
use crate::core::Category;
use super::types::{ChatEvent, ChatMessage, ChatSettings, PendingQuestion};

/// State transition requested for a chat tracker
#[derive(Debug, Clone)]
pub enum ChatUpdate {
    Ask {
        question: String,
        category: Category,
        quiz_mode: bool,
    },
    /// Answer or diagnostic for the pending question
    Reply {
        text: String,
    },
    SwitchCategory(Category),
    SetQuizMode(bool),
}

/// Transcript plus the single pending-question slot.
///
/// `Idle -> AwaitingResponse -> Idle`. An `Ask` is dropped when the question
/// is blank or a question is already pending, and a `Reply` is dropped when
/// nothing is pending. Dropped updates produce no events.
#[derive(Debug, Clone)]
pub struct ChatState {
    messages: Vec<ChatMessage>,
    pending: Option<PendingQuestion>,
    settings: ChatSettings,
}

impl ChatState {
    pub fn new(greeting: Option<String>, settings: ChatSettings) -> Self {
        let messages = greeting
            .filter(|text| !text.trim().is_empty())
            .map(ChatMessage::assistant)
            .into_iter()
            .collect();

        Self {
            messages,
            pending: None,
            settings,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn apply(&mut self, update: ChatUpdate) -> Vec<ChatEvent> {
        match update {
            ChatUpdate::Ask { question, category, quiz_mode } => {
                let question = question.trim();
                if question.is_empty() || self.pending.is_some() {
                    return Vec::new();
                }

                let message = ChatMessage::user(question, category.clone());
                self.messages.push(message.clone());
                self.pending = Some(PendingQuestion {
                    question: question.to_string(),
                    category,
                    quiz_mode,
                    asked_at: Utc::now(),
                });

                vec![
                    ChatEvent::MessageAppended(message),
                    ChatEvent::PendingChanged { pending: true },
                ]
            }
            ChatUpdate::Reply { text } => {
                if self.pending.take().is_none() {
                    return Vec::new();
                }

                let message = ChatMessage::assistant(text);
                self.messages.push(message.clone());

                vec![
                    ChatEvent::MessageAppended(message),
                    ChatEvent::PendingChanged { pending: false },
                ]
            }
            ChatUpdate::SwitchCategory(category) => {
                if self.settings.category == category {
                    return Vec::new();
                }
                self.settings.category = category.clone();
                vec![ChatEvent::CategoryChanged(category)]
            }
            ChatUpdate::SetQuizMode(quiz_mode) => {
                if self.settings.quiz_mode == quiz_mode {
                    return Vec::new();
                }
                self.settings.quiz_mode = quiz_mode;
                vec![ChatEvent::QuizModeChanged(quiz_mode)]
            }
        }
    }
}

/// Answer text followed by a numbered quiz list when the server sent one
pub fn compose_answer(answer: &str, quiz_questions: &[String]) -> String {
    if quiz_questions.is_empty() {
        return answer.to_string();
    }

    let quiz = quiz_questions
        .iter()
        .enumerate()
        .map(|(index, question)| format!("{}. {}", index + 1, question))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\nQuiz Questions:\n{}", answer, quiz)
}

/// Diagnostic shown in place of an answer when a question fails
pub fn failure_reply(backend_address: &str, category: &Category, detail: &str) -> String {
    format!(
        "Sorry, I couldn't process your question. Please make sure:\n\
         1. The backend server is running on {}\n\
         2. PDFs are uploaded for the {} syllabus\n\
         3. Your OpenAI API key is configured\n\
         \n\
         Error: {}",
        backend_address,
        category.label(),
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Author;

    fn state() -> ChatState {
        ChatState::new(
            Some("Hello!".to_string()),
            ChatSettings {
                category: Category::ncert(),
                quiz_mode: false,
            },
        )
    }

    fn ask(text: &str) -> ChatUpdate {
        ChatUpdate::Ask {
            question: text.to_string(),
            category: Category::ncert(),
            quiz_mode: false,
        }
    }

    #[test]
    fn starts_with_greeting() {
        let state = state();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].author, Author::Assistant);
        assert!(!state.is_pending());

        let silent = ChatState::new(None, state.settings().clone());
        assert!(silent.messages().is_empty());
    }

    #[test]
    fn blank_question_changes_nothing() {
        let mut state = state();
        assert!(state.apply(ask("   \n\t")).is_empty());
        assert_eq!(state.messages().len(), 1);
        assert!(!state.is_pending());
    }

    #[test]
    fn second_ask_while_pending_is_dropped() {
        let mut state = state();
        assert_eq!(state.apply(ask("  What is inertia? ")).len(), 2);
        assert_eq!(state.messages()[1].text, "What is inertia?");
        assert_eq!(state.messages()[1].category, Some(Category::ncert()));

        let before = state.messages().to_vec();
        assert!(state.apply(ask("And momentum?")).is_empty());
        assert_eq!(state.messages(), before.as_slice());
        assert_eq!(state.pending().unwrap().question, "What is inertia?");
    }

    #[test]
    fn reply_clears_pending_and_reopens_slot() {
        let mut state = state();
        state.apply(ask("What is inertia?"));
        state.apply(ChatUpdate::Reply { text: "Resistance to change in motion.".to_string() });

        assert!(!state.is_pending());
        assert_eq!(state.messages().len(), 3);
        assert_eq!(state.messages()[2].author, Author::Assistant);
        assert_eq!(state.apply(ask("And momentum?")).len(), 2);
    }

    #[test]
    fn stray_reply_is_ignored() {
        let mut state = state();
        assert!(state.apply(ChatUpdate::Reply { text: "late".to_string() }).is_empty());
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn switching_category_keeps_history() {
        let mut state = state();
        state.apply(ask("What is inertia?"));
        state.apply(ChatUpdate::SwitchCategory(Category::samacheer()));

        assert_eq!(state.settings().category, Category::samacheer());
        assert_eq!(state.messages()[1].category, Some(Category::ncert()));
        assert!(state.apply(ChatUpdate::SwitchCategory(Category::samacheer())).is_empty());
    }

    #[test]
    fn empty_quiz_list_adds_no_suffix() {
        assert_eq!(compose_answer("Plants make food.", &[]), "Plants make food.");
    }

    #[test]
    fn quiz_list_is_numbered_one_per_line() {
        let text = compose_answer("Plants make food.", &["a".to_string(), "b".to_string()]);
        assert!(text.starts_with("Plants make food.\n\n"));
        assert!(text.ends_with("\n1. a\n2. b"));
    }

    #[test]
    fn failure_reply_names_causes_and_detail() {
        let text = failure_reply("http://localhost:8000", &Category::samacheer(), "API Error: 500");
        assert!(text.contains("http://localhost:8000"));
        assert!(text.contains("SAMACHEER syllabus"));
        assert!(text.contains("API key"));
        assert!(text.ends_with("Error: API Error: 500"));
    }
}
