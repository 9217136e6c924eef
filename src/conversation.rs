use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::config::Config;
use crate::context::ContextBundle;
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Append-only message history for one session, plus the most recent
/// workspace bundle waiting to ride along with the next chat turn.
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: Option<ContextBundle>,
}

impl Conversation {
    pub fn new(cwd: &Path) -> Self {
        let system = format!(
            "You are a helpful coding assistant. You have access to the user's filesystem.\n\
             Current directory: {}",
            cwd.display()
        );
        Self { messages: vec![ChatMessage::system(system)], pending: None }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replaces whatever bundle was waiting; only the newest one is kept.
    pub fn set_pending_context(&mut self, bundle: ContextBundle) {
        self.pending = Some(bundle);
    }

    pub fn clear_pending_context(&mut self) {
        self.pending = None;
    }

    pub fn has_pending_context(&self) -> bool {
        self.pending.is_some()
    }

    /// Sends one user turn. A pending bundle is consumed exactly once: its
    /// rendering is prepended to this turn and cleared before the call, so
    /// a failed call still uses it up. On failure the user turn stays in
    /// history and no assistant turn is added.
    pub async fn send(
        &mut self,
        backend: &dyn Backend,
        cfg: &Config,
        text: &str,
    ) -> Result<String, BackendError> {
        let content = match self.pending.take() {
            Some(bundle) => format!("{}\n\n{}", bundle.render(), text),
            None => text.to_string(),
        };
        self.messages.push(ChatMessage::user(content));
        let reply = backend.complete(&self.messages, cfg).await?;
        self.messages.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FileEntry;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FixedBackend {
        reply: String,
    }

    #[async_trait]
    impl Backend for FixedBackend {
        async fn complete(
            &self,
            _history: &[ChatMessage],
            _cfg: &Config,
        ) -> Result<String, BackendError> {
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn complete(
            &self,
            _history: &[ChatMessage],
            _cfg: &Config,
        ) -> Result<String, BackendError> {
            Err(BackendError::EmptyResponse)
        }
    }

    fn make_conversation() -> Conversation {
        Conversation::new(&PathBuf::from("/work/proj"))
    }

    fn make_bundle() -> ContextBundle {
        ContextBundle {
            root: "proj".to_string(),
            files: vec![FileEntry {
                path: "a.txt".to_string(),
                content: "data".to_string(),
                byte_size: 4,
                truncated: false,
            }],
            tree: None,
            partial: false,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_new_seeds_system_turn() {
        let conv = make_conversation();
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert!(conv.messages()[0].content.contains("Current directory: /work/proj"));
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let mut conv = make_conversation();
        let backend = FixedBackend { reply: "sure".to_string() };
        let reply = conv
            .send(&backend, &Config::default(), "hello there")
            .await
            .unwrap();
        assert_eq!(reply, "sure");

        let messages = conv.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hello there");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "sure");
    }

    #[tokio::test]
    async fn test_pending_bundle_rides_one_turn_only() {
        let mut conv = make_conversation();
        let backend = FixedBackend { reply: "ok".to_string() };
        conv.set_pending_context(make_bundle());

        conv.send(&backend, &Config::default(), "what is this?").await.unwrap();
        let first = &conv.messages()[1].content;
        assert!(first.starts_with("Here's the current workspace context:"));
        assert!(first.contains("File: a.txt"));
        assert!(first.ends_with("what is this?"));
        assert!(!conv.has_pending_context());

        conv.send(&backend, &Config::default(), "and now?").await.unwrap();
        assert_eq!(conv.messages()[3].content, "and now?");
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_turn_without_assistant() {
        let mut conv = make_conversation();
        conv.set_pending_context(make_bundle());
        let err = conv
            .send(&FailingBackend, &Config::default(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse));

        let messages = conv.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        // The bundle was consumed by the failed turn.
        assert!(!conv.has_pending_context());
    }

    #[tokio::test]
    async fn test_newer_bundle_replaces_older() {
        let mut conv = make_conversation();
        conv.set_pending_context(make_bundle());
        let mut newer = make_bundle();
        newer.files[0].path = "b.txt".to_string();
        conv.set_pending_context(newer);

        let backend = FixedBackend { reply: "ok".to_string() };
        conv.send(&backend, &Config::default(), "go").await.unwrap();
        let sent = &conv.messages()[1].content;
        assert!(sent.contains("File: b.txt"));
        assert!(!sent.contains("File: a.txt"));
    }

    #[test]
    fn test_clear_pending_context() {
        let mut conv = make_conversation();
        conv.set_pending_context(make_bundle());
        conv.clear_pending_context();
        assert!(!conv.has_pending_context());
    }
}
