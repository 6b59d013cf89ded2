use chrono::{ SecondsFormat, Utc };
use log::{ debug, error, info };
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::SisterApi;
use crate::models::api::ChatContext;
use crate::models::chat::Message;
use crate::models::push::PushEvent;
use crate::push::{ PushChannel, PushSubscription };
use crate::render::Renderer;
use super::{ ChatSession, SendOutcome };

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Page path reported as chat context.
    pub page: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { page: "/".to_string() }
    }
}

/// Drives a [`ChatSession`] against the backend.
///
/// Every mutation goes through the session mutex and is followed by a
/// render. The lock is never held while a request is in flight, so push
/// messages land while a send is pending.
pub struct SessionController {
    session: Arc<Mutex<ChatSession>>,
    api: Arc<dyn SisterApi>,
    renderer: Arc<dyn Renderer>,
    options: SessionOptions,
    push: Option<PushSubscription>,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn SisterApi>,
        renderer: Arc<dyn Renderer>,
        options: SessionOptions
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ChatSession::new())),
            api,
            renderer,
            options,
            push: None,
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.session.lock().await.messages().to_vec()
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_open()
    }

    pub async fn awaiting_reply(&self) -> bool {
        self.session.lock().await.awaiting_reply()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.session.lock().await.set_input(text);
    }

    /// Sends whatever is in the input buffer.
    pub async fn submit_input(&self) -> SendOutcome {
        let text = self.session.lock().await.input().to_string();
        self.send_user_message(&text).await
    }

    pub async fn send_user_message(&self, text: &str) -> SendOutcome {
        {
            let mut session = self.session.lock().await;
            if let Err(outcome) = session.begin_send(text) {
                return outcome;
            }
            self.renderer.render(&session.view());
        }

        let context = ChatContext {
            page: self.options.page.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let reply = match self.api.send_chat(text, context).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!("Chat error: {}", e);
                None
            }
        };

        let mut session = self.session.lock().await;
        let outcome = session.finish_send(reply);
        self.renderer.render(&session.view());
        outcome
    }

    /// Restores recent server history. Returns whether the list was replaced.
    pub async fn load_history(&self) -> bool {
        let history = match self.api.fetch_history().await {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load chat history: {}", e);
                return false;
            }
        };
        debug!("Fetched {} history entries", history.len());

        let mut session = self.session.lock().await;
        let replaced = session.apply_history(history);
        if replaced {
            self.renderer.render(&session.view());
        }
        replaced
    }

    pub async fn receive_push(&self, message: impl Into<String>) {
        deliver_push(&self.session, self.renderer.as_ref(), message.into()).await;
    }

    pub async fn toggle_open(&self) -> bool {
        let mut session = self.session.lock().await;
        let open = session.toggle_open();
        if open {
            self.renderer.scroll_to_bottom();
        }
        self.renderer.render(&session.view());
        open
    }

    /// Routes push events into the session until the channel closes.
    /// Replaces (and aborts) any previous subscription.
    pub fn attach_push(&mut self, channel: PushChannel) {
        let (mut events, connection) = channel.into_parts();
        let session = self.session.clone();
        let renderer = self.renderer.clone();
        let forwarder: JoinHandle<()> = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PushEvent::Connected => info!("Connected to Sister Chat push channel"),
                    PushEvent::Disconnected => info!("Disconnected from Sister Chat push channel"),
                    PushEvent::SisterResponse { message } => {
                        deliver_push(&session, renderer.as_ref(), message).await;
                    }
                }
            }
            debug!("Push channel closed");
        });
        self.push = Some(PushSubscription::new(forwarder, connection));
    }

    pub fn has_push(&self) -> bool {
        self.push.as_ref().map_or(false, |sub| !sub.is_finished())
    }

    /// Tears down the push subscription. The session itself lives until drop.
    pub fn shutdown(&mut self) {
        if let Some(sub) = self.push.take() {
            sub.abort();
        }
    }
}

async fn deliver_push(session: &Mutex<ChatSession>, renderer: &dyn Renderer, message: String) {
    let mut session = session.lock().await;
    session.receive_push(message);
    renderer.render(&session.view());
}
