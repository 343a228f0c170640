//! `QuizServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session coordinator.

use std::net::SocketAddr;
use std::sync::Arc;

use quizwire_protocol::JsonCodec;
use quizwire_room::{CoordinatorConfig, QuestionProvider, SessionCoordinator, StaticQuestionBank};
use quizwire_transport::{Transport, WebSocketTransport};

use crate::QuizwireError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a Quizwire server.
///
/// # Example
///
/// ```rust,ignore
/// let server = QuizServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct QuizServerBuilder {
    bind_addr: String,
    coordinator_config: CoordinatorConfig,
    questions: Option<Arc<dyn QuestionProvider>>,
}

impl QuizServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            coordinator_config: CoordinatorConfig::default(),
            questions: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets room defaults, timing, and channel sizes.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator_config = config;
        self
    }

    /// Sets where questions come from. Defaults to
    /// [`StaticQuestionBank::builtin`].
    pub fn questions(mut self, questions: Arc<dyn QuestionProvider>) -> Self {
        self.questions = Some(questions);
        self
    }

    /// Binds the listener and sets up the coordinator.
    pub async fn build(self) -> Result<QuizServer, QuizwireError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let questions = self
            .questions
            .unwrap_or_else(|| Arc::new(StaticQuestionBank::builtin()));
        let coordinator = Arc::new(SessionCoordinator::in_memory(
            self.coordinator_config,
            questions,
        ));

        Ok(QuizServer {
            transport,
            coordinator,
            codec: JsonCodec,
        })
    }
}

impl Default for QuizServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Quizwire server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizServer {
    transport: WebSocketTransport,
    coordinator: Arc<SessionCoordinator>,
    codec: JsonCodec,
}

impl QuizServer {
    pub fn builder() -> QuizServerBuilder {
        QuizServerBuilder::new()
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, QuizwireError> {
        Ok(self.transport.local_addr()?)
    }

    /// The coordinator shared by every connection.
    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own handler task. A failed accept
    /// or handshake is logged and the loop keeps going.
    pub async fn run(mut self) -> Result<(), QuizwireError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Quizwire server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let coordinator = Arc::clone(&self.coordinator);
                    let codec = self.codec;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, coordinator, codec).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
