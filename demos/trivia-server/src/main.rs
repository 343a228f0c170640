//! Standalone trivia server with the built-in question bank.
//!
//! ```text
//! QUIZWIRE_BIND=0.0.0.0:9000 RUST_LOG=debug cargo run -p trivia-server
//! ```

use std::sync::Arc;

use quizwire::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), QuizwireError> {
    quizwire::telemetry::init();

    let bind = std::env::var("QUIZWIRE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let bank = StaticQuestionBank::builtin();
    tracing::info!(
        categories = ?bank.categories().collect::<Vec<_>>(),
        "loaded question bank"
    );

    let server = QuizServer::builder()
        .bind(&bind)
        .questions(Arc::new(bank))
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "trivia server ready");

    server.run().await
}
