//! Calculator demo.
//!
//! Serves `add` and `div` on an in-memory broker, calls each a few times and
//! shuts down. Settings come from `gale.toml` / `GALE_*` like any Gale
//! service; try `GALE_LOGGING__LEVEL=debug`.

use std::sync::Arc;
use std::time::Duration;

use gale::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Operands {
    a: i64,
    b: i64,
}

#[derive(Debug, Serialize)]
struct Outcome<T> {
    result: T,
}

#[derive(Debug, Error)]
enum CalcError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("invalid operands: {0}")]
    InvalidOperands(#[from] serde_json::Error),
}

async fn add(_ctx: Context, req: Request) -> Result<Response, CalcError> {
    let Operands { a, b } = req.json()?;
    let result = a.checked_add(b).ok_or(CalcError::Overflow)?;
    Ok(Response::json(&Outcome { result }))
}

async fn div(_ctx: Context, req: Request) -> Result<Response, CalcError> {
    let Operands { a, b } = req.json()?;
    if b == 0 {
        return Err(CalcError::DivisionByZero);
    }
    Ok(Response::json(&Outcome {
        result: a as f64 / b as f64,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_from_config(&config.logging);

    let broker = MemoryBroker::new();
    let mut server = Server::builder(config.server)
        .error_handler(|ctx, err| {
            warn!(subject = ctx.subject(), error = %err, "Reply lost");
        })
        .connect(&broker)
        .await?;
    server.handle("add", add).handle("div", div);
    server.use_middleware([trace(), request_id(), recover(), timeout()]);

    let server = Arc::new(server);
    let running = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run().await }
    });
    if server.ready().await != ServerState::Running {
        return Ok(running.await??);
    }

    let calls = [
        ("add", r#"{"a":2,"b":3}"#),
        ("div", r#"{"a":7,"b":2}"#),
        ("div", r#"{"a":1,"b":0}"#),
        ("add", r#"{"a":"two"}"#),
    ];
    for (subject, payload) in calls {
        let reply = broker
            .request(subject, Headers::new(), payload, server.timeout())
            .await?;
        match Response::error_from_headers(&reply.headers) {
            Some(error) => warn!(subject, payload, error, "Call failed"),
            None => info!(
                subject,
                payload,
                reply = %String::from_utf8_lossy(&reply.payload),
                "Call succeeded"
            ),
        }
    }

    server.shutdown(Duration::from_secs(1)).await?;
    running.await??;
    Ok(())
}
