//! Request pipeline: middleware stages and their composition.
//!
//! A stage receives the request and a [`Next`] continuation. It may replace
//! the request before calling `next.run(..)`, and may post-process the
//! response `next` returns. [`sequence`] nests stages in list order, so the
//! first stage sees the request first and the response last.

pub mod auth;
pub mod locale;
pub mod security_headers;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Terminal<'a> = Box<dyn FnOnce(Request<Body>) -> BoxFuture<'a, Response> + Send + 'a>;

/// One pipeline stage.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response;
}

/// The rest of the pipeline after the current stage.
///
/// Consumed by [`Next::run`]; a stage that returns without calling it
/// short-circuits every later stage and the terminal handler.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    terminal: Terminal<'a>,
}

impl Next<'_> {
    pub async fn run(self, request: Request<Body>) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    terminal: self.terminal,
                };
                stage.handle(request, next).await
            }
            None => (self.terminal)(request).await,
        }
    }
}

/// An ordered list of stages behaving as a single stage.
#[derive(Clone, Default)]
pub struct Sequence {
    stages: Arc<[Arc<dyn Middleware>]>,
}

/// Composes `stages` so that stage 1 wraps stage 2 wraps … the terminal handler.
pub fn sequence(stages: Vec<Arc<dyn Middleware>>) -> Sequence {
    Sequence {
        stages: stages.into(),
    }
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Drives `request` through every stage and then `terminal`.
    pub async fn run<'a, F, Fut>(&'a self, request: Request<Body>, terminal: F) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut + Send + 'a,
        Fut: Future<Output = Response> + Send + 'a,
    {
        let terminal: Terminal<'a> = Box::new(move |request| Box::pin(terminal(request)));
        Next {
            stages: &self.stages,
            terminal,
        }
        .run(request)
        .await
    }
}

#[async_trait]
impl Middleware for Sequence {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        self.run(request, move |request| next.run(request)).await
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence").field("stages", &self.stages.len()).finish()
    }
}

/// Runs a [`Sequence`] in front of the axum router.
///
/// Mount with `axum::middleware::from_fn_with_state(sequence, run_pipeline)`.
pub async fn run_pipeline(
    State(pipeline): State<Sequence>,
    request: Request,
    next: axum::middleware::Next,
) -> Response {
    pipeline.run(request, move |request| next.run(request)).await
}
