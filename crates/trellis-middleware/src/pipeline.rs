//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] is a list of middleware stages that run in the order they
//! were added. The application owns one global pipeline; every route group
//! owns another one that runs after the global stages and before the route
//! handler.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered middleware pipeline.
///
/// Cloning a pipeline is cheap: stages are reference counted.
///
/// # Example
///
/// ```
/// use trellis_middleware::Pipeline;
///
/// let pipeline = Pipeline::builder().build();
/// assert!(pipeline.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Appends a stage. It runs after every stage added before it.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.stages.push(Arc::new(middleware));
    }

    /// Appends an already shared stage.
    pub fn push_boxed(&mut self, middleware: BoxedMiddleware) {
        self.stages.push(middleware);
    }

    /// Appends every stage of `other`, keeping their order.
    pub fn extend(&mut self, other: &Pipeline) {
        self.stages.extend(other.stages.iter().cloned());
    }

    /// Builds the chain for one request, ending in `terminal`.
    pub fn chain<'a, H>(&'a self, terminal: H) -> Next<'a>
    where
        H: for<'c> FnOnce(&'c mut MiddlewareContext, Request) -> BoxFuture<'c, Response>
            + Send
            + 'a,
    {
        let mut next = Next::handler(terminal);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Processes a request through every stage and then `terminal`.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        terminal: H,
    ) -> Response
    where
        H: for<'c> FnOnce(&'c mut MiddlewareContext, Request) -> BoxFuture<'c, Response> + Send,
    {
        tracing::trace!(stages = self.stages.len(), "running middleware pipeline");
        self.chain(terminal).run(ctx, request).await
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage.
    #[must_use]
    pub fn stage(mut self, middleware: impl Middleware) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
