//! Typed operation pipeline
//!
//! An [`Operation`] is an asynchronous, cancellable computation from one
//! input value to one result. Operations are built once from reusable pieces
//! (a transport- or storage-bound base, an input converter, an output
//! parser) and invoked many times; they hold no per-invocation state beyond
//! their shared collaborators.
//!
//! Composition is plain function chaining: [`Operation::pipe`] attaches an
//! additional output parser without re-touching the base operation, and
//! [`Operation::adapt_input`] prepends an input converter applied once before
//! dispatch.

pub mod remote;
pub mod storage;

use std::future::Future;
use std::sync::Arc;

use courier_domain::Result;
use futures::future::BoxFuture;

type RunFn<I, O> = dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync;

/// Asynchronous computation from `I` to `O`, cheap to clone and share.
///
/// Dropping the future returned by [`Operation::call`] cancels the underlying
/// work: in-flight transport calls are aborted and any queued retry-decision
/// slot is released without ever being invoked twice.
pub struct Operation<I, O> {
    run: Arc<RunFn<I, O>>,
}

impl<I, O> Clone for Operation<I, O> {
    fn clone(&self) -> Self {
        Self { run: Arc::clone(&self.run) }
    }
}

impl<I, O> Operation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Wrap an async closure as an operation.
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self { run: Arc::new(move |input| Box::pin(run(input))) }
    }

    /// Invoke the operation once.
    ///
    /// # Errors
    /// Returns the single normalized [`courier_domain::DataError`] produced
    /// by the base operation or any parser in the chain.
    pub async fn call(&self, input: I) -> Result<O> {
        (self.run)(input).await
    }

    /// Attach an additional output parser, producing a new operation that
    /// shares the same base. The composed parser runs once, at the end.
    #[must_use]
    pub fn pipe<PO, P>(self, parser: P) -> Operation<I, PO>
    where
        P: Fn(O) -> Result<PO> + Send + Sync + 'static,
        PO: Send + 'static,
    {
        let base = self.run;
        let parser = Arc::new(parser);
        Operation {
            run: Arc::new(move |input| {
                let output = base(input);
                let parser = Arc::clone(&parser);
                Box::pin(async move { parser(output.await?) })
            }),
        }
    }

    /// Prepend an input converter, applied once at the start of each
    /// invocation.
    #[must_use]
    pub fn adapt_input<NI, C>(self, converter: C) -> Operation<NI, O>
    where
        C: Fn(NI) -> I + Send + Sync + 'static,
        NI: Send + 'static,
    {
        let base = self.run;
        Operation { run: Arc::new(move |input| base(converter(input))) }
    }
}
