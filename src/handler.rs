//! Handler trait and type erasure.
//!
//! # The contract
//!
//! Every endpoint and every middleware-wrapped chain is a value of the same
//! shape:
//!
//! ```text
//! async fn name(ctx: Ctx, res: Responder, req: Request) -> Result<(), Error>
//! ```
//!
//! On success the handler has already committed its response through
//! [`Responder::respond`](crate::Responder::respond) and returns `Ok(())`.
//! On failure it returns the error and writes nothing; translation
//! middleware decides what the client sees.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* concrete types in a single
//! `HashMap<Method, Tree>`. Rust collections hold one type, so handlers are
//! erased behind `dyn ErasedHandler` and stored uniformly:
//!
//! ```text
//! async fn test(ctx, res, req) -> Result<(), Error>   ← user writes this
//!        ↓ app.on(Method::GET, "/test", test)
//! test.into_boxed()                                   ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(test))                           ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx, res, req)  at request time        ← one vtable dispatch
//! ```
//!
//! Middleware composition happens on `BoxedHandler` values, so a fully
//! wrapped chain is indistinguishable from a bare endpoint. The runtime cost
//! per request is one `Arc` clone and one virtual call per layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::request::Request;
use crate::responder::Responder;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased request future.
///
/// `Pin<Box<…>>` because the runtime polls the future in place; `Send +
/// 'static` so tokio may move it across worker threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed` method. External
/// crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Ctx, res: Responder, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership without copying the
/// handler. Middleware wraps values of this type.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a `Send` future) with the signature:
///
/// ```text
/// async fn name(ctx: Ctx, res: Responder, req: Request) -> Result<(), Error>
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Ctx, Responder, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Ctx, Responder, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_boxed(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Ctx, Responder, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, ctx: Ctx, res: Responder, req: Request) -> BoxFuture {
        Box::pin((self.0)(ctx, res, req))
    }
}
