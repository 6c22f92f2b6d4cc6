//! Application routing and request dispatch.
//!
//! One radix tree per HTTP method. O(path-length) lookup. Handlers are
//! wrapped in their middleware once, at registration; dispatch is a tree
//! lookup and one call into the composed chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::{error, info, warn};

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::responder::Responder;
use crate::response::Response;
use crate::shutdown::Shutdown;

/// The application: a routing table, the middleware every route shares, and
/// the shutdown handle the dispatch layer signals when a handler reports an
/// integrity problem.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration call returns `self` so routes chain naturally.
pub struct App {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    global: Vec<Arc<dyn Middleware>>,
    fallback: BoxedHandler,
    shutdown: Shutdown,
    request_timeout: Option<Duration>,
}

impl App {
    /// Creates an application with a chain of middleware applied to every
    /// route, first entry outermost.
    ///
    /// The global chain also wraps the not-found fallback, so unmatched
    /// requests are logged and translated exactly like matched ones.
    pub fn new(
        shutdown: Shutdown,
        global: impl IntoIterator<Item = Arc<dyn Middleware>>,
    ) -> Self {
        let global: Vec<_> = global.into_iter().collect();
        let fallback = middleware::wrap(&global, not_found.into_boxed());
        Self {
            routes: HashMap::new(),
            global,
            fallback,
            shutdown,
            request_timeout: None,
        }
    }

    /// Registers a handler for a method + path pair. Returns `self` for
    /// chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves
    /// them:
    ///
    /// ```rust,no_run
    /// # use plinth::{App, Ctx, Error, Method, Request, Responder, Shutdown};
    /// # async fn get_user(_: Ctx, _: Responder, _: Request) -> Result<(), Error> { Ok(()) }
    /// # async fn create_user(_: Ctx, _: Responder, _: Request) -> Result<(), Error> { Ok(()) }
    /// App::new(Shutdown::new(), [])
    ///     .on(Method::GET, "/users/{id}", get_user)
    ///     .on(Method::POST, "/users", create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with an existing route.
    /// Routes are registered at startup; a bad table is a programming error
    /// worth failing fast on.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.on_with(method, path, handler, Vec::new())
    }

    /// Like [`on`](App::on), with extra middleware for this route alone.
    /// Route middleware runs inside the global chain, in the order given.
    pub fn on_with(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        route: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        let chain = middleware::wrap(&route, handler.into_boxed());
        let chain = middleware::wrap(&self.global, chain);
        self.routes
            .entry(method)
            .or_default()
            .insert(path, chain)
            .unwrap_or_else(|err| panic!("invalid route `{path}`: {err}"));
        self
    }

    /// Bounds every request to `limit`. A request still running at the
    /// deadline is cancelled and answered with a generic 500; the deadline
    /// is visible to handlers through [`Ctx::deadline`].
    pub fn request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = Some(limit);
        self
    }

    pub(crate) fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Routes one request and produces one response. Failures never escape:
    /// whatever happens inside the chain, the client gets an answer.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let deadline = self.request_timeout.map(|limit| Instant::now() + limit);
        let ctx = Ctx::new(deadline);
        let res = Responder::new();

        let handler = match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler
            }
            None => Arc::clone(&self.fallback),
        };

        let outcome = match deadline {
            Some(deadline) => {
                let chain = handler.call(ctx.clone(), res.clone(), req);
                match tokio::time::timeout_at(deadline.into(), chain).await {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => Err(Error::internal(anyhow!(
                        "request deadline of {:?} exceeded",
                        self.request_timeout.unwrap_or_default(),
                    ))),
                }
            }
            None => handler.call(ctx.clone(), res.clone(), req).await,
        };

        if let Err(err) = outcome {
            if err.is_shutdown() {
                info!(trace_id = %ctx.trace_id(), ?err, "integrity issue reported, signaling shutdown");
                self.shutdown.signal();
            } else if res.sent() {
                // The chain can be cancelled after a handler has responded;
                // this line is then the only record of the error.
                error!(trace_id = %ctx.trace_id(), ?err, "error after response was committed");
            }
            if !res.sent() {
                // No translation layer caught this. Answer with a bare
                // status so the client is never left hanging.
                error!(trace_id = %ctx.trace_id(), ?err, "error escaped untranslated");
                return Response::empty(err.client_status());
            }
        }

        match res.take() {
            Some(response) => response,
            None => {
                warn!(trace_id = %ctx.trace_id(), "chain completed without responding");
                Response::empty(StatusCode::OK)
            }
        }
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

async fn not_found(_ctx: Ctx, _res: Responder, _req: Request) -> Result<(), Error> {
    Err(Error::trusted(StatusCode::NOT_FOUND, "not found"))
}
