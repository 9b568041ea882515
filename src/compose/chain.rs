use std::fmt;

/// A wrapper that decorates a handler and returns the decorated handler.
pub type Middleware<H> = Box<dyn Fn(H) -> H + Send + Sync>;

/// Ordered list of middleware applied around a base handler.
///
/// Middleware registered first wraps outermost, so it is the first to see a request and the
/// last to see the response.
pub struct MiddlewareChain<H> {
    layers: Vec<Middleware<H>>,
}

impl<H> MiddlewareChain<H> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Builder-style variant of [`MiddlewareChain::use_middleware`].
    pub fn with<F>(mut self, middleware: F) -> Self
    where
        F: Fn(H) -> H + Send + Sync + 'static,
    {
        self.use_middleware(middleware);
        self
    }

    pub fn use_middleware<F>(&mut self, middleware: F)
    where
        F: Fn(H) -> H + Send + Sync + 'static,
    {
        self.layers.push(Box::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Applies every layer around `base`, innermost last-registered.
    pub fn wrap(&self, base: H) -> H {
        self.layers
            .iter()
            .rev()
            .fold(base, |handler, layer| layer(handler))
    }
}

impl<H> Default for MiddlewareChain<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for MiddlewareChain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("layers", &self.layers.len())
            .finish()
    }
}
