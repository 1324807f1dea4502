use crate::{Body, CancellationSignal};

/// An outbound HTTP request.
pub type Request = http::Request<Body>;

/// An HTTP response with any status code.
pub type Response = http::Response<Body>;

/// A request travelling through the pipeline together with the signal that
/// may cancel it.
///
/// Every stage receives an `Exchange`. Wrapping stages may replace the
/// signal (the timeout stage hands its inner stage a narrower one) but
/// never touch the body.
#[derive(Debug)]
pub struct Exchange {
    request: Request,
    signal: CancellationSignal,
}

impl Exchange {
    /// Pairs a request with a cancellation signal.
    pub fn new(request: Request, signal: CancellationSignal) -> Self {
        Self { request, signal }
    }

    /// The request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Mutable access to the request, for stages that add headers.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// The signal the caller (or an outer stage) may fire.
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Replaces the signal, keeping the request.
    pub fn with_signal(self, signal: CancellationSignal) -> Self {
        Self {
            request: self.request,
            signal,
        }
    }

    /// Splits the exchange into its request and signal.
    pub fn into_parts(self) -> (Request, CancellationSignal) {
        (self.request, self.signal)
    }

    /// Copies the exchange for another attempt.
    ///
    /// Returns `None` when the body is streaming and cannot be replayed. The
    /// copy shares the same signal.
    pub fn try_clone(&self) -> Option<Self> {
        let body = self.request.body().try_clone()?;

        let mut request = Request::new(body);
        *request.method_mut() = self.request.method().clone();
        *request.uri_mut() = self.request.uri().clone();
        *request.version_mut() = self.request.version();
        *request.headers_mut() = self.request.headers().clone();
        *request.extensions_mut() = self.request.extensions().clone();

        Some(Self {
            request,
            signal: self.signal.clone(),
        })
    }
}
