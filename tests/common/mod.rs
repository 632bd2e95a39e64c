#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use segroute::dispatcher::{HandlerRequest, HandlerResponse};
use segroute::router::Router;
use tracing_subscriber::fmt::MakeWriter;

/// Handler that writes `name` as the response body
pub fn tag(name: &'static str) -> impl Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync {
    move |_req, res| res.body = serde_json::json!(name)
}

pub fn request(method: Method, target: &str) -> HandlerRequest {
    HandlerRequest::new(method, target)
}

/// Find and run a request directly against the router, without a dispatcher
pub fn serve(router: &Router, method: Method, target: &str) -> Option<HandlerResponse> {
    let mut req = request(method, target);
    let mut route_match = router.find(req.method.as_str(), &req.path).into_match()?;
    req.path_params = std::mem::take(&mut route_match.path_params);
    let mut res = HandlerResponse::default();
    route_match.run(&mut req, &mut res);
    Some(res)
}

/// Shared ordered log for chain-order assertions
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// Captures formatted tracing output for the current thread
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl CapturedLogs {
    pub fn init() -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(BufferWriter(Arc::clone(&buffer)))
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            buffer,
            _guard: guard,
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
