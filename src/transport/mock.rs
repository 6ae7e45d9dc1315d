use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{PbiError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(String),
}

#[derive(Debug)]
struct Route {
    method: Method,
    url: String,
    replies: VecDeque<Reply>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// Scripted transport for tests and dry runs.
///
/// Replies are queued per method and URL and served in order. The last reply of a route
/// keeps being served once the queue is down to one. Requests with no route get a 404.
/// Clones share state, so a test can keep one handle and give another to the client.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, method: Method, url: &str, reply: Reply) {
        let mut state = self.lock();
        if let Some(route) = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.url == url)
        {
            route.replies.push_back(reply);
            return;
        }
        state.routes.push(Route {
            method,
            url: url.to_string(),
            replies: VecDeque::from([reply]),
        });
    }

    /// Queue a response for `method url`.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<String>) {
        self.push(method, url, Reply::Response(HttpResponse::new(status, body)));
    }

    /// Queue a connection-level failure for `method url`.
    pub fn fail(&self, method: Method, url: &str, message: impl Into<String>) {
        self.push(method, url, Reply::Failure(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.lock().requests.last().cloned()
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.lock();
        let method = request.method;
        let url = request.url.clone();
        state.requests.push(request);

        let reply = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.url == url)
            .and_then(|route| {
                if route.replies.len() > 1 {
                    route.replies.pop_front()
                } else {
                    route.replies.front().cloned()
                }
            });

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(PbiError::Transport(message)),
            None => Ok(HttpResponse::new(404, format!("no mock for {} {}", method, url))),
        }
    }
}
