use std::cell::RefCell;
use std::collections::VecDeque;

use books_core::{HttpRequest, HttpResponse, Transport, TransportError};

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, status: u16, body: &str) -> Self {
        self.replies.borrow_mut().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
        self
    }

    pub fn then_timeout(self) -> Self {
        self.replies
            .borrow_mut()
            .push_back(Err(TransportError::Timeout));
        self
    }

    /// Register (201) and login answers for the fixed test user.
    pub fn authenticated(self) -> Self {
        self.then(201, r#"{"message":"Registration successful"}"#)
            .then(200, r#"{"token":"a.b.c"}"#)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Io("no scripted reply left".to_string())))
    }
}

pub fn book_json(id: u64, author: &str, title: &str) -> String {
    format!(r#"{{"data":{{"id":{id},"author":"{author}","title":"{title}"}}}}"#)
}
