use httpmock::prelude::*;
use httpmock::{
    Mock,
    Then,
    When,
};
use serde_json::json;

// An httpmock-backed stand-in for the Kubernetes apiserver.  Handlers are queued up with
// `handle*` and only registered with the mock server on `build()`, so that the catch-all
// logging rule always goes last.
pub struct FakeApiServer {
    server: MockServer,
    handlers: Vec<Box<dyn Fn(When, Then)>>,
    mock_ids: Vec<usize>,
}

fn print_req(req: &HttpMockRequest) -> bool {
    // println instead of info! so this works without pulling tracing into the test utils
    println!("    Received: {} {}", req.method(), req.uri());
    true
}

impl FakeApiServer {
    pub fn new() -> FakeApiServer {
        FakeApiServer {
            server: MockServer::start(),
            handlers: vec![],
            mock_ids: vec![],
        }
    }

    pub fn assert(&self) {
        for id in &self.mock_ids {
            println!("checking assertions for mock {id}");
            Mock::new(*id, &self.server).assert()
        }
    }

    pub fn handle<F: Fn(When, Then) + 'static>(&mut self, f: F) -> &mut Self {
        self.handlers.push(Box::new(move |w, t| {
            let w = w.is_true(print_req);
            f(w, t);
        }));
        self
    }

    pub fn handle_list(&mut self, path: &str, api_version: &str, items: serde_json::Value) -> &mut Self {
        let (path, body) = (path.to_string(), list_body(api_version, items));
        self.handle(move |when, then| {
            when.path(&path).method(GET);
            then.json_body(body.clone());
        })
    }

    pub fn handle_not_found(&mut self, path: &str) -> &mut Self {
        let path = path.to_string();
        self.handle(move |when, then| {
            when.path(&path);
            then.status(404).json_body(status_not_found());
        })
    }

    pub fn handle_server_error(&mut self, path: &str) -> &mut Self {
        let path = path.to_string();
        self.handle(move |when, then| {
            when.path(&path);
            then.status(500).json_body(status_internal_error());
        })
    }

    pub fn build(&mut self) {
        for f in self.handlers.iter() {
            self.mock_ids.push(self.server.mock(f).id);
        }

        // Print all unmatched/unhandled requests for easier debugging
        self.server.mock(|when, _| {
            when.is_true(print_req);
        });
    }

    pub fn url(&self) -> http::Uri {
        http::Uri::try_from(self.server.url("/")).unwrap()
    }
}

impl Default for FakeApiServer {
    fn default() -> Self {
        FakeApiServer::new()
    }
}

pub fn make_fake_apiserver() -> (FakeApiServer, kube::Client) {
    let fake = FakeApiServer::new();
    let config = kube::Config::new(fake.url());
    let client = kube::Client::try_from(config).unwrap();
    (fake, client)
}

pub fn list_body(api_version: &str, items: serde_json::Value) -> serde_json::Value {
    json!({
        "kind": "List",
        "apiVersion": api_version,
        "items": items,
        "metadata": {"resourceVersion": "1"},
    })
}

pub fn status_not_found() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "reason": "NotFound",
      "code": 404
    })
}

pub fn status_internal_error() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "reason": "InternalError",
      "code": 500
    })
}
