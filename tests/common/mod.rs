//! Common test utilities shared across integration tests

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use moa_console::backend::{MoaBackend, MoaRequest, MoaResponse};
use moa_console::controller::Controller;
use moa_console::error::{CatalogFetchError, RequestError};
use moa_console::render::UnicodeTypesetter;
use moa_console::task::{InlineRunner, Job, TaskRunner};
use moa_console::view::{SharedRegion, SharedView, ViewNode};
use parking_lot::Mutex;

/// Backend answering from canned data and recording every request.
#[derive(Default)]
pub struct FakeBackend {
    pub catalog: Mutex<Option<Result<Vec<String>, u16>>>,
    pub responses: Mutex<VecDeque<Result<MoaResponse, u16>>>,
    pub requests: Mutex<Vec<MoaRequest>>,
}

impl FakeBackend {
    pub fn with_catalog(identifiers: &[&str]) -> Arc<Self> {
        let backend = Self::default();
        *backend.catalog.lock() = Some(Ok(identifiers.iter().map(|s| (*s).to_string()).collect()));
        Arc::new(backend)
    }

    pub fn failing_catalog(status: u16) -> Arc<Self> {
        let backend = Self::default();
        *backend.catalog.lock() = Some(Err(status));
        Arc::new(backend)
    }

    pub fn respond(&self, proposals: &[(&str, &str)], aggregate: &str) {
        self.responses.lock().push_back(Ok(MoaResponse {
            proposals: proposals
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            aggregated_response: aggregate.to_string(),
        }));
    }

    pub fn fail_with(&self, status: u16) {
        self.responses.lock().push_back(Err(status));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl MoaBackend for FakeBackend {
    fn fetch_catalog(&self) -> Result<Vec<String>, CatalogFetchError> {
        match self.catalog.lock().clone() {
            Some(Ok(ids)) => Ok(ids),
            Some(Err(status)) => Err(CatalogFetchError::Status(status)),
            None => Ok(Vec::new()),
        }
    }

    fn generate(&self, request: &MoaRequest) -> Result<MoaResponse, RequestError> {
        self.requests.lock().push(request.clone());
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(status)) => Err(RequestError::Status(status)),
            None => Err(RequestError::Status(500)),
        }
    }
}

/// Runner that holds jobs until released, so a cycle can stay in flight.
#[derive(Default)]
pub struct ManualRunner {
    jobs: Mutex<Vec<Job>>,
}

impl ManualRunner {
    /// Run every held job, in submission order.
    pub fn release(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let count = jobs.len();
        for job in jobs {
            job();
        }
        count
    }
}

impl TaskRunner for ManualRunner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        self.jobs.lock().push(job);
        Ok(())
    }
}

/// A started controller over fake collaborators.
pub struct TestFixture {
    pub controller: Controller,
    pub view: SharedView,
    pub backend: Arc<FakeBackend>,
}

impl TestFixture {
    /// Controller whose tasks run inline, with the catalog already loaded.
    pub fn new(backend: Arc<FakeBackend>) -> Self {
        Self::with_runner(backend, Arc::new(InlineRunner), |_| {})
    }

    /// Controller over `runner`; `release` runs held jobs before the first drain.
    pub fn with_runner(
        backend: Arc<FakeBackend>,
        runner: Arc<dyn TaskRunner>,
        release: impl FnOnce(&Controller),
    ) -> Self {
        let view = SharedView::new();
        let shared: Arc<dyn MoaBackend> = Arc::clone(&backend) as Arc<dyn MoaBackend>;
        let mut controller = Controller::new(
            shared,
            Arc::new(UnicodeTypesetter),
            runner,
            view.handles(),
        );
        controller.start();
        release(&controller);
        controller.process_pending();
        Self {
            controller,
            view,
            backend,
        }
    }
}

/// First text node of a region.
pub fn text_of(region: &SharedRegion) -> Option<String> {
    region.snapshot().children.into_iter().find_map(|node| match node {
        ViewNode::Text(text) => Some(text),
        _ => None,
    })
}

/// Markup of the slot keyed `key`, as shown in the content region.
pub fn slot_markup(view: &SharedView, key: &str) -> Option<String> {
    match view.slots.snapshot().child(key) {
        Some(ViewNode::Slot { markup, .. }) => Some(markup.as_str().to_string()),
        _ => None,
    }
}

/// Markup shown in the aggregate region.
pub fn aggregate_markup(view: &SharedView) -> Option<String> {
    view.aggregate
        .snapshot()
        .children
        .into_iter()
        .find_map(|node| match node {
            ViewNode::Markup(markup) => Some(markup.into_string()),
            _ => None,
        })
}
