//! The controller: owns every component and handles one event at a time.
//!
//! Nothing here blocks. Backend calls and typesetting are submitted as
//! tasks; their completions are applied by [`Controller::process_pending`],
//! which the event loop calls on every tick.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::MoaBackend;
use crate::catalog::{ModelGroups, ModelId};
use crate::error::{CatalogFetchError, GenerateError, RequestError, TypesetError};
use crate::orchestrator::{Outputs, Rendered, RenderCycle, RequestOrchestrator};
use crate::render::{SafeMarkup, Typesetter};
use crate::selection::{Control, SelectionState};
use crate::task::{Completion, RenderTarget, TaskRunner, Tasks};
use crate::view::{AggregateOutput, RegionHandle, TabbedOutputView, ViewHandles, ViewNode};

/// Catalog summary while `GET /models` is outstanding.
pub const CATALOG_LOADING: &str = "Loading models...";
/// Catalog summary when the catalog is empty or failed to load.
pub const CATALOG_EMPTY: &str = "No models available.";

/// Wires the catalog, selection, output view and orchestrator to a backend.
pub struct Controller {
    backend: Arc<dyn MoaBackend>,
    typesetter: Arc<dyn Typesetter>,
    tasks: Tasks,
    catalog: Box<dyn RegionHandle>,
    catalog_loading: bool,
    selection: SelectionState,
    tabs: TabbedOutputView,
    aggregate: AggregateOutput,
    orchestrator: RequestOrchestrator,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("selection", &self.selection)
            .field("tabs", &self.tabs)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Build a controller writing into `view`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn MoaBackend>,
        typesetter: Arc<dyn Typesetter>,
        runner: Arc<dyn TaskRunner>,
        view: ViewHandles,
    ) -> Self {
        let ViewHandles {
            catalog,
            selection,
            outputs,
            tabs,
            slots,
            aggregate,
            progress,
            busy,
            notice,
        } = view;

        Self {
            backend,
            typesetter,
            tasks: Tasks::new(runner),
            catalog,
            catalog_loading: false,
            selection: SelectionState::new(selection),
            tabs: TabbedOutputView::new(outputs, tabs, slots),
            aggregate: AggregateOutput::new(aggregate),
            orchestrator: RequestOrchestrator::new(progress, busy, notice),
        }
    }

    /// Start up: fetch the catalog.
    pub fn start(&mut self) {
        info!("Controller starting");
        self.refresh_catalog();
    }

    /// Re-fetch the catalog. No-op while a fetch is outstanding.
    pub fn refresh_catalog(&mut self) {
        if self.catalog_loading {
            debug!("Catalog fetch already outstanding");
            return;
        }
        self.catalog_loading = true;
        self.catalog
            .render_children(vec![ViewNode::Text(CATALOG_LOADING.to_string())]);

        let backend = Arc::clone(&self.backend);
        self.tasks.submit(
            move || Completion::Catalog(backend.fetch_catalog()),
            |e| Completion::Catalog(Err(CatalogFetchError::Spawn(e))),
        );
    }

    /// Flip one model's selection.
    pub fn toggle(&mut self, id: &ModelId) {
        self.selection.toggle(id, &mut self.tabs);
    }

    /// Apply a selection control activation.
    pub fn activate_control(&mut self, control: &Control) {
        self.selection.activate(control, &mut self.tabs);
    }

    /// Select or deselect every model.
    pub fn set_all(&mut self, value: bool) {
        self.selection.set_all(value, &mut self.tabs);
    }

    /// Activate the tab keyed `key`. Returns `false` for unknown keys.
    pub fn click_tab(&mut self, key: &str) -> bool {
        self.tabs.activate(key)
    }

    /// Activate the next tab.
    pub fn next_tab(&mut self) {
        self.tabs.activate_next();
    }

    /// Activate the previous tab.
    pub fn previous_tab(&mut self) {
        self.tabs.activate_previous();
    }

    /// Submit `prompt` against the current selection.
    ///
    /// # Errors
    ///
    /// Returns the rejection when the prompt or selection is empty, or a
    /// cycle is already in flight. The notice region shows it either way.
    pub fn generate(&mut self, prompt: &str) -> Result<(), GenerateError> {
        let (cycle, request) = self
            .orchestrator
            .generate(prompt, self.selection.selected())?;

        let backend = Arc::clone(&self.backend);
        self.tasks.submit(
            move || Completion::Generate {
                cycle,
                result: backend.generate(&request),
            },
            |e| Completion::Generate {
                cycle,
                result: Err(RequestError::Spawn(e)),
            },
        );
        Ok(())
    }

    /// Apply every completion that has arrived. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let batch = self.tasks.drain();
            if batch.is_empty() {
                return applied;
            }
            for completion in batch {
                self.handle_completion(completion);
                applied += 1;
            }
        }
    }

    /// Apply one completion.
    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Catalog(result) => {
                self.catalog_loading = false;
                let groups = match result {
                    Ok(identifiers) => ModelGroups::from_identifiers(identifiers),
                    Err(err) => {
                        warn!(error = %err, "Failed to load model catalog");
                        ModelGroups::default()
                    }
                };
                self.install_catalog(groups);
            }
            Completion::Generate { cycle, result } => {
                let rendered = self.orchestrator.complete(
                    cycle,
                    result,
                    Outputs {
                        tabs: &mut self.tabs,
                        aggregate: &mut self.aggregate,
                    },
                );
                for node in rendered {
                    self.typeset(node);
                }
            }
            Completion::Typeset {
                target,
                revision,
                result,
            } => self.apply_typeset(target, revision, result),
        }
    }

    /// Selection controls in display order.
    #[must_use]
    pub fn controls(&self) -> Vec<Control> {
        self.selection.controls()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &ModelId) -> bool {
        self.selection.is_selected(id)
    }

    /// Whether every model is selected.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        self.selection.all_selected()
    }

    /// Whether a render cycle is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Whether a catalog fetch is outstanding.
    #[must_use]
    pub const fn is_loading_catalog(&self) -> bool {
        self.catalog_loading
    }

    /// The selection state.
    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The tabbed output view.
    #[must_use]
    pub const fn tabs(&self) -> &TabbedOutputView {
        &self.tabs
    }

    /// The aggregate output.
    #[must_use]
    pub const fn aggregate(&self) -> &AggregateOutput {
        &self.aggregate
    }

    /// The in-flight or most recent render cycle.
    #[must_use]
    pub const fn cycle(&self) -> Option<&RenderCycle> {
        self.orchestrator.cycle()
    }

    fn install_catalog(&mut self, groups: ModelGroups) {
        let summary = if groups.is_empty() {
            CATALOG_EMPTY.to_string()
        } else {
            let models = groups.model_count();
            let providers = groups.groups().len();
            format!(
                "{models} {} from {providers} {}",
                plural(models, "model"),
                plural(providers, "provider")
            )
        };
        info!(models = groups.model_count(), "Model catalog loaded");
        self.catalog.render_children(vec![ViewNode::Text(summary)]);
        self.selection.initialize(groups);
        self.tabs.rebuild(&[]);
    }

    fn typeset(&self, node: Rendered) {
        let typesetter = Arc::clone(&self.typesetter);
        let Rendered {
            target,
            revision,
            markup,
        } = node;
        let lost_target = target.clone();
        self.tasks.submit(
            move || Completion::Typeset {
                result: typesetter.typeset(&markup),
                target,
                revision,
            },
            move |_| Completion::Typeset {
                target: lost_target,
                revision,
                result: Err(TypesetError::Unscheduled),
            },
        );
    }

    fn apply_typeset(
        &mut self,
        target: RenderTarget,
        revision: u64,
        result: Result<SafeMarkup, TypesetError>,
    ) {
        let markup = match result {
            Ok(markup) => markup,
            Err(err) => {
                warn!(?target, error = %err, "Typesetting failed; leaving markup as is");
                return;
            }
        };
        match target {
            RenderTarget::Slot(key) => {
                self.tabs.apply_typeset(&key, revision, markup);
            }
            RenderTarget::Aggregate => {
                self.aggregate.apply_typeset(revision, markup);
            }
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
