//! Render cycles: one generate action from validation to demultiplexed output.

use tracing::{debug, error, info, info_span};
use uuid::Uuid;

use crate::backend::{ModelRef, MoaRequest, MoaResponse};
use crate::catalog::ModelId;
use crate::error::{GenerateError, RequestError, ValidationError};
use crate::render::{ContentRenderer, SafeMarkup};
use crate::task::RenderTarget;
use crate::view::{AggregateOutput, RegionHandle, TabbedOutputView, ViewNode};

/// Provider of the fixed aggregator model.
pub const AGGREGATOR_PROVIDER: &str = "OpenAI";
/// Name of the fixed aggregator model.
pub const AGGREGATOR_MODEL: &str = "gpt-3.5-turbo";
/// Proposal rounds per request.
pub const ROUNDS: u32 = 1;
/// Sampling temperature per request.
pub const TEMPERATURE: f64 = 0.7;
/// Token budget per request.
pub const MAX_TOKENS: u32 = 2048;

/// Notice shown for any request failure.
pub const FAILURE_NOTICE: &str =
    "An error occurred while generating the response. Please try again.";

/// Lifecycle of a [`RenderCycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Created, request not yet issued.
    Idle,
    /// Request issued, awaiting completion.
    InFlight,
    /// Response demultiplexed into the view.
    Completed,
    /// Request failed; nothing was rendered.
    Failed,
}

/// One generate action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCycle {
    id: Uuid,
    prompt: String,
    selection: Vec<ModelId>,
    progress: u8,
    state: CycleState,
}

impl RenderCycle {
    fn new(prompt: String, selection: Vec<ModelId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt,
            selection,
            progress: 0,
            state: CycleState::Idle,
        }
    }

    /// Cycle identifier carried by its completion.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Prompt captured at submit time.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Selection captured at submit time.
    #[must_use]
    pub fn selection(&self) -> &[ModelId] {
        &self.selection
    }

    /// Progress, 0 to 100.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// Outbound payload for this cycle.
    #[must_use]
    pub fn request(&self) -> MoaRequest {
        MoaRequest {
            prompt: self.prompt.clone(),
            selected_models: self.selection.iter().map(ModelRef::from).collect(),
            aggregator_config: ModelRef {
                provider: AGGREGATOR_PROVIDER.to_string(),
                model: AGGREGATOR_MODEL.to_string(),
            },
            custom_prompt: String::new(),
            rounds: ROUNDS,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

/// Markup written into a node, awaiting its typeset pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Node that received the markup.
    pub target: RenderTarget,
    /// Revision of the node after the write.
    pub revision: u64,
    /// The markup written.
    pub markup: SafeMarkup,
}

/// Targets that receive a completed response.
#[derive(Debug)]
pub struct Outputs<'a> {
    /// Per-model slots.
    pub tabs: &'a mut TabbedOutputView,
    /// Aggregate region.
    pub aggregate: &'a mut AggregateOutput,
}

/// Tracks the single in-flight cycle and the indicators around it.
pub struct RequestOrchestrator {
    progress: Box<dyn RegionHandle>,
    busy: Box<dyn RegionHandle>,
    notice: Box<dyn RegionHandle>,
    renderer: ContentRenderer,
    cycle: Option<RenderCycle>,
}

impl std::fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl RequestOrchestrator {
    /// Idle orchestrator; progress and busy indicators start hidden.
    #[must_use]
    pub fn new(
        progress: Box<dyn RegionHandle>,
        busy: Box<dyn RegionHandle>,
        notice: Box<dyn RegionHandle>,
    ) -> Self {
        let mut orchestrator = Self {
            progress,
            busy,
            notice,
            renderer: ContentRenderer::new(),
            cycle: None,
        };
        orchestrator.clear_indicators();
        orchestrator
    }

    /// Validate and start a cycle. On success the cycle is in flight and the
    /// caller must issue exactly one request with the returned payload.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Busy`] while another cycle is in flight, otherwise a
    /// [`ValidationError`] for an empty prompt or selection. Either way the
    /// reason is shown in the notice region and nothing is sent.
    pub fn generate(
        &mut self,
        prompt: &str,
        selection: Vec<ModelId>,
    ) -> Result<(Uuid, MoaRequest), GenerateError> {
        if self.is_busy() {
            debug!("Rejecting generate while a cycle is in flight");
            return Err(self.reject(GenerateError::Busy));
        }
        if prompt.trim().is_empty() {
            return Err(self.reject(ValidationError::EmptyPrompt.into()));
        }
        if selection.is_empty() {
            return Err(self.reject(ValidationError::NoModelsSelected.into()));
        }

        let mut cycle = RenderCycle::new(prompt.to_string(), selection);
        cycle.state = CycleState::InFlight;
        let request = cycle.request();
        let id = cycle.id;
        info!(cycle = %id, models = cycle.selection.len(), "Render cycle started");

        self.notice.render_children(Vec::new());
        self.busy.render_children(vec![ViewNode::Text("Generating...".to_string())]);
        self.busy.set_visible(true);
        self.progress.set_visible(true);
        self.cycle = Some(cycle);
        self.show_progress(0);

        Ok((id, request))
    }

    /// Apply the completion of cycle `id`.
    ///
    /// Returns every node written, so the caller can typeset it. Completions
    /// for any cycle other than the one in flight are ignored.
    pub fn complete(
        &mut self,
        id: Uuid,
        result: Result<MoaResponse, RequestError>,
        outputs: Outputs<'_>,
    ) -> Vec<Rendered> {
        if !self.cycle.as_ref().is_some_and(|c| c.id == id && c.state == CycleState::InFlight) {
            debug!(cycle = %id, "Ignoring completion for a cycle that is not in flight");
            return Vec::new();
        }
        let _span = info_span!("render_cycle", cycle = %id).entered();

        let rendered = match result {
            Ok(response) => {
                let rendered = self.demultiplex(response, outputs);
                self.set_state(CycleState::Completed);
                info!(nodes = rendered.len(), "Render cycle completed");
                rendered
            }
            Err(err) => {
                error!(error = %err, "Generate request failed");
                self.set_state(CycleState::Failed);
                self.notice
                    .render_children(vec![ViewNode::Text(FAILURE_NOTICE.to_string())]);
                Vec::new()
            }
        };

        self.clear_indicators();
        rendered
    }

    /// Whether a cycle is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.cycle
            .as_ref()
            .is_some_and(|c| c.state == CycleState::InFlight)
    }

    /// The in-flight or most recent cycle.
    #[must_use]
    pub const fn cycle(&self) -> Option<&RenderCycle> {
        self.cycle.as_ref()
    }

    fn demultiplex(&mut self, response: MoaResponse, outputs: Outputs<'_>) -> Vec<Rendered> {
        let total = response.proposals.len() + 1;
        let mut rendered = Vec::with_capacity(total);
        let mut done = 0;

        for (key, raw) in &response.proposals {
            let Some(slot) = outputs.tabs.slot_for_proposal(key).map(str::to_string) else {
                debug!(proposal = %key, "Dropping proposal with no matching slot");
                continue;
            };
            let markup = self.renderer.render(raw);
            if let Some(revision) = outputs.tabs.set_markup(&slot, markup.clone()) {
                debug!(proposal = %key, %slot, "Routed proposal");
                rendered.push(Rendered {
                    target: RenderTarget::Slot(slot),
                    revision,
                    markup,
                });
                done += 1;
                self.show_progress(percent(done, total));
            }
        }

        let markup = self.renderer.render(&response.aggregated_response);
        let revision = outputs.aggregate.set_markup(markup.clone());
        rendered.push(Rendered {
            target: RenderTarget::Aggregate,
            revision,
            markup,
        });
        self.show_progress(100);
        rendered
    }

    fn reject(&mut self, err: GenerateError) -> GenerateError {
        self.notice.render_children(vec![ViewNode::Text(err.to_string())]);
        err
    }

    fn set_state(&mut self, state: CycleState) {
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.state = state;
        }
    }

    fn show_progress(&mut self, value: u8) {
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.progress = value;
        }
        self.progress.render_children(vec![ViewNode::Progress(value)]);
    }

    fn clear_indicators(&mut self) {
        self.progress.render_children(Vec::new());
        self.progress.set_visible(false);
        self.busy.render_children(Vec::new());
        self.busy.set_visible(false);
    }
}

fn percent(done: usize, total: usize) -> u8 {
    u8::try_from(done * 100 / total.max(1)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::SharedRegion;
    use pretty_assertions::assert_eq;

    struct Fixture {
        orchestrator: RequestOrchestrator,
        tabs: TabbedOutputView,
        aggregate: AggregateOutput,
        progress: SharedRegion,
        busy: SharedRegion,
        notice: SharedRegion,
        content: SharedRegion,
        aggregate_region: SharedRegion,
    }

    impl Fixture {
        fn complete(
            &mut self,
            id: Uuid,
            result: Result<MoaResponse, RequestError>,
        ) -> Vec<Rendered> {
            self.orchestrator.complete(
                id,
                result,
                Outputs {
                    tabs: &mut self.tabs,
                    aggregate: &mut self.aggregate,
                },
            )
        }
    }

    fn fixture(selected: &[&str]) -> Fixture {
        let progress = SharedRegion::new();
        let busy = SharedRegion::new();
        let notice = SharedRegion::new();
        let content = SharedRegion::new();
        let aggregate_region = SharedRegion::new();
        let mut tabs = TabbedOutputView::new(
            SharedRegion::new().handle(),
            SharedRegion::new().handle(),
            content.handle(),
        );
        tabs.rebuild(&ids(selected));
        Fixture {
            orchestrator: RequestOrchestrator::new(
                progress.handle(),
                busy.handle(),
                notice.handle(),
            ),
            tabs,
            aggregate: AggregateOutput::new(aggregate_region.handle()),
            progress,
            busy,
            notice,
            content,
            aggregate_region,
        }
    }

    fn ids(raw: &[&str]) -> Vec<ModelId> {
        raw.iter().filter_map(|r| ModelId::parse(r)).collect()
    }

    fn notice_text(region: &SharedRegion) -> Option<String> {
        region.snapshot().children.into_iter().find_map(|node| match node {
            ViewNode::Text(text) => Some(text),
            _ => None,
        })
    }

    fn response(proposals: &[(&str, &str)], aggregate: &str) -> MoaResponse {
        MoaResponse {
            proposals: proposals
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            aggregated_response: aggregate.to_string(),
        }
    }

    #[test]
    fn test_request_carries_fixed_parameters() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&[]);
        let (_, request) = f
            .orchestrator
            .generate("2+2", ids(&["OpenAI gpt-4", "Anthropic claude-3"]))?;

        assert_eq!(request.prompt, "2+2");
        assert_eq!(request.selected_models.len(), 2);
        assert_eq!(request.selected_models[1].provider, "Anthropic");
        assert_eq!(request.aggregator_config.provider, "OpenAI");
        assert_eq!(request.aggregator_config.model, "gpt-3.5-turbo");
        assert_eq!(request.custom_prompt, "");
        assert_eq!(request.rounds, 1);
        assert!((request.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(request.max_tokens, 2048);
        Ok(())
    }

    #[test]
    fn test_accept_shows_indicators() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&[]);
        assert!(!f.progress.snapshot().visible);
        assert!(!f.busy.snapshot().visible);

        f.orchestrator.generate("hi", ids(&["OpenAI gpt-4"]))?;

        assert!(f.orchestrator.is_busy());
        assert!(f.busy.snapshot().visible);
        assert_eq!(f.progress.snapshot().children, vec![ViewNode::Progress(0)]);
        Ok(())
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let mut f = fixture(&[]);
        let err = f.orchestrator.generate("   \n", ids(&["OpenAI gpt-4"]));
        assert_eq!(
            err.err(),
            Some(GenerateError::Validation(ValidationError::EmptyPrompt))
        );
        assert_eq!(notice_text(&f.notice).as_deref(), Some("Please enter a prompt."));
        assert!(!f.orchestrator.is_busy());
        assert!(f.orchestrator.cycle().is_none());
    }

    #[test]
    fn test_empty_selection_rejected() {
        let mut f = fixture(&[]);
        let err = f.orchestrator.generate("2+2", Vec::new());
        assert_eq!(
            err.err(),
            Some(GenerateError::Validation(ValidationError::NoModelsSelected))
        );
        assert_eq!(
            notice_text(&f.notice).as_deref(),
            Some("Please select at least one model.")
        );
        assert!(!f.busy.snapshot().visible);
    }

    #[test]
    fn test_second_generate_while_in_flight_is_busy() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&[]);
        let (first, _) = f.orchestrator.generate("a", ids(&["OpenAI gpt-4"]))?;
        let second = f.orchestrator.generate("b", ids(&["OpenAI gpt-4"]));

        assert_eq!(second.err(), Some(GenerateError::Busy));
        assert_eq!(f.orchestrator.cycle().map(RenderCycle::id), Some(first));
        assert_eq!(f.orchestrator.cycle().map(RenderCycle::prompt), Some("a"));
        Ok(())
    }

    #[test]
    fn test_success_routes_proposals_and_aggregate() -> Result<(), Box<dyn std::error::Error>> {
        let models = ["OpenAI gpt-4", "Anthropic claude-3"];
        let mut f = fixture(&models);
        let (id, _) = f.orchestrator.generate("2+2", ids(&models))?;

        let rendered = f.complete(
            id,
            Ok(response(
                &[("OpenAI gpt-4", "4"), ("Anthropic claude-3", "4")],
                "The answer is 4",
            )),
        );

        assert_eq!(rendered.len(), 3);
        assert_eq!(
            f.tabs.slot("openai-gpt-4").map(|s| s.markup.as_str()),
            Some("<p>4</p>\n")
        );
        assert_eq!(
            f.tabs.slot("anthropic-claude-3").map(|s| s.markup.as_str()),
            Some("<p>4</p>\n")
        );
        assert_eq!(f.aggregate.markup().as_str(), "<p>The answer is 4</p>\n");
        assert_eq!(
            f.aggregate_region.snapshot().children,
            vec![ViewNode::Markup(f.aggregate.markup().clone())]
        );
        assert!(f.content.snapshot().child("openai-gpt-4").is_some());

        assert!(!f.orchestrator.is_busy());
        assert!(!f.progress.snapshot().visible);
        assert!(!f.busy.snapshot().visible);
        let cycle = f.orchestrator.cycle();
        assert_eq!(cycle.map(RenderCycle::state), Some(CycleState::Completed));
        assert_eq!(cycle.map(RenderCycle::progress), Some(100));
        Ok(())
    }

    #[test]
    fn test_colon_keyed_proposals_are_routed() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&["OpenAI gpt-4"]);
        let (id, _) = f.orchestrator.generate("2+2", ids(&["OpenAI gpt-4"]))?;
        f.complete(id, Ok(response(&[("OpenAI:gpt-4", "four")], "4")));

        assert_eq!(
            f.tabs.slot("openai-gpt-4").map(|s| s.markup.as_str()),
            Some("<p>four</p>\n")
        );
        Ok(())
    }

    #[test]
    fn test_unmatched_proposal_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&["OpenAI gpt-4"]);
        let (id, _) = f.orchestrator.generate("q", ids(&["OpenAI gpt-4"]))?;
        let rendered = f.complete(id, Ok(response(&[("Mistral large", "x")], "agg")));

        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].target, RenderTarget::Aggregate);
        Ok(())
    }

    #[test]
    fn test_failure_shows_generic_notice_and_renders_nothing()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&["OpenAI gpt-4"]);
        let before = f.tabs.slots().to_vec();
        let (id, _) = f.orchestrator.generate("q", ids(&["OpenAI gpt-4"]))?;

        let rendered = f.complete(id, Err(RequestError::Status(500)));

        assert!(rendered.is_empty());
        assert_eq!(f.tabs.slots(), before.as_slice());
        assert_eq!(f.aggregate.markup(), &SafeMarkup::default());
        assert_eq!(notice_text(&f.notice).as_deref(), Some(FAILURE_NOTICE));
        assert!(!f.busy.snapshot().visible);
        assert!(!f.progress.snapshot().visible);
        assert_eq!(
            f.orchestrator.cycle().map(RenderCycle::state),
            Some(CycleState::Failed)
        );
        Ok(())
    }

    #[test]
    fn test_unknown_cycle_completion_ignored() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&["OpenAI gpt-4"]);
        f.orchestrator.generate("q", ids(&["OpenAI gpt-4"]))?;

        let rendered = f.complete(Uuid::new_v4(), Ok(response(&[], "late")));
        assert!(rendered.is_empty());
        assert!(f.orchestrator.is_busy());
        Ok(())
    }

    #[test]
    fn test_accepted_generate_clears_previous_notice() -> Result<(), Box<dyn std::error::Error>> {
        let mut f = fixture(&[]);
        let _ = f.orchestrator.generate("", ids(&["OpenAI gpt-4"]));
        assert!(notice_text(&f.notice).is_some());

        f.orchestrator.generate("ok", ids(&["OpenAI gpt-4"]))?;
        assert!(notice_text(&f.notice).is_none());
        Ok(())
    }

    #[test]
    fn test_percent_bounds() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(1, 0), 100);
    }
}
