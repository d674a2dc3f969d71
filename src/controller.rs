#![forbid(unsafe_code)]

// Controller - owns run state and drives the single event loop that mutates it

use crate::channel::router::{self, Frame};
use crate::channel::{ChannelEvent, ChannelManager, ChannelState, Connector, Epoch};
use crate::launcher::{self, SubmitError, Submitter};
use crate::metrics::ClientMetrics;
use crate::report::{RunReport, SessionReport};
use crate::session::reconcile::{self, ScrollAction};
use crate::session::{Reconciled, SessionId, SessionRegistry};
use crate::validate::{self, TestConfig, TestInput, ValidationError};
use crate::view::Renderer;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Bounded event queue between channel readers, submissions and the loop.
const EVENT_CAPACITY: usize = 256;

/// Identifies one launch so late events from an earlier run can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum AppEvent {
    Channel(ChannelEvent),
    Submitted { run: RunId, result: Result<(), SubmitError> },
}

/// How a run ended, from the operator's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum RunOutcome {
    /// Every session reached success or error
    Completed,
    SubmissionFailed(String),
    /// Channel closed while sessions were still in flight
    ChannelLost,
    TimedOut,
}

struct ActiveRun {
    id: RunId,
    concurrency: u32,
    started: Instant,
    finished_after: HashMap<SessionId, Duration>,
    outcome: Option<RunOutcome>,
}

pub struct Controller<C, S, R> {
    channel: ChannelManager<C>,
    registry: SessionRegistry,
    renderer: R,
    submitter: Arc<S>,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    run: Option<ActiveRun>,
    deferred_scrolls: Vec<SessionId>,
    metrics: ClientMetrics,
}

impl<C: Connector, S: Submitter, R: Renderer> Controller<C, S, R> {
    pub fn new(connector: C, submitter: S, renderer: R) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            channel: ChannelManager::new(connector, events_tx.clone()),
            registry: SessionRegistry::default(),
            renderer,
            submitter: Arc::new(submitter),
            events_tx,
            events_rx,
            run: None,
            deferred_scrolls: Vec::new(),
            metrics: ClientMetrics::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn channel_state(&self) -> &ChannelState {
        self.channel.state()
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.id)
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.run.as_ref().and_then(|run| run.outcome.clone())
    }

    /// Validate operator input and launch it. Nothing is sent if validation fails.
    pub fn submit(&mut self, input: TestInput) -> Result<RunId, ValidationError> {
        let config = validate::validate(input).inspect_err(|e| {
            warn!("Test configuration rejected: {}", e);
        })?;
        Ok(self.launch(config))
    }

    /// Start a new run: seed pending sessions, draw them, then submit once the
    /// channel is ready.
    pub fn launch(&mut self, config: TestConfig) -> RunId {
        let run = RunId::new();
        info!(
            "Launching run {}: {} session(s) against {} {}",
            run, config.concurrency, config.method, config.endpoint
        );

        self.registry.seed(config.concurrency);
        self.deferred_scrolls.clear();
        self.run = Some(ActiveRun {
            id: run,
            concurrency: config.concurrency.get(),
            started: Instant::now(),
            finished_after: HashMap::new(),
            outcome: None,
        });

        self.renderer.render_all(self.registry.sessions());
        self.renderer.set_in_progress(true);

        if matches!(self.channel.state(), ChannelState::Disconnected) {
            self.metrics.inc_channels_opened();
        }

        let submitter = self.submitter.clone();
        let events = self.events_tx.clone();
        let metrics = self.metrics.clone();
        self.channel.ensure_ready(move |channel_id| {
            let request = launcher::build_request(&config, channel_id);
            metrics.inc_submissions();
            tokio::spawn(async move {
                let result = submitter.submit(request).await;
                let _ = events.send(AppEvent::Submitted { run, result }).await;
            });
        });

        run
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Channel(ChannelEvent::Frame { epoch, text }) => self.on_frame(epoch, &text),
            AppEvent::Channel(ChannelEvent::Closed { epoch }) => self.on_channel_closed(epoch),
            AppEvent::Submitted { run, result } => self.on_submitted(run, result),
        }
    }

    /// Work deferred to the next loop tick: follow-bottom scrolls need the
    /// post-render content height.
    pub fn tick(&mut self) {
        for id in std::mem::take(&mut self.deferred_scrolls) {
            self.renderer.scroll_to_bottom(id);
        }
        self.renderer.present();
    }

    /// Wait for and handle one event. Returns false if the queue is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                self.tick();
                true
            }
            None => false,
        }
    }

    /// Drive the loop until the current run ends. None if nothing was launched.
    pub async fn run_until_complete(&mut self, timeout: Duration) -> Option<RunOutcome> {
        self.run.as_ref()?;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(outcome) = self.outcome() {
                return Some(outcome);
            }
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => {
                    self.handle_event(event);
                    self.tick();
                }
                Ok(None) => return Some(RunOutcome::ChannelLost),
                Err(_) => {
                    warn!("Run did not finish within {:?}", timeout);
                    self.settle(RunOutcome::TimedOut);
                    return self.outcome();
                }
            }
        }
    }

    pub fn report(&self) -> Option<RunReport> {
        let run = self.run.as_ref()?;
        let sessions = self
            .registry
            .sessions()
            .iter()
            .map(|session| SessionReport {
                id: session.id,
                status: session.status,
                finished_after_ms: run
                    .finished_after
                    .get(&session.id)
                    .map(|d| d.as_millis() as u64),
                response: session.response.clone(),
            })
            .collect();

        Some(RunReport::new(
            run.id,
            run.outcome.clone(),
            run.concurrency,
            run.started.elapsed(),
            self.registry.counts(),
            sessions,
            self.metrics.snapshot(),
        ))
    }

    fn on_frame(&mut self, epoch: Epoch, text: &str) {
        if !self.channel.is_current(epoch) {
            debug!("Dropping frame from closed channel epoch {}", epoch);
            return;
        }
        self.metrics.inc_frames_received();

        match router::classify(text) {
            Frame::Identity(identity) => {
                let fired = self.channel.on_identity(epoch, identity);
                debug!("Channel identity received, {} submission(s) released", fired);
            }
            Frame::Progress { session, response } => self.reconcile(session, &response),
            Frame::Unknown => {
                self.metrics.inc_unknown_frames();
                debug!("Ignoring unrecognized frame: {}", text);
            }
        }
    }

    fn reconcile(&mut self, id: SessionId, response: &str) {
        if self.registry.get(id).is_none() {
            self.metrics.inc_stale_frames();
            debug!("Dropping progress for unknown session {}", id);
            return;
        }

        // Geometry must be sampled before the pane is redrawn
        let before = self.renderer.view_state(id);

        let (previous, current) = match self.registry.apply(id, response) {
            Reconciled::Applied { previous, current } => (previous, current),
            Reconciled::Stale => {
                self.metrics.inc_stale_frames();
                return;
            }
            Reconciled::AlreadyFinished { status } => {
                self.metrics.inc_late_frames();
                debug!("Session {} already {}, dropping late frame", id, status);
                return;
            }
        };
        self.metrics.inc_progress_applied();

        if let Some(session) = self.registry.get(id) {
            self.renderer.render_session(session);
        }

        if let Some(before) = before {
            match reconcile::scroll_action(current, before, self.renderer.bottom_tolerance()) {
                ScrollAction::Restore(offset) => self.renderer.scroll_to(id, offset),
                ScrollAction::FollowBottom => self.deferred_scrolls.push(id),
            }
        }

        if current.is_terminal() && !previous.is_terminal() {
            if let Some(run) = self.run.as_mut() {
                let elapsed = run.started.elapsed();
                run.finished_after.insert(id, elapsed);
                self.metrics.observe_time_to_finish(elapsed);
            }
            debug!("Session {} finished as {}", id, current);
        }

        self.check_completion();
    }

    /// Runs after every applied update; hiding the indicator is idempotent.
    fn check_completion(&mut self) {
        if !self.registry.all_finished() {
            return;
        }
        self.renderer.set_in_progress(false);

        let counts = self.registry.counts();
        if let Some(run) = self.run.as_mut() {
            if run.outcome.is_none() {
                run.outcome = Some(RunOutcome::Completed);
                self.metrics.inc_runs_completed();
                info!(
                    "Run {} finished: {} succeeded, {} failed",
                    run.id, counts.success, counts.error
                );
            }
        }
    }

    fn on_channel_closed(&mut self, epoch: Epoch) {
        if !self.channel.on_closed(epoch) {
            return;
        }
        self.metrics.inc_channel_losses();

        if !self.registry.all_finished() {
            self.settle(RunOutcome::ChannelLost);
        }
    }

    fn on_submitted(&mut self, run: RunId, result: Result<(), SubmitError>) {
        if self.run_id() != Some(run) {
            debug!("Ignoring submission result from earlier run {}", run);
            return;
        }

        match result {
            Ok(()) => info!("Runner accepted run {}", run),
            Err(e) => {
                self.metrics.inc_submission_failures();
                error!("Submission for run {} failed: {}", run, e);
                self.renderer.set_in_progress(false);
                self.renderer
                    .show_error(&format!("Error while requesting the test: {e}"));
                self.settle(RunOutcome::SubmissionFailed(e.to_string()));
            }
        }
    }

    /// Record how the run ended, keeping the first outcome.
    fn settle(&mut self, outcome: RunOutcome) {
        if let Some(run) = self.run.as_mut() {
            if run.outcome.is_none() {
                run.outcome = Some(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::RecordingConnector;
    use crate::launcher::tests::RecordingSubmitter;
    use crate::protocol::{ChannelIdentity, RequestBody};
    use crate::session::{PLACEHOLDER_RESPONSE, Session, Status};
    use crate::validate::Concurrency;
    use crate::view::ViewState;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        RenderAll(usize),
        RenderSession(SessionId),
        ScrollTo(SessionId, u32),
        ScrollToBottom(SessionId),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<Call>,
        views: HashMap<SessionId, ViewState>,
        in_progress: bool,
        errors: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn render_all(&mut self, sessions: &[Session]) {
            self.calls.push(Call::RenderAll(sessions.len()));
        }

        fn render_session(&mut self, session: &Session) {
            self.calls.push(Call::RenderSession(session.id));
        }

        fn view_state(&self, id: SessionId) -> Option<ViewState> {
            self.views.get(&id).copied()
        }

        fn scroll_to(&mut self, id: SessionId, offset: u32) {
            self.calls.push(Call::ScrollTo(id, offset));
        }

        fn scroll_to_bottom(&mut self, id: SessionId) {
            self.calls.push(Call::ScrollToBottom(id));
        }

        fn set_in_progress(&mut self, visible: bool) {
            self.in_progress = visible;
        }

        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    type TestController = Controller<RecordingConnector, RecordingSubmitter, RecordingRenderer>;

    fn id(raw: u32) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    fn controller(submitter: RecordingSubmitter) -> (TestController, RecordingConnector) {
        let connector = RecordingConnector::default();
        let controller =
            Controller::new(connector.clone(), submitter, RecordingRenderer::default());
        (controller, connector)
    }

    fn config(concurrency: i64) -> TestConfig {
        TestConfig {
            concurrency: Concurrency::clamped(concurrency),
            endpoint: "http://target.local/stream".into(),
            method: "POST".into(),
            headers: HashMap::new(),
            body: RequestBody::Raw(String::new()),
            end_flags: Vec::new(),
        }
    }

    fn frame(epoch: Epoch, text: &str) -> AppEvent {
        AppEvent::Channel(ChannelEvent::Frame { epoch, text: text.to_string() })
    }

    fn progress(epoch: Epoch, session: u32, response: &str) -> AppEvent {
        let text = serde_json::json!({ "session": session, "response": response }).to_string();
        AppEvent::Channel(ChannelEvent::Frame { epoch, text })
    }

    /// Launch and complete the identity handshake, consuming the submission result.
    async fn launched(
        concurrency: i64,
    ) -> (TestController, RecordingConnector, RecordingSubmitter) {
        let submitter = RecordingSubmitter::default();
        let (mut controller, connector) = controller(submitter.clone());
        controller.launch(config(concurrency));
        controller.handle_event(frame(1, r#"{"channelId":"chan-1"}"#));
        assert!(controller.process_next().await);
        (controller, connector, submitter)
    }

    fn status_of(controller: &TestController, raw: u32) -> (Status, String) {
        let session = controller.registry().get(id(raw)).unwrap();
        (session.status, session.response.clone())
    }

    #[tokio::test]
    async fn test_launch_seeds_renders_and_waits_for_identity() {
        let submitter = RecordingSubmitter::default();
        let (mut controller, connector) = controller(submitter.clone());

        controller.launch(config(3));

        let sessions = controller.registry().sessions();
        assert_eq!(sessions.len(), 3);
        assert!(sessions
            .iter()
            .all(|s| s.status == Status::Pending && s.response == PLACEHOLDER_RESPONSE));
        assert_eq!(controller.renderer().calls, vec![Call::RenderAll(3)]);
        assert!(controller.renderer().in_progress);
        assert_eq!(connector.opened(), vec![1]);
        assert!(submitter.requests().is_empty());

        controller.handle_event(frame(1, r#"{"channelId":"chan-1"}"#));
        assert!(controller.process_next().await);

        let requests = submitter.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].concurrency, 3);
        assert_eq!(requests[0].channel_id, ChannelIdentity::Text("chan-1".into()));
        assert_eq!(controller.metrics().snapshot().submissions, 1);
    }

    #[tokio::test]
    async fn test_invalid_body_blocks_submission() {
        let submitter = RecordingSubmitter::default();
        let (mut controller, connector) = controller(submitter.clone());

        let result = controller.submit(TestInput {
            concurrency: Concurrency::clamped(2),
            endpoint: "http://target.local".into(),
            method: "POST".into(),
            body: "{invalid".into(),
            ..TestInput::default()
        });

        assert!(matches!(result, Err(ValidationError::InvalidJsonBody { .. })));
        assert!(connector.opened().is_empty());
        assert!(submitter.requests().is_empty());
        assert!(controller.registry().is_empty());
        assert!(controller.renderer().calls.is_empty());
    }

    #[tokio::test]
    async fn test_three_session_walkthrough() {
        let (mut controller, _connector, _submitter) = launched(3).await;

        controller.handle_event(progress(1, 2, "\u{1F504} working"));
        assert_eq!(status_of(&controller, 2), (Status::Loading, "\u{1F504} working".into()));
        assert_eq!(status_of(&controller, 1), (Status::Pending, PLACEHOLDER_RESPONSE.into()));
        assert_eq!(status_of(&controller, 3), (Status::Pending, PLACEHOLDER_RESPONSE.into()));

        controller.handle_event(progress(1, 2, "\u{2705} done"));
        assert_eq!(status_of(&controller, 2), (Status::Success, "\u{2705} done".into()));
        assert!(controller.renderer().in_progress);
        assert_eq!(controller.outcome(), None);

        controller.handle_event(progress(1, 1, "\u{2705} done"));
        assert!(controller.renderer().in_progress);
        controller.handle_event(progress(1, 3, "ERROR: connection reset"));
        assert!(!controller.renderer().in_progress);
        assert_eq!(controller.outcome(), Some(RunOutcome::Completed));

        // A repeated terminal frame changes nothing and completes nothing twice
        controller.handle_event(progress(1, 3, "ERROR: connection reset"));
        let snapshot = controller.metrics().snapshot();
        assert_eq!(snapshot.runs_completed, 1);
        assert_eq!(snapshot.late_frames, 1);
        assert_eq!(snapshot.sessions_finished, 3);

        let report = controller.report().unwrap();
        assert_eq!((report.counts.success, report.counts.error), (2, 1));
        assert!(report.sessions.iter().all(|s| s.finished_after_ms.is_some()));
    }

    #[tokio::test]
    async fn test_done_marker_behind_progress_prefix_keeps_run_open() {
        let (mut controller, _connector, _submitter) = launched(1).await;

        controller.handle_event(progress(1, 1, "\u{1F504} streaming\n\u{2705} almost"));
        assert_eq!(status_of(&controller, 1).0, Status::Loading);
        assert!(controller.renderer().in_progress);
        assert_eq!(controller.outcome(), None);

        controller.handle_event(progress(1, 1, "\u{2705} session 1 done"));
        assert_eq!(status_of(&controller, 1).0, Status::Success);
        assert_eq!(controller.outcome(), Some(RunOutcome::Completed));
    }

    #[tokio::test]
    async fn test_update_renders_only_addressed_session() {
        let (mut controller, _connector, _submitter) = launched(4).await;
        let before = controller.renderer().calls.len();

        controller.handle_event(progress(1, 3, "partial output"));

        let calls = &controller.renderer().calls[before..];
        assert_eq!(calls, &[Call::RenderSession(id(3))]);
    }

    #[tokio::test]
    async fn test_loading_at_bottom_follows_on_next_tick() {
        let (mut controller, _connector, _submitter) = launched(2).await;
        controller.renderer.views.insert(
            id(1),
            ViewState { scroll_top: 400, content_height: 500, viewport_height: 100 },
        );
        let before = controller.renderer().calls.len();

        controller.handle_event(progress(1, 1, "\u{1F504} more"));
        assert_eq!(
            &controller.renderer().calls[before..],
            &[Call::RenderSession(id(1))],
            "follow-bottom must wait for the next tick"
        );

        controller.tick();
        assert_eq!(
            &controller.renderer().calls[before..],
            &[Call::RenderSession(id(1)), Call::ScrollToBottom(id(1))]
        );
    }

    #[tokio::test]
    async fn test_loading_scrolled_up_restores_offset() {
        let (mut controller, _connector, _submitter) = launched(2).await;
        controller.renderer.views.insert(
            id(2),
            ViewState { scroll_top: 40, content_height: 500, viewport_height: 100 },
        );
        let before = controller.renderer().calls.len();

        controller.handle_event(progress(1, 2, "\u{1F504} more"));
        controller.tick();
        assert_eq!(
            &controller.renderer().calls[before..],
            &[Call::RenderSession(id(2)), Call::ScrollTo(id(2), 40)]
        );
    }

    #[tokio::test]
    async fn test_finished_session_does_not_jump() {
        let (mut controller, _connector, _submitter) = launched(1).await;
        controller.renderer.views.insert(
            id(1),
            ViewState { scroll_top: 400, content_height: 500, viewport_height: 100 },
        );
        let before = controller.renderer().calls.len();

        controller.handle_event(progress(1, 1, "\u{2705} complete"));
        controller.tick();
        assert_eq!(
            &controller.renderer().calls[before..],
            &[Call::RenderSession(id(1)), Call::ScrollTo(id(1), 400)]
        );
    }

    #[tokio::test]
    async fn test_stale_and_unknown_frames_are_dropped() {
        let (mut controller, _connector, _submitter) = launched(2).await;
        let before = controller.renderer().calls.len();
        let sessions = controller.registry().sessions().to_vec();

        controller.handle_event(progress(1, 9, "\u{2705} ghost"));
        controller.handle_event(frame(1, r#"{"type":"heartbeat"}"#));
        controller.handle_event(frame(1, "garbage"));

        assert_eq!(controller.registry().sessions(), sessions.as_slice());
        assert_eq!(controller.renderer().calls.len(), before);
        let snapshot = controller.metrics().snapshot();
        assert_eq!(snapshot.stale_frames, 1);
        assert_eq!(snapshot.unknown_frames, 2);
    }

    #[tokio::test]
    async fn test_submission_failure_hides_indicator_and_keeps_sessions() {
        let submitter = RecordingSubmitter::rejecting(502);
        let (mut controller, _connector) = controller(submitter.clone());
        controller.launch(config(2));
        controller.handle_event(frame(1, r#"{"ws_id":77}"#));
        assert!(controller.process_next().await);

        assert_eq!(submitter.requests()[0].channel_id, ChannelIdentity::Number(77));
        assert!(!controller.renderer().in_progress);
        assert_eq!(controller.renderer().errors.len(), 1);
        assert!(controller.renderer().errors[0].contains("HTTP 502"));
        assert_eq!(controller.registry().counts().pending, 2);
        assert!(matches!(controller.outcome(), Some(RunOutcome::SubmissionFailed(_))));
        assert_eq!(controller.metrics().snapshot().submission_failures, 1);
    }

    #[tokio::test]
    async fn test_channel_loss_then_transparent_reconnect() {
        let (mut controller, connector, submitter) = launched(2).await;
        controller.handle_event(progress(1, 1, "\u{1F504} partial"));

        controller.handle_event(AppEvent::Channel(ChannelEvent::Closed { epoch: 1 }));
        assert_eq!(controller.channel_state(), &ChannelState::Disconnected);
        assert_eq!(controller.outcome(), Some(RunOutcome::ChannelLost));
        assert_eq!(status_of(&controller, 1).0, Status::Loading);

        // Frames from the dead channel are ignored
        controller.handle_event(progress(1, 1, "\u{2705} too late"));
        assert_eq!(status_of(&controller, 1).0, Status::Loading);

        controller.launch(config(1));
        assert_eq!(connector.opened(), vec![1, 2]);
        controller.handle_event(frame(2, r#"{"channelId":"chan-2"}"#));
        assert!(controller.process_next().await);

        let requests = submitter.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].channel_id, ChannelIdentity::Text("chan-2".into()));
        assert_eq!(controller.metrics().snapshot().channel_losses, 1);
        assert_eq!(controller.metrics().snapshot().channels_opened, 2);
    }

    #[tokio::test]
    async fn test_relaunch_on_ready_channel_submits_immediately() {
        let (mut controller, connector, submitter) = launched(1).await;
        controller.handle_event(progress(1, 1, "\u{2705} ok"));

        let second = controller.launch(config(5));
        assert_eq!(controller.registry().len(), 5);
        assert!(controller.renderer().in_progress);
        assert!(controller.process_next().await);

        assert_eq!(connector.opened(), vec![1]);
        assert_eq!(submitter.requests().len(), 2);
        assert_eq!(controller.run_id(), Some(second));
        assert_eq!(controller.outcome(), None);
    }

    #[tokio::test]
    async fn test_result_of_earlier_run_is_ignored() {
        let (mut controller, _connector, _submitter) = launched(1).await;
        let earlier = controller.run_id().unwrap();
        controller.launch(config(1));
        assert!(controller.process_next().await);

        controller.handle_event(AppEvent::Submitted {
            run: earlier,
            result: Err(SubmitError::Rejected { status: 500 }),
        });
        assert!(controller.renderer().errors.is_empty());
        assert!(controller.renderer().in_progress);
        assert_eq!(controller.outcome(), None);
    }

    #[tokio::test]
    async fn test_run_until_complete_times_out() {
        let (mut controller, _connector) = controller(RecordingSubmitter::default());
        assert_eq!(controller.run_until_complete(Duration::from_millis(10)).await, None);

        controller.launch(config(1));
        let outcome = controller.run_until_complete(Duration::from_millis(20)).await;
        assert_eq!(outcome, Some(RunOutcome::TimedOut));
    }
}
