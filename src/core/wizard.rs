/// Wizard controller: step navigation, field binding, scene generation
/// and submission over one in-memory draft.
///
/// The controller is the only writer of the draft. Every mutation goes
/// through the draft store before the call returns, and all user-facing
/// feedback lands in a single [`Status`].
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::core::completion::{self, Progress};
use crate::core::config::SheetConfig;
use crate::core::corpus;
use crate::core::filler::fill_prompt;
use crate::core::selector;
use crate::core::store::{DraftStore, KeyValueStore};
use crate::core::submit::{build_payload, Payload, SubmissionClient, SubmitOutcome};
use crate::schema::draft::{fields, Draft};
use crate::schema::scene::{GeneratedScene, LibraryEntry};
use crate::schema::step::{Step, StepId, STEPS};

/// Labelled rows shown in the review summary, in display order.
const REVIEW_ROWS: [(&str, &str); 13] = [
    ("Имя", fields::NAME),
    ("Alias", fields::ALIAS),
    ("DOB", fields::DOB),
    ("Роль", fields::ROLE),
    ("Set", fields::SET),
    ("Теги", fields::TAGS),
    ("Предыстория", fields::BACKSTORY),
    ("Характер", fields::TRAITS),
    ("Ограничения", fields::LIMITS),
    ("Связи", fields::CONNECTIONS),
    ("Цели", fields::GOALS),
    ("Секрет", fields::SECRET),
    ("Запрос сцен", fields::WISHES),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Ok,
    Warning,
    Error,
}

/// The one status line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub severity: Severity,
    pub text: String,
}

impl Status {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard rejected the text: {0}")]
    Rejected(String),
}

/// A way of putting text on the user's clipboard. Browser clipboards
/// settle asynchronously, so a copy only counts once it resolves.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Clipboard {
    async fn copy(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Where copied text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySource {
    Scene,
    Library,
}

impl CopySource {
    fn confirmation(&self) -> &'static str {
        match self {
            Self::Scene => "Сцена скопирована в буфер обмена.",
            Self::Library => "Сцена из библиотеки скопирована.",
        }
    }
}

/// Try each clipboard in order until one accepts the text. Returns the
/// last failure when none does.
pub async fn copy_with_fallback(
    text: &str,
    clipboards: &mut [&mut dyn Clipboard],
) -> Result<(), ClipboardError> {
    let mut last = ClipboardError::Unavailable("no clipboard configured".to_string());
    for clipboard in clipboards.iter_mut() {
        match clipboard.copy(text).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!("clipboard attempt failed: {e}");
                last = e;
            }
        }
    }
    Err(last)
}

/// A submission that passed the local checks and is ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSubmission {
    pub endpoint: String,
    pub payload: Payload,
}

pub struct Wizard<S: KeyValueStore> {
    store: DraftStore<S>,
    draft: Draft,
    config: SheetConfig,
    client: SubmissionClient,
    current: StepId,
    scenes: Vec<GeneratedScene>,
    review: Vec<ReviewRow>,
    status: Option<Status>,
}

impl<S: KeyValueStore> Wizard<S> {
    /// Open the wizard on `step`, restoring whatever draft the backend holds.
    pub fn new(backend: S, config: SheetConfig, step: StepId) -> Self {
        let store = DraftStore::new(backend);
        let draft = store.load();
        debug!("wizard opened on {} with {} stored fields", step.name(), draft.len());

        let mut wizard = Self {
            store,
            draft,
            config,
            client: SubmissionClient::new(),
            current: step,
            scenes: Vec::new(),
            review: Vec::new(),
            status: None,
        };
        wizard.enter_step();
        wizard
    }

    pub fn with_client(mut self, client: SubmissionClient) -> Self {
        self.client = client;
        self
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn store(&self) -> &DraftStore<S> {
        &self.store
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub fn current_step(&self) -> &'static Step {
        self.current.step()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Scenes from the latest generation in this session.
    pub fn scenes(&self) -> &[GeneratedScene] {
        &self.scenes
    }

    pub fn review(&self) -> &[ReviewRow] {
        &self.review
    }

    pub fn step_states(&self) -> Vec<(StepId, bool)> {
        completion::step_states(&self.draft)
    }

    pub fn progress(&self) -> Progress {
        Progress::of(self.current)
    }

    pub fn dob_warning(&self) -> Option<String> {
        completion::dob_warning(&self.draft, self.config.age_reference)
    }

    pub fn is_submittable(&self) -> bool {
        completion::is_submittable(&self.draft)
    }

    /// Move `delta` steps, clamped to the first and last step.
    pub fn go_to_step(&mut self, delta: isize) -> &'static Step {
        let last = STEPS.len() as isize - 1;
        let target = (self.current.index() as isize)
            .saturating_add(delta)
            .clamp(0, last);
        self.open(STEPS[target as usize].id)
    }

    pub fn open(&mut self, step: StepId) -> &'static Step {
        self.current = step;
        self.enter_step();
        step.step()
    }

    fn enter_step(&mut self) {
        if self.current != StepId::Scenes {
            return;
        }
        self.refresh_review();
        if !self.guide_visible() {
            self.status = Some(Status::new(
                Severity::Info,
                "Отправка анкеты настроена — пользователю ничего вводить не нужно.",
            ));
        }
    }

    /// Apply a field edit and persist the whole draft.
    pub fn set_field(&mut self, key: &str, value: &str) {
        self.draft.set(key, value);
        self.draft.set(fields::UPDATED_AT, now_stamp());
        self.store.save(&self.draft);

        if key == fields::DOB {
            if let Some(warning) = self.dob_warning() {
                warn!("{warning}");
            }
        }
        if self.current == StepId::Scenes {
            self.refresh_review();
        }
    }

    fn refresh_review(&mut self) {
        self.review = REVIEW_ROWS
            .iter()
            .map(|&(label, key)| ReviewRow {
                label,
                value: self.draft.field(key).to_string(),
            })
            .collect();
    }

    /// Generate scenes with a time-based salt.
    pub fn generate(&mut self) -> &[GeneratedScene] {
        let salt = Utc::now().timestamp_millis().to_string();
        self.generate_with_salt(&salt)
    }

    /// Pick and fill scenes, cache them in the draft, and persist.
    pub fn generate_with_salt(&mut self, salt: &str) -> &[GeneratedScene] {
        if !self.is_submittable() {
            warn!("generating scenes for an incomplete profile");
        }

        let selection = selector::select(&self.draft, self.config.scene_count, salt);
        self.scenes = selection
            .picks
            .iter()
            .map(|t| selector::render(t, &self.draft))
            .collect();

        let text_at = |i: usize| self.scenes.get(i).map(|s| s.text.clone()).unwrap_or_default();
        let (first, second) = (text_at(0), text_at(1));
        let ids = selection.ids().join(",");
        self.draft.set(fields::SCENE_1, first);
        self.draft.set(fields::SCENE_2, second);
        self.draft.set(fields::SCENE_IDS, ids);
        self.store.save(&self.draft);

        info!("generated scenes {:?}", selection.ids());
        self.status = Some(Status::new(
            Severity::Ok,
            format!(
                "Готово: сгенерировано {} сцены. Можно копировать или отправлять.",
                self.scenes.len()
            ),
        ));
        &self.scenes
    }

    /// Scene texts cached by an earlier generation, when both are present.
    pub fn saved_scenes(&self) -> Option<[&str; 2]> {
        if self.draft.filled(fields::SCENE_1) && self.draft.filled(fields::SCENE_2) {
            Some([self.draft.get(fields::SCENE_1), self.draft.get(fields::SCENE_2)])
        } else {
            None
        }
    }

    pub fn library(&self) -> Vec<LibraryEntry> {
        corpus::library()
    }

    /// A library template filled against the current draft.
    pub fn library_scene(&self, id: &str) -> Option<String> {
        corpus::find(id).map(|t| fill_prompt(&t.prompt, &self.draft))
    }

    /// Confirm a copy, or ask the user to copy by hand.
    pub fn report_copy(&mut self, source: CopySource, copied: bool) {
        self.status = Some(if copied {
            Status::new(Severity::Ok, source.confirmation())
        } else {
            Status::new(
                Severity::Warning,
                "Не получилось скопировать автоматически. Выдели текст и скопируй вручную.",
            )
        });
    }

    pub async fn copy_text(
        &mut self,
        text: &str,
        source: CopySource,
        clipboards: &mut [&mut dyn Clipboard],
    ) -> bool {
        let copied = copy_with_fallback(text, clipboards).await.is_ok();
        self.report_copy(source, copied);
        copied
    }

    /// Text of scene `index`: this session's generation first, then the
    /// texts cached in the draft.
    pub fn scene_text(&self, index: usize) -> Option<String> {
        match self.scenes.get(index) {
            Some(scene) => Some(scene.text.clone()),
            None => self
                .saved_scenes()
                .and_then(|saved| saved.get(index).map(|s| s.to_string())),
        }
    }

    pub async fn copy_scene(
        &mut self,
        index: usize,
        clipboards: &mut [&mut dyn Clipboard],
    ) -> bool {
        match self.scene_text(index) {
            Some(text) => self.copy_text(&text, CopySource::Scene, clipboards).await,
            None => false,
        }
    }

    pub async fn copy_library_scene(
        &mut self,
        id: &str,
        clipboards: &mut [&mut dyn Clipboard],
    ) -> bool {
        match self.library_scene(id) {
            Some(text) => self.copy_text(&text, CopySource::Library, clipboards).await,
            None => false,
        }
    }

    /// Wipe the stored draft and reset everything derived from it.
    pub fn clear(&mut self) {
        self.store.clear();
        self.draft = Draft::new();
        self.scenes.clear();
        self.status = None;
        if self.current == StepId::Scenes {
            self.refresh_review();
        }
        info!("draft cleared");
    }

    pub fn effective_endpoint(&self) -> String {
        self.store.effective_endpoint(&self.config.default_endpoint)
    }

    /// The endpoint field is only shown in setup mode.
    pub fn endpoint_field_visible(&self) -> bool {
        self.config.setup_mode
    }

    /// Setup guidance stays visible until an endpoint exists, and always
    /// in setup mode.
    pub fn guide_visible(&self) -> bool {
        self.effective_endpoint().is_empty() || self.config.setup_mode
    }

    /// Store an endpoint override. Ignored outside setup mode.
    pub fn set_endpoint(&mut self, url: &str) -> bool {
        if !self.config.setup_mode {
            warn!("endpoint change ignored outside setup mode");
            return false;
        }
        self.store.set_endpoint_override(url.trim());
        self.status = Some(Status::new(Severity::Ok, "URL сохранён (в этом хранилище)."));
        true
    }

    /// Run the local part of a submission: gate on completeness, make sure
    /// scenes exist, and resolve the endpoint. Returns `None` when nothing
    /// should be sent; the status explains why.
    pub fn prepare_submission(&mut self) -> Option<PreparedSubmission> {
        self.refresh_review();

        if !self.is_submittable() {
            self.status = Some(Status::new(
                Severity::Error,
                "Не хватает минимума для отправки: имя, роль, set (шаг 1).",
            ));
            return None;
        }

        if !self.draft.filled(fields::SCENE_1) || !self.draft.filled(fields::SCENE_2) {
            self.generate();
        }

        let endpoint = self.effective_endpoint();
        if endpoint.is_empty() {
            self.status = Some(Status::new(
                Severity::Warning,
                "Сцены готовы, но отправка не настроена (endpoint пустой). \
                 Админ: задай адрес по умолчанию или открой режим настройки.",
            ));
            return None;
        }

        self.status = Some(Status::new(Severity::Info, "Отправляем анкету…"));
        Some(PreparedSubmission {
            endpoint,
            payload: build_payload(&self.draft),
        })
    }

    /// Report the outcome of a dispatched submission.
    pub fn finish_submission(&mut self, outcome: &SubmitOutcome) {
        self.status = Some(match outcome {
            SubmitOutcome::Dispatched => Status::new(Severity::Ok, "Готово! Анкета отправлена ✅"),
            SubmitOutcome::NoEndpoint => Status::new(
                Severity::Warning,
                "Отправка не настроена (endpoint пустой).",
            ),
            SubmitOutcome::TransportError(detail) => Status::new(
                Severity::Error,
                format!("Не удалось отправить. Проверь URL приёмника и доступ к нему. Ошибка: {detail}"),
            ),
        });
    }

    /// Full submission: local checks, one POST, status update.
    pub async fn submit(&mut self) -> Status {
        if let Some(prepared) = self.prepare_submission() {
            let outcome = self
                .client
                .submit(&prepared.endpoint, &prepared.payload)
                .await;
            self.finish_submission(&outcome);
        }
        self.status
            .clone()
            .unwrap_or_else(|| Status::new(Severity::Info, ""))
    }

    pub fn client(&self) -> &SubmissionClient {
        &self.client
    }
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    struct Failing;

    #[async_trait]
    impl Clipboard for Failing {
        async fn copy(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("headless".to_string()))
        }
    }

    #[derive(Default)]
    struct Recording {
        copied: Vec<String>,
    }

    #[async_trait]
    impl Clipboard for Recording {
        async fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.copied.push(text.to_string());
            Ok(())
        }
    }

    fn wizard(step: StepId) -> Wizard<MemoryStore> {
        Wizard::new(MemoryStore::new(), SheetConfig::default(), step)
    }

    fn fill_profile(w: &mut Wizard<MemoryStore>) {
        w.set_field("name", "Alex");
        w.set_field("role", "Runner");
        w.set_field("set", "Davis");
    }

    #[test]
    fn navigation_clamps() {
        let mut w = wizard(StepId::Profile);
        assert_eq!(w.go_to_step(-1).id, StepId::Profile);
        assert_eq!(w.go_to_step(2).id, StepId::Traits);
        assert_eq!(w.go_to_step(10).id, StepId::Scenes);
        assert_eq!(w.go_to_step(1).href, "sheet_scenes.html");
        assert_eq!(w.progress().number, 6);
    }

    #[test]
    fn field_changes_persist_immediately() {
        let mut w = wizard(StepId::Profile);
        w.set_field("name", "Alex");
        let stored = w.store().load();
        assert_eq!(stored.get("name"), "Alex");
        assert!(stored.filled(fields::UPDATED_AT));
    }

    #[test]
    fn review_follows_edits_on_final_step() {
        let mut w = wizard(StepId::Scenes);
        assert_eq!(w.review().len(), 13);
        w.set_field("traits", "  calm ");
        let row = w.review().iter().find(|r| r.label == "Характер").unwrap();
        assert_eq!(row.value, "calm");
    }

    #[test]
    fn generate_caches_scenes_in_draft() {
        let mut w = wizard(StepId::Scenes);
        fill_profile(&mut w);
        let ids: Vec<String> = w
            .generate_with_salt("t1")
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(w.draft().get(fields::SCENE_IDS), ids.join(","));
        assert_eq!(w.saved_scenes().unwrap()[0], w.scenes()[0].text);
        assert_eq!(w.store().load().get(fields::SCENE_2), w.scenes()[1].text);
        assert_eq!(w.status().unwrap().severity, Severity::Ok);
    }

    #[tokio::test]
    async fn copy_falls_back_then_warns() {
        let mut w = wizard(StepId::Scenes);
        w.generate_with_salt("t1");

        let mut failing = Failing;
        let mut recording = Recording::default();
        let mut chain: [&mut dyn Clipboard; 2] = [&mut failing, &mut recording];
        assert!(w.copy_scene(0, &mut chain).await);
        assert_eq!(recording.copied.len(), 1);
        assert_eq!(w.status().unwrap().severity, Severity::Ok);

        let mut failing = Failing;
        let mut chain: [&mut dyn Clipboard; 1] = [&mut failing];
        assert!(!w.copy_scene(1, &mut chain).await);
        assert_eq!(w.status().unwrap().severity, Severity::Warning);
    }

    #[tokio::test]
    async fn rejected_primary_falls_through_to_fallback() {
        let mut failing = Failing;
        let mut recording = Recording::default();
        let mut chain: [&mut dyn Clipboard; 2] = [&mut failing, &mut recording];
        assert!(copy_with_fallback("text", &mut chain).await.is_ok());
        assert_eq!(recording.copied, vec!["text".to_string()]);

        let mut failing = Failing;
        let mut chain: [&mut dyn Clipboard; 1] = [&mut failing];
        assert!(matches!(
            copy_with_fallback("text", &mut chain).await,
            Err(ClipboardError::Unavailable(_))
        ));
        let mut none: [&mut dyn Clipboard; 0] = [];
        assert!(copy_with_fallback("text", &mut none).await.is_err());
    }

    #[tokio::test]
    async fn library_copy_has_its_own_confirmation() {
        let mut w = wizard(StepId::Scenes);
        let mut recording = Recording::default();
        let mut chain: [&mut dyn Clipboard; 1] = [&mut recording];
        assert!(w.copy_library_scene("S005", &mut chain).await);
        assert_eq!(w.status().unwrap().text, "Сцена из библиотеки скопирована.");
        assert!(recording.copied[0].contains("твой персонаж"));

        let mut recording = Recording::default();
        let mut chain: [&mut dyn Clipboard; 1] = [&mut recording];
        assert!(!w.copy_library_scene("S999", &mut chain).await);
        assert!(recording.copied.is_empty());
    }

    #[test]
    fn extreme_deltas_clamp_without_overflow() {
        let mut w = wizard(StepId::Goals);
        assert_eq!(w.go_to_step(isize::MAX).id, StepId::Scenes);
        assert_eq!(w.go_to_step(isize::MIN).id, StepId::Profile);
        assert_eq!(w.go_to_step(isize::MAX).id, StepId::Scenes);
    }

    #[test]
    fn clear_resets_draft_and_indicators() {
        let mut w = wizard(StepId::Scenes);
        fill_profile(&mut w);
        w.generate_with_salt("x");
        w.clear();
        assert!(w.draft().is_empty());
        assert!(w.scenes().is_empty());
        assert!(w.status().is_none());
        assert!(w.step_states().iter().all(|(_, done)| !done));
        assert!(w.store().load().is_empty());
    }

    #[test]
    fn endpoint_editing_requires_setup_mode() {
        let mut w = wizard(StepId::Scenes);
        assert!(!w.endpoint_field_visible());
        assert!(!w.set_endpoint("https://example.test"));
        assert_eq!(w.effective_endpoint(), "");

        let config = SheetConfig {
            setup_mode: true,
            ..SheetConfig::default()
        };
        let mut w = Wizard::new(MemoryStore::new(), config, StepId::Scenes);
        assert!(w.set_endpoint(" https://example.test "));
        assert_eq!(w.effective_endpoint(), "https://example.test");
        assert!(w.guide_visible());
    }

    #[test]
    fn configured_endpoint_hides_guide() {
        let config = SheetConfig::default().with_injected_endpoint(Some("https://example.test"));
        let w = Wizard::new(MemoryStore::new(), config, StepId::Scenes);
        assert!(!w.guide_visible());
        assert_eq!(w.status().unwrap().severity, Severity::Info);
    }

    #[test]
    fn incomplete_draft_blocks_submission() {
        let mut w = wizard(StepId::Scenes);
        w.set_field("name", "Alex");
        assert!(w.prepare_submission().is_none());
        assert_eq!(w.status().unwrap().severity, Severity::Error);
        assert!(!w.draft().filled(fields::SCENE_1));
    }

    #[test]
    fn missing_endpoint_still_generates_scenes() {
        let mut w = wizard(StepId::Scenes);
        fill_profile(&mut w);
        assert!(w.prepare_submission().is_none());
        assert_eq!(w.status().unwrap().severity, Severity::Warning);
        assert!(w.saved_scenes().is_some());
    }

    #[test]
    fn prepared_payload_excludes_scenes() {
        let config = SheetConfig::default().with_injected_endpoint(Some("https://example.test"));
        let mut w = Wizard::new(MemoryStore::new(), config, StepId::Scenes);
        fill_profile(&mut w);
        let prepared = w.prepare_submission().unwrap();
        assert_eq!(prepared.endpoint, "https://example.test");
        assert_eq!(prepared.payload.get("name"), Some("Alex"));
        assert_eq!(prepared.payload.get("scene_1"), None);
        assert_eq!(w.status().unwrap().severity, Severity::Info);
    }

    #[test]
    fn transport_error_surfaces_detail() {
        let mut w = wizard(StepId::Scenes);
        w.finish_submission(&SubmitOutcome::TransportError("connection refused".to_string()));
        let status = w.status().unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(status.text.contains("connection refused"));
    }
}
