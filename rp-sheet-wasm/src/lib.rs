//! WASM bindings for rp-sheet: the browser host of the sheet wizard.
//!
//! Everything crossing the boundary is a plain string or a JSON string.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use rp_sheet::core::completion::Progress;
use rp_sheet::core::config::{SheetConfig, ENDPOINT_ENV, LEGACY_ENDPOINT_ENV};
use rp_sheet::core::store::{KeyValueStore, StoreError};
use rp_sheet::core::wizard::{copy_with_fallback, Clipboard, ClipboardError, CopySource, Wizard};
use rp_sheet::schema::step::StepId;

#[wasm_bindgen(start)]
pub fn start() {
    console_log::init_with_level(log::Level::Debug).unwrap_or(());
}

// ---------------------------------------------------------------------------
// Browser storage
// ---------------------------------------------------------------------------

/// `window.localStorage`, or nothing when the browser refuses access.
pub struct LocalStorage {
    storage: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            warn!("localStorage unavailable; the draft will not survive a reload");
        }
        Self { storage }
    }

    fn storage(&self) -> Result<&web_sys::Storage, StoreError> {
        self.storage
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))
    }
}

fn js_error(e: JsValue) -> StoreError {
    StoreError::Unavailable(format!("{e:?}"))
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage()?.get_item(key).map_err(js_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage()?.remove_item(key).map_err(js_error)
    }
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

/// `navigator.clipboard.writeText`, awaited so a rejection moves the
/// chain on to the next clipboard.
struct AsyncClipboard;

#[async_trait(?Send)]
impl Clipboard for AsyncClipboard {
    async fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        let window = web_sys::window()
            .ok_or_else(|| ClipboardError::Unavailable("no window".to_string()))?;
        let navigator = JsValue::from(window.navigator());
        let clipboard = js_sys::Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .ok()
            .filter(|c| !c.is_undefined() && !c.is_null())
            .ok_or_else(|| ClipboardError::Unavailable("navigator.clipboard".to_string()))?;
        let write_text = js_sys::Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .ok_or_else(|| ClipboardError::Unavailable("clipboard.writeText".to_string()))?;

        let promise = write_text
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(|e| ClipboardError::Rejected(format!("{e:?}")))?;
        JsFuture::from(js_sys::Promise::from(promise))
            .await
            .map(|_| ())
            .map_err(|e| ClipboardError::Rejected(format!("{e:?}")))
    }
}

/// Hidden textarea plus `document.execCommand("copy")`.
struct SelectionClipboard;

#[async_trait(?Send)]
impl Clipboard for SelectionClipboard {
    async fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        let unavailable = |what: &str| ClipboardError::Unavailable(what.to_string());
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| unavailable("document"))?;
        let body = document.body().ok_or_else(|| unavailable("document.body"))?;
        let area = document
            .create_element("textarea")
            .ok()
            .and_then(|el| el.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
            .ok_or_else(|| unavailable("textarea"))?;

        area.set_value(text);
        area.set_attribute("readonly", "").ok();
        area.set_attribute("style", "position:fixed;top:-1000px;opacity:0")
            .ok();
        body.append_child(&area)
            .map_err(|e| ClipboardError::Rejected(format!("{e:?}")))?;
        area.select();

        let copied = document
            .dyn_ref::<web_sys::HtmlDocument>()
            .map(|doc| doc.exec_command("copy").unwrap_or(false))
            .unwrap_or(false);
        body.remove_child(&area).ok();

        if copied {
            Ok(())
        } else {
            Err(ClipboardError::Rejected("execCommand(copy) returned false".to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Page context
// ---------------------------------------------------------------------------

/// `?setup=1` on the page URL.
fn setup_flag() -> bool {
    let search = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default();
    url::form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
        .any(|(k, v)| k == "setup" && v == "1")
}

/// Endpoint injected by the page as a global, e.g.
/// `window.RP_SHEET_ENDPOINT = "https://..."`.
fn page_global(name: &str) -> Option<String> {
    let window = web_sys::window()?;
    js_sys::Reflect::get(&window, &JsValue::from_str(name))
        .ok()?
        .as_string()
}

/// Copy off the wizard borrow, then record the result.
fn copy_in_background(
    inner: Rc<RefCell<Wizard<LocalStorage>>>,
    text: Option<String>,
    source: CopySource,
) -> js_sys::Promise {
    future_to_promise(async move {
        let Some(text) = text else {
            return Ok(JsValue::FALSE);
        };
        let mut primary = AsyncClipboard;
        let mut fallback = SelectionClipboard;
        let mut chain: [&mut dyn Clipboard; 2] = [&mut primary, &mut fallback];
        let copied = copy_with_fallback(&text, &mut chain).await.is_ok();
        inner.borrow_mut().report_copy(source, copied);
        Ok(JsValue::from_bool(copied))
    })
}

// ---------------------------------------------------------------------------
// JSON views
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StepView {
    id: StepId,
    href: &'static str,
    fields: &'static [&'static str],
    progress: Progress,
    progress_label: String,
    states: Vec<(StepId, bool)>,
    dob_warning: Option<String>,
    endpoint_field_visible: bool,
    guide_visible: bool,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// SheetWizard, the main exported struct
// ---------------------------------------------------------------------------

#[wasm_bindgen]
pub struct SheetWizard {
    inner: Rc<RefCell<Wizard<LocalStorage>>>,
}

#[wasm_bindgen]
impl SheetWizard {
    /// Open the wizard on the page's step (`profile` … `scenes`).
    #[wasm_bindgen(constructor)]
    pub fn new(step: &str) -> Result<SheetWizard, JsError> {
        let step =
            StepId::parse(step).ok_or_else(|| JsError::new(&format!("Unknown step: {step}")))?;
        let config = SheetConfig {
            setup_mode: setup_flag(),
            ..SheetConfig::default()
        }
        .with_injected_endpoints(&[
            page_global(ENDPOINT_ENV).as_deref(),
            page_global(LEGACY_ENDPOINT_ENV).as_deref(),
        ]);
        debug!("sheet wizard on {} (setup: {})", step.name(), config.setup_mode);

        Ok(SheetWizard {
            inner: Rc::new(RefCell::new(Wizard::new(LocalStorage::open(), config, step))),
        })
    }

    /// Current step, progress, done flags and page indicators as JSON.
    pub fn step(&self) -> Result<String, JsError> {
        let wizard = self.inner.borrow();
        let step = wizard.current_step();
        let progress = wizard.progress();
        to_json(&StepView {
            id: step.id,
            href: step.href,
            fields: step.fields,
            progress,
            progress_label: progress.label(),
            states: wizard.step_states(),
            dob_warning: wizard.dob_warning(),
            endpoint_field_visible: wizard.endpoint_field_visible(),
            guide_visible: wizard.guide_visible(),
        })
    }

    /// Move `delta` steps and return the page to navigate to.
    pub fn go(&self, delta: i32) -> String {
        self.inner.borrow_mut().go_to_step(delta as isize).href.to_string()
    }

    /// The draft as a JSON object of field names to text.
    pub fn draft(&self) -> Result<String, JsError> {
        to_json(self.inner.borrow().draft())
    }

    /// Record an edit. Returns the DOB warning, if the edit triggers one.
    pub fn set_field(&self, key: &str, value: &str) -> Option<String> {
        let mut wizard = self.inner.borrow_mut();
        wizard.set_field(key, value);
        wizard.dob_warning()
    }

    /// Generate scenes and return them as a JSON array.
    pub fn generate(&self) -> Result<String, JsError> {
        let mut wizard = self.inner.borrow_mut();
        to_json(wizard.generate())
    }

    /// Scenes cached in the draft, as a JSON array of two strings or `null`.
    pub fn saved_scenes(&self) -> Result<String, JsError> {
        to_json(&self.inner.borrow().saved_scenes())
    }

    pub fn library(&self) -> Result<String, JsError> {
        to_json(&self.inner.borrow().library())
    }

    pub fn library_scene(&self, id: &str) -> Option<String> {
        self.inner.borrow().library_scene(id)
    }

    /// Copy a generated or saved scene. Resolves to whether it was copied.
    pub fn copy_scene(&self, index: usize) -> js_sys::Promise {
        let text = self.inner.borrow().scene_text(index);
        copy_in_background(Rc::clone(&self.inner), text, CopySource::Scene)
    }

    pub fn copy_library_scene(&self, id: &str) -> js_sys::Promise {
        let text = self.inner.borrow().library_scene(id);
        copy_in_background(Rc::clone(&self.inner), text, CopySource::Library)
    }

    /// Review rows as a JSON array of `{label, value}`.
    pub fn review(&self) -> Result<String, JsError> {
        to_json(self.inner.borrow().review())
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    pub fn set_endpoint(&self, url: &str) -> bool {
        self.inner.borrow_mut().set_endpoint(url)
    }

    pub fn effective_endpoint(&self) -> String {
        self.inner.borrow().effective_endpoint()
    }

    /// Current status as JSON `{severity, text}`, or `null`.
    pub fn status(&self) -> Result<String, JsError> {
        to_json(&self.inner.borrow().status())
    }

    /// Submit the sheet. Resolves to the final status JSON.
    pub fn submit(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let (prepared, client) = {
                let mut wizard = inner.borrow_mut();
                (wizard.prepare_submission(), wizard.client().clone())
            };
            if let Some(prepared) = prepared {
                let outcome = client.submit(&prepared.endpoint, &prepared.payload).await;
                inner.borrow_mut().finish_submission(&outcome);
            }
            let status = serde_json::to_string(&inner.borrow().status())
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(JsValue::from_str(&status))
        })
    }
}
