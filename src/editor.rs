use crate::compiler::{self, CompileInput, CompileOutput, SuggestedField};
use crate::disk::ImageInfo;
use crate::error::Result;
use crate::field::FieldDescriptor;
use crate::merge::MergePolicy;
use crate::nic::NicForm;

use strum::{Display, EnumString};
use tracing::debug;
use uuid::Uuid;

/// The three mutually exclusive views of the provisioning workflow.
#[derive(Display, EnumString, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[strum(serialize_all = "lowercase")]
pub enum Pane {
    #[default]
    Guided,
    Overlay,
    Final,
}

/// Snapshot of the guided form handed in by the host on every transition.
#[derive(Debug, Clone, Default)]
pub struct GuidedForm {
    pub fields: Vec<FieldDescriptor>,
    pub nic: NicForm,
    pub image: Option<ImageInfo>,
    pub policy: MergePolicy,
}

/// Result of a successful pane transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub pane: Pane,
    /// Entering the final pane asks the caller to run downstream validation.
    pub validate: bool,
    /// Derived form defaults for the caller to apply to the host form.
    pub suggested_fields: Vec<SuggestedField>,
}

/// Owns the overlay and final documents and the active pane for one visit to
/// the provisioning view. Created when the view is entered, dropped when it
/// is navigated away from; nothing here is process-wide.
#[derive(Debug)]
pub struct EditorSession {
    active: Pane,
    initialized: bool,
    overlay_doc: String,
    final_doc: String,
    assigned_uuid: Option<Uuid>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            active: Pane::Guided,
            initialized: false,
            overlay_doc: String::from("{}"),
            final_doc: String::from("{}"),
            assigned_uuid: None,
        }
    }

    /// One-time editor setup. Re-entering the view calls this again; the
    /// guard makes the second call a no-op so editor instances are never
    /// duplicated. Returns whether setup ran.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            debug!("editor session already initialized");
            return false;
        }
        self.initialized = true;
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn active(&self) -> Pane {
        self.active
    }

    /// The additional-properties document as last published or edited.
    pub fn overlay_document(&self) -> &str {
        &self.overlay_doc
    }

    /// The merged payload document as last published.
    pub fn final_document(&self) -> &str {
        &self.final_doc
    }

    /// Replace the overlay document with the operator's edit. Whole-document
    /// replacement; the text is reconciled on the next compile.
    pub fn set_overlay_document(&mut self, text: impl Into<String>) {
        self.overlay_doc = text.into();
    }

    fn compile(&self, form: &GuidedForm) -> Result<CompileOutput> {
        compiler::compile(&CompileInput {
            fields: form.fields.clone(),
            nic: form.nic.clone(),
            image: form.image.clone(),
            overlay_text: self.overlay_doc.clone(),
            policy: form.policy,
            sticky_uuid: self.assigned_uuid,
        })
    }

    /// Switch to a pane. The compiler runs first; a failed compile (invalid
    /// overlay JSON) suppresses the transition entirely, leaving the active
    /// pane and both documents untouched for the operator to fix.
    pub fn select(&mut self, pane: Pane, form: &GuidedForm) -> Result<Transition> {
        let output = self.compile(form)?;
        let final_doc = output.payload_pretty()?;

        self.overlay_doc = output.overlay;
        self.final_doc = final_doc;
        self.assigned_uuid = Some(output.uuid);
        self.active = pane;
        debug!("switched to {} pane", pane);

        Ok(Transition {
            pane,
            validate: pane == Pane::Final,
            suggested_fields: output.suggested_fields,
        })
    }

    /// Compile and return the compact payload string for submission. The
    /// published documents are refreshed so what the operator sees matches
    /// what is submitted.
    pub fn final_payload(&mut self, form: &GuidedForm) -> Result<String> {
        let output = self.compile(form)?;
        let compact = output.payload_compact()?;
        let final_doc = output.payload_pretty()?;

        self.overlay_doc = output.overlay;
        self.final_doc = final_doc;
        self.assigned_uuid = Some(output.uuid);

        Ok(compact)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}
