//! Component dispatch: which composite pipeline handles a component.
//!
//! The component's `kind` and use-case template id select a variant and the
//! `specific` payload is decoded into the variant's typed spec. Components the
//! engine cannot handle become [`ComponentDispatch::Unsupported`], a regular
//! value rather than an error.

use crate::config::TemplatesConfig;
use crate::models::{
    Component, JobSpecific, OutputPortSpecific, PipelineSpecific, WorkflowSpecific,
};
use crate::problem::{OpResult, ProblemContext};
use serde::de::DeserializeOwned;

pub const WORKLOAD_KIND: &str = "workload";
pub const OUTPUT_PORT_KIND: &str = "outputport";

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentDispatch {
    Job(JobSpecific),
    Pipeline(PipelineSpecific),
    Workflow(WorkflowSpecific),
    OutputPort(OutputPortSpecific),
    Unsupported { reason: String },
}

impl ComponentDispatch {
    /// Classify a component and decode its `specific` section.
    ///
    /// Fails only when the component is supported but its payload does not
    /// decode; unknown kinds and templates map to `Unsupported`.
    pub fn classify(component: &Component, templates: &TemplatesConfig) -> OpResult<Self> {
        match component.kind.as_str() {
            WORKLOAD_KIND => Self::classify_workload(component, templates),
            OUTPUT_PORT_KIND => Self::classify_output_port(component, templates),
            other => Ok(Self::Unsupported {
                reason: format!(
                    "The kind '{other}' of the component '{}' is not supported by this provisioner",
                    component.id
                ),
            }),
        }
    }

    fn classify_workload(component: &Component, templates: &TemplatesConfig) -> OpResult<Self> {
        let template = match template_of(component, "workload") {
            Ok(template) => template,
            Err(unsupported) => return Ok(unsupported),
        };

        let listed = |ids: &[String]| ids.iter().any(|id| id == template);

        if listed(&templates.job[..]) {
            Ok(Self::Job(decode(component, "job")?))
        } else if listed(&templates.pipeline[..]) {
            Ok(Self::Pipeline(decode(component, "DLT pipeline")?))
        } else if listed(&templates.workflow[..]) {
            Ok(Self::Workflow(decode(component, "workflow")?))
        } else {
            Ok(unsupported_template(component, template, "workload"))
        }
    }

    fn classify_output_port(component: &Component, templates: &TemplatesConfig) -> OpResult<Self> {
        let template = match template_of(component, "output port") {
            Ok(template) => template,
            Err(unsupported) => return Ok(unsupported),
        };

        if templates.output_port.iter().any(|id| id == template) {
            Ok(Self::OutputPort(decode(component, "output port")?))
        } else {
            Ok(unsupported_template(component, template, "output port"))
        }
    }

    /// Short label for logs and messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Job(_) => "job",
            Self::Pipeline(_) => "dlt_pipeline",
            Self::Workflow(_) => "workflow",
            Self::OutputPort(_) => "output_port",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

fn template_of<'a>(component: &'a Component, label: &str) -> Result<&'a str, ComponentDispatch> {
    component.use_case_template_id.as_deref().ok_or_else(|| ComponentDispatch::Unsupported {
        reason: format!(
            "The {label} '{}' has no use case template id, which is not supported by this provisioner",
            component.id
        ),
    })
}

fn unsupported_template(component: &Component, template: &str, label: &str) -> ComponentDispatch {
    ComponentDispatch::Unsupported {
        reason: format!(
            "The use case template id '{template}' of the {label} '{}' is not supported by this provisioner",
            component.id
        ),
    }
}

fn decode<T: DeserializeOwned>(component: &Component, label: &str) -> OpResult<T> {
    serde_json::from_value(component.specific.clone()).problem(|| {
        format!(
            "The specific section of component '{}' is not a valid {label} specification",
            component.id
        )
    })
}
