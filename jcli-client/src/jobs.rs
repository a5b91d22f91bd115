//! Job-level API endpoints

use std::collections::BTreeMap;

use jcli_core::domain::job::{JobDefinition, JobKind, ParameterDefinition};
use serde::Deserialize;
use serde_json::Value;

use crate::JenkinsClient;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct FolderResponse {
    #[serde(default)]
    jobs: Vec<FolderEntry>,
}

#[derive(Debug, Deserialize)]
struct FolderEntry {
    name: String,
    color: Option<String>,
    #[serde(rename = "_class", default)]
    class: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActionsResponse {
    #[serde(default)]
    pub(crate) actions: Vec<Option<Action>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Action {
    #[serde(default)]
    parameters: Vec<ParameterValue>,
}

#[derive(Debug, Deserialize)]
struct ParameterValue {
    name: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct PropertiesResponse {
    #[serde(default)]
    property: Vec<Option<Property>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Property {
    #[serde(default)]
    parameter_definitions: Vec<WireDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDefinition {
    name: String,
    #[serde(rename = "type")]
    param_type: Option<String>,
    description: Option<String>,
    default_parameter_value: Option<DefaultValue>,
    #[serde(default)]
    choices: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DefaultValue {
    #[serde(default)]
    value: Value,
}

impl JenkinsClient {
    // =============================================================================
    // Jobs
    // =============================================================================

    /// List the jobs in the configured folder
    ///
    /// # Returns
    /// Jobs and nested folders, in the order Jenkins reports them
    pub async fn list_folder_jobs(&self) -> Result<Vec<JobDefinition>> {
        let url = format!(
            "{}/api/json?tree=jobs[name,color,_class]",
            self.folder_url()
        );
        let response = self.get(&url).send().await?;
        let folder: FolderResponse = self.handle_response(response).await?;

        Ok(folder
            .jobs
            .into_iter()
            .map(|entry| {
                let kind = if entry.class.ends_with("Folder") {
                    JobKind::Folder
                } else {
                    JobKind::Job
                };
                let job = JobDefinition::new(entry.name).with_kind(kind);
                match entry.color {
                    Some(color) => job.with_color(color),
                    None => job,
                }
            })
            .collect())
    }

    /// Parameter values of the job's most recent build
    ///
    /// # Returns
    /// An empty map when the job has never been built
    pub async fn last_build_parameters(&self, job_name: &str) -> Result<BTreeMap<String, String>> {
        let url = format!(
            "{}/lastBuild/api/json?tree=actions[parameters[name,value]]",
            self.job_url(job_name)
        );
        let response = self.get(&url).send().await?;
        let actions: Option<ActionsResponse> = self.handle_optional_response(response).await?;

        Ok(actions.map(|a| a.parameters()).unwrap_or_default())
    }

    /// Parameters declared by a job
    ///
    /// # Arguments
    /// * `job_name` - The job inside the folder
    pub async fn parameter_definitions(&self, job_name: &str) -> Result<Vec<ParameterDefinition>> {
        let url = format!(
            "{}/api/json?tree=property[parameterDefinitions[name,type,description,defaultParameterValue[value],choices]]",
            self.job_url(job_name)
        );
        let response = self.get(&url).send().await?;
        let properties: PropertiesResponse = self.handle_response(response).await?;

        Ok(properties
            .property
            .into_iter()
            .flatten()
            .flat_map(|p| p.parameter_definitions)
            .map(|d| ParameterDefinition {
                name: d.name,
                param_type: d.param_type,
                default_value: d.default_parameter_value.and_then(|v| value_text(v.value)),
                description: d.description.filter(|s| !s.trim().is_empty()),
                choices: d.choices,
            })
            .collect())
    }
}

impl ActionsResponse {
    /// Flatten every parameters action into one map
    pub(crate) fn parameters(self) -> BTreeMap<String, String> {
        self.actions
            .into_iter()
            .flatten()
            .flat_map(|a| a.parameters)
            .map(|p| (p.name, value_text(p.value).unwrap_or_default()))
            .collect()
    }
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use jcli_core::domain::job::JobType;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_folder_jobs() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/job/test-collateral/api/json")
                    .query_param("tree", "jobs[name,color,_class]")
                    .header_exists("authorization");
                then.status(200).json_body(json!({
                    "jobs": [
                        {"_class": "hudson.model.FreeStyleProject", "name": "test-collateral-api-build", "color": "blue_anime"},
                        {"_class": "hudson.model.FreeStyleProject", "name": "test-collateral-Scale-up", "color": "red"},
                        {"_class": "com.cloudbees.hudson.plugins.folder.Folder", "name": "archive"}
                    ]
                }));
            })
            .await;

        let client = JenkinsClient::new(server.base_url(), "test-collateral")
            .with_credentials("me", "token");
        let jobs = client.list_folder_jobs().await.unwrap();

        mock.assert_async().await;
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].job_type, JobType::Build);
        assert_eq!(jobs[0].color_status(), "Success (Running)");
        assert_eq!(jobs[1].job_type, JobType::Scale);
        assert!(jobs[2].is_folder());
    }

    #[tokio::test]
    async fn test_list_folder_jobs_reports_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/job/test-collateral/api/json");
                then.status(401).body("Unauthorized");
            })
            .await;

        let client = JenkinsClient::new(server.base_url(), "test-collateral");
        let err = client.list_folder_jobs().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_last_build_parameters() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/job/test-collateral/job/svc-build/lastBuild/api/json");
                then.status(200).json_body(json!({
                    "actions": [
                        {"_class": "hudson.model.CauseAction"},
                        {"parameters": [
                            {"name": "SERVICENAME", "value": "svc"},
                            {"name": "DRY_RUN", "value": false}
                        ]},
                        null
                    ]
                }));
            })
            .await;

        let client = JenkinsClient::new(server.base_url(), "test-collateral");
        let params = client.last_build_parameters("svc-build").await.unwrap();
        assert_eq!(params.get("SERVICENAME").map(String::as_str), Some("svc"));
        assert_eq!(params.get("DRY_RUN").map(String::as_str), Some("false"));
    }

    #[tokio::test]
    async fn test_last_build_parameters_without_builds() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/job/test-collateral/job/new-build/lastBuild/api/json");
                then.status(404).body("Not Found");
            })
            .await;

        let client = JenkinsClient::new(server.base_url(), "test-collateral");
        assert!(client.last_build_parameters("new-build").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parameter_definitions() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/job/test-collateral/job/test-collateral-Scale-up/api/json");
                then.status(200).json_body(json!({
                    "property": [
                        {"_class": "jenkins.model.BuildDiscarderProperty"},
                        {"parameterDefinitions": [
                            {
                                "name": "SERVICES",
                                "type": "ChoiceParameterDefinition",
                                "description": "",
                                "defaultParameterValue": {"value": "api"},
                                "choices": ["api", "worker"]
                            },
                            {
                                "name": "TIME_TO_LIVE",
                                "type": "StringParameterDefinition",
                                "description": "Hours",
                                "defaultParameterValue": {"value": "2"}
                            }
                        ]}
                    ]
                }));
            })
            .await;

        let client = JenkinsClient::new(server.base_url(), "test-collateral");
        let defs = client
            .parameter_definitions("test-collateral-Scale-up")
            .await
            .unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].choices, vec!["api", "worker"]);
        assert_eq!(defs[0].description, None);
        assert_eq!(defs[1].default_value.as_deref(), Some("2"));
        assert_eq!(defs[1].description.as_deref(), Some("Hours"));
    }
}
