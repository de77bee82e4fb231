use mockito::{Matcher, Server};
use octopusdeploy::api::RetryConfig;
use octopusdeploy::OctopusDeployProvider;
use serde_json::json;
use tfplug::testing::ProviderTester;

const API_KEY: &str = "API-INTEGRATIONTEST";

fn no_retries() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        initial_backoff_ms: 1,
        max_backoff_ms: 1,
        timeout_seconds: 5,
    }
}

async fn configured_tester(server: &Server) -> ProviderTester<OctopusDeployProvider> {
    let mut tester =
        ProviderTester::new(OctopusDeployProvider::new().with_retry_config(no_retries()));
    tester
        .configure(json!({
            "address": server.url(),
            "api_key": API_KEY,
            "space_id": "Spaces-1",
        }))
        .await
        .unwrap();
    tester
}

#[tokio::test]
async fn provider_exposes_every_type() {
    let tester = ProviderTester::new(OctopusDeployProvider::new());

    assert_eq!(
        tester.resource_types(),
        vec!["octopusdeploy_certificate", "octopusdeploy_library_variable_set"]
    );
    assert_eq!(
        tester.data_source_types(),
        vec!["octopusdeploy_polling_tentacle_deployment_targets"]
    );
}

#[tokio::test]
async fn provider_rejects_blank_api_key() {
    let mut tester = ProviderTester::new(OctopusDeployProvider::new());

    let err = tester
        .configure(json!({
            "address": "https://octopus.example.com",
            "api_key": "   ",
            "space_id": "Spaces-1",
        }))
        .await
        .unwrap_err();

    assert!(err
        .diagnostics()
        .iter()
        .any(|d| d.attribute.as_ref().map(ToString::to_string).as_deref() == Some("api_key")));
}

#[tokio::test]
async fn resources_fail_before_provider_is_configured() {
    let tester = ProviderTester::new(OctopusDeployProvider::new());

    let err = tester
        .create(
            "octopusdeploy_certificate",
            json!({ "name": "cert-a", "certificate_data": "ZGF0YQ==" }),
        )
        .await
        .unwrap_err();

    assert_eq!(err.diagnostics()[0].summary, "Provider not configured");
}

#[tokio::test]
async fn polling_tentacle_targets_are_queried_and_flattened() {
    let mut server = Server::new_async().await;

    let machines = server
        .mock("GET", "/api/Spaces-1/machines")
        .match_header("X-Octopus-ApiKey", API_KEY)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("commStyles".into(), "TentacleActive".into()),
            Matcher::UrlEncoded("roles".into(), "web,api".into()),
            Matcher::UrlEncoded("skip".into(), "0".into()),
            Matcher::UrlEncoded("take".into(), "5".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ItemType": "DeploymentTarget",
                "TotalResults": 1,
                "ItemsPerPage": 5,
                "NumberOfPages": 1,
                "LastPageNumber": 0,
                "Items": [{
                    "Id": "Machines-7",
                    "Name": "web-07",
                    "EnvironmentIds": ["Environments-1"],
                    "Roles": ["web", "api"],
                    "TenantIds": [],
                    "TenantTags": [],
                    "TenantedDeploymentParticipation": "Untenanted",
                    "IsDisabled": false,
                    "MachinePolicyId": "MachinePolicies-1",
                    "HealthStatus": "Healthy",
                    "StatusSummary": "Octopus was able to successfully establish a connection",
                    "SpaceId": "Spaces-1",
                    "ShellName": "PowerShell",
                    "ShellVersion": "5.1",
                    "OperatingSystem": "Microsoft Windows",
                    "Endpoint": {
                        "CommunicationStyle": "TentacleActive",
                        "Thumbprint": "8A7E6157A34158EDA1B5127CB027B2A267760A4F",
                        "Uri": "poll://3pq8p6vjnxvcpq2h6j8m/",
                        "CertificateSignatureAlgorithm": "sha256RSA"
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tester = configured_tester(&server).await;
    let state = tester
        .read_data_source(
            "octopusdeploy_polling_tentacle_deployment_targets",
            json!({ "roles": ["web", "api"], "take": 5 }),
        )
        .await
        .unwrap();

    machines.assert_async().await;

    assert!(state["id"]
        .as_str()
        .unwrap()
        .starts_with("PollingTentacleDeploymentTargets "));
    assert_eq!(state["skip"], 0);
    assert_eq!(state["take"], 5);

    let targets = state["polling_tentacle_deployment_targets"].as_array().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["id"], "Machines-7");
    assert_eq!(targets[0]["environments"], json!(["Environments-1"]));
    assert_eq!(
        targets[0]["thumbprint"],
        "8A7E6157A34158EDA1B5127CB027B2A267760A4F"
    );
    assert_eq!(targets[0]["tentacle_url"], "poll://3pq8p6vjnxvcpq2h6j8m/");
    assert_eq!(targets[0]["certificate_signature_algorithm"], "sha256RSA");
    assert_eq!(targets[0]["tenanted_deployment_participation"], "Untenanted");
}

#[tokio::test]
async fn polling_tentacle_targets_tolerate_null_fields() {
    let mut server = Server::new_async().await;

    let _machines = server
        .mock("GET", "/api/Spaces-1/machines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "Items": [{
                    "Id": "Machines-8",
                    "Name": "worker-08",
                    "EnvironmentIds": null,
                    "Roles": null,
                    "TenantIds": null,
                    "TenantTags": null,
                    "TenantedDeploymentParticipation": null,
                    "IsDisabled": null,
                    "Thumbprint": null,
                    "Uri": null,
                    "Endpoint": null
                }],
                "TotalResults": null
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tester = configured_tester(&server).await;
    let state = tester
        .read_data_source(
            "octopusdeploy_polling_tentacle_deployment_targets",
            json!({}),
        )
        .await
        .unwrap();

    let target = &state["polling_tentacle_deployment_targets"][0];
    assert_eq!(target["id"], "Machines-8");
    assert_eq!(target["environments"], json!([]));
    assert_eq!(target["roles"], json!([]));
    assert_eq!(target["tenant_tags"], json!([]));
    assert_eq!(target["is_disabled"], false);
    assert_eq!(target["tenanted_deployment_participation"], "Untenanted");
}

#[tokio::test]
async fn polling_tentacle_targets_report_server_errors() {
    let mut server = Server::new_async().await;

    let _machines = server
        .mock("GET", "/api/Spaces-1/machines")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ErrorMessage": "There was a problem with your request.",
                "Errors": ["Skip must be a positive number"]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tester = configured_tester(&server).await;
    let err = tester
        .read_data_source("octopusdeploy_polling_tentacle_deployment_targets", json!({}))
        .await
        .unwrap_err();

    let diag = &err.diagnostics()[0];
    assert_eq!(
        diag.summary,
        "Failed to read octopusdeploy_polling_tentacle_deployment_targets"
    );
    assert!(diag.detail.contains("Skip must be a positive number"));
}

#[tokio::test]
async fn polling_tentacle_targets_reject_malformed_tenant_tags() {
    let tester = ProviderTester::new(OctopusDeployProvider::new());

    let err = tester
        .validate_data_source_config(
            "octopusdeploy_polling_tentacle_deployment_targets",
            json!({ "tenant_tags": ["Region/West", "West"] }),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.diagnostics()[0]
            .attribute
            .as_ref()
            .map(ToString::to_string)
            .as_deref(),
        Some("tenant_tags[1]")
    );
}
