//! Instance command handlers
//!
//! One-shot status and kill requests for a single instance.

use anyhow::Result;
use bluepipe_client::{InstanceId, InstanceState, InstanceStatus};
use colored::*;

use super::Outcome;
use crate::config::Config;

/// Print the status of one instance
pub async fn show_status(instance: &str, config: &Config) -> Result<Outcome> {
    let client = config.client()?;
    let instance = InstanceId::from(instance);

    match client.get_status(&instance).await {
        Some(status) => {
            print_status(&instance, &status);
            Ok(Outcome::Success)
        }
        None => Ok(Outcome::RequestFailed),
    }
}

/// Ask the server to stop one instance
pub async fn kill(instance: &str, message: Option<&str>, config: &Config) -> Result<Outcome> {
    let client = config.client()?;
    let instance = InstanceId::from(instance);

    let Some(data) = client.kill_instance(&instance, message).await else {
        return Ok(Outcome::RequestFailed);
    };

    println!("{} Stop requested for {}", "✓".green(), instance.as_str().bold());
    if !data.is_null() {
        println!("{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(Outcome::Success)
}

fn print_status(instance: &InstanceId, status: &InstanceStatus) {
    println!("  {} Instance {}", "▸".cyan(), instance.as_str().bold());
    println!("    Status:       {}", colorize_state(status.state()));

    if let Some(rows) = status.rows() {
        println!("    Rows:         {}", rows);
    }
    if let Some(speed) = status.throughput_mbps() {
        println!("    Throughput:   {} MB/s", speed);
    }
}

fn colorize_state(state: InstanceState) -> ColoredString {
    let label = state.banner();
    match state {
        InstanceState::Finished => label.green(),
        InstanceState::Running => label.yellow(),
        InstanceState::Killed | InstanceState::Failed => label.red(),
        InstanceState::Unknown => label.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        Config {
            endpoint: format!("{}/api/v1", server.uri()),
            access_id: "etl".to_string(),
            access_key: "secret".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_show_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/instance/i-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0,
                "data": { "last_status": "RUNNING", "total_rows": 10 }
            })))
            .mount(&mock_server)
            .await;

        let config = config_for(&mock_server);
        assert_eq!(show_status("i-1", &config).await.unwrap(), Outcome::Success);
        assert_eq!(
            show_status("missing", &config).await.unwrap(),
            Outcome::RequestFailed
        );
    }

    #[tokio::test]
    async fn test_kill_with_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/instance/i-1/stop"))
            .and(body_json(json!({ "message": "bad data" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = config_for(&mock_server);
        let outcome = kill("i-1", Some("bad data"), &config).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_colorize_state_keeps_banner() {
        colored::control::set_override(false);
        assert_eq!(colorize_state(InstanceState::Failed).to_string(), "FAILED");
    }
}
